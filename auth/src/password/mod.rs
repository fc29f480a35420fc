pub mod argon2;
pub mod errors;
pub mod generate;
pub mod strength;

pub use argon2::PasswordHasher;
pub use errors::PasswordError;
pub use generate::generate_random_secret;
pub use strength::validate_strength;
pub use strength::PasswordPolicyViolation;
