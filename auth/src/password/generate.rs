use rand::rngs::OsRng;
use rand::Rng;

/// Characters allowed in generated secrets: letters, digits, and a fixed
/// punctuation set.
const SECRET_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Generate a cryptographically secure random secret string.
///
/// Draws from the operating system CSPRNG. Used for backup codes and
/// generated passwords.
///
/// # Arguments
/// * `length` - Number of characters in the generated secret
///
/// # Returns
/// Random string of the requested length
pub fn generate_random_secret(length: usize) -> String {
    let mut rng = OsRng;

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..SECRET_CHARSET.len());
            SECRET_CHARSET[idx] as char
        })
        .collect()
}
