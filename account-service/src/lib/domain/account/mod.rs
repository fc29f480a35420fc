pub mod errors;
pub mod lockout;
pub mod models;
pub mod ports;
pub mod service;
