//! Accounts, password hashing and bearer tokens.

mod password;
mod service;
mod token;

pub use password::Passwords;
pub use service::{AuthResponse, AuthService, LoginRequest, SignupRequest};
pub use token::{AuthUser, TokenIssuer};
