//! Authentication utilities

mod password;
mod tokens;

pub use password::{hash_password, validate_password_strength, verify_password};
pub use tokens::{
    generate_refresh_token_id, Claims, TokenPair, TokenService, TokenSubject, TokenType,
};
