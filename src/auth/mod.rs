//! Authentication for Chorus
//!
//! Provides:
//! - Password hashing with Argon2
//! - Session token issuance and verification (JWT, HS256)
//! - Session transport (cookie / bearer header) extraction
//! - The request gate that resolves a token to a stored identity

pub mod gate;
pub mod jwt;
pub mod password;
pub mod session;

pub use gate::{authenticate, Identity};
pub use jwt::{Claims, IssuedToken, JwtValidator};
pub use password::{hash_password, verify_password};
pub use session::{
    clear_session_cookie, extract_bearer, extract_cookie, extract_session_token, session_cookie,
    SESSION_COOKIE,
};
