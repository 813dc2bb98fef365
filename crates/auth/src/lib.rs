//! `loyalty-auth`: credentials and bearer tokens.
//!
//! Decoupled from HTTP and storage: callers hand in secrets, passwords and
//! clocks; this crate only hashes, signs and verifies.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtError, JwtIssuer, JwtValidator, TOKEN_LIFETIME_HOURS};
pub use password::{PasswordError, hash_password, verify_password};
