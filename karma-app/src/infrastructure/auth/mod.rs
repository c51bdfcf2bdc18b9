mod jwt;
mod password;

pub use jwt::{JwtTokens, TokenClaims};
pub use password::{hash_password, verify_password};
