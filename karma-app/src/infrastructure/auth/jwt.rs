use crate::domain::{IdentityResolver, User, ROLE_ADMIN};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use karma_errors::AppError;
use serde::{Deserialize, Serialize};

/// Claims carried by a login credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "UserRole")]
    pub user_role: String,
    #[serde(rename = "UserNickname")]
    pub user_nickname: String,
    pub exp: i64,
}

impl TokenClaims {
    pub fn is_admin(&self) -> bool {
        self.user_role == ROLE_ADMIN
    }
}

/// HS256 credential issuer and verifier. The secret comes from configuration.
#[derive(Clone)]
pub struct JwtTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtTokens {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = TokenClaims {
            user_id: user.id.to_string(),
            user_role: user.role.clone(),
            user_nickname: user.nickname.clone(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Token(format!("signing failed: {e}")))
    }

    pub fn verify(&self, credential: &str) -> Result<TokenClaims, AppError> {
        let credential = credential.trim();
        let credential = credential.strip_prefix("Bearer ").unwrap_or(credential);
        if credential.is_empty() {
            return Err(AppError::Unauthorized("missing credential".to_string()));
        }

        let validation = Validation::new(Algorithm::HS256);
        decode::<TokenClaims>(credential, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(e.to_string()))
    }
}

impl IdentityResolver for JwtTokens {
    fn resolve(&self, credential: &str) -> Result<String, AppError> {
        let claims = self.verify(credential)?;
        if claims.user_nickname.is_empty() {
            return Err(AppError::Unauthorized(
                "nickname not found in claims".to_string(),
            ));
        }
        Ok(claims.user_nickname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> User {
        User::new(
            "Alice".to_string(),
            "Smith".to_string(),
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
            String::new(),
            Utc::now(),
        )
    }

    #[test]
    fn test_issue_then_resolve() {
        let tokens = JwtTokens::new("test-secret", Duration::hours(24));
        let token = tokens.issue(&member(), Utc::now()).unwrap();

        assert_eq!(tokens.resolve(&token).unwrap(), "alice");
        assert_eq!(tokens.resolve(&format!("Bearer {token}")).unwrap(), "alice");
        assert!(!tokens.verify(&token).unwrap().is_admin());
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let issuer = JwtTokens::new("one-secret", Duration::hours(24));
        let verifier = JwtTokens::new("another-secret", Duration::hours(24));
        let token = issuer.issue(&member(), Utc::now()).unwrap();

        assert!(matches!(
            verifier.resolve(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let tokens = JwtTokens::new("test-secret", Duration::hours(24));
        let issued_long_ago = Utc::now() - Duration::days(3);
        let token = tokens.issue(&member(), issued_long_ago).unwrap();

        assert!(matches!(tokens.resolve(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_credential() {
        let tokens = JwtTokens::new("test-secret", Duration::hours(24));
        assert!(tokens.resolve("").is_err());
        assert!(tokens.resolve("not.a.jwt").is_err());
    }
}
