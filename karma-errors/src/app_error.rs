use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("can't find sender: {0}")]
    SenderNotFound(String),

    #[error("incorrect user nickname: {0}")]
    TargetNotFound(String),

    #[error("user can't vote for themselves")]
    SelfVote,

    #[error("you can vote once per cooldown window: retry in {0} seconds")]
    RateLimited(i64),

    #[error("user can't vote twice for one person")]
    DuplicateVote,

    #[error("can't read user vote list: {0}")]
    CorruptLedger(String),

    #[error("can't encode user vote list: {0}")]
    Encoding(String),

    #[error("can't update user: {0}")]
    Persistence(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("user with this email or nickname exists")]
    UserExists,

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("token: {0}")]
    Token(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure belongs to the vote-rejection family a client
    /// can act on, as opposed to storage or infrastructure trouble.
    pub fn is_vote_rejection(&self) -> bool {
        matches!(
            self,
            Self::SelfVote
                | Self::RateLimited(_)
                | Self::DuplicateVote
                | Self::TargetNotFound(_)
        )
    }
}

#[cfg(feature = "axum")]
mod http_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                AppError::Forbidden(_) => StatusCode::FORBIDDEN,
                AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
                // A missing sender is not mapped to a client error; it surfaces
                // as a bare server failure.
                AppError::SenderNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let message = match &self {
                AppError::SenderNotFound(_) | AppError::Config(_) | AppError::Internal(_) => {
                    generic_message(status)
                }
                _ => self.to_string(),
            };
            (status, message).into_response()
        }
    }

    fn generic_message(status: StatusCode) -> String {
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context_and_cause() {
        let err = AppError::TargetNotFound("dave".to_string());
        assert_eq!(err.to_string(), "incorrect user nickname: dave");

        let err = AppError::Persistence("connection reset".to_string());
        assert_eq!(err.to_string(), "can't update user: connection reset");
    }

    #[test]
    fn test_vote_rejections() {
        assert!(AppError::DuplicateVote.is_vote_rejection());
        assert!(AppError::RateLimited(30).is_vote_rejection());
        assert!(!AppError::Persistence("x".to_string()).is_vote_rejection());
        assert!(!AppError::SenderNotFound("x".to_string()).is_vote_rejection());
    }

    #[cfg(feature = "axum")]
    #[test]
    fn test_status_mapping() {
        use axum::http::StatusCode;

        assert_eq!(AppError::SelfVote.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateVote.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::SenderNotFound("ghost".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Unauthorized("missing".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::UserNotFound("dave".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
