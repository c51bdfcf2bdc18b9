//! Seams between the application services and their collaborators.
//!
//! Services only see these traits; storage, cache and credential adapters
//! live under `infrastructure` and are picked at startup.

use super::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use karma_errors::AppError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("{0} already taken")]
    Conflict(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => AppError::UserExists,
            RepositoryError::Backend(msg) => AppError::Persistence(msg),
        }
    }
}

/// User document store.
///
/// Every write touches a single user record; there is no transaction
/// spanning two users. Soft-deleted users are never returned.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    /// Overwrites the editable profile fields and `updated_at`.
    async fn update_profile(&self, user: &User) -> Result<(), RepositoryError>;

    /// Writes `rating` and `rating_list` only if the stored ledger still
    /// equals `expected_ledger`. Returns `false` when it does not (or the
    /// user vanished), in which case nothing was written.
    async fn store_ledger(
        &self,
        nickname: &str,
        rating: i32,
        ledger: &str,
        expected_ledger: &str,
    ) -> Result<bool, RepositoryError>;

    /// Records when `nickname` last cast a vote.
    async fn record_vote_cast(
        &self,
        nickname: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Returns `false` when no live user has that nickname.
    async fn mark_deleted(&self, nickname: &str, at: DateTime<Utc>)
        -> Result<bool, RepositoryError>;

    /// Users ordered by rating, highest first.
    async fn list_by_rating(&self, offset: u64, limit: u64) -> Result<Vec<User>, RepositoryError>;
}

/// Turns a raw bearer credential into the caller's nickname.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend failure: {0}")]
    Backend(String),
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Cache(err.to_string())
    }
}

/// String cache used by the read endpoints.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}
