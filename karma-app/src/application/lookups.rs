use crate::domain::{Cache, UserRepository};
use karma_errors::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub fn rating_key(nickname: &str) -> String {
    format!("user-rating-{nickname}")
}

pub fn profile_key(nickname: &str) -> String {
    format!("user-profile-{nickname}")
}

pub fn users_page_key(page: u64) -> String {
    format!("/users/{page}")
}

/// Cache-aside read endpoints.
///
/// Entries are never invalidated by writes; a rating read can lag a vote by
/// up to one TTL.
pub struct Lookups {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    page_size: u64,
}

impl Lookups {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn Cache>,
        ttl: Duration,
        page_size: u64,
    ) -> Self {
        Self {
            users,
            cache,
            ttl,
            page_size,
        }
    }

    pub async fn rating(&self, nickname: &str) -> Result<String, AppError> {
        self.cached(rating_key(nickname), || async {
            let user = self
                .users
                .find_by_nickname(nickname)
                .await?
                .ok_or_else(|| AppError::UserNotFound(nickname.to_string()))?;
            Ok::<_, AppError>(format!("user has {}", user.rating))
        })
        .await
    }

    pub async fn profile(&self, nickname: &str) -> Result<String, AppError> {
        self.cached(profile_key(nickname), || async {
            let user = self
                .users
                .find_by_nickname(nickname)
                .await?
                .ok_or_else(|| AppError::UserNotFound(nickname.to_string()))?;
            Ok::<_, AppError>(format!(
                "User name: {}\nUser lastname: {}\nUser id: {}",
                user.first_name, user.last_name, user.id
            ))
        })
        .await
    }

    /// One `nickname - email` line per user, highest rating first.
    pub async fn users_page(&self, page: u64) -> Result<String, AppError> {
        self.cached(users_page_key(page), || async {
            let offset = page.saturating_mul(self.page_size);
            let users = self.users.list_by_rating(offset, self.page_size).await?;
            Ok::<_, AppError>(users
                .iter()
                .map(|u| format!("{} - {}", u.nickname, u.email))
                .collect::<Vec<_>>()
                .join("\n"))
        })
        .await
    }

    async fn cached<F, Fut>(&self, key: String, load: F) -> Result<String, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        match self.cache.get(&key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(err) => tracing::warn!(key = %key, "Cache read failed, falling back: {}", err),
        }

        let value = load().await?;
        self.cache.set(&key, &value, self.ttl).await?;
        Ok(value)
    }
}
