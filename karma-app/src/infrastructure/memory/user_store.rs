use crate::domain::{RepositoryError, User, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Users keyed by nickname. Each method touches one map entry, mirroring the
/// single-document updates of the database adapter.
///
/// `emails` maps every registered email (deleted users included) to its
/// nickname and plays the part of the unique index. Inserts lock the email
/// entry before the nickname entry; nothing locks them in the other order.
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<DashMap<String, User>>,
    emails: Arc<DashMap<String, String>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record lookup that also sees soft-deleted users.
    pub fn snapshot(&self, nickname: &str) -> Option<User> {
        self.users.get(nickname).map(|u| u.value().clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .get(nickname)
            .filter(|u| !u.is_deleted())
            .map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let Some(nickname) = self.emails.get(email).map(|n| n.value().clone()) else {
            return Ok(None);
        };
        self.find_by_nickname(&nickname).await
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let Entry::Vacant(email_slot) = self.emails.entry(user.email.clone()) else {
            return Err(RepositoryError::Conflict(format!("email {}", user.email)));
        };

        match self.users.entry(user.nickname.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "nickname {}",
                user.nickname
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                email_slot.insert(user.nickname.clone());
                Ok(())
            }
        }
    }

    async fn update_profile(&self, user: &User) -> Result<(), RepositoryError> {
        if let Some(mut stored) = self.users.get_mut(&user.nickname) {
            stored.first_name = user.first_name.clone();
            stored.last_name = user.last_name.clone();
            stored.information = user.information.clone();
            stored.password_hash = user.password_hash.clone();
            stored.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn store_ledger(
        &self,
        nickname: &str,
        rating: i32,
        ledger: &str,
        expected_ledger: &str,
    ) -> Result<bool, RepositoryError> {
        match self.users.get_mut(nickname) {
            Some(mut stored) if !stored.is_deleted() && stored.rating_list == expected_ledger => {
                stored.rating = rating;
                stored.rating_list = ledger.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_vote_cast(
        &self,
        nickname: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if let Some(mut stored) = self.users.get_mut(nickname) {
            stored.voted_at = Some(at);
        }
        Ok(())
    }

    async fn mark_deleted(
        &self,
        nickname: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        match self.users.get_mut(nickname) {
            Some(mut stored) if !stored.is_deleted() => {
                stored.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_rating(&self, offset: u64, limit: u64) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| !u.is_deleted())
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(users.into_iter().skip(offset).take(limit).collect())
    }
}
