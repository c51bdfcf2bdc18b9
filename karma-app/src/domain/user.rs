use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// A member's persisted identity, profile and reputation.
///
/// `rating_list` is the encoded vote ledger (see [`super::ledger`]); it is kept
/// opaque here so the stored representation never drifts from what the
/// repository reads back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: uuid::Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub information: String,
    pub role: String,
    pub rating: i32,
    pub rating_list: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub voted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        first_name: String,
        last_name: String,
        nickname: String,
        email: String,
        password_hash: String,
        information: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            first_name,
            last_name,
            nickname,
            email,
            password_hash,
            information,
            role: ROLE_USER.to_string(),
            rating: 0,
            rating_list: String::new(),
            created_at,
            updated_at: None,
            deleted_at: None,
            voted_at: None,
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Optional profile changes submitted through the edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub information: Option<String>,
}

/// Registration form as received from the client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub information: String,
}
