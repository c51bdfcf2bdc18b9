use crate::domain::{ProfileChanges, Registration, User, UserRepository};
use crate::infrastructure::auth::{hash_password, verify_password, JwtTokens};
use crate::infrastructure::security::InputValidator;
use karma_errors::AppError;
use mockable::Clock;
use std::sync::Arc;

/// Registration, login, profile edits and admin removal.
pub struct Accounts {
    users: Arc<dyn UserRepository>,
    tokens: JwtTokens,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Accounts {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: JwtTokens,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            users,
            tokens,
            clock,
        }
    }

    pub async fn register(&self, form: Registration) -> Result<User, AppError> {
        let email = form.email.trim().to_lowercase();

        InputValidator::check(
            InputValidator::is_valid_name(&form.first_name),
            "incorrect first name",
        )?;
        InputValidator::check(
            InputValidator::is_valid_name(&form.last_name),
            "incorrect last name",
        )?;
        InputValidator::check(
            InputValidator::is_valid_nickname(&form.nickname),
            "incorrect nickname",
        )?;
        InputValidator::check(InputValidator::is_valid_email(&email), "incorrect email")?;
        InputValidator::check(
            InputValidator::is_valid_password(&form.password),
            "incorrect password",
        )?;

        if self.users.find_by_nickname(&form.nickname).await?.is_some()
            || self.users.find_by_email(&email).await?.is_some()
        {
            return Err(AppError::UserExists);
        }

        let user = User::new(
            form.first_name,
            form.last_name,
            form.nickname,
            email,
            hash_password(&form.password)?,
            form.information,
            self.clock.utc(),
        );
        self.users.insert(&user).await?;

        tracing::info!(nickname = %user.nickname, "User registered");
        Ok(user)
    }

    /// Checks the password and returns a signed credential.
    pub async fn login(&self, nickname: &str, password: &str) -> Result<String, AppError> {
        if nickname.is_empty() || password.is_empty() {
            return Err(AppError::LoginFailed(
                "nickname or password not exist".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_nickname(nickname)
            .await?
            .ok_or_else(|| AppError::LoginFailed(format!("user {nickname} not found")))?;

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(nickname = %nickname, "Login with wrong password");
            return Err(AppError::LoginFailed("password incorrect".to_string()));
        }

        self.tokens.issue(&user, self.clock.utc())
    }

    /// Applies the non-empty fields of `changes` to `nickname`'s profile.
    pub async fn edit_profile(
        &self,
        nickname: &str,
        changes: ProfileChanges,
    ) -> Result<User, AppError> {
        let mut user = self
            .users
            .find_by_nickname(nickname)
            .await?
            .ok_or_else(|| AppError::UserNotFound(nickname.to_string()))?;

        if let Some(first_name) = non_empty(changes.first_name) {
            InputValidator::check(
                InputValidator::is_valid_name(&first_name),
                "incorrect first name",
            )?;
            user.first_name = first_name;
        }
        if let Some(last_name) = non_empty(changes.last_name) {
            InputValidator::check(
                InputValidator::is_valid_name(&last_name),
                "incorrect last name",
            )?;
            user.last_name = last_name;
        }
        if let Some(password) = non_empty(changes.password) {
            InputValidator::check(
                InputValidator::is_valid_password(&password),
                "incorrect password",
            )?;
            user.password_hash = hash_password(&password)?;
        }
        if let Some(information) = non_empty(changes.information) {
            user.information = information;
        }
        user.updated_at = Some(self.clock.utc());

        self.users.update_profile(&user).await?;
        Ok(user)
    }

    /// Soft-deletes a user. Returns `false` if there was no such user.
    pub async fn delete(&self, nickname: &str) -> Result<bool, AppError> {
        let deleted = self.users.mark_deleted(nickname, self.clock.utc()).await?;
        if deleted {
            tracing::info!(nickname = %nickname, "User deleted");
        }
        Ok(deleted)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdentityResolver;
    use crate::infrastructure::memory::MemoryUserRepository;
    use crate::test_support::{member, MutableClock};
    use chrono::{Duration, Utc};

    fn accounts() -> (MemoryUserRepository, Accounts) {
        let repo = MemoryUserRepository::new();
        let accounts = Accounts::new(
            Arc::new(repo.clone()),
            JwtTokens::new("test-secret", Duration::hours(24)),
            Arc::new(MutableClock::new(Utc::now())),
        );
        (repo, accounts)
    }

    fn registration(nickname: &str) -> Registration {
        Registration {
            first_name: "Oleksii".to_string(),
            last_name: "Petrenko".to_string(),
            nickname: nickname.to_string(),
            email: format!("{nickname}@Example.com"),
            password: "Qwerty1123@#".to_string(),
            information: "likes rust".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_blank_reputation() {
        let (repo, accounts) = accounts();
        let user = accounts.register(registration("dave_01")).await.unwrap();

        assert_eq!(user.email, "dave_01@example.com");
        assert_eq!(user.rating, 0);
        assert!(user.rating_list.is_empty());
        assert_eq!(user.role, "user");
        assert_ne!(user.password_hash, "Qwerty1123@#");
        assert!(repo.snapshot("dave_01").is_some());
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let (_, accounts) = accounts();
        let mut form = registration("x!");
        form.first_name = "Al".to_string();
        form.password = "weak".to_string();

        assert_eq!(
            accounts.register(form.clone()).await,
            Err(AppError::Validation("incorrect first name".to_string()))
        );

        form.first_name = "Alice".to_string();
        assert_eq!(
            accounts.register(form.clone()).await,
            Err(AppError::Validation("incorrect nickname".to_string()))
        );

        form.nickname = "alice".to_string();
        assert_eq!(
            accounts.register(form).await,
            Err(AppError::Validation("incorrect password".to_string()))
        );
    }

    #[tokio::test]
    async fn test_register_rejects_existing_user() {
        let (_, accounts) = accounts();
        accounts.register(registration("dave")).await.unwrap();

        assert_eq!(
            accounts.register(registration("dave")).await,
            Err(AppError::UserExists)
        );

        let mut same_email = registration("david");
        same_email.email = "DAVE@example.com".to_string();
        assert_eq!(accounts.register(same_email).await, Err(AppError::UserExists));
    }

    #[tokio::test]
    async fn test_login_issues_resolvable_token() {
        let (_, accounts) = accounts();
        accounts.register(registration("dave")).await.unwrap();

        let token = accounts.login("dave", "Qwerty1123@#").await.unwrap();
        let tokens = JwtTokens::new("test-secret", Duration::hours(24));
        assert_eq!(tokens.resolve(&token).unwrap(), "dave");

        assert!(matches!(
            accounts.login("dave", "Qwerty1123@").await,
            Err(AppError::LoginFailed(_))
        ));
        assert!(matches!(
            accounts.login("nobody", "Qwerty1123@#").await,
            Err(AppError::LoginFailed(_))
        ));
        assert!(matches!(
            accounts.login("", "").await,
            Err(AppError::LoginFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_profile_touches_only_given_fields() {
        let (repo, accounts) = accounts();
        repo.insert(&member("dave")).await.unwrap();

        let changes = ProfileChanges {
            first_name: Some("David".to_string()),
            information: Some(String::new()),
            ..Default::default()
        };
        let edited = accounts.edit_profile("dave", changes).await.unwrap();

        assert_eq!(edited.first_name, "David");
        assert_eq!(edited.last_name, "Member");
        assert!(edited.updated_at.is_some());
        assert_eq!(repo.snapshot("dave").unwrap().first_name, "David");
    }

    #[tokio::test]
    async fn test_edit_profile_validates() {
        let (repo, accounts) = accounts();
        repo.insert(&member("dave")).await.unwrap();

        let changes = ProfileChanges {
            last_name: Some("M4ll0ry".to_string()),
            ..Default::default()
        };
        assert_eq!(
            accounts.edit_profile("dave", changes).await,
            Err(AppError::Validation("incorrect last name".to_string()))
        );
        assert!(matches!(
            accounts.edit_profile("ghost", ProfileChanges::default()).await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let (repo, accounts) = accounts();
        repo.insert(&member("dave")).await.unwrap();

        assert!(accounts.delete("dave").await.unwrap());
        assert!(!accounts.delete("dave").await.unwrap());
        assert!(repo.snapshot("dave").unwrap().deleted_at.is_some());
    }
}
