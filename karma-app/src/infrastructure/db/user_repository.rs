use super::entities::{user, User};
use crate::domain::{self, RepositoryError, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection, DbErr, SqlErr};

#[derive(Clone)]
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_live(
        &self,
        column: user::Column,
        value: &str,
    ) -> Result<Option<domain::User>, RepositoryError> {
        let found = User::find()
            .filter(column.eq(value))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(backend)?;
        Ok(found.map(Into::into))
    }
}

fn backend(err: DbErr) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<domain::User>, RepositoryError> {
        self.find_live(user::Column::Nickname, nickname).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<domain::User>, RepositoryError> {
        self.find_live(user::Column::Email, email).await
    }

    async fn insert(&self, user_data: &domain::User) -> Result<(), RepositoryError> {
        let active = user::ActiveModel {
            id: Set(user_data.id),
            nickname: Set(user_data.nickname.clone()),
            first_name: Set(user_data.first_name.clone()),
            last_name: Set(user_data.last_name.clone()),
            email: Set(user_data.email.clone()),
            password_hash: Set(user_data.password_hash.clone()),
            information: Set(user_data.information.clone()),
            role: Set(user_data.role.clone()),
            rating: Set(user_data.rating),
            rating_list: Set(user_data.rating_list.clone()),
            created_at: Set(user_data.created_at),
            updated_at: Set(user_data.updated_at),
            deleted_at: Set(user_data.deleted_at),
            voted_at: Set(user_data.voted_at),
        };

        match active.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => {
                    Err(RepositoryError::Conflict(detail))
                }
                _ => Err(backend(err)),
            },
        }
    }

    async fn update_profile(&self, user_data: &domain::User) -> Result<(), RepositoryError> {
        User::update_many()
            .col_expr(user::Column::FirstName, Expr::value(user_data.first_name.clone()))
            .col_expr(user::Column::LastName, Expr::value(user_data.last_name.clone()))
            .col_expr(user::Column::Information, Expr::value(user_data.information.clone()))
            .col_expr(user::Column::PasswordHash, Expr::value(user_data.password_hash.clone()))
            .col_expr(user::Column::UpdatedAt, Expr::value(user_data.updated_at))
            .filter(user::Column::Nickname.eq(user_data.nickname.as_str()))
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn store_ledger(
        &self,
        nickname: &str,
        rating: i32,
        ledger: &str,
        expected_ledger: &str,
    ) -> Result<bool, RepositoryError> {
        let result = User::update_many()
            .col_expr(user::Column::Rating, Expr::value(rating))
            .col_expr(user::Column::RatingList, Expr::value(ledger.to_string()))
            .filter(user::Column::Nickname.eq(nickname))
            .filter(user::Column::RatingList.eq(expected_ledger))
            .filter(user::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected == 1)
    }

    async fn record_vote_cast(
        &self,
        nickname: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        User::update_many()
            .col_expr(user::Column::VotedAt, Expr::value(at))
            .filter(user::Column::Nickname.eq(nickname))
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn mark_deleted(
        &self,
        nickname: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = User::update_many()
            .col_expr(user::Column::DeletedAt, Expr::value(at))
            .filter(user::Column::Nickname.eq(nickname))
            .filter(user::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_by_rating(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<domain::User>, RepositoryError> {
        let users = User::find()
            .filter(user::Column::DeletedAt.is_null())
            .order_by_desc(user::Column::Rating)
            .order_by_asc(user::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(users.into_iter().map(Into::into).collect())
    }
}
