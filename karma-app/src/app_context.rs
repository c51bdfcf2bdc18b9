use crate::application::{Accounts, CastVote, Lookups};
use crate::config::{AppConfig, ConfigError};
use crate::domain::{Cache, UserRepository};
use crate::infrastructure::auth::JwtTokens;
use crate::infrastructure::cache::RedisCache;
use crate::infrastructure::db::{create_connection, run_migrations, SeaOrmUserRepository};
use crate::infrastructure::memory::{MemoryCache, MemoryUserRepository};
use karma_errors::AppError;
use mockable::{Clock, DefaultClock};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub cast_vote: Arc<CastVote>,
    pub accounts: Arc<Accounts>,
    pub lookups: Arc<Lookups>,
    pub tokens: JwtTokens,
}

impl AppContext {
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, AppError> {
        let config_error = |e: ConfigError| AppError::Config(e.to_string());
        let tokens = JwtTokens::new(
            &config.jwt_secret,
            config.token_lifetime().map_err(config_error)?,
        );

        Ok(Self {
            cast_vote: Arc::new(CastVote::new(
                users.clone(),
                Arc::new(tokens.clone()),
                clock.clone(),
                config.vote_cooldown().map_err(config_error)?,
            )),
            accounts: Arc::new(Accounts::new(users.clone(), tokens.clone(), clock)),
            lookups: Arc::new(Lookups::new(
                users,
                cache,
                config.cache_ttl().map_err(config_error)?,
                config.users_page_size,
            )),
            tokens,
        })
    }

    /// Connects the configured backends, falling back to in-process stores
    /// when a URL is absent.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let users: Arc<dyn UserRepository> = match &config.database_url {
            Some(url) => {
                let db = create_connection(url)
                    .await
                    .map_err(|e| AppError::Config(format!("database connect error: {e}")))?;
                run_migrations(&db)
                    .await
                    .map_err(|e| AppError::Config(format!("database migration error: {e}")))?;
                tracing::info!("Using PostgreSQL user store");
                Arc::new(SeaOrmUserRepository::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, users are kept in memory");
                Arc::new(MemoryUserRepository::new())
            }
        };

        let cache: Arc<dyn Cache> = match &config.redis_url {
            Some(url) => {
                let cache = RedisCache::connect(url)
                    .await
                    .map_err(|e| AppError::Config(format!("redis connect error: {e}")))?;
                tracing::info!("Using Redis cache");
                Arc::new(cache)
            }
            None => {
                tracing::warn!("REDIS_URL not set, caching in memory");
                Arc::new(MemoryCache::new())
            }
        };

        Self::new(config, users, cache, Arc::new(DefaultClock))
    }
}
