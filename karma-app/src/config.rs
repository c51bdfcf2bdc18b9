use chrono::TimeDelta;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for every configured window: ten years.
const MAX_WINDOW_SECS: i64 = 10 * 365 * 24 * 60 * 60;
const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process configuration, read from the environment (and `.env` via
/// `dotenvy` in `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub cache_ttl_secs: u64,
    pub vote_cooldown_secs: i64,
    pub token_ttl_hours: i64,
    pub users_page_size: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let config = Self {
            port: parse_or(&lookup, "PORT", 3000)?,
            database_url: non_blank(lookup("DATABASE_URL")),
            redis_url: non_blank(lookup("REDIS_URL")),
            jwt_secret,
            cache_ttl_secs: parse_or(&lookup, "CACHE_TTL_SECS", 60)?,
            vote_cooldown_secs: parse_or(&lookup, "VOTE_COOLDOWN_SECS", 3600)?,
            token_ttl_hours: parse_or(&lookup, "TOKEN_TTL_HOURS", 24)?,
            users_page_size: parse_or(&lookup, "USERS_PAGE_SIZE", 3)?,
        };

        config.vote_cooldown()?;
        config.token_lifetime()?;
        config.cache_ttl()?;
        if !(1..=MAX_PAGE_SIZE).contains(&config.users_page_size) {
            return Err(out_of_range(
                "USERS_PAGE_SIZE",
                config.users_page_size,
                format!("expected 1..={MAX_PAGE_SIZE}"),
            ));
        }
        Ok(config)
    }

    pub fn vote_cooldown(&self) -> Result<TimeDelta, ConfigError> {
        window(
            "VOTE_COOLDOWN_SECS",
            self.vote_cooldown_secs,
            0,
            TimeDelta::try_seconds(self.vote_cooldown_secs),
        )
    }

    pub fn token_lifetime(&self) -> Result<TimeDelta, ConfigError> {
        window(
            "TOKEN_TTL_HOURS",
            self.token_ttl_hours,
            1,
            TimeDelta::try_hours(self.token_ttl_hours),
        )
    }

    pub fn cache_ttl(&self) -> Result<Duration, ConfigError> {
        let ttl = Duration::from_secs(self.cache_ttl_secs);
        if ttl.as_secs() > MAX_WINDOW_SECS as u64 {
            return Err(out_of_range(
                "CACHE_TTL_SECS",
                self.cache_ttl_secs,
                format!("at most {MAX_WINDOW_SECS} seconds"),
            ));
        }
        Ok(ttl)
    }
}

/// Accepts `delta` when it exists and lies in `min..=MAX_WINDOW_SECS` seconds.
fn window(
    key: &'static str,
    raw: i64,
    min: i64,
    delta: Option<TimeDelta>,
) -> Result<TimeDelta, ConfigError> {
    match delta {
        Some(delta) if raw >= min && delta.num_seconds() <= MAX_WINDOW_SECS => Ok(delta),
        _ => Err(out_of_range(
            key,
            raw,
            format!("expected at least {min}, spanning at most {MAX_WINDOW_SECS} seconds"),
        )),
    }
}

fn out_of_range(key: &'static str, value: impl Display, reason: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match non_blank(lookup(key)) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
