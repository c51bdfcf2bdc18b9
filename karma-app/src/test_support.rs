//! Fixtures shared by the unit tests here and the HTTP tests in `karma-api`.

use crate::domain::User;
use chrono::{DateTime, Duration as TimeDelta, Local, Utc};
use mockable::Clock;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}"),
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// A registered member with a placeholder password hash.
pub fn member(nickname: &str) -> User {
    User::new(
        "Test".to_string(),
        "Member".to_string(),
        nickname.to_string(),
        format!("{nickname}@example.com"),
        "not-a-real-hash".to_string(),
        String::new(),
        Utc::now(),
    )
}
