pub mod domain;

pub mod application;

pub mod infrastructure;

pub mod config;

mod app_context;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use app_context::AppContext;
pub use config::AppConfig;
