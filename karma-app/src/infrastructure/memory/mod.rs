//! Process-local adapters, used when no external store is configured and
//! throughout the test suites.

mod memory_cache;
mod user_store;

pub use memory_cache::MemoryCache;
pub use user_store::MemoryUserRepository;
