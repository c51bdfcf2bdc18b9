pub mod ledger;
pub mod ports;
mod user;
mod vote;

pub use ports::{Cache, CacheError, IdentityResolver, RepositoryError, UserRepository};
pub use user::{ProfileChanges, Registration, User, ROLE_ADMIN, ROLE_USER};
pub use vote::{LedgerChange, VoteDirection, VoteRecord};
