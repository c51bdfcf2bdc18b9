mod validation;
mod vote_locks;

pub use validation::InputValidator;
pub use vote_locks::{VoteLockGuard, VoteLocks};
