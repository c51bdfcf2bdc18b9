mod accounts;
mod cast_vote;
pub mod lookups;

pub use accounts::Accounts;
pub use cast_vote::{plan_change, CastVote};
pub use lookups::Lookups;
