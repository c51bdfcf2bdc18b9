use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn sign(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// One voter's entry in a target's ledger.
///
/// Field names follow the stored JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(rename = "VotedRating")]
    pub voted_rating: i32,
    #[serde(rename = "VotedDate")]
    pub voted_date: DateTime<Utc>,
    #[serde(rename = "VotedNickname")]
    pub voted_nickname: String,
}

impl VoteRecord {
    pub fn new(voted_nickname: String, direction: VoteDirection, voted_date: DateTime<Utc>) -> Self {
        Self {
            voted_rating: direction.sign(),
            voted_date,
            voted_nickname,
        }
    }
}

/// What a vote does to the target's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    /// No prior entry from this voter: record the new vote.
    Append(VoteRecord),
    /// The voter previously voted the other way: drop that entry.
    Retract { index: usize },
}
