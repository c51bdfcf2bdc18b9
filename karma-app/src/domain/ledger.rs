//! Vote ledger codec.
//!
//! A target's ledger is stored as a JSON array on the user record:
//!
//! ```json
//! [{"VotedRating": 1, "VotedDate": "2024-05-01T10:00:00Z", "VotedNickname": "alice"}]
//! ```
//!
//! An empty column (or a JSON `null`) is the empty ledger.

use super::VoteRecord;
use karma_errors::AppError;
use std::collections::HashSet;

pub fn encode(records: &[VoteRecord]) -> Result<String, AppError> {
    serde_json::to_string(records).map_err(|e| AppError::Encoding(e.to_string()))
}

pub fn decode(raw: &str) -> Result<Vec<VoteRecord>, AppError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Option<Vec<VoteRecord>> =
        serde_json::from_str(raw).map_err(|e| AppError::CorruptLedger(e.to_string()))?;
    let records = records.unwrap_or_default();

    let mut voters = HashSet::with_capacity(records.len());
    for record in &records {
        if record.voted_rating != 1 && record.voted_rating != -1 {
            return Err(AppError::CorruptLedger(format!(
                "vote by {} has sign {}",
                record.voted_nickname, record.voted_rating
            )));
        }
        if !voters.insert(record.voted_nickname.as_str()) {
            return Err(AppError::CorruptLedger(format!(
                "{} voted more than once",
                record.voted_nickname
            )));
        }
    }

    Ok(records)
}

/// Sum of signs; equals the owner's rating whenever the ledger is consistent.
pub fn tally(records: &[VoteRecord]) -> i32 {
    records.iter().map(|r| r.voted_rating).sum()
}

pub fn find_voter<'a>(
    records: &'a [VoteRecord],
    nickname: &str,
) -> Option<(usize, &'a VoteRecord)> {
    records
        .iter()
        .enumerate()
        .find(|(_, r)| r.voted_nickname == nickname)
}
