use crate::domain::{
    ledger, IdentityResolver, LedgerChange, User, UserRepository, VoteDirection, VoteRecord,
};
use crate::infrastructure::security::VoteLocks;
use chrono::{DateTime, Duration, Utc};
use karma_errors::AppError;
use mockable::Clock;
use std::sync::Arc;

/// Checks a vote must pass, applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoteRule {
    Cooldown,
    SelfVote,
}

/// Rules that only need the sender; they run before the target is loaded.
const SENDER_RULES: &[VoteRule] = &[VoteRule::Cooldown];
/// Rules that need both parties.
const PAIR_RULES: &[VoteRule] = &[VoteRule::SelfVote];

struct RuleInput<'a> {
    sender: &'a User,
    target: Option<&'a User>,
    now: DateTime<Utc>,
    cooldown: Duration,
}

impl VoteRule {
    fn name(self) -> &'static str {
        match self {
            Self::Cooldown => "cooldown",
            Self::SelfVote => "self-vote",
        }
    }

    fn check(self, input: &RuleInput<'_>) -> Result<(), AppError> {
        match self {
            Self::Cooldown => {
                let Some(last_vote) = input.sender.voted_at else {
                    return Ok(());
                };
                let elapsed = input.now - last_vote;
                if elapsed < input.cooldown {
                    let wait = (input.cooldown - elapsed).num_seconds().max(1);
                    return Err(AppError::RateLimited(wait));
                }
                Ok(())
            }
            Self::SelfVote => match input.target {
                Some(target) if target.nickname == input.sender.nickname => {
                    Err(AppError::SelfVote)
                }
                _ => Ok(()),
            },
        }
    }

    fn run_all(rules: &[Self], input: &RuleInput<'_>) -> Result<(), AppError> {
        for rule in rules {
            if let Err(err) = rule.check(input) {
                tracing::debug!(
                    rule = rule.name(),
                    voter = %input.sender.nickname,
                    "Vote rejected: {}",
                    err
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Works out what `voter` voting `direction` does to an existing ledger.
pub fn plan_change(
    records: &[VoteRecord],
    voter: &str,
    direction: VoteDirection,
    now: DateTime<Utc>,
) -> Result<LedgerChange, AppError> {
    match ledger::find_voter(records, voter) {
        Some((_, existing)) if existing.voted_rating == direction.sign() => {
            Err(AppError::DuplicateVote)
        }
        Some((index, _)) => Ok(LedgerChange::Retract { index }),
        None => Ok(LedgerChange::Append(VoteRecord::new(
            voter.to_string(),
            direction,
            now,
        ))),
    }
}

/// Peer reputation voting.
///
/// Votes on the same nickname are serialized in-process through
/// [`VoteLocks`]; the target write is additionally conditional on the ledger
/// it was computed from, so a competing writer in another process makes the
/// vote fail instead of silently overwriting it.
pub struct CastVote {
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock + Send + Sync>,
    locks: VoteLocks,
    cooldown: Duration,
}

impl CastVote {
    pub fn new(
        users: Arc<dyn UserRepository>,
        identity: Arc<dyn IdentityResolver>,
        clock: Arc<dyn Clock + Send + Sync>,
        cooldown: Duration,
    ) -> Self {
        Self {
            users,
            identity,
            clock,
            locks: VoteLocks::new(),
            cooldown,
        }
    }

    /// Casts a vote and returns the target's new rating.
    pub async fn execute(
        &self,
        credential: &str,
        target_nickname: &str,
        direction: VoteDirection,
    ) -> Result<i32, AppError> {
        let voter = self.identity.resolve(credential)?;
        let _guard = self
            .locks
            .acquire(&[voter.as_str(), target_nickname])
            .await;
        let now = self.clock.utc();

        let sender = self
            .users
            .find_by_nickname(&voter)
            .await?
            .ok_or_else(|| AppError::SenderNotFound(voter.clone()))?;

        let mut input = RuleInput {
            sender: &sender,
            target: None,
            now,
            cooldown: self.cooldown,
        };
        VoteRule::run_all(SENDER_RULES, &input)?;

        let target = self
            .users
            .find_by_nickname(target_nickname)
            .await?
            .ok_or_else(|| AppError::TargetNotFound(target_nickname.to_string()))?;

        input.target = Some(&target);
        VoteRule::run_all(PAIR_RULES, &input)?;

        let mut records = ledger::decode(&target.rating_list)?;
        match plan_change(&records, &voter, direction, now)? {
            LedgerChange::Append(record) => records.push(record),
            LedgerChange::Retract { index } => {
                records.remove(index);
            }
        }

        let new_rating = target.rating + direction.sign();
        if ledger::tally(&records) != new_rating {
            tracing::warn!(
                target = %target.nickname,
                rating = new_rating,
                "Stored rating disagrees with its vote list"
            );
        }
        let encoded = ledger::encode(&records)?;

        let stored = self
            .users
            .store_ledger(&target.nickname, new_rating, &encoded, &target.rating_list)
            .await?;
        if !stored {
            return Err(AppError::Persistence(format!(
                "vote list of {} changed concurrently, retry",
                target.nickname
            )));
        }

        if let Err(err) = self.users.record_vote_cast(&sender.nickname, now).await {
            // The rating change is already stored; nothing rolls it back.
            tracing::error!(
                voter = %sender.nickname,
                target = %target.nickname,
                "Vote stored but sender timestamp was not: {}",
                err
            );
            return Err(err.into());
        }

        tracing::info!(
            voter = %sender.nickname,
            target = %target.nickname,
            direction = ?direction,
            rating = new_rating,
            "Vote recorded"
        );
        Ok(new_rating)
    }
}
