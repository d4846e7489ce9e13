//! Per-delegation principal and undelegation lockup accounting.
//!
//! Each (delegator, validator) pair carries a principal amount plus an
//! ordered queue of pending undelegations tagged with the epoch they were
//! requested. The queue governs when locked tokens become withdrawable.
//!
//! # Invariants
//!
//! - Entries stay in insertion order; duplicate epochs are allowed (each
//!   `undelegate` call appends its own entry).
//! - At all times `initial stake = amount + total_in_undelegation + released`.
//! - An entry has exactly two states: pending in the queue, or removed by
//!   [`Delegation::remove_unlocked_undelegations`]. There is no intermediate.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{Address, Epoch};

/// Rejection of an undelegation request. Returned verbatim to the staking
/// transaction handler; nothing here mutates the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelegationError {
    /// The requested amount is zero or exceeds the current principal.
    #[error("invalid undelegation amount {amount} (principal {principal})")]
    InvalidAmount { amount: U256, principal: U256 },

    /// The undelegation would leave a non-zero remainder below the floor.
    #[error("Minimum: {minimum}, Remaining: {remaining}: remaining delegation must be 0 or >= 100 ONE")]
    RemainingBelowMinimum { minimum: U256, remaining: U256 },
}

/// One pending undelegation: the amount and the epoch it was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Undelegation {
    pub amount: U256,
    pub epoch: Epoch,
}

/// The stake a delegator holds with one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    /// Principal currently staked.
    pub amount: U256,
    /// Accumulated rewards. Opaque to the lockup engine; carried with the
    /// record for the reward-collection handlers.
    pub reward: U256,
    /// Pending undelegations, in insertion order.
    pub undelegations: Vec<Undelegation>,
}

impl Delegation {
    pub fn new(delegator: Address, amount: U256) -> Self {
        Self {
            delegator,
            amount,
            reward: U256::zero(),
            undelegations: Vec::new(),
        }
    }

    /// Move `amount` from the principal into the pending queue at `epoch`.
    ///
    /// With `min_remaining` set, a request that would leave a non-zero
    /// principal below that floor is rejected; draining the principal to
    /// exactly zero is always allowed.
    pub fn undelegate(
        &mut self,
        epoch: Epoch,
        amount: U256,
        min_remaining: Option<U256>,
    ) -> Result<(), DelegationError> {
        if amount.is_zero() || amount > self.amount {
            return Err(DelegationError::InvalidAmount {
                amount,
                principal: self.amount,
            });
        }

        if let Some(minimum) = min_remaining {
            let remaining = self.amount - amount;
            if !remaining.is_zero() && remaining < minimum {
                return Err(DelegationError::RemainingBelowMinimum { minimum, remaining });
            }
        }

        self.amount -= amount;
        self.undelegations.push(Undelegation { amount, epoch });
        debug!(
            delegator = ?self.delegator,
            epoch,
            %amount,
            "queued undelegation"
        );
        Ok(())
    }

    /// Sum of all pending undelegation amounts.
    pub fn total_in_undelegation(&self) -> U256 {
        self.undelegations
            .iter()
            .fold(U256::zero(), |total, entry| total + entry.amount)
    }

    /// Remove every pending entry requested at `epoch`, preserving the order
    /// of the remainder. Missing epochs are a silent no-op.
    ///
    /// Used when a redelegation merges pending funds back into the principal.
    pub fn delete_entry(&mut self, epoch: Epoch) {
        self.undelegations.retain(|entry| entry.epoch != epoch);
    }

    /// Drop every entry whose lockup has expired and return the sum released.
    ///
    /// An entry unlocks when any of the following holds:
    ///
    /// 1. the full lock period has elapsed since it was requested;
    /// 2. the lock period is zero (immediate unlock policy);
    /// 3. the validator left the committee before `cur_epoch`, the entry was
    ///    requested after that exit, and a full lock period has elapsed since
    ///    the exit.
    ///
    /// With `no_early_unlock`, only the first rule applies. Not idempotent
    /// across calls with an advancing `cur_epoch`.
    pub fn remove_unlocked_undelegations(
        &mut self,
        cur_epoch: Epoch,
        last_epoch_in_committee: Epoch,
        lock_period: u64,
        no_early_unlock: bool,
    ) -> U256 {
        let mut released = U256::zero();
        self.undelegations.retain(|entry| {
            let full_period = entry
                .epoch
                .checked_add(lock_period)
                .map_or(false, |unlock_at| cur_epoch >= unlock_at);

            let unlocked = if no_early_unlock {
                full_period
            } else {
                let post_committee = cur_epoch > last_epoch_in_committee
                    && entry.epoch > last_epoch_in_committee
                    && last_epoch_in_committee
                        .checked_add(lock_period)
                        .map_or(false, |unlock_at| cur_epoch >= unlock_at);
                full_period || lock_period == 0 || post_committee
            };

            if unlocked {
                released += entry.amount;
            }
            !unlocked
        });

        if !released.is_zero() {
            debug!(delegator = ?self.delegator, cur_epoch, %released, "released unlocked undelegations");
        }
        released
    }
}
