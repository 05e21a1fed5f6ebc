//! Balance delta bookkeeping.
//!
//! Pure state: no I/O, so every threshold and clamping rule is testable
//! without a node.

use alloy::primitives::U256;

use crate::monitor::policy::BridgePolicy;

/// Signed difference between two balance observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Increase(U256),
    Decrease(U256),
    Unchanged,
}

/// Result of feeding one balance reading into the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub previous: U256,
    pub current: U256,
    pub change: BalanceChange,
    /// Set when the increase cleared the threshold and the policy yields a
    /// non-zero amount.
    pub bridge_amount: Option<U256>,
}

/// Last known balance plus the trigger rules.
#[derive(Debug, Clone)]
pub struct BalanceTracker {
    last: U256,
    min_increase: U256,
    policy: BridgePolicy,
}

impl BalanceTracker {
    pub fn new(initial: U256, min_increase: U256, policy: BridgePolicy) -> Self {
        Self {
            last: initial,
            min_increase,
            policy,
        }
    }

    /// Re-seed the last known balance.
    pub fn reset(&mut self, balance: U256) {
        self.last = balance;
    }

    pub fn last_balance(&self) -> U256 {
        self.last
    }

    pub fn min_increase(&self) -> U256 {
        self.min_increase
    }

    pub fn policy(&self) -> BridgePolicy {
        self.policy
    }

    /// Record `current` as the new balance and decide whether to bridge.
    ///
    /// Only an increase strictly greater than the threshold triggers. The
    /// last balance is updated whatever the outcome.
    pub fn observe(&mut self, current: U256) -> Observation {
        let previous = self.last;
        let change = if current > previous {
            BalanceChange::Increase(current - previous)
        } else if current < previous {
            BalanceChange::Decrease(previous - current)
        } else {
            BalanceChange::Unchanged
        };

        let bridge_amount = match change {
            BalanceChange::Increase(delta) if delta > self.min_increase => {
                Some(self.policy.amount_for(delta)).filter(|amount| !amount.is_zero())
            }
            _ => None,
        };

        self.last = current;

        Observation {
            previous,
            current,
            change,
            bridge_amount,
        }
    }
}
