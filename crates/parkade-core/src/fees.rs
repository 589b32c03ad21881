//! Flat-rate fee table

use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One step of the fee table
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeeTier {
    /// Inclusive upper bound of the stay, in whole hours
    pub up_to_hours: u32,
    /// Amount owed for a stay within the bound
    pub amount: Decimal,
}

impl FeeTier {
    fn covers(&self, elapsed: TimeDelta) -> bool {
        elapsed <= TimeDelta::hours(i64::from(self.up_to_hours))
    }
}

/// Tiered flat-rate fee schedule
///
/// A stay is charged the amount of the tightest tier whose bound covers the
/// elapsed time, or [`FeeSchedule::overflow`] if no tier does.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeeSchedule {
    /// Bounded tiers, in any order
    pub tiers: Vec<FeeTier>,
    /// Amount owed past the last bound
    pub overflow: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            tiers: vec![
                FeeTier {
                    up_to_hours: 1,
                    amount: Decimal::new(300, 2),
                },
                FeeTier {
                    up_to_hours: 3,
                    amount: Decimal::new(450, 2),
                },
                FeeTier {
                    up_to_hours: 6,
                    amount: Decimal::new(600, 2),
                },
            ],
            overflow: Decimal::new(750, 2),
        }
    }
}

impl FeeSchedule {
    /// Amount owed for a stay of `elapsed`
    ///
    /// A negative duration (entry stamped after `now`) is charged as an empty
    /// stay, i.e. the cheapest tier.
    pub fn amount_for(&self, elapsed: TimeDelta) -> Decimal {
        let elapsed = elapsed.max(TimeDelta::zero());
        self.tiers
            .iter()
            .filter(|tier| tier.covers(elapsed))
            .min_by_key(|tier| tier.up_to_hours)
            .map_or(self.overflow, |tier| tier.amount)
    }
}
