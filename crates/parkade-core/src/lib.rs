//! 🏗 Infrastructure for handling requests, plus the records shared by every
//! component of the parking facility.
#![warn(missing_docs)]

mod error;
mod fees;
mod model;
mod payload;
mod request;

use serde::Deserialize;

pub use error::{ParkingError, StoreError};
pub use fees::{FeeSchedule, FeeTier};
pub use model::{CardNumber, Lot, LotId, Payment, Ticket, TicketNumber};
pub use payload::{Checkout, Entry, LotUpdate, NewLot};
pub use request::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};

/// Identifier of the lot seeded at initialization
pub const DEFAULT_LOT_ID: LotId = 1;

/// Configuration of the parking facility
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Name of the lot seeded at initialization
    pub lot_name: String,
    /// Number of spots in the seeded lot
    pub capacity: u32,
    /// Fee table applied on inquiry
    pub fees: FeeSchedule,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lot_name: String::from("Lot 1"),
            capacity: 3,
            fees: FeeSchedule::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn config_defaults_to_the_legacy_lot() {
        let config = Config::default();
        assert_eq!(config.lot_name, "Lot 1");
        assert_eq!(config.capacity, 3);
        assert_eq!(config.fees, FeeSchedule::default());
    }

    #[test]
    fn config_reads_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            capacity = 40

            [fees]
            overflow = 12.0

            [[fees.tiers]]
            up-to-hours = 2
            amount = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config.capacity, 40);
        assert_eq!(config.lot_name, "Lot 1");
        assert_eq!(config.fees.tiers.len(), 1);
        assert_eq!(config.fees.tiers[0].amount, Decimal::new(500, 2));
        assert_eq!(config.fees.overflow, Decimal::new(1200, 2));
    }
}
