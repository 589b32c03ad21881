//! Records kept for the facility

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a [`Lot`]
pub type LotId = u64;

/// Number printed on a ticket, handed out at the gate and used at checkout
pub type TicketNumber = u64;

/// A parking lot with a fixed number of spots
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    /// Identifier of the lot
    pub id: LotId,
    /// Display name
    pub name: String,
    /// Number of spots
    pub capacity: u32,
    /// Number of occupied spots
    pub spots_used: u32,
    /// Whether every spot is occupied
    pub is_full: bool,
}

impl Lot {
    /// Create an empty lot
    pub fn new(id: LotId, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            spots_used: 0,
            is_full: capacity == 0,
        }
    }

    /// Number of free spots
    #[inline]
    pub fn spots_free(&self) -> u32 {
        self.capacity.saturating_sub(self.spots_used)
    }

    /// Take one spot, returns `false` if none is free
    pub fn try_reserve_spot(&mut self) -> bool {
        if self.spots_used >= self.capacity {
            return false;
        }
        self.spots_used += 1;
        self.is_full = self.spots_used == self.capacity;
        true
    }

    /// Give one spot back, never going below zero
    pub fn release_spot(&mut self) {
        self.spots_used = self.spots_used.saturating_sub(1);
        self.is_full = self.spots_used == self.capacity;
    }
}

/// One vehicle's stay, from entry until payment
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Record identifier
    pub id: Uuid,
    /// Externally supplied lookup key
    pub ticket_number: TicketNumber,
    /// Lot holding the vehicle
    pub lot_id: LotId,
    /// Entry timestamp
    pub time_entered: DateTime<Utc>,
    /// Amount owed as of the last fee inquiry
    pub total_owing: Decimal,
    /// Whether the ticket has been settled
    pub is_paid: bool,
}

impl Ticket {
    /// Issue a fresh, unpaid ticket
    pub fn issue(ticket_number: TicketNumber, lot_id: LotId, time_entered: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_number,
            lot_id,
            time_entered,
            total_owing: Decimal::ZERO,
            is_paid: false,
        }
    }
}

/// Card number given at checkout
///
/// Only the length of its decimal form is ever checked. In JSON it is a plain
/// integer, 20 digits may exceed `u64::MAX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(pub u128);

impl CardNumber {
    /// Number of digits in the decimal form
    pub fn digits(self) -> u32 {
        self.0.checked_ilog10().map_or(1, |log| log + 1)
    }

    /// Whether the number has one of the accepted lengths (16 or 20 digits)
    pub fn is_well_formed(self) -> bool {
        matches!(self.digits(), 16 | 20)
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An accepted payment for a ticket
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Record identifier
    pub id: Uuid,
    /// Ticket the payment settles
    pub ticket_number: TicketNumber,
    /// Card used to pay
    pub card_number: CardNumber,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_never_overfills() {
        let mut lot = Lot::new(1, "Lot 1", 2);
        assert!(lot.try_reserve_spot());
        assert!(!lot.is_full);
        assert!(lot.try_reserve_spot());
        assert!(lot.is_full);
        assert!(!lot.try_reserve_spot());
        assert_eq!(lot.spots_used, 2);
        assert_eq!(lot.spots_free(), 0);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut lot = Lot::new(1, "Lot 1", 1);
        lot.release_spot();
        assert_eq!(lot.spots_used, 0);
        assert!(!lot.is_full);
        assert!(lot.try_reserve_spot());
        lot.release_spot();
        lot.release_spot();
        assert_eq!(lot.spots_used, 0);
    }

    #[test]
    fn card_digit_count() {
        assert_eq!(CardNumber(0).digits(), 1);
        assert_eq!(CardNumber(9).digits(), 1);
        assert_eq!(CardNumber(10).digits(), 2);
        assert_eq!(CardNumber(1234_1234_1234_1234).digits(), 16);
        assert_eq!(CardNumber(9999_9999_9999_9999).digits(), 16);
        assert_eq!(CardNumber(1_0000_0000_0000_0000).digits(), 17);
    }

    #[test]
    fn card_lengths() {
        assert!(!CardNumber(123_4123_4123_4123).is_well_formed());
        assert!(CardNumber(1234_1234_1234_1234).is_well_formed());
        assert!(!CardNumber(1_2341_2341_2341_2341).is_well_formed());
        assert!(CardNumber(1234_1234_1234_1234_1234).is_well_formed());
    }

    #[test]
    fn long_cards_are_plain_json_integers() {
        let card = CardNumber(9876_5432_1098_7654_3210);
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, "98765432109876543210");
        assert_eq!(serde_json::from_str::<CardNumber>(&json).unwrap(), card);
    }

    #[test]
    fn card_rejects_garbage() {
        assert!(serde_json::from_str::<CardNumber>(r#""1234123412341234""#).is_err());
        assert!(serde_json::from_str::<CardNumber>("-5").is_err());
        assert!(serde_json::from_str::<CardNumber>("1.5").is_err());
    }

    #[test]
    fn ticket_serializes_camel_case() {
        let ticket = Ticket::issue(7, 1, DateTime::from_timestamp(0, 0).unwrap());
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["ticketNumber"], 7);
        assert_eq!(json["isPaid"], false);
        assert_eq!(json["totalOwing"], 0.0);
    }
}
