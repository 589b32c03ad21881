//! JSON payloads accepted by the facility

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CardNumber, LotId, TicketNumber};

/// Payload of [`RequestKind::CreateLot`](crate::RequestKind::CreateLot)
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLot {
    /// Display name
    pub name: String,
    /// Number of spots
    pub capacity: u32,
}

/// Payload of [`RequestKind::UpdateLot`](crate::RequestKind::UpdateLot), absent fields are left as they are
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

/// Payload of [`RequestKind::Admit`](crate::RequestKind::Admit)
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Number printed on the ticket
    pub ticket_number: TicketNumber,
    /// Entry timestamp, the facility's clock if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_entered: Option<DateTime<Utc>>,
    /// Lot entered, the default lot if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<LotId>,
}

/// Payload of [`RequestKind::Settle`](crate::RequestKind::Settle)
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    /// Ticket being paid
    pub ticket_number: TicketNumber,
    /// Card paying it
    pub card_number: CardNumber,
}
