//! Error kinds reported back to callers

use thiserror::Error;

use crate::model::{LotId, TicketNumber};

/// Failure of the underlying record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// A stored record could not be (de)serialized
    #[error("malformed {kind} record: {source}")]
    Malformed {
        /// Kind of the record
        kind: &'static str,
        /// Underlying serialization error
        source: serde_json::Error,
    },
}

/// Outcome of a request that could not be carried out
///
/// Everything except [`ParkingError::Storage`] is an expected outcome the
/// caller can recover from.
#[derive(Debug, Error)]
pub enum ParkingError {
    /// Admission refused, every spot is taken
    #[error("Parking lot is full!")]
    LotFull,
    /// No ticket with the given number
    #[error("Requested ticket {0} not found.")]
    TicketNotFound(TicketNumber),
    /// Settlement attempted on a paid ticket
    #[error("Ticket {0} is already paid.")]
    AlreadyPaid(TicketNumber),
    /// Card number has neither 16 nor 20 digits
    #[error("Credit card format incorrect.")]
    InvalidCardFormat,
    /// No lot with the given id
    #[error("Requested lot {0} not found.")]
    LotNotFound(LotId),
    /// No payment with the given id
    #[error("Requested payment {0} not found.")]
    PaymentNotFound(String),
    /// An unpaid ticket with the same number is still on record
    #[error("Ticket {0} is already issued.")]
    TicketExists(TicketNumber),
    /// Lot definition rejected
    #[error("Invalid lot: {0}")]
    InvalidLot(String),
    /// Request could not be understood
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// Infrastructure failure, the operation was aborted
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ParkingError {
    /// HTTP status code used when reporting the error
    pub fn status(&self) -> u16 {
        use ParkingError::*;
        match self {
            LotFull | AlreadyPaid(_) => 405,
            TicketNotFound(_) | LotNotFound(_) | PaymentNotFound(_) => 404,
            TicketExists(_) => 409,
            InvalidCardFormat | InvalidLot(_) | BadRequest(_) => 400,
            Storage(_) => 500,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        use ParkingError::*;
        match self {
            LotFull => "lot_full",
            TicketNotFound(_) => "ticket_not_found",
            AlreadyPaid(_) => "already_paid",
            InvalidCardFormat => "invalid_card_format",
            LotNotFound(_) => "lot_not_found",
            PaymentNotFound(_) => "payment_not_found",
            TicketExists(_) => "ticket_exists",
            InvalidLot(_) => "invalid_lot",
            BadRequest(_) => "bad_request",
            Storage(_) => "storage",
        }
    }

    /// Whether the error is an infrastructure failure rather than an
    /// expected outcome
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParkingError::Storage(_))
    }
}
