//! Implementation of the payment settler

use std::sync::Arc;

use parkade_core::{CardNumber, ParkingError, Payment, Ticket, TicketNumber};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::lot::LotTracker;
use crate::store::Records;
use crate::tickets::TicketLocks;

/// Validates payments and frees the spot of every settled ticket
pub struct PaymentSettler {
    records: Records,
    lots: Arc<LotTracker>,
    numbers: Arc<TicketLocks>,
}

impl PaymentSettler {
    /// Create a new [`PaymentSettler`]
    pub fn new(records: Records, lots: Arc<LotTracker>, numbers: Arc<TicketLocks>) -> Self {
        Self {
            records,
            lots,
            numbers,
        }
    }

    /// Pay a ticket
    ///
    /// Checks, in this order, that the ticket exists, that it is unpaid and
    /// that the card number has 16 or 20 digits. Then records the payment,
    /// marks the ticket paid and frees its spot. Either all three happen or,
    /// if the store fails part way, none of them.
    pub fn settle(
        &self,
        ticket_number: TicketNumber,
        card_number: CardNumber,
    ) -> Result<Payment, ParkingError> {
        let _number = self.numbers.lock(ticket_number);
        let mut ticket = self.checked_ticket(ticket_number, card_number)?;

        self.lots.with_lot(ticket.lot_id, |lot| {
            let payment = Payment {
                id: Uuid::new_v4(),
                ticket_number,
                card_number,
            };
            self.records.put(&payment)?;

            ticket.is_paid = true;
            if let Err(err) = self.records.put(&ticket) {
                self.undo_payment(&payment);
                return Err(err.into());
            }

            if let Err(err) = lot.release_spot() {
                ticket.is_paid = false;
                if let Err(undo) = self.records.put(&ticket) {
                    error!(ticket = ticket_number, %undo, "could not mark ticket unpaid again");
                }
                self.undo_payment(&payment);
                return Err(err.into());
            }

            info!(
                ticket = ticket_number,
                payment = %payment.id,
                lot = lot.lot().id,
                spots_used = lot.lot().spots_used,
                "settled"
            );
            Ok(payment)
        })
    }

    fn checked_ticket(
        &self,
        ticket_number: TicketNumber,
        card_number: CardNumber,
    ) -> Result<Ticket, ParkingError> {
        let ticket = self
            .records
            .get::<Ticket>(ticket_number)?
            .ok_or(ParkingError::TicketNotFound(ticket_number))?;
        if ticket.is_paid {
            warn!(ticket = ticket_number, "settlement of a paid ticket refused");
            return Err(ParkingError::AlreadyPaid(ticket_number));
        }
        if !card_number.is_well_formed() {
            warn!(
                ticket = ticket_number,
                digits = card_number.digits(),
                "card number refused"
            );
            return Err(ParkingError::InvalidCardFormat);
        }
        Ok(ticket)
    }

    fn undo_payment(&self, payment: &Payment) {
        if let Err(undo) = self.records.delete::<Payment>(payment.id) {
            error!(payment = %payment.id, %undo, "could not remove payment of failed settlement");
        }
    }

    /// Look up a payment
    pub fn payment(&self, id: Uuid) -> Result<Payment, ParkingError> {
        self.records
            .get::<Payment>(id)?
            .ok_or_else(|| ParkingError::PaymentNotFound(id.to_string()))
    }

    /// Every accepted payment, ordered by ticket number
    pub fn payments(&self) -> Result<Vec<Payment>, ParkingError> {
        let mut payments = self.records.list::<Payment>()?;
        payments.sort_by_key(|payment| (payment.ticket_number, payment.id));
        Ok(payments)
    }
}
