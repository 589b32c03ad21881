//! Implementation of the ticket lifecycle manager

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parkade_core::{FeeSchedule, LotId, ParkingError, Ticket, TicketNumber, DEFAULT_LOT_ID};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::lot::LotTracker;
use crate::store::Records;

/// Amount owed on a ticket at a given instant
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    /// Ticket the quote is for
    pub ticket_number: TicketNumber,
    /// Entry timestamp of the ticket
    pub time_entered: DateTime<Utc>,
    /// Instant the quote was computed for
    pub quoted_at: DateTime<Utc>,
    /// Length of the stay in whole minutes, never negative
    pub elapsed_minutes: i64,
    /// Amount owed
    pub amount: Decimal,
}

const TICKET_LOCK_STRIPES: usize = 64;

/// Locks keyed by ticket number
///
/// Whatever reads a ticket and then writes it holds the number's lock for the
/// whole exchange. It is always taken before the lot's lock, and a thread
/// never holds two of them.
pub struct TicketLocks {
    stripes: Box<[Mutex<()>]>,
}

impl Default for TicketLocks {
    fn default() -> Self {
        Self {
            stripes: (0..TICKET_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }
}

impl TicketLocks {
    /// Lock `ticket_number`, numbers sharing a stripe wait on each other
    pub fn lock(&self, ticket_number: TicketNumber) -> MutexGuard<'_, ()> {
        let stripe = (ticket_number % self.stripes.len() as u64) as usize;
        self.stripes[stripe].lock()
    }
}

/// Issues tickets on entry and prices them on inquiry
pub struct TicketManager {
    records: Records,
    lots: Arc<LotTracker>,
    numbers: Arc<TicketLocks>,
    fees: FeeSchedule,
    clock: Arc<dyn Clock>,
}

impl TicketManager {
    /// Create a new [`TicketManager`]
    pub fn new(
        records: Records,
        lots: Arc<LotTracker>,
        numbers: Arc<TicketLocks>,
        fees: FeeSchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            lots,
            numbers,
            fees,
            clock,
        }
    }

    /// Admit a vehicle
    ///
    /// Takes a spot in `lot_id` (the default lot if `None`) and records an
    /// unpaid ticket entered at `time_entered` (now if `None`). If the lot is
    /// full, nothing is recorded and [`ParkingError::LotFull`] is returned.
    pub fn admit(
        &self,
        ticket_number: TicketNumber,
        time_entered: Option<DateTime<Utc>>,
        lot_id: Option<LotId>,
    ) -> Result<Ticket, ParkingError> {
        let lot_id = lot_id.unwrap_or(DEFAULT_LOT_ID);
        let time_entered = time_entered.unwrap_or_else(|| self.clock.now());

        let _number = self.numbers.lock(ticket_number);
        self.lots.with_lot(lot_id, |lot| {
            if let Some(existing) = self.records.get::<Ticket>(ticket_number)? {
                if !existing.is_paid {
                    return Err(ParkingError::TicketExists(ticket_number));
                }
            }

            if !lot.try_reserve_spot()? {
                warn!(lot = lot_id, ticket = ticket_number, "lot full, admission refused");
                return Err(ParkingError::LotFull);
            }

            let ticket = Ticket::issue(ticket_number, lot_id, time_entered);
            if let Err(err) = self.records.put(&ticket) {
                // The spot was taken for a ticket that does not exist
                if let Err(undo) = lot.release_spot() {
                    error!(lot = lot_id, %undo, "could not return spot after failed admission");
                }
                return Err(err.into());
            }

            info!(
                lot = lot_id,
                ticket = ticket_number,
                spots_used = lot.lot().spots_used,
                "admitted"
            );
            Ok(ticket)
        })
    }

    /// Amount owed on `ticket` at `now`
    ///
    /// Pure: nothing is recorded.
    pub fn quote(&self, ticket: &Ticket, now: DateTime<Utc>) -> FeeQuote {
        let elapsed = now - ticket.time_entered;
        let amount = self.fees.amount_for(elapsed);
        FeeQuote {
            ticket_number: ticket.ticket_number,
            time_entered: ticket.time_entered,
            quoted_at: now,
            elapsed_minutes: elapsed.num_minutes().max(0),
            amount,
        }
    }

    /// Look up the ticket and quote it at `now` (the clock's now if `None`)
    pub fn quote_for(
        &self,
        ticket_number: TicketNumber,
        now: Option<DateTime<Utc>>,
    ) -> Result<FeeQuote, ParkingError> {
        let ticket = self.ticket(ticket_number)?;
        let quote = self.quote(&ticket, now.unwrap_or_else(|| self.clock.now()));
        debug!(ticket = ticket_number, amount = %quote.amount, "quoted");
        Ok(quote)
    }

    /// Compute the amount owed at `now` (the clock's now if `None`) and
    /// record it as the ticket's `total_owing`
    ///
    /// This is the inquiry the gate terminals use; callers that must not
    /// change the stored ticket use [`Self::quote`].
    pub fn compute_fee(
        &self,
        ticket_number: TicketNumber,
        now: Option<DateTime<Utc>>,
    ) -> Result<Ticket, ParkingError> {
        let now = now.unwrap_or_else(|| self.clock.now());

        let _number = self.numbers.lock(ticket_number);
        let mut ticket = self.ticket(ticket_number)?;
        ticket.total_owing = self.quote(&ticket, now).amount;
        self.records.put(&ticket)?;
        debug!(ticket = ticket_number, amount = %ticket.total_owing, "fee recorded");
        Ok(ticket)
    }

    /// Look up a ticket, `None` if the number is unknown
    pub fn lookup(&self, ticket_number: TicketNumber) -> Result<Option<Ticket>, ParkingError> {
        Ok(self.records.get::<Ticket>(ticket_number)?)
    }

    /// Look up a ticket, reporting an unknown number as
    /// [`ParkingError::TicketNotFound`]
    pub fn ticket(&self, ticket_number: TicketNumber) -> Result<Ticket, ParkingError> {
        self.lookup(ticket_number)?
            .ok_or(ParkingError::TicketNotFound(ticket_number))
    }

    /// Every ticket on record, ordered by number
    pub fn tickets(&self) -> Result<Vec<Ticket>, ParkingError> {
        let mut tickets = self.records.list::<Ticket>()?;
        tickets.sort_by_key(|ticket| ticket.ticket_number);
        Ok(tickets)
    }

    /// Remove a ticket from the record
    ///
    /// An unpaid ticket still holds a spot, which is given back. If the
    /// ticket's lot no longer exists the ticket is simply removed.
    pub fn archive(&self, ticket_number: TicketNumber) -> Result<Ticket, ParkingError> {
        let _number = self.numbers.lock(ticket_number);
        let ticket = self.ticket(ticket_number)?;

        let archived = self.lots.with_lot(ticket.lot_id, |lot| {
            self.records.delete::<Ticket>(ticket_number)?;
            if !ticket.is_paid {
                if let Err(err) = lot.release_spot() {
                    if let Err(undo) = self.records.put(&ticket) {
                        error!(ticket = ticket_number, %undo, "could not restore archived ticket");
                    }
                    return Err(err.into());
                }
            }
            Ok(())
        });

        match archived {
            Err(ParkingError::LotNotFound(_)) => {
                self.records.delete::<Ticket>(ticket_number)?;
            }
            other => other?,
        }
        info!(ticket = ticket_number, paid = ticket.is_paid, "archived");
        Ok(ticket)
    }
}
