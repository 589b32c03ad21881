//! Implementation of the request handler fronting the facility
use std::sync::Arc;

use parkade_core::{
    CardNumber, Checkout, Entry, Lot, LotId, LotUpdate, NewLot, ParkingError, Payment, Request,
    RequestHandler, RequestKind, Ticket, TicketNumber, DEFAULT_LOT_ID,
};
use serde::Serialize;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::lot::LotTracker;
use crate::payments::PaymentSettler;
use crate::tickets::{FeeQuote, TicketManager};

/// Body of a successful response
#[derive(Serialize)]
#[serde(untagged)]
enum Body {
    Lot(Lot),
    Lots(Vec<Lot>),
    Ticket(Ticket),
    Tickets(Vec<Ticket>),
    Quote(FeeQuote),
    Payment(Payment),
    Payments(Vec<Payment>),
}

struct Reply {
    status: u16,
    body: Option<Body>,
}

impl Reply {
    fn ok(body: Body) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    fn created(body: Body) -> Self {
        Self {
            status: 201,
            body: Some(body),
        }
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }
}

/// The parking facility: lot capacity tracker, ticket lifecycle manager and
/// payment settler behind one [`RequestHandler`]
///
/// ⚠️ Shared by every handler thread of the server, all methods take `&self`.
pub struct Facility {
    lots: Arc<LotTracker>,
    tickets: TicketManager,
    payments: PaymentSettler,
}

impl Facility {
    /// Create a new [`Facility`]
    pub fn new(lots: Arc<LotTracker>, tickets: TicketManager, payments: PaymentSettler) -> Self {
        Self {
            lots,
            tickets,
            payments,
        }
    }

    /// The lot capacity tracker
    #[inline]
    pub fn lots(&self) -> &LotTracker {
        &self.lots
    }

    /// The ticket lifecycle manager
    #[inline]
    pub fn tickets(&self) -> &TicketManager {
        &self.tickets
    }

    /// The payment settler
    #[inline]
    pub fn payments(&self) -> &PaymentSettler {
        &self.payments
    }

    /// Admit a vehicle into the default lot, entered now
    pub fn admit(&self, ticket_number: TicketNumber) -> Result<Ticket, ParkingError> {
        self.tickets.admit(ticket_number, None, None)
    }

    /// Compute and record the amount owed on a ticket as of now
    pub fn compute_fee(&self, ticket_number: TicketNumber) -> Result<Ticket, ParkingError> {
        self.tickets.compute_fee(ticket_number, None)
    }

    /// Pay a ticket
    pub fn settle(
        &self,
        ticket_number: TicketNumber,
        card_number: CardNumber,
    ) -> Result<Payment, ParkingError> {
        self.payments.settle(ticket_number, card_number)
    }

    /// Occupancy of a lot
    pub fn lot_status(&self, lot_id: LotId) -> Result<Lot, ParkingError> {
        self.lots.status(lot_id)
    }

    /// Look up a ticket, `None` if the number is unknown
    pub fn ticket(&self, ticket_number: TicketNumber) -> Result<Option<Ticket>, ParkingError> {
        self.tickets.lookup(ticket_number)
    }

    fn dispatch(&self, rq: &mut Request) -> Result<Reply, ParkingError> {
        Ok(match *rq.kind() {
            RequestKind::ListLots => Reply::ok(Body::Lots(self.lots.lots()?)),
            RequestKind::CreateLot => {
                let new: NewLot = rq.read_json()?;
                Reply::created(Body::Lot(self.lots.create(&new.name, new.capacity)?))
            }
            RequestKind::GetLotStatus => {
                Reply::ok(Body::Lot(self.lots.status(rq.parse_param()?)?))
            }
            RequestKind::UpdateLot => {
                let lot_id: LotId = rq.parse_param()?;
                let update: LotUpdate = rq.read_json()?;
                Reply::ok(Body::Lot(self.lots.update(lot_id, &update)?))
            }
            RequestKind::DeleteLot => {
                let lot_id: LotId = rq.parse_param()?;
                if lot_id == DEFAULT_LOT_ID {
                    warn!("default lot deleted by administrative request");
                }
                self.lots.delete(lot_id)?;
                Reply::no_content()
            }

            RequestKind::ListTickets => Reply::ok(Body::Tickets(self.tickets.tickets()?)),
            RequestKind::Admit => {
                let entry: Entry = rq.read_json()?;
                let ticket =
                    self.tickets
                        .admit(entry.ticket_number, entry.time_entered, entry.lot_id)?;
                Reply::created(Body::Ticket(ticket))
            }
            RequestKind::ComputeFee => {
                Reply::ok(Body::Ticket(self.tickets.compute_fee(rq.parse_param()?, None)?))
            }
            RequestKind::QuoteFee => {
                Reply::ok(Body::Quote(self.tickets.quote_for(rq.parse_param()?, None)?))
            }
            RequestKind::ArchiveTicket => {
                self.tickets.archive(rq.parse_param()?)?;
                Reply::no_content()
            }

            RequestKind::ListPayments => Reply::ok(Body::Payments(self.payments.payments()?)),
            RequestKind::Settle => {
                let checkout: Checkout = rq.read_json()?;
                let payment = self
                    .payments
                    .settle(checkout.ticket_number, checkout.card_number)?;
                Reply::created(Body::Payment(payment))
            }
            RequestKind::GetPayment => {
                let id: Uuid = rq.parse_param()?;
                Reply::ok(Body::Payment(self.payments.payment(id)?))
            }
        })
    }
}

impl RequestHandler for Facility {
    fn handle(&self, mut rq: Request) {
        let span = info_span!("request", id = %rq.id(), kind = ?rq.kind());
        let _entered = span.enter();

        match self.dispatch(&mut rq) {
            Ok(Reply {
                status,
                body: Some(body),
            }) => rq.respond_with_json(status, &body),
            Ok(Reply { body: None, .. }) => rq.respond_with_no_content(),
            Err(err) => {
                if err.is_fatal() {
                    error!(%err, "request aborted");
                } else if !rq.kind().is_read_only() {
                    info!(code = err.code(), "request refused");
                }
                rq.respond_with_err(&err);
            }
        }
    }

    fn shutdown(self) {
        match self.lots.lots() {
            Ok(lots) => {
                for lot in lots {
                    info!(lot = lot.id, spots_used = lot.spots_used, "facility closing");
                }
            }
            Err(err) => warn!(%err, "could not read lots on shutdown"),
        }
    }
}
