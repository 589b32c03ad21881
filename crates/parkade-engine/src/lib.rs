//! :rocket: The parking facility.
//!
//! The facility is split into the [lot capacity tracker][lot], the
//! [ticket lifecycle manager][tickets] and the [payment settler][payments],
//! all working on one shared [record store][store] and fronted by the
//! [`Facility`] request handler.
//!
//! Occupancy of a lot only ever changes while its lock is held, so the
//! "check free, then take" of an admission and the release of a settlement
//! on the same lot never interleave. A ticket number has a lock of its own,
//! taken before the lot's, so the same number can't be admitted into two lots
//! at once nor settled twice.

#![allow(rustdoc::private_intra_doc_links)]
use std::sync::Arc;

use parkade_core::{Config, ParkingError};

pub mod clock;
mod facility;
pub mod lot;
pub mod payments;
pub mod store;
pub mod tickets;

pub use clock::{Clock, ManualClock, SystemClock};
pub use facility::Facility;
pub use lot::LotTracker;
pub use payments::PaymentSettler;
pub use store::{MemoryStore, RecordKind, RecordStore, Records};
pub use tickets::{FeeQuote, TicketLocks, TicketManager};

/// Entrypoint of the facility
///
/// Builds a facility on an empty in-memory store, running on the wall clock.
pub fn launch(config: &Config) -> Result<Facility, ParkingError> {
    launch_with(config, Arc::new(MemoryStore::new()), Arc::new(SystemClock))
}

/// Build a facility on `store`, telling time with `clock`
///
/// The default lot described by `config` is seeded if the store holds no lot
/// yet.
pub fn launch_with(
    config: &Config,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
) -> Result<Facility, ParkingError> {
    let records = Records::new(store);

    let lots = Arc::new(LotTracker::new(records.clone()));
    lots.seed_default(config)?;

    let numbers = Arc::new(TicketLocks::default());
    let tickets = TicketManager::new(
        records.clone(),
        lots.clone(),
        numbers.clone(),
        config.fees.clone(),
        clock,
    );
    let payments = PaymentSettler::new(records, lots.clone(), numbers);

    Ok(Facility::new(lots, tickets, payments))
}
