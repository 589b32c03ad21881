//! Implementation of the lot capacity tracker

use std::sync::Arc;

use dashmap::DashMap;
use parkade_core::{Config, Lot, LotId, LotUpdate, ParkingError, StoreError, DEFAULT_LOT_ID};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::{Record, RecordKind, Records};

/// Highest lot id ever handed out
///
/// Ids of deleted lots are never reused, so tickets left behind by a deleted
/// lot can't reach a lot created after it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotSequence {
    last_id: LotId,
}

impl Record for LotSequence {
    const KIND: RecordKind = RecordKind::Sequence;

    fn key(&self) -> String {
        String::from("lot")
    }
}

struct LotSlot {
    lot: Lot,
    /// Set once the lot has been deleted, stale handles must not write it back
    retired: bool,
}

/// Exclusive access to one lot
///
/// Every change is written to the store before it becomes visible, so the
/// stored lot and the one held here never disagree.
pub struct LotGuard<'a> {
    slot: MutexGuard<'a, LotSlot>,
    records: &'a Records,
}

impl LotGuard<'_> {
    /// The lot as currently stored
    #[inline]
    pub fn lot(&self) -> &Lot {
        &self.slot.lot
    }

    /// Take one spot
    ///
    /// Returns `Ok(false)` without touching anything if the lot is full.
    pub fn try_reserve_spot(&mut self) -> Result<bool, StoreError> {
        let mut next = self.slot.lot.clone();
        if !next.try_reserve_spot() {
            return Ok(false);
        }
        self.records.put(&next)?;
        self.slot.lot = next;
        Ok(true)
    }

    /// Give one spot back
    pub fn release_spot(&mut self) -> Result<(), StoreError> {
        let mut next = self.slot.lot.clone();
        next.release_spot();
        self.replace(next)
    }

    fn replace(&mut self, next: Lot) -> Result<(), StoreError> {
        self.records.put(&next)?;
        self.slot.lot = next;
        Ok(())
    }
}

/// Owner of the occupancy of every lot
///
/// Each lot sits behind its own mutex, so a "check free, then take" or a
/// release on one lot is atomic with respect to every other change of that
/// lot, while different lots never contend.
pub struct LotTracker {
    records: Records,
    slots: DashMap<LotId, Arc<Mutex<LotSlot>>>,
    /// Serializes id allocation of new lots
    create_lock: Mutex<()>,
}

impl LotTracker {
    /// Create a new [`LotTracker`]
    pub fn new(records: Records) -> Self {
        Self {
            records,
            slots: DashMap::new(),
            create_lock: Mutex::new(()),
        }
    }

    /// Create the default lot unless the store already holds lots
    ///
    /// Returns the seeded lot, if one was created.
    pub fn seed_default(&self, config: &Config) -> Result<Option<Lot>, ParkingError> {
        let _creating = self.create_lock.lock();
        if !self.records.list::<Lot>()?.is_empty() {
            return Ok(None);
        }
        if config.capacity == 0 {
            return Err(ParkingError::InvalidLot(String::from(
                "capacity must be positive",
            )));
        }
        let lot = Lot::new(DEFAULT_LOT_ID, config.lot_name.clone(), config.capacity);
        self.records.put(&LotSequence {
            last_id: DEFAULT_LOT_ID,
        })?;
        self.records.put(&lot)?;
        info!(lot = lot.id, capacity = lot.capacity, "seeded default lot");
        Ok(Some(lot))
    }

    fn slot(&self, lot_id: LotId) -> Result<Arc<Mutex<LotSlot>>, ParkingError> {
        if let Some(slot) = self.slots.get(&lot_id) {
            return Ok(Arc::clone(slot.value()));
        }
        let lot = self
            .records
            .get::<Lot>(lot_id)?
            .ok_or(ParkingError::LotNotFound(lot_id))?;
        debug!(lot = lot_id, "loaded lot");
        let slot = self.slots.entry(lot_id).or_insert_with(|| {
            Arc::new(Mutex::new(LotSlot {
                lot,
                retired: false,
            }))
        });
        Ok(Arc::clone(slot.value()))
    }

    /// Run `f` with exclusive access to the lot
    pub fn with_lot<T, F>(&self, lot_id: LotId, f: F) -> Result<T, ParkingError>
    where
        F: FnOnce(&mut LotGuard<'_>) -> Result<T, ParkingError>,
    {
        let slot = self.slot(lot_id)?;
        let slot = slot.lock();
        if slot.retired {
            return Err(ParkingError::LotNotFound(lot_id));
        }
        let mut guard = LotGuard {
            slot,
            records: &self.records,
        };
        f(&mut guard)
    }

    /// Take one spot in the lot, returns `false` if the lot is full
    pub fn try_reserve_spot(&self, lot_id: LotId) -> Result<bool, ParkingError> {
        self.with_lot(lot_id, |guard| Ok(guard.try_reserve_spot()?))
    }

    /// Give one spot of the lot back
    pub fn release_spot(&self, lot_id: LotId) -> Result<(), ParkingError> {
        self.with_lot(lot_id, |guard| Ok(guard.release_spot()?))
    }

    /// Current occupancy of the lot
    pub fn status(&self, lot_id: LotId) -> Result<Lot, ParkingError> {
        self.with_lot(lot_id, |guard| Ok(guard.lot().clone()))
    }

    /// Every lot, ordered by id
    pub fn lots(&self) -> Result<Vec<Lot>, ParkingError> {
        let mut lots = self.records.list::<Lot>()?;
        lots.sort_by_key(|lot| lot.id);
        Ok(lots)
    }

    /// Create an empty lot with an id no lot has had before
    pub fn create(&self, name: &str, capacity: u32) -> Result<Lot, ParkingError> {
        if capacity == 0 {
            return Err(ParkingError::InvalidLot(String::from(
                "capacity must be positive",
            )));
        }
        if name.trim().is_empty() {
            return Err(ParkingError::InvalidLot(String::from(
                "name must not be empty",
            )));
        }

        let _creating = self.create_lock.lock();
        let issued = self
            .records
            .get::<LotSequence>("lot")?
            .map_or(0, |sequence| sequence.last_id);
        let highest = self
            .records
            .list::<Lot>()?
            .iter()
            .map(|lot| lot.id)
            .max()
            .unwrap_or(0);
        let id = issued.max(highest) + 1;
        // the sequence goes first, a lot must never exist with an id it doesn't cover
        self.records.put(&LotSequence { last_id: id })?;
        let lot = Lot::new(id, name.trim(), capacity);
        self.records.put(&lot)?;
        info!(lot = lot.id, capacity, "created lot");
        Ok(lot)
    }

    /// Rename or resize the lot
    ///
    /// The capacity may not drop below the spots currently in use.
    pub fn update(&self, lot_id: LotId, update: &LotUpdate) -> Result<Lot, ParkingError> {
        let name = match update.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(ParkingError::InvalidLot(String::from(
                    "name must not be empty",
                )))
            }
            name => name,
        };
        if update.capacity == Some(0) {
            return Err(ParkingError::InvalidLot(String::from(
                "capacity must be positive",
            )));
        }

        self.with_lot(lot_id, |guard| {
            let mut next = guard.lot().clone();
            if let Some(name) = name {
                next.name = name.to_owned();
            }
            if let Some(capacity) = update.capacity {
                if capacity < next.spots_used {
                    return Err(ParkingError::InvalidLot(format!(
                        "capacity {capacity} is below the {} spots in use",
                        next.spots_used
                    )));
                }
                next.capacity = capacity;
            }
            next.is_full = next.spots_used == next.capacity;
            guard.replace(next)?;
            let lot = guard.lot();
            info!(lot = lot.id, capacity = lot.capacity, "updated lot");
            Ok(lot.clone())
        })
    }

    /// Remove the lot
    ///
    /// Tickets still referring to the lot are left alone; settling them
    /// reports [`ParkingError::LotNotFound`].
    pub fn delete(&self, lot_id: LotId) -> Result<Lot, ParkingError> {
        let slot = self.slot(lot_id)?;
        let mut slot = slot.lock();
        if slot.retired {
            return Err(ParkingError::LotNotFound(lot_id));
        }
        self.records.delete::<Lot>(lot_id)?;
        slot.retired = true;
        self.slots.remove(&lot_id);
        info!(lot = lot_id, spots_used = slot.lot.spots_used, "deleted lot");
        Ok(slot.lot.clone())
    }
}
