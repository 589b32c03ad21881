//! Generic keyed record storage

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parkade_core::{Lot, Payment, StoreError, Ticket};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Kind of a stored record
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RecordKind {
    /// [`Lot`] records, keyed by lot id
    Lot,
    /// [`Ticket`] records, keyed by ticket number
    Ticket,
    /// [`Payment`] records, keyed by payment id
    Payment,
    /// Counters that must never go back, keyed by what they count
    Sequence,
}

impl RecordKind {
    /// Name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Lot => "lot",
            RecordKind::Ticket => "ticket",
            RecordKind::Payment => "payment",
            RecordKind::Sequence => "sequence",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyed storage for records of every kind
///
/// Records are JSON documents kept as text, so integers wider than 64 bits
/// survive unchanged. Each call must be atomic for the record it touches.
/// Nothing else is asked of an implementation; the engine serializes updates
/// of a lot itself.
pub trait RecordStore: Send + Sync {
    /// Fetch one record
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError>;
    /// Insert or replace one record
    fn put(&self, kind: RecordKind, key: &str, document: String) -> Result<(), StoreError>;
    /// Remove one record, returns whether it existed
    fn delete(&self, kind: RecordKind, key: &str) -> Result<bool, StoreError>;
    /// Fetch every record of a kind, in no particular order
    fn list_all(&self, kind: RecordKind) -> Result<Vec<String>, StoreError>;
}

/// A record the engine keeps in a [`RecordStore`]
pub trait Record: Serialize + DeserializeOwned {
    /// Kind the record is stored under
    const KIND: RecordKind;

    /// Key the record is stored under
    fn key(&self) -> String;
}

impl Record for Lot {
    const KIND: RecordKind = RecordKind::Lot;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Record for Ticket {
    const KIND: RecordKind = RecordKind::Ticket;

    fn key(&self) -> String {
        self.ticket_number.to_string()
    }
}

impl Record for Payment {
    const KIND: RecordKind = RecordKind::Payment;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Typed view on a shared [`RecordStore`]
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn RecordStore>,
}

impl Records {
    /// Wrap `store`
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch the record of type `R` stored under `key`
    pub fn get<R: Record>(&self, key: impl fmt::Display) -> Result<Option<R>, StoreError> {
        match self.store.get(R::KIND, &key.to_string())? {
            Some(document) => decode(&document).map(Some),
            None => Ok(None),
        }
    }

    /// Insert or replace `record`
    pub fn put<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let document = serde_json::to_string(record).map_err(|source| StoreError::Malformed {
            kind: R::KIND.as_str(),
            source,
        })?;
        self.store.put(R::KIND, &record.key(), document)
    }

    /// Remove the record of type `R` stored under `key`
    pub fn delete<R: Record>(&self, key: impl fmt::Display) -> Result<bool, StoreError> {
        self.store.delete(R::KIND, &key.to_string())
    }

    /// Fetch every record of type `R`
    pub fn list<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        self.store
            .list_all(R::KIND)?
            .iter()
            .map(|document| decode(document))
            .collect()
    }
}

fn decode<R: Record>(document: &str) -> Result<R, StoreError> {
    serde_json::from_str(document).map_err(|source| StoreError::Malformed {
        kind: R::KIND.as_str(),
        source,
    })
}

/// In-memory [`RecordStore`]
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<(RecordKind, String), String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records of `kind`
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|e| e.key().0 == kind).count()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .records
            .get(&(kind, key.to_owned()))
            .map(|entry| entry.value().clone()))
    }

    fn put(&self, kind: RecordKind, key: &str, document: String) -> Result<(), StoreError> {
        self.records.insert((kind, key.to_owned()), document);
        Ok(())
    }

    fn delete(&self, kind: RecordKind, key: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(&(kind, key.to_owned())).is_some())
    }

    fn list_all(&self, kind: RecordKind) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
