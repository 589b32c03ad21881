use std::sync::Arc;

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use parkade_core::{Config, FeeSchedule};
use parkade_engine::ManualClock;

mod api;
pub use api::{Api, ApiError, ApiResponse, ApiResult};

/// Instant the test clock starts at: 2023-11-14T22:13:20Z
pub const EPOCH: i64 = 1_700_000_000;

pub struct TestCtxBuilder {
    /// Spots in the default lot
    pub capacity: u32,
    /// Name of the default lot
    pub lot_name: String,
    /// Count of request handler threads
    pub handler_threads: u16,
    /// Fee table
    pub fees: FeeSchedule,
}

impl TestCtxBuilder {
    /// Create a new test context builder initialized with environment defaults
    ///
    /// `PARKADE_TEST_THREADS` overrides the number of handler threads.
    pub fn from_env() -> Result<Self> {
        let handler_threads = match std::env::var("PARKADE_TEST_THREADS") {
            Ok(v) => v
                .parse()
                .map_err(|_| eyre!("PARKADE_TEST_THREADS takes a decimal u16, got {v:?}"))?,
            Err(_) => 2,
        };

        let config = Config::default();
        Ok(TestCtxBuilder {
            capacity: config.capacity,
            lot_name: config.lot_name,
            handler_threads,
            fees: config.fees,
        })
    }

    /// Set the number of spots in the default lot
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of request handler threads to use
    pub fn with_handler_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.handler_threads = threads;
        self
    }

    /// Replace the fee table
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    /// Get the [`parkade_core::Config`] for launching the facility
    fn config(&self) -> Config {
        Config {
            lot_name: self.lot_name.clone(),
            capacity: self.capacity,
            fees: self.fees.clone(),
        }
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let config = self.config();
        let clock = Arc::new(ManualClock::new(start_time()?));
        let (facility, api) = api::mock::start(self.handler_threads, config, clock.clone()).await?;

        Ok(TestCtx {
            api,
            facility,
            clock,
            capacity: self.capacity,
            handler_threads: self.handler_threads,
            drop_bomb: DropBomb,
        })
    }
}

fn start_time() -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(EPOCH, 0).ok_or_else(|| eyre!("{EPOCH} is out of range"))
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the facility
    pub api: Api,
    facility: api::mock::MockFacility,
    /// Clock of the facility, starts at [`EPOCH`] and only moves when told to
    pub clock: Arc<ManualClock>,
    /// Spots in the default lot
    pub capacity: u32,
    /// Number of handler threads
    pub handler_threads: u16,

    drop_bomb: DropBomb,
}

impl TestCtx {
    /// The instant the facility's clock started at
    pub fn epoch(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(EPOCH, 0).unwrap_or_default()
    }

    /// Shut the facility down and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.facility.shutdown().await;
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the facility down");
    }
}
