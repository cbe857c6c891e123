//! # Engine Commands
//!
//! Every operation a host can invoke, as async methods on [`SalonEngine`].
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here (SalonEngine, shared helpers)
//! ├── transaction.rs  ◄─── Invoice lifecycle and promotion attachment
//! ├── promotion.rs    ◄─── Promotion lookup, validation, usage tracking
//! └── deposit.rs      ◄─── Daily sales and deposit reconciliation
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  engine.apply_promotion("tx-1", "welcome10").await                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  load ──────► salon-db  (get_by_id, find_by_code)                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  decide ────► salon-core (attach_promotion, pure, clock passed in)     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  save ──────► salon-db  (UPDATE ... WHERE version = ?)                 │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Ok(Transaction) / Err(EngineError)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands never retry. A `Conflict` goes back to the host, which reloads
//! and asks again.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use salon_core::auth::StaticGrants;
use salon_core::clock::SystemClock;
use salon_core::{AuthorizationContext, ClockSource, Transaction};
use salon_db::{Database, DbConfig};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

pub mod deposit;
pub mod promotion;
pub mod transaction;

pub use transaction::PaymentResult;

/// The engine: ledger store, configuration and the host's seams.
///
/// Cheap to clone; clones share the database pool.
#[derive(Clone)]
pub struct SalonEngine {
    db: Database,
    config: EngineConfig,
    clock: Arc<dyn ClockSource>,
    auth: Arc<dyn AuthorizationContext>,
}

impl SalonEngine {
    /// Creates an engine over an open database with the wall clock.
    ///
    /// No actor holds any capability until the host installs its own
    /// check with [`with_authorization`](Self::with_authorization), so
    /// voids are refused by default.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        SalonEngine {
            db,
            config,
            clock: Arc::new(SystemClock),
            auth: Arc::new(StaticGrants::new()),
        }
    }

    /// Opens (and migrates) the database named by the configuration.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(DbConfig::new(&config.database_path)).await?;
        Ok(SalonEngine::new(db, config))
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the authorization context.
    pub fn with_authorization(mut self, auth: Arc<dyn AuthorizationContext>) -> Self {
        self.auth = auth;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load_transaction(&self, id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Transaction", id))
    }
}

impl std::fmt::Debug for SalonEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalonEngine")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
