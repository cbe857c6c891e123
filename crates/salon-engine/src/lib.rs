//! # salon-engine: Commands for the Salon Ledger
//!
//! The in-process API a point-of-sale or back-office host calls. Every
//! command loads what it needs from [`salon_db`], applies the rules in
//! [`salon_core`], saves the result and returns either the updated record
//! or an [`EngineError`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon Engine                                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    commands (SalonEngine)                       │   │
//! │  │  ┌─────────────┐ ┌─────────────┐ ┌─────────────┐                │   │
//! │  │  │ transaction │ │  promotion  │ │   deposit   │                │   │
//! │  │  └─────────────┘ └─────────────┘ └─────────────┘                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │          ┌───────────────────┼────────────────────┐                     │
//! │          ▼                   ▼                    ▼                     │
//! │   EngineConfig         ClockSource          AuthorizationContext        │
//! │   (SALON_* env)        (injected)           (injected)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use salon_engine::{EngineConfig, SalonEngine};
//!
//! let engine = SalonEngine::open(EngineConfig::from_env()).await?;
//! let tx = engine.create_transaction(new_sale).await?;
//! let tx = engine.apply_promotion(&tx.id, "WELCOME10").await?;
//! let paid = engine.process_payment(&tx.id, PaymentRequest::cash(amount)).await?;
//! ```

pub mod commands;
pub mod config;
pub mod error;

pub use commands::{PaymentResult, SalonEngine};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ErrorKind};
