//! # salon-core: Pure Business Logic for the Salon Ledger
//!
//! This crate contains the rules that turn a cart of services and products
//! into a priced invoice, move it through its state machine, apply
//! promotions, and classify end-of-day deposits. It has zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host application (POS / back office)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    salon-engine (commands)                      │   │
//! │  │   create_transaction, apply_promotion, process_payment, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ lifecycle │  │ discount  │  │ promotion │  │ reconcile │  │   │
//! │  │   │  invoice  │  │   scope   │  │  checks   │  │  deposit  │  │   │
//! │  │   │  states   │  │   math    │  │  usage    │  │  band     │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    salon-db (Ledger Store)                      │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Transaction, Promotion, Deposit)
//! - [`money`] - Money and Percent with integer arithmetic
//! - [`lifecycle`] - Invoice state machine and totals
//! - [`discount`] - Discount scope and amount
//! - [`promotion`] - Promotion eligibility and usage
//! - [`reconcile`] - Daily sales and deposit classification
//! - [`validation`] - Input rules
//! - [`auth`], [`clock`] - Seams the host implements
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use salon_core::lifecycle::{NewTransaction, PaymentRequest};
//! use salon_core::{ClientInfo, Money, ServiceLine, Transaction};
//!
//! let new = NewTransaction {
//!     branch_id: "branch-1".to_string(),
//!     client_info: ClientInfo::named("Ana"),
//!     services: vec![ServiceLine::new("svc-cut", "Haircut", Money::from_cents(85_000))],
//!     ..Default::default()
//! };
//! let mut tx = Transaction::create("tx-1", new, Utc::now()).unwrap();
//!
//! tx.process_payment(&PaymentRequest::cash(Money::from_cents(100_000)), Utc::now()).unwrap();
//! assert_eq!(tx.change, Some(Money::from_cents(15_000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod clock;
pub mod discount;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod promotion;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{AuthorizationContext, Capability};
pub use clock::ClockSource;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use promotion::IneligibleReason;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items (services + products) on one invoice.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single product line.
///
/// ## Business Reason
/// Catches typos like 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest single amount accepted in cents (1,000,000,000.00): prices,
/// adjusted prices, tax, cash received and deposits.
///
/// A full cart at this bound (100 lines × 999 units) stays far inside
/// `i64` cents, so totals never overflow.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Client name given to anonymous product-only sales.
pub const WALK_IN_CLIENT_NAME: &str = "Walk-in";

/// Maximum length of a promotion code.
pub const MAX_PROMOTION_CODE_LEN: usize = 30;
