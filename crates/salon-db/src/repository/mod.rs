//! # Repository Module
//!
//! Ledger store repositories.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine command                                                         │
//! │       │                                                                 │
//! │       │  db.transactions().get_by_id(id)                               │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                 │
//! │  ├── insert / get_by_id / update (version-checked)                     │
//! │  ├── mark_paid (status + promotion usage, one DB transaction)          │
//! │  └── list_for_day / daily_sales_total                                  │
//! │       │                                                                 │
//! │       │  SQL Query  ◄──► Row struct (FromRow) ──TryFrom──► domain type  │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TransactionRepository`](transaction::TransactionRepository) - Invoices
//! - [`PromotionRepository`](promotion::PromotionRepository) - Promotions and usage
//! - [`DepositRepository`](deposit::DepositRepository) - End-of-day deposits

pub mod deposit;
pub mod promotion;
pub mod transaction;
