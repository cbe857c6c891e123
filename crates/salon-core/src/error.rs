//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                      │
//! │  └── DbError          - Ledger store failures                          │
//! │                                                                         │
//! │  salon-engine errors                                                   │
//! │  └── EngineError      - What the host application sees                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → Host      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Messages are end-user text; hosts show them verbatim
//! 3. Errors are enum variants, never String
//! 4. A failed operation leaves the record in its last valid state

use thiserror::Error;

use crate::auth::Capability;
use crate::money::Money;
use crate::promotion::IneligibleReason;
use crate::types::{DepositStatus, TransactionStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The transaction's status does not allow the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing or paying an invoice that is already `paid`
    /// - Any mutation of a `voided` invoice
    #[error("Transaction {transaction_id} is {current_status}; cannot {operation}")]
    InvalidTransactionStatus {
        transaction_id: String,
        current_status: TransactionStatus,
        operation: String,
    },

    /// The deposit has already been reviewed.
    #[error("Deposit {deposit_id} is {current_status}; cannot {operation}")]
    InvalidDepositStatus {
        deposit_id: String,
        current_status: DepositStatus,
        operation: String,
    },

    /// Cash received does not cover the amount due.
    ///
    /// ## User Workflow
    /// ```text
    /// Total: 850.00, cashier enters 800.00
    ///      │
    ///      ▼
    /// InsufficientPayment { total: 850.00, received: 800.00 }
    ///      │
    ///      ▼
    /// Cashier re-enters the amount; invoice stays in service
    /// ```
    #[error("Amount received ({received}) is less than the total due ({total})")]
    InsufficientPayment { total: Money, received: Money },

    /// A promotion failed one of the eligibility checks.
    #[error("{0}")]
    PromotionIneligible(IneligibleReason),

    /// The authorization context refused the actor a capability.
    #[error("User {actor_id} is not allowed to {capability}")]
    Unauthorized {
        actor_id: String,
        capability: Capability,
    },

    /// Neither services nor products were supplied.
    #[error("Add at least one service or product")]
    EmptyTransaction,

    /// Services were supplied without a client name.
    #[error("Client name is required when the sale includes services")]
    ClientNameRequired,

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl From<IneligibleReason> for CoreError {
    fn from(reason: IneligibleReason) -> Self {
        CoreError::PromotionIneligible(reason)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements and are
/// always recoverable by re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed promotion code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields contradict each other.
    #[error("{field} is inconsistent: {reason}")]
    Inconsistent { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
