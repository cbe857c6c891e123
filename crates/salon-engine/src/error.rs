//! # Engine Error Type
//!
//! Unified error type for engine commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Salon Engine                       │
//! │                                                                         │
//! │  Host (POS / back office)          Rust Engine                         │
//! │  ────────────────────────          ───────────                         │
//! │                                                                         │
//! │  engine.process_payment(...)                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, EngineError>                                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rule broken? ──── CoreError::InsufficientPayment ──┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Store failed? ─── DbError::Conflict ─────────── EngineError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "kind": "INSUFFICIENT_PAYMENT",                                     │
//! │    "message": "Amount received (800.00) is less than the total due     │
//! │                (850.00)" }                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are end-user text and are shown verbatim. Internal storage
//! details are logged, never returned.

use serde::Serialize;
use tracing::error;
use ts_rs::TS;

use salon_core::{CoreError, ValidationError};
use salon_db::DbError;

/// Error returned from engine commands.
///
/// ## Serialization
/// ```json
/// {
///   "kind": "PROMOTION_INELIGIBLE",
///   "message": "This client has already used this promotion"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EngineError {
    /// Machine-readable category for programmatic handling
    pub kind: ErrorKind,

    /// Human-readable message for display
    pub message: String,
}

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Input failed validation; re-prompt.
    ValidationError,

    /// The record's status does not allow the operation.
    InvalidState,

    /// Cash received does not cover the total.
    InsufficientPayment,

    /// The promotion cannot be applied or redeemed.
    PromotionIneligible,

    /// The actor lacks a capability.
    Unauthorized,

    /// The record does not exist.
    NotFound,

    /// The record changed since it was read; reload and retry.
    Conflict,

    /// The ledger store failed.
    PersistenceError,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        EngineError::new(ErrorKind::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::ValidationError, message)
    }

    /// Whether repeating the same call may succeed.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict | ErrorKind::PersistenceError)
    }
}

/// Converts core errors to engine errors.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        let kind = match &err {
            CoreError::InvalidTransactionStatus { .. } | CoreError::InvalidDepositStatus { .. } => {
                ErrorKind::InvalidState
            }
            CoreError::InsufficientPayment { .. } => ErrorKind::InsufficientPayment,
            CoreError::PromotionIneligible(_) => ErrorKind::PromotionIneligible,
            CoreError::Unauthorized { .. } => ErrorKind::Unauthorized,
            CoreError::EmptyTransaction
            | CoreError::ClientNameRequired
            | CoreError::Validation(_) => ErrorKind::ValidationError,
        };
        EngineError::new(kind, err.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::validation(err.to_string())
    }
}

/// Converts database errors to engine errors.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => EngineError::new(
                ErrorKind::ValidationError,
                format!("{field} '{value}' already exists"),
            ),
            DbError::Conflict { .. } => EngineError::new(ErrorKind::Conflict, err.to_string()),
            DbError::UsageRejected(reason) => {
                EngineError::new(ErrorKind::PromotionIneligible, reason.to_string())
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                EngineError::new(ErrorKind::PersistenceError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                EngineError::new(ErrorKind::PersistenceError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                EngineError::new(ErrorKind::PersistenceError, "Database migration failed")
            }
            DbError::PoolExhausted => {
                EngineError::new(ErrorKind::PersistenceError, "Database is busy; try again")
            }
            DbError::QueryFailed(e) | DbError::Serialization(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                error!("Database operation failed: {}", e);
                EngineError::new(ErrorKind::PersistenceError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine commands.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use salon_core::{IneligibleReason, Money};

    #[test]
    fn test_core_error_kinds() {
        let err: EngineError = CoreError::InsufficientPayment {
            total: Money::from_cents(85_000),
            received: Money::from_cents(80_000),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::InsufficientPayment);
        assert_eq!(
            err.message,
            "Amount received (800.00) is less than the total due (850.00)"
        );

        let err: EngineError = CoreError::Validation(ValidationError::Required {
            field: "void reason".to_string(),
        })
        .into();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_db_error_kinds() {
        let err: EngineError = DbError::conflict("Transaction", "tx-1").into();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.is_retryable());

        let err: EngineError = DbError::UsageRejected(IneligibleReason::AlreadyUsed).into();
        assert_eq!(err.kind, ErrorKind::PromotionIneligible);
        assert_eq!(err.message, "This client has already used this promotion");

        let err: EngineError = DbError::QueryFailed("no such column: x".to_string()).into();
        assert_eq!(err.kind, ErrorKind::PersistenceError);
        assert_eq!(err.message, "Database operation failed");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_serialized_shape() {
        let err = EngineError::not_found("Transaction", "tx-9");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "NOT_FOUND");
        assert_eq!(json["message"], "Transaction not found: tx-9");
    }
}
