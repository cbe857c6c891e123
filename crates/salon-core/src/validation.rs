//! # Validation Module
//!
//! Input validation for invoices, promotions and deposits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Host UI                                                      │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: salon-core (THIS MODULE)                                     │
//! │  ├── Line item sanity (quantities, prices)                             │
//! │  └── Promotion code format, void reasons                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger store (SQLite)                                        │
//! │  ├── CHECK constraints on status columns                               │
//! │  └── UNIQUE (branch_id, promotion_code)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::validation::{normalize_promotion_code, validate_quantity};
//!
//! assert_eq!(normalize_promotion_code(" summer-10 ").unwrap(), "SUMMER-10");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, Percent};
use crate::types::{ApplicableTo, DiscountTerms, DiscountType, LineItems, Promotion, UsageType};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_PROMOTION_CODE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and canonicalizes a promotion code.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 30 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Returns
/// The uppercase canonical form the store keys on.
pub fn normalize_promotion_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "promotion code".to_string(),
        });
    }

    if code.chars().count() > MAX_PROMOTION_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "promotion code".to_string(),
            max: MAX_PROMOTION_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "promotion code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(canonical_promotion_code(code))
}

/// The stored form of a promotion code: trimmed, ASCII uppercase.
///
/// Does not validate; the ledger store applies it on insert and lookup.
pub fn canonical_promotion_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validates a client name and returns it trimmed.
///
/// Empty names are allowed here; whether a name is required depends on the
/// cart and is decided by the lifecycle.
pub fn validate_client_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.chars().count() > 120 {
        return Err(ValidationError::TooLong {
            field: "client name".to_string(),
            max: 120,
        });
    }

    Ok(name.to_string())
}

/// Validates a void reason and returns it trimmed.
pub fn validate_void_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "void reason".to_string(),
        });
    }

    if reason.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "void reason".to_string(),
            max: 500,
        });
    }

    Ok(reason.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a product quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount: zero up to MAX_AMOUNT_CENTS.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(amount_out_of_range(field));
    }

    Ok(())
}

fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
}

/// Validates a manual discount percentage (0% to 100%).
pub fn validate_discount_percent(percent: Percent) -> ValidationResult<()> {
    if percent > Percent::HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates every line of a cart.
///
/// ## Rules
/// - At most MAX_LINE_ITEMS (100) lines
/// - Service: id required, base and adjusted price within 0..=MAX_AMOUNT_CENTS
/// - Product: id required, unit price within 0..=MAX_AMOUNT_CENTS,
///   quantity 1..=999
///
/// An empty cart is NOT rejected here; the lifecycle reports it with a
/// dedicated error.
pub fn validate_line_items(items: &LineItems) -> ValidationResult<()> {
    if items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "line items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    for service in &items.services {
        if service.service_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "service id".to_string(),
            });
        }
        validate_amount("base price", service.base_price)?;
        let adjusted = service
            .base_price
            .checked_add(service.price_adjustment)
            .ok_or_else(|| amount_out_of_range("adjusted price"))?;
        validate_amount("adjusted price", adjusted)?;
    }

    for product in &items.products {
        if product.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product id".to_string(),
            });
        }
        validate_amount("product price", product.price)?;
        validate_quantity(product.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Promotion Validators
// =============================================================================

/// Validates discount terms.
///
/// ## Rules
/// - Percentage: 0 < value ≤ 10000 bps
/// - Fixed: value > 0 cents
/// - Specific scope must list at least one service or product
pub fn validate_discount_terms(terms: &DiscountTerms) -> ValidationResult<()> {
    match terms.discount_type {
        DiscountType::Percentage => {
            if terms.discount_value <= 0 || terms.discount_value > Percent::HUNDRED.bps() as i64 {
                return Err(ValidationError::OutOfRange {
                    field: "discount value".to_string(),
                    min: 1,
                    max: Percent::HUNDRED.bps() as i64,
                });
            }
        }
        DiscountType::Fixed => {
            if terms.discount_value <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "discount value".to_string(),
                });
            }
        }
    }

    if terms.applicable_to == ApplicableTo::Specific
        && terms.specific_services.is_empty()
        && terms.specific_products.is_empty()
    {
        return Err(ValidationError::Inconsistent {
            field: "applicable to".to_string(),
            reason: "specific promotions must list at least one service or product".to_string(),
        });
    }

    Ok(())
}

/// Validates a promotion record before it is stored.
pub fn validate_promotion(promotion: &Promotion) -> ValidationResult<()> {
    let canonical = normalize_promotion_code(&promotion.promotion_code)?;
    if canonical != promotion.promotion_code {
        return Err(ValidationError::InvalidFormat {
            field: "promotion code".to_string(),
            reason: "must be stored in uppercase".to_string(),
        });
    }

    if promotion.title.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }

    validate_discount_terms(&promotion.terms)?;

    if promotion.end_date < promotion.start_date {
        return Err(ValidationError::Inconsistent {
            field: "end date".to_string(),
            reason: "must not be before the start date".to_string(),
        });
    }

    if promotion.usage_type == UsageType::Repeating && promotion.max_uses == Some(0) {
        return Err(ValidationError::MustBePositive {
            field: "max uses".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use salon_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
