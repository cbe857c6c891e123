//! # Discount Calculator
//!
//! Turns discount terms and a cart into a discount amount.
//!
//! ## Scope Resolution
//! ```text
//! ┌───────────────┬───────────────────────────────────────────────────────┐
//! │ applicable_to │ scope subtotal                                        │
//! ├───────────────┼───────────────────────────────────────────────────────┤
//! │ all           │ invoice subtotal                                      │
//! │ services      │ Σ service adjusted_price                              │
//! │ products      │ Σ product price × quantity                            │
//! │ specific      │ Σ over lines whose id is in specific_services /       │
//! │               │   specific_products                                   │
//! └───────────────┴───────────────────────────────────────────────────────┘
//!
//!   percentage → scope × bps / 10000   (half-up to the cent, capped at 100%)
//!   fixed      → min(value, scope)
//! ```
//!
//! The discount never exceeds the amount it discounts.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Percent};
use crate::types::{ApplicableTo, DiscountTerms, DiscountType, ProductLine, ServiceLine};

/// Result of applying discount terms to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountBreakdown {
    pub discount_amount: Money,
    pub discount_type: DiscountType,
    /// Echo of the terms' value (bps or cents).
    pub discount_value: i64,
    /// The part of the cart the discount was computed against.
    pub scope_subtotal: Money,
}

/// Sums the part of the cart the terms apply to.
pub fn scope_subtotal(
    terms: &DiscountTerms,
    subtotal: Money,
    services: &[ServiceLine],
    products: &[ProductLine],
) -> Money {
    match terms.applicable_to {
        ApplicableTo::All => subtotal,
        ApplicableTo::Services => services.iter().map(|s| s.adjusted_price).sum(),
        ApplicableTo::Products => products.iter().map(ProductLine::line_total).sum(),
        ApplicableTo::Specific => {
            let services_part: Money = services
                .iter()
                .filter(|s| terms.specific_services.iter().any(|id| *id == s.service_id))
                .map(|s| s.adjusted_price)
                .sum();
            let products_part: Money = products
                .iter()
                .filter(|p| terms.specific_products.iter().any(|id| *id == p.product_id))
                .map(ProductLine::line_total)
                .sum();
            services_part + products_part
        }
    }
}

/// Computes the discount the terms grant on a cart.
///
/// ## Example
/// ```rust
/// use salon_core::discount::compute_discount;
/// use salon_core::money::{Money, Percent};
/// use salon_core::types::{ApplicableTo, DiscountTerms, ServiceLine};
///
/// let services = vec![ServiceLine::new("svc-cut", "Haircut", Money::from_cents(85_000))
///     .with_adjustment(Money::from_cents(-10_000), "Short hair")];
/// let terms = DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::Services);
///
/// let breakdown = compute_discount(&terms, Money::from_cents(75_000), &services, &[]);
/// assert_eq!(breakdown.discount_amount.cents(), 7_500);
/// ```
pub fn compute_discount(
    terms: &DiscountTerms,
    subtotal: Money,
    services: &[ServiceLine],
    products: &[ProductLine],
) -> DiscountBreakdown {
    let scope = scope_subtotal(terms, subtotal, services, products).non_negative();

    let discount_amount = match terms.discount_type {
        DiscountType::Percentage => {
            let bps = terms.discount_value.clamp(0, Percent::HUNDRED.bps() as i64) as u32;
            scope.percentage_of(Percent::from_bps(bps))
        }
        DiscountType::Fixed => Money::from_cents(terms.discount_value).non_negative().min(scope),
    };

    DiscountBreakdown {
        discount_amount,
        discount_type: terms.discount_type,
        discount_value: terms.discount_value,
        scope_subtotal: scope,
    }
}

/// Discount for a manual percentage on the whole subtotal.
#[inline]
pub fn manual_discount(subtotal: Money, percent: Percent) -> Money {
    subtotal.non_negative().percentage_of(percent)
}

// =============================================================================
// Unit Tests
// =============================================================================
