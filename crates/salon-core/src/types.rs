//! # Domain Types
//!
//! Core domain types used throughout the salon ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │   │   Promotion     │   │    Deposit      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  status         │   │  promotion_code │   │  deposit_date   │       │
//! │  │  services[]     │   │  DiscountTerms  │   │  amount         │       │
//! │  │  products[]     │   │  usage_type     │   │  difference     │       │
//! │  │  DiscountSource │   │  used_by / cnt  │   │  recon. status  │       │
//! │  │  total          │   │  window         │   │  review status  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names serialize in camelCase: reports and back-office tooling read
//! these records directly.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Percent};

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of an invoice.
///
/// Transitions are enforced in one place, see
/// [`TransactionStatus::transition`](crate::lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Client is in the chair; line items may still change.
    InService,
    /// Payment taken.
    Paid,
    /// Cancelled. Terminal.
    Voided,
}

impl TransactionStatus {
    /// Wire / column representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::InService => "in_service",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Voided => "voided",
        }
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::InService
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; change is computed.
    Cash,
    /// Card on an external terminal.
    Card,
    /// E-wallet / bank transfer.
    Digital,
}

// =============================================================================
// Line Items
// =============================================================================

/// Client details captured at sale time.
///
/// Walk-in clients have no `client_id` and are identified only by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ClientInfo {
    pub fn named(name: impl Into<String>) -> Self {
        ClientInfo {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A salon service performed during the visit.
///
/// `adjusted_price` is always `base_price + price_adjustment`; it is
/// recomputed by the lifecycle whenever the line is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLine {
    pub service_id: String,
    pub service_name: String,
    pub base_price: Money,
    /// May be negative (loyalty markdown, shorter hair, ...).
    pub price_adjustment: Money,
    pub adjusted_price: Money,
    /// Free text for the receipt; not used in any calculation.
    pub adjustment_reason: Option<String>,
    pub stylist_id: Option<String>,
    pub stylist_name: Option<String>,
    pub client_type: Option<String>,
}

impl ServiceLine {
    /// Creates a service line at its catalog price.
    pub fn new(service_id: impl Into<String>, service_name: impl Into<String>, base_price: Money) -> Self {
        ServiceLine {
            service_id: service_id.into(),
            service_name: service_name.into(),
            base_price,
            price_adjustment: Money::zero(),
            adjusted_price: base_price,
            adjustment_reason: None,
            stylist_id: None,
            stylist_name: None,
            client_type: None,
        }
    }

    /// Applies a price adjustment (negative for a markdown).
    pub fn with_adjustment(mut self, adjustment: Money, reason: impl Into<String>) -> Self {
        self.price_adjustment = adjustment;
        self.adjustment_reason = Some(reason.into());
        self.adjusted_price = self.base_price + adjustment;
        self
    }

    /// Assigns the stylist who performed the service.
    pub fn with_stylist(mut self, stylist_id: impl Into<String>, stylist_name: impl Into<String>) -> Self {
        self.stylist_id = Some(stylist_id.into());
        self.stylist_name = Some(stylist_name.into());
        self
    }
}

/// A retail product sold with the visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub product_id: String,
    pub product_name: String,
    /// Unit price.
    pub price: Money,
    pub quantity: i64,
}

impl ProductLine {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        price: Money,
        quantity: i64,
    ) -> Self {
        ProductLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            price,
            quantity,
        }
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

/// The cart of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItems {
    pub services: Vec<ServiceLine>,
    pub products: Vec<ProductLine>,
}

impl LineItems {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.products.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len() + self.products.len()
    }

    /// Σ adjusted price over services.
    pub fn services_subtotal(&self) -> Money {
        self.services.iter().map(|s| s.adjusted_price).sum()
    }

    /// Σ price × quantity over products.
    pub fn products_subtotal(&self) -> Money {
        self.products.iter().map(ProductLine::line_total).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.services_subtotal() + self.products_subtotal()
    }
}

// =============================================================================
// Promotion Terms
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Which part of the cart a promotion discounts.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApplicableTo {
    All,
    Services,
    Products,
    /// Only the ids listed in `specific_services` / `specific_products`.
    Specific,
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum UsageType {
    /// Each client may use the promotion once.
    #[serde(rename = "one-time")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "one-time"))]
    OneTime,
    /// Any client, up to `max_uses` in total.
    #[serde(rename = "repeating")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "repeating"))]
    Repeating,
}

/// The discount a promotion grants and the part of the cart it applies to.
///
/// Shared by [`Promotion`] and the [`AppliedPromotion`] snapshot frozen on
/// an invoice, so the discount can be recomputed when line items change.
///
/// ## discount_value Units
/// - `Percentage`: basis points (1000 = 10%)
/// - `Fixed`: cents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTerms {
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub applicable_to: ApplicableTo,
    #[serde(default)]
    pub specific_services: Vec<String>,
    #[serde(default)]
    pub specific_products: Vec<String>,
}

impl DiscountTerms {
    /// A percentage discount on the whole cart.
    pub fn percentage(percent: Percent, applicable_to: ApplicableTo) -> Self {
        DiscountTerms {
            discount_type: DiscountType::Percentage,
            discount_value: percent.bps() as i64,
            applicable_to,
            specific_services: Vec::new(),
            specific_products: Vec::new(),
        }
    }

    /// A fixed amount off.
    pub fn fixed(amount: Money, applicable_to: ApplicableTo) -> Self {
        DiscountTerms {
            discount_type: DiscountType::Fixed,
            discount_value: amount.cents(),
            applicable_to,
            specific_services: Vec::new(),
            specific_products: Vec::new(),
        }
    }

    /// Restricts the terms to the given service and product ids.
    pub fn restricted_to(mut self, services: Vec<String>, products: Vec<String>) -> Self {
        self.applicable_to = ApplicableTo::Specific;
        self.specific_services = services;
        self.specific_products = products;
        self
    }
}

// =============================================================================
// Promotion
// =============================================================================

/// A discount offer redeemable by code at one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub branch_id: String,
    /// Stored uppercase; matched case-insensitively.
    pub promotion_code: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub terms: DiscountTerms,
    pub usage_type: UsageType,
    /// Clients who redeemed a one-time promotion.
    pub used_by: BTreeSet<String>,
    /// Cap for repeating promotions; `None` = unlimited.
    pub max_uses: Option<u32>,
    pub usage_count: u32,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a promotion frozen on an invoice when it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromotion {
    pub id: String,
    pub code: String,
    pub title: String,
    #[serde(flatten)]
    pub terms: DiscountTerms,
    pub discount_amount: Money,
}

// =============================================================================
// Discount Source
// =============================================================================

/// The single discount mechanism active on an invoice.
///
/// A manual percentage and a promotion cannot both be active: attaching a
/// promotion replaces `Manual`, and setting a manual percentage replaces
/// `Promotion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountSource {
    Manual { percent: Percent },
    Promotion(AppliedPromotion),
}

impl Default for DiscountSource {
    fn default() -> Self {
        DiscountSource::Manual {
            percent: Percent::zero(),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One invoice.
///
/// Totals are derived: `subtotal`, `discount_amount` and `total` are
/// recomputed by the lifecycle from the line items, discount source and
/// tax on every change, never set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub branch_id: String,
    pub client_id: Option<String>,
    pub client_info: ClientInfo,
    pub status: TransactionStatus,
    pub services: Vec<ServiceLine>,
    pub products: Vec<ProductLine>,
    pub subtotal: Money,
    pub discount_source: DiscountSource,
    pub discount_amount: Money,
    /// Flat tax amount.
    pub tax: Money,
    pub total: Money,
    pub payment_method: Option<PaymentMethod>,
    /// Cash only.
    pub amount_received: Option<Money>,
    /// Cash only.
    pub change: Option<Money>,
    pub void_reason: Option<String>,
    pub voided_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped by the store on every write.
    pub version: i64,
}

impl Transaction {
    /// Manual discount percentage, zero while a promotion is attached.
    pub fn discount(&self) -> Percent {
        match &self.discount_source {
            DiscountSource::Manual { percent } => *percent,
            DiscountSource::Promotion(_) => Percent::zero(),
        }
    }

    pub fn applied_promotion(&self) -> Option<&AppliedPromotion> {
        match &self.discount_source {
            DiscountSource::Promotion(applied) => Some(applied),
            DiscountSource::Manual { .. } => None,
        }
    }

    /// Copy of the cart as a `LineItems` value.
    pub fn line_items(&self) -> LineItems {
        LineItems {
            services: self.services.clone(),
            products: self.products.clone(),
        }
    }
}

// =============================================================================
// Deposit
// =============================================================================

/// Outcome of comparing a deposit with the day's sales.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Pending,
    Match,
    Mismatch,
    ManualReview,
}

impl Default for ReconciliationStatus {
    fn default() -> Self {
        ReconciliationStatus::Pending
    }
}

/// Review state of a deposit.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Submitted,
    Approved,
    Rejected,
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DepositStatus::Submitted => "submitted",
            DepositStatus::Approved => "approved",
            DepositStatus::Rejected => "rejected",
        })
    }
}

/// One end-of-day cash deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub deposit_date: NaiveDate,
    /// Declared / receipted amount.
    pub amount: Money,
    pub daily_sales_total: Money,
    /// `amount - daily_sales_total`.
    pub difference: Money,
    pub validation_status: ReconciliationStatus,
    pub has_anomaly: bool,
    pub validation_message: String,
    pub status: DepositStatus,
    pub notes: Option<String>,
    pub submitted_by: String,
    #[ts(as = "String")]
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
