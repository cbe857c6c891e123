//! # Transaction Lifecycle
//!
//! The state machine that owns an invoice's status, line items and totals.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │      create            pay                    void (VoidPaid cap.)      │
//! │   ──────────► in_service ────────► paid ─────────────────────┐          │
//! │               │  ▲                                           │          │
//! │          edit │  │ (totals recomputed)                       ▼          │
//! │               └──┘                                        voided        │
//! │               │                                              ▲          │
//! │               └──────────────────────────────────────────────┘          │
//! │                        void (Void capability)                           │
//! │                                                                         │
//! │  voided is terminal. There is no way back from paid to in_service.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every allowed move is listed in [`TransactionStatus::transition`]; all
//! operations go through it, so an illegal move is rejected before any
//! field changes.
//!
//! ## Totals
//! ```text
//! subtotal        = Σ service.adjusted_price + Σ product.price × quantity
//! discount_amount = Manual(p)    → subtotal × p        (half-up)
//!                   Promotion(s) → compute_discount(s.terms, cart)
//! total           = max(0, subtotal − discount_amount + tax)
//! ```
//! Recomputed by [`Transaction::recalculate`] on every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::auth::{AuthorizationContext, Capability};
use crate::discount::{compute_discount, manual_discount, DiscountBreakdown};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Percent};
use crate::promotion::PromotionUsage;
use crate::types::{
    ClientInfo, DiscountSource, LineItems, PaymentMethod, ProductLine, Promotion, ServiceLine,
    Transaction, TransactionStatus,
};
use crate::validation::{
    validate_amount, validate_client_name, validate_discount_percent, validate_line_items,
    validate_void_reason,
};
use crate::WALK_IN_CLIENT_NAME;

// =============================================================================
// Transition Table
// =============================================================================

/// Operations that touch an invoice's status axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Change line items, discount, tax, client or promotion.
    Edit,
    Pay,
    Void,
}

impl LifecycleAction {
    fn describe(&self) -> &'static str {
        match self {
            LifecycleAction::Edit => "edit",
            LifecycleAction::Pay => "process payment",
            LifecycleAction::Void => "void",
        }
    }
}

impl TransactionStatus {
    /// The status an action leads to, or `None` if it is not allowed.
    ///
    /// ```rust
    /// use salon_core::lifecycle::LifecycleAction;
    /// use salon_core::types::TransactionStatus;
    ///
    /// assert_eq!(
    ///     TransactionStatus::InService.transition(LifecycleAction::Pay),
    ///     Some(TransactionStatus::Paid)
    /// );
    /// assert_eq!(TransactionStatus::Paid.transition(LifecycleAction::Edit), None);
    /// ```
    pub const fn transition(self, action: LifecycleAction) -> Option<TransactionStatus> {
        use LifecycleAction::*;
        use TransactionStatus::*;

        match (self, action) {
            (InService, Edit) => Some(InService),
            (InService, Pay) => Some(Paid),
            (InService, Void) | (Paid, Void) => Some(Voided),
            (Paid, Edit) | (Paid, Pay) => None,
            (Voided, _) => None,
        }
    }

    /// Capability an actor needs to void an invoice in this status.
    pub const fn void_capability(self) -> Option<Capability> {
        match self {
            TransactionStatus::InService => Some(Capability::VoidTransaction),
            TransactionStatus::Paid => Some(Capability::VoidPaidTransaction),
            TransactionStatus::Voided => None,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Input for [`Transaction::create`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub branch_id: String,
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_info: ClientInfo,
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub discount: Percent,
    #[serde(default)]
    pub tax: Money,
}

/// Partial update for [`Transaction::edit`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEdit {
    pub services: Option<Vec<ServiceLine>>,
    pub products: Option<Vec<ProductLine>>,
    /// Setting a manual percentage detaches any promotion.
    pub discount: Option<Percent>,
    pub tax: Option<Money>,
    pub client_info: Option<ClientInfo>,
}

/// Input for [`Transaction::process_payment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub method: Option<PaymentMethod>,
    /// Required for cash.
    pub amount_received: Option<Money>,
}

impl PaymentRequest {
    pub fn cash(amount_received: Money) -> Self {
        PaymentRequest {
            method: Some(PaymentMethod::Cash),
            amount_received: Some(amount_received),
        }
    }

    pub fn card() -> Self {
        PaymentRequest {
            method: Some(PaymentMethod::Card),
            amount_received: None,
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

impl Transaction {
    /// Builds a new `in_service` invoice.
    ///
    /// ## Errors
    /// - `EmptyTransaction` when there are no services and no products
    /// - `ClientNameRequired` when services are present without a name
    /// - `Validation` for bad quantities, prices, discount or tax
    pub fn create(id: impl Into<String>, new: NewTransaction, now: DateTime<Utc>) -> CoreResult<Transaction> {
        if new.branch_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "branch id".to_string(),
            }
            .into());
        }

        let mut tx = Transaction {
            id: id.into(),
            branch_id: new.branch_id,
            client_id: new.client_id.filter(|c| !c.trim().is_empty()),
            client_info: new.client_info,
            status: TransactionStatus::InService,
            services: new.services,
            products: new.products,
            subtotal: Money::zero(),
            discount_source: DiscountSource::Manual {
                percent: new.discount,
            },
            discount_amount: Money::zero(),
            tax: new.tax,
            total: Money::zero(),
            payment_method: None,
            amount_received: None,
            change: None,
            void_reason: None,
            voided_by: None,
            voided_at: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
            version: 0,
        };

        tx.check_contents()?;
        tx.recalculate();
        Ok(tx)
    }

    /// Applies a partial update while the invoice is `in_service`.
    ///
    /// The update is checked on a copy; on error the invoice is unchanged.
    pub fn edit(&mut self, edit: TransactionEdit, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure(LifecycleAction::Edit)?;

        let mut next = self.clone();
        if let Some(services) = edit.services {
            next.services = services;
        }
        if let Some(products) = edit.products {
            next.products = products;
        }
        if let Some(tax) = edit.tax {
            next.tax = tax;
        }
        if let Some(client_info) = edit.client_info {
            next.client_info = client_info;
        }
        if let Some(percent) = edit.discount {
            next.discount_source = DiscountSource::Manual { percent };
        }

        next.check_contents()?;
        next.recalculate();
        next.updated_at = now;

        *self = next;
        Ok(())
    }

    /// Computes what a promotion would take off this invoice, without
    /// changing anything.
    pub fn preview_promotion(&self, promotion: &Promotion, now: DateTime<Utc>) -> CoreResult<DiscountBreakdown> {
        self.ensure(LifecycleAction::Edit)?;
        promotion.check_eligibility(self.client_id.as_deref(), now)?;

        Ok(compute_discount(
            &promotion.terms,
            self.line_items().subtotal(),
            &self.services,
            &self.products,
        ))
    }

    /// Attaches a promotion, replacing any manual percentage.
    ///
    /// Usage is NOT recorded here; see [`Transaction::promotion_usage`].
    pub fn attach_promotion(&mut self, promotion: &Promotion, now: DateTime<Utc>) -> CoreResult<DiscountBreakdown> {
        let breakdown = self.preview_promotion(promotion, now)?;

        self.discount_source = DiscountSource::Promotion(promotion.snapshot(&breakdown));
        self.recalculate();
        self.updated_at = now;

        Ok(breakdown)
    }

    /// Removes an attached promotion; the discount goes back to manual 0%.
    pub fn detach_promotion(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure(LifecycleAction::Edit)?;

        self.discount_source = DiscountSource::default();
        self.recalculate();
        self.updated_at = now;
        Ok(())
    }

    /// Takes payment and moves the invoice to `paid`.
    ///
    /// ## Cash
    /// `amount_received` must cover the total; `change` is the difference.
    /// Card and digital payments leave both fields empty.
    pub fn process_payment(&mut self, payment: &PaymentRequest, now: DateTime<Utc>) -> CoreResult<()> {
        let next_status = self.ensure(LifecycleAction::Pay)?;

        let method = payment.method.ok_or_else(|| ValidationError::Required {
            field: "payment method".to_string(),
        })?;

        let (amount_received, change) = match method {
            PaymentMethod::Cash => {
                let received = payment.amount_received.ok_or_else(|| ValidationError::Required {
                    field: "amount received".to_string(),
                })?;
                validate_amount("amount received", received)?;
                if received < self.total {
                    return Err(CoreError::InsufficientPayment {
                        total: self.total,
                        received,
                    });
                }
                (Some(received), Some(received - self.total))
            }
            PaymentMethod::Card | PaymentMethod::Digital => (None, None),
        };

        self.status = next_status;
        self.payment_method = Some(method);
        self.amount_received = amount_received;
        self.change = change;
        self.processed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Voids the invoice. Terminal.
    ///
    /// The required capability depends on the current status; the
    /// `AuthorizationContext` decides whether `actor_id` holds it.
    pub fn void(
        &mut self,
        reason: &str,
        actor_id: &str,
        auth: &dyn AuthorizationContext,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let next_status = self.ensure(LifecycleAction::Void)?;
        let reason = validate_void_reason(reason)?;

        if let Some(capability) = self.status.void_capability() {
            if !auth.can(actor_id, capability) {
                return Err(CoreError::Unauthorized {
                    actor_id: actor_id.to_string(),
                    capability,
                });
            }
        }

        self.status = next_status;
        self.void_reason = Some(reason);
        self.voided_by = Some(actor_id.to_string());
        self.voided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Re-derives adjusted prices, subtotal, discount and total.
    pub fn recalculate(&mut self) {
        for service in &mut self.services {
            service.adjusted_price = service.base_price + service.price_adjustment;
        }

        self.subtotal = self.line_items().subtotal();

        self.discount_amount = match &mut self.discount_source {
            DiscountSource::Manual { percent } => manual_discount(self.subtotal, *percent),
            DiscountSource::Promotion(applied) => {
                let breakdown = compute_discount(&applied.terms, self.subtotal, &self.services, &self.products);
                applied.discount_amount = breakdown.discount_amount;
                breakdown.discount_amount
            }
        };

        self.total = (self.subtotal - self.discount_amount + self.tax).non_negative();
    }

    /// The redemption to record when this invoice is paid, if a promotion
    /// is attached.
    pub fn promotion_usage(&self) -> Option<PromotionUsage> {
        self.applied_promotion().map(|applied| PromotionUsage {
            promotion_id: applied.id.clone(),
            transaction_id: self.id.clone(),
            client_id: self.client_id.clone(),
        })
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn ensure(&self, action: LifecycleAction) -> CoreResult<TransactionStatus> {
        self.status
            .transition(action)
            .ok_or_else(|| CoreError::InvalidTransactionStatus {
                transaction_id: self.id.clone(),
                current_status: self.status,
                operation: action.describe().to_string(),
            })
    }

    /// Cart, client name, discount and tax rules shared by create and edit.
    fn check_contents(&mut self) -> CoreResult<()> {
        let items = self.line_items();
        if items.is_empty() {
            return Err(CoreError::EmptyTransaction);
        }
        validate_line_items(&items)?;

        let name = validate_client_name(&self.client_info.name)?;
        self.client_info.name = if !name.is_empty() {
            name
        } else if self.services.is_empty() {
            WALK_IN_CLIENT_NAME.to_string()
        } else {
            return Err(CoreError::ClientNameRequired);
        };

        validate_discount_percent(self.discount())?;
        validate_amount("tax", self.tax)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, StaticGrants};
    use crate::types::{ApplicableTo, DiscountTerms, UsageType};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 14, 30, 0).unwrap()
    }

    fn haircut() -> ServiceLine {
        ServiceLine::new("svc-cut", "Haircut", Money::from_cents(85_000))
    }

    fn new_tx(services: Vec<ServiceLine>, products: Vec<ProductLine>) -> NewTransaction {
        NewTransaction {
            branch_id: "branch-1".to_string(),
            client_id: Some("client-1".to_string()),
            client_info: ClientInfo::named("Ana Reyes"),
            services,
            products,
            ..Default::default()
        }
    }

    fn promo(terms: DiscountTerms, usage_type: UsageType) -> Promotion {
        Promotion {
            id: "promo-1".to_string(),
            branch_id: "branch-1".to_string(),
            promotion_code: "SVC10".to_string(),
            title: "10% off services".to_string(),
            description: None,
            terms,
            usage_type,
            used_by: BTreeSet::new(),
            max_uses: Some(100),
            usage_count: 0,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            is_active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_end_to_end_invoice() {
        let service = haircut().with_adjustment(Money::from_cents(-10_000), "Short hair");
        let mut tx = Transaction::create("tx-1", new_tx(vec![service], vec![]), now()).unwrap();
        assert_eq!(tx.services[0].adjusted_price.cents(), 75_000);
        assert_eq!(tx.status, TransactionStatus::InService);
        assert!(tx.payment_method.is_none());

        let promotion = promo(
            DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::Services),
            UsageType::Repeating,
        );
        let breakdown = tx.attach_promotion(&promotion, now()).unwrap();
        assert_eq!(breakdown.discount_amount.cents(), 7_500);
        assert_eq!(tx.discount_amount.cents(), 7_500);
        assert_eq!(tx.total.cents(), 67_500);
        assert!(tx.discount().is_zero());

        tx.process_payment(&PaymentRequest::cash(Money::from_cents(70_000)), now())
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Paid);
        assert_eq!(tx.change, Some(Money::from_cents(2_500)));
        assert_eq!(tx.processed_at, Some(now()));

        let usage = tx.promotion_usage().unwrap();
        assert_eq!(usage.promotion_id, "promo-1");
        assert_eq!(usage.transaction_id, "tx-1");
        assert_eq!(usage.client_id.as_deref(), Some("client-1"));
    }

    #[test]
    fn test_total_invariant() {
        let cases = [
            (85_000, 0, 0),
            (85_000, 2_000, 5_000),
            (10_000, 10_000, 0),
            (10_000, 10_000, 1_500),
            (333, 3_333, 7),
        ];

        for (price, discount_bps, tax) in cases {
            let mut new = new_tx(vec![ServiceLine::new("s", "Svc", Money::from_cents(price))], vec![]);
            new.discount = Percent::from_bps(discount_bps);
            new.tax = Money::from_cents(tax);
            let tx = Transaction::create("tx", new, now()).unwrap();

            let expected = (tx.subtotal - tx.discount_amount + tx.tax).non_negative();
            assert_eq!(tx.total, expected);
            assert!(!tx.total.is_negative());
        }
    }

    #[test]
    fn test_fixed_promotion_larger_than_cart_never_goes_negative() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        let promotion = promo(
            DiscountTerms::fixed(Money::from_cents(500_000), ApplicableTo::All),
            UsageType::Repeating,
        );
        tx.attach_promotion(&promotion, now()).unwrap();
        assert_eq!(tx.discount_amount.cents(), 85_000);
        assert!(tx.total.is_zero());
    }

    #[test]
    fn test_change_computation() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        assert_eq!(tx.total.cents(), 85_000);

        let err = tx
            .process_payment(&PaymentRequest::cash(Money::from_cents(80_000)), now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
        assert_eq!(tx.status, TransactionStatus::InService);

        tx.process_payment(&PaymentRequest::cash(Money::from_cents(100_000)), now())
            .unwrap();
        assert_eq!(tx.change, Some(Money::from_cents(15_000)));
    }

    #[test]
    fn test_card_payment_has_no_change() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        tx.process_payment(&PaymentRequest::card(), now()).unwrap();
        assert_eq!(tx.payment_method, Some(PaymentMethod::Card));
        assert!(tx.amount_received.is_none());
        assert!(tx.change.is_none());
    }

    #[test]
    fn test_payment_method_required() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        let err = tx.process_payment(&PaymentRequest::default(), now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn test_paid_cannot_be_edited_or_paid_again() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        tx.process_payment(&PaymentRequest::card(), now()).unwrap();

        let edit = TransactionEdit {
            tax: Some(Money::from_cents(100)),
            ..Default::default()
        };
        assert!(matches!(
            tx.edit(edit, now()).unwrap_err(),
            CoreError::InvalidTransactionStatus { .. }
        ));
        assert!(tx.process_payment(&PaymentRequest::card(), now()).is_err());
        assert!(tx.detach_promotion(now()).is_err());
    }

    #[test]
    fn test_voided_is_terminal() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        tx.void("Client left", "mgr-1", &AllowAll, now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Voided);
        let snapshot = tx.clone();

        assert!(tx.edit(TransactionEdit::default(), now()).is_err());
        assert!(tx.process_payment(&PaymentRequest::card(), now()).is_err());
        assert!(tx.void("again", "mgr-1", &AllowAll, now()).is_err());
        assert_eq!(tx, snapshot);
    }

    #[test]
    fn test_void_paid_needs_privileged_capability() {
        let cashier_only = StaticGrants::new().grant("cashier", Capability::VoidTransaction);

        let mut open = Transaction::create("tx-a", new_tx(vec![haircut()], vec![]), now()).unwrap();
        open.void("Mistake", "cashier", &cashier_only, now()).unwrap();

        let mut paid = Transaction::create("tx-b", new_tx(vec![haircut()], vec![]), now()).unwrap();
        paid.process_payment(&PaymentRequest::card(), now()).unwrap();
        let err = paid.void("Refund", "cashier", &cashier_only, now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Unauthorized {
                capability: Capability::VoidPaidTransaction,
                ..
            }
        ));
        assert_eq!(paid.status, TransactionStatus::Paid);
    }

    #[test]
    fn test_void_reason_required() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        assert!(tx.void("   ", "mgr-1", &AllowAll, now()).is_err());
        assert_eq!(tx.status, TransactionStatus::InService);
    }

    #[test]
    fn test_create_rules() {
        let empty = new_tx(vec![], vec![]);
        assert!(matches!(
            Transaction::create("tx", empty, now()).unwrap_err(),
            CoreError::EmptyTransaction
        ));

        let mut nameless = new_tx(vec![haircut()], vec![]);
        nameless.client_info = ClientInfo::default();
        assert!(matches!(
            Transaction::create("tx", nameless, now()).unwrap_err(),
            CoreError::ClientNameRequired
        ));

        let mut walk_in = new_tx(
            vec![],
            vec![ProductLine::new("p1", "Serum", Money::from_cents(45_000), 1)],
        );
        walk_in.client_id = None;
        walk_in.client_info = ClientInfo::default();
        let tx = Transaction::create("tx", walk_in, now()).unwrap();
        assert_eq!(tx.client_info.name, WALK_IN_CLIENT_NAME);
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_overflowed() {
        let serum = ProductLine::new("p", "Serum", Money::from_cents(i64::MAX / 2), 3);
        let err = Transaction::create("tx", new_tx(vec![], vec![serum]), now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let mut taxed = new_tx(vec![haircut()], vec![]);
        taxed.tax = Money::from_cents(i64::MAX);
        let err = Transaction::create("tx", taxed, now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        // Largest cart the validator accepts still totals exactly.
        let full_cart: Vec<ProductLine> = (0..crate::MAX_LINE_ITEMS)
            .map(|i| {
                ProductLine::new(
                    format!("p{i}"),
                    "Serum",
                    Money::from_cents(crate::MAX_AMOUNT_CENTS),
                    crate::MAX_ITEM_QUANTITY,
                )
            })
            .collect();
        let mut tx = Transaction::create("tx", new_tx(vec![], full_cart), now()).unwrap();
        let expected = crate::MAX_AMOUNT_CENTS * crate::MAX_ITEM_QUANTITY * crate::MAX_LINE_ITEMS as i64;
        assert_eq!(tx.total.cents(), expected);

        let err = tx
            .process_payment(&PaymentRequest::cash(Money::from_cents(i64::MAX)), now())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
        assert_eq!(tx.status, TransactionStatus::InService);
    }

    #[test]
    fn test_manual_discount_detaches_promotion() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        let promotion = promo(
            DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::All),
            UsageType::Repeating,
        );
        tx.attach_promotion(&promotion, now()).unwrap();
        assert!(tx.applied_promotion().is_some());

        let edit = TransactionEdit {
            discount: Some(Percent::from_whole(5)),
            ..Default::default()
        };
        tx.edit(edit, now()).unwrap();
        assert!(tx.applied_promotion().is_none());
        assert!(tx.promotion_usage().is_none());
        assert_eq!(tx.discount_amount.cents(), 4_250);
    }

    #[test]
    fn test_editing_items_recomputes_promotion_discount() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        let promotion = promo(
            DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::Services),
            UsageType::Repeating,
        );
        tx.attach_promotion(&promotion, now()).unwrap();

        let edit = TransactionEdit {
            products: Some(vec![ProductLine::new("p1", "Serum", Money::from_cents(45_000), 2)]),
            ..Default::default()
        };
        tx.edit(edit, now()).unwrap();
        // products are out of scope; discount stays on the 850.00 service
        assert_eq!(tx.discount_amount.cents(), 8_500);
        assert_eq!(tx.applied_promotion().unwrap().discount_amount.cents(), 8_500);
        assert_eq!(tx.total.cents(), 85_000 + 90_000 - 8_500);
    }

    #[test]
    fn test_rejected_edit_leaves_invoice_unchanged() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        let before = tx.clone();

        let edit = TransactionEdit {
            services: Some(vec![]),
            ..Default::default()
        };
        assert!(tx.edit(edit, now()).is_err());
        assert_eq!(tx, before);
    }

    #[test]
    fn test_ineligible_promotion_is_not_attached() {
        let mut tx = Transaction::create("tx", new_tx(vec![haircut()], vec![]), now()).unwrap();
        let mut promotion = promo(
            DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::All),
            UsageType::OneTime,
        );
        promotion.used_by.insert("client-1".to_string());

        assert!(matches!(
            tx.attach_promotion(&promotion, now()).unwrap_err(),
            CoreError::PromotionIneligible(_)
        ));
        assert!(tx.applied_promotion().is_none());
    }
}
