//! # Transaction Commands
//!
//! Invoice lifecycle: create, edit, attach promotions, take payment, void.
//!
//! ```text
//!   create_transaction ──► in_service ──── process_payment ────► paid
//!                            │  ▲                                  │
//!       edit / apply_promotion │  │                                │ void (VoidPaidTransaction)
//!       remove_promotion       └──┘                                ▼
//!                            │                                  voided
//!                            └──── void (VoidTransaction) ────────►
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use salon_core::discount::DiscountBreakdown;
use salon_core::lifecycle::{NewTransaction, PaymentRequest, TransactionEdit};
use salon_core::promotion::{self as promotion_rules, UsageOutcome};
use salon_core::reconcile::business_day_bounds;
use salon_core::validation::normalize_promotion_code;
use salon_core::{CoreError, Promotion, Transaction};

use super::SalonEngine;
use crate::error::EngineResult;

/// What `process_payment` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub transaction: Transaction,
    /// `None` when no promotion was attached.
    pub promotion_usage: Option<UsageOutcome>,
}

impl SalonEngine {
    /// Rings up a new `in_service` invoice.
    pub async fn create_transaction(&self, new: NewTransaction) -> EngineResult<Transaction> {
        debug!(
            branch_id = %new.branch_id,
            services = new.services.len(),
            products = new.products.len(),
            "create_transaction command"
        );

        let tx = Transaction::create(Uuid::new_v4().to_string(), new, self.now())?;
        self.db.transactions().insert(&tx).await?;

        info!(id = %tx.id, total = %tx.total, "Transaction created");
        Ok(tx)
    }

    pub async fn get_transaction(&self, id: &str) -> EngineResult<Transaction> {
        debug!(id, "get_transaction command");
        self.load_transaction(id).await
    }

    /// Invoices a branch rang up on a business day, oldest first.
    pub async fn list_transactions_for_day(
        &self,
        branch_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Vec<Transaction>> {
        debug!(branch_id, %date, "list_transactions_for_day command");

        let (start, end) = business_day_bounds(date, self.config.utc_offset());
        Ok(self.db.transactions().list_for_day(branch_id, start, end).await?)
    }

    /// Changes lines, discount, tax or client details of an open invoice.
    pub async fn edit_transaction(&self, id: &str, edit: TransactionEdit) -> EngineResult<Transaction> {
        debug!(id, "edit_transaction command");

        let mut tx = self.load_transaction(id).await?;
        if let Err(e) = tx.edit(edit, self.now()) {
            warn!(id, error = %e, "Edit rejected");
            return Err(e.into());
        }

        let saved = self.db.transactions().update(&tx).await?;
        debug!(id, total = %saved.total, version = saved.version, "Transaction edited");
        Ok(saved)
    }

    /// What a promotion code would take off an invoice. Changes nothing.
    pub async fn preview_promotion(&self, id: &str, code: &str) -> EngineResult<DiscountBreakdown> {
        debug!(id, code, "preview_promotion command");

        let tx = self.load_transaction(id).await?;
        let promotion = self.eligible_promotion(&tx, code).await?;
        Ok(tx.preview_promotion(&promotion, self.now())?)
    }

    /// Attaches a promotion by code, replacing any manual discount.
    ///
    /// Usage is recorded when the invoice is paid, not here.
    pub async fn apply_promotion(&self, id: &str, code: &str) -> EngineResult<Transaction> {
        debug!(id, code, "apply_promotion command");

        let mut tx = self.load_transaction(id).await?;
        let promotion = self.eligible_promotion(&tx, code).await?;
        let breakdown = tx.attach_promotion(&promotion, self.now())?;

        let saved = self.db.transactions().update(&tx).await?;
        info!(
            id,
            promotion = %promotion.promotion_code,
            discount = %breakdown.discount_amount,
            total = %saved.total,
            "Promotion applied"
        );
        Ok(saved)
    }

    /// Detaches the promotion; the discount returns to 0%.
    pub async fn remove_promotion(&self, id: &str) -> EngineResult<Transaction> {
        debug!(id, "remove_promotion command");

        let mut tx = self.load_transaction(id).await?;
        tx.detach_promotion(self.now())?;

        let saved = self.db.transactions().update(&tx).await?;
        info!(id, total = %saved.total, "Promotion removed");
        Ok(saved)
    }

    /// Takes payment and marks the invoice paid.
    ///
    /// An attached promotion is re-checked against its current state and
    /// its usage recorded in the same database transaction as the status
    /// change. If the usage guard refuses, nothing is saved and the
    /// invoice stays `in_service`.
    pub async fn process_payment(&self, id: &str, payment: PaymentRequest) -> EngineResult<PaymentResult> {
        debug!(id, method = ?payment.method, "process_payment command");

        let now = self.now();
        let mut tx = self.load_transaction(id).await?;

        if let Some(applied) = tx.applied_promotion() {
            let current = self.db.promotions().get_by_id(&applied.id).await?;
            if let Err(reason) = promotion_rules::validate(current.as_ref(), &applied.code, tx.client_id.as_deref(), now) {
                warn!(id, promotion = %applied.code, %reason, "Attached promotion no longer eligible");
                return Err(CoreError::from(reason).into());
            }
        }

        if let Err(e) = tx.process_payment(&payment, now) {
            warn!(id, error = %e, "Payment rejected");
            return Err(e.into());
        }

        let (saved, promotion_usage) = match self.db.transactions().mark_paid(&tx).await {
            Ok(result) => result,
            Err(e) => {
                warn!(id, error = %e, "Payment not saved");
                return Err(e.into());
            }
        };

        info!(
            id,
            method = ?saved.payment_method,
            total = %saved.total,
            change = ?saved.change.map(|c| c.to_string()),
            "Payment processed"
        );
        Ok(PaymentResult {
            transaction: saved,
            promotion_usage,
        })
    }

    /// Voids an invoice. Voiding a paid invoice needs the stronger
    /// capability.
    pub async fn void_transaction(&self, id: &str, reason: &str, actor_id: &str) -> EngineResult<Transaction> {
        debug!(id, actor_id, "void_transaction command");

        let mut tx = self.load_transaction(id).await?;
        if let Err(e) = tx.void(reason, actor_id, self.auth.as_ref(), self.now()) {
            warn!(id, actor_id, error = %e, "Void rejected");
            return Err(e.into());
        }

        let saved = self.db.transactions().update(&tx).await?;
        info!(id, actor_id, "Transaction voided");
        Ok(saved)
    }

    /// Looks a code up at the invoice's branch and runs every eligibility
    /// check for the invoice's client.
    async fn eligible_promotion(&self, tx: &Transaction, code: &str) -> EngineResult<Promotion> {
        let code = normalize_promotion_code(code)?;
        let found = self.db.promotions().find_by_code(&tx.branch_id, &code).await?;

        match promotion_rules::validate(found.as_ref(), &code, tx.client_id.as_deref(), self.now()) {
            Ok(promotion) => Ok(promotion.clone()),
            Err(reason) => {
                warn!(id = %tx.id, code = %code, %reason, "Promotion ineligible");
                Err(CoreError::PromotionIneligible(reason).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::Duration;
    use salon_core::auth::StaticGrants;
    use salon_core::{
        ApplicableTo, Capability, ClientInfo, DiscountTerms, Money, PaymentMethod, Percent, ProductLine,
        ServiceLine, TransactionStatus, UsageType,
    };

    use super::*;
    use crate::commands::test_support::{engine, opening_time};
    use crate::error::ErrorKind;

    fn promotion(code: &str, usage_type: UsageType, terms: DiscountTerms) -> Promotion {
        Promotion {
            id: format!("promo-{}", code.to_lowercase()),
            branch_id: "branch-1".to_string(),
            promotion_code: code.to_string(),
            title: format!("{code} offer"),
            description: None,
            terms,
            usage_type,
            used_by: BTreeSet::new(),
            max_uses: None,
            usage_count: 0,
            start_date: opening_time() - Duration::days(1),
            end_date: opening_time() + Duration::days(30),
            is_active: true,
            created_at: opening_time(),
            updated_at: opening_time(),
        }
    }

    fn ten_percent_on_services(usage_type: UsageType) -> Promotion {
        promotion(
            "WELCOME10",
            usage_type,
            DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::Services),
        )
    }

    fn color_service(client_id: Option<&str>) -> NewTransaction {
        NewTransaction {
            branch_id: "branch-1".to_string(),
            client_id: client_id.map(str::to_string),
            client_info: ClientInfo::named("Maria Santos"),
            services: vec![ServiceLine::new("svc-color", "Hair Color", Money::from_cents(85_000))
                .with_adjustment(Money::from_cents(-10_000), "Loyalty")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_repeating_promotion() {
        let (engine, _clock) = engine().await;
        let promo = ten_percent_on_services(UsageType::Repeating);
        engine.database().promotions().insert(&promo).await.unwrap();

        let tx = engine.create_transaction(color_service(None)).await.unwrap();
        assert_eq!(tx.services[0].adjusted_price, Money::from_cents(75_000));
        assert_eq!(tx.status, TransactionStatus::InService);
        assert_eq!(tx.payment_method, None);

        let tx = engine.apply_promotion(&tx.id, "welcome10").await.unwrap();
        assert_eq!(tx.discount_amount, Money::from_cents(7_500));
        assert_eq!(tx.total, Money::from_cents(67_500));
        assert_eq!(tx.version, 1);

        let paid = engine
            .process_payment(&tx.id, PaymentRequest::cash(Money::from_cents(70_000)))
            .await
            .unwrap();
        assert_eq!(paid.transaction.status, TransactionStatus::Paid);
        assert_eq!(paid.transaction.change, Some(Money::from_cents(2_500)));
        assert_eq!(paid.transaction.processed_at, Some(opening_time()));
        assert_eq!(paid.promotion_usage, Some(UsageOutcome::Recorded));

        let stored = engine.database().promotions().get_by_id(&promo.id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
        assert_eq!(engine.get_transaction(&tx.id).await.unwrap(), paid.transaction);
    }

    #[tokio::test]
    async fn test_end_to_end_one_time_promotion() {
        let (engine, _clock) = engine().await;
        let promo = ten_percent_on_services(UsageType::OneTime);
        engine.database().promotions().insert(&promo).await.unwrap();

        let tx = engine.create_transaction(color_service(Some("client-7"))).await.unwrap();
        engine.apply_promotion(&tx.id, "WELCOME10").await.unwrap();
        engine
            .process_payment(&tx.id, PaymentRequest::cash(Money::from_cents(70_000)))
            .await
            .unwrap();

        let stored = engine.database().promotions().get_by_id(&promo.id).await.unwrap().unwrap();
        assert!(stored.used_by.contains("client-7"));
        assert_eq!(stored.usage_count, 0);

        // the same client cannot apply it to a second invoice
        let second = engine.create_transaction(color_service(Some("client-7"))).await.unwrap();
        let err = engine.apply_promotion(&second.id, "WELCOME10").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PromotionIneligible);
        assert_eq!(err.message, "This client has already used this promotion");
    }

    #[tokio::test]
    async fn test_walk_in_product_sale_paid_by_card() {
        let (engine, _clock) = engine().await;

        let tx = engine
            .create_transaction(NewTransaction {
                branch_id: "branch-1".to_string(),
                products: vec![ProductLine::new("prod-shampoo", "Shampoo", Money::from_cents(35_000), 2)],
                tax: Money::from_cents(1_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tx.client_info.name, "Walk-in");
        assert_eq!(tx.total, Money::from_cents(71_000));

        let paid = engine.process_payment(&tx.id, PaymentRequest::card()).await.unwrap();
        assert_eq!(paid.transaction.payment_method, Some(PaymentMethod::Card));
        assert_eq!(paid.transaction.amount_received, None);
        assert_eq!(paid.transaction.change, None);
        assert_eq!(paid.promotion_usage, None);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (engine, _clock) = engine().await;

        let err = engine
            .create_transaction(NewTransaction {
                branch_id: "branch-1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);

        let mut nameless = color_service(None);
        nameless.client_info = ClientInfo::default();
        let err = engine.create_transaction(nameless).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(err.message, "Client name is required when the sale includes services");
    }

    #[tokio::test]
    async fn test_insufficient_cash_leaves_invoice_open() {
        let (engine, _clock) = engine().await;
        let tx = engine.create_transaction(color_service(None)).await.unwrap();

        let err = engine
            .process_payment(&tx.id, PaymentRequest::cash(Money::from_cents(50_000)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientPayment);

        let stored = engine.get_transaction(&tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::InService);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_paid_invoice_is_frozen() {
        let (engine, _clock) = engine().await;
        let tx = engine.create_transaction(color_service(None)).await.unwrap();
        engine.process_payment(&tx.id, PaymentRequest::card()).await.unwrap();

        let err = engine
            .edit_transaction(
                &tx.id,
                TransactionEdit {
                    tax: Some(Money::from_cents(500)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        let err = engine.process_payment(&tx.id, PaymentRequest::card()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_manual_discount_detaches_promotion() {
        let (engine, _clock) = engine().await;
        engine
            .database()
            .promotions()
            .insert(&ten_percent_on_services(UsageType::Repeating))
            .await
            .unwrap();

        let tx = engine.create_transaction(color_service(None)).await.unwrap();
        engine.apply_promotion(&tx.id, "WELCOME10").await.unwrap();

        let edited = engine
            .edit_transaction(
                &tx.id,
                TransactionEdit {
                    discount: Some(Percent::from_whole(20)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(edited.applied_promotion().is_none());
        assert_eq!(edited.discount_amount, Money::from_cents(15_000));

        let paid = engine.process_payment(&tx.id, PaymentRequest::card()).await.unwrap();
        assert_eq!(paid.promotion_usage, None);
    }

    #[tokio::test]
    async fn test_preview_and_remove_promotion() {
        let (engine, _clock) = engine().await;
        engine
            .database()
            .promotions()
            .insert(&promotion(
                "FLAT100",
                UsageType::Repeating,
                DiscountTerms::fixed(Money::from_cents(10_000), ApplicableTo::All),
            ))
            .await
            .unwrap();
        let tx = engine.create_transaction(color_service(None)).await.unwrap();

        let breakdown = engine.preview_promotion(&tx.id, "flat100").await.unwrap();
        assert_eq!(breakdown.discount_amount, Money::from_cents(10_000));
        assert_eq!(engine.get_transaction(&tx.id).await.unwrap().version, 0);

        engine.apply_promotion(&tx.id, "FLAT100").await.unwrap();
        let removed = engine.remove_promotion(&tx.id).await.unwrap();
        assert!(removed.applied_promotion().is_none());
        assert_eq!(removed.total, Money::from_cents(75_000));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_codes() {
        let (engine, _clock) = engine().await;
        let tx = engine.create_transaction(color_service(None)).await.unwrap();

        let err = engine.apply_promotion(&tx.id, "NOSUCH").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PromotionIneligible);
        assert_eq!(err.message, "Promotion code NOSUCH was not found");

        let err = engine.apply_promotion(&tx.id, "bad code!").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_promotion_expiring_before_payment() {
        let (engine, clock) = engine().await;
        let mut promo = ten_percent_on_services(UsageType::Repeating);
        promo.end_date = opening_time() + Duration::hours(1);
        engine.database().promotions().insert(&promo).await.unwrap();

        let tx = engine.create_transaction(color_service(None)).await.unwrap();
        engine.apply_promotion(&tx.id, "WELCOME10").await.unwrap();

        clock.advance(Duration::hours(2));
        let err = engine.process_payment(&tx.id, PaymentRequest::card()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PromotionIneligible);
        assert_eq!(
            engine.get_transaction(&tx.id).await.unwrap().status,
            TransactionStatus::InService
        );
    }

    #[tokio::test]
    async fn test_last_use_taken_by_concurrent_sale() {
        let (engine, _clock) = engine().await;
        let mut promo = ten_percent_on_services(UsageType::Repeating);
        promo.max_uses = Some(1);
        engine.database().promotions().insert(&promo).await.unwrap();

        let first = engine.create_transaction(color_service(None)).await.unwrap();
        let second = engine.create_transaction(color_service(None)).await.unwrap();
        engine.apply_promotion(&first.id, "WELCOME10").await.unwrap();
        engine.apply_promotion(&second.id, "WELCOME10").await.unwrap();

        engine.process_payment(&first.id, PaymentRequest::card()).await.unwrap();
        let err = engine.process_payment(&second.id, PaymentRequest::card()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PromotionIneligible);
        assert_eq!(err.message, "This promotion has reached its usage limit of 1");

        let stored = engine.get_transaction(&second.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::InService);
        let promo = engine.database().promotions().get_by_id(&promo.id).await.unwrap().unwrap();
        assert_eq!(promo.usage_count, 1);
    }

    #[tokio::test]
    async fn test_stale_write_is_a_conflict() {
        let (engine, _clock) = engine().await;
        let tx = engine.create_transaction(color_service(None)).await.unwrap();
        let stale = engine.get_transaction(&tx.id).await.unwrap();

        engine
            .edit_transaction(
                &tx.id,
                TransactionEdit {
                    tax: Some(Money::from_cents(500)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err: crate::EngineError = engine.database().transactions().update(&stale).await.unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_void_needs_capability() {
        let (engine, _clock) = engine().await;
        let engine = engine.with_authorization(Arc::new(
            StaticGrants::new()
                .grant("cashier", Capability::VoidTransaction)
                .grant("manager", Capability::VoidTransaction)
                .grant("manager", Capability::VoidPaidTransaction),
        ));

        let open = engine.create_transaction(color_service(None)).await.unwrap();
        let voided = engine.void_transaction(&open.id, "Client left", "cashier").await.unwrap();
        assert_eq!(voided.status, TransactionStatus::Voided);
        assert_eq!(voided.voided_by.as_deref(), Some("cashier"));

        let paid = engine.create_transaction(color_service(None)).await.unwrap();
        engine.process_payment(&paid.id, PaymentRequest::card()).await.unwrap();

        let err = engine.void_transaction(&paid.id, "Refund", "cashier").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let err = engine.void_transaction(&paid.id, "   ", "manager").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);

        engine.void_transaction(&paid.id, "Refund", "manager").await.unwrap();
        let err = engine.void_transaction(&paid.id, "Again", "manager").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_voids_refused_without_authorization() {
        let (engine, _clock) = engine().await;
        let bare = SalonEngine::new(engine.database().clone(), engine.config().clone());

        let open = bare.create_transaction(color_service(None)).await.unwrap();
        let err = bare.void_transaction(&open.id, "Client left", "manager").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let stored = bare.get_transaction(&open.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::InService);
    }

    #[tokio::test]
    async fn test_list_for_business_day() {
        let (engine, clock) = engine().await;
        let first = engine.create_transaction(color_service(None)).await.unwrap();
        clock.advance(Duration::days(1));
        engine.create_transaction(color_service(None)).await.unwrap();

        let day: NaiveDate = opening_time().date_naive();
        let listed = engine.list_transactions_for_day("branch-1", day).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.id);
    }

    #[tokio::test]
    async fn test_missing_invoice() {
        let (engine, _clock) = engine().await;
        let err = engine.get_transaction("tx-missing").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
