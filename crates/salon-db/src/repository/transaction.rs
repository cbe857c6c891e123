//! # Transaction Repository
//!
//! Database operations for invoices.
//!
//! ## Write Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Optimistic Concurrency                               │
//! │                                                                         │
//! │  Register A loads tx (version 3)      Register B loads tx (version 3)  │
//! │       │                                    │                            │
//! │       ▼                                    │                            │
//! │  UPDATE ... SET version = 4                │                            │
//! │  WHERE id = ? AND version = 3  ✓           │                            │
//! │                                            ▼                            │
//! │                               UPDATE ... WHERE version = 3  ✗ 0 rows   │
//! │                               → DbError::Conflict (reload, retry)      │
//! │                                                                         │
//! │  Payment: status update + promotion usage in ONE database transaction  │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ BEGIN                                                         │     │
//! │  │   UPDATE transactions ... WHERE id = ? AND version = ?        │     │
//! │  │   INSERT OR IGNORE INTO promotion_redemptions ...             │     │
//! │  │   UPDATE promotions SET usage_count = usage_count + 1         │     │
//! │  │     WHERE max_uses IS NULL OR usage_count < max_uses          │     │
//! │  │ COMMIT  (any failure → ROLLBACK, invoice stays in_service)    │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

use salon_core::promotion::UsageOutcome;
use salon_core::{
    AppliedPromotion, ClientInfo, DiscountSource, Money, PaymentMethod, Percent, Transaction,
    TransactionStatus,
};

use crate::error::{DbError, DbResult};
use crate::repository::promotion::record_usage_in;
use crate::timestamp::{from_millis, from_millis_opt, to_millis, to_millis_opt};

const TRANSACTION_COLUMNS: &str = r#"
    id, branch_id, client_id, client_name, client_phone, client_email,
    status, services, products,
    subtotal_cents, discount_bps, applied_promotion, discount_cents, tax_cents, total_cents,
    payment_method, amount_received_cents, change_cents,
    void_reason, voided_by, voided_at,
    created_at, updated_at, processed_at, version
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    branch_id: String,
    client_id: Option<String>,
    client_name: String,
    client_phone: Option<String>,
    client_email: Option<String>,
    status: TransactionStatus,
    services: String,
    products: String,
    subtotal_cents: i64,
    discount_bps: i64,
    applied_promotion: Option<String>,
    discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    payment_method: Option<PaymentMethod>,
    amount_received_cents: Option<i64>,
    change_cents: Option<i64>,
    void_reason: Option<String>,
    voided_by: Option<String>,
    voided_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
    processed_at: Option<i64>,
    version: i64,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        let discount_source = match row.applied_promotion {
            Some(json) => DiscountSource::Promotion(serde_json::from_str::<AppliedPromotion>(&json)?),
            None => {
                let bps = u32::try_from(row.discount_bps).map_err(|_| {
                    DbError::Serialization(format!("discount out of range: {}", row.discount_bps))
                })?;
                DiscountSource::Manual {
                    percent: Percent::from_bps(bps),
                }
            }
        };

        Ok(Transaction {
            id: row.id,
            branch_id: row.branch_id,
            client_id: row.client_id,
            client_info: ClientInfo {
                name: row.client_name,
                phone: row.client_phone,
                email: row.client_email,
            },
            status: row.status,
            services: serde_json::from_str(&row.services)?,
            products: serde_json::from_str(&row.products)?,
            subtotal: Money::from_cents(row.subtotal_cents),
            discount_source,
            discount_amount: Money::from_cents(row.discount_cents),
            tax: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
            payment_method: row.payment_method,
            amount_received: row.amount_received_cents.map(Money::from_cents),
            change: row.change_cents.map(Money::from_cents),
            void_reason: row.void_reason,
            voided_by: row.voided_by,
            voided_at: from_millis_opt(row.voided_at)?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
            processed_at: from_millis_opt(row.processed_at)?,
            version: row.version,
        })
    }
}

/// The columns that need encoding before they can be bound.
struct EncodedColumns {
    services: String,
    products: String,
    discount_bps: i64,
    applied_promotion: Option<String>,
}

impl EncodedColumns {
    fn encode(tx: &Transaction) -> DbResult<Self> {
        Ok(EncodedColumns {
            services: serde_json::to_string(&tx.services)?,
            products: serde_json::to_string(&tx.products)?,
            discount_bps: tx.discount().bps() as i64,
            applied_promotion: tx
                .applied_promotion()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }
}

/// Writes every mutable column of `tx` if the stored version still matches.
///
/// Returns the number of rows updated (0 or 1).
async fn update_row<'e, E>(executor: E, tx: &Transaction) -> DbResult<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let cols = EncodedColumns::encode(tx)?;

    let result = sqlx::query(
        r#"
        UPDATE transactions SET
            client_id = ?3,
            client_name = ?4,
            client_phone = ?5,
            client_email = ?6,
            status = ?7,
            services = ?8,
            products = ?9,
            subtotal_cents = ?10,
            discount_bps = ?11,
            applied_promotion = ?12,
            discount_cents = ?13,
            tax_cents = ?14,
            total_cents = ?15,
            payment_method = ?16,
            amount_received_cents = ?17,
            change_cents = ?18,
            void_reason = ?19,
            voided_by = ?20,
            voided_at = ?21,
            updated_at = ?22,
            processed_at = ?23,
            version = version + 1
        WHERE id = ?1 AND version = ?2
        "#,
    )
    .bind(tx.id.as_str())
    .bind(tx.version)
    .bind(tx.client_id.as_deref())
    .bind(tx.client_info.name.as_str())
    .bind(tx.client_info.phone.as_deref())
    .bind(tx.client_info.email.as_deref())
    .bind(tx.status)
    .bind(cols.services)
    .bind(cols.products)
    .bind(tx.subtotal.cents())
    .bind(cols.discount_bps)
    .bind(cols.applied_promotion)
    .bind(tx.discount_amount.cents())
    .bind(tx.tax.cents())
    .bind(tx.total.cents())
    .bind(tx.payment_method)
    .bind(tx.amount_received.map(|m| m.cents()))
    .bind(tx.change.map(|m| m.cents()))
    .bind(tx.void_reason.as_deref())
    .bind(tx.voided_by.as_deref())
    .bind(to_millis_opt(tx.voided_at))
    .bind(to_millis(tx.updated_at))
    .bind(to_millis_opt(tx.processed_at))
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");

        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// Inserts a new invoice. The stored version starts at `tx.version`.
    pub async fn insert(&self, tx: &Transaction) -> DbResult<()> {
        debug!(id = %tx.id, branch_id = %tx.branch_id, total = %tx.total, "Inserting transaction");

        let cols = EncodedColumns::encode(tx)?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, branch_id, client_id, client_name, client_phone, client_email,
                status, services, products,
                subtotal_cents, discount_bps, applied_promotion, discount_cents, tax_cents, total_cents,
                payment_method, amount_received_cents, change_cents,
                void_reason, voided_by, voided_at,
                created_at, updated_at, processed_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18,
                ?19, ?20, ?21,
                ?22, ?23, ?24, ?25
            )
            "#,
        )
        .bind(tx.id.as_str())
        .bind(tx.branch_id.as_str())
        .bind(tx.client_id.as_deref())
        .bind(tx.client_info.name.as_str())
        .bind(tx.client_info.phone.as_deref())
        .bind(tx.client_info.email.as_deref())
        .bind(tx.status)
        .bind(cols.services)
        .bind(cols.products)
        .bind(tx.subtotal.cents())
        .bind(cols.discount_bps)
        .bind(cols.applied_promotion)
        .bind(tx.discount_amount.cents())
        .bind(tx.tax.cents())
        .bind(tx.total.cents())
        .bind(tx.payment_method)
        .bind(tx.amount_received.map(|m| m.cents()))
        .bind(tx.change.map(|m| m.cents()))
        .bind(tx.void_reason.as_deref())
        .bind(tx.voided_by.as_deref())
        .bind(to_millis_opt(tx.voided_at))
        .bind(to_millis(tx.created_at))
        .bind(to_millis(tx.updated_at))
        .bind(to_millis_opt(tx.processed_at))
        .bind(tx.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Saves an edited invoice.
    ///
    /// `tx.version` must be the version that was loaded; the returned copy
    /// carries the new version.
    ///
    /// ## Errors
    /// - `Conflict` if someone else saved in between
    /// - `NotFound` if the invoice does not exist
    pub async fn update(&self, tx: &Transaction) -> DbResult<Transaction> {
        debug!(id = %tx.id, version = tx.version, status = %tx.status, "Updating transaction");

        if update_row(&self.pool, tx).await? == 0 {
            return Err(self.stale_write_error(&tx.id).await);
        }

        Ok(Transaction {
            version: tx.version + 1,
            ..tx.clone()
        })
    }

    /// Saves a just-paid invoice and records its promotion usage atomically.
    ///
    /// Both writes share one database transaction. If the usage guard
    /// refuses (`DbError::UsageRejected`) or the version is stale, nothing
    /// is written and the stored invoice is still `in_service`.
    pub async fn mark_paid(&self, tx: &Transaction) -> DbResult<(Transaction, Option<UsageOutcome>)> {
        if tx.status != TransactionStatus::Paid {
            return Err(DbError::Internal(format!(
                "mark_paid called for transaction {} in status {}",
                tx.id, tx.status
            )));
        }

        let mut db_tx = self.pool.begin().await?;

        if update_row(&mut *db_tx, tx).await? == 0 {
            db_tx.rollback().await?;
            return Err(self.stale_write_error(&tx.id).await);
        }

        let outcome = match tx.promotion_usage() {
            Some(usage) => Some(record_usage_in(&mut *db_tx, &usage, tx.updated_at).await?),
            None => None,
        };

        db_tx.commit().await?;

        info!(
            id = %tx.id,
            total = %tx.total,
            promotion_usage = ?outcome,
            "Transaction marked paid"
        );

        Ok((
            Transaction {
                version: tx.version + 1,
                ..tx.clone()
            },
            outcome,
        ))
    }

    /// Lists a branch's invoices created within `[start, end]`, oldest first.
    pub async fn list_for_day(
        &self,
        branch_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE branch_id = ?1 AND created_at BETWEEN ?2 AND ?3 \
             ORDER BY created_at, id"
        );

        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(branch_id)
            .bind(to_millis(start))
            .bind(to_millis(end))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Sums `total` over a branch's invoices created within `[start, end]`
    /// whose status is one of `statuses`.
    pub async fn daily_sales_total(
        &self,
        branch_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[TransactionStatus],
    ) -> DbResult<Money> {
        if statuses.is_empty() {
            return Ok(Money::zero());
        }

        let placeholders = (0..statuses.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT COALESCE(SUM(total_cents), 0) FROM transactions \
             WHERE branch_id = ?1 AND created_at BETWEEN ?2 AND ?3 \
             AND status IN ({placeholders})"
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql)
            .bind(branch_id)
            .bind(to_millis(start))
            .bind(to_millis(end));
        for status in statuses {
            query = query.bind(*status);
        }

        let total = query.fetch_one(&self.pool).await?;
        Ok(Money::from_cents(total))
    }

    /// Distinguishes a stale version from a missing row after an update
    /// touched nothing.
    async fn stale_write_error(&self, id: &str) -> DbError {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await;

        match exists {
            Ok(0) => DbError::not_found("Transaction", id),
            Ok(_) => DbError::conflict("Transaction", id),
            Err(err) => err.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
