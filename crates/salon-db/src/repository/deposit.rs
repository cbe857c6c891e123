//! # Deposit Repository
//!
//! End-of-day deposits. A deposit is inserted once, already classified,
//! and may then be reviewed exactly once.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use salon_core::{Deposit, DepositStatus, Money, ReconciliationStatus};

use crate::error::{DbError, DbResult};
use crate::timestamp::{from_millis, from_millis_opt, to_millis, to_millis_opt};

const DEPOSIT_COLUMNS: &str = r#"
    id, branch_id, deposit_date, amount_cents, daily_sales_total_cents, difference_cents,
    validation_status, has_anomaly, validation_message, status, notes,
    submitted_by, submitted_at, reviewed_by, reviewed_at, review_notes,
    created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct DepositRow {
    id: String,
    branch_id: String,
    deposit_date: NaiveDate,
    amount_cents: i64,
    daily_sales_total_cents: i64,
    difference_cents: i64,
    validation_status: ReconciliationStatus,
    has_anomaly: bool,
    validation_message: String,
    status: DepositStatus,
    notes: Option<String>,
    submitted_by: String,
    submitted_at: i64,
    reviewed_by: Option<String>,
    reviewed_at: Option<i64>,
    review_notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<DepositRow> for Deposit {
    type Error = DbError;

    fn try_from(row: DepositRow) -> DbResult<Self> {
        Ok(Deposit {
            id: row.id,
            branch_id: row.branch_id,
            deposit_date: row.deposit_date,
            amount: Money::from_cents(row.amount_cents),
            daily_sales_total: Money::from_cents(row.daily_sales_total_cents),
            difference: Money::from_cents(row.difference_cents),
            validation_status: row.validation_status,
            has_anomaly: row.has_anomaly,
            validation_message: row.validation_message,
            status: row.status,
            notes: row.notes,
            submitted_by: row.submitted_by,
            submitted_at: from_millis(row.submitted_at)?,
            reviewed_by: row.reviewed_by,
            reviewed_at: from_millis_opt(row.reviewed_at)?,
            review_notes: row.review_notes,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

/// Repository for deposit records.
#[derive(Debug, Clone)]
pub struct DepositRepository {
    pool: SqlitePool,
}

impl DepositRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DepositRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Deposit>> {
        let sql = format!("SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE id = ?1");

        let row: Option<DepositRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Deposit::try_from).transpose()
    }

    /// Lists a branch's deposits, most recent business day first.
    pub async fn list_by_branch(&self, branch_id: &str) -> DbResult<Vec<Deposit>> {
        let sql = format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits \
             WHERE branch_id = ?1 ORDER BY deposit_date DESC, submitted_at DESC"
        );

        let rows: Vec<DepositRow> = sqlx::query_as(&sql)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Deposit::try_from).collect()
    }

    pub async fn insert(&self, deposit: &Deposit) -> DbResult<()> {
        debug!(id = %deposit.id, branch_id = %deposit.branch_id, "Inserting deposit");

        sqlx::query(
            r#"
            INSERT INTO deposits (
                id, branch_id, deposit_date, amount_cents, daily_sales_total_cents, difference_cents,
                validation_status, has_anomaly, validation_message, status, notes,
                submitted_by, submitted_at, reviewed_by, reviewed_at, review_notes,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16,
                ?17, ?18
            )
            "#,
        )
        .bind(deposit.id.as_str())
        .bind(deposit.branch_id.as_str())
        .bind(deposit.deposit_date)
        .bind(deposit.amount.cents())
        .bind(deposit.daily_sales_total.cents())
        .bind(deposit.difference.cents())
        .bind(deposit.validation_status)
        .bind(deposit.has_anomaly)
        .bind(deposit.validation_message.as_str())
        .bind(deposit.status)
        .bind(deposit.notes.as_deref())
        .bind(deposit.submitted_by.as_str())
        .bind(to_millis(deposit.submitted_at))
        .bind(deposit.reviewed_by.as_deref())
        .bind(to_millis_opt(deposit.reviewed_at))
        .bind(deposit.review_notes.as_deref())
        .bind(to_millis(deposit.created_at))
        .bind(to_millis(deposit.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persists a review decision.
    ///
    /// Guarded on the stored status still being `submitted`, so two
    /// managers reviewing at once cannot both succeed.
    pub async fn update_review(&self, deposit: &Deposit) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE deposits SET
                status = ?2,
                reviewed_by = ?3,
                reviewed_at = ?4,
                review_notes = ?5,
                updated_at = ?6
            WHERE id = ?1 AND status = 'submitted'
            "#,
        )
        .bind(deposit.id.as_str())
        .bind(deposit.status)
        .bind(deposit.reviewed_by.as_deref())
        .bind(to_millis_opt(deposit.reviewed_at))
        .bind(deposit.review_notes.as_deref())
        .bind(to_millis(deposit.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM deposits WHERE id = ?1")
                .bind(deposit.id.as_str())
                .fetch_one(&self.pool)
                .await?;
            return Err(if exists == 0 {
                DbError::not_found("Deposit", deposit.id.as_str())
            } else {
                DbError::conflict("Deposit", deposit.id.as_str())
            });
        }

        info!(id = %deposit.id, status = %deposit.status, "Deposit reviewed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{DateTime, TimeZone, Utc};
    use salon_core::reconcile::{DepositSubmission, ReviewDecision, ToleranceBand};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 21, 0, 0).unwrap()
    }

    fn deposit(id: &str, date: NaiveDate, amount: i64, sales: i64) -> Deposit {
        Deposit::submit(
            id,
            DepositSubmission {
                branch_id: "branch-1".to_string(),
                deposit_date: date,
                amount: Money::from_cents(amount),
                submitted_by: "cashier-1".to_string(),
                notes: Some("Evening drop".to_string()),
            },
            Money::from_cents(sales),
            &ToleranceBand::default(),
            now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_day_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.deposits();

        let may1 = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let may2 = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let older = deposit("dep-1", may1, 50_000, 50_000);
        let newer = deposit("dep-2", may2, 48_000, 50_000);
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let listed = repo.list_by_branch("branch-1").await.unwrap();
        assert_eq!(listed, vec![newer.clone(), older]);
        assert_eq!(listed[0].validation_status, ReconciliationStatus::ManualReview);
        assert_eq!(listed[0].difference, Money::from_cents(-2_000));
        assert!(repo.list_by_branch("branch-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_only_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.deposits();

        let date = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let stored = deposit("dep-1", date, 50_000, 50_000);
        repo.insert(&stored).await.unwrap();

        let mut approved = stored.clone();
        approved
            .review(ReviewDecision::Approve, "manager-1", None, now())
            .unwrap();
        repo.update_review(&approved).await.unwrap();

        // a second reviewer working from the stale submitted copy
        let mut rejected = stored;
        rejected
            .review(ReviewDecision::Reject, "manager-2", Some("Short".to_string()), now())
            .unwrap();
        let err = repo.update_review(&rejected).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let reloaded = repo.get_by_id("dep-1").await.unwrap().unwrap();
        assert_eq!(reloaded.status, DepositStatus::Approved);
        assert_eq!(reloaded.reviewed_by.as_deref(), Some("manager-1"));
    }

    #[tokio::test]
    async fn test_review_of_missing_deposit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let mut missing = deposit("dep-404", date, 100, 100);
        missing
            .review(ReviewDecision::Approve, "manager-1", None, now())
            .unwrap();

        let err = db.deposits().update_review(&missing).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
