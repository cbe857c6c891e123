//! # Promotion Repository
//!
//! Promotion lookup and the atomic usage tracker.
//!
//! ## Usage Recording
//! ```text
//! record_usage(promotion_id, transaction_id, client_id)
//!      │
//!      ├── INSERT OR IGNORE promotion_redemptions (promotion_id, transaction_id)
//!      │        └── 0 rows → AlreadyRecorded (same sale replayed, nothing changes)
//!      │
//!      ├── one-time:  INSERT OR IGNORE promotion_used_by (promotion_id, client_id)
//!      │        └── 0 rows → UsageRejected(AlreadyUsed)
//!      │
//!      └── repeating: UPDATE promotions SET usage_count = usage_count + 1
//!                     WHERE max_uses IS NULL OR usage_count < max_uses
//!               └── 0 rows → UsageRejected(LimitReached)
//! ```
//! The counter and the set are only ever changed by these statements, so
//! two registers redeeming the same promotion at once cannot lose an
//! update or exceed the cap.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use salon_core::promotion::{PromotionUsage, UsageOutcome};
use salon_core::validation::canonical_promotion_code;
use salon_core::{
    ApplicableTo, DiscountTerms, DiscountType, IneligibleReason, Promotion, UsageType,
};

use crate::error::{DbError, DbResult};
use crate::timestamp::{from_millis, to_millis};

const PROMOTION_COLUMNS: &str = r#"
    id, branch_id, promotion_code, title, description,
    discount_type, discount_value, applicable_to, specific_services, specific_products,
    usage_type, max_uses, usage_count,
    start_date, end_date, is_active, created_at, updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    branch_id: String,
    promotion_code: String,
    title: String,
    description: Option<String>,
    discount_type: DiscountType,
    discount_value: i64,
    applicable_to: ApplicableTo,
    specific_services: String,
    specific_products: String,
    usage_type: UsageType,
    max_uses: Option<i64>,
    usage_count: i64,
    start_date: i64,
    end_date: i64,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl PromotionRow {
    fn into_promotion(self, used_by: BTreeSet<String>) -> DbResult<Promotion> {
        let counter = |value: i64, column: &str| {
            u32::try_from(value).map_err(|_| DbError::Serialization(format!("{column} out of range: {value}")))
        };

        Ok(Promotion {
            id: self.id,
            branch_id: self.branch_id,
            promotion_code: self.promotion_code,
            title: self.title,
            description: self.description,
            terms: DiscountTerms {
                discount_type: self.discount_type,
                discount_value: self.discount_value,
                applicable_to: self.applicable_to,
                specific_services: serde_json::from_str(&self.specific_services)?,
                specific_products: serde_json::from_str(&self.specific_products)?,
            },
            usage_type: self.usage_type,
            used_by,
            max_uses: self.max_uses.map(|m| counter(m, "max_uses")).transpose()?,
            usage_count: counter(self.usage_count, "usage_count")?,
            start_date: from_millis(self.start_date)?,
            end_date: from_millis(self.end_date)?,
            is_active: self.is_active,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for promotions and their usage.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Gets a promotion by ID, including its `used_by` set.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = ?1");

        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let used_by = self.load_used_by(&row.id).await?;
                Ok(Some(row.into_promotion(used_by)?))
            }
            None => Ok(None),
        }
    }

    /// Finds a branch's promotion by code, ignoring case.
    pub async fn find_by_code(&self, branch_id: &str, code: &str) -> DbResult<Option<Promotion>> {
        let sql = format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions \
             WHERE branch_id = ?1 AND promotion_code = ?2"
        );

        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(branch_id)
            .bind(canonical_promotion_code(code))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let used_by = self.load_used_by(&row.id).await?;
                Ok(Some(row.into_promotion(used_by)?))
            }
            None => Ok(None),
        }
    }

    /// Lists a branch's promotions, newest first.
    pub async fn list_by_branch(&self, branch_id: &str) -> DbResult<Vec<Promotion>> {
        let sql = format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions \
             WHERE branch_id = ?1 ORDER BY created_at DESC, promotion_code"
        );

        let rows: Vec<PromotionRow> = sqlx::query_as(&sql)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

        let mut promotions = Vec::with_capacity(rows.len());
        for row in rows {
            let used_by = self.load_used_by(&row.id).await?;
            promotions.push(row.into_promotion(used_by)?);
        }
        Ok(promotions)
    }

    /// Inserts a promotion and any pre-existing `used_by` entries.
    ///
    /// ## Errors
    /// `UniqueViolation` when the code is already taken at the branch.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(id = %promotion.id, code = %promotion.promotion_code, "Inserting promotion");

        let mut db_tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, branch_id, promotion_code, title, description,
                discount_type, discount_value, applicable_to, specific_services, specific_products,
                usage_type, max_uses, usage_count,
                start_date, end_date, is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(promotion.id.as_str())
        .bind(promotion.branch_id.as_str())
        .bind(canonical_promotion_code(&promotion.promotion_code))
        .bind(promotion.title.as_str())
        .bind(promotion.description.as_deref())
        .bind(promotion.terms.discount_type)
        .bind(promotion.terms.discount_value)
        .bind(promotion.terms.applicable_to)
        .bind(serde_json::to_string(&promotion.terms.specific_services)?)
        .bind(serde_json::to_string(&promotion.terms.specific_products)?)
        .bind(promotion.usage_type)
        .bind(promotion.max_uses.map(i64::from))
        .bind(i64::from(promotion.usage_count))
        .bind(to_millis(promotion.start_date))
        .bind(to_millis(promotion.end_date))
        .bind(promotion.is_active)
        .bind(to_millis(promotion.created_at))
        .bind(to_millis(promotion.updated_at))
        .execute(&mut *db_tx)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { field, .. } if field.contains("promotion_code") => {
                DbError::duplicate("promotion code", promotion.promotion_code.as_str())
            }
            other => other,
        })?;

        for client_id in &promotion.used_by {
            sqlx::query(
                "INSERT INTO promotion_used_by (promotion_id, client_id, transaction_id, used_at) \
                 VALUES (?1, ?2, NULL, ?3)",
            )
            .bind(promotion.id.as_str())
            .bind(client_id.as_str())
            .bind(to_millis(promotion.updated_at))
            .execute(&mut *db_tx)
            .await?;
        }

        db_tx.commit().await?;
        Ok(())
    }

    /// Number of promotions across all branches.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM promotions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Records one redemption in its own database transaction.
    ///
    /// Invoice payment uses the same statements inside the payment's
    /// transaction (see `TransactionRepository::mark_paid`).
    pub async fn record_usage(&self, usage: &PromotionUsage, at: DateTime<Utc>) -> DbResult<UsageOutcome> {
        let mut db_tx = self.pool.begin().await?;
        let outcome = record_usage_in(&mut *db_tx, usage, at).await?;
        db_tx.commit().await?;
        Ok(outcome)
    }

    async fn load_used_by(&self, promotion_id: &str) -> DbResult<BTreeSet<String>> {
        let clients: Vec<String> = sqlx::query_scalar(
            "SELECT client_id FROM promotion_used_by WHERE promotion_id = ?1",
        )
        .bind(promotion_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients.into_iter().collect())
    }
}

// =============================================================================
// Atomic Usage
// =============================================================================

/// Records a redemption on an open connection or database transaction.
///
/// Leaves committing to the caller; on error the caller's transaction must
/// be rolled back (dropping it does that).
pub(crate) async fn record_usage_in(
    conn: &mut SqliteConnection,
    usage: &PromotionUsage,
    at: DateTime<Utc>,
) -> DbResult<UsageOutcome> {
    let terms: Option<(UsageType, Option<i64>)> =
        sqlx::query_as("SELECT usage_type, max_uses FROM promotions WHERE id = ?1")
            .bind(usage.promotion_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    let (usage_type, max_uses) = terms.ok_or_else(|| DbError::not_found("Promotion", usage.promotion_id.as_str()))?;

    let now = to_millis(at);

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO promotion_redemptions (promotion_id, transaction_id, client_id, redeemed_at) \
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(usage.promotion_id.as_str())
    .bind(usage.transaction_id.as_str())
    .bind(usage.client_id.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if inserted == 0 {
        debug!(
            promotion_id = %usage.promotion_id,
            transaction_id = %usage.transaction_id,
            "Promotion usage already recorded"
        );
        return Ok(UsageOutcome::AlreadyRecorded);
    }

    match usage_type {
        UsageType::OneTime => {
            let client_id = usage
                .client_id
                .as_deref()
                .ok_or(DbError::UsageRejected(IneligibleReason::ClientRequired))?;

            let added = sqlx::query(
                "INSERT OR IGNORE INTO promotion_used_by (promotion_id, client_id, transaction_id, used_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(usage.promotion_id.as_str())
            .bind(client_id)
            .bind(usage.transaction_id.as_str())
            .bind(now)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if added == 0 {
                warn!(promotion_id = %usage.promotion_id, client_id, "One-time promotion already used by client");
                return Err(DbError::UsageRejected(IneligibleReason::AlreadyUsed));
            }

            sqlx::query("UPDATE promotions SET updated_at = ?2 WHERE id = ?1")
                .bind(usage.promotion_id.as_str())
                .bind(now)
                .execute(&mut *conn)
                .await?;
        }
        UsageType::Repeating => {
            let bumped = sqlx::query(
                r#"
                UPDATE promotions SET
                    usage_count = usage_count + 1,
                    updated_at = ?2
                WHERE id = ?1 AND (max_uses IS NULL OR usage_count < max_uses)
                "#,
            )
            .bind(usage.promotion_id.as_str())
            .bind(now)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if bumped == 0 {
                let max_uses = max_uses.and_then(|m| u32::try_from(m).ok()).unwrap_or_default();
                warn!(promotion_id = %usage.promotion_id, max_uses, "Promotion usage limit reached");
                return Err(DbError::UsageRejected(IneligibleReason::LimitReached { max_uses }));
            }
        }
    }

    info!(
        promotion_id = %usage.promotion_id,
        transaction_id = %usage.transaction_id,
        "Promotion usage recorded"
    );
    Ok(UsageOutcome::Recorded)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use salon_core::{Money, Percent};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 12, 0, 0).unwrap()
    }

    fn promotion(id: &str, code: &str, usage_type: UsageType) -> Promotion {
        Promotion {
            id: id.to_string(),
            branch_id: "branch-1".to_string(),
            promotion_code: code.to_string(),
            title: format!("{code} promo"),
            description: Some("Seasonal offer".to_string()),
            terms: DiscountTerms::fixed(Money::from_cents(5_000), ApplicableTo::All)
                .restricted_to(vec!["svc-color".to_string()], vec![]),
            usage_type,
            used_by: BTreeSet::new(),
            max_uses: None,
            usage_count: 0,
            start_date: now() - Duration::days(7),
            end_date: now() + Duration::days(7),
            is_active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn usage(tx: &str, client: Option<&str>) -> PromotionUsage {
        PromotionUsage {
            promotion_id: "promo-1".to_string(),
            transaction_id: tx.to_string(),
            client_id: client.map(str::to_string),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_find_by_code_is_case_insensitive() {
        let db = db().await;
        let mut promo = promotion("promo-1", "WELCOME10", UsageType::OneTime);
        promo.used_by.insert("client-9".to_string());
        promo.terms = DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::All);
        db.promotions().insert(&promo).await.unwrap();

        let found = db.promotions().find_by_code("branch-1", " welcome10 ").await.unwrap().unwrap();
        assert_eq!(found, promo);
        assert!(db.promotions().find_by_code("branch-2", "WELCOME10").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_stores_canonical_code() {
        let db = db().await;
        db.promotions()
            .insert(&promotion("promo-1", "  spa20 ", UsageType::Repeating))
            .await
            .unwrap();

        let stored = db.promotions().get_by_id("promo-1").await.unwrap().unwrap();
        assert_eq!(stored.promotion_code, "SPA20");
        assert!(db.promotions().find_by_code("branch-1", "Spa20").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_code_per_branch_rejected() {
        let db = db().await;
        db.promotions()
            .insert(&promotion("promo-1", "SUMMER", UsageType::Repeating))
            .await
            .unwrap();

        let err = db
            .promotions()
            .insert(&promotion("promo-2", "summer", UsageType::Repeating))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let mut elsewhere = promotion("promo-3", "SUMMER", UsageType::Repeating);
        elsewhere.branch_id = "branch-2".to_string();
        db.promotions().insert(&elsewhere).await.unwrap();
        assert_eq!(db.promotions().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_one_time_usage_set_semantics() {
        let db = db().await;
        db.promotions()
            .insert(&promotion("promo-1", "ONCE", UsageType::OneTime))
            .await
            .unwrap();
        let repo = db.promotions();

        assert_eq!(
            repo.record_usage(&usage("tx-1", Some("client-1")), now()).await.unwrap(),
            UsageOutcome::Recorded
        );
        assert_eq!(
            repo.record_usage(&usage("tx-1", Some("client-1")), now()).await.unwrap(),
            UsageOutcome::AlreadyRecorded
        );

        let err = repo
            .record_usage(&usage("tx-2", Some("client-1")), now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UsageRejected(IneligibleReason::AlreadyUsed)));

        let err = repo.record_usage(&usage("tx-3", None), now()).await.unwrap_err();
        assert!(matches!(err, DbError::UsageRejected(IneligibleReason::ClientRequired)));

        let stored = repo.get_by_id("promo-1").await.unwrap().unwrap();
        assert_eq!(stored.used_by.len(), 1);
        assert!(stored.used_by.contains("client-1"));
    }

    #[tokio::test]
    async fn test_repeating_usage_stops_at_cap() {
        let db = db().await;
        let mut promo = promotion("promo-1", "TWICE", UsageType::Repeating);
        promo.max_uses = Some(2);
        db.promotions().insert(&promo).await.unwrap();
        let repo = db.promotions();

        repo.record_usage(&usage("tx-1", None), now()).await.unwrap();
        repo.record_usage(&usage("tx-2", None), now()).await.unwrap();
        let err = repo.record_usage(&usage("tx-3", None), now()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UsageRejected(IneligibleReason::LimitReached { max_uses: 2 })
        ));

        let stored = repo.get_by_id("promo-1").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 2);
        assert!(!stored.is_consumable(None, now()));
    }

    #[tokio::test]
    async fn test_usage_of_unknown_promotion() {
        let db = db().await;
        let err = db
            .promotions()
            .record_usage(&usage("tx-1", None), now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
