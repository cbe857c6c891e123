//! # Deposit Commands
//!
//! End-of-day reconciliation of a branch's cash deposit against what the
//! ledger says was sold.
//!
//! ```text
//! submit_deposit(branch, date, amount)
//!      │
//!      ├── business_day_bounds(date, utc offset) → [start, end]
//!      ├── daily_sales_total: SUM(total) over policy statuses, never voided
//!      ├── classify(amount, total, tolerance band)
//!      │        |diff| ≤ tolerance → match
//!      │        |diff| > ceiling   → mismatch
//!      │        otherwise          → manual_review
//!      └── INSERT deposit (status submitted)
//!
//! review_deposit(id, approve | reject) ── only from submitted
//! ```

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use salon_core::reconcile::{
    business_day_bounds, classify, Classification, DepositSubmission, ReviewDecision,
};
use salon_core::{Deposit, Money, ReconciliationStatus};

use super::SalonEngine;
use crate::error::{EngineError, EngineResult};

impl SalonEngine {
    /// Sum of invoice totals a branch rang up on a business day, under
    /// the configured daily sales policy.
    pub async fn daily_sales_total(&self, branch_id: &str, date: NaiveDate) -> EngineResult<Money> {
        debug!(branch_id, %date, policy = %self.config.daily_sales_policy, "daily_sales_total command");

        let (start, end) = business_day_bounds(date, self.config.utc_offset());
        let total = self
            .db
            .transactions()
            .daily_sales_total(branch_id, start, end, self.config.daily_sales_policy.statuses())
            .await?;
        Ok(total)
    }

    /// Classifies an amount against a sales total with the configured band.
    pub fn classify_deposit(&self, declared: Money, daily_sales_total: Money) -> Classification {
        classify(declared, daily_sales_total, &self.config.tolerance_band())
    }

    /// Records a branch's deposit for a business day, already classified.
    pub async fn submit_deposit(&self, submission: DepositSubmission) -> EngineResult<Deposit> {
        debug!(
            branch_id = %submission.branch_id,
            date = %submission.deposit_date,
            amount = %submission.amount,
            "submit_deposit command"
        );

        let daily_total = self
            .daily_sales_total(&submission.branch_id, submission.deposit_date)
            .await?;

        let deposit = Deposit::submit(
            Uuid::new_v4().to_string(),
            submission,
            daily_total,
            &self.config.tolerance_band(),
            self.now(),
        )?;
        self.db.deposits().insert(&deposit).await?;

        if deposit.validation_status == ReconciliationStatus::Match {
            info!(id = %deposit.id, amount = %deposit.amount, "Deposit submitted");
        } else {
            warn!(
                id = %deposit.id,
                status = ?deposit.validation_status,
                difference = %deposit.difference,
                "Deposit submitted with anomaly"
            );
        }
        Ok(deposit)
    }

    /// Approves or rejects a submitted deposit.
    pub async fn review_deposit(
        &self,
        id: &str,
        decision: ReviewDecision,
        reviewer_id: &str,
        notes: Option<String>,
    ) -> EngineResult<Deposit> {
        debug!(id, ?decision, reviewer_id, "review_deposit command");

        let mut deposit = self
            .db
            .deposits()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Deposit", id))?;

        if let Err(e) = deposit.review(decision, reviewer_id, notes, self.now()) {
            warn!(id, error = %e, "Review rejected");
            return Err(e.into());
        }
        self.db.deposits().update_review(&deposit).await?;

        info!(id, status = %deposit.status, reviewer_id, "Deposit reviewed");
        Ok(deposit)
    }

    pub async fn list_deposits(&self, branch_id: &str) -> EngineResult<Vec<Deposit>> {
        debug!(branch_id, "list_deposits command");
        Ok(self.db.deposits().list_by_branch(branch_id).await?)
    }
}
