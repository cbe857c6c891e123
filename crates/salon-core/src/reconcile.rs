//! # Deposit Reconciliation
//!
//! Compares an end-of-day cash deposit with the day's recorded sales.
//!
//! ## Tolerance Band
//! ```text
//!        |difference|
//!   0 ───────────── tolerance ─────────────── ceiling ──────────────►
//!   │     match      │      manual_review       │      mismatch
//!   │  (no anomaly)  │        (anomaly)         │     (anomaly)
//!                    ▲ inclusive                ▲ inclusive
//! ```
//! Defaults: tolerance 1.00, ceiling 100.00. A difference of exactly the
//! ceiling is still `manual_review`.
//!
//! ## Business Day
//! A deposit date is a calendar day in the branch's local offset. Sales
//! count when `created_at` falls within `[00:00:00.000, 23:59:59.999]`
//! local time. Which statuses count is a [`DailySalesPolicy`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Deposit, DepositStatus, ReconciliationStatus, Transaction, TransactionStatus};
use crate::validation::validate_amount;

// =============================================================================
// Classification
// =============================================================================

/// Thresholds for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToleranceBand {
    /// Largest |difference| still reported as a match.
    pub tolerance: Money,
    /// Largest |difference| still sent to manual review.
    pub mismatch_ceiling: Money,
}

impl Default for ToleranceBand {
    fn default() -> Self {
        ToleranceBand {
            tolerance: Money::from_cents(100),
            mismatch_ceiling: Money::from_cents(10_000),
        }
    }
}

/// Result of comparing a declared amount with the day's sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// `declared − daily_sales_total`; negative when the deposit is short.
    pub difference: Money,
    pub status: ReconciliationStatus,
    pub has_anomaly: bool,
    pub message: String,
}

/// Classifies a deposit against the day's sales.
///
/// ```rust
/// use salon_core::money::Money;
/// use salon_core::reconcile::{classify, ToleranceBand};
/// use salon_core::types::ReconciliationStatus;
///
/// let c = classify(Money::from_cents(25_000), Money::from_cents(10_000), &ToleranceBand::default());
/// assert_eq!(c.status, ReconciliationStatus::Mismatch);
/// assert_eq!(c.difference.cents(), 15_000);
/// ```
pub fn classify(declared: Money, daily_sales_total: Money, band: &ToleranceBand) -> Classification {
    let difference = declared - daily_sales_total;
    let gap = difference.abs();
    let direction = if difference.is_negative() { "short" } else { "over" };

    let (status, message) = if gap <= band.tolerance {
        (
            ReconciliationStatus::Match,
            "Deposit matches daily sales".to_string(),
        )
    } else if gap > band.mismatch_ceiling {
        (
            ReconciliationStatus::Mismatch,
            format!("Deposit is {direction} by {gap}, above the {} review limit", band.mismatch_ceiling),
        )
    } else {
        (
            ReconciliationStatus::ManualReview,
            format!("Deposit is {direction} by {gap}; manual review required"),
        )
    };

    Classification {
        difference,
        status,
        has_anomaly: status != ReconciliationStatus::Match,
        message,
    }
}

// =============================================================================
// Daily Sales
// =============================================================================

/// Which invoices count toward a day's sales.
///
/// Voided invoices never count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DailySalesPolicy {
    /// Everything rung up that day: `in_service` and `paid`.
    #[default]
    RungUp,
    /// Cash actually collected: `paid` only.
    Collected,
}

impl DailySalesPolicy {
    /// Statuses included in the total.
    pub const fn statuses(&self) -> &'static [TransactionStatus] {
        match self {
            DailySalesPolicy::RungUp => &[TransactionStatus::InService, TransactionStatus::Paid],
            DailySalesPolicy::Collected => &[TransactionStatus::Paid],
        }
    }

    pub fn counts(&self, status: TransactionStatus) -> bool {
        self.statuses().contains(&status)
    }
}

impl fmt::Display for DailySalesPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DailySalesPolicy::RungUp => "rung_up",
            DailySalesPolicy::Collected => "collected",
        })
    }
}

impl FromStr for DailySalesPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rung_up" => Ok(DailySalesPolicy::RungUp),
            "collected" => Ok(DailySalesPolicy::Collected),
            _ => Err(ValidationError::InvalidFormat {
                field: "daily sales policy".to_string(),
                reason: "expected rung_up or collected".to_string(),
            }),
        }
    }
}

/// First and last instant of a local calendar day, in UTC.
///
/// ```rust
/// use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
/// use salon_core::reconcile::business_day_bounds;
///
/// let manila = FixedOffset::east_opt(8 * 3600).unwrap();
/// let (start, _) = business_day_bounds(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(), manila);
/// assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 1, 16, 0, 0).unwrap());
/// ```
pub fn business_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc_start = local_midnight - Duration::seconds(offset.local_minus_utc() as i64);
    let start = Utc.from_utc_datetime(&utc_start);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Sums invoice totals for a branch and business day.
///
/// The ledger store runs the same filter in SQL; this version works on
/// invoices already in memory.
pub fn daily_sales_total<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    branch_id: &str,
    date: NaiveDate,
    offset: FixedOffset,
    policy: DailySalesPolicy,
) -> Money {
    let (start, end) = business_day_bounds(date, offset);

    transactions
        .into_iter()
        .filter(|tx| tx.branch_id == branch_id)
        .filter(|tx| tx.created_at >= start && tx.created_at <= end)
        .filter(|tx| policy.counts(tx.status))
        .map(|tx| tx.total)
        .sum()
}

// =============================================================================
// Deposit Submission & Review
// =============================================================================

/// What a cashier submits at end of day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DepositSubmission {
    pub branch_id: String,
    #[ts(as = "String")]
    pub deposit_date: NaiveDate,
    pub amount: Money,
    pub submitted_by: String,
    pub notes: Option<String>,
}

/// Outcome of a manager's review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl Deposit {
    /// Builds a `submitted` deposit classified against `daily_sales_total`.
    pub fn submit(
        id: impl Into<String>,
        submission: DepositSubmission,
        daily_sales_total: Money,
        band: &ToleranceBand,
        now: DateTime<Utc>,
    ) -> CoreResult<Deposit> {
        validate_amount("deposit amount", submission.amount)?;
        if submission.submitted_by.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "submitted by".to_string(),
            }
            .into());
        }

        let classification = classify(submission.amount, daily_sales_total, band);

        Ok(Deposit {
            id: id.into(),
            branch_id: submission.branch_id,
            deposit_date: submission.deposit_date,
            amount: submission.amount,
            daily_sales_total,
            difference: classification.difference,
            validation_status: classification.status,
            has_anomaly: classification.has_anomaly,
            validation_message: classification.message,
            status: DepositStatus::Submitted,
            notes: submission.notes,
            submitted_by: submission.submitted_by,
            submitted_at: now,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approves or rejects a submitted deposit. Only possible once.
    pub fn review(
        &mut self,
        decision: ReviewDecision,
        reviewer_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if self.status != DepositStatus::Submitted {
            return Err(CoreError::InvalidDepositStatus {
                deposit_id: self.id.clone(),
                current_status: self.status,
                operation: "review".to_string(),
            });
        }
        if reviewer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "reviewer".to_string(),
            }
            .into());
        }

        self.status = match decision {
            ReviewDecision::Approve => DepositStatus::Approved,
            ReviewDecision::Reject => DepositStatus::Rejected,
        };
        self.reviewed_by = Some(reviewer_id.to_string());
        self.reviewed_at = Some(now);
        self.review_notes = notes;
        self.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
