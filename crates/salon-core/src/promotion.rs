//! # Promotion Rules
//!
//! Eligibility checks and usage semantics for promotions.
//!
//! ## Validation Order
//! ```text
//! code ──► found for branch? ──► is_active? ──► started? ──► not expired?
//!                                                               │
//!              ┌────────────────────────────────────────────────┘
//!              ▼
//!   one-time:  client given? ──► client not in used_by?
//!   repeating: max_uses unset or usage_count < max_uses?
//! ```
//! The first failing check wins and is reported as an [`IneligibleReason`]
//! whose message is shown to the cashier verbatim.
//!
//! ## Usage
//! Selecting or previewing a promotion has no side effects. Usage is
//! recorded once, when the invoice is paid:
//! - one-time: the client id joins `used_by` (set semantics)
//! - repeating: `usage_count` grows by exactly one, never past `max_uses`
//!
//! The ledger store performs the same update atomically in SQL; the
//! in-memory [`Promotion::record_usage`] mirrors it for previews and tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::discount::DiscountBreakdown;
use crate::types::{AppliedPromotion, Promotion, UsageType};

// =============================================================================
// Ineligibility Reasons
// =============================================================================

/// Why a promotion cannot be used on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibleReason {
    #[error("Promotion code {code} was not found")]
    NotFound { code: String },

    #[error("This promotion is not active")]
    Inactive,

    #[error("This promotion has not started yet (starts {})", .starts.format("%Y-%m-%d"))]
    NotYetStarted { starts: DateTime<Utc> },

    #[error("This promotion expired on {}", .ended.format("%Y-%m-%d"))]
    Expired { ended: DateTime<Utc> },

    /// One-time promotions are tracked per client, so a walk-in cannot use them.
    #[error("This promotion is only available to registered clients")]
    ClientRequired,

    #[error("This client has already used this promotion")]
    AlreadyUsed,

    #[error("This promotion has reached its usage limit of {max_uses}")]
    LimitReached { max_uses: u32 },
}

// =============================================================================
// Validation
// =============================================================================

/// Checks a looked-up promotion against a candidate client.
///
/// `promotion` is whatever the store returned for `code` at the invoice's
/// branch; `None` reports the code as not found.
///
/// ```rust
/// use salon_core::promotion::{validate, IneligibleReason};
/// use chrono::Utc;
///
/// let err = validate(None, "NOPE", None, Utc::now()).unwrap_err();
/// assert_eq!(err, IneligibleReason::NotFound { code: "NOPE".to_string() });
/// ```
pub fn validate<'a>(
    promotion: Option<&'a Promotion>,
    code: &str,
    client_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<&'a Promotion, IneligibleReason> {
    let promotion = promotion.ok_or_else(|| IneligibleReason::NotFound {
        code: code.to_string(),
    })?;
    promotion.check_eligibility(client_id, now)?;
    Ok(promotion)
}

/// Whether a usage was newly recorded or was already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    Recorded,
    /// Replay of a usage already on file; nothing changed.
    AlreadyRecorded,
}

/// One redemption, produced when an invoice carrying a promotion is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionUsage {
    pub promotion_id: String,
    pub transaction_id: String,
    pub client_id: Option<String>,
}

impl Promotion {
    /// Runs every check after "code exists", in order.
    pub fn check_eligibility(
        &self,
        client_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), IneligibleReason> {
        if !self.is_active {
            return Err(IneligibleReason::Inactive);
        }

        if now < self.start_date {
            return Err(IneligibleReason::NotYetStarted {
                starts: self.start_date,
            });
        }

        if now > self.end_date {
            return Err(IneligibleReason::Expired {
                ended: self.end_date,
            });
        }

        match self.usage_type {
            UsageType::OneTime => {
                let client_id = client_id.ok_or(IneligibleReason::ClientRequired)?;
                if self.used_by.contains(client_id) {
                    return Err(IneligibleReason::AlreadyUsed);
                }
            }
            UsageType::Repeating => {
                if let Some(max_uses) = self.max_uses {
                    if self.usage_count >= max_uses {
                        return Err(IneligibleReason::LimitReached { max_uses });
                    }
                }
            }
        }

        Ok(())
    }

    /// `true` when the promotion can be redeemed right now by this client.
    pub fn is_consumable(&self, client_id: Option<&str>, now: DateTime<Utc>) -> bool {
        self.check_eligibility(client_id, now).is_ok()
    }

    /// Records one redemption in memory.
    ///
    /// One-time promotions add the client with set semantics, so recording
    /// the same client twice leaves a single entry and returns
    /// [`UsageOutcome::AlreadyRecorded`]. Repeating promotions count up by
    /// one and refuse to pass `max_uses`.
    pub fn record_usage(&mut self, client_id: Option<&str>) -> Result<UsageOutcome, IneligibleReason> {
        match self.usage_type {
            UsageType::OneTime => {
                let client_id = client_id.ok_or(IneligibleReason::ClientRequired)?;
                if self.used_by.insert(client_id.to_string()) {
                    Ok(UsageOutcome::Recorded)
                } else {
                    Ok(UsageOutcome::AlreadyRecorded)
                }
            }
            UsageType::Repeating => {
                if let Some(max_uses) = self.max_uses {
                    if self.usage_count >= max_uses {
                        return Err(IneligibleReason::LimitReached { max_uses });
                    }
                }
                self.usage_count += 1;
                Ok(UsageOutcome::Recorded)
            }
        }
    }

    /// Freezes the promotion onto an invoice.
    pub fn snapshot(&self, breakdown: &DiscountBreakdown) -> AppliedPromotion {
        AppliedPromotion {
            id: self.id.clone(),
            code: self.promotion_code.clone(),
            title: self.title.clone(),
            terms: self.terms.clone(),
            discount_amount: breakdown.discount_amount,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Percent;
    use crate::types::{ApplicableTo, DiscountTerms};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap()
    }

    fn promotion(usage_type: UsageType) -> Promotion {
        Promotion {
            id: "promo-1".to_string(),
            branch_id: "branch-1".to_string(),
            promotion_code: "SPRING10".to_string(),
            title: "Spring 10%".to_string(),
            description: None,
            terms: DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::All),
            usage_type,
            used_by: BTreeSet::new(),
            max_uses: None,
            usage_count: 0,
            start_date: now() - Duration::days(10),
            end_date: now() + Duration::days(10),
            is_active: true,
            created_at: now() - Duration::days(30),
            updated_at: now() - Duration::days(30),
        }
    }

    #[test]
    fn test_valid_promotion_passes() {
        let promo = promotion(UsageType::OneTime);
        let found = validate(Some(&promo), "SPRING10", Some("client-1"), now()).unwrap();
        assert_eq!(found.id, "promo-1");
    }

    #[test]
    fn test_window_is_inclusive() {
        let promo = promotion(UsageType::Repeating);
        assert!(promo.is_consumable(None, promo.start_date));
        assert!(promo.is_consumable(None, promo.end_date));
        assert!(!promo.is_consumable(None, promo.end_date + Duration::milliseconds(1)));
    }

    #[test]
    fn test_reasons_in_order() {
        let mut promo = promotion(UsageType::OneTime);
        promo.is_active = false;
        promo.start_date = now() + Duration::days(1);
        // inactive is reported before the window
        assert_eq!(
            validate(Some(&promo), "SPRING10", Some("c"), now()).unwrap_err(),
            IneligibleReason::Inactive
        );

        promo.is_active = true;
        assert!(matches!(
            validate(Some(&promo), "SPRING10", Some("c"), now()).unwrap_err(),
            IneligibleReason::NotYetStarted { .. }
        ));

        promo.start_date = now() - Duration::days(10);
        promo.end_date = now() - Duration::days(1);
        assert!(matches!(
            validate(Some(&promo), "SPRING10", Some("c"), now()).unwrap_err(),
            IneligibleReason::Expired { .. }
        ));
    }

    #[test]
    fn test_one_time_requires_client_and_rejects_reuse() {
        let mut promo = promotion(UsageType::OneTime);
        assert_eq!(
            promo.check_eligibility(None, now()).unwrap_err(),
            IneligibleReason::ClientRequired
        );

        promo.used_by.insert("client-1".to_string());
        assert_eq!(
            promo.check_eligibility(Some("client-1"), now()).unwrap_err(),
            IneligibleReason::AlreadyUsed
        );
        assert!(promo.check_eligibility(Some("client-2"), now()).is_ok());
    }

    #[test]
    fn test_repeating_limit() {
        let mut promo = promotion(UsageType::Repeating);
        promo.max_uses = Some(2);
        promo.usage_count = 2;
        assert_eq!(
            promo.check_eligibility(None, now()).unwrap_err(),
            IneligibleReason::LimitReached { max_uses: 2 }
        );
    }

    #[test]
    fn test_one_time_usage_is_idempotent() {
        let mut promo = promotion(UsageType::OneTime);
        assert_eq!(promo.record_usage(Some("client-1")).unwrap(), UsageOutcome::Recorded);
        assert_eq!(
            promo.record_usage(Some("client-1")).unwrap(),
            UsageOutcome::AlreadyRecorded
        );
        assert_eq!(promo.used_by.len(), 1);
        assert_eq!(promo.usage_count, 0);
    }

    #[test]
    fn test_repeating_usage_counts_to_cap() {
        let mut promo = promotion(UsageType::Repeating);
        promo.max_uses = Some(1);
        assert_eq!(promo.record_usage(None).unwrap(), UsageOutcome::Recorded);
        assert_eq!(promo.usage_count, 1);
        assert!(promo.record_usage(None).is_err());
        assert_eq!(promo.usage_count, 1);
    }

    #[test]
    fn test_messages_are_user_facing() {
        let reason = IneligibleReason::Expired {
            ended: Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap(),
        };
        assert_eq!(reason.to_string(), "This promotion expired on 2026-02-28");
        assert_eq!(
            IneligibleReason::LimitReached { max_uses: 50 }.to_string(),
            "This promotion has reached its usage limit of 50"
        );
    }
}
