//! # Promotion Commands
//!
//! Code validation for hosts that check a code before an invoice exists,
//! and direct access to the usage tracker.

use tracing::{debug, info, warn};

use salon_core::promotion::{self as promotion_rules, PromotionUsage, UsageOutcome};
use salon_core::validation::{normalize_promotion_code, validate_promotion};
use salon_core::{CoreError, Promotion};

use super::SalonEngine;
use crate::error::EngineResult;

impl SalonEngine {
    /// Validates a code for a branch and (optionally) a client.
    ///
    /// Checks run in order and the first failure is returned: not found,
    /// inactive, not yet started, expired, then the usage rules.
    pub async fn validate_promotion(
        &self,
        branch_id: &str,
        code: &str,
        client_id: Option<&str>,
    ) -> EngineResult<Promotion> {
        debug!(branch_id, code, client_id, "validate_promotion command");

        let code = normalize_promotion_code(code)?;
        let found = self.db.promotions().find_by_code(branch_id, &code).await?;

        match promotion_rules::validate(found.as_ref(), &code, client_id, self.now()) {
            Ok(promotion) => Ok(promotion.clone()),
            Err(reason) => {
                debug!(branch_id, code = %code, %reason, "Promotion ineligible");
                Err(CoreError::PromotionIneligible(reason).into())
            }
        }
    }

    pub async fn list_promotions(&self, branch_id: &str) -> EngineResult<Vec<Promotion>> {
        debug!(branch_id, "list_promotions command");
        Ok(self.db.promotions().list_by_branch(branch_id).await?)
    }

    /// Registers a new promotion. The code is stored uppercase.
    pub async fn create_promotion(&self, mut promotion: Promotion) -> EngineResult<Promotion> {
        debug!(branch_id = %promotion.branch_id, code = %promotion.promotion_code, "create_promotion command");

        promotion.promotion_code = normalize_promotion_code(&promotion.promotion_code)?;
        validate_promotion(&promotion)?;

        self.db.promotions().insert(&promotion).await?;
        info!(id = %promotion.id, code = %promotion.promotion_code, "Promotion created");
        Ok(promotion)
    }

    /// Records one redemption outside of payment.
    ///
    /// Replaying the same `(promotion, transaction)` pair returns
    /// `AlreadyRecorded` and changes nothing. Payment records usage on its
    /// own; this is for hosts reconciling redemptions made elsewhere.
    pub async fn record_promotion_usage(&self, usage: &PromotionUsage) -> EngineResult<UsageOutcome> {
        debug!(
            promotion_id = %usage.promotion_id,
            transaction_id = %usage.transaction_id,
            "record_promotion_usage command"
        );

        match self.db.promotions().record_usage(usage, self.now()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(promotion_id = %usage.promotion_id, error = %e, "Promotion usage refused");
                Err(e.into())
            }
        }
    }
}
