use std::sync::Arc;

use practice_core::model::{Account, UsageAction};
use practice_core::{Clock, start_of_utc_day};
use storage::repository::UsageRepository;

use crate::error::ServiceError;
use crate::settings_service::SettingsService;

/// Enforces free-tier daily caps against the usage ledger.
///
/// The gate only reads; the ledger entry that consumes quota is written when
/// the session completes, inside the completion transaction. Two in-flight
/// sessions can therefore both pass the check near the cap, and the soft
/// limit may be overshot by one. That race is accepted.
#[derive(Clone)]
pub struct QuotaGate {
    clock: Clock,
    usage: Arc<dyn UsageRepository>,
    settings: SettingsService,
}

impl QuotaGate {
    #[must_use]
    pub fn new(clock: Clock, usage: Arc<dyn UsageRepository>, settings: SettingsService) -> Self {
        Self {
            clock,
            usage,
            settings,
        }
    }

    /// Check whether `account` may perform `action` today.
    ///
    /// Paid tiers bypass the cap entirely. The window is the current UTC
    /// calendar day, so quota resets at midnight UTC rather than on a
    /// rolling 24-hour basis.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::QuotaExceeded` when the cap is reached, or a
    /// storage error if the ledger cannot be read.
    pub async fn check(&self, account: &Account, action: UsageAction) -> Result<(), ServiceError> {
        if account.tier().is_paid() {
            return Ok(());
        }

        let limit = self
            .settings
            .get_u32(action.limit_key(), action.default_limit())
            .await;
        let window_start = start_of_utc_day(self.clock.now());
        let used = self
            .usage
            .count_events(account.id(), action, window_start)
            .await?;

        if used >= limit {
            tracing::warn!(
                account_id = %account.id(),
                action = action.as_str(),
                limit,
                used,
                "daily quota exceeded"
            );
            return Err(ServiceError::QuotaExceeded { action, limit });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{AccountId, SubscriptionTier, UsageEvent};
    use practice_core::time::{fixed_clock, fixed_now};
    use storage::Storage;

    fn gate(storage: &Storage) -> QuotaGate {
        QuotaGate::new(
            fixed_clock(),
            Arc::clone(&storage.usage),
            SettingsService::new(Arc::clone(&storage.settings)),
        )
    }

    #[tokio::test]
    async fn free_tier_is_capped_at_the_configured_limit() {
        let storage = Storage::in_memory();
        storage
            .settings
            .set_value("FREE_USER_QUESTION_DAILY_LIMIT", "2")
            .await
            .unwrap();
        let account = Account::new(AccountId::new(1), SubscriptionTier::Free);
        let gate = gate(&storage);

        gate.check(&account, UsageAction::CompleteSingleQuestion)
            .await
            .unwrap();

        for _ in 0..2 {
            storage
                .usage
                .append_event(&UsageEvent::new(
                    account.id(),
                    UsageAction::CompleteSingleQuestion,
                    fixed_now(),
                ))
                .await
                .unwrap();
        }

        let err = gate
            .check(&account, UsageAction::CompleteSingleQuestion)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::QuotaExceeded { limit: 2, .. }
        ));
    }

    #[tokio::test]
    async fn events_before_utc_midnight_do_not_count() {
        let storage = Storage::in_memory();
        storage
            .settings
            .set_value("FREE_USER_SESSION_DAILY_LIMIT", "1")
            .await
            .unwrap();
        let account = Account::new(AccountId::new(1), SubscriptionTier::Free);

        let yesterday = start_of_utc_day(fixed_now()) - chrono::Duration::hours(1);
        storage
            .usage
            .append_event(&UsageEvent::new(
                account.id(),
                UsageAction::CompleteFullMockInterview,
                yesterday,
            ))
            .await
            .unwrap();

        gate(&storage)
            .check(&account, UsageAction::CompleteFullMockInterview)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn paid_tiers_bypass_the_cap() {
        let storage = Storage::in_memory();
        storage
            .settings
            .set_value("FREE_USER_QUESTION_DAILY_LIMIT", "0")
            .await
            .unwrap();
        let account = Account::new(AccountId::new(1), SubscriptionTier::Premium);

        gate(&storage)
            .check(&account, UsageAction::CompleteSingleQuestion)
            .await
            .unwrap();
    }
}
