use chrono::{DateTime, Utc};
use std::fmt;

use crate::model::ids::AccountId;

//
// ─── USAGE ACTION ──────────────────────────────────────────────────────────────
//

/// Which daily quota a usage event counts against.
///
/// One event is written per *completed* session, never per submission;
/// abandoned in-progress sessions are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageAction {
    CompleteSingleQuestion,
    CompleteFullMockInterview,
}

impl UsageAction {
    /// Storage tag for this action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UsageAction::CompleteSingleQuestion => "complete_single_question",
            UsageAction::CompleteFullMockInterview => "complete_full_mock_interview",
        }
    }

    /// Parses a storage tag back into an action.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "complete_single_question" => Some(UsageAction::CompleteSingleQuestion),
            "complete_full_mock_interview" => Some(UsageAction::CompleteFullMockInterview),
            _ => None,
        }
    }

    /// Settings key holding the free-tier daily limit for this action.
    #[must_use]
    pub fn limit_key(self) -> &'static str {
        match self {
            UsageAction::CompleteSingleQuestion => "FREE_USER_QUESTION_DAILY_LIMIT",
            UsageAction::CompleteFullMockInterview => "FREE_USER_SESSION_DAILY_LIMIT",
        }
    }

    /// Default daily limit applied when the settings key is unset.
    #[must_use]
    pub fn default_limit(self) -> u32 {
        match self {
            UsageAction::CompleteSingleQuestion => 5,
            UsageAction::CompleteFullMockInterview => 2,
        }
    }
}

impl fmt::Display for UsageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── USAGE EVENT ───────────────────────────────────────────────────────────────
//

/// Append-only ledger entry recording one quota-relevant completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub account_id: AccountId,
    pub action: UsageAction,
    pub occurred_at: DateTime<Utc>,
}

impl UsageEvent {
    #[must_use]
    pub fn new(account_id: AccountId, action: UsageAction, occurred_at: DateTime<Utc>) -> Self {
        Self {
            account_id,
            action,
            occurred_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_round_trip() {
        for action in [
            UsageAction::CompleteSingleQuestion,
            UsageAction::CompleteFullMockInterview,
        ] {
            assert_eq!(UsageAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(UsageAction::parse("complete_homework"), None);
    }

    #[test]
    fn default_limits_match_settings_defaults() {
        assert_eq!(UsageAction::CompleteSingleQuestion.default_limit(), 5);
        assert_eq!(UsageAction::CompleteFullMockInterview.default_limit(), 2);
    }
}
