use std::fmt;
use thiserror::Error;

use crate::model::ids::AccountId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown subscription tier: {0}")]
pub struct TierParseError(pub String);

//
// ─── SUBSCRIPTION TIER ─────────────────────────────────────────────────────────
//

/// A caller's paid/free status.
///
/// Only `Free` callers are subject to daily quotas; any paid tier
/// bypasses the quota gate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTier {
    Free,
    Pro,
    Premium,
}

impl SubscriptionTier {
    /// Returns true when the tier is exempt from daily quotas.
    #[must_use]
    pub fn is_paid(self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Storage tag for this tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Premium => "premium",
        }
    }

    /// Parses a storage tag back into a tier.
    ///
    /// # Errors
    ///
    /// Returns `TierParseError` for an unrecognized tag.
    pub fn parse(s: &str) -> Result<Self, TierParseError> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(TierParseError(other.to_string())),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ACCOUNT ───────────────────────────────────────────────────────────────────
//

/// The resolved identity of a caller: who they are and what tier they pay for.
///
/// Resolution itself (token → account) is the identity provider's concern;
/// services receive an explicit `AccountId` and look the account up, never
/// reading identity from ambient request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    tier: SubscriptionTier,
}

impl Account {
    #[must_use]
    pub fn new(id: AccountId, tier: SubscriptionTier) -> Self {
        Self { id, tier }
    }

    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    #[must_use]
    pub fn tier(&self) -> SubscriptionTier {
        self.tier
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_is_not_paid() {
        assert!(!SubscriptionTier::Free.is_paid());
        assert!(SubscriptionTier::Pro.is_paid());
        assert!(SubscriptionTier::Premium.is_paid());
    }

    #[test]
    fn tier_tags_round_trip() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Pro,
            SubscriptionTier::Premium,
        ] {
            assert_eq!(SubscriptionTier::parse(tier.as_str()).unwrap(), tier);
        }
    }

    #[test]
    fn unknown_tier_tag_fails() {
        assert!(SubscriptionTier::parse("platinum").is_err());
    }
}
