//! Account types for promptly.
//!
//! This module defines the account record and the subscription tier enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// An account on the platform.
///
/// The account tracks the subscription tier and the link to the payment
/// processor. The customer reference is set on the first successful upgrade
/// and retained across downgrades for re-subscription and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account ID.
    pub id: AccountId,

    /// Current subscription tier.
    pub tier: Tier,

    /// Stripe customer ID, set on first upgrade and never cleared.
    pub stripe_customer_id: Option<String>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When tier or customer reference last changed.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new free-tier account.
    #[must_use]
    pub fn new(id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            id,
            tier: Tier::Free,
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the account is on the pro tier.
    #[must_use]
    pub fn is_pro(&self) -> bool {
        self.tier == Tier::Pro
    }
}

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Free tier: metered generations up to the plan ceiling.
    Free,

    /// Pro tier: unmetered generations, paid subscription.
    Pro,
}

impl Tier {
    /// Lowercase string form used in API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }
}
