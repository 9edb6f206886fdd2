//! Plan policy configuration.
//!
//! The free/pro feature table is modeled as immutable configuration passed
//! into the quota enforcer, so tests can inject alternate policies (ceiling
//! of zero, unlimited, etc.) without touching process-wide state.

use serde::{Deserialize, Serialize};

use crate::Tier;

/// Default lifetime generation ceiling for free accounts.
pub const DEFAULT_FREE_CEILING: u64 = 3;

/// Pro plan monthly price in cents ($29).
pub const PRO_PLAN_PRICE_CENTS: i64 = 2900;

/// Policy for a single tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSpec {
    /// Maximum number of metered generations, `None` meaning unlimited.
    pub ceiling: Option<u64>,

    /// Monthly price in cents.
    pub price_cents: i64,
}

/// The full plan table, injected wherever quota policy is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCatalog {
    /// Free tier policy.
    pub free: PlanSpec,

    /// Pro tier policy.
    pub pro: PlanSpec,
}

impl PlanCatalog {
    /// Look up the policy for a tier.
    #[must_use]
    pub const fn spec(&self, tier: Tier) -> &PlanSpec {
        match tier {
            Tier::Free => &self.free,
            Tier::Pro => &self.pro,
        }
    }

    /// Ceiling for a tier, `None` meaning unlimited.
    #[must_use]
    pub const fn ceiling(&self, tier: Tier) -> Option<u64> {
        self.spec(tier).ceiling
    }

    /// Remaining generations for a tier given the authoritative used count.
    ///
    /// Unlimited tiers return `None`.
    #[must_use]
    pub fn remaining(&self, tier: Tier, used: u64) -> Option<u64> {
        self.ceiling(tier).map(|c| c.saturating_sub(used))
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self {
            free: PlanSpec {
                ceiling: Some(DEFAULT_FREE_CEILING),
                price_cents: 0,
            },
            pro: PlanSpec {
                ceiling: None,
                price_cents: PRO_PLAN_PRICE_CENTS,
            },
        }
    }
}
