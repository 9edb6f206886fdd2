//! Free-tier quota enforcement.
//!
//! The enforcer decides admission for a generation request. Pro accounts
//! pass unconditionally. Free accounts pass only while the authoritative
//! prompt count is below the configured ceiling; the denormalized counter
//! is never consulted for this decision.

use std::sync::Arc;

use promptly_core::{Account, PlanCatalog};
use promptly_store::Store;

use crate::error::ApiError;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The request may proceed.
    Allowed {
        /// Authoritative count at decision time.
        used: u64,
        /// Ceiling for the account's tier, if any.
        ceiling: Option<u64>,
    },
    /// The request must be rejected.
    Denied {
        /// Authoritative count at decision time.
        used: u64,
        /// Ceiling that was reached.
        ceiling: u64,
    },
}

impl QuotaDecision {
    /// Whether the request was admitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Admission gate for metered generation.
#[derive(Clone)]
pub struct QuotaEnforcer<S> {
    store: Arc<S>,
    plans: PlanCatalog,
}

impl<S: Store> QuotaEnforcer<S> {
    /// Create a new enforcer over the given store and plan table.
    pub fn new(store: Arc<S>, plans: PlanCatalog) -> Self {
        Self { store, plans }
    }

    /// Decide whether the account may perform one more generation.
    ///
    /// Reads the authoritative ledger count; never the denormalized
    /// counter. Does not record anything: consumption happens only after
    /// the generation succeeds, via [`Self::record_success`].
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger count cannot be read.
    pub fn try_consume(&self, account: &Account) -> Result<QuotaDecision, ApiError> {
        let ceiling = self.plans.ceiling(account.tier);

        let Some(ceiling) = ceiling else {
            // Unlimited tier; skip the ledger read entirely.
            return Ok(QuotaDecision::Allowed {
                used: 0,
                ceiling: None,
            });
        };

        let used = self.store.count_prompts(&account.id)?;

        if used < ceiling {
            Ok(QuotaDecision::Allowed {
                used,
                ceiling: Some(ceiling),
            })
        } else {
            tracing::info!(
                account_id = %account.id,
                used,
                ceiling,
                "Generation denied: free-tier ceiling reached"
            );
            Ok(QuotaDecision::Denied { used, ceiling })
        }
    }

    /// Record a successful generation and refresh the counter.
    ///
    /// The ledger append is the durable consumption event; the counter
    /// refresh afterwards is a best-effort denormalization and its failure
    /// does not undo the append.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger append fails.
    pub fn record_success(
        &self,
        record: &promptly_core::PromptRecord,
    ) -> Result<u64, ApiError> {
        self.store.append_prompt(record)?;

        match self.store.refresh_usage_counter(&record.account_id) {
            Ok(count) => Ok(count),
            Err(e) => {
                // The generation is already recorded; a stale counter is
                // tolerable and will converge on the next refresh.
                tracing::warn!(
                    account_id = %record.account_id,
                    error = %e,
                    "Usage counter refresh failed after ledger append"
                );
                self.store.count_prompts(&record.account_id).map_err(Into::into)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use tempfile::TempDir;

    use promptly_core::{AccountId, PlanCatalog, PlanSpec, PromptRecord, Tier};
    use promptly_store::RocksStore;

    fn setup() -> (TempDir, Arc<RocksStore>) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (dir, Arc::new(store))
    }

    fn free_account(store: &RocksStore) -> Account {
        let account = Account::new(AccountId::generate());
        store.put_account(&account).unwrap();
        account
    }

    fn plans_with_ceiling(ceiling: u64) -> PlanCatalog {
        PlanCatalog {
            free: PlanSpec {
                ceiling: Some(ceiling),
                price_cents: 0,
            },
            ..PlanCatalog::default()
        }
    }

    #[test]
    fn free_account_allowed_below_ceiling() {
        let (_dir, store) = setup();
        let account = free_account(&store);
        let enforcer = QuotaEnforcer::new(store, plans_with_ceiling(3));

        let decision = enforcer.try_consume(&account).unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Allowed {
                used: 0,
                ceiling: Some(3)
            }
        );
    }

    #[test]
    fn free_account_denied_at_ceiling() {
        let (_dir, store) = setup();
        let account = free_account(&store);
        let enforcer = QuotaEnforcer::new(store.clone(), plans_with_ceiling(3));

        for _ in 0..3 {
            let decision = enforcer.try_consume(&account).unwrap();
            assert!(decision.is_allowed());
            let record = PromptRecord::new(account.id, "prompt text".into());
            enforcer.record_success(&record).unwrap();
        }

        // Exactly the ceiling many succeeded; the next is denied.
        let decision = enforcer.try_consume(&account).unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Denied {
                used: 3,
                ceiling: 3
            }
        );
    }

    #[test]
    fn pro_account_is_unlimited() {
        let (_dir, store) = setup();
        let mut account = free_account(&store);
        account.tier = Tier::Pro;
        account.updated_at = Utc::now();
        store.put_account(&account).unwrap();

        let enforcer = QuotaEnforcer::new(store.clone(), plans_with_ceiling(1));

        for _ in 0..5 {
            let decision = enforcer.try_consume(&account).unwrap();
            assert!(decision.is_allowed());
            let record = PromptRecord::new(account.id, "prompt text".into());
            enforcer.record_success(&record).unwrap();
        }

        assert_eq!(store.count_prompts(&account.id).unwrap(), 5);
    }

    #[test]
    fn zero_ceiling_denies_immediately() {
        let (_dir, store) = setup();
        let account = free_account(&store);
        let enforcer = QuotaEnforcer::new(store, plans_with_ceiling(0));

        let decision = enforcer.try_consume(&account).unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Denied {
                used: 0,
                ceiling: 0
            }
        );
    }

    #[test]
    fn record_success_refreshes_counter() {
        let (_dir, store) = setup();
        let account = free_account(&store);
        let enforcer = QuotaEnforcer::new(store.clone(), plans_with_ceiling(10));

        let record = PromptRecord::new(account.id, "prompt text".into());
        let count = enforcer.record_success(&record).unwrap();
        assert_eq!(count, 1);

        let counter = store.get_usage_counter(&account.id).unwrap().unwrap();
        assert_eq!(counter.count, 1);
    }
}
