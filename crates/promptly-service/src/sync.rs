//! Tier synchronization between the payment processor and the account store.
//!
//! Webhook delivery, synchronous checkout confirmation, and cancellation all
//! converge on the same two transitions: an idempotent pro upsert and an
//! idempotent downgrade that retains the customer reference. Processor
//! events may arrive late, duplicated, or out of order; replaying either
//! transition always lands in the same state.

use std::sync::Arc;

use promptly_core::{Account, AccountId};
use promptly_store::Store;

use crate::error::ApiError;

/// Applies tier transitions to the account store.
#[derive(Clone)]
pub struct TierSync<S> {
    store: Arc<S>,
}

impl<S: Store> TierSync<S> {
    /// Create a new synchronizer over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Upsert the account into the pro tier, linking the customer reference.
    ///
    /// The account is created on the fly if it has never touched the store;
    /// identifiers carried in processor metadata originate from us, so a
    /// missing record just means the account has not generated yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn ensure_pro(&self, account_id: AccountId, customer_id: &str) -> Result<Account, ApiError> {
        if self.store.get_account(&account_id)?.is_none() {
            self.store.put_account(&Account::new(account_id))?;
        }

        let account = self.store.ensure_pro(&account_id, customer_id)?;

        tracing::info!(
            account_id = %account_id,
            customer_id = %customer_id,
            "Account upgraded to pro"
        );

        Ok(account)
    }

    /// Downgrade the account owning the given customer reference.
    ///
    /// Returns `None` when no account is linked to the reference; the caller
    /// acknowledges such events rather than erroring, since a deactivation
    /// for an unknown customer carries no work to do.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read or write fails.
    pub fn downgrade_by_customer(&self, customer_id: &str) -> Result<Option<Account>, ApiError> {
        let Some(account) = self.store.find_account_by_customer(customer_id)? else {
            tracing::warn!(
                customer_id = %customer_id,
                "Deactivation for unknown customer reference; nothing to do"
            );
            return Ok(None);
        };

        let downgraded = self.store.downgrade_to_free(&account.id)?;

        tracing::info!(
            account_id = %account.id,
            customer_id = %customer_id,
            "Account downgraded to free"
        );

        Ok(Some(downgraded))
    }
}
