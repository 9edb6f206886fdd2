//! `RocksDB` storage layer for promptly.
//!
//! This crate provides persistent storage for accounts, prompt records, and
//! usage counters using `RocksDB` with column families for efficient
//! indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: Primary account records, keyed by `account_id`
//! - `accounts_by_customer`: Index from Stripe customer ID to `account_id`
//! - `prompts`: Prompt records, keyed by `prompt_id` (ULID)
//! - `prompts_by_account`: Index for counting/listing prompts per account
//! - `usage_counters`: Denormalized per-account usage counts
//! - `webhook_events`: Processed processor event IDs for idempotency
//!
//! # Example
//!
//! ```no_run
//! use promptly_store::{RocksStore, Store};
//! use promptly_core::{Account, AccountId};
//!
//! let store = RocksStore::open("/tmp/promptly-db").unwrap();
//!
//! let account_id = AccountId::generate();
//! store.put_account(&Account::new(account_id)).unwrap();
//!
//! let retrieved = store.get_account(&account_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use promptly_core::{Account, AccountId, PromptId, PromptRecord, UsageCounter};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// Maintains the customer-reference index when the account carries a
    /// Stripe customer ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>>;

    /// Find an account by its Stripe customer ID.
    ///
    /// This is the canonical lookup for post-creation processor events,
    /// where the customer link already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_account_by_customer(&self, customer_id: &str) -> Result<Option<Account>>;

    /// Upgrade an account to pro and link the Stripe customer reference.
    ///
    /// This is a full-field idempotent upsert: tier is set to pro, the
    /// customer reference is linked, and `updated_at` is bumped. The account
    /// record and the customer index are written in one atomic batch.
    /// Repeating the call converges to the same state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn ensure_pro(&self, account_id: &AccountId, customer_id: &str) -> Result<Account>;

    /// Downgrade an account to free, retaining the customer reference.
    ///
    /// Idempotent: downgrading an already-free account is a no-op in effect.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn downgrade_to_free(&self, account_id: &AccountId) -> Result<Account>;

    // =========================================================================
    // Prompt Ledger Operations
    // =========================================================================

    /// Append a prompt record to the ledger.
    ///
    /// Writes the record and the per-account index entry atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_prompt(&self, record: &PromptRecord) -> Result<()>;

    /// Get a prompt record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_prompt(&self, prompt_id: &PromptId) -> Result<Option<PromptRecord>>;

    /// Count prompt records for an account.
    ///
    /// This is the authoritative usage count: quota decisions must use this,
    /// never the denormalized counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_prompts(&self, account_id: &AccountId) -> Result<u64>;

    /// List prompt records for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_prompts(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PromptRecord>>;

    // =========================================================================
    // Usage Counter Operations
    // =========================================================================

    /// Get the denormalized usage counter for an account, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_usage_counter(&self, account_id: &AccountId) -> Result<Option<UsageCounter>>;

    /// Recompute the usage counter from the authoritative record count and
    /// upsert it as an absolute value.
    ///
    /// Returns the recomputed count. The write is idempotent, not an
    /// increment, so concurrent refreshes converge.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn refresh_usage_counter(&self, account_id: &AccountId) -> Result<u64>;

    // =========================================================================
    // Webhook Event Operations (for idempotency)
    // =========================================================================

    /// Check if a processor event has already been handled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_webhook_event(&self, event_id: &str) -> Result<bool>;

    /// Record a processor event ID after handling it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_webhook_event(&self, event_id: &str) -> Result<()>;
}
