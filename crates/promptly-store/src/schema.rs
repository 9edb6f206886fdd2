//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Index: Stripe customer ID to `account_id` (16 raw UUID bytes).
    pub const ACCOUNTS_BY_CUSTOMER: &str = "accounts_by_customer";

    /// Prompt records, keyed by `prompt_id` (ULID).
    pub const PROMPTS: &str = "prompts";

    /// Index: prompts by account, keyed by `account_id || prompt_id`.
    /// Value is empty (index only).
    pub const PROMPTS_BY_ACCOUNT: &str = "prompts_by_account";

    /// Denormalized usage counters, keyed by `account_id`.
    pub const USAGE_COUNTERS: &str = "usage_counters";

    /// Processed webhook event IDs for idempotency, keyed by `event_id`.
    pub const WEBHOOK_EVENTS: &str = "webhook_events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ACCOUNTS_BY_CUSTOMER,
        cf::PROMPTS,
        cf::PROMPTS_BY_ACCOUNT,
        cf::USAGE_COUNTERS,
        cf::WEBHOOK_EVENTS,
    ]
}
