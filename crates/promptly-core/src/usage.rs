//! Usage ledger types.
//!
//! A `PromptRecord` is the immutable ledger entry for one completed metered
//! generation; the authoritative usage count for an account is the number of
//! its records. The `UsageCounter` is a denormalized cache of that count and
//! is never consulted for quota decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, PromptId};

/// One generated prompt artifact. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Record ID (time-ordered).
    pub id: PromptId,

    /// Owning account.
    pub account_id: AccountId,

    /// The generated text. Opaque to quota logic; carried for history.
    pub content: String,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl PromptRecord {
    /// Create a new record for a completed generation.
    #[must_use]
    pub fn new(account_id: AccountId, content: String) -> Self {
        Self {
            id: PromptId::generate(),
            account_id,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Denormalized per-account usage count.
///
/// Always re-derivable by counting `PromptRecord`s; refreshed with an
/// absolute write after each append rather than incremented, so it stays
/// convergent after concurrent writers or missed updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounter {
    /// Owning account.
    pub account_id: AccountId,

    /// Cached record count.
    pub count: u64,

    /// When the counter was last recomputed.
    pub updated_at: DateTime<Utc>,
}

impl UsageCounter {
    /// Build a counter snapshot from an authoritative count.
    #[must_use]
    pub fn snapshot(account_id: AccountId, count: u64) -> Self {
        Self {
            account_id,
            count,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_carries_owner_and_content() {
        let account_id = AccountId::generate();
        let record = PromptRecord::new(account_id, "a prompt".into());
        assert_eq!(record.account_id, account_id);
        assert_eq!(record.content, "a prompt");
    }

    #[test]
    fn counter_snapshot() {
        let account_id = AccountId::generate();
        let counter = UsageCounter::snapshot(account_id, 7);
        assert_eq!(counter.count, 7);
        assert_eq!(counter.account_id, account_id);
    }
}
