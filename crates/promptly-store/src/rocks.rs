//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use promptly_core::{Account, AccountId, PromptId, PromptRecord, Tier, UsageCounter};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write an account and, if linked, its customer index entry atomically.
    ///
    /// When the customer reference changed, `stale_customer` carries the
    /// previous one so its index entry is removed in the same batch. A stale
    /// mapping would otherwise let a late-redelivered deactivation for the
    /// old customer downgrade an account paying under a new one.
    fn write_account(&self, account: &Account, stale_customer: Option<&str>) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.id);
        let value = Self::serialize(account)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &key, &value);

        if stale_customer.is_some() || account.stripe_customer_id.is_some() {
            let cf_index = self.cf(cf::ACCOUNTS_BY_CUSTOMER)?;

            if let Some(old) = stale_customer {
                batch.delete_cf(&cf_index, keys::customer_key(old));
            }

            if let Some(customer_id) = &account.stripe_customer_id {
                batch.put_cf(
                    &cf_index,
                    keys::customer_key(customer_id),
                    account.id.as_bytes(),
                );
            }
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// The previous customer ref, when it differs from the account's current
    /// one and must be unindexed.
    fn stale_customer<'a>(previous: &'a Account, current: &Account) -> Option<&'a str> {
        match (&previous.stripe_customer_id, &current.stripe_customer_id) {
            (Some(old), Some(new)) if old != new => Some(old),
            (Some(old), None) => Some(old),
            _ => None,
        }
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let stale = self.get_account(&account.id)?;
        self.write_account(
            account,
            stale.as_ref().and_then(|prev| Self::stale_customer(prev, account)),
        )
    }

    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(account_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_account_by_customer(&self, customer_id: &str) -> Result<Option<Account>> {
        let cf_index = self.cf(cf::ACCOUNTS_BY_CUSTOMER)?;
        let key = keys::customer_key(customer_id);

        let Some(id_bytes) = self
            .db
            .get_cf(&cf_index, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let uuid = uuid::Uuid::from_slice(&id_bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.get_account(&AccountId::from_uuid(uuid))
    }

    fn ensure_pro(&self, account_id: &AccountId, customer_id: &str) -> Result<Account> {
        let mut account = self
            .get_account(account_id)?
            .ok_or_else(|| StoreError::account_not_found(account_id))?;

        // Re-subscription mints a fresh processor customer; the old index
        // entry goes away in the same batch.
        let previous_customer = account
            .stripe_customer_id
            .take()
            .filter(|old| old != customer_id);

        account.tier = Tier::Pro;
        account.stripe_customer_id = Some(customer_id.to_string());
        account.updated_at = chrono::Utc::now();

        self.write_account(&account, previous_customer.as_deref())?;
        Ok(account)
    }

    fn downgrade_to_free(&self, account_id: &AccountId) -> Result<Account> {
        let mut account = self
            .get_account(account_id)?
            .ok_or_else(|| StoreError::account_not_found(account_id))?;

        // Customer reference is retained for re-subscription and audit.
        account.tier = Tier::Free;
        account.updated_at = chrono::Utc::now();

        self.write_account(&account, None)?;
        Ok(account)
    }

    // =========================================================================
    // Prompt Ledger Operations
    // =========================================================================

    fn append_prompt(&self, record: &PromptRecord) -> Result<()> {
        let cf_prompts = self.cf(cf::PROMPTS)?;
        let cf_by_account = self.cf(cf::PROMPTS_BY_ACCOUNT)?;

        let prompt_key = keys::prompt_key(&record.id);
        let index_key = keys::account_prompt_key(&record.account_id, &record.id);
        let value = Self::serialize(record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_prompts, &prompt_key, &value);
        batch.put_cf(&cf_by_account, &index_key, []); // Index entry (empty value)

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_prompt(&self, prompt_id: &PromptId) -> Result<Option<PromptRecord>> {
        let cf = self.cf(cf::PROMPTS)?;
        let key = keys::prompt_key(prompt_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn count_prompts(&self, account_id: &AccountId) -> Result<u64> {
        let cf_by_account = self.cf(cf::PROMPTS_BY_ACCOUNT)?;
        let prefix = keys::account_prompts_prefix(account_id);

        let iter = self.db.iterator_cf(
            &cf_by_account,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut count = 0u64;
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    fn list_prompts(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PromptRecord>> {
        let cf_by_account = self.cf(cf::PROMPTS_BY_ACCOUNT)?;
        let prefix = keys::account_prompts_prefix(account_id);

        let iter = self.db.iterator_cf(
            &cf_by_account,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // Collect matching index keys; ULIDs sort chronologically so the
        // scan yields oldest first.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        // Reverse to get newest first.
        all_keys.reverse();

        let mut records = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if records.len() >= limit {
                break;
            }

            let prompt_id = keys::extract_prompt_id_from_account_key(&key);
            if let Some(record) = self.get_prompt(&prompt_id)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    // =========================================================================
    // Usage Counter Operations
    // =========================================================================

    fn get_usage_counter(&self, account_id: &AccountId) -> Result<Option<UsageCounter>> {
        let cf = self.cf(cf::USAGE_COUNTERS)?;
        let key = keys::account_key(account_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn refresh_usage_counter(&self, account_id: &AccountId) -> Result<u64> {
        let count = self.count_prompts(account_id)?;

        let cf = self.cf(cf::USAGE_COUNTERS)?;
        let key = keys::account_key(account_id);
        let counter = UsageCounter::snapshot(*account_id, count);
        let value = Self::serialize(&counter)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(count)
    }

    // =========================================================================
    // Webhook Event Operations
    // =========================================================================

    fn has_webhook_event(&self, event_id: &str) -> Result<bool> {
        let cf = self.cf(cf::WEBHOOK_EVENTS)?;
        let key = keys::webhook_event_key(event_id);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    fn record_webhook_event(&self, event_id: &str) -> Result<()> {
        let cf = self.cf(cf::WEBHOOK_EVENTS)?;
        let key = keys::webhook_event_key(event_id);
        let value = Self::serialize(&chrono::Utc::now())?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn account_crud() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        let account = Account::new(account_id);

        store.put_account(&account).unwrap();

        let retrieved = store.get_account(&account_id).unwrap().unwrap();
        assert_eq!(retrieved.id, account_id);
        assert_eq!(retrieved.tier, Tier::Free);
        assert!(retrieved.stripe_customer_id.is_none());

        assert!(store.get_account(&AccountId::generate()).unwrap().is_none());
    }

    #[test]
    fn ensure_pro_links_customer_and_is_idempotent() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();

        let upgraded = store.ensure_pro(&account_id, "cus_123").unwrap();
        assert_eq!(upgraded.tier, Tier::Pro);
        assert_eq!(upgraded.stripe_customer_id.as_deref(), Some("cus_123"));

        // Replaying the upsert converges to the same state.
        let replayed = store.ensure_pro(&account_id, "cus_123").unwrap();
        assert_eq!(replayed.tier, Tier::Pro);
        assert_eq!(replayed.stripe_customer_id.as_deref(), Some("cus_123"));

        // Customer index resolves back to the account.
        let found = store.find_account_by_customer("cus_123").unwrap().unwrap();
        assert_eq!(found.id, account_id);
    }

    #[test]
    fn relinking_customer_unindexes_the_old_reference() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();

        store.ensure_pro(&account_id, "cus_old").unwrap();
        store.downgrade_to_free(&account_id).unwrap();
        store.ensure_pro(&account_id, "cus_new").unwrap();

        // The old mapping is gone, so a late deactivation for it resolves
        // nothing instead of downgrading the re-subscribed account.
        assert!(store.find_account_by_customer("cus_old").unwrap().is_none());
        let found = store.find_account_by_customer("cus_new").unwrap().unwrap();
        assert_eq!(found.id, account_id);
        assert_eq!(found.tier, Tier::Pro);
    }

    #[test]
    fn put_account_reindexes_changed_reference() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();

        let mut account = Account::new(account_id);
        account.stripe_customer_id = Some("cus_a".into());
        store.put_account(&account).unwrap();

        account.stripe_customer_id = Some("cus_b".into());
        store.put_account(&account).unwrap();

        assert!(store.find_account_by_customer("cus_a").unwrap().is_none());
        assert!(store.find_account_by_customer("cus_b").unwrap().is_some());
    }

    #[test]
    fn ensure_pro_missing_account() {
        let (store, _dir) = create_test_store();
        let result = store.ensure_pro(&AccountId::generate(), "cus_123");
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn downgrade_retains_customer_reference() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();
        store.ensure_pro(&account_id, "cus_456").unwrap();

        let downgraded = store.downgrade_to_free(&account_id).unwrap();
        assert_eq!(downgraded.tier, Tier::Free);
        assert_eq!(downgraded.stripe_customer_id.as_deref(), Some("cus_456"));

        // The index still resolves after downgrade (re-subscription path).
        let found = store.find_account_by_customer("cus_456").unwrap().unwrap();
        assert_eq!(found.id, account_id);
        assert_eq!(found.tier, Tier::Free);

        // Downgrading again is a no-op in effect.
        let again = store.downgrade_to_free(&account_id).unwrap();
        assert_eq!(again.tier, Tier::Free);
    }

    #[test]
    fn find_by_unknown_customer_is_none() {
        let (store, _dir) = create_test_store();
        assert!(store.find_account_by_customer("cus_none").unwrap().is_none());
    }

    #[test]
    fn prompt_append_and_count() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();

        assert_eq!(store.count_prompts(&account_id).unwrap(), 0);

        for i in 0..3 {
            let record = PromptRecord::new(account_id, format!("prompt {i}"));
            store.append_prompt(&record).unwrap();
        }

        assert_eq!(store.count_prompts(&account_id).unwrap(), 3);

        // Records for other accounts don't leak into the count.
        let other = AccountId::generate();
        store
            .append_prompt(&PromptRecord::new(other, "other".into()))
            .unwrap();
        assert_eq!(store.count_prompts(&account_id).unwrap(), 3);
        assert_eq!(store.count_prompts(&other).unwrap(), 1);
    }

    #[test]
    fn list_prompts_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();

        // Small delay so ULIDs get distinct timestamps.
        let first = PromptRecord::new(account_id, "first".into());
        store.append_prompt(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = PromptRecord::new(account_id, "second".into());
        store.append_prompt(&second).unwrap();

        let all = store.list_prompts(&account_id, 10, 0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "second"); // Newest first
        assert_eq!(all[1].content, "first");

        let page1 = store.list_prompts(&account_id, 1, 0).unwrap();
        let page2 = store.list_prompts(&account_id, 1, 1).unwrap();
        assert_eq!(page1[0].content, "second");
        assert_eq!(page2[0].content, "first");
    }

    #[test]
    fn counter_converges_with_ledger() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();

        assert!(store.get_usage_counter(&account_id).unwrap().is_none());

        for i in 0..4 {
            store
                .append_prompt(&PromptRecord::new(account_id, format!("p{i}")))
                .unwrap();
            let refreshed = store.refresh_usage_counter(&account_id).unwrap();
            assert_eq!(refreshed, i + 1);
        }

        let counter = store.get_usage_counter(&account_id).unwrap().unwrap();
        assert_eq!(counter.count, store.count_prompts(&account_id).unwrap());

        // Refreshing without new appends is idempotent.
        let refreshed = store.refresh_usage_counter(&account_id).unwrap();
        assert_eq!(refreshed, 4);
    }

    #[test]
    fn webhook_event_idempotency_marks() {
        let (store, _dir) = create_test_store();

        assert!(!store.has_webhook_event("evt_1").unwrap());
        store.record_webhook_event("evt_1").unwrap();
        assert!(store.has_webhook_event("evt_1").unwrap());
        assert!(!store.has_webhook_event("evt_2").unwrap());

        // Recording twice is harmless.
        store.record_webhook_event("evt_1").unwrap();
        assert!(store.has_webhook_event("evt_1").unwrap());
    }
}
