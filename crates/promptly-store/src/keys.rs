//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in
//! column families.

use promptly_core::{AccountId, PromptId};

/// Create an account key from an account ID.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create a customer index key from a Stripe customer ID.
#[must_use]
pub fn customer_key(customer_id: &str) -> Vec<u8> {
    customer_id.as_bytes().to_vec()
}

/// Create a prompt key from a prompt ID.
#[must_use]
pub fn prompt_key(prompt_id: &PromptId) -> Vec<u8> {
    prompt_id.to_bytes().to_vec()
}

/// Create an account-prompt index key.
///
/// Format: `account_id (16 bytes) || prompt_id (16 bytes)`
///
/// Since ULIDs are time-ordered, prompts for an account are sorted by
/// creation time.
#[must_use]
pub fn account_prompt_key(account_id: &AccountId, prompt_id: &PromptId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&prompt_id.to_bytes());
    key
}

/// Create a prefix for iterating all prompts for an account.
#[must_use]
pub fn account_prompts_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Extract the prompt ID from an account-prompt index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_prompt_id_from_account_key(key: &[u8]) -> PromptId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    PromptId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a webhook event key from an event ID.
#[must_use]
pub fn webhook_event_key(event_id: &str) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_key_length() {
        let account_id = AccountId::generate();
        let key = account_key(&account_id);
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn prompt_key_length() {
        let prompt_id = PromptId::generate();
        let key = prompt_key(&prompt_id);
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn account_prompt_key_format() {
        let account_id = AccountId::generate();
        let prompt_id = PromptId::generate();
        let key = account_prompt_key(&account_id, &prompt_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], account_id.as_bytes());
        assert_eq!(&key[16..], prompt_id.to_bytes());
    }

    #[test]
    fn extract_prompt_id_roundtrip() {
        let account_id = AccountId::generate();
        let prompt_id = PromptId::generate();
        let key = account_prompt_key(&account_id, &prompt_id);

        let extracted = extract_prompt_id_from_account_key(&key);
        assert_eq!(extracted, prompt_id);
    }
}
