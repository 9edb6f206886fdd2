//! HTTP request handlers.

pub mod account;
pub mod billing;
pub mod health;
pub mod prompts;
pub mod webhooks;
