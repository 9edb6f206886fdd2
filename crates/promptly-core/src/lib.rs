//! Core types for the promptly platform.
//!
//! This crate provides the foundational types shared by the store and
//! service crates:
//!
//! - **Identifiers**: `AccountId`, `PromptId`
//! - **Accounts**: `Account`, `Tier`
//! - **Plans**: `PlanCatalog`, `PlanSpec`
//! - **Usage**: `PromptRecord`, `UsageCounter`
//!
//! # Tier model
//!
//! Every account is either `free` or `pro`. Free accounts may perform a
//! bounded number of metered generations (the plan ceiling); pro accounts
//! are unmetered. The tier is synchronized with the payment processor by
//! the service crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod ids;
pub mod plan;
pub mod usage;

pub use account::{Account, Tier};
pub use ids::{AccountId, IdError, PromptId};
pub use plan::{PlanCatalog, PlanSpec, DEFAULT_FREE_CEILING, PRO_PLAN_PRICE_CENTS};
pub use usage::{PromptRecord, UsageCounter};
