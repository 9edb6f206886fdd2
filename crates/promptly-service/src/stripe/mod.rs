//! Stripe integration: API client and payload types.

mod client;
mod types;

pub use client::{StripeClient, StripeError};
pub use types::{
    CheckoutSession, StripeErrorDetail, StripeErrorResponse, StripeList, Subscription,
};
