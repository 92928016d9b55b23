//! Command handlers

pub mod config;
pub mod quote;
pub mod status;
pub mod sync;
pub mod transfer;

use quoth_core::QuoteError;

/// Wrap a library error so the user sees its notification first
pub(crate) fn notify(error: QuoteError) -> anyhow::Error {
    let notification = error.notification();
    anyhow::Error::new(error).context(notification)
}
