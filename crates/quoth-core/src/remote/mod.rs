//! Remote quote source
//!
//! The sync engine only sees the [`RemoteSource`] trait. [`HttpRemote`]
//! talks to a JSON endpoint that lists posts on GET and accepts new ones on
//! POST.

mod http;

use std::future::Future;

use crate::error::QuoteResult;
use crate::models::Quote;

pub use http::{map_remote_posts, HttpRemote, RemotePost};

/// Something that can hand out remote quotes and accept new local ones
pub trait RemoteSource: Send + Sync + 'static {
    /// Fetch the latest bounded batch of remote quotes, already in local shape
    fn fetch_remote_quotes(&self) -> impl Future<Output = QuoteResult<Vec<Quote>>> + Send;

    /// Send a newly created local quote to the remote side
    fn push_quote(&self, quote: &Quote) -> impl Future<Output = QuoteResult<()>> + Send;
}
