//! Async query layer for data fetching with caching support.
//!
//! Inspired by TanStack Query. A `QueryClient` owns one cache entry per
//! `QueryKey`; every `Query<R, T>` observing that key shares the entry, so
//! concurrent mounts issue one request and mutations can invalidate a whole
//! key prefix.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new(client.clone(), QueryKey::new(["my-shortenurls"]), fetch_urls)
//!     .select(|urls: &Vec<ShortUrlRecord>| sorted(urls));
//!
//! // Subscribe and fetch if stale
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(&e),
//!     QueryState::Idle => {}
//! }
//! ```

mod client;
mod error;
mod key;
mod mutation;
mod observer;

pub use client::{FetchOutcome, QueryClient, QueryStatus};
pub use error::QueryError;
pub use key::{KeyPart, QueryKey};
pub use mutation::{Mutation, MutationState};
pub use observer::{Query, QueryOptions, QueryState};
