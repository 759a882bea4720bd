//! Authenticated query cache shared by every screen.
//!
//! Inspired by TanStack Query, this module keeps server state keyed by
//! [`QueryKey`] and hands out [`Subscription`]s that:
//! - fetch only when enabled (e.g. once a credential has loaded)
//! - collapse concurrent interest in one key into a single request
//! - keep last-good data when a later fetch fails
//! - re-synchronize on [`QueryCache::invalidate`] without overlapping fetches
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::new(tokio::runtime::Handle::current());
//! let sub = cache.subscribe(
//!   QueryKey::new("balances"),
//!   move || {
//!     let client = client.clone();
//!     async move { client.balances(&credential).await }
//!   },
//!   QueryOptions::new().enabled(session.is_authenticated()),
//! );
//!
//! // In render
//! match sub.entry().status {
//!   QueryStatus::Fetching => render_spinner(),
//!   QueryStatus::Success => render_data(sub.entry().data::<Vec<Balance>>()),
//!   QueryStatus::Error => render_error(),
//!   QueryStatus::Idle => {}
//! }
//!
//! // Pull-to-refresh
//! cache.invalidate(None);
//! ```

mod cache;
mod entry;
mod key;

pub use cache::{QueryCache, QueryOptions, Subscription};
pub use entry::{QueryEntry, QueryError, QueryStatus};
pub use key::QueryKey;
