//! Snapshot types handed out by the query cache.

use chrono::{DateTime, Utc};
use color_eyre::Report;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::key::QueryKey;

/// Type-erased payload stored in the entry table.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Never fetched (or gated off)
  Idle,
  /// A fetch is in flight
  Fetching,
  /// Last fetch succeeded
  Success,
  /// Last fetch failed
  Error,
}

/// The error a fetcher returned, preserved as-is.
///
/// Clones share the same underlying report. Equality is identity: two
/// snapshots are equal only when they carry the same failure.
#[derive(Clone)]
pub struct QueryError(Arc<Report>);

impl QueryError {
  pub(crate) fn new(report: Report) -> Self {
    Self(Arc::new(report))
  }
}

impl PartialEq for QueryError {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for QueryError {}

impl fmt::Display for QueryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Debug for QueryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "QueryError({})", self.0)
  }
}

/// A point-in-time copy of one cache entry.
#[derive(Clone)]
pub struct QueryEntry {
  pub key: QueryKey,
  pub status: QueryStatus,
  pub error: Option<QueryError>,
  pub last_fetched_at: Option<DateTime<Utc>>,
  /// Marked stale by invalidation or by exceeding its stale time
  pub is_stale: bool,
  pub(crate) data: Option<Payload>,
}

impl QueryEntry {
  pub(crate) fn idle(key: QueryKey) -> Self {
    Self {
      key,
      status: QueryStatus::Idle,
      error: None,
      last_fetched_at: None,
      is_stale: false,
      data: None,
    }
  }

  /// The last successfully fetched payload, if it has type `T`.
  pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.data.clone()?.downcast::<T>().ok()
  }

  pub fn has_data(&self) -> bool {
    self.data.is_some()
  }

  pub fn is_idle(&self) -> bool {
    self.status == QueryStatus::Idle
  }

  pub fn is_fetching(&self) -> bool {
    self.status == QueryStatus::Fetching
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }
}

impl fmt::Debug for QueryEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryEntry")
      .field("key", &self.key)
      .field("status", &self.status)
      .field("error", &self.error)
      .field("last_fetched_at", &self.last_fetched_at)
      .field("is_stale", &self.is_stale)
      .field("has_data", &self.data.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;

  #[test]
  fn test_typed_data_read() {
    let mut entry = QueryEntry::idle(QueryKey::new("balances"));
    entry.data = Some(Arc::new(vec![1u32, 2, 3]));

    assert_eq!(entry.data::<Vec<u32>>().as_deref(), Some(&vec![1, 2, 3]));
    // Wrong type reads as absent rather than panicking
    assert!(entry.data::<String>().is_none());
  }

  #[test]
  fn test_error_identity() {
    let err = QueryError::new(eyre!("boom"));
    let clone = err.clone();
    let other = QueryError::new(eyre!("boom"));

    assert_eq!(err, clone);
    assert_ne!(err, other);
    assert_eq!(err.to_string(), "boom");
  }
}
