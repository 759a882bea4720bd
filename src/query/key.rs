//! Structural identifiers for cached server resources.

use std::fmt;

/// One primitive component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Str(String),
  Int(i64),
  Bool(bool),
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Str(s) => f.write_str(s),
      KeyPart::Int(i) => write!(f, "{}", i),
      KeyPart::Bool(b) => write!(f, "{}", b),
    }
  }
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    KeyPart::Str(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    KeyPart::Str(value)
  }
}

impl From<i64> for KeyPart {
  fn from(value: i64) -> Self {
    KeyPart::Int(value)
  }
}

impl From<u32> for KeyPart {
  fn from(value: u32) -> Self {
    KeyPart::Int(i64::from(value))
  }
}

impl From<bool> for KeyPart {
  fn from(value: bool) -> Self {
    KeyPart::Bool(value)
  }
}

/// Ordered tuple identifying a cacheable resource, e.g. `(notifications, <user>)`.
///
/// Keys compare structurally: two keys built from the same parts in the same
/// order address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
  /// Start a key from its resource name.
  pub fn new(resource: impl Into<KeyPart>) -> Self {
    Self(vec![resource.into()])
  }

  /// Append a scoping parameter.
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.0.push(part.into());
    self
  }

}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      write!(f, "{}", part)?;
    }
    Ok(())
  }
}

impl From<&str> for QueryKey {
  fn from(value: &str) -> Self {
    QueryKey::new(value)
  }
}
