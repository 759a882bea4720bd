//! Bearer credentials and the stores they are read from.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Opaque bearer token for the authenticated user.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  /// Build a credential from raw store contents. Blank input is no credential.
  pub fn parse(raw: &str) -> Option<Self> {
    let token = raw.trim();
    if token.is_empty() {
      None
    } else {
      Some(Self(token.to_string()))
    }
  }

  pub fn token(&self) -> &str {
    &self.0
  }

  /// Short stable identifier for scoping cache keys and log lines.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Credential({})", self.fingerprint())
  }
}

/// Where the session credential comes from.
pub trait CredentialStore: Send + Sync {
  /// Read the credential, if one is stored.
  fn get_credential(&self) -> BoxFuture<'_, Result<Option<Credential>>>;

  /// Human-readable origin, for logs.
  fn describe(&self) -> String;
}

/// Reads the token from the first non-empty environment variable.
pub struct EnvCredentialStore {
  vars: Vec<String>,
}

impl EnvCredentialStore {
  pub fn new(vars: Vec<String>) -> Self {
    Self { vars }
  }
}

impl CredentialStore for EnvCredentialStore {
  fn get_credential(&self) -> BoxFuture<'_, Result<Option<Credential>>> {
    async move {
      Ok(
        self
          .vars
          .iter()
          .filter_map(|var| std::env::var(var).ok())
          .find_map(|value| Credential::parse(&value)),
      )
    }
    .boxed()
  }

  fn describe(&self) -> String {
    format!("env {}", self.vars.join(", "))
  }
}

/// Reads the token from a file on disk. A missing or blank file means signed out.
pub struct FileCredentialStore {
  path: PathBuf,
}

impl FileCredentialStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }
}

impl CredentialStore for FileCredentialStore {
  fn get_credential(&self) -> BoxFuture<'_, Result<Option<Credential>>> {
    async move {
      match tokio::fs::read_to_string(&self.path).await {
        Ok(contents) => Ok(Credential::parse(&contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
          debug!(path = %self.path.display(), "no token file");
          Ok(None)
        }
        Err(e) => Err(eyre!(
          "Failed to read token file {}: {}",
          self.path.display(),
          e
        )),
      }
    }
    .boxed()
  }

  fn describe(&self) -> String {
    format!("file {}", self.path.display())
  }
}

/// Tries each store in order; the first credential found wins.
///
/// A failing store is logged and skipped so one broken source does not sign
/// the user out.
pub struct ChainCredentialStore {
  stores: Vec<Box<dyn CredentialStore>>,
}

impl ChainCredentialStore {
  pub fn new(stores: Vec<Box<dyn CredentialStore>>) -> Self {
    Self { stores }
  }
}

impl CredentialStore for ChainCredentialStore {
  fn get_credential(&self) -> BoxFuture<'_, Result<Option<Credential>>> {
    async move {
      for store in &self.stores {
        match store.get_credential().await {
          Ok(Some(credential)) => {
            debug!(source = %store.describe(), "credential found");
            return Ok(Some(credential));
          }
          Ok(None) => {}
          Err(e) => warn!(source = %store.describe(), error = %e, "credential store failed"),
        }
      }
      Ok(None)
    }
    .boxed()
  }

  fn describe(&self) -> String {
    self
      .stores
      .iter()
      .map(|s| s.describe())
      .collect::<Vec<_>>()
      .join(" -> ")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct FailingStore;

  impl CredentialStore for FailingStore {
    fn get_credential(&self) -> BoxFuture<'_, Result<Option<Credential>>> {
      async { Err(eyre!("keychain locked")) }.boxed()
    }

    fn describe(&self) -> String {
      "failing".to_string()
    }
  }

  #[test]
  fn test_parse_trims_and_rejects_blank() {
    assert_eq!(Credential::parse("  abc\n").map(|c| c.token().to_string()), Some("abc".to_string()));
    assert!(Credential::parse("   \n").is_none());
  }

  #[test]
  fn test_debug_hides_token() {
    let credential = Credential::parse("super-secret-token").unwrap();
    let debug = format!("{:?}", credential);
    assert!(!debug.contains("super-secret-token"));
    assert!(debug.contains(&credential.fingerprint()));
  }

  #[test]
  fn test_fingerprint_is_stable_and_distinct() {
    let a = Credential::parse("token-a").unwrap();
    let b = Credential::parse("token-b").unwrap();
    assert_eq!(a.fingerprint(), Credential::parse("token-a").unwrap().fingerprint());
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 16);
  }

  #[tokio::test]
  async fn test_file_store_reads_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    std::fs::write(&path, "file-token\n").unwrap();

    let store = FileCredentialStore::new(path);
    let credential = store.get_credential().await.unwrap();
    assert_eq!(credential.map(|c| c.token().to_string()), Some("file-token".to_string()));
  }

  #[tokio::test]
  async fn test_file_store_missing_file_is_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path().join("absent"));
    assert!(store.get_credential().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_env_store_first_non_empty_wins() {
    std::env::set_var("WALLETQ_TEST_ENV_EMPTY", "  ");
    std::env::set_var("WALLETQ_TEST_ENV_SET", "env-token");
    let store = EnvCredentialStore::new(vec![
      "WALLETQ_TEST_ENV_UNSET".to_string(),
      "WALLETQ_TEST_ENV_EMPTY".to_string(),
      "WALLETQ_TEST_ENV_SET".to_string(),
    ]);

    let credential = store.get_credential().await.unwrap();
    assert_eq!(credential.map(|c| c.token().to_string()), Some("env-token".to_string()));
  }

  #[tokio::test]
  async fn test_chain_skips_failing_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    std::fs::write(&path, "chained").unwrap();

    let stores: Vec<Box<dyn CredentialStore>> =
      vec![Box::new(FailingStore), Box::new(FileCredentialStore::new(path))];
    let store = ChainCredentialStore::new(stores);

    let credential = store.get_credential().await.unwrap();
    assert_eq!(credential.map(|c| c.token().to_string()), Some("chained".to_string()));
  }
}
