//! Process-wide session state: the one place the credential is loaded.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{info, warn};

use super::credential::{Credential, CredentialStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  /// Credential store has not answered yet
  Loading,
  SignedOut,
  SignedIn(Credential),
}

/// Holds the optional credential for the lifetime of the process.
///
/// Screens never read the credential store themselves; they gate their
/// queries on [`Session::is_authenticated`].
#[derive(Clone)]
pub struct Session {
  state: Arc<watch::Sender<SessionState>>,
}

impl Session {
  pub fn new(state: SessionState) -> Self {
    let (tx, _) = watch::channel(state);
    Self { state: Arc::new(tx) }
  }

  /// Start reading `store` in the background and return immediately.
  pub fn load(store: Arc<dyn CredentialStore>, runtime: &Handle) -> Self {
    let session = Self::new(SessionState::Loading);
    let handle = session.clone();

    runtime.spawn(async move {
      let state = match store.get_credential().await {
        Ok(Some(credential)) => {
          info!(source = %store.describe(), fingerprint = %credential.fingerprint(), "credential loaded");
          SessionState::SignedIn(credential)
        }
        Ok(None) => {
          info!(source = %store.describe(), "no credential stored, queries stay gated");
          SessionState::SignedOut
        }
        Err(e) => {
          warn!(source = %store.describe(), error = %e, "failed to load credential");
          SessionState::SignedOut
        }
      };
      handle.state.send_replace(state);
    });

    session
  }

  pub fn state(&self) -> SessionState {
    self.state.borrow().clone()
  }

  pub fn credential(&self) -> Option<Credential> {
    match &*self.state.borrow() {
      SessionState::SignedIn(credential) => Some(credential.clone()),
      _ => None,
    }
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(&*self.state.borrow(), SessionState::SignedIn(_))
  }

  pub fn set_credential(&self, credential: Option<Credential>) {
    let state = match credential {
      Some(credential) => SessionState::SignedIn(credential),
      None => SessionState::SignedOut,
    };
    self.state.send_replace(state);
  }

  pub fn changes(&self) -> watch::Receiver<SessionState> {
    self.state.subscribe()
  }
}
