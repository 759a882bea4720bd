//! Credential loading and the session that gates authenticated queries.

mod credential;
mod session;

pub use credential::{
  ChainCredentialStore, Credential, CredentialStore, EnvCredentialStore, FileCredentialStore,
};
pub use session::{Session, SessionState};
