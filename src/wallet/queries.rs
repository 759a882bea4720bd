//! Binds wallet resources to the shared query cache.
//!
//! Every screen goes through [`WalletQueries`] instead of loading the
//! credential itself: queries start disabled, and [`WalletQueries::sync`]
//! opens the gate once the session is signed in.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{Credential, Session};
use crate::query::{QueryCache, QueryEntry, QueryKey, QueryOptions, Subscription};

use super::client::WalletClient;

/// Server resources shown by the screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
  UserDetails,
  Balances,
  Notifications,
  KycStatus,
  Tickets,
}

impl Resource {
  pub fn name(&self) -> &'static str {
    match self {
      Resource::UserDetails => "user_details",
      Resource::Balances => "balances",
      Resource::Notifications => "notifications",
      Resource::KycStatus => "kyc_status",
      Resource::Tickets => "tickets",
    }
  }

  /// Every resource belongs to the signed-in user, so keys carry the
  /// credential fingerprint and a new sign-in never sees another user's data.
  pub fn query_key(&self, credential: Option<&Credential>) -> QueryKey {
    let key = QueryKey::new(self.name());
    match credential {
      Some(credential) => key.with(credential.fingerprint()),
      None => key,
    }
  }
}

/// A screen's live handle on one resource.
#[derive(Debug)]
pub struct BoundQuery {
  resource: Resource,
  subscription: Subscription,
}

impl BoundQuery {
  pub fn key(&self) -> &QueryKey {
    self.subscription.key()
  }

  pub fn entry(&self) -> QueryEntry {
    self.subscription.entry()
  }

  pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.entry().data::<T>()
  }

  pub fn is_enabled(&self) -> bool {
    self.subscription.is_enabled()
  }

  pub fn refetch(&self) {
    self.subscription.refetch();
  }

  #[cfg(test)]
  pub async fn settled(&self) -> QueryEntry {
    self.subscription.settled().await
  }
}

/// Cache, client and session bundled for the screens.
#[derive(Clone)]
pub struct WalletQueries {
  cache: QueryCache,
  client: WalletClient,
  session: Session,
  stale_time: Option<Duration>,
}

impl WalletQueries {
  pub fn new(cache: QueryCache, client: WalletClient, session: Session) -> Self {
    Self {
      cache,
      client,
      session,
      stale_time: None,
    }
  }

  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = Some(stale_time);
    self
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  /// Subscribe to `resource`, gated on the current session.
  pub fn bind(&self, resource: Resource) -> BoundQuery {
    let credential = self.session.credential();
    let key = resource.query_key(credential.as_ref());
    let expected = credential.as_ref().map(Credential::fingerprint);

    let mut options = QueryOptions::new().enabled(credential.is_some());
    if let Some(stale_time) = self.stale_time {
      options = options.stale_time(stale_time);
    }

    let subscription = match resource {
      Resource::UserDetails => self.subscribe(key, options, expected, |client, credential| async move {
        client.get_user_details(&credential).await
      }),
      Resource::Balances => self.subscribe(key, options, expected, |client, credential| async move {
        client.get_balances(&credential).await
      }),
      Resource::Notifications => {
        self.subscribe(key, options, expected, |client, credential| async move {
          client.get_notifications(&credential).await
        })
      }
      Resource::KycStatus => self.subscribe(key, options, expected, |client, credential| async move {
        client.get_kyc_status(&credential).await
      }),
      Resource::Tickets => self.subscribe(key, options, expected, |client, credential| async move {
        client.get_tickets(&credential).await
      }),
    };

    BoundQuery {
      resource,
      subscription,
    }
  }

  /// Follow session changes: re-bind when the credential-scoped key moved,
  /// otherwise open or close the gate.
  pub fn sync(&self, query: &mut BoundQuery) {
    let credential = self.session.credential();
    let expected = query.resource.query_key(credential.as_ref());

    if query.key() != &expected {
      debug!(from = %query.key(), to = %expected, "re-binding query to new session");
      *query = self.bind(query.resource);
      return;
    }

    let authenticated = self.session.is_authenticated();
    if query.is_enabled() != authenticated {
      debug!(key = %query.key(), enabled = authenticated, "query gate changed");
      query.subscription.set_enabled(authenticated);
    }
  }

  /// Pull-to-refresh: every cached resource re-synchronizes with the backend.
  pub fn refresh_all(&self) {
    if self.cache.is_empty() {
      debug!("nothing cached to refresh");
      return;
    }
    self.cache.invalidate(None);
  }

  fn subscribe<T, F, Fut>(
    &self,
    key: QueryKey,
    options: QueryOptions,
    expected_fingerprint: Option<String>,
    fetch: F,
  ) -> Subscription
  where
    T: Send + Sync + 'static,
    F: Fn(WalletClient, Credential) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let client = self.client.clone();
    let session = self.session.clone();

    self.cache.subscribe(
      key,
      move || {
        let credential = session.credential();
        // Only the user this key was bound for may fetch it
        let fut = match (credential, &expected_fingerprint) {
          (Some(credential), Some(expected)) if &credential.fingerprint() == expected => {
            Some(fetch(client.clone(), credential))
          }
          _ => None,
        };
        async move {
          match fut {
            Some(fut) => fut.await,
            None => Err(eyre!("Session changed before the request was sent")),
          }
        }
      },
      options,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::SessionState;
  use crate::wallet::types::{Balance, Notification, UserDetails};
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn user_json() -> serde_json::Value {
    serde_json::json!({"id": "u1", "firstName": "Ada", "lastName": "L", "email": "a@x.io"})
  }

  fn queries(server: &MockServer, session: Session) -> WalletQueries {
    let client =
      WalletClient::with_base_url(&server.uri(), std::time::Duration::from_secs(5)).unwrap();
    WalletQueries::new(QueryCache::new(tokio::runtime::Handle::current()), client, session)
  }

  #[test]
  fn test_query_keys() {
    let credential = Credential::parse("tok").unwrap();
    assert_eq!(
      Resource::UserDetails.query_key(Some(&credential)),
      QueryKey::new("user_details").with(credential.fingerprint())
    );
    assert_eq!(Resource::Balances.query_key(None), QueryKey::new("balances"));
    assert_eq!(
      Resource::Notifications.query_key(Some(&credential)),
      QueryKey::new("notifications").with(credential.fingerprint())
    );
    assert_eq!(
      Resource::Tickets.query_key(None),
      QueryKey::new("tickets")
    );
  }

  #[tokio::test]
  async fn test_gated_until_signed_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/user/details"))
      .and(header("authorization", "Bearer tok"))
      .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
      .expect(1)
      .mount(&server)
      .await;

    let session = Session::new(SessionState::Loading);
    let queries = queries(&server, session.clone());

    let mut query = queries.bind(Resource::UserDetails);
    queries.sync(&mut query);
    assert!(query.entry().is_idle());
    assert!(!query.is_enabled());

    session.set_credential(Credential::parse("tok"));
    queries.sync(&mut query);
    queries.sync(&mut query);

    let entry = query.settled().await;
    assert!(entry.is_success());
    assert_eq!(query.data::<UserDetails>().map(|u| u.name.clone()), Some("Ada L".to_string()));
  }

  #[tokio::test]
  async fn test_scoped_query_rebinds_on_new_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/notifications"))
      .and(header("authorization", "Bearer first"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "notifications": [{"id": 1, "title": "for first"}]
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/notifications"))
      .and(header("authorization", "Bearer second"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "notifications": [{"id": 2, "title": "for second"}]
      })))
      .mount(&server)
      .await;

    let session = Session::new(SessionState::SignedIn(Credential::parse("first").unwrap()));
    let queries = queries(&server, session.clone());

    let mut query = queries.bind(Resource::Notifications);
    query.settled().await;
    let first_key = query.key().clone();

    session.set_credential(Credential::parse("second"));
    queries.sync(&mut query);
    assert_ne!(query.key(), &first_key);

    query.settled().await;
    let titles: Vec<String> = query
      .data::<Vec<Notification>>()
      .map(|n| n.iter().map(|n| n.title.clone()).collect())
      .unwrap_or_default();
    assert_eq!(titles, vec!["for second".to_string()]);

    // The first user's entry is untouched
    let old = queries.cache().get_entry(&first_key).and_then(|e| e.data::<Vec<Notification>>());
    assert_eq!(old.map(|n| n[0].title.clone()), Some("for first".to_string()));
  }

  #[tokio::test]
  async fn test_switching_user_never_shows_previous_users_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wallet/balances"))
      .and(header("authorization", "Bearer alice"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "balances": [{"asset": "BTC", "amount": 1}]
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/wallet/balances"))
      .and(header("authorization", "Bearer bob"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "balances": [{"asset": "ETH", "amount": 2}]
      })))
      .mount(&server)
      .await;

    let session = Session::new(SessionState::SignedIn(Credential::parse("alice").unwrap()));
    let queries = queries(&server, session.clone());

    let mut query = queries.bind(Resource::Balances);
    query.settled().await;
    assert!(query.data::<Vec<Balance>>().is_some());

    session.set_credential(Credential::parse("bob"));
    queries.sync(&mut query);

    // Bob's entry starts empty instead of showing Alice's balances
    assert!(query.entry().is_fetching());
    assert!(query.data::<Vec<Balance>>().is_none());

    query.settled().await;
    let assets: Vec<String> = query
      .data::<Vec<Balance>>()
      .map(|b| b.iter().map(|b| b.asset.clone()).collect())
      .unwrap_or_default();
    assert_eq!(assets, vec!["ETH".to_string()]);
  }

  #[tokio::test]
  async fn test_sign_out_closes_the_gate() {
    let server = MockServer::start().await;
    let session = Session::new(SessionState::SignedIn(Credential::parse("tok").unwrap()));
    let queries = queries(&server, session.clone());

    let mut query = queries.bind(Resource::KycStatus);
    assert!(query.is_enabled());

    session.set_credential(None);
    queries.sync(&mut query);
    assert!(!query.is_enabled());
    assert_eq!(query.key(), &QueryKey::new("kyc_status"));
  }

  #[tokio::test]
  async fn test_refresh_all_refetches_each_bound_resource_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/user/details"))
      .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
      .expect(2)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/kyc/status"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "verified"})))
      .expect(2)
      .mount(&server)
      .await;

    let session = Session::new(SessionState::SignedIn(Credential::parse("tok").unwrap()));
    let queries = queries(&server, session);

    // Two screens share the user details entry
    let profile = queries.bind(Resource::UserDetails);
    let summary = queries.bind(Resource::UserDetails);
    let kyc = queries.bind(Resource::KycStatus);
    profile.settled().await;
    kyc.settled().await;

    queries.refresh_all();
    assert!(summary.entry().is_fetching());
    assert!(kyc.entry().is_fetching());

    profile.settled().await;
    kyc.settled().await;
    assert!(summary.entry().is_success());
  }

  #[tokio::test]
  async fn test_rejected_credential_keeps_last_good_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/user/details"))
      .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
      .up_to_n_times(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/user/details"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let session = Session::new(SessionState::SignedIn(Credential::parse("tok").unwrap()));
    let queries = queries(&server, session);

    let query = queries.bind(Resource::UserDetails);
    query.settled().await;
    query.refetch();
    let entry = query.settled().await;

    assert!(entry.is_error());
    assert!(entry
      .error
      .as_ref()
      .is_some_and(|e| e.to_string().contains("Credential rejected")));
    assert!(entry.data::<UserDetails>().is_some());
  }
}
