use crate::auth::Credential;
use crate::config::Config;
use crate::wallet::api_types::{
  ApiBalancesResponse, ApiKycResponse, ApiNotificationsResponse, ApiTicketsResponse,
  ApiUserDetails,
};
use crate::wallet::types::{Balance, KycStatus, Notification, Ticket, UserDetails};
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Wallet REST API client
#[derive(Clone)]
pub struct WalletClient {
  http: reqwest::Client,
  base_url: Url,
}

impl WalletClient {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_base_url(&config.api.url, Duration::from_secs(config.api.timeout_secs))
  }

  pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
    // Url::join drops the last path segment unless it ends with '/'
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base_url =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid API URL {}: {}", base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("walletq/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, credential: &Credential) -> Result<T> {
    let url = self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))?;

    debug!(url = %url, "GET");

    let response = self
      .http
      .get(url.clone())
      .bearer_auth(credential.token())
      .send()
      .await
      .map_err(|e| eyre!("Request to /{} failed: {}", path, e))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(eyre!("Credential rejected by /{} ({})", path, status));
    }
    if !status.is_success() {
      return Err(eyre!("/{} returned {}", path, status));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from /{}: {}", path, e))
  }

  pub async fn get_user_details(&self, credential: &Credential) -> Result<UserDetails> {
    let user: ApiUserDetails = self.get("user/details", credential).await?;
    Ok(user.into())
  }

  pub async fn get_balances(&self, credential: &Credential) -> Result<Vec<Balance>> {
    let response: ApiBalancesResponse = self.get("wallet/balances", credential).await?;
    Ok(response.balances.into_iter().map(Balance::from).collect())
  }

  pub async fn get_notifications(&self, credential: &Credential) -> Result<Vec<Notification>> {
    let response: ApiNotificationsResponse = self.get("notifications", credential).await?;
    Ok(
      response
        .notifications
        .into_iter()
        .map(Notification::from)
        .collect(),
    )
  }

  pub async fn get_kyc_status(&self, credential: &Credential) -> Result<KycStatus> {
    let response: ApiKycResponse = self.get("kyc/status", credential).await?;
    Ok(response.into())
  }

  pub async fn get_tickets(&self, credential: &Credential) -> Result<Vec<Ticket>> {
    let response: ApiTicketsResponse = self.get("support/tickets", credential).await?;
    Ok(response.tickets.into_iter().map(Ticket::from).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn credential() -> Credential {
    Credential::parse("test-token").unwrap()
  }

  async fn client_for(server: &MockServer, prefix: &str) -> WalletClient {
    WalletClient::with_base_url(&format!("{}{}", server.uri(), prefix), Duration::from_secs(5))
      .unwrap()
  }

  #[tokio::test]
  async fn test_bearer_auth_and_base_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/v1/user/details"))
      .and(header("authorization", "Bearer test-token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "u1",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com"
      })))
      .mount(&server)
      .await;

    // No trailing slash: the /v1 segment must survive joining
    let client = client_for(&server, "/v1").await;
    let user = client.get_user_details(&credential()).await.unwrap();

    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.email, "ada@example.com");
  }

  #[tokio::test]
  async fn test_balances() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wallet/balances"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "balances": [{"asset": "btc", "amount": "1.25", "fiatValue": "80000.5"}]
      })))
      .mount(&server)
      .await;

    let client = client_for(&server, "").await;
    let balances = client.get_balances(&credential()).await.unwrap();

    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].amount, 1.25);
    assert_eq!(balances[0].fiat_value, Some(80000.5));
  }

  #[tokio::test]
  async fn test_unauthorized_is_credential_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/kyc/status"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let client = client_for(&server, "").await;
    let err = client.get_kyc_status(&credential()).await.unwrap_err();

    assert!(err.to_string().contains("Credential rejected"));
  }

  #[tokio::test]
  async fn test_server_error_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/support/tickets"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let client = client_for(&server, "").await;
    let err = client.get_tickets(&credential()).await.unwrap_err();

    assert!(err.to_string().contains("503"));
  }

  #[tokio::test]
  async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/notifications"))
      .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
      .mount(&server)
      .await;

    let client = client_for(&server, "").await;
    let err = client.get_notifications(&credential()).await.unwrap_err();

    assert!(err.to_string().contains("Failed to parse"));
  }
}
