//! Serde-deserializable types matching wallet API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::types::{Balance, KycStatus, Notification, Ticket, UserDetails};

/// Amounts arrive as JSON numbers or as decimal strings depending on endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiAmount {
  Number(f64),
  Text(String),
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  match ApiAmount::deserialize(deserializer)? {
    ApiAmount::Number(n) => Ok(n),
    ApiAmount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
  }
}

fn de_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<ApiAmount>::deserialize(deserializer)? {
    None => Ok(None),
    Some(ApiAmount::Number(n)) => Ok(Some(n)),
    Some(ApiAmount::Text(s)) if s.trim().is_empty() => Ok(None),
    Some(ApiAmount::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
  }
}

/// Ids are strings on newer endpoints and integers on older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiId {
  Number(i64),
  Text(String),
}

impl ApiId {
  fn into_string(self) -> String {
    match self {
      ApiId::Number(n) => n.to_string(),
      ApiId::Text(s) => s,
    }
  }
}

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserDetails {
  id: ApiId,
  #[serde(default)]
  first_name: String,
  #[serde(default)]
  last_name: String,
  #[serde(default)]
  email: String,
  phone: Option<String>,
}

impl From<ApiUserDetails> for UserDetails {
  fn from(api: ApiUserDetails) -> Self {
    let name = format!("{} {}", api.first_name.trim(), api.last_name.trim())
      .trim()
      .to_string();
    UserDetails {
      id: api.id.into_string(),
      name,
      email: api.email,
      phone: api.phone.filter(|p| !p.trim().is_empty()),
    }
  }
}

// ============================================================================
// Balances
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiBalancesResponse {
  #[serde(default)]
  pub balances: Vec<ApiBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBalance {
  #[serde(alias = "symbol")]
  asset: String,
  #[serde(deserialize_with = "de_amount")]
  amount: f64,
  #[serde(default, deserialize_with = "de_opt_amount")]
  fiat_value: Option<f64>,
  fiat_currency: Option<String>,
}

impl From<ApiBalance> for Balance {
  fn from(api: ApiBalance) -> Self {
    Balance {
      asset: api.asset.to_uppercase(),
      amount: api.amount,
      fiat_value: api.fiat_value,
      fiat_currency: api.fiat_currency.unwrap_or_else(|| "USD".to_string()),
    }
  }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiNotificationsResponse {
  #[serde(default)]
  pub notifications: Vec<ApiNotification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotification {
  id: ApiId,
  #[serde(default)]
  title: String,
  #[serde(default, alias = "message")]
  body: String,
  #[serde(default)]
  read: bool,
  created_at: Option<DateTime<Utc>>,
}

impl From<ApiNotification> for Notification {
  fn from(api: ApiNotification) -> Self {
    Notification {
      id: api.id.into_string(),
      title: api.title,
      body: api.body,
      read: api.read,
      created_at: api.created_at,
    }
  }
}

// ============================================================================
// KYC
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiKycResponse {
  pub status: Option<String>,
}

impl From<ApiKycResponse> for KycStatus {
  fn from(api: ApiKycResponse) -> Self {
    KycStatus::normalize(api.status.as_deref())
  }
}

// ============================================================================
// Support tickets
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTicketsResponse {
  #[serde(default)]
  pub tickets: Vec<ApiTicket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTicket {
  id: ApiId,
  #[serde(default)]
  subject: String,
  #[serde(default)]
  status: String,
  updated_at: Option<DateTime<Utc>>,
}

impl From<ApiTicket> for Ticket {
  fn from(api: ApiTicket) -> Self {
    Ticket {
      id: api.id.into_string(),
      subject: api.subject,
      status: api.status,
      updated_at: api.updated_at,
    }
  }
}
