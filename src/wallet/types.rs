use chrono::{DateTime, Utc};

/// Signed-in user's profile
#[derive(Debug, Clone, PartialEq)]
pub struct UserDetails {
  pub id: String,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
}

/// Holding of one asset
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
  pub asset: String,
  pub amount: f64,
  /// Value in `fiat_currency`, when the backend prices this asset
  pub fiat_value: Option<f64>,
  pub fiat_currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub id: String,
  pub title: String,
  pub body: String,
  pub read: bool,
  pub created_at: Option<DateTime<Utc>>,
}

/// Support ticket summary
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
  pub id: String,
  pub subject: String,
  pub status: String,
  pub updated_at: Option<DateTime<Utc>>,
}

/// Identity verification state, normalized from the backend's free-form strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KycStatus {
  NotStarted,
  Pending,
  Approved,
  Rejected,
  /// Unrecognized value, kept for display
  Unknown(String),
}

impl KycStatus {
  pub fn normalize(raw: Option<&str>) -> Self {
    let Some(raw) = raw else {
      return KycStatus::NotStarted;
    };
    let folded: String = raw
      .chars()
      .filter(|c| !matches!(c, '-' | '_' | ' '))
      .flat_map(char::to_lowercase)
      .collect();

    match folded.as_str() {
      "" | "none" | "notstarted" | "unverified" | "new" => KycStatus::NotStarted,
      "pending" | "submitted" | "inreview" | "underreview" | "processing" => KycStatus::Pending,
      "approved" | "verified" | "completed" | "success" => KycStatus::Approved,
      "rejected" | "declined" | "failed" | "denied" => KycStatus::Rejected,
      _ => KycStatus::Unknown(raw.trim().to_string()),
    }
  }

  pub fn label(&self) -> &str {
    match self {
      KycStatus::NotStarted => "Not started",
      KycStatus::Pending => "Under review",
      KycStatus::Approved => "Verified",
      KycStatus::Rejected => "Rejected",
      KycStatus::Unknown(raw) => raw,
    }
  }
}
