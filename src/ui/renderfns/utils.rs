use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::query::{QueryEntry, QueryStatus};

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format a number with thousands separators (1234567.891, 2 -> "1,234,567.89")
pub fn format_amount(value: f64, decimals: usize) -> String {
  let formatted = format!("{:.prec$}", value.abs(), prec = decimals);
  let (integer_part, decimal_part) = match formatted.split_once('.') {
    Some((i, d)) => (i, Some(d)),
    None => (formatted.as_str(), None),
  };

  let mut grouped = String::new();
  for (i, ch) in integer_part.chars().enumerate() {
    if i > 0 && (integer_part.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }

  let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
    "-"
  } else {
    ""
  };

  match decimal_part {
    Some(d) => format!("{}{}.{}", sign, grouped, d),
    None => format!("{}{}", sign, grouped),
  }
}

/// Fiat value with currency code, e.g. "1,250.00 USD"
pub fn format_fiat(value: f64, currency: &str) -> String {
  format!("{} {}", format_amount(value, 2), currency)
}

/// Compact relative age ("5m", "3h", "2d") for list columns
pub fn format_age(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
  let Some(at) = at else {
    return "-".to_string();
  };
  let secs = (now - at).num_seconds().max(0);
  match secs {
    0..=59 => "now".to_string(),
    60..=3599 => format!("{}m", secs / 60),
    3600..=86_399 => format!("{}h", secs / 3600),
    _ => format!("{}d", secs / 86_400),
  }
}

/// Block title suffix describing a query's state
pub fn query_title(label: &str, entry: &QueryEntry, count: Option<usize>) -> String {
  if entry.is_idle() {
    return format!(" {} (waiting for sign-in) ", label);
  }
  if entry.is_fetching() {
    let state = if entry.has_data() { "refreshing..." } else { "loading..." };
    return format!(" {} ({}) ", label, state);
  }
  if let (true, Some(e)) = (entry.is_error(), &entry.error) {
    return format!(" {} (error: {}) ", label, e);
  }
  match count {
    Some(n) => format!(" {} ({}) ", label, n),
    None => format!(" {} ", label),
  }
}

/// Placeholder text shown when a query has nothing to render
pub fn empty_message(entry: &QueryEntry, what: &str) -> String {
  match entry.status {
    QueryStatus::Idle => "Not signed in. Queries start once a credential is available.".to_string(),
    QueryStatus::Fetching => format!("Loading {}...", what),
    QueryStatus::Error => format!("Failed to load {}. Press 'r' to retry.", what),
    QueryStatus::Success => format!("No {} found.", what),
  }
}

/// Color for ticket states
pub fn ticket_status_color(status: &str) -> Color {
  match status.to_lowercase().as_str() {
    "resolved" | "closed" | "done" => Color::Green,
    "open" | "new" => Color::Yellow,
    "pending" | "waiting" | "in progress" => Color::Cyan,
    _ => Color::White,
  }
}
