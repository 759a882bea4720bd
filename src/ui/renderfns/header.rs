use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::auth::SessionState;
use crate::ui::view::ShortcutInfo;

/// Draw the header bar with title, API host, session state, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  api_url: &str,
  session: &SessionState,
  shortcuts: &[ShortcutInfo],
) {
  let host = extract_host(api_url);
  let (session_label, session_color) = session_badge(session);

  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", session_label),
      Style::default().fg(session_color).bold(),
    ),
    Span::raw("  "),
  ];

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);

  // Keys and brackets highlighted, descriptions dimmed
  for (i, shortcut) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

fn session_badge(session: &SessionState) -> (String, Color) {
  match session {
    SessionState::Loading => ("loading credential".to_string(), Color::DarkGray),
    SessionState::SignedOut => ("signed out".to_string(), Color::Red),
    SessionState::SignedIn(credential) => {
      (format!("signed in {}", credential.fingerprint()), Color::Green)
    }
  }
}

/// Extract host (and port) from the API URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::Credential;

  #[test]
  fn test_extract_host() {
    assert_eq!(
      extract_host("https://api.example.com/v1/"),
      "api.example.com"
    );
    assert_eq!(extract_host("http://localhost:8080"), "localhost:8080");
    assert_eq!(extract_host("wallet.internal"), "wallet.internal");
  }

  #[test]
  fn test_session_badge() {
    assert_eq!(session_badge(&SessionState::SignedOut).0, "signed out");

    let credential = Credential::parse("tok").unwrap();
    let (label, color) = session_badge(&SessionState::SignedIn(credential.clone()));
    assert!(label.ends_with(&credential.fingerprint()));
    assert_eq!(color, Color::Green);
  }
}
