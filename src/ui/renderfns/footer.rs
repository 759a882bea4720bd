use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer: view breadcrumb on the left, cache status on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: &str) {
  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([
      Constraint::Min(1),
      Constraint::Length(status.chars().count() as u16 + 2),
    ])
    .split(area);

  let last = breadcrumb.len().saturating_sub(1);
  let mut spans = vec![Span::raw(" ")];
  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == last {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.as_str(), style));
  }

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), chunks[0]);
  frame.render_widget(
    Paragraph::new(format!("{} ", status))
      .alignment(Alignment::Right)
      .style(background.fg(Color::DarkGray)),
    chunks[1],
  );
}

/// Footer status text for the cache, e.g. "3 queries, 1 fetching"
pub fn cache_status(entries: usize, fetching: usize) -> String {
  match (entries, fetching) {
    (0, _) => "cache empty".to_string(),
    (1, 0) => "1 query".to_string(),
    (n, 0) => format!("{} queries", n),
    (n, f) => format!("{} {}, {} fetching", n, if n == 1 { "query" } else { "queries" }, f),
  }
}
