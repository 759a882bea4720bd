use chrono::Utc;

use crate::ui::renderfns::{empty_message, format_age, query_title, ticket_status_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::wallet::types::Ticket;
use crate::wallet::{BoundQuery, Resource, WalletQueries};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// One ticket, read from the same cached list the tickets screen shows
pub struct TicketDetailView {
  queries: WalletQueries,
  query: BoundQuery,
  ticket_id: String,
}

impl TicketDetailView {
  pub fn new(queries: WalletQueries, ticket_id: String) -> Self {
    let query = queries.bind(Resource::Tickets);
    Self {
      queries,
      query,
      ticket_id,
    }
  }

  fn ticket(&self) -> Option<Ticket> {
    let tickets = self.query.data::<Vec<Ticket>>()?;
    tickets.iter().find(|t| t.id == self.ticket_id).cloned()
  }
}

impl View for TicketDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('R') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let entry = self.query.entry();
    let block = Block::default()
      .title(query_title(&format!("Ticket {}", self.ticket_id), &entry, None))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(ticket) = self.ticket() else {
      // A settled list without this id means the ticket went away
      let message = if entry.is_success() {
        format!("Ticket {} no longer exists.", self.ticket_id)
      } else {
        empty_message(&entry, "ticket")
      };
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let updated = match ticket.updated_at {
      Some(at) => format!("{} ({} ago)", at.format("%Y-%m-%d %H:%M"), format_age(Some(at), Utc::now())),
      None => "-".to_string(),
    };
    let label = |text: &str| Span::styled(format!("{:<10}", text), Style::default().fg(Color::DarkGray));

    let lines = vec![
      Line::from(vec![label("ID"), Span::styled(ticket.id.clone(), Style::default().fg(Color::Cyan))]),
      Line::from(vec![
        label("Status"),
        Span::styled(ticket.status.clone(), Style::default().fg(ticket_status_color(&ticket.status)).bold()),
      ]),
      Line::from(vec![label("Updated"), Span::raw(updated)]),
      Line::from(""),
      Line::from(Span::styled(ticket.subject.clone(), Style::default().fg(Color::White))),
    ];

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.ticket_id)
  }

  fn tick(&mut self) {
    self.queries.sync(&mut self.query);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("R", "reload").with_priority(25),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
