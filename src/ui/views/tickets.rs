use chrono::Utc;

use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{empty_message, format_age, query_title, ticket_status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::TicketDetailView;
use crate::wallet::types::Ticket;
use crate::wallet::{BoundQuery, Resource, WalletQueries};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Support tickets for the signed-in user
pub struct TicketsView {
  queries: WalletQueries,
  query: BoundQuery,
  list_state: ListState,
}

impl TicketsView {
  pub fn new(queries: WalletQueries) -> Self {
    let query = queries.bind(Resource::Tickets);
    Self {
      queries,
      query,
      list_state: ListState::default(),
    }
  }

  /// Rendering keeps the selection in range; before that the first row counts
  fn selected_ticket_id(&self) -> Option<String> {
    let tickets = self.query.data::<Vec<Ticket>>()?;
    let index = self.list_state.selected().unwrap_or(0);
    tickets.get(index).map(|ticket| ticket.id.clone())
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let entry = self.query.entry();
    let tickets = entry.data::<Vec<Ticket>>();
    let tickets = tickets.as_deref().map(Vec::as_slice).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, tickets.len());

    let block = Block::default()
      .title(query_title("Tickets", &entry, Some(tickets.len())))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if tickets.is_empty() {
      let paragraph = Paragraph::new(empty_message(&entry, "tickets"))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = tickets
      .iter()
      .map(|ticket| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<10}", truncate(&ticket.id, 10)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<12}", truncate(&ticket.status, 12)),
            Style::default().fg(ticket_status_color(&ticket.status)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<60}", truncate(&ticket.subject, 60))),
          Span::styled(
            format!("{:>4}", format_age(ticket.updated_at, now)),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for TicketsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => {
        if let Some(id) = self.selected_ticket_id() {
          return ViewAction::Push(Box::new(TicketDetailView::new(self.queries.clone(), id)));
        }
      }
      KeyCode::Char('R') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Tickets".to_string()
  }

  fn tick(&mut self) {
    self.queries.sync(&mut self.query);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "open").with_priority(15),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("R", "reload").with_priority(25),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
