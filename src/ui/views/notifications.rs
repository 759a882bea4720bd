use chrono::Utc;

use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{empty_message, format_age, query_title, truncate};
use crate::ui::view::{View, ViewAction};
use crate::wallet::types::Notification;
use crate::wallet::{BoundQuery, Resource, WalletQueries};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// Notification list with a preview of the selected message
pub struct NotificationsView {
  queries: WalletQueries,
  query: BoundQuery,
  list_state: ListState,
}

impl NotificationsView {
  pub fn new(queries: WalletQueries) -> Self {
    let query = queries.bind(Resource::Notifications);
    Self {
      queries,
      query,
      list_state: ListState::default(),
    }
  }

  fn render_content(&mut self, frame: &mut Frame, area: Rect) {
    let entry = self.query.entry();
    let notifications = entry.data::<Vec<Notification>>();
    let notifications = notifications.as_deref().map(Vec::as_slice).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, notifications.len());

    let unread = notifications.iter().filter(|n| !n.read).count();
    let label = if unread > 0 {
      format!("Notifications [{} unread]", unread)
    } else {
      "Notifications".to_string()
    };

    let block = Block::default()
      .title(query_title(&label, &entry, Some(notifications.len())))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if notifications.is_empty() {
      let paragraph = Paragraph::new(empty_message(&entry, "notifications"))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(7)])
      .split(area);

    let now = Utc::now();
    let items: Vec<ListItem> = notifications
      .iter()
      .map(|n| {
        let (marker, title_style) = if n.read {
          ("  ", Style::default().fg(Color::Gray))
        } else {
          ("● ", Style::default().fg(Color::White).bold())
        };
        ListItem::new(Line::from(vec![
          Span::styled(marker, Style::default().fg(Color::Yellow)),
          Span::styled(format!("{:<60}", truncate(&n.title, 60)), title_style),
          Span::raw(" "),
          Span::styled(
            format!("{:>4}", format_age(n.created_at, now)),
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

    frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

    let selected = self.list_state.selected().and_then(|i| notifications.get(i));
    if let Some(n) = selected {
      let preview = Paragraph::new(n.body.as_str())
        .wrap(Wrap { trim: true })
        .block(
          Block::default()
            .title(format!(" {} ", truncate(&n.title, 40)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
        );
      frame.render_widget(preview, chunks[1]);
    }
  }
}

impl View for NotificationsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') => self.list_state.select_first(),
      KeyCode::Char('G') => self.list_state.select_last(),
      KeyCode::Char('R') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_content(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Notifications".to_string()
  }

  fn tick(&mut self) {
    self.queries.sync(&mut self.query);
  }
}
