use crate::query::QueryEntry;
use crate::ui::renderfns::{empty_message, query_title};
use crate::ui::view::{View, ViewAction};
use crate::wallet::types::{KycStatus, UserDetails};
use crate::wallet::{BoundQuery, Resource, WalletQueries};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// User details and identity verification status
pub struct ProfileView {
  queries: WalletQueries,
  user: BoundQuery,
  kyc: BoundQuery,
}

impl ProfileView {
  pub fn new(queries: WalletQueries) -> Self {
    let user = queries.bind(Resource::UserDetails);
    let kyc = queries.bind(Resource::KycStatus);
    Self { queries, user, kyc }
  }

  fn render_user(&self, frame: &mut Frame, area: Rect, entry: &QueryEntry) {
    let block = Block::default()
      .title(query_title("Profile", entry, None))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(user) = entry.data::<UserDetails>() else {
      let paragraph = Paragraph::new(empty_message(entry, "user details"))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let lines = vec![
      field_line("Name", &user.name),
      field_line("Email", &user.email),
      field_line("Phone", user.phone.as_deref().unwrap_or("-")),
      field_line("User ID", &user.id),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_kyc(&self, frame: &mut Frame, area: Rect, entry: &QueryEntry) {
    let block = Block::default()
      .title(query_title("Verification", entry, None))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(status) = entry.data::<KycStatus>() else {
      let paragraph = Paragraph::new(empty_message(entry, "verification status"))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let line = Line::from(vec![
      Span::styled(format!("{:<10}", "Status"), Style::default().fg(Color::DarkGray)),
      Span::styled(status.label().to_string(), Style::default().fg(kyc_color(&status)).bold()),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), area);
  }
}

fn field_line(label: &str, value: &str) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
    Span::styled(value.to_string(), Style::default().fg(Color::White)),
  ])
}

fn kyc_color(status: &KycStatus) -> Color {
  match status {
    KycStatus::Approved => Color::Green,
    KycStatus::Pending => Color::Yellow,
    KycStatus::Rejected => Color::Red,
    KycStatus::NotStarted | KycStatus::Unknown(_) => Color::Gray,
  }
}

impl View for ProfileView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('R') => {
        self.user.refetch();
        self.kyc.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(6), Constraint::Length(3), Constraint::Min(0)])
      .split(area);

    self.render_user(frame, chunks[0], &self.user.entry());
    self.render_kyc(frame, chunks[1], &self.kyc.entry());
  }

  fn breadcrumb_label(&self) -> String {
    "Profile".to_string()
  }

  fn tick(&mut self) {
    self.queries.sync(&mut self.user);
    self.queries.sync(&mut self.kyc);
  }
}
