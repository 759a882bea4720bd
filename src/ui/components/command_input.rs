use super::KeyResult;
use crate::commands::{self, Command, CommandAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// A known command was submitted
  Submitted(CommandAction),
  /// Enter on input that matches nothing
  Unknown(String),
  /// Command cancelled
  Cancelled,
}

/// `:` prompt with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  buffer: String,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.reset();
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.buffer)
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.reset();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        self.active = false;
        let event = self.resolve_command();
        self.reset();
        KeyResult::Event(event)
      }
      KeyCode::Tab | KeyCode::Down => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + count - 1) % count;
        }
        KeyResult::Handled
      }
      KeyCode::Backspace => {
        self.buffer.pop();
        self.selected_suggestion = 0;
        KeyResult::Handled
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.reset();
        KeyResult::Handled
      }
      KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.buffer.push(c);
        self.selected_suggestion = 0;
        KeyResult::Handled
      }
      // Swallow everything else while the prompt is open
      _ => KeyResult::Handled,
    }
  }

  fn reset(&mut self) {
    self.buffer.clear();
    self.selected_suggestion = 0;
  }

  /// Highlighted suggestion wins over the literal input
  fn resolve_command(&self) -> CommandEvent {
    if let Some(cmd) = self.suggestions().get(self.selected_suggestion) {
      return CommandEvent::Submitted(cmd.action);
    }
    match commands::resolve(&self.buffer) {
      Some(action) => CommandEvent::Submitted(action),
      None => CommandEvent::Unknown(self.buffer.trim().to_string()),
    }
  }

  /// Render the command overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let suggestion_count = suggestions.len().min(MAX_SUGGESTIONS) as u16;

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + suggestion_count).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.buffer.as_str()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<15}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));

    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}
