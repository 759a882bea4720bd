pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.api_url(),
    &app.session_state(),
    &app.shortcuts(),
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }
  app.command_input().render_overlay(frame, chunks[1]);

  let status = app
    .flash()
    .map(str::to_string)
    .unwrap_or_else(|| app.cache_status());
  renderfns::draw_footer(frame, chunks[2], &app.breadcrumb(), &status);
}

/// Keep a list selection inside `0..len`, selecting the first row of a non-empty list
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
