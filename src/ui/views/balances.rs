use std::collections::BTreeMap;

use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{empty_message, format_amount, format_fiat, query_title, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::wallet::types::Balance;
use crate::wallet::{BoundQuery, Resource, WalletQueries};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const AMOUNT_DECIMALS: usize = 8;

/// Asset balances with fiat values and a per-currency total
pub struct BalancesView {
  queries: WalletQueries,
  query: BoundQuery,
  list_state: ListState,
}

impl BalancesView {
  pub fn new(queries: WalletQueries) -> Self {
    let query = queries.bind(Resource::Balances);
    Self {
      queries,
      query,
      list_state: ListState::default(),
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let entry = self.query.entry();
    let balances = entry.data::<Vec<Balance>>();
    let balances = balances.as_deref().map(Vec::as_slice).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, balances.len());

    let mut block = Block::default()
      .title(query_title("Balances", &entry, Some(balances.len())))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let totals = fiat_totals(balances);
    if !totals.is_empty() {
      block = block.title_bottom(
        Line::from(format!(" Total: {} ", totals.join(" + ")))
          .right_aligned()
          .style(Style::default().fg(Color::Green)),
      );
    }

    if balances.is_empty() {
      let paragraph = Paragraph::new(empty_message(&entry, "balances"))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = balances
      .iter()
      .map(|balance| {
        let fiat = balance
          .fiat_value
          .map(|v| format_fiat(v, &balance.fiat_currency))
          .unwrap_or_else(|| "-".to_string());
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<8}", truncate(&balance.asset, 8)),
            Style::default().fg(Color::Cyan).bold(),
          ),
          Span::raw(" "),
          Span::raw(format!("{:>24}", format_amount(balance.amount, AMOUNT_DECIMALS))),
          Span::raw("  "),
          Span::styled(format!("{:>20}", fiat), Style::default().fg(Color::Green)),
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

/// Sum of fiat values per currency, formatted and sorted by currency code
fn fiat_totals(balances: &[Balance]) -> Vec<String> {
  let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
  for balance in balances {
    if let Some(value) = balance.fiat_value {
      *totals.entry(balance.fiat_currency.as_str()).or_default() += value;
    }
  }
  totals
    .into_iter()
    .map(|(currency, total)| format_fiat(total, currency))
    .collect()
}

impl View for BalancesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
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
    "Balances".to_string()
  }

  fn tick(&mut self) {
    self.queries.sync(&mut self.query);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("j/k", "navigate").with_priority(15),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("R", "reload").with_priority(25),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
