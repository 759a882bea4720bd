use crate::auth::SessionState;
use crate::commands::CommandAction;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::cache_status;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{BalancesView, NotificationsView, ProfileView, TicketsView};
use crate::wallet::WalletQueries;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TITLE: &str = "walletq";

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` prompt
  command_input: CommandInput,

  /// One-line message shown in the footer until the next key
  flash: Option<String>,

  config: Config,

  queries: WalletQueries,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, queries: WalletQueries) -> Self {
    let root: Box<dyn View> = Box::new(BalancesView::new(queries.clone()));
    Self {
      view_stack: vec![root],
      command_input: CommandInput::new(),
      flash: None,
      config,
      queries,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    events.watch(self.queries.cache().changes());
    events.watch(self.queries.session().changes());

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      // Session may have moved; views rebind or open their gates
      Event::Tick | Event::Changed => self.sync_views(),
      Event::Resize => {}
    }
  }

  fn sync_views(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    self.flash = None;

    match self.command_input.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(action)) => {
        self.execute(action);
        return;
      }
      KeyResult::Event(CommandEvent::Unknown(input)) => {
        self.flash = Some(format!("Unknown command: {}", input));
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    if key.code == KeyCode::Char('r') {
      self.execute(CommandAction::Refresh);
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute(&mut self, action: CommandAction) {
    debug!(?action, "command");
    let view: Box<dyn View> = match action {
      CommandAction::Balances => Box::new(BalancesView::new(self.queries.clone())),
      CommandAction::Notifications => Box::new(NotificationsView::new(self.queries.clone())),
      CommandAction::Profile => Box::new(ProfileView::new(self.queries.clone())),
      CommandAction::Tickets => Box::new(TicketsView::new(self.queries.clone())),
      CommandAction::Refresh => {
        info!("pull-to-refresh");
        self.queries.refresh_all();
        return;
      }
      CommandAction::SignOut => {
        info!("signing out");
        self.queries.session().set_credential(None);
        // Views drop their per-user keys right away, not on the next tick
        self.sync_views();
        self.flash = Some("Signed out".to_string());
        return;
      }
      CommandAction::Quit => {
        self.should_quit = true;
        return;
      }
    };

    // Commands switch the root view, like jumping to a new screen
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn flash(&self) -> Option<&str> {
    self.flash.as_deref()
  }

  pub fn title(&self) -> &str {
    self.config.title.as_deref().unwrap_or(DEFAULT_TITLE)
  }

  pub fn api_url(&self) -> &str {
    &self.config.api.url
  }

  pub fn session_state(&self) -> SessionState {
    self.queries.session().state()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.command_input.is_active() {
      return vec![
        ShortcutInfo::new("enter", "run").with_priority(10),
        ShortcutInfo::new("tab", "next").with_priority(20),
        ShortcutInfo::new("esc", "cancel").with_priority(30),
      ];
    }
    self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default()
  }

  pub fn cache_status(&self) -> String {
    let cache = self.queries.cache();
    cache_status(cache.len(), cache.fetching_count())
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::{Credential, Session};
  use crate::query::QueryCache;
  use crate::query::QueryKey;
  use crate::wallet::{Resource, WalletClient};
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn app_for(uri: &str, session: Session) -> App {
    let config = Config::parse(&format!("api:\n  url: {}\n", uri)).unwrap();
    let client = WalletClient::new(&config).unwrap();
    let cache = QueryCache::new(tokio::runtime::Handle::current());
    App::new(config, WalletQueries::new(cache, client, session))
  }

  fn render(app: &mut App) -> String {
    let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(120, 30)).unwrap();
    terminal.draw(|frame| ui::draw(frame, app)).unwrap();
    terminal.backend().buffer().content().iter().map(|cell| cell.symbol()).collect()
  }

  fn type_command(app: &mut App, command: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in command.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_commands_switch_root_view() {
    let mut app = app_for("http://127.0.0.1:9", Session::new(SessionState::SignedOut));
    assert_eq!(app.breadcrumb(), vec!["Balances".to_string()]);

    type_command(&mut app, "tickets");
    assert_eq!(app.breadcrumb(), vec!["Tickets".to_string()]);

    type_command(&mut app, "kyc");
    assert_eq!(app.breadcrumb(), vec!["Profile".to_string()]);
  }

  #[tokio::test]
  async fn test_unknown_command_flashes() {
    let mut app = app_for("http://127.0.0.1:9", Session::new(SessionState::SignedOut));
    type_command(&mut app, "zzz");
    assert_eq!(app.flash(), Some("Unknown command: zzz"));

    app.handle_key(key(KeyCode::Char('j')));
    assert_eq!(app.flash(), None);
  }

  #[tokio::test]
  async fn test_quit_at_root() {
    let mut app = app_for("http://127.0.0.1:9", Session::new(SessionState::SignedOut));
    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);

    let mut app = app_for("http://127.0.0.1:9", Session::new(SessionState::SignedOut));
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_signed_out_app_sends_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let mut app = app_for(&server.uri(), Session::new(SessionState::SignedOut));
    app.sync_views();
    app.handle_key(key(KeyCode::Char('r')));
    type_command(&mut app, "notifications");
    app.sync_views();

    // Both screens registered their keys, neither fetched
    assert_eq!(app.cache_status(), "2 queries");
  }

  #[tokio::test]
  async fn test_refresh_key_refetches_root_view() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wallet/balances"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"balances": []})),
      )
      .expect(2)
      .mount(&server)
      .await;

    let session = Session::new(SessionState::SignedIn(Credential::parse("tok").unwrap()));
    let mut app = app_for(&server.uri(), session);
    let credential = app.queries.session().credential();
    let key_balances = Resource::Balances.query_key(credential.as_ref());
    let cache = app.queries.cache().clone();
    cache.settled(&key_balances).await;

    app.handle_key(key(KeyCode::Char('r')));
    assert_eq!(cache.fetching_count(), 1);

    let entry = cache.settled(&key_balances).await.unwrap();
    assert!(entry.is_success());
  }

  #[tokio::test]
  async fn test_reload_key_refetches_only_current_view() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wallet/balances"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"balances": []})),
      )
      .expect(2)
      .mount(&server)
      .await;

    let credential = Credential::parse("tok").unwrap();
    let mut app = app_for(&server.uri(), Session::new(SessionState::SignedIn(credential.clone())));
    let key_balances = Resource::Balances.query_key(Some(&credential));
    let cache = app.queries.cache().clone();
    cache.settled(&key_balances).await;

    app.handle_key(key(KeyCode::Char('R')));
    assert_eq!(cache.fetching_count(), 1);
    assert!(cache.settled(&key_balances).await.unwrap().is_success());
  }

  #[tokio::test]
  async fn test_enter_opens_ticket_detail_from_cached_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/support/tickets"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "tickets": [
          {"id": "T-7", "subject": "Card declined", "status": "open"},
          {"id": 8, "subject": "Address change", "status": "resolved"}
        ]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let credential = Credential::parse("tok").unwrap();
    let mut app = app_for(&server.uri(), Session::new(SessionState::SignedIn(credential.clone())));
    type_command(&mut app, "tickets");
    let cache = app.queries.cache().clone();
    cache.settled(&Resource::Tickets.query_key(Some(&credential))).await;
    assert!(render(&mut app).contains("Card declined"));

    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.breadcrumb(), vec!["Tickets".to_string(), "#T-7".to_string()]);
    // The detail screen shares the list query
    assert_eq!(cache.fetching_count(), 0);
    let screen = render(&mut app);
    assert!(screen.contains("Ticket T-7"));
    assert!(screen.contains("Card declined"));

    app.handle_key(key(KeyCode::Char('q')));
    assert_eq!(app.breadcrumb(), vec!["Tickets".to_string()]);
    assert!(!app.should_quit);

    app.handle_key(key(KeyCode::Char('j')));
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.breadcrumb(), vec!["Tickets".to_string(), "#8".to_string()]);
  }

  #[tokio::test]
  async fn test_enter_on_empty_ticket_list_stays_put() {
    let mut app = app_for("http://127.0.0.1:9", Session::new(SessionState::SignedOut));
    type_command(&mut app, "tickets");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.breadcrumb(), vec!["Tickets".to_string()]);
  }

  #[tokio::test]
  async fn test_signout_command_closes_every_gate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wallet/balances"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"balances": []})),
      )
      .expect(1)
      .mount(&server)
      .await;

    let credential = Credential::parse("tok").unwrap();
    let mut app = app_for(&server.uri(), Session::new(SessionState::SignedIn(credential.clone())));
    let cache = app.queries.cache().clone();
    cache.settled(&Resource::Balances.query_key(Some(&credential))).await;

    type_command(&mut app, "logout");
    assert_eq!(app.session_state(), SessionState::SignedOut);
    assert_eq!(app.flash(), Some("Signed out"));

    // The view moved to the unscoped key and nothing fetches it
    let entry = cache.get_entry(&QueryKey::new("balances")).unwrap();
    assert!(entry.is_idle());
    app.handle_key(key(KeyCode::Char('r')));
    assert_eq!(cache.fetching_count(), 0);
  }

  #[tokio::test]
  async fn test_shortcuts_follow_command_mode() {
    let mut app = app_for("http://127.0.0.1:9", Session::new(SessionState::SignedOut));
    assert_eq!(app.title(), "walletq");
    assert!(app.shortcuts().iter().any(|s| s.key == "R"));

    app.handle_key(key(KeyCode::Char(':')));
    let keys: Vec<&str> = app.shortcuts().iter().map(|s| s.key).collect();
    assert_eq!(keys, vec!["enter", "tab", "esc"]);
  }
}
