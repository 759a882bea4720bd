use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal resized
  Resize,
  /// Periodic tick for session sync
  Tick,
  /// Cache or session state changed; redraw
  Changed,
}

/// Event handler that merges terminal input, a tick timer and state changes
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm's poll blocks, keep it off the async workers
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      let event = match event::poll(tick_rate) {
        Ok(true) => match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Ok(CrosstermEvent::Resize(_, _)) => Event::Resize,
          _ => continue,
        },
        Ok(false) => Event::Tick,
        Err(_) => break,
      };
      if input_tx.send(event).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Forward every change on `changes` as [`Event::Changed`]
  pub fn watch<T: Send + Sync + 'static>(&self, mut changes: watch::Receiver<T>) {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      while changes.changed().await.is_ok() {
        if tx.send(Event::Changed).is_err() {
          break;
        }
      }
    });
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
