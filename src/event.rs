use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal resize
  Resize,
  /// Periodic tick for query polling and redraw
  Tick,
}

/// Produces events from terminal input and a tick timer.
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(evt) = event::read() {
            let sent = match evt {
              // Windows terminals emit Release events too; only forward
              // presses
              CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                tx.send(Event::Key(key))
              }
              CrosstermEvent::Resize(_, _) => tx.send(Event::Resize),
              _ => Ok(()),
            };
            if sent.is_err() {
              break;
            }
          }
        } else if tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
