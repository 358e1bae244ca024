//! Terminal input pump.
//!
//! crossterm's blocking poll lives on its own task; the app loop consumes a
//! single channel of key presses and ticks. A poll timeout doubles as the
//! tick, so one `tick_rate` drives both redraw cadence and query polling.

use crossterm::event::{self, Event as TermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum Event {
  Key(KeyEvent),
  Tick,
}

fn translate(evt: TermEvent) -> Option<Event> {
  match evt {
    TermEvent::Key(key) => Some(Event::Key(key)),
    // A resize only needs a redraw, which a tick already forces.
    TermEvent::Resize(_, _) => Some(Event::Tick),
    _ => None,
  }
}

pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      loop {
        let event = if event::poll(tick_rate).unwrap_or(false) {
          event::read().ok().and_then(translate)
        } else {
          Some(Event::Tick)
        };
        if let Some(event) = event {
          // A closed channel means the app loop is gone.
          if tx.send(event).is_err() {
            break;
          }
        }
      }
    });

    Self { rx }
  }

  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};

  #[test]
  fn test_translate_key_passes_through() {
    let key = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
    assert!(matches!(translate(TermEvent::Key(key)), Some(Event::Key(_))));
  }

  #[test]
  fn test_translate_resize_becomes_tick() {
    let event = translate(TermEvent::Resize(80, 24));
    assert!(matches!(event, Some(Event::Tick)));
  }

  #[test]
  fn test_translate_drops_focus_changes() {
    assert!(translate(TermEvent::FocusGained).is_none());
  }
}
