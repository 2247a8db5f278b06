use std::time::Duration;
use tracing::trace;

use crate::domain::{FVConfig, FVError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &FVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, FVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    self.handle_key(key, model.raw_keyevents())
                }
                Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
                _ => None,
            });
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, raw: bool) -> Option<Message> {
        // The search box gets every key unmapped
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('x'), _) => Some(Message::ClearFilter),
            (KeyCode::Char('c'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(code: KeyCode, raw: bool) -> Option<Message> {
        let controller = Controller::new(&FVConfig::default());
        controller.handle_key(KeyEvent::new(code, KeyModifiers::NONE), raw)
    }

    #[test]
    fn maps_table_keys() {
        assert_eq!(map(KeyCode::Char('q'), false), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('/'), false), Some(Message::Search));
        assert_eq!(map(KeyCode::Down, false), Some(Message::MoveDown));
        assert_eq!(map(KeyCode::Char('G'), false), Some(Message::MoveEnd));
        assert_eq!(map(KeyCode::Esc, false), Some(Message::Exit));
        assert_eq!(map(KeyCode::Char('z'), false), None);
    }

    #[test]
    fn ctrl_c_quits() {
        let controller = Controller::new(&FVConfig::default());
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(key, false), Some(Message::Quit));
    }

    #[test]
    fn search_box_receives_raw_keys() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map(KeyCode::Char('q'), true), Some(Message::RawKey(key)));
    }
}
