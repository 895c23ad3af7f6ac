//! Input handling for the TUI

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Result of handling an input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Nothing for the app to do
    None,
    /// Enter pressed; the buffer is left alone until the app accepts it
    Submit(String),
    Quit,
    ScrollUp,
    ScrollDown,
}

/// Line editor state
///
/// `cursor` is a character index, not a byte index, so multi-byte input
/// (e.g. Chinese) edits correctly.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub buffer: String,
    pub cursor: usize,
    /// Previously sent messages, oldest first
    history: Vec<String>,
    /// Position while browsing history; `None` means editing the live buffer
    history_index: Option<usize>,
    /// Live buffer saved when history browsing starts
    saved_input: String,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn char_to_byte_index(&self, char_idx: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }

    fn insert_char(&mut self, c: char) {
        let byte_idx = self.char_to_byte_index(self.cursor);
        self.buffer.insert(byte_idx, c);
        self.cursor += 1;
    }

    fn remove_char_at(&mut self, char_idx: usize) {
        if char_idx < self.char_count() {
            let byte_idx = self.char_to_byte_index(char_idx);
            self.buffer.remove(byte_idx);
        }
    }

    fn set_buffer(&mut self, content: String) {
        self.buffer = content;
        self.cursor = self.char_count();
    }

    /// Clear the buffer after the app accepted a submission and remember it
    pub fn commit(&mut self) {
        let sent = std::mem::take(&mut self.buffer);
        if !sent.trim().is_empty() && self.history.last() != Some(&sent) {
            self.history.push(sent);
        }
        self.cursor = 0;
        self.history_index = None;
        self.saved_input.clear();
    }

    /// Handle a key event and return the action
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => InputAction::Quit,

            KeyCode::Enter => InputAction::Submit(self.buffer.clone()),

            KeyCode::Char('u') if ctrl => {
                self.buffer.clear();
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::Char('w') if ctrl => {
                self.delete_word();
                InputAction::None
            }
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::Char('e') if ctrl => {
                self.cursor = self.char_count();
                InputAction::None
            }

            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_char_at(self.cursor);
                }
                InputAction::None
            }
            KeyCode::Delete => {
                self.remove_char_at(self.cursor);
                InputAction::None
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::None
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                InputAction::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                InputAction::None
            }

            KeyCode::Up => {
                self.history_prev();
                InputAction::None
            }
            KeyCode::Down => {
                self.history_next();
                InputAction::None
            }
            KeyCode::PageUp => InputAction::ScrollUp,
            KeyCode::PageDown => InputAction::ScrollDown,

            KeyCode::Char(c) if !ctrl => {
                self.insert_char(c);
                InputAction::None
            }

            _ => InputAction::None,
        }
    }

    fn delete_word(&mut self) {
        while self.cursor > 0 && self.char_before_cursor() == Some(' ') {
            self.cursor -= 1;
            self.remove_char_at(self.cursor);
        }
        while self.cursor > 0 && self.char_before_cursor().is_some_and(|c| c != ' ') {
            self.cursor -= 1;
            self.remove_char_at(self.cursor);
        }
    }

    fn char_before_cursor(&self) -> Option<char> {
        self.cursor
            .checked_sub(1)
            .and_then(|idx| self.buffer.chars().nth(idx))
    }

    fn history_prev(&mut self) {
        let next = match self.history_index {
            None if self.history.is_empty() => return,
            None => {
                self.saved_input = self.buffer.clone();
                self.history.len() - 1
            }
            Some(0) => return,
            Some(idx) => idx - 1,
        };
        self.history_index = Some(next);
        self.set_buffer(self.history[next].clone());
    }

    fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(idx) if idx + 1 < self.history.len() => {
                self.history_index = Some(idx + 1);
                self.set_buffer(self.history[idx + 1].clone());
            }
            Some(_) => {
                self.history_index = None;
                let saved = std::mem::take(&mut self.saved_input);
                self.set_buffer(saved);
            }
        }
    }

    /// Cursor position in terminal columns
    pub fn cursor_display_width(&self) -> usize {
        self.buffer
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(state: &mut InputState, text: &str) {
        for c in text.chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_insert_unicode() {
        let mut state = InputState::new();
        type_str(&mut state, "hi\u{4f60}\u{597d}");
        assert_eq!(state.buffer, "hi\u{4f60}\u{597d}");
        assert_eq!(state.cursor, 4);
        assert_eq!(state.cursor_display_width(), 6);
    }

    #[test]
    fn test_backspace_unicode() {
        let mut state = InputState::new();
        type_str(&mut state, "\u{4f60}\u{597d}");
        state.handle_key(key(KeyCode::Backspace));
        assert_eq!(state.buffer, "\u{4f60}");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_enter_does_not_clear() {
        let mut state = InputState::new();
        type_str(&mut state, "status");
        assert_eq!(
            state.handle_key(key(KeyCode::Enter)),
            InputAction::Submit("status".to_string())
        );
        assert_eq!(state.buffer, "status");

        state.commit();
        assert!(state.buffer.is_empty());
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_history_navigation() {
        let mut state = InputState::new();
        for msg in ["first", "second"] {
            type_str(&mut state, msg);
            state.commit();
        }
        type_str(&mut state, "draft");

        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.buffer, "second");
        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.buffer, "first");
        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.buffer, "first");
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.buffer, "second");
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.buffer, "draft");
    }

    #[test]
    fn test_delete_word() {
        let mut state = InputState::new();
        type_str(&mut state, "open port 22  ");
        state.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        assert_eq!(state.buffer, "open port ");
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut state = InputState::new();
        let action = state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, InputAction::Quit);
    }
}
