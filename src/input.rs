// Operator input: non-blocking key source backed by the terminal

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::warn;

use crate::command::Key;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Source of operator keys, polled once per tick
pub trait InputSource {
    /// Latest unconsumed key, or `None` if nothing arrived. Must not block.
    fn poll_event(&mut self) -> Result<Option<Key>, InputError>;
}

/// Map a terminal key event to an operator key. Releases map to `None`.
pub fn translate(event: &KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let key = match event.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp | KeyCode::Char('+') => Key::SpeedUp,
        KeyCode::PageDown | KeyCode::Char('-') => Key::SpeedDown,
        // Raw mode swallows SIGINT, so Ctrl+C has to quit through the loop
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Quit,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Key::Quit,
        _ => Key::Other,
    };
    Some(key)
}

/// Keyboard input from the controlling terminal
///
/// Puts the terminal into raw mode for its lifetime.
pub struct TerminalInput {
    _private: (),
}

impl TerminalInput {
    pub fn new() -> Result<Self, InputError> {
        enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl InputSource for TerminalInput {
    fn poll_event(&mut self) -> Result<Option<Key>, InputError> {
        // Drain everything pending, keep the latest key press
        let mut latest = None;
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key_event) = event::read()? {
                if let Some(key) = translate(&key_event) {
                    latest = Some(key);
                }
            }
        }
        Ok(latest)
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Writer that ends lines with CRLF
///
/// Raw mode turns off the terminal's newline translation, so log lines written
/// while a `TerminalInput` is alive would otherwise drift to the right.
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for (i, line) in buf.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.inner.write_all(b"\r\n")?;
            }
            self.inner.write_all(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrow_keys() {
        assert_eq!(translate(&press(KeyCode::Up)), Some(Key::Up));
        assert_eq!(translate(&press(KeyCode::Down)), Some(Key::Down));
        assert_eq!(translate(&press(KeyCode::Left)), Some(Key::Left));
        assert_eq!(translate(&press(KeyCode::Right)), Some(Key::Right));
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(translate(&press(KeyCode::Char('q'))), Some(Key::Quit));
        assert_eq!(translate(&press(KeyCode::Char('Q'))), Some(Key::Quit));
        assert_eq!(translate(&press(KeyCode::Esc)), Some(Key::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate(&ctrl_c), Some(Key::Quit));
        // Plain 'c' is just another key
        assert_eq!(translate(&press(KeyCode::Char('c'))), Some(Key::Other));
    }

    #[test]
    fn test_speed_keys() {
        assert_eq!(translate(&press(KeyCode::PageUp)), Some(Key::SpeedUp));
        assert_eq!(translate(&press(KeyCode::Char('+'))), Some(Key::SpeedUp));
        assert_eq!(translate(&press(KeyCode::PageDown)), Some(Key::SpeedDown));
        assert_eq!(translate(&press(KeyCode::Char('-'))), Some(Key::SpeedDown));
    }

    #[test]
    fn test_release_and_repeat() {
        let release =
            KeyEvent::new_with_kind(KeyCode::Up, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(translate(&release), None);

        let repeat =
            KeyEvent::new_with_kind(KeyCode::Up, KeyModifiers::NONE, KeyEventKind::Repeat);
        assert_eq!(translate(&repeat), Some(Key::Up));
    }

    #[test]
    fn test_unmapped_key() {
        assert_eq!(translate(&press(KeyCode::Char('x'))), Some(Key::Other));
        assert_eq!(translate(&press(KeyCode::Enter)), Some(Key::Other));
    }

    #[test]
    fn test_crlf_writer_terminates_lines() {
        let mut out = Vec::new();
        let mut writer = CrlfWriter::new(&mut out);
        writer.write_all(b"INFO first\nINFO second\n").unwrap();
        writer.write_all(b"partial").unwrap();
        assert_eq!(out, b"INFO first\r\nINFO second\r\npartial");
    }
}
