//! Key bindings: arrows and vim-style cursor movement.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    /// Select the cell under the cursor, or swap with the selection.
    Activate,
    /// Throw the board away and deal a fresh one.
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Arrows and hjkl both move the cursor.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::CursorDown,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Activate,
        KeyCode::Char('r') if no_mod => Action::Restart,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::CursorLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('h'))), Action::CursorLeft);
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::CursorUp);
        assert_eq!(key_to_action(press(KeyCode::Char('k'))), Action::CursorUp);
    }

    #[test]
    fn activate_on_enter_and_space() {
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::Activate);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::Activate);
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(key), Action::Quit);
    }

    #[test]
    fn modified_movement_is_ignored() {
        let key = KeyEvent::new(KeyCode::Left, KeyModifiers::ALT);
        assert_eq!(key_to_action(key), Action::None);
    }
}
