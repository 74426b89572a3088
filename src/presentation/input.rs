use crate::application::{App, AppMode, Command};
use crate::infrastructure::{ClipboardService, SessionRepository};
use crossterm::event::{KeyCode, KeyModifiers};

pub struct InputHandler;

impl InputHandler {
    /// Applies a key press to the application state. Returns the ledger work
    /// the key asks for, if any.
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> Option<Command> {
        match app.mode {
            AppMode::Normal => return Self::handle_normal_mode(app, key, modifiers),
            AppMode::Editing => Self::handle_editing_mode(app, key),
            AppMode::WalletSelect => Self::handle_wallet_mode(app, key),
            AppMode::OpenApp => Self::handle_open_app_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
        }
        None
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> Option<Command> {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('g') => {
                    app.start_open_app();
                    return None;
                }
                KeyCode::Char('s') => {
                    let result = SessionRepository::save_session(&app.session(), &app.session_file);
                    app.set_save_result(result);
                    return None;
                }
                _ => {}
            }
        }

        match key {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => app.focus_previous(),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => app.focus_next(),
            KeyCode::Enter | KeyCode::Char(' ') => return app.activate_focused(),
            KeyCode::Char('r') => {
                app.status_message = Some(if app.request_sync() {
                    "Refreshing...".to_string()
                } else {
                    "No marketplace open".to_string()
                });
            }
            KeyCode::Char('y') => match app.clipboard_text() {
                Some(text) => {
                    let result = ClipboardService::copy(&text);
                    app.set_copy_result(result);
                }
                None => app.status_message = Some("Nothing to copy".to_string()),
            },
            KeyCode::F(1) | KeyCode::Char('?') => {
                app.mode = AppMode::Help;
                app.help_scroll = 0;
            }
            KeyCode::Esc => {
                app.status_message = None;
            }
            KeyCode::Char('q') => {
                // Will be handled by main loop
            }
            _ => {}
        }
        None
    }

    fn handle_editing_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                app.finish_editing();
            }
            KeyCode::Esc => {
                app.cancel_editing();
            }
            _ => Self::edit_input(app, key),
        }
    }

    fn handle_open_app_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.finish_open_app(),
            KeyCode::Esc => app.cancel_open_app(),
            KeyCode::Char(c) if !c.is_ascii_digit() => {}
            _ => Self::edit_input(app, key),
        }
    }

    /// Cursor movement and text changes shared by the text prompts.
    fn edit_input(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Backspace => {
                if let Some(c) = app.input[..app.cursor_position].chars().next_back() {
                    app.cursor_position -= c.len_utf8();
                    app.input.remove(app.cursor_position);
                }
            }
            KeyCode::Delete => {
                if app.cursor_position < app.input.len() {
                    app.input.remove(app.cursor_position);
                }
            }
            KeyCode::Left => {
                if let Some(c) = app.input[..app.cursor_position].chars().next_back() {
                    app.cursor_position -= c.len_utf8();
                }
            }
            KeyCode::Right => {
                if let Some(c) = app.input[app.cursor_position..].chars().next() {
                    app.cursor_position += c.len_utf8();
                }
            }
            KeyCode::Home => {
                app.cursor_position = 0;
            }
            KeyCode::End => {
                app.cursor_position = app.input.len();
            }
            KeyCode::Char(c) => {
                app.insert_char(c);
            }
            _ => {}
        }
    }

    fn handle_wallet_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                app.account_cursor = app.account_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if app.account_cursor + 1 < app.accounts.len() {
                    app.account_cursor += 1;
                }
            }
            KeyCode::Enter => app.choose_account(),
            KeyCode::Char('d') => app.disconnect(),
            KeyCode::Esc | KeyCode::Char('q') => app.cancel_wallet_select(),
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.mode = AppMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if app.help_scroll > 0 {
                    app.help_scroll -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }
}
