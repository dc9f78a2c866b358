use crate::app::App;
use crate::models::{DisplayOrder, InputMode};
use crate::view::ScrollKey;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Route a key press according to the current input mode. The returned
/// order is for [`App::apply`].
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> DisplayOrder {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return DisplayOrder::Quit;
    }
    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::EditingUrl | InputMode::Query | InputMode::SaveAs => {
            handle_editing_mode(app, key);
            DisplayOrder::None
        }
        InputMode::ConfirmQuit => handle_quit_confirmation(app, key),
    }
}

/// Keys that cancel a transfer in progress.
pub fn is_abort_key(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Esc | KeyCode::Backspace)
}

fn scroll_key(code: KeyCode) -> Option<ScrollKey> {
    match code {
        KeyCode::Up => Some(ScrollKey::Up),
        KeyCode::Down => Some(ScrollKey::Down),
        KeyCode::PageUp => Some(ScrollKey::PageUp),
        KeyCode::PageDown => Some(ScrollKey::PageDown),
        KeyCode::Home => Some(ScrollKey::Home),
        KeyCode::End => Some(ScrollKey::End),
        _ => None,
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> DisplayOrder {
    if let Some(scroll) = scroll_key(key.code) {
        app.scroll(scroll);
        return DisplayOrder::None;
    }
    let on_menu = app
        .current()
        .is_some_and(|node| node.location.item_type.is_menu());

    match key.code {
        KeyCode::Backspace => return DisplayOrder::Back,
        KeyCode::F(5) => return DisplayOrder::Refresh,
        KeyCode::Esc => app.ask_quit(),
        KeyCode::Tab => app.begin_url_edit(),
        KeyCode::Char('b') => app.bookmark_current(),
        KeyCode::F(1) => app.open_manual(),
        KeyCode::F(2) => app.open_home(),

        // --- MENU ---
        KeyCode::Enter if on_menu => app.activate_selected(false),
        KeyCode::F(9) if on_menu => app.activate_selected(true),
        KeyCode::F(10) if on_menu => app.download_all(),
        KeyCode::Delete if on_menu => return app.delete_selected_bookmark(),

        // --- TEXT ---
        KeyCode::F(9) => app.save_current_as_binary(),
        _ => {}
    }
    DisplayOrder::None
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Esc | KeyCode::Tab => app.cancel_input(),

        // COPY LINE (from address bar to clipboard)
        KeyCode::Char('y')
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && app.input_mode == InputMode::EditingUrl =>
        {
            let current_input = app.editor.text.clone();
            if let Some(clipboard) = app.clipboard.as_mut() {
                if clipboard.set_text(current_input).is_ok() {
                    app.status.post("Address copied to clipboard");
                }
            }
        }
        // PASTE
        KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(text) = app.clipboard.as_mut().and_then(|c| c.get_text().ok()) {
                let sanitized = text.replace(['\n', '\r'], "");
                app.editor.insert_str(&sanitized);
            }
        }
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => {}
        KeyCode::Char(c) => app.editor.insert(c),
        KeyCode::Backspace => app.editor.backspace(),
        KeyCode::Delete => app.editor.delete(),
        KeyCode::Left => app.editor.left(),
        KeyCode::Right => app.editor.right(),
        KeyCode::Home => app.editor.home(),
        KeyCode::End => app.editor.end(),
        _ => {}
    }
}

fn handle_quit_confirmation(app: &mut App, key: KeyEvent) -> DisplayOrder {
    app.input_mode = InputMode::Normal;
    if key.code == KeyCode::Esc {
        DisplayOrder::Quit
    } else {
        DisplayOrder::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{ItemType, Location};
    use tempfile::TempDir;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            bookmarks_file: Some(dir.path().join("bookmarks")),
            ..Config::default()
        };
        App::from_config(&config).unwrap()
    }

    #[test]
    fn escape_twice_quits() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Esc)), DisplayOrder::None);
        assert_eq!(app.input_mode, InputMode::ConfirmQuit);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Esc)), DisplayOrder::Quit);
    }

    #[test]
    fn other_key_cancels_quit() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key_event(&mut app, press(KeyCode::Esc));
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('x'))), DisplayOrder::None);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn typing_a_url_opens_it() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key_event(&mut app, press(KeyCode::Tab));
        assert_eq!(app.input_mode, InputMode::EditingUrl);
        app.editor.clear();
        for c in "example.org/0/a".chars() {
            handle_key_event(&mut app, press(KeyCode::Char(c)));
        }
        handle_key_event(&mut app, press(KeyCode::Backspace));
        handle_key_event(&mut app, press(KeyCode::Char('b')));
        handle_key_event(&mut app, press(KeyCode::Enter));
        let top = &app.current().unwrap().location;
        assert!(top.is_same(&Location::gopher("example.org", 70, ItemType::TEXT, "/b")));
    }

    #[test]
    fn tab_cancels_url_edit() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key_event(&mut app, press(KeyCode::Tab));
        handle_key_event(&mut app, press(KeyCode::Tab));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.history.depth(), 1);
    }

    #[test]
    fn function_keys_navigate() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key_event(&mut app, press(KeyCode::F(1)));
        assert!(app.current().unwrap().location.is_same(&Location::manual()));
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Backspace)), DisplayOrder::Back);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::F(5))), DisplayOrder::Refresh);
    }

    #[test]
    fn f9_on_text_saves_as_binary() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open(Location::gopher("example.org", 70, ItemType::TEXT, "/notes.txt"));
        handle_key_event(&mut app, press(KeyCode::F(9)));
        let top = &app.current().unwrap().location;
        assert_eq!(top.item_type, ItemType::BINARY);
        assert_eq!(top.selector, "/notes.txt");
    }

    #[test]
    fn esc_and_backspace_abort_transfers() {
        assert!(is_abort_key(&press(KeyCode::Esc)));
        assert!(is_abort_key(&press(KeyCode::Backspace)));
        assert!(!is_abort_key(&press(KeyCode::Enter)));
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            ..press(KeyCode::Esc)
        };
        assert!(!is_abort_key(&release));
    }

    #[test]
    fn control_c_quits_from_any_mode() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key_event(&mut app, press(KeyCode::Tab));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(&mut app, ctrl_c), DisplayOrder::Quit);
    }
}
