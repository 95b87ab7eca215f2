use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use nova_core::Confirmation;
use ratatui::layout::Rect;
use crate::app::{parse_dropped_paths, App, InputBuffer, InputMode, Popup};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.on_tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.popup != Popup::None {
        handle_popup(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('u') => app.open_popup(Popup::Upload),
        KeyCode::Char('n') => app.open_popup(Popup::ProfileName),
        KeyCode::Char('C') => app.open_popup(Popup::ConfirmClear),
        KeyCode::Char('r') => app.reload_memory(),

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_up(u16::MAX),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            app.input.insert('\n');
        }
        KeyCode::Enter => app.send_input(),
        _ => edit_buffer(&mut app.input, key),
    }
}

fn handle_popup(app: &mut App, key: KeyEvent) {
    if app.popup == Popup::ConfirmClear {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.resolve_clear(Confirmation::Confirmed),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.resolve_clear(Confirmation::Declined)
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.cancel_popup(),
        KeyCode::Enter => app.submit_popup(),
        _ => edit_buffer(&mut app.prompt, key),
    }
}

fn edit_buffer(buffer: &mut InputBuffer, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => buffer.backspace(),
        KeyCode::Delete => buffer.delete(),
        KeyCode::Left => buffer.left(),
        KeyCode::Right => buffer.right(),
        KeyCode::Home => buffer.home(),
        KeyCode::End => buffer.end(),
        KeyCode::Char(c) => buffer.insert(c),
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.popup == Popup::Upload || app.popup == Popup::ProfileName {
        // Prompts are single line
        app.prompt.insert_str(&text.replace(['\r', '\n'], " "));
        return;
    }
    if app.popup == Popup::ConfirmClear {
        return;
    }

    if app.input_mode == InputMode::Normal {
        let files = parse_dropped_paths(text);
        if !files.is_empty() && files.iter().all(|f| f.is_file()) {
            app.drop_pasted(files);
            return;
        }
        app.input_mode = InputMode::Editing;
    }
    app.input.insert_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{drain, test_app};
    use crossterm::event::{KeyEventKind, KeyEventState};
    use nova_core::UploadStatus;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_requires_editing_mode() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('j')));
        assert!(app.input.is_empty());

        handle_event(&mut app, key(KeyCode::Char('i')));
        assert_eq!(app.input_mode, InputMode::Editing);
        type_str(&mut app, "quit?");
        assert_eq!(app.input.text, "quit?");
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_alt_enter_inserts_newline() {
        let (mut app, _rx) = test_app();
        app.input_mode = InputMode::Editing;
        type_str(&mut app, "one");
        handle_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::ALT));
        type_str(&mut app, "two");
        assert_eq!(app.input.text, "one\ntwo");
        assert_eq!(app.input_height(), 4);
    }

    #[test]
    fn test_ctrl_c_quits_from_popup() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('n')));
        assert_eq!(app.popup, Popup::ProfileName);
        handle_event(&mut app, key_with(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_upload_key_highlights_and_esc_restores() {
        let (mut app, mut rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('u')));
        drain(&mut app, &mut rx);
        assert_eq!(app.popup, Popup::Upload);
        assert!(app.display.drop_highlight);

        type_str(&mut app, "/tmp/x.pdf");
        assert_eq!(app.prompt.text, "/tmp/x.pdf");

        handle_event(&mut app, key(KeyCode::Esc));
        drain(&mut app, &mut rx);
        assert!(!app.display.drop_highlight);
        assert_eq!(app.display.upload, UploadStatus::Idle);
        assert!(app.prompt.is_empty());
    }

    #[tokio::test]
    async fn test_clear_popup_decline_closes() {
        let (mut app, mut rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('C')));
        assert_eq!(app.popup, Popup::ConfirmClear);

        // Keys other than y/n keep the popup open
        handle_event(&mut app, key(KeyCode::Char('x')));
        assert_eq!(app.popup, Popup::ConfirmClear);

        handle_event(&mut app, key(KeyCode::Char('n')));
        assert_eq!(app.popup, Popup::None);
        tokio::task::yield_now().await;
        drain(&mut app, &mut rx);
        assert!(app.display.transcript.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_pasted_file_path_is_dropped_and_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("syllabus.pdf");
        std::fs::write(&file, b"%PDF-1.7").unwrap();

        let (mut app, mut rx) = test_app();
        handle_event(&mut app, AppEvent::Paste(format!("'{}'", file.display())));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.input.is_empty());
        assert!(!app.drop_zone.is_hovered());

        tokio::task::yield_now().await;
        let mut highlights = Vec::new();
        let mut statuses = Vec::new();
        while let Ok(update) = rx.try_recv() {
            match &update {
                nova_core::DisplayUpdate::DropHighlight(on) => highlights.push(*on),
                nova_core::DisplayUpdate::Upload(status) => statuses.push(status.clone()),
                _ => {}
            }
            app.apply_update(update);
        }
        assert_eq!(highlights, vec![true, false]);
        assert_eq!(statuses.first(), Some(&UploadStatus::InProgress));
        assert!(!app.display.drop_highlight);
    }

    #[test]
    fn test_paste_of_text_starts_editing() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, AppEvent::Paste("hello\r\nworld".to_string()));
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.input.text, "hello\nworld");
    }

    #[test]
    fn test_paste_into_prompt_stays_single_line() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('n')));
        handle_event(&mut app, AppEvent::Paste("Ada\nLovelace".to_string()));
        assert_eq!(app.prompt.text, "Ada Lovelace");
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_mouse_scroll_only_over_transcript() {
        let (mut app, _rx) = test_app();
        app.chat_area = Some(Rect::new(0, 1, 40, 20));
        app.chat_max_scroll = 30;
        app.chat_scroll = 30;

        let scroll = |column, row| {
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::ScrollUp,
                column,
                row,
                modifiers: KeyModifiers::NONE,
            })
        };
        handle_event(&mut app, scroll(60, 5));
        assert_eq!(app.chat_scroll, 30);
        handle_event(&mut app, scroll(5, 5));
        assert_eq!(app.chat_scroll, 27);
        assert!(!app.follow_tail);
    }
}
