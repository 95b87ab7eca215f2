use std::path::PathBuf;
use nova_core::display::UNKNOWN_NAME;
use nova_core::{Confirmation, Controller, DisplayState, DisplayUpdate, DropZone, SendOutcome};
use ratatui::layout::Rect;

/// Upper bound on input box rows before it scrolls instead of growing.
pub const MAX_INPUT_LINES: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    ConfirmClear,
    /// The upload prompt doubles as the drop zone while it is open.
    Upload,
    ProfileName,
}

/// Editable text with a cursor counted in chars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    pub text: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputBuffer {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.end();
    }

    pub fn line_count(&self) -> u16 {
        self.text.split('\n').count() as u16
    }

    /// Row and column of the cursor within the (possibly multi-line) text.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let row = before.matches('\n').count();
        let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);
        (row, col)
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub popup: Popup,

    pub input: InputBuffer,
    pub prompt: InputBuffer,

    /// Mirror of everything the pipelines have rendered.
    pub display: DisplayState,
    seen_input_clears: u64,
    /// A send was handed off and the pipeline hasn't accepted it yet.
    awaiting_accept: bool,
    pub drop_zone: DropZone,

    // Transcript scrolling; follow_tail pins the view to the newest line
    pub chat_scroll: u16,
    pub chat_max_scroll: u16,
    pub chat_height: u16,
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    pub animation_frame: u8,
    pub status_line: Option<String>,
    pub base_url: String,
    pub logging_enabled: bool,

    pub controller: Controller,
}

impl App {
    pub fn new(controller: Controller, base_url: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            popup: Popup::None,
            input: InputBuffer::default(),
            prompt: InputBuffer::default(),
            display: DisplayState::default(),
            seen_input_clears: 0,
            awaiting_accept: false,
            drop_zone: DropZone::new(),
            chat_scroll: 0,
            chat_max_scroll: 0,
            chat_height: 0,
            follow_tail: true,
            chat_area: None,
            animation_frame: 0,
            status_line: None,
            base_url,
            logging_enabled: true,
            controller,
        }
    }

    pub fn apply_update(&mut self, update: DisplayUpdate) {
        self.display.apply(update);
        // The box was already emptied at hand-off; a clear from the pipeline
        // only confirms it took the message.
        if self.display.input_clears > self.seen_input_clears {
            self.seen_input_clears = self.display.input_clears;
            self.awaiting_accept = false;
        }
    }

    pub fn is_sending(&self) -> bool {
        self.awaiting_accept || self.controller.is_sending()
    }

    pub fn on_tick(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 2;
        if self.status_line.is_some() && !self.is_sending() {
            self.status_line = None;
        }
    }

    pub fn cursor_visible(&self) -> bool {
        self.animation_frame == 0
    }

    pub fn input_height(&self) -> u16 {
        self.input.line_count().clamp(1, MAX_INPUT_LINES) + 2
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
        if self.chat_scroll >= self.chat_max_scroll {
            self.follow_tail = true;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
    }

    /// Hands the input to the chat pipeline and empties the box right away,
    /// so keys typed while the task starts land in a fresh draft.
    pub fn send_input(&mut self) {
        if self.input.text.trim().is_empty() {
            return;
        }
        if self.is_sending() {
            self.status_line = Some("Still waiting for the previous reply".to_string());
            return;
        }
        self.status_line = None;
        self.scroll_to_bottom();

        let controller = self.controller.clone();
        let text = std::mem::take(&mut self.input.text);
        self.input.clear();
        self.awaiting_accept = true;
        tokio::spawn(async move {
            match controller.send_message(&text).await {
                SendOutcome::Busy => tracing::debug!("Send rejected, reply still streaming"),
                SendOutcome::Failed { error } => tracing::debug!("Send finished with error: {}", error),
                _ => {}
            }
        });
    }

    pub fn open_popup(&mut self, popup: Popup) {
        self.prompt.clear();
        match popup {
            Popup::Upload => self.drop_zone.drag_over(self.controller.sink()),
            Popup::ProfileName => {
                if let Some(memory) = &self.display.memory {
                    if memory.name != UNKNOWN_NAME {
                        self.prompt.set(&memory.name);
                    }
                }
            }
            Popup::ConfirmClear | Popup::None => {}
        }
        self.popup = popup;
    }

    /// Esc on any popup. Leaving the upload prompt is a drag-leave.
    pub fn cancel_popup(&mut self) {
        if self.popup == Popup::Upload {
            self.drop_zone.drag_leave(self.controller.sink());
        }
        self.popup = Popup::None;
        self.prompt.clear();
    }

    pub fn submit_popup(&mut self) {
        match self.popup {
            Popup::Upload => {
                let files = parse_dropped_paths(&self.prompt.text);
                self.drop(files);
            }
            Popup::ProfileName => {
                let controller = self.controller.clone();
                let name = self.prompt.text.clone();
                tokio::spawn(async move {
                    controller.set_profile_name(&name).await;
                });
            }
            Popup::ConfirmClear => return,
            Popup::None => {}
        }
        self.popup = Popup::None;
        self.prompt.clear();
    }

    pub fn resolve_clear(&mut self, confirmation: Confirmation) {
        self.popup = Popup::None;
        if confirmation == Confirmation::Confirmed {
            self.scroll_to_bottom();
        }
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.clear_history(confirmation).await;
        });
    }

    /// Pasted paths in normal mode: the terminal's version of a drag and drop.
    pub fn drop_pasted(&mut self, files: Vec<PathBuf>) {
        self.drop_zone.drag_over(self.controller.sink());
        self.drop(files);
    }

    fn drop(&mut self, files: Vec<PathBuf>) {
        if let Some(path) = self.drop_zone.drop_files(self.controller.sink(), files) {
            let controller = self.controller.clone();
            tokio::spawn(async move {
                controller.upload_file(&path).await;
            });
        }
    }

    pub fn reload_memory(&mut self) {
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.load_memory().await;
        });
    }
}

/// Paths out of a paste or a typed prompt. Terminals quote dropped files or
/// escape their spaces; some send `file://` URLs.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let unquoted = line
                .strip_prefix('\'')
                .and_then(|l| l.strip_suffix('\''))
                .or_else(|| line.strip_prefix('"').and_then(|l| l.strip_suffix('"')))
                .unwrap_or(line);
            let unquoted = unquoted.strip_prefix("file://").unwrap_or(unquoted);
            PathBuf::from(unquoted.replace("\\ ", " "))
        })
        .collect()
}
