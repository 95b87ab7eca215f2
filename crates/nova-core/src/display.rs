//! Display regions the pipelines write to.
//!
//! Pipelines never touch a UI directly. They talk to a [`DisplaySink`], which
//! exposes append/replace operations over the transcript, the memory panel
//! and the upload status, plus the input box and the drop-zone highlight.
//! [`DisplayState`] is the plain model those operations produce; front ends
//! either own one directly ([`SharedDisplay`]) or receive updates over a
//! channel ([`ChannelSink`]) and apply them on their own task.

use crate::markdown::Markup;
use crate::state::{ChatRole, Fact, Memory};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Shown in place of a missing profile name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Shown in place of an empty fact list.
pub const NO_FACTS: &str = "No facts yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub u64);

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub id: BubbleId,
    pub role: ChatRole,
    pub body: Markup,
    /// Draw the typing cursor after the body.
    pub typing: bool,
    /// When set, the bubble shows this error instead of its body.
    pub error: Option<String>,
}

/// Replacement content for an existing bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BubbleContent {
    Body { markup: Markup, typing: bool },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryView {
    pub name: String,
    pub facts: Vec<Fact>,
}

impl MemoryView {
    pub fn placeholder_facts(&self) -> Option<&'static str> {
        if self.facts.is_empty() {
            Some(NO_FACTS)
        } else {
            None
        }
    }
}

impl From<Memory> for MemoryView {
    fn from(memory: Memory) -> Self {
        let name = memory
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        Self { name, facts: memory.facts }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    InProgress,
    Succeeded(String),
    Failed(String),
}

/// Capability through which pipelines mutate the display.
pub trait DisplaySink: Send + Sync {
    fn append_bubble(&self, role: ChatRole, body: Markup, typing: bool) -> BubbleId;
    fn replace_bubble(&self, id: BubbleId, content: BubbleContent);
    fn clear_transcript(&self);
    fn set_memory(&self, view: MemoryView);
    fn set_upload_status(&self, status: UploadStatus);
    /// Empty the input box and reset its height.
    fn clear_input(&self);
    fn set_drop_highlight(&self, highlighted: bool);
}

/// A single display mutation, as carried by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayUpdate {
    Append(Bubble),
    Replace { id: BubbleId, content: BubbleContent },
    ClearTranscript,
    Memory(MemoryView),
    Upload(UploadStatus),
    ClearInput,
    DropHighlight(bool),
}

/// Everything currently on screen, minus the input text itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub transcript: Vec<Bubble>,
    pub memory: Option<MemoryView>,
    pub upload: UploadStatus,
    pub drop_highlight: bool,
    /// Bumped on every clear-input request so front ends can notice them.
    pub input_clears: u64,
}

impl DisplayState {
    pub fn apply(&mut self, update: DisplayUpdate) {
        match update {
            DisplayUpdate::Append(bubble) => self.transcript.push(bubble),
            DisplayUpdate::Replace { id, content } => {
                if let Some(bubble) = self.transcript.iter_mut().find(|b| b.id == id) {
                    match content {
                        BubbleContent::Body { markup, typing } => {
                            bubble.body = markup;
                            bubble.typing = typing;
                            bubble.error = None;
                        }
                        BubbleContent::Error(message) => {
                            bubble.typing = false;
                            bubble.error = Some(message);
                        }
                    }
                }
                // A replace for a bubble that was cleared away is dropped.
            }
            DisplayUpdate::ClearTranscript => self.transcript.clear(),
            DisplayUpdate::Memory(view) => self.memory = Some(view),
            DisplayUpdate::Upload(status) => self.upload = status,
            DisplayUpdate::ClearInput => self.input_clears += 1,
            DisplayUpdate::DropHighlight(on) => self.drop_highlight = on,
        }
    }

    pub fn bubble(&self, id: BubbleId) -> Option<&Bubble> {
        self.transcript.iter().find(|b| b.id == id)
    }

    /// True while any assistant bubble still shows the typing cursor.
    pub fn is_streaming(&self) -> bool {
        self.transcript.iter().any(|b| b.typing)
    }
}

#[derive(Debug, Default)]
struct IdAllocator(AtomicU64);

impl IdAllocator {
    fn next(&self) -> BubbleId {
        BubbleId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Sends each mutation over an unbounded channel to the UI task.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DisplayUpdate>,
    ids: Arc<IdAllocator>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, ids: Arc::new(IdAllocator::default()) }, rx)
    }

    fn send(&self, update: DisplayUpdate) {
        if self.tx.send(update).is_err() {
            tracing::debug!("Display receiver closed, dropping update");
        }
    }
}

impl DisplaySink for ChannelSink {
    fn append_bubble(&self, role: ChatRole, body: Markup, typing: bool) -> BubbleId {
        let id = self.ids.next();
        self.send(DisplayUpdate::Append(Bubble { id, role, body, typing, error: None }));
        id
    }

    fn replace_bubble(&self, id: BubbleId, content: BubbleContent) {
        self.send(DisplayUpdate::Replace { id, content });
    }

    fn clear_transcript(&self) {
        self.send(DisplayUpdate::ClearTranscript);
    }

    fn set_memory(&self, view: MemoryView) {
        self.send(DisplayUpdate::Memory(view));
    }

    fn set_upload_status(&self, status: UploadStatus) {
        self.send(DisplayUpdate::Upload(status));
    }

    fn clear_input(&self) {
        self.send(DisplayUpdate::ClearInput);
    }

    fn set_drop_highlight(&self, highlighted: bool) {
        self.send(DisplayUpdate::DropHighlight(highlighted));
    }
}

/// A [`DisplayState`] behind a mutex, updated in place.
#[derive(Clone, Default)]
pub struct SharedDisplay {
    state: Arc<Mutex<DisplayState>>,
    ids: Arc<IdAllocator>,
}

impl SharedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks and returns the current state.
    pub fn state(&self) -> MutexGuard<'_, DisplayState> {
        // A panic while holding the lock leaves the state usable; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> DisplayState {
        self.state().clone()
    }

    fn apply(&self, update: DisplayUpdate) {
        self.state().apply(update);
    }
}

impl DisplaySink for SharedDisplay {
    fn append_bubble(&self, role: ChatRole, body: Markup, typing: bool) -> BubbleId {
        let id = self.ids.next();
        self.apply(DisplayUpdate::Append(Bubble { id, role, body, typing, error: None }));
        id
    }

    fn replace_bubble(&self, id: BubbleId, content: BubbleContent) {
        self.apply(DisplayUpdate::Replace { id, content });
    }

    fn clear_transcript(&self) {
        self.apply(DisplayUpdate::ClearTranscript);
    }

    fn set_memory(&self, view: MemoryView) {
        self.apply(DisplayUpdate::Memory(view));
    }

    fn set_upload_status(&self, status: UploadStatus) {
        self.apply(DisplayUpdate::Upload(status));
    }

    fn clear_input(&self) {
        self.apply(DisplayUpdate::ClearInput);
    }

    fn set_drop_highlight(&self, highlighted: bool) {
        self.apply(DisplayUpdate::DropHighlight(highlighted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_body_then_error() {
        let display = SharedDisplay::new();
        let id = display.append_bubble(ChatRole::Assistant, Markup::default(), true);
        display.replace_bubble(id, BubbleContent::Body { markup: Markup::plain("hi"), typing: true });
        assert!(display.state().is_streaming());

        display.replace_bubble(id, BubbleContent::Error("Error: boom".to_string()));
        let state = display.snapshot();
        let bubble = state.bubble(id).unwrap();
        assert!(!bubble.typing);
        assert_eq!(bubble.error.as_deref(), Some("Error: boom"));
        assert!(!state.is_streaming());
    }

    #[test]
    fn test_replace_after_clear_is_dropped() {
        let display = SharedDisplay::new();
        let id = display.append_bubble(ChatRole::Assistant, Markup::default(), true);
        display.clear_transcript();
        display.replace_bubble(id, BubbleContent::Error("late".to_string()));
        assert!(display.state().transcript.is_empty());
    }

    #[test]
    fn test_memory_view_placeholders() {
        let view = MemoryView::from(Memory { name: None, facts: Vec::new() });
        assert_eq!(view.name, UNKNOWN_NAME);
        assert_eq!(view.placeholder_facts(), Some(NO_FACTS));

        let view = MemoryView::from(Memory {
            name: Some("Ada".to_string()),
            facts: vec![Fact::new("pet", "cat")],
        });
        assert_eq!(view.name, "Ada");
        assert_eq!(view.placeholder_facts(), None);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let a = sink.append_bubble(ChatRole::User, Markup::plain("one"), false);
        let b = sink.append_bubble(ChatRole::Assistant, Markup::default(), true);
        sink.clear_input();
        assert_ne!(a, b);

        let mut state = DisplayState::default();
        while let Ok(update) = rx.try_recv() {
            state.apply(update);
        }
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[0].id, a);
        assert_eq!(state.input_clears, 1);
        assert!(state.is_streaming());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.set_upload_status(UploadStatus::InProgress);
        sink.set_drop_highlight(true);
    }
}
