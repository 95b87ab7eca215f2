//! Sending a chat turn and rendering the streamed reply.

use crate::api::Backend;
use crate::display::{BubbleContent, BubbleId, DisplaySink};
use crate::error::ApiResult;
use crate::markdown::{Markup, RenderOptions, TextTransform};
use crate::memory;
use crate::session::SessionContext;
use crate::state::ChatRole;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a [`ChatPipeline::send_message`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing rendered, nothing sent.
    Ignored,
    /// Another reply is still streaming; nothing rendered, nothing sent.
    Busy,
    Completed { reply: String },
    Failed { error: String },
}

/// Accumulated reply text for one in-flight request.
///
/// Chunks are arbitrary byte slices, so a UTF-8 sequence may be split across
/// two of them; incomplete trailing bytes are held back until the next chunk.
#[derive(Debug, Default)]
pub struct StreamState {
    accumulated: String,
    pending: Vec<u8>,
}

impl StreamState {
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.accumulated.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.accumulated.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.accumulated.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.accumulated
    }

    /// Flushes any dangling partial sequence and returns the full text.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            self.accumulated.push_str(&String::from_utf8_lossy(&self.pending));
        }
        self.accumulated
    }
}

/// Folds a byte stream into `bubble`, re-rendering the whole accumulated text
/// after every chunk. Returns the complete reply.
pub async fn render_stream<S>(
    mut stream: S,
    sink: &dyn DisplaySink,
    bubble: BubbleId,
    transform: &dyn TextTransform,
) -> ApiResult<String>
where
    S: Stream<Item = ApiResult<Bytes>> + Unpin,
{
    let mut state = StreamState::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        state.push(&chunk);
        sink.replace_bubble(
            bubble,
            BubbleContent::Body { markup: transform.render(state.text()), typing: true },
        );
    }

    let reply = state.finish();
    sink.replace_bubble(
        bubble,
        BubbleContent::Body { markup: transform.render(&reply), typing: false },
    );
    Ok(reply)
}

/// Releases the single request slot when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends user turns one at a time and streams the replies into the transcript.
pub struct ChatPipeline {
    backend: Arc<dyn Backend>,
    sink: Arc<dyn DisplaySink>,
    options: RenderOptions,
    in_flight: AtomicBool,
}

impl ChatPipeline {
    pub fn new(backend: Arc<dyn Backend>, sink: Arc<dyn DisplaySink>, options: RenderOptions) -> Self {
        Self {
            backend,
            sink,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn send_message(&self, session: &SessionContext, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        let Some(slot) = InFlight::acquire(&self.in_flight) else {
            tracing::warn!("Chat request already in flight, rejecting new message");
            return SendOutcome::Busy;
        };

        self.sink.append_bubble(ChatRole::User, Markup::plain(text), false);
        self.sink.clear_input();
        let bubble = self.sink.append_bubble(ChatRole::Assistant, Markup::default(), true);

        let result = match self.backend.open_chat(session, text).await {
            Ok(stream) => render_stream(stream, &*self.sink, bubble, self.options.streaming()).await,
            Err(e) => Err(e),
        };
        drop(slot);

        match result {
            Ok(reply) => {
                tracing::debug!(chars = reply.len(), "Chat reply complete");
                memory::load_memory(&*self.backend, &*self.sink).await;
                SendOutcome::Completed { reply }
            }
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                let message = format!("Error: {}", e);
                self.sink.replace_bubble(bubble, BubbleContent::Error(message.clone()));
                SendOutcome::Failed { error: message }
            }
        }
    }
}
