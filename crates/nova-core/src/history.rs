//! Loading and clearing server-side conversation history.

use crate::api::Backend;
use crate::display::DisplaySink;
use crate::error::ApiError;
use crate::markdown::{Markup, RenderOptions};
use crate::session::SessionContext;
use crate::state::{ChatMessage, ChatRole};

/// Synthetic assistant message left in the transcript after a clear.
pub const WELCOME_AFTER_CLEAR: &str = "History cleared. Ready for a new topic!";

/// Answer to the "clear chat history?" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Renders one complete message the way loaded history is shown.
pub fn render_message(message: &ChatMessage, options: &RenderOptions) -> Markup {
    match message.role {
        ChatRole::User => Markup::plain(&message.content),
        ChatRole::Assistant => options.history().render(&message.content),
    }
}

/// Fetches prior messages for the session and appends them in order.
///
/// Returns how many messages were rendered. Failures are logged and leave
/// the transcript untouched.
pub async fn load_history(
    backend: &dyn Backend,
    sink: &dyn DisplaySink,
    session: &SessionContext,
    options: &RenderOptions,
) -> usize {
    match backend.fetch_history(session).await {
        Ok(messages) => {
            for message in &messages {
                sink.append_bubble(message.role, render_message(message, options), false);
            }
            tracing::info!(count = messages.len(), "Loaded conversation history");
            messages.len()
        }
        Err(e) => {
            tracing::error!("Failed to load history: {}", e);
            0
        }
    }
}

/// Deletes server-side history and resets the transcript to the welcome
/// message. Does nothing unless confirmed.
///
/// Returns true when the delete request reached the server.
pub async fn clear_history(
    backend: &dyn Backend,
    sink: &dyn DisplaySink,
    session: &SessionContext,
    confirmation: Confirmation,
) -> bool {
    if confirmation == Confirmation::Declined {
        return false;
    }

    match backend.clear_history(session).await {
        Ok(()) => {}
        Err(ApiError::Status { status, .. }) => {
            tracing::warn!(%status, "Clear history returned an error status");
        }
        Err(e) => {
            tracing::error!("Failed to clear history: {}", e);
            return false;
        }
    }

    sink.clear_transcript();
    sink.append_bubble(ChatRole::Assistant, Markup::plain(WELCOME_AFTER_CLEAR), false);
    true
}
