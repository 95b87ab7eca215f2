pub mod api;
pub mod chat;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod history;
pub mod logging;
pub mod markdown;
pub mod memory;
pub mod session;
pub mod state;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::{Backend, NovaClient};
pub use chat::SendOutcome;
pub use config::Config;
pub use controller::Controller;
pub use display::{ChannelSink, DisplaySink, DisplayState, DisplayUpdate, SharedDisplay, UploadStatus};
pub use error::ApiError;
pub use history::Confirmation;
pub use markdown::{Markup, RenderOptions, Segment, SegmentStyle};
pub use session::{get_or_create_conversation_id, FileStore, MemoryStore, SessionContext};
pub use state::{ChatMessage, ChatRole, Fact, Memory};
pub use upload::DropZone;
