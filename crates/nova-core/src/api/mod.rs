pub mod nova;

pub use nova::NovaClient;

use crate::error::ApiResult;
use crate::session::SessionContext;
use crate::state::{ChatMessage, Memory};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

/// Body of a streamed chat reply, chunk by chunk, in arrival order.
pub type ChatStream = BoxStream<'static, ApiResult<Bytes>>;

/// A file ready to be sent for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The backend services the client depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_history(&self, session: &SessionContext) -> ApiResult<Vec<ChatMessage>>;

    async fn fetch_memory(&self) -> ApiResult<Memory>;

    /// Starts a chat turn. Resolves once response headers are in; a non-2xx
    /// status is an error here, before any chunk is read.
    async fn open_chat(&self, session: &SessionContext, message: &str) -> ApiResult<ChatStream>;

    /// Returns the server's confirmation message.
    async fn upload(&self, file: UploadFile) -> ApiResult<String>;

    async fn clear_history(&self, session: &SessionContext) -> ApiResult<()>;

    async fn set_profile_name(&self, name: &str) -> ApiResult<()>;
}
