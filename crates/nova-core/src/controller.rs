//! One handle over every pipeline, sharing the session and display.

use crate::api::Backend;
use crate::chat::{ChatPipeline, SendOutcome};
use crate::display::{DisplaySink, UploadStatus};
use crate::history::{self, Confirmation};
use crate::markdown::RenderOptions;
use crate::memory;
use crate::session::SessionContext;
use crate::upload;
use std::path::Path;
use std::sync::Arc;

/// Cheap to clone; clones share the same single-slot chat pipeline.
#[derive(Clone)]
pub struct Controller {
    backend: Arc<dyn Backend>,
    sink: Arc<dyn DisplaySink>,
    session: SessionContext,
    options: RenderOptions,
    chat: Arc<ChatPipeline>,
}

impl Controller {
    pub fn new(
        backend: Arc<dyn Backend>,
        sink: Arc<dyn DisplaySink>,
        session: SessionContext,
        options: RenderOptions,
    ) -> Self {
        let chat = Arc::new(ChatPipeline::new(backend.clone(), sink.clone(), options));
        Self { backend, sink, session, options, chat }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn sink(&self) -> &dyn DisplaySink {
        &*self.sink
    }

    /// History and memory, fetched concurrently. Neither failure blocks the other.
    pub async fn startup(&self) {
        tokio::join!(self.load_history(), self.load_memory());
    }

    pub async fn load_history(&self) -> usize {
        history::load_history(&*self.backend, &*self.sink, &self.session, &self.options).await
    }

    pub async fn load_memory(&self) -> bool {
        memory::load_memory(&*self.backend, &*self.sink).await
    }

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        self.chat.send_message(&self.session, text).await
    }

    pub fn is_sending(&self) -> bool {
        self.chat.is_busy()
    }

    pub async fn upload_file(&self, path: &Path) -> UploadStatus {
        upload::upload_file(&*self.backend, &*self.sink, path).await
    }

    pub async fn clear_history(&self, confirmation: Confirmation) -> bool {
        history::clear_history(&*self.backend, &*self.sink, &self.session, confirmation).await
    }

    pub async fn set_profile_name(&self, name: &str) -> bool {
        memory::set_profile_name(&*self.backend, &*self.sink, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::SharedDisplay;
    use crate::session::{get_or_create_conversation_id, MemoryStore};
    use crate::state::ChatMessage;
    use crate::testing::FakeBackend;

    #[tokio::test]
    async fn test_startup_loads_history_and_memory() {
        let store = MemoryStore::new();
        let session = get_or_create_conversation_id(&store);
        let backend = Arc::new(FakeBackend::default().with_history(vec![ChatMessage::user("hi")]));
        let display = SharedDisplay::new();
        let controller = Controller::new(
            backend.clone(),
            Arc::new(display.clone()),
            session.clone(),
            RenderOptions::default(),
        );

        controller.startup().await;

        let calls = backend.calls();
        assert_eq!(calls.history, vec![session.thread_id().to_string()]);
        assert_eq!(calls.memory, 1);
        let state = display.snapshot();
        assert_eq!(state.transcript.len(), 1);
        assert!(state.memory.is_some());
    }

    #[tokio::test]
    async fn test_history_failure_does_not_block_memory() {
        let backend = Arc::new(FakeBackend::default().failing_history());
        let display = SharedDisplay::new();
        let controller = Controller::new(
            backend.clone(),
            Arc::new(display.clone()),
            get_or_create_conversation_id(&MemoryStore::new()),
            RenderOptions::default(),
        );

        controller.startup().await;
        assert!(display.snapshot().memory.is_some());
    }

    #[tokio::test]
    async fn test_every_call_uses_session_id() {
        let backend = Arc::new(FakeBackend::default());
        let display = SharedDisplay::new();
        let session = get_or_create_conversation_id(&MemoryStore::new());
        let controller = Controller::new(
            backend.clone(),
            Arc::new(display.clone()),
            session.clone(),
            RenderOptions::default(),
        );

        controller.send_message("hello").await;
        controller.clear_history(Confirmation::Confirmed).await;
        controller.load_history().await;

        let calls = backend.calls();
        let id = session.thread_id().to_string();
        assert_eq!(calls.chat[0].0, id);
        assert_eq!(calls.clear, vec![id.clone()]);
        assert_eq!(calls.history, vec![id]);
        assert!(!controller.is_sending());
    }
}
