//! Scriptable in-memory backend for unit tests.

use crate::api::{Backend, ChatStream, UploadFile};
use crate::error::{ApiError, ApiResult};
use crate::session::SessionContext;
use crate::state::{ChatMessage, Memory};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// What the next `open_chat` call does.
pub enum ChatScript {
    OpenFails(ApiError),
    Chunks(Vec<ApiResult<Bytes>>),
    /// Yields `text` once `release` is notified.
    Held { text: String, release: Arc<Notify> },
}

#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub history: Vec<String>,
    pub memory: usize,
    pub chat: Vec<(String, String)>,
    pub uploads: Vec<UploadFile>,
    pub clear: Vec<String>,
    pub profile: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    history: Vec<ChatMessage>,
    history_fails: bool,
    memory: Memory,
    memory_fails: bool,
    chat: Mutex<VecDeque<ChatScript>>,
    on_chat_open: Option<Box<dyn Fn() + Send + Sync>>,
    upload_result: Mutex<Option<ApiResult<String>>>,
    clear_error: Mutex<Option<ApiError>>,
    calls: Mutex<Calls>,
}

impl FakeBackend {
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.history_fails = true;
        self
    }

    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }

    pub fn failing_memory(mut self) -> Self {
        self.memory_fails = true;
        self
    }

    /// Queues a script for the next unscripted chat call.
    pub fn with_chat(self, script: ChatScript) -> Self {
        self.chat.lock().unwrap().push_back(script);
        self
    }

    pub fn on_chat_open(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_chat_open = Some(Box::new(hook));
        self
    }

    pub fn with_upload_result(self, result: ApiResult<String>) -> Self {
        *self.upload_result.lock().unwrap() = Some(result);
        self
    }

    pub fn clear_fails_with(self, error: ApiError) -> Self {
        *self.clear_error.lock().unwrap() = Some(error);
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_history(&self, session: &SessionContext) -> ApiResult<Vec<ChatMessage>> {
        self.calls.lock().unwrap().history.push(session.thread_id().to_string());
        if self.history_fails {
            return Err(ApiError::Malformed("expected value at line 1 column 1".to_string()));
        }
        Ok(self.history.clone())
    }

    async fn fetch_memory(&self) -> ApiResult<Memory> {
        self.calls.lock().unwrap().memory += 1;
        if self.memory_fails {
            return Err(ApiError::Malformed("missing field `facts`".to_string()));
        }
        Ok(self.memory.clone())
    }

    async fn open_chat(&self, session: &SessionContext, message: &str) -> ApiResult<ChatStream> {
        self.calls
            .lock()
            .unwrap()
            .chat
            .push((session.thread_id().to_string(), message.to_string()));
        if let Some(hook) = &self.on_chat_open {
            hook();
        }

        let script = self.chat.lock().unwrap().pop_front();
        match script {
            None => Ok(stream::empty().boxed()),
            Some(ChatScript::OpenFails(e)) => Err(e),
            Some(ChatScript::Chunks(chunks)) => Ok(stream::iter(chunks).boxed()),
            Some(ChatScript::Held { text, release }) => Ok(stream::once(async move {
                release.notified().await;
                Ok(Bytes::from(text))
            })
            .boxed()),
        }
    }

    async fn upload(&self, file: UploadFile) -> ApiResult<String> {
        self.calls.lock().unwrap().uploads.push(file);
        self.upload_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("Indexed successfully".to_string()))
    }

    async fn clear_history(&self, session: &SessionContext) -> ApiResult<()> {
        self.calls.lock().unwrap().clear.push(session.thread_id().to_string());
        match self.clear_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn set_profile_name(&self, name: &str) -> ApiResult<()> {
        self.calls.lock().unwrap().profile.push(name.to_string());
        Ok(())
    }
}
