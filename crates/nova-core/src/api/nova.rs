use super::{Backend, ChatStream, UploadFile};
use crate::error::{ApiError, ApiResult};
use crate::session::SessionContext;
use crate::state::{ChatMessage, Memory};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    thread_id: &'a str,
}

#[derive(Serialize)]
struct ProfileRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

/// HTTP client for the Nova backend.
#[derive(Clone)]
pub struct NovaClient {
    client: Client,
    base_url: String,
}

impl NovaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turns a non-2xx response into [`ApiError::Status`], reading `detail`
/// from the body when the server sent one.
async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|e| e.detail)
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
    Err(ApiError::status(status, detail))
}

#[async_trait]
impl Backend for NovaClient {
    async fn fetch_history(&self, session: &SessionContext) -> ApiResult<Vec<ChatMessage>> {
        let response = self
            .client
            .get(self.url("/api/history"))
            .query(&[("thread_id", session.thread_id())])
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_memory(&self) -> ApiResult<Memory> {
        let response = self.client.get(self.url("/api/memory")).send().await?;
        let response = check_status(response).await?;

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn open_chat(&self, session: &SessionContext, message: &str) -> ApiResult<ChatStream> {
        let request = ChatRequest {
            message,
            thread_id: session.thread_id(),
        };

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.bytes_stream().map(|chunk| chunk.map_err(ApiError::from)).boxed())
    }

    async fn upload(&self, file: UploadFile) -> ApiResult<String> {
        let part = Part::bytes(file.bytes).file_name(file.file_name);
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.bytes().await?;
        let parsed: UploadResponse = serde_json::from_slice(&body)?;
        Ok(parsed.message.unwrap_or_default())
    }

    async fn clear_history(&self, session: &SessionContext) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url("/api/history"))
            .query(&[("thread_id", session.thread_id())])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn set_profile_name(&self, name: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("/api/profile"))
            .json(&ProfileRequest { name })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = NovaClient::new("http://localhost:8000/");
        assert_eq!(client.url("/api/memory"), "http://localhost:8000/api/memory");
    }
}
