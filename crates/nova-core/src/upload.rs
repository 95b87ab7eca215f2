//! File upload for indexing, plus the drop-zone state around it.

use crate::api::{Backend, UploadFile};
use crate::display::{DisplaySink, UploadStatus};
use crate::error::{ApiError, ApiResult};
use std::path::{Path, PathBuf};

/// Shown when the server rejects an upload without saying why.
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed";

async fn read_upload(path: &Path) -> ApiResult<UploadFile> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(UploadFile { file_name, bytes })
}

fn failure_message(error: &ApiError) -> String {
    match error {
        ApiError::Status { .. } => error
            .detail()
            .filter(|d| !d.is_empty())
            .unwrap_or(GENERIC_UPLOAD_FAILURE)
            .to_string(),
        other => other.to_string(),
    }
}

/// Sends one file for indexing and reports progress in the upload status
/// region. Returns the final status.
pub async fn upload_file(backend: &dyn Backend, sink: &dyn DisplaySink, path: &Path) -> UploadStatus {
    sink.set_upload_status(UploadStatus::InProgress);

    let result = match read_upload(path).await {
        Ok(file) => {
            tracing::info!(file = %file.file_name, bytes = file.bytes.len(), "Uploading file for indexing");
            backend.upload(file).await
        }
        Err(e) => Err(e),
    };

    let status = match result {
        Ok(message) => UploadStatus::Succeeded(message),
        Err(e) => {
            tracing::error!(path = %path.display(), "Upload failed: {}", e);
            UploadStatus::Failed(failure_message(&e))
        }
    };
    sink.set_upload_status(status.clone());
    status
}

/// Drop target with hover feedback.
///
/// Pointer events only toggle the highlight; the caller performs the upload
/// for whatever [`DropZone::drop_files`] hands back. A file picker skips the
/// zone and calls [`upload_file`] directly.
#[derive(Debug, Default)]
pub struct DropZone {
    hovered: bool,
}

impl DropZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn drag_over(&mut self, sink: &dyn DisplaySink) {
        if !self.hovered {
            self.hovered = true;
            sink.set_drop_highlight(true);
        }
    }

    pub fn drag_leave(&mut self, sink: &dyn DisplaySink) {
        self.reset(sink);
    }

    /// Ends the drag and returns the first dropped file, if any.
    pub fn drop_files(&mut self, sink: &dyn DisplaySink, files: Vec<PathBuf>) -> Option<PathBuf> {
        self.reset(sink);
        files.into_iter().next()
    }

    fn reset(&mut self, sink: &dyn DisplaySink) {
        self.hovered = false;
        sink.set_drop_highlight(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::SharedDisplay;
    use crate::testing::FakeBackend;
    use reqwest::StatusCode;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upload_success_shows_server_message() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let backend = FakeBackend::default();
        let display = SharedDisplay::new();
        let status = upload_file(&backend, &display, &path).await;

        assert_eq!(status, UploadStatus::Succeeded("Indexed successfully".to_string()));
        assert_eq!(display.snapshot().upload, status);
        let uploads = backend.calls().uploads;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "notes.pdf");
        assert_eq!(uploads[0].bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_upload_failure_uses_detail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        fs::write(&path, b"nope").unwrap();

        let backend = FakeBackend::default().with_upload_result(Err(ApiError::status(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("not a PDF".to_string()),
        )));
        let display = SharedDisplay::new();

        let status = upload_file(&backend, &display, &path).await;
        assert_eq!(status, UploadStatus::Failed("not a PDF".to_string()));
    }

    #[tokio::test]
    async fn test_upload_failure_without_detail_is_generic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        fs::write(&path, b"nope").unwrap();

        let backend = FakeBackend::default()
            .with_upload_result(Err(ApiError::status(StatusCode::BAD_REQUEST, None)));
        let display = SharedDisplay::new();

        let status = upload_file(&backend, &display, &path).await;
        assert_eq!(status, UploadStatus::Failed(GENERIC_UPLOAD_FAILURE.to_string()));
    }

    #[tokio::test]
    async fn test_upload_failure_with_blank_detail_is_generic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        fs::write(&path, b"nope").unwrap();

        let backend = FakeBackend::default().with_upload_result(Err(ApiError::status(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(String::new()),
        )));
        let display = SharedDisplay::new();

        let status = upload_file(&backend, &display, &path).await;
        assert_eq!(status, UploadStatus::Failed(GENERIC_UPLOAD_FAILURE.to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_reports_failure_without_request() {
        let dir = tempdir().unwrap();
        let backend = FakeBackend::default();
        let display = SharedDisplay::new();

        let status = upload_file(&backend, &display, &dir.path().join("gone.pdf")).await;
        assert!(matches!(status, UploadStatus::Failed(_)));
        assert!(backend.calls().uploads.is_empty());
    }

    #[test]
    fn test_drag_leave_restores_zone_without_upload() {
        let display = SharedDisplay::new();
        let mut zone = DropZone::new();

        zone.drag_over(&display);
        assert!(zone.is_hovered());
        assert!(display.snapshot().drop_highlight);

        zone.drag_leave(&display);
        assert!(!zone.is_hovered());
        let state = display.snapshot();
        assert!(!state.drop_highlight);
        assert_eq!(state.upload, UploadStatus::Idle);
    }

    #[test]
    fn test_drop_returns_first_file_and_unhighlights() {
        let display = SharedDisplay::new();
        let mut zone = DropZone::new();
        zone.drag_over(&display);

        let picked = zone.drop_files(&display, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
        assert_eq!(picked, Some(PathBuf::from("a.pdf")));
        assert!(!display.snapshot().drop_highlight);

        assert_eq!(zone.drop_files(&display, Vec::new()), None);
    }
}
