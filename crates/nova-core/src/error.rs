use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the Nova backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network unreachable, DNS, connection reset, or a broken body stream.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("server returned {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    /// The body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    }
}

impl ApiError {
    pub fn status(status: StatusCode, detail: Option<String>) -> Self {
        ApiError::Status { status, detail }
    }

    /// Server-supplied detail text, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Malformed(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_with_detail() {
        let err = ApiError::status(StatusCode::INTERNAL_SERVER_ERROR, Some("disk full".to_string()));
        assert_eq!(err.to_string(), "server returned 500 Internal Server Error: disk full");
        assert_eq!(err.detail(), Some("disk full"));
    }

    #[test]
    fn test_status_display_without_detail() {
        let err = ApiError::status(StatusCode::BAD_GATEWAY, None);
        assert_eq!(err.to_string(), "server returned 502 Bad Gateway");
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_json_error_is_malformed() {
        let parse_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err: ApiError = parse_err.into();
        assert!(matches!(err, ApiError::Malformed(_)));
    }
}
