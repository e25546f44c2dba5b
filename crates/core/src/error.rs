use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("docx archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("docx xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("directory does not exist: {0}")]
    MissingDirectory(String),

    #[error("the specified path is not a directory: {0}")]
    NotADirectory(String),

    #[error("non-docx file found: {0}")]
    UnsupportedFile(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tokenizer unavailable: {0}")]
    Tokenizer(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{backend} returned {status}: {body}")]
    BackendResponse {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected response from {backend}: {details}")]
    MalformedResponse { backend: String, details: String },

    #[error("request rejected: {0}")]
    Request(String),
}

impl ServiceError {
    pub(crate) fn malformed(backend: &str, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            backend: backend.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

pub(crate) async fn check_status(
    backend: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::BackendResponse {
        backend: backend.to_string(),
        status: status.as_u16(),
        body,
    })
}
