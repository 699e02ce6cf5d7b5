use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("unknown resource '{0}', expected one of: products, documents, downloads, nlf-templates")]
    UnknownResource(String),

    #[error("invalid filter '{0}': expected key=value")]
    InvalidFilter(String),

    #[error("invalid page metadata: {0}")]
    InvalidMeta(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    // API errors
    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl PortalError {
    /// Short message suitable for a toast notification.
    pub fn toast_message(&self) -> String {
        match self {
            PortalError::Unauthorized => "Your session has expired, please sign in again".into(),
            PortalError::Http(e) if e.is_timeout() => "The server took too long to respond".into(),
            PortalError::Http(e) if e.is_connect() => "Could not reach the server".into(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
