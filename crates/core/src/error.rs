use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingCredential(String),

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid chunking config: {0}")]
    InvalidChunking(String),

    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("http client could not be built: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCategory {
    TooLarge,
    RateLimited,
    Unauthorized,
    Transient,
    Other,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{backend} rejected the payload as too large: {details}")]
    TooLarge { backend: String, details: String },

    #[error("{backend} rate limit or quota exceeded: {details}")]
    RateLimited { backend: String, details: String },

    #[error("{backend} rejected the credentials: {details}")]
    Unauthorized { backend: String, details: String },

    #[error("{backend} is temporarily unavailable: {details}")]
    Transient { backend: String, details: String },

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProviderError {
    pub fn from_status(backend: &str, status: StatusCode, body: &str) -> Self {
        let backend = backend.to_string();
        let details = format!("{status} {}", body.trim());
        let lowered = body.to_lowercase();

        if status == StatusCode::PAYLOAD_TOO_LARGE || mentions_too_large(&lowered) {
            Self::TooLarge { backend, details }
        } else if status == StatusCode::TOO_MANY_REQUESTS || mentions_quota(&lowered) {
            Self::RateLimited { backend, details }
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Unauthorized { backend, details }
        } else if status.is_server_error() {
            Self::Transient { backend, details }
        } else {
            Self::BackendResponse { backend, details }
        }
    }

    pub fn category(&self) -> ProviderCategory {
        match self {
            Self::TooLarge { .. } => ProviderCategory::TooLarge,
            Self::RateLimited { .. } => ProviderCategory::RateLimited,
            Self::Unauthorized { .. } | Self::Config(_) => ProviderCategory::Unauthorized,
            Self::Transient { .. } => ProviderCategory::Transient,
            Self::Http(error) if error.is_timeout() || error.is_connect() => {
                ProviderCategory::Transient
            }
            Self::Http(error) => match error.status() {
                Some(StatusCode::TOO_MANY_REQUESTS) => ProviderCategory::RateLimited,
                Some(StatusCode::PAYLOAD_TOO_LARGE) => ProviderCategory::TooLarge,
                _ => ProviderCategory::Other,
            },
            Self::BackendResponse { .. } | Self::Serialization(_) => ProviderCategory::Other,
        }
    }
}

fn mentions_too_large(lowered: &str) -> bool {
    ["file too large", "entity too large", "payload too large"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

fn mentions_quota(lowered: &str) -> bool {
    ["rate limit", "quota", "resource_exhausted"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },

    #[error("No text could be extracted from the file.")]
    EmptyText,

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IngestError {
    pub fn user_message(&self) -> String {
        match self {
            Self::FileTooLarge { .. } => "File too large.".to_string(),
            Self::Provider(error) => provider_user_message(error),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("No question provided")]
    NoQuestion,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AnswerError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(error) => provider_user_message(error),
            other => other.to_string(),
        }
    }
}

fn provider_user_message(error: &ProviderError) -> String {
    match error.category() {
        ProviderCategory::TooLarge => "File too large.".to_string(),
        ProviderCategory::RateLimited => {
            "API rate limit exceeded. Please try again in a few minutes.".to_string()
        }
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_categories() {
        let cases = [
            (StatusCode::PAYLOAD_TOO_LARGE, "", ProviderCategory::TooLarge),
            (StatusCode::TOO_MANY_REQUESTS, "", ProviderCategory::RateLimited),
            (StatusCode::UNAUTHORIZED, "", ProviderCategory::Unauthorized),
            (StatusCode::BAD_GATEWAY, "", ProviderCategory::Transient),
            (StatusCode::BAD_REQUEST, "malformed", ProviderCategory::Other),
        ];

        for (status, body, expected) in cases {
            let error = ProviderError::from_status("gemini", status, body);
            assert_eq!(error.category(), expected, "status {status}");
        }
    }

    #[test]
    fn quota_body_is_rate_limited_regardless_of_status() {
        let error = ProviderError::from_status(
            "gemini",
            StatusCode::BAD_REQUEST,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert_eq!(error.category(), ProviderCategory::RateLimited);
    }

    #[test]
    fn ingest_errors_are_normalized_for_callers() {
        let too_large = IngestError::FileTooLarge {
            size: 30,
            limit: 20,
        };
        assert_eq!(too_large.user_message(), "File too large.");

        let limited = IngestError::Provider(ProviderError::RateLimited {
            backend: "gemini".to_string(),
            details: "429".to_string(),
        });
        assert_eq!(
            limited.user_message(),
            "API rate limit exceeded. Please try again in a few minutes."
        );

        assert_eq!(
            IngestError::EmptyText.user_message(),
            "No text could be extracted from the file."
        );
    }
}
