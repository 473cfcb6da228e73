use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum GeminiApiError {
    MissingApiKey,
    MissingModel,
    EmptyPrompt,
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    MalformedSse(String),
    Serde(JsonError),
    PromptBlocked {
        reason: String,
    },
    StreamFailed {
        status: Option<String>,
        message: String,
    },
    Cancelled,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ErrorPayloadFields {
    pub fn quota_message(&self, status: StatusCode) -> Option<String> {
        let code = self.status.as_deref().unwrap_or("");
        if !matches_quota_exhausted(code, status) {
            return None;
        }

        let detail = self
            .message
            .as_deref()
            .and_then(non_empty_string)
            .map(|message| format!(": {message}"))
            .unwrap_or_default();

        Some(format!("Gemini API quota exhausted{detail}"))
    }

    pub fn message_or_fallback(&self) -> Option<String> {
        let explicit = self.message.as_deref().and_then(non_empty_string)?;
        match self.status.as_deref().and_then(non_empty_string) {
            Some(status) => Some(format!("{explicit} ({status})")),
            None => Some(explicit.to_owned()),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = &self.value {
            let message = value.message.as_deref().unwrap_or("unknown error");
            write!(f, "{message}")
        } else {
            write!(f, "unknown error")
        }
    }
}

impl fmt::Display for GeminiApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::MissingModel => write!(f, "model id is required"),
            Self::EmptyPrompt => write!(f, "prompt must contain text"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::MalformedSse(message) => write!(f, "malformed SSE event: {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::PromptBlocked { reason } => write!(f, "prompt was blocked ({reason})"),
            Self::StreamFailed { status, message } => match status {
                Some(status) if !status.trim().is_empty() => {
                    write!(f, "stream failed ({status}): {message}")
                }
                _ => write!(f, "stream failed: {message}"),
            },
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for GeminiApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GeminiApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for GeminiApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Turns a non-success response body into a user-facing message.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => payload,
        Err(_) => return fallback_message(status, body),
    };

    if let Some(error) = parsed.value {
        if let Some(message) = error.quota_message(status) {
            return message;
        }
        if let Some(message) = error.message_or_fallback() {
            return message;
        }
    }

    fallback_message(status, body)
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().to_string()
    }
}

fn matches_quota_exhausted(code: &str, status: StatusCode) -> bool {
    matches!(status, StatusCode::TOO_MANY_REQUESTS) || code.eq_ignore_ascii_case("RESOURCE_EXHAUSTED")
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
