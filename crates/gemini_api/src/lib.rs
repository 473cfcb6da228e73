//! Transport-only Gemini `generateContent` client primitives.
//!
//! This crate owns request building, response streaming and SSE parsing for
//! the Generative Language API. It contains no credential loading and no UI
//! coupling.
//!
//! Requests always use the streaming endpoint (`streamGenerateContent` with
//! `alt=sse`); callers that want a single string collect the text deltas.
//! There is no retry layer: a failed request is reported once.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::GeminiApiClient;
pub use client::StreamResult;
pub use config::GeminiApiConfig;
pub use error::GeminiApiError;
pub use events::{GeminiFinishReason, GeminiStreamEvent};
pub use payload::GenerateContentRequest;
pub use sse::SseStreamParser;
pub use url::normalize_stream_url;
