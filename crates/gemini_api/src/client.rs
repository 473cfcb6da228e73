use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};

use crate::config::GeminiApiConfig;
use crate::error::{parse_error_message, GeminiApiError};
use crate::events::{GeminiFinishReason, GeminiStreamEvent};
use crate::headers::build_headers;
use crate::payload::GenerateContentRequest;
use crate::sse::SseStreamParser;
use crate::url::normalize_stream_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct GeminiApiClient {
    http: Client,
    config: GeminiApiConfig,
}

#[derive(Debug, Clone, Default)]
pub struct StreamResult {
    pub events: Vec<GeminiStreamEvent>,
    pub finish: Option<GeminiFinishReason>,
}

impl StreamResult {
    /// Concatenates every text delta in arrival order.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                GeminiStreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl GeminiApiClient {
    pub fn new(config: GeminiApiConfig) -> Result<Self, GeminiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GeminiApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiApiConfig {
        &self.config
    }

    pub fn endpoint_for(&self, model: &str) -> String {
        normalize_stream_url(&self.config.base_url, &self.config.api_version, model)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, GeminiApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| GeminiApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| GeminiApiError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::RequestBuilder, GeminiApiError> {
        if model.trim().is_empty() {
            return Err(GeminiApiError::MissingModel);
        }
        if !request.has_text() {
            return Err(GeminiApiError::EmptyPrompt);
        }

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        Ok(self
            .http
            .post(self.endpoint_for(model))
            .headers(headers)
            .json(request))
    }

    /// Sends one request. Non-success statuses become [`GeminiApiError::Status`].
    pub async fn send(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, GeminiApiError> {
        if is_cancelled(cancellation) {
            return Err(GeminiApiError::Cancelled);
        }

        let response = self.build_request(model, request)?.send();
        let response = await_or_cancel(response, cancellation)
            .await?
            .map_err(GeminiApiError::from)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(GeminiApiError::Status(
            status,
            parse_error_message(status, &body),
        ))
    }

    pub async fn stream_with_handler<F>(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<Option<GeminiFinishReason>, GeminiApiError>
    where
        F: FnMut(GeminiStreamEvent),
    {
        let response = self.send(model, request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = SseStreamParser::default();
        let mut finish = None;

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(GeminiApiError::Cancelled);
            }
            let chunk = chunk.map_err(GeminiApiError::from)?;
            for event in parser.feed(&chunk) {
                process_stream_event(event, &mut finish, &mut on_event)?;
            }
        }

        for event in parser.finish() {
            process_stream_event(event, &mut finish, &mut on_event)?;
        }

        if is_cancelled(cancellation) {
            return Err(GeminiApiError::Cancelled);
        }

        Ok(finish)
    }

    pub async fn stream(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, GeminiApiError> {
        let mut events = Vec::new();
        let finish = self
            .stream_with_handler(model, request, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok(StreamResult { events, finish })
    }
}

fn process_stream_event<F>(
    event: GeminiStreamEvent,
    finish: &mut Option<GeminiFinishReason>,
    on_event: &mut F,
) -> Result<(), GeminiApiError>
where
    F: FnMut(GeminiStreamEvent),
{
    if let Some(error) = stream_failure_from_event(&event) {
        return Err(error);
    }

    if let GeminiStreamEvent::Finished { reason } = &event {
        *finish = Some(*reason);
    }

    on_event(event);
    Ok(())
}

fn stream_failure_from_event(event: &GeminiStreamEvent) -> Option<GeminiApiError> {
    match event {
        GeminiStreamEvent::PromptBlocked { reason } => Some(GeminiApiError::PromptBlocked {
            reason: reason.clone(),
        }),
        GeminiStreamEvent::Error {
            code,
            status,
            message,
        } => Some(GeminiApiError::StreamFailed {
            status: status.clone(),
            message: message
                .clone()
                .or_else(|| code.map(|code| format!("error code {code}")))
                .unwrap_or_else(|| "Gemini stream reported an error".to_owned()),
        }),
        _ => None,
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, GeminiApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(GeminiApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(GeminiApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
