//! Gemini-backed implementation of the shared `style_provider` contract.
//!
//! This adapter translates `gemini_api` stream semantics into the `RunEvent`
//! lifecycle the workload logger drains on its UI thread. Text deltas are
//! forwarded as chunks while the stream is still open.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use gemini_api::{
    GeminiApiClient, GeminiApiConfig, GeminiApiError, GeminiFinishReason, GeminiStreamEvent,
    GenerateContentRequest,
};
use style_provider::{
    CancelSignal, ProviderInitError, ProviderProfile, RunEvent, StyleProvider, StyleRequest,
};

/// Stable provider identifier used by startup selection.
pub const GEMINI_PROVIDER_ID: &str = "gemini";

/// Model used when configuration names none.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectionState {
    model_index: usize,
}

/// Runtime configuration for the Gemini provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiProviderConfig {
    pub api_key: String,
    pub model_ids: Vec<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl GeminiProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model_ids: Vec<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_ids,
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_api_config(self) -> Result<GeminiApiConfig, ProviderInitError> {
        let api_key = self.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ProviderInitError::new(
                "GOOGLE_API_KEY is not set; the gemini provider needs an API key",
            ));
        }

        let mut config = GeminiApiConfig::new(api_key);

        if let Some(base_url) = self.base_url {
            let parsed = url::Url::parse(base_url.trim()).map_err(|error| {
                ProviderInitError::new(format!("Invalid Gemini base URL '{base_url}': {error}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ProviderInitError::new(format!(
                    "Invalid Gemini base URL '{base_url}': scheme must be http or https"
                )));
            }
            config = config.with_base_url(base_url.trim());
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        Ok(config)
    }
}

trait StreamClient: Send + Sync {
    fn stream(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancel: &CancelSignal,
        on_event: &mut dyn FnMut(GeminiStreamEvent),
    ) -> Result<Option<GeminiFinishReason>, GeminiApiError>;
}

#[derive(Debug)]
struct DefaultStreamClient {
    client: GeminiApiClient,
}

impl StreamClient for DefaultStreamClient {
    fn stream(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancel: &CancelSignal,
        on_event: &mut dyn FnMut(GeminiStreamEvent),
    ) -> Result<Option<GeminiFinishReason>, GeminiApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                GeminiApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(
            self.client
                .stream_with_handler(model, request, Some(cancel), on_event),
        )
    }
}

/// `StyleProvider` adapter backed by `gemini_api` transport primitives.
pub struct GeminiProvider {
    model_ids: Vec<String>,
    selection: Mutex<SelectionState>,
    stream_client: Arc<dyn StreamClient>,
}

impl GeminiProvider {
    /// Creates a provider using real Gemini API transport.
    pub fn new(config: GeminiProviderConfig) -> Result<Self, ProviderInitError> {
        let model_ids = sanitize_model_ids(config.model_ids.clone());
        let stream_client = Arc::new(DefaultStreamClient {
            client: GeminiApiClient::new(config.into_api_config()?).map_err(map_init_error)?,
        });

        Ok(Self {
            model_ids,
            selection: Mutex::new(SelectionState { model_index: 0 }),
            stream_client,
        })
    }

    fn selected_model(&self) -> String {
        let selection = lock_unpoisoned(&self.selection);
        self.model_ids[selection.model_index].clone()
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(
        model_ids: Vec<String>,
        stream_client: Arc<dyn StreamClient>,
    ) -> Self {
        Self {
            model_ids: sanitize_model_ids(model_ids),
            selection: Mutex::new(SelectionState { model_index: 0 }),
            stream_client,
        }
    }
}

impl StyleProvider for GeminiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: GEMINI_PROVIDER_ID.to_string(),
            model_id: self.selected_model(),
        }
    }

    fn cycle_model(&self) -> Result<ProviderProfile, String> {
        let mut selection = lock_unpoisoned(&self.selection);
        selection.model_index = (selection.model_index + 1) % self.model_ids.len();
        drop(selection);

        Ok(self.profile())
    }

    fn run(
        &self,
        req: StyleRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), String> {
        let run_id = req.run_id;

        emit(RunEvent::Started { run_id });

        if cancel.load(Ordering::Acquire) {
            emit(RunEvent::Cancelled { run_id });
            return Ok(());
        }

        let request = GenerateContentRequest::from_prompt(req.prompt);
        let model = self.selected_model();
        let mut received_text = false;

        let outcome = self.stream_client.stream(&model, &request, &cancel, &mut |event| {
            if let GeminiStreamEvent::TextDelta { text } = event {
                if !text.is_empty() {
                    received_text = true;
                    emit(RunEvent::Chunk { run_id, text });
                }
            }
        });

        match outcome {
            Ok(finish) => emit(terminal_event(run_id, finish, received_text)),
            Err(GeminiApiError::Cancelled) => emit(RunEvent::Cancelled { run_id }),
            Err(error) => emit(RunEvent::Failed {
                run_id,
                error: format!("Gemini API request failed: {error}"),
            }),
        }

        Ok(())
    }
}

fn terminal_event(
    run_id: u64,
    finish: Option<GeminiFinishReason>,
    received_text: bool,
) -> RunEvent {
    match finish {
        Some(reason) if !reason.is_complete() => RunEvent::Failed {
            run_id,
            error: format!(
                "Gemini API response ended with finish reason '{}'",
                reason.as_str()
            ),
        },
        _ if !received_text => RunEvent::Failed {
            run_id,
            error: "Gemini API returned no reply text".to_string(),
        },
        _ => RunEvent::Finished { run_id },
    }
}

fn sanitize_model_ids(model_ids: Vec<String>) -> Vec<String> {
    let mut sanitized: Vec<String> = model_ids
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    if sanitized.is_empty() {
        sanitized.push(DEFAULT_GEMINI_MODEL.to_string());
    }

    sanitized
}

fn map_init_error(error: GeminiApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize gemini provider: {error}"))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    enum FakeStreamOutcome {
        Success(Vec<GeminiStreamEvent>, Option<GeminiFinishReason>),
        Error(GeminiApiError),
    }

    struct FakeStreamClient {
        observed: Mutex<Option<(String, GenerateContentRequest)>>,
        outcome: Mutex<Option<FakeStreamOutcome>>,
    }

    impl FakeStreamClient {
        fn success(
            events: Vec<GeminiStreamEvent>,
            finish: Option<GeminiFinishReason>,
        ) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(FakeStreamOutcome::Success(events, finish))),
            })
        }

        fn failure(error: GeminiApiError) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(FakeStreamOutcome::Error(error))),
            })
        }

        fn observed_model(&self) -> Option<String> {
            lock_unpoisoned(&self.observed)
                .as_ref()
                .map(|(model, _)| model.clone())
        }

        fn observed_request(&self) -> Option<GenerateContentRequest> {
            lock_unpoisoned(&self.observed)
                .as_ref()
                .map(|(_, request)| request.clone())
        }
    }

    impl StreamClient for FakeStreamClient {
        fn stream(
            &self,
            model: &str,
            request: &GenerateContentRequest,
            _cancel: &CancelSignal,
            on_event: &mut dyn FnMut(GeminiStreamEvent),
        ) -> Result<Option<GeminiFinishReason>, GeminiApiError> {
            *lock_unpoisoned(&self.observed) = Some((model.to_string(), request.clone()));

            match lock_unpoisoned(&self.outcome).take() {
                Some(FakeStreamOutcome::Success(events, finish)) => {
                    for event in events {
                        on_event(event);
                    }
                    Ok(finish)
                }
                Some(FakeStreamOutcome::Error(error)) => Err(error),
                None => panic!("fake stream outcome should be consumed exactly once"),
            }
        }
    }

    fn text(value: &str) -> GeminiStreamEvent {
        GeminiStreamEvent::TextDelta {
            text: value.to_string(),
        }
    }

    fn run_events(provider: &GeminiProvider) -> Vec<RunEvent> {
        run_events_with_cancel(provider, Arc::new(AtomicBool::new(false)))
    }

    fn run_events_with_cancel(provider: &GeminiProvider, cancel: CancelSignal) -> Vec<RunEvent> {
        let mut events = Vec::new();

        provider
            .run(
                StyleRequest {
                    run_id: 9,
                    prompt: "Input Text: fixed login".to_string(),
                },
                cancel,
                &mut |event| events.push(event),
            )
            .expect("run should not return provider-level failure");

        events
    }

    #[test]
    fn profile_reports_gemini_provider_id_and_selected_model() {
        let stream = FakeStreamClient::success(Vec::new(), Some(GeminiFinishReason::Stop));
        let provider = GeminiProvider::with_stream_client_for_tests(
            vec!["gemini-2.0-flash-exp".to_string(), "gemini-1.5-pro".to_string()],
            stream,
        );

        let initial = provider.profile();
        assert_eq!(initial.provider_id, GEMINI_PROVIDER_ID);
        assert_eq!(initial.model_id, "gemini-2.0-flash-exp");

        let switched = provider
            .cycle_model()
            .expect("gemini provider should support model cycling");
        assert_eq!(switched.model_id, "gemini-1.5-pro");

        let wrapped = provider.cycle_model().expect("cycling wraps around");
        assert_eq!(wrapped.model_id, "gemini-2.0-flash-exp");
    }

    #[test]
    fn run_forwards_text_deltas_and_stop_to_finished() {
        let stream = FakeStreamClient::success(
            vec![
                text("```text\n[+] Fixed"),
                GeminiStreamEvent::Usage {
                    prompt_tokens: 10,
                    candidate_tokens: 4,
                },
                text(" login\n```"),
            ],
            Some(GeminiFinishReason::Stop),
        );
        let provider = GeminiProvider::with_stream_client_for_tests(
            vec!["gemini-2.0-flash-exp".to_string()],
            Arc::clone(&stream) as Arc<dyn StreamClient>,
        );

        let events = run_events(&provider);

        assert_eq!(
            stream.observed_model().as_deref(),
            Some("gemini-2.0-flash-exp")
        );
        assert_eq!(
            stream.observed_request(),
            Some(GenerateContentRequest::from_prompt("Input Text: fixed login"))
        );
        assert_eq!(
            events,
            vec![
                RunEvent::Started { run_id: 9 },
                RunEvent::Chunk {
                    run_id: 9,
                    text: "```text\n[+] Fixed".to_string(),
                },
                RunEvent::Chunk {
                    run_id: 9,
                    text: " login\n```".to_string(),
                },
                RunEvent::Finished { run_id: 9 },
            ]
        );
    }

    #[test]
    fn run_accepts_clean_stream_end_after_text() {
        let stream = FakeStreamClient::success(vec![text("done")], None);
        let provider = GeminiProvider::with_stream_client_for_tests(Vec::new(), stream);

        let events = run_events(&provider);

        assert!(matches!(events.last(), Some(RunEvent::Finished { run_id: 9 })));
    }

    #[test]
    fn run_fails_when_no_text_arrives() {
        let stream = FakeStreamClient::success(Vec::new(), Some(GeminiFinishReason::Stop));
        let provider = GeminiProvider::with_stream_client_for_tests(Vec::new(), stream);

        let events = run_events(&provider);

        assert!(matches!(
            events.last(),
            Some(RunEvent::Failed { run_id: 9, error }) if error.contains("no reply text")
        ));
    }

    #[test]
    fn run_maps_safety_finish_reason_to_failed_event() {
        let stream =
            FakeStreamClient::success(vec![text("partial")], Some(GeminiFinishReason::Safety));
        let provider = GeminiProvider::with_stream_client_for_tests(Vec::new(), stream);

        let events = run_events(&provider);

        assert!(matches!(
            events.last(),
            Some(RunEvent::Failed { run_id: 9, error }) if error.contains("SAFETY")
        ));
    }

    #[test]
    fn run_maps_cancelled_transport_to_cancelled_terminal_event() {
        let stream = FakeStreamClient::failure(GeminiApiError::Cancelled);
        let provider = GeminiProvider::with_stream_client_for_tests(Vec::new(), stream);

        let events = run_events(&provider);

        assert!(matches!(events.first(), Some(RunEvent::Started { run_id: 9 })));
        assert!(matches!(
            events.last(),
            Some(RunEvent::Cancelled { run_id: 9 })
        ));
    }

    #[test]
    fn run_skips_transport_when_already_cancelled() {
        let stream = FakeStreamClient::success(vec![text("unused")], None);
        let provider = GeminiProvider::with_stream_client_for_tests(
            Vec::new(),
            Arc::clone(&stream) as Arc<dyn StreamClient>,
        );

        let events = run_events_with_cancel(&provider, Arc::new(AtomicBool::new(true)));

        assert_eq!(
            events,
            vec![
                RunEvent::Started { run_id: 9 },
                RunEvent::Cancelled { run_id: 9 },
            ]
        );
        assert!(stream.observed_model().is_none());
    }

    #[test]
    fn run_maps_transport_error_to_failed_terminal_event() {
        let stream = FakeStreamClient::failure(GeminiApiError::PromptBlocked {
            reason: "SAFETY".to_string(),
        });
        let provider = GeminiProvider::with_stream_client_for_tests(Vec::new(), stream);

        let events = run_events(&provider);

        assert!(matches!(
            events.last(),
            Some(RunEvent::Failed { run_id: 9, error })
                if error == "Gemini API request failed: prompt was blocked (SAFETY)"
        ));
    }

    #[test]
    fn empty_model_list_defaults_to_flash_model() {
        let stream = FakeStreamClient::success(Vec::new(), None);
        let provider =
            GeminiProvider::with_stream_client_for_tests(vec!["  ".to_string()], stream);

        assert_eq!(provider.profile().model_id, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn new_rejects_missing_api_key() {
        let error = GeminiProvider::new(GeminiProviderConfig::new("  ", Vec::new()))
            .err()
            .expect("blank key must fail");

        assert!(error.message().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn new_rejects_malformed_base_url() {
        let error = GeminiProvider::new(
            GeminiProviderConfig::new("key", Vec::new()).with_base_url("not a url"),
        )
        .err()
        .expect("malformed base URL must fail");

        assert!(error.message().starts_with("Invalid Gemini base URL"));
    }

    #[test]
    fn new_accepts_local_base_url_and_timeout() {
        let provider = GeminiProvider::new(
            GeminiProviderConfig::new("key", vec!["m".to_string()])
                .with_base_url("http://127.0.0.1:8080")
                .with_timeout(Duration::from_secs(5)),
        )
        .expect("provider should build");

        assert_eq!(provider.profile().label(), "gemini/m");
    }
}
