//! Deterministic mock implementation of the shared `style_provider` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and app-level integration testing.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use style_provider::{CancelSignal, ProviderProfile, RunEvent, StyleProvider, StyleRequest};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Marker the default reply echoes from; matches the trailer of the built-in prompt.
const ECHO_MARKER: &str = "Input Text:";

/// One scripted provider outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Reply text, emitted chunk by chunk before `Finished`.
    Text(Vec<String>),
    /// Emits `Failed` with the message after `Started`.
    Fail(String),
    /// Echoes the note found in the prompt wrapped in a code fence.
    Echo,
}

#[derive(Debug, Default)]
struct MockState {
    model_index: usize,
    scripted: VecDeque<MockReply>,
    prompts: Vec<String>,
}

/// Deterministic mock provider used by tests and `--provider mock` runs.
///
/// Scripted replies are consumed in order; once exhausted the fallback reply is used.
#[derive(Debug)]
pub struct MockProvider {
    model_ids: Vec<String>,
    fallback: MockReply,
    pace: Duration,
    state: Mutex<MockState>,
}

impl MockProvider {
    /// Creates a mock provider that always answers with `chunks`.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self::with_fallback(MockReply::Text(chunks))
    }

    /// Creates a mock provider that answers every run with `fallback`.
    #[must_use]
    pub fn with_fallback(fallback: MockReply) -> Self {
        Self {
            model_ids: vec!["mock".to_string(), "mock-alt".to_string()],
            fallback,
            pace: Duration::ZERO,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Creates a mock provider whose runs always fail with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_fallback(MockReply::Fail(message.into()))
    }

    /// Sets the delay applied before the first chunk and between chunks.
    #[must_use]
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Queues a reply consumed by the next run that has no earlier scripted reply.
    pub fn push_reply(&self, reply: MockReply) {
        lock_unpoisoned(&self.state).scripted.push_back(reply);
    }

    /// Returns every prompt received so far, in run order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        lock_unpoisoned(&self.state).prompts.clone()
    }

    fn next_reply(&self, prompt: &str) -> MockReply {
        let mut state = lock_unpoisoned(&self.state);
        state.prompts.push(prompt.to_string());
        state
            .scripted
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn pause(&self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::with_fallback(MockReply::Echo).with_pace(Duration::from_millis(40))
    }
}

impl StyleProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        let state = lock_unpoisoned(&self.state);
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model_ids[state.model_index].clone(),
        }
    }

    fn cycle_model(&self) -> Result<ProviderProfile, String> {
        {
            let mut state = lock_unpoisoned(&self.state);
            state.model_index = (state.model_index + 1) % self.model_ids.len();
        }
        Ok(self.profile())
    }

    fn run(
        &self,
        req: StyleRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), String> {
        let run_id = req.run_id;
        let reply = self.next_reply(&req.prompt);

        emit(RunEvent::Started { run_id });
        self.pause();

        let chunks = match reply {
            MockReply::Text(chunks) => chunks,
            MockReply::Echo => echo_chunks(&req.prompt),
            MockReply::Fail(error) => {
                emit(RunEvent::Failed { run_id, error });
                return Ok(());
            }
        };

        for chunk in chunks {
            if cancel.load(Ordering::SeqCst) {
                emit(RunEvent::Cancelled { run_id });
                return Ok(());
            }

            emit(RunEvent::Chunk { run_id, text: chunk });
            self.pause();
        }

        if cancel.load(Ordering::SeqCst) {
            emit(RunEvent::Cancelled { run_id });
        } else {
            emit(RunEvent::Finished { run_id });
        }

        Ok(())
    }
}

fn echo_chunks(prompt: &str) -> Vec<String> {
    let note = prompt
        .rfind(ECHO_MARKER)
        .map(|index| &prompt[index + ECHO_MARKER.len()..])
        .unwrap_or(prompt)
        .trim();

    vec![
        "```text\n".to_string(),
        "[+] ".to_string(),
        format!("{note}\n"),
        "```".to_string(),
    ]
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
