use serde_json::Value;

use crate::events::{GeminiFinishReason, GeminiStreamEvent};

/// Incremental parser for SSE text streams.
///
/// Network chunks may end inside a multi-byte character; those trailing bytes
/// wait in `undecoded` until the rest of the sequence arrives.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
    undecoded: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<GeminiStreamEvent> {
        self.decode(bytes);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            if let Some(payload) = extract_data_payload(&frame) {
                if payload == "[DONE]" || payload.is_empty() {
                    continue;
                }

                if let Ok(value) = serde_json::from_str::<Value>(&payload) {
                    events.extend(map_frame(&value));
                }
            }
        }

        events
    }

    /// Drain a trailing frame that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<GeminiStreamEvent> {
        if !self.undecoded.is_empty() {
            let tail = std::mem::take(&mut self.undecoded);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        if self.is_empty_buffer() {
            self.buffer.clear();
            return Vec::new();
        }

        self.buffer.push_str("\n\n");
        self.feed(&[])
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<GeminiStreamEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.undecoded.is_empty()
    }

    /// Moves every complete UTF-8 sequence from `bytes` into the text buffer.
    ///
    /// Invalid sequences become U+FFFD; an incomplete one at the end is kept.
    fn decode(&mut self, bytes: &[u8]) {
        self.undecoded.extend_from_slice(bytes);

        loop {
            match std::str::from_utf8(&self.undecoded) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.undecoded.clear();
                    return;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.undecoded[..valid]));
                    match error.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.undecoded.drain(..valid + invalid);
                        }
                        None => {
                            self.undecoded.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

/// Maps one `GenerateContentResponse` (or error envelope) to normalized events.
pub(crate) fn map_frame(value: &Value) -> Vec<GeminiStreamEvent> {
    let mut events = Vec::new();

    if let Some(error) = value.get("error") {
        events.push(GeminiStreamEvent::Error {
            code: error.get("code").and_then(Value::as_i64),
            status: error
                .get("status")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        });
        return events;
    }

    if let Some(reason) = value
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        events.push(GeminiStreamEvent::PromptBlocked {
            reason: reason.to_string(),
        });
        return events;
    }

    let candidate = value
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first());

    if let Some(candidate) = candidate {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array);
        for part in parts.into_iter().flatten() {
            // Thought-summary parts are not reply text.
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    events.push(GeminiStreamEvent::TextDelta {
                        text: text.to_string(),
                    });
                }
            }
        }

        if let Some(reason) = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .and_then(GeminiFinishReason::parse)
        {
            events.push(GeminiStreamEvent::Finished { reason });
        }
    }

    if let Some(usage) = value.get("usageMetadata") {
        let prompt_tokens = usage
            .get("promptTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let candidate_tokens = usage
            .get("candidatesTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if prompt_tokens > 0 || candidate_tokens > 0 {
            events.push(GeminiStreamEvent::Usage {
                prompt_tokens,
                candidate_tokens,
            });
        }
    }

    events
}
