//! Prompt construction and reply cleanup around a [`StyleProvider`].

use std::sync::{Arc, OnceLock};

use regex::Regex;
use style_provider::{CancelSignal, RunEvent, StyleProvider, StyleRequest};

use crate::error::UpdateError;

/// Placeholder replaced by the user's note.
pub const TEMPLATE_PLACEHOLDER: &str = "{text}";

/// Label that introduces the note in every rendered prompt.
pub const INPUT_TRAILER: &str = "Input Text:";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
Translate the following text into a console-style log format that simulates git-like outputs for software project status updates. The output should maintain a tone of a command-line interface and should use similar words.

Remove any triple backticks from the output. Remove any extra white space.

Example Input:
  - Started working on the user authentication feature.
  - Implemented login functionality.
  - Testing the user login module.

Example Output:
  [+] Started work on 'user authentication'.
  [+] Implemented login functionality.
  [*] Testing user login module.

Input Text: {text}";

/// Instruction template the note is embedded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Uses `custom` when it has content, otherwise [`DEFAULT_PROMPT_TEMPLATE`].
    #[must_use]
    pub fn new(custom: Option<String>) -> Self {
        let template = custom
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

        Self { template }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Embeds `note` verbatim.
    ///
    /// A template without [`TEMPLATE_PLACEHOLDER`] gets the note appended as
    /// an `Input Text:` trailer.
    #[must_use]
    pub fn render(&self, note: &str) -> String {
        if self.template.contains(TEMPLATE_PLACEHOLDER) {
            self.template.replace(TEMPLATE_PLACEHOLDER, note)
        } else {
            format!("{}\n\n{INPUT_TRAILER} {note}", self.template)
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(None)
    }
}

fn code_fence_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"```\w*\n|```").expect("code fence regex must compile"))
}

/// Strips code fences (with any language tag) and collapses whitespace runs.
#[must_use]
pub fn normalize_reply(raw: &str) -> String {
    let without_fences = code_fence_regex().replace_all(raw, "");
    without_fences.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Runs one note through a provider on the calling thread.
///
/// The interactive console streams through the runtime worker instead; this
/// path serves single-shot invocations.
pub struct StyleTransformer {
    provider: Arc<dyn StyleProvider>,
    template: PromptTemplate,
}

impl StyleTransformer {
    #[must_use]
    pub fn new(provider: Arc<dyn StyleProvider>, template: PromptTemplate) -> Self {
        Self { provider, template }
    }

    /// Returns the cleaned reply for `note`.
    pub fn transform(&self, note: &str, cancel: CancelSignal) -> Result<String, UpdateError> {
        let request = StyleRequest {
            run_id: 0,
            prompt: self.template.render(note),
        };

        let mut reply = String::new();
        let mut terminal: Option<RunEvent> = None;
        self.provider
            .run(request, cancel, &mut |event| match event {
                RunEvent::Chunk { text, .. } if terminal.is_none() => reply.push_str(&text),
                event if event.is_terminal() && terminal.is_none() => terminal = Some(event),
                _ => {}
            })
            .map_err(UpdateError::Transform)?;

        match terminal {
            Some(RunEvent::Finished { .. }) => {
                let cleaned = normalize_reply(&reply);
                if cleaned.is_empty() {
                    Err(UpdateError::EmptyReply)
                } else {
                    Ok(cleaned)
                }
            }
            Some(RunEvent::Failed { error, .. }) => Err(UpdateError::Transform(error)),
            Some(RunEvent::Cancelled { .. }) => Err(UpdateError::Cancelled),
            _ => Err(UpdateError::Transform(
                "provider exited without terminal event".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use style_provider_mock::{MockProvider, MockReply};

    use super::*;

    #[test]
    fn normalize_reply_strips_fences_and_collapses_whitespace() {
        assert_eq!(normalize_reply("```\nfoo   bar\n```"), "foo bar");
    }

    #[test]
    fn normalize_reply_drops_language_tags_after_opening_fence() {
        assert_eq!(
            normalize_reply("```text\n[+] Fixed\tthe\n\n login bug\n```\n"),
            "[+] Fixed the login bug"
        );
    }

    #[test]
    fn normalize_reply_keeps_plain_text_untouched() {
        assert_eq!(normalize_reply("[*] Testing module"), "[*] Testing module");
        assert_eq!(normalize_reply("  ``` ```  "), "");
    }

    #[test]
    fn default_template_embeds_note_after_input_label() {
        let prompt = PromptTemplate::default().render("fixed the login bug");

        assert!(prompt.starts_with("Translate the following text"));
        assert!(prompt.ends_with("Input Text: fixed the login bug"));
        assert!(!prompt.contains(TEMPLATE_PLACEHOLDER));
    }

    #[test]
    fn custom_template_uses_placeholder_or_trailer() {
        let with_placeholder = PromptTemplate::new(Some("Rephrase <{text}> tersely".to_string()));
        assert_eq!(with_placeholder.render("note"), "Rephrase <note> tersely");

        let without_placeholder = PromptTemplate::new(Some("  Rephrase tersely. ".to_string()));
        assert_eq!(
            without_placeholder.render("note"),
            "Rephrase tersely.\n\nInput Text: note"
        );

        let blank = PromptTemplate::new(Some("   ".to_string()));
        assert_eq!(blank.as_str(), DEFAULT_PROMPT_TEMPLATE);
    }

    fn transformer(provider: MockProvider) -> (Arc<MockProvider>, StyleTransformer) {
        let provider = Arc::new(provider);
        let transformer = StyleTransformer::new(
            Arc::clone(&provider) as Arc<dyn StyleProvider>,
            PromptTemplate::default(),
        );
        (provider, transformer)
    }

    fn not_cancelled() -> CancelSignal {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn transform_sends_rendered_prompt_and_cleans_reply() {
        let (provider, transformer) = transformer(MockProvider::new(vec![
            "```text\n[+] Fixed".to_string(),
            "   login\n```".to_string(),
        ]));

        let cleaned = transformer
            .transform("fixed login", not_cancelled())
            .expect("transform should succeed");

        assert_eq!(cleaned, "[+] Fixed login");
        assert_eq!(
            provider.prompts(),
            vec![PromptTemplate::default().render("fixed login")]
        );
    }

    #[test]
    fn transform_reports_provider_failure_and_empty_reply() {
        let (_, failing) = transformer(MockProvider::failing("quota exhausted"));
        let error = failing
            .transform("note", not_cancelled())
            .expect_err("failed run should fail");
        assert!(matches!(error, UpdateError::Transform(message) if message == "quota exhausted"));

        let (_, empty) = transformer(MockProvider::with_fallback(MockReply::Text(vec![
            "```\n".to_string(),
            "```".to_string(),
        ])));
        let error = empty
            .transform("note", not_cancelled())
            .expect_err("empty reply should fail");
        assert!(matches!(error, UpdateError::EmptyReply));
    }

    #[test]
    fn transform_honours_pre_set_cancellation() {
        let (_, transformer) = transformer(MockProvider::new(vec!["text".to_string()]));

        let error = transformer
            .transform("note", Arc::new(AtomicBool::new(true)))
            .expect_err("cancelled run should fail");

        assert!(matches!(error, UpdateError::Cancelled));
    }
}
