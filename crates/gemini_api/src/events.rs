/// Candidate finish reason reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiFinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    Other,
}

impl GeminiFinishReason {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "LANGUAGE" => Self::Language,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            "OTHER" => Self::Other,
            "FINISH_REASON_UNSPECIFIED" | "" => return None,
            _ => Self::Other,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::MaxTokens => "MAX_TOKENS",
            Self::Safety => "SAFETY",
            Self::Recitation => "RECITATION",
            Self::Language => "LANGUAGE",
            Self::Blocklist => "BLOCKLIST",
            Self::ProhibitedContent => "PROHIBITED_CONTENT",
            Self::Spii => "SPII",
            Self::Other => "OTHER",
        }
    }

    /// Returns true when the model stopped on its own.
    ///
    /// `MAX_TOKENS` still produced usable text, so it counts as complete.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Stop | Self::MaxTokens)
    }
}

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiStreamEvent {
    /// Text from the first candidate's parts, in arrival order.
    TextDelta { text: String },
    /// The first candidate reported a finish reason.
    Finished { reason: GeminiFinishReason },
    /// The prompt itself was rejected before generation.
    PromptBlocked { reason: String },
    /// Token accounting attached to a frame.
    Usage {
        prompt_tokens: u64,
        candidate_tokens: u64,
    },
    /// Error object delivered inside the stream.
    Error {
        code: Option<i64>,
        status: Option<String>,
        message: Option<String>,
    },
}
