/// Default base URL for Generative Language requests.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Version segment appended when the base URL does not name one.
pub const DEFAULT_API_VERSION: &str = "v1beta";

const STREAM_METHOD: &str = "streamGenerateContent?alt=sse";

/// Build the SSE streaming endpoint for `model`.
///
/// Normalization rules:
/// 1) an empty base falls back to [`DEFAULT_GEMINI_BASE_URL`]
/// 2) a base already ending in a `/v1...` segment keeps it
/// 3) otherwise `/{api_version}` is appended
/// 4) a `models/` prefix on the model id is not duplicated
pub fn normalize_stream_url(base_url: &str, api_version: &str, model: &str) -> String {
    let base = if base_url.trim().is_empty() {
        DEFAULT_GEMINI_BASE_URL
    } else {
        base_url.trim()
    };
    let trimmed = base.trim_end_matches('/');

    let versioned = if has_version_segment(trimmed) {
        trimmed.to_string()
    } else {
        let version = api_version.trim().trim_matches('/');
        let version = if version.is_empty() {
            DEFAULT_API_VERSION
        } else {
            version
        };
        format!("{trimmed}/{version}")
    };

    let model = model.trim();
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{versioned}/models/{model}:{STREAM_METHOD}")
}

fn has_version_segment(base: &str) -> bool {
    base.rsplit('/').next().is_some_and(|segment| {
        segment
            .strip_prefix('v')
            .and_then(|rest| rest.chars().next())
            .is_some_and(|ch| ch.is_ascii_digit())
    })
}
