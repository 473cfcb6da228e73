use std::sync::Arc;

use style_provider::StyleProvider;
use style_provider_gemini::{
    GeminiProvider, GeminiProviderConfig, DEFAULT_GEMINI_MODEL, GEMINI_PROVIDER_ID,
};
use style_provider_mock::{MockProvider, MOCK_PROVIDER_ID};

use crate::config::Settings;

pub const DEFAULT_PROVIDER_ID: &str = GEMINI_PROVIDER_ID;

pub fn provider_for_settings(settings: &Settings) -> Result<Arc<dyn StyleProvider>, String> {
    let provider_id = settings
        .provider_id
        .as_deref()
        .unwrap_or(DEFAULT_PROVIDER_ID);

    match provider_id {
        GEMINI_PROVIDER_ID => gemini_provider(settings),
        MOCK_PROVIDER_ID => Ok(Arc::new(MockProvider::default())),
        unknown => Err(format!(
            "Unsupported provider '{unknown}'. Available providers: {GEMINI_PROVIDER_ID}, {MOCK_PROVIDER_ID}"
        )),
    }
}

fn gemini_provider(settings: &Settings) -> Result<Arc<dyn StyleProvider>, String> {
    let model_ids = if settings.model_ids.is_empty() {
        vec![DEFAULT_GEMINI_MODEL.to_string()]
    } else {
        settings.model_ids.clone()
    };

    let mut config = GeminiProviderConfig::new(settings.api_key.clone(), model_ids);
    if let Some(base_url) = &settings.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(timeout) = settings.timeout {
        config = config.with_timeout(timeout);
    }

    let provider = GeminiProvider::new(config).map_err(|error| error.to_string())?;
    Ok(Arc::new(provider))
}
