//! Environment configuration and startup settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cli::Cli;
use crate::transformer::PromptTemplate;

pub const API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";
pub const PROVIDER_ENV_VAR: &str = "WORKLOAD_LOGGER_PROVIDER";
pub const MODEL_ENV_VAR: &str = "WORKLOAD_LOGGER_MODEL";
pub const BASE_URL_ENV_VAR: &str = "WORKLOAD_LOGGER_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "WORKLOAD_LOGGER_TIMEOUT_SEC";
pub const PROMPT_TEMPLATE_ENV_VAR: &str = "WORKLOAD_LOGGER_PROMPT_TEMPLATE";
pub const TRACE_LOG_ENV_VAR: &str = "WORKLOAD_LOGGER_TRACE_LOG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WORKLOAD_LOGGER_TIMEOUT_SEC must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { value: String },
}

/// Raw values read from the process environment once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub provider: Option<String>,
    pub model_ids: Vec<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub prompt_template: Option<String>,
    pub trace_log: Option<PathBuf>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout = env_string_opt(TIMEOUT_ENV_VAR)
            .map(|value| parse_timeout(&value))
            .transpose()?;

        Ok(Self {
            api_key: env_string_opt(API_KEY_ENV_VAR),
            provider: env_string_opt(PROVIDER_ENV_VAR),
            model_ids: env_string_opt(MODEL_ENV_VAR)
                .map(|value| split_model_list(&value))
                .unwrap_or_default(),
            base_url: env_string_opt(BASE_URL_ENV_VAR),
            timeout,
            prompt_template: env_string_opt(PROMPT_TEMPLATE_ENV_VAR),
            trace_log: env_string_opt(TRACE_LOG_ENV_VAR).map(PathBuf::from),
        })
    }
}

/// Where the session should point before the first note is typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupTarget {
    Open(PathBuf),
    Create(PathBuf),
}

/// Effective settings after command-line flags are layered over the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider_id: Option<String>,
    pub model_ids: Vec<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub template: PromptTemplate,
    pub trace_log: Option<PathBuf>,
    pub startup_target: Option<StartupTarget>,
    pub note: Option<String>,
}

impl Settings {
    pub fn resolve(env: EnvConfig, cli: &Cli) -> Self {
        let provider_id = cli
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or(env.provider);

        let cli_models = cli
            .model
            .as_deref()
            .map(split_model_list)
            .unwrap_or_default();
        let model_ids = if cli_models.is_empty() {
            env.model_ids
        } else {
            cli_models
        };

        let startup_target = match (&cli.file, &cli.new_file) {
            (Some(path), _) => Some(StartupTarget::Open(path.clone())),
            (None, Some(path)) => Some(StartupTarget::Create(path.clone())),
            (None, None) => None,
        };

        Self {
            provider_id,
            model_ids,
            api_key: env.api_key.unwrap_or_default(),
            base_url: env.base_url,
            timeout: env.timeout,
            template: PromptTemplate::new(env.prompt_template),
            trace_log: env.trace_log,
            startup_target,
            note: cli.note.clone(),
        }
    }
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            value: value.to_string(),
        }),
    }
}

fn split_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    use clap::Parser;

    const ALL_KEYS: [&str; 7] = [
        API_KEY_ENV_VAR,
        PROVIDER_ENV_VAR,
        MODEL_ENV_VAR,
        BASE_URL_ENV_VAR,
        TIMEOUT_ENV_VAR,
        PROMPT_TEMPLATE_ENV_VAR,
        TRACE_LOG_ENV_VAR,
    ];

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn clear_all() -> Vec<EnvGuard> {
        ALL_KEYS
            .iter()
            .map(|key| set_env_guard(key, None))
            .collect()
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["workload-logger"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn env_defaults_are_empty() {
        let _lock = env_lock();
        let _guards = clear_all();

        let config = EnvConfig::from_env().expect("empty environment should load");
        assert_eq!(config, EnvConfig::default());
    }

    #[test]
    fn env_values_are_read() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard(API_KEY_ENV_VAR, Some("secret"));
        let _g2 = set_env_guard(PROVIDER_ENV_VAR, Some("mock"));
        let _g3 = set_env_guard(MODEL_ENV_VAR, Some("gemini-a, ,gemini-b"));
        let _g4 = set_env_guard(TIMEOUT_ENV_VAR, Some("30"));
        let _g5 = set_env_guard(TRACE_LOG_ENV_VAR, Some("/tmp/workload.trace"));

        let config = EnvConfig::from_env().expect("environment should load");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.provider.as_deref(), Some("mock"));
        assert_eq!(config.model_ids, vec!["gemini-a", "gemini-b"]);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            config.trace_log,
            Some(PathBuf::from("/tmp/workload.trace"))
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard(API_KEY_ENV_VAR, Some("   "));
        let _g2 = set_env_guard(PROMPT_TEMPLATE_ENV_VAR, Some(""));

        let config = EnvConfig::from_env().expect("environment should load");
        assert!(config.api_key.is_none());
        assert!(config.prompt_template.is_none());
    }

    #[test]
    fn zero_or_garbage_timeout_is_rejected() {
        let _lock = env_lock();
        let _guards = clear_all();

        for value in ["0", "soon", "-3"] {
            let _g = set_env_guard(TIMEOUT_ENV_VAR, Some(value));
            let error = EnvConfig::from_env().expect_err("timeout should be rejected");
            assert_eq!(
                error,
                ConfigError::InvalidTimeout {
                    value: value.to_string()
                }
            );
        }
    }

    #[test]
    fn flags_override_environment() {
        let env = EnvConfig {
            provider: Some("gemini".to_string()),
            model_ids: vec!["from-env".to_string()],
            ..EnvConfig::default()
        };

        let settings = Settings::resolve(
            env,
            &cli(&["--provider", "mock", "--model", "a,b", "--file", "work.txt"]),
        );

        assert_eq!(settings.provider_id.as_deref(), Some("mock"));
        assert_eq!(settings.model_ids, vec!["a", "b"]);
        assert_eq!(
            settings.startup_target,
            Some(StartupTarget::Open(PathBuf::from("work.txt")))
        );
        assert!(settings.note.is_none());
    }

    #[test]
    fn environment_fills_in_missing_flags() {
        let env = EnvConfig {
            api_key: Some("secret".to_string()),
            provider: Some("gemini".to_string()),
            model_ids: vec!["from-env".to_string()],
            prompt_template: Some("Rewrite: {text}".to_string()),
            ..EnvConfig::default()
        };

        let settings = Settings::resolve(env, &cli(&["--new-file", "fresh", "-n", "fixed it"]));

        assert_eq!(settings.provider_id.as_deref(), Some("gemini"));
        assert_eq!(settings.model_ids, vec!["from-env"]);
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.template.render("x"), "Rewrite: x");
        assert_eq!(
            settings.startup_target,
            Some(StartupTarget::Create(PathBuf::from("fresh")))
        );
        assert_eq!(settings.note.as_deref(), Some("fixed it"));
    }
}
