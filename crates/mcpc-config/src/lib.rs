//! Layered TOML configuration for mcpc.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > ~/.mcpc/config.toml > defaults

use mcpc_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default chat-completions API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model to use.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// The default max tokens for a response.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// The default number of tool-call rounds allowed per user message.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
const MODEL_VAR: &str = "MCPC_MODEL";
const CONFIG_DIR_VAR: &str = "MCPC_CONFIG_DIR";

/// Resolved configuration for an mcpc run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Only ever read from the environment.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub api_base_url: String,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: usize,
    pub interpreter: Option<String>,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSettings {
    pub max_tool_rounds: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub interpreter: Option<String>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub max_tool_rounds: Option<usize>,
    pub interpreter: Option<String>,
}

impl ClientConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (~/.mcpc/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));
        Self::resolve(config_dir, settings, |var| std::env::var(var).ok(), overrides)
    }

    /// Resolve a configuration from already-read sources.
    ///
    /// `env` looks up an environment variable; empty values count as unset.
    pub fn resolve(
        config_dir: PathBuf,
        settings: SettingsFile,
        env: impl Fn(&str) -> Option<String>,
        overrides: CliOverrides,
    ) -> Result<Self, ConfigError> {
        let env = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        let api_key = env(API_KEY_VAR);

        let model = overrides
            .model
            .or_else(|| env(MODEL_VAR))
            .or(settings.api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model".into(),
                message: "must not be empty".into(),
            });
        }

        let max_tokens = overrides
            .max_tokens
            .or(settings.api.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_tokens".into(),
                message: "must be greater than zero".into(),
            });
        }

        let api_base_url = env(BASE_URL_VAR)
            .or(settings.api.base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let max_tool_rounds = overrides
            .max_tool_rounds
            .or(settings.chat.max_tool_rounds)
            .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);

        let interpreter = overrides
            .interpreter
            .or(settings.server.interpreter)
            .filter(|i| !i.trim().is_empty());

        Ok(ClientConfig {
            api_key,
            model,
            max_tokens,
            api_base_url,
            system_prompt: settings.api.system_prompt.filter(|p| !p.trim().is_empty()),
            max_tool_rounds,
            interpreter,
            config_dir,
        })
    }

    /// The API credential, or `MissingCredential` when the variable is unset.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential {
                var: API_KEY_VAR.into(),
            })
    }
}

/// Get the mcpc config directory path (~/.mcpc/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_VAR) {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcpc")
}

/// Load a TOML settings file, returning defaults if it is missing or broken.
pub fn load_settings_file(path: &Path) -> SettingsFile {
    match read_settings_file(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("{e}; using defaults");
            SettingsFile::default()
        }
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SettingsFile::default());
        }
        Err(e) => {
            return Err(ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
