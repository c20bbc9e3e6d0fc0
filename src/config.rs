//! Startup configuration from environment variables

use crate::db::ConversationId;
use crate::llm::DEFAULT_GEMINI_MODEL;
use crate::prompt::ResponseStyle;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Log output format on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub db_path: PathBuf,
    pub conversation_id: ConversationId,
    pub style: ResponseStyle,
    pub log_format: LogFormat,
    pub max_output_tokens: Option<u32>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = var("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let model = var("QUILL_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let db_path = var("QUILL_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".quill-chat").join("quill.db")
            },
            PathBuf::from,
        );

        let conversation_id = match var("QUILL_CONVERSATION_ID") {
            Some(raw) => ConversationId(parse("QUILL_CONVERSATION_ID", &raw)?),
            None => ConversationId::fresh(),
        };

        let style = match var("QUILL_TONE") {
            Some(raw) => parse("QUILL_TONE", &raw)?,
            None => ResponseStyle::default(),
        };

        let log_format = match var("QUILL_LOG_FORMAT").as_deref() {
            None => LogFormat::Text,
            Some(raw) if raw.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(raw) => {
                return Err(ConfigError::Invalid {
                    name: "QUILL_LOG_FORMAT",
                    value: raw.to_string(),
                })
            }
        };

        let max_output_tokens = var("QUILL_MAX_OUTPUT_TOKENS")
            .map(|raw| parse("QUILL_MAX_OUTPUT_TOKENS", &raw))
            .transpose()?;

        Ok(Self {
            api_key,
            model,
            db_path,
            conversation_id,
            style,
            log_format,
            max_output_tokens,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}
