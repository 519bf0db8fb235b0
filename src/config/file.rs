//! TOML configuration file loading
//!
//! Supports `~/.config/inboxai/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct InboxConfigFile {
    /// Backend connection
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Speech input/output
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Chat presentation
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// API keys for recognition providers
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Backend request configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Endpoint receiving the POSTed command
    pub endpoint: Option<String>,

    /// Body shape ("command" or "email")
    pub format: Option<String>,

    /// Sender used by the "email" body shape
    pub sender: Option<String>,

    /// Request timeout; unset means wait indefinitely
    pub request_timeout_secs: Option<u64>,
}

/// Speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Speak bot replies
    pub enabled: Option<bool>,

    /// Locale tag for recognition and voice selection (e.g. "en-US")
    pub locale: Option<String>,

    /// Recognition provider ("whisper", "deepgram" or "none")
    pub recognition: Option<String>,

    /// Recognition model (e.g. "whisper-1", "nova-2")
    pub recognition_model: Option<String>,
}

/// Chat presentation configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Greeting shown when the chat opens
    pub greeting: Option<String>,

    /// Directory holding persisted preferences
    pub data_dir: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `InboxConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> InboxConfigFile {
    config_file_path().map_or_else(InboxConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or unparseable files yield defaults.
pub fn load_from(path: &Path) -> InboxConfigFile {
    if !path.exists() {
        return InboxConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                InboxConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            InboxConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/inboxai/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("inboxai").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let parsed: InboxConfigFile = toml::from_str(
            r#"
            [backend]
            endpoint = "http://localhost:8000/command"

            [speech]
            locale = "en-GB"
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.backend.endpoint.as_deref(),
            Some("http://localhost:8000/command")
        );
        assert_eq!(parsed.speech.locale.as_deref(), Some("en-GB"));
        assert!(parsed.chat.greeting.is_none());
        assert!(parsed.api_keys.openai.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_from(&dir.path().join("absent.toml"));
        assert!(loaded.backend.endpoint.is_none());
    }

    #[test]
    fn broken_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\nendpoint = ").unwrap();

        let loaded = load_from(&path);
        assert!(loaded.backend.endpoint.is_none());
    }
}
