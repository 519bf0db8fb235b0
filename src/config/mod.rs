//! Configuration management for the InboxAI client

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::dispatch::PayloadFormat;
use crate::{DEFAULT_GREETING, Error, Result};

/// Backend endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "https://inboxai-backend-tb5j.onrender.com/command";

/// Locale used for recognition and voice selection by default
pub const DEFAULT_LOCALE: &str = "en-US";

/// InboxAI client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend endpoint receiving commands
    pub endpoint: Url,

    /// Request body shape expected by the endpoint
    pub payload_format: PayloadFormat,

    /// Sender reported by the "email" body shape
    pub sender: String,

    /// Optional request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,

    /// Greeting shown when the chat opens
    pub greeting: String,

    /// Directory for persisted preferences
    pub data_dir: PathBuf,

    /// Speech configuration
    pub speech: SpeechConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Speech input/output configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speak bot replies
    pub enabled: bool,

    /// Locale tag (e.g. "en-US")
    pub locale: String,

    /// Speech recognition provider
    pub recognition: RecognitionProvider,

    /// Recognition model identifier
    pub recognition_model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locale: DEFAULT_LOCALE.to_string(),
            recognition: RecognitionProvider::None,
            recognition_model: RecognitionProvider::Whisper.default_model().to_string(),
        }
    }
}

/// Speech recognition provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionProvider {
    /// Recognition unsupported
    #[default]
    None,
    /// `OpenAI` Whisper
    Whisper,
    /// Deepgram
    Deepgram,
}

impl RecognitionProvider {
    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::None | Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

impl FromStr for RecognitionProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!(
                "unknown recognition provider: {other}"
            ))),
        }
    }
}

/// API keys for recognition providers
///
/// Keys are redacted from `Debug` output.
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key
    pub deepgram: Option<SecretString>,
}

impl Clone for ApiKeys {
    fn clone(&self) -> Self {
        let copy = |key: &SecretString| SecretString::from(key.expose_secret().to_owned());
        Self {
            openai: self.openai.as_ref().map(copy),
            deepgram: self.deepgram.as_ref().map(copy),
        }
    }
}

/// Values supplied on the command line (or their env fallbacks)
///
/// Every field beats the config file when set.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub payload_format: Option<PayloadFormat>,
    pub sender: Option<String>,
    pub disable_speech: bool,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration: defaults, then the TOML file, then overrides
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let fc = file::load_config_file();
        let mut config = Self::resolve(fc, overrides)?;

        // Keys: env > toml
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_keys.openai = Some(SecretString::from(key));
        }
        if let Ok(key) = std::env::var("DEEPGRAM_API_KEY") {
            config.api_keys.deepgram = Some(SecretString::from(key));
        }

        Ok(config)
    }

    /// Merge a parsed config file with overrides
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint, body format or recognition provider is invalid
    pub fn resolve(fc: file::InboxConfigFile, overrides: ConfigOverrides) -> Result<Self> {
        let endpoint_raw = overrides
            .endpoint
            .or(fc.backend.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = parse_endpoint(&endpoint_raw)?;

        let payload_format = match overrides.payload_format {
            Some(format) => format,
            None => fc
                .backend
                .format
                .as_deref()
                .map(PayloadFormat::from_str)
                .transpose()?
                .unwrap_or_default(),
        };

        let recognition = fc
            .speech
            .recognition
            .as_deref()
            .map(RecognitionProvider::from_str)
            .transpose()?
            .unwrap_or_default();

        let speech = SpeechConfig {
            enabled: !overrides.disable_speech && fc.speech.enabled.unwrap_or(true),
            locale: fc
                .speech
                .locale
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            recognition,
            recognition_model: fc
                .speech
                .recognition_model
                .unwrap_or_else(|| recognition.default_model().to_string()),
        };

        let data_dir = overrides
            .data_dir
            .or_else(|| fc.chat.data_dir.map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            endpoint,
            payload_format,
            sender: overrides
                .sender
                .or(fc.backend.sender)
                .unwrap_or_else(|| "InboxAI".to_string()),
            request_timeout: fc
                .backend
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            greeting: fc
                .chat
                .greeting
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            data_dir,
            speech,
            api_keys: ApiKeys {
                openai: fc.api_keys.openai.map(SecretString::from),
                deepgram: fc.api_keys.deepgram.map(SecretString::from),
            },
        })
    }

    /// Path of the preference store
    #[must_use]
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }
}

/// Validate an endpoint as an absolute http(s) URL
fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("invalid endpoint {raw:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Config(format!(
            "endpoint must use http or https, got {scheme}"
        ))),
    }
}

/// Default data directory: `~/.local/share/inboxai` (platform equivalent)
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".inboxai"),
        |d| d.data_dir().join("inboxai"),
    )
}

#[cfg(test)]
mod tests {
    use super::file::InboxConfigFile;
    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let config = Config::resolve(InboxConfigFile::default(), ConfigOverrides::default())
            .unwrap();

        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.payload_format, PayloadFormat::Command);
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.speech.locale, "en-US");
        assert!(config.speech.enabled);
        assert!(config.request_timeout.is_none());
        assert_eq!(config.speech.recognition, RecognitionProvider::None);
    }

    #[test]
    fn overrides_beat_file() {
        let fc: InboxConfigFile = toml::from_str(
            r#"
            [backend]
            endpoint = "http://file.example/command"
            format = "email"
            sender = "file@example.com"
            "#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            endpoint: Some("http://cli.example/command".to_string()),
            sender: Some("cli@example.com".to_string()),
            ..ConfigOverrides::default()
        };

        let config = Config::resolve(fc, overrides).unwrap();
        assert_eq!(config.endpoint.as_str(), "http://cli.example/command");
        assert_eq!(config.sender, "cli@example.com");
        assert_eq!(config.payload_format, PayloadFormat::Email);
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let overrides = ConfigOverrides {
            endpoint: Some("ftp://example.com/command".to_string()),
            ..ConfigOverrides::default()
        };
        let err = Config::resolve(InboxConfigFile::default(), overrides).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_relative_endpoint() {
        let overrides = ConfigOverrides {
            endpoint: Some("/command".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(Config::resolve(InboxConfigFile::default(), overrides).is_err());
    }

    #[test]
    fn disable_speech_override_wins() {
        let fc: InboxConfigFile = toml::from_str("[speech]\nenabled = true\n").unwrap();
        let overrides = ConfigOverrides {
            disable_speech: true,
            ..ConfigOverrides::default()
        };
        let config = Config::resolve(fc, overrides).unwrap();
        assert!(!config.speech.enabled);
    }

    #[test]
    fn recognition_provider_selects_model() {
        let fc: InboxConfigFile = toml::from_str(
            r#"
            [backend]
            request_timeout_secs = 30

            [speech]
            recognition = "deepgram"
            "#,
        )
        .unwrap();
        let config = Config::resolve(fc, ConfigOverrides::default()).unwrap();
        assert_eq!(config.speech.recognition, RecognitionProvider::Deepgram);
        assert_eq!(config.speech.recognition_model, "nova-2");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn api_keys_are_redacted_in_debug_output() {
        let fc: InboxConfigFile = toml::from_str(
            r#"
            [api_keys]
            openai = "sk-SECRET123"
            deepgram = "dg-SECRET456"
            "#,
        )
        .unwrap();
        let config = Config::resolve(fc, ConfigOverrides::default()).unwrap();

        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-SECRET123"));
        assert!(!printed.contains("dg-SECRET456"));

        let keys = config.api_keys.clone();
        assert_eq!(keys.openai.unwrap().expose_secret(), "sk-SECRET123");
        assert_eq!(keys.deepgram.unwrap().expose_secret(), "dg-SECRET456");
    }

    #[test]
    fn unknown_format_is_config_error() {
        let fc: InboxConfigFile = toml::from_str("[backend]\nformat = \"xml\"\n").unwrap();
        assert!(Config::resolve(fc, ConfigOverrides::default()).is_err());
    }
}
