//! One-shot speech recognition
//!
//! A recognizer turns a single recorded clip into the top transcript
//! alternative for a fixed locale. Hosted providers are reached over HTTP.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{ApiKeys, RecognitionProvider, SpeechConfig};
use crate::{Error, Result};

/// Outcome of one recognition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Top transcript alternative
    Result(String),
    /// Recognition failed
    Error(String),
}

/// Single-shot speech-to-text capability
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether recognition can run at all
    fn is_supported(&self) -> bool;

    /// Locale tag recognition runs in
    fn locale(&self) -> &str;

    /// Recognize one WAV clip
    async fn recognize(&self, audio: &[u8]) -> RecognitionEvent;
}

/// Recognizer for platforms without speech input
#[derive(Debug, Clone)]
pub struct UnsupportedRecognizer {
    locale: String,
}

impl UnsupportedRecognizer {
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    async fn recognize(&self, _audio: &[u8]) -> RecognitionEvent {
        RecognitionEvent::Error("speech recognition is not supported".to_string())
    }
}

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Hosted provider
#[derive(Clone, Copy, Debug)]
enum HttpProvider {
    Whisper,
    Deepgram,
}

/// Recognizer backed by a hosted transcription API
pub struct HttpRecognizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    locale: String,
    base_url: String,
    provider: HttpProvider,
}

impl HttpRecognizer {
    /// Create a recognizer using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String, locale: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            locale,
            base_url: "https://api.openai.com".to_string(),
            provider: HttpProvider::Whisper,
        })
    }

    /// Create a recognizer using Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: String, model: String, locale: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            locale,
            base_url: "https://api.deepgram.com".to_string(),
            provider: HttpProvider::Deepgram,
        })
    }

    /// Point the recognizer at a different API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Primary language subtag ("en" for "en-US")
    fn language(&self) -> &str {
        self.locale
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.locale)
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        match self.provider {
            HttpProvider::Whisper => self.transcribe_whisper(audio).await,
            HttpProvider::Deepgram => self.transcribe_deepgram(audio).await,
        }
    }

    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Recognition(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language().to_string());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Recognition(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await?;
        Ok(result.text)
    }

    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "{}/v1/listen?model={}&language={}&punctuate=true",
            self.base_url, self.model, self.locale
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Recognition(format!(
                "Deepgram API error {status}: {body}"
            )));
        }

        let result: DeepgramResponse = response.json().await?;

        Ok(result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SpeechRecognizer for HttpRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    async fn recognize(&self, audio: &[u8]) -> RecognitionEvent {
        match self.transcribe(audio).await {
            Ok(transcript) => {
                tracing::info!(transcript = %transcript, "transcription complete");
                RecognitionEvent::Result(transcript)
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition failed");
                RecognitionEvent::Error(e.to_string())
            }
        }
    }
}

/// Build the configured recognizer
///
/// # Errors
///
/// Returns error if a hosted provider is selected without its API key
pub fn recognizer_from_config(
    speech: &SpeechConfig,
    keys: &ApiKeys,
) -> Result<Box<dyn SpeechRecognizer>> {
    let locale = speech.locale.clone();
    let model = speech.recognition_model.clone();

    match speech.recognition {
        RecognitionProvider::None => Ok(Box::new(UnsupportedRecognizer::new(locale))),
        RecognitionProvider::Whisper => Ok(Box::new(HttpRecognizer::new_whisper(
            secret_or_empty(keys.openai.as_ref()),
            model,
            locale,
        )?)),
        RecognitionProvider::Deepgram => Ok(Box::new(HttpRecognizer::new_deepgram(
            secret_or_empty(keys.deepgram.as_ref()),
            model,
            locale,
        )?)),
    }
}

fn secret_or_empty(key: Option<&SecretString>) -> String {
    key.map(|k| k.expose_secret().to_owned()).unwrap_or_default()
}
