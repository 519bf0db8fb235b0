//! InboxAI - Voice and text chat client for the InboxAI assistant
//!
//! This library provides the client side of InboxAI:
//! - Input capture (typed commands and one-shot speech recognition)
//! - Request dispatch to the InboxAI backend
//! - Reply rendering into a scrolling transcript
//! - Spoken replies behind a one-time audio unlock
//! - A persisted dark/light theme preference
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Input        │──▶│ Dispatcher   │──▶│ Renderer     │──▶│ Speaker      │
//! │ field / STT  │   │ POST + JSON  │   │ reply → text │   │ cancel, play │
//! └──────────────┘   └──────────────┘   └──────┬───────┘   └──────────────┘
//!                                              ▼
//!                                        ┌──────────────┐
//!                                        │ Transcript   │
//!                                        └──────────────┘
//! ```
//!
//! Everything is owned by a [`Popup`] controller; the platform (network,
//! speech engines, preference storage) is injected through traits.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod popup;
pub mod reply;
pub mod speech;
pub mod theme;
pub mod transcript;

pub use config::{Config, ConfigOverrides};
pub use dispatch::{Backend, Completion, Dispatcher, HttpBackend, PayloadFormat, Submission};
pub use error::{Error, Result};
pub use input::{Command, InputField, Key, RecognitionEvent, SpeechRecognizer};
pub use popup::{Notice, Popup};
pub use reply::{BackendReply, NO_READABLE_RESPONSE, Summary};
pub use speech::{
    SilentSpeech, SpeechEngine, Speaker, SpeakerState, SystemSpeech, Utterance, Voice, select_voice,
};
pub use theme::{JsonFileStore, KeyValueStore, MemoryStore, Theme, ThemePreference};
pub use transcript::{Entry, Role, Ticket, Transcript};

/// Shown in place of a reply when the backend call fails
pub const BACKEND_UNAVAILABLE: &str = "Backend not responding.";

/// Default greeting shown when the chat opens
pub const DEFAULT_GREETING: &str = "Hi, this is InboxAI. How can I help you?";
