//! Chat controller
//!
//! [`Popup`] owns every piece of chat state: transcript, input field,
//! speaker, theme and recognizer. Front ends feed it user events and
//! backend completions; it never performs network I/O while borrowed, so
//! new input is accepted while earlier requests are still outstanding.

use crate::dispatch::{Completion, Dispatcher, Submission};
use crate::input::{Command, InputField, Key, RecognitionEvent, SpeechRecognizer};
use crate::speech::{SpeechEngine, Speaker};
use crate::theme::{KeyValueStore, Theme, ThemePreference};
use crate::transcript::{Role, Transcript};
use crate::BACKEND_UNAVAILABLE;

/// One-time notifications the front end must show the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Speech input is not available on this platform
    RecognitionUnsupported,
}

impl Notice {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::RecognitionUnsupported => "Speech recognition is not supported here.",
        }
    }
}

/// The chat controller
pub struct Popup<E, S> {
    transcript: Transcript,
    input: InputField,
    speaker: Speaker<E>,
    theme: ThemePreference<S>,
    recognizer: Box<dyn SpeechRecognizer>,
    greeting: String,
    greeting_spoken: bool,
    notices: Vec<Notice>,
}

impl<E: SpeechEngine, S: KeyValueStore> Popup<E, S> {
    /// Open the chat: apply the stored theme and show the greeting
    pub fn open(
        engine: E,
        store: S,
        recognizer: Box<dyn SpeechRecognizer>,
        greeting: impl Into<String>,
    ) -> Self {
        let speaker = Speaker::new(engine, recognizer.locale());
        let mut notices = Vec::new();
        if !recognizer.is_supported() {
            tracing::warn!("speech recognition unsupported");
            notices.push(Notice::RecognitionUnsupported);
        }

        let mut popup = Self {
            transcript: Transcript::new(),
            input: InputField::new(),
            speaker,
            theme: ThemePreference::load(store),
            recognizer,
            greeting: greeting.into(),
            greeting_spoken: false,
            notices,
        };

        let greeting = popup.greeting.clone();
        popup.greeting_spoken = popup.add_bot(greeting);
        popup
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub const fn input(&self) -> &InputField {
        &self.input
    }

    #[must_use]
    pub const fn speaker(&self) -> &Speaker<E> {
        &self.speaker
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme.theme()
    }

    #[must_use]
    pub fn recognizer(&self) -> &dyn SpeechRecognizer {
        self.recognizer.as_ref()
    }

    /// Drain pending notices; each is returned once
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// A user click anywhere in the chat
    ///
    /// The first one unlocks speech and speaks the greeting shown at open.
    pub fn gesture(&mut self) {
        if self.speaker.unlock() && !self.greeting_spoken {
            self.greeting_spoken = self.speaker.speak(&self.greeting);
        }
    }

    /// The engine's voice list changed
    pub fn voices_changed(&mut self) {
        self.speaker.refresh_voices();
    }

    /// Flip and persist the theme
    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.theme.toggle();
        tracing::debug!(%theme, "theme toggled");
        theme
    }

    /// Key press in the text field; Enter without Shift submits
    pub fn key_press(&mut self, key: Key) -> Option<Submission> {
        let command = self.input.key_press(key)?;
        Some(self.submit(command))
    }

    /// Click on the send button
    pub fn click_send(&mut self) -> Option<Submission> {
        self.gesture();
        let command = self.input.submit()?;
        Some(self.submit(command))
    }

    /// Replace the field contents and submit them
    ///
    /// Blank text produces nothing.
    pub fn submit_text(&mut self, text: &str) -> Option<Submission> {
        self.input.set(text);
        let command = self.input.submit()?;
        Some(self.submit(command))
    }

    /// Handle a speech recognition event
    ///
    /// The transcript is shown in the text field before it is submitted.
    pub fn speech_event(&mut self, event: RecognitionEvent) -> Option<Submission> {
        match event {
            RecognitionEvent::Result(transcript) => self.submit_text(&transcript),
            RecognitionEvent::Error(error) => {
                tracing::warn!(%error, "speech recognition error");
                None
            }
        }
    }

    /// Run the recognizer on one clip and handle its result
    pub async fn listen(&mut self, audio: &[u8]) -> Option<Submission> {
        if !self.recognizer.is_supported() {
            return None;
        }
        let event = self.recognizer.recognize(audio).await;
        self.speech_event(event)
    }

    /// Record the user entry and show a thinking placeholder
    pub fn submit(&mut self, command: Command) -> Submission {
        self.transcript.push(Role::User, command.as_str());
        let ticket = self.transcript.begin_thinking();
        tracing::debug!(%ticket, "command submitted");
        Submission { ticket, command }
    }

    /// Resolve a request: drop its placeholder, append and speak the reply
    ///
    /// Returns the text that was appended.
    pub fn complete(&mut self, completion: Completion) -> String {
        self.transcript.end_thinking(completion.ticket);

        let text = match completion.outcome {
            Ok(reply) => reply.render(),
            Err(e) => {
                tracing::error!(ticket = %completion.ticket, error = %e, "command failed");
                BACKEND_UNAVAILABLE.to_string()
            }
        };

        self.add_bot(text.clone());
        text
    }

    /// Submit text and wait for its reply
    ///
    /// Returns `None` for blank input.
    pub async fn ask(&mut self, dispatcher: &Dispatcher, text: &str) -> Option<String> {
        let submission = self.submit_text(text)?;
        let completion = dispatcher.dispatch(submission).await;
        Some(self.complete(completion))
    }

    /// Append a bot entry and speak it; returns whether playback started
    fn add_bot(&mut self, text: String) -> bool {
        let spoken = self.speaker.speak(&text);
        self.transcript.push(Role::Bot, text);
        spoken
    }
}
