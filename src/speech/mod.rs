//! Spoken output
//!
//! Playback starts [`SpeakerState::Locked`]. The first user gesture issues a
//! silent utterance and unlocks it for good. While unlocked every speak
//! request cancels whatever is playing and starts the new text, so at most
//! one utterance plays at a time.

mod system;

pub use system::{SilentSpeech, SystemSpeech, parse_espeak_voices, parse_say_voices};

use crate::Result;

/// An installed voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Engine-specific identifier used to select the voice
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Locale tag (e.g. "en-US")
    pub lang: String,
}

/// Text queued for playback
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
    /// 1.0 is the engine's normal speed
    pub rate: f32,
    /// 1.0 is the engine's normal pitch
    pub pitch: f32,
    /// 0.0 (silent) to 1.0
    pub volume: f32,
}

impl Utterance {
    /// Normal-speed, full-volume utterance
    #[must_use]
    pub fn new(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: lang.into(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }

    /// Zero-volume single space, used to unlock playback
    #[must_use]
    pub fn silent(lang: impl Into<String>) -> Self {
        Self {
            volume: 0.0,
            ..Self::new(" ", lang)
        }
    }
}

/// Text-to-speech capability
pub trait SpeechEngine: Send {
    /// Whether the engine can play anything
    fn is_available(&self) -> bool;

    /// Installed voices; may be empty until the engine has loaded them
    fn voices(&self) -> Vec<Voice>;

    /// Start playing an utterance
    ///
    /// # Errors
    ///
    /// Returns error if playback cannot be started
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;

    /// Stop the current utterance, if any
    fn cancel(&mut self);
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        (**self).speak(utterance)
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }
}

/// Playback lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerState {
    Locked,
    Unlocked,
}

/// Speaks bot replies through an engine
pub struct Speaker<E> {
    engine: E,
    state: SpeakerState,
    voices: Vec<Voice>,
    locale: String,
}

impl<E: SpeechEngine> Speaker<E> {
    /// Create a locked speaker and load the current voice list
    pub fn new(engine: E, locale: impl Into<String>) -> Self {
        let mut speaker = Self {
            engine,
            state: SpeakerState::Locked,
            voices: Vec::new(),
            locale: locale.into(),
        };
        speaker.refresh_voices();
        speaker
    }

    #[must_use]
    pub const fn state(&self) -> SpeakerState {
        self.state
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    #[must_use]
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Reload the voice list; call on every voices-changed notification
    pub fn refresh_voices(&mut self) {
        self.voices = if self.engine.is_available() {
            self.engine.voices()
        } else {
            Vec::new()
        };
        tracing::debug!(count = self.voices.len(), "voice list refreshed");
    }

    /// Unlock playback on the first user gesture
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn unlock(&mut self) -> bool {
        if self.state == SpeakerState::Unlocked {
            return false;
        }
        self.state = SpeakerState::Unlocked;

        if self.engine.is_available() {
            if let Err(e) = self.engine.speak(&Utterance::silent(&self.locale)) {
                tracing::warn!(error = %e, "silent unlock utterance failed");
            }
        }
        tracing::debug!("speech unlocked");
        true
    }

    /// Speak `text`, preempting any current utterance
    ///
    /// No-op while locked, for blank text, or without a usable engine.
    /// Returns whether playback was started.
    pub fn speak(&mut self, text: &str) -> bool {
        if self.state == SpeakerState::Locked || text.trim().is_empty() {
            return false;
        }
        if !self.engine.is_available() {
            return false;
        }

        self.engine.cancel();

        let mut utterance = Utterance::new(text, &self.locale);
        utterance.voice = select_voice(&self.voices, &self.locale).cloned();

        match self.engine.speak(&utterance) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "speech playback failed");
                false
            }
        }
    }

    /// Stop the current utterance
    pub fn cancel(&mut self) {
        self.engine.cancel();
    }
}

/// Pick a voice for `locale`
///
/// Exact locale match first, then any voice of the same language, then the
/// first voice at all.
#[must_use]
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str) -> Option<&'a Voice> {
    let language = locale.split(['-', '_']).next().unwrap_or(locale);

    voices
        .iter()
        .find(|v| v.lang.eq_ignore_ascii_case(locale))
        .or_else(|| {
            voices.iter().find(|v| {
                v.lang
                    .get(..language.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(language))
            })
        })
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str) -> Voice {
        Voice {
            id: name.to_lowercase(),
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    #[derive(Default)]
    struct Recorder {
        voices: Vec<Voice>,
        spoken: Vec<Utterance>,
        cancels: usize,
    }

    impl SpeechEngine for Recorder {
        fn is_available(&self) -> bool {
            true
        }

        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: &Utterance) -> Result<()> {
            self.spoken.push(utterance.clone());
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    #[test]
    fn exact_locale_wins() {
        let voices = [voice("Daniel", "en-GB"), voice("Samantha", "en-US")];
        assert_eq!(select_voice(&voices, "en-US").unwrap().name, "Samantha");
    }

    #[test]
    fn falls_back_to_language_prefix() {
        let voices = [voice("Thomas", "fr-FR"), voice("Daniel", "en-GB")];
        assert_eq!(select_voice(&voices, "en-US").unwrap().name, "Daniel");
    }

    #[test]
    fn falls_back_to_first_voice() {
        let voices = [voice("Thomas", "fr-FR"), voice("Anna", "de-DE")];
        assert_eq!(select_voice(&voices, "en-US").unwrap().name, "Thomas");
    }

    #[test]
    fn no_voices_no_selection() {
        assert!(select_voice(&[], "en-US").is_none());
    }

    #[test]
    fn locked_speaker_is_silent() {
        let mut speaker = Speaker::new(Recorder::default(), "en-US");
        assert!(!speaker.speak("hello"));
        assert!(speaker.engine().spoken.is_empty());
        assert_eq!(speaker.engine().cancels, 0);
    }

    #[test]
    fn unlock_is_one_shot() {
        let mut speaker = Speaker::new(Recorder::default(), "en-US");
        assert!(speaker.unlock());
        assert!(!speaker.unlock());

        let spoken = &speaker.engine().spoken;
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, " ");
        assert!(spoken[0].volume.abs() < f32::EPSILON);
    }

    #[test]
    fn speak_cancels_before_playing() {
        let mut speaker = Speaker::new(Recorder::default(), "en-US");
        speaker.unlock();

        assert!(speaker.speak("first"));
        assert!(speaker.speak("second"));
        assert_eq!(speaker.engine().cancels, 2);

        let texts: Vec<_> = speaker.engine().spoken.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec![" ", "first", "second"]);
    }

    #[test]
    fn blank_text_is_not_spoken() {
        let mut speaker = Speaker::new(Recorder::default(), "en-US");
        speaker.unlock();
        assert!(!speaker.speak("   "));
        assert_eq!(speaker.engine().spoken.len(), 1);
    }

    #[test]
    fn utterance_carries_selected_voice() {
        let engine = Recorder {
            voices: vec![voice("Daniel", "en-GB"), voice("Samantha", "en-US")],
            ..Recorder::default()
        };
        let mut speaker = Speaker::new(engine, "en-US");
        speaker.unlock();
        speaker.speak("hello");

        let last = speaker.engine().spoken.last().unwrap();
        assert_eq!(last.voice.as_ref().unwrap().name, "Samantha");
        assert_eq!(last.lang, "en-US");
        assert!((last.rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unavailable_engine_degrades_to_noop() {
        let mut speaker = Speaker::new(SilentSpeech, "en-US");
        assert!(speaker.unlock());
        assert!(!speaker.speak("hello"));
        assert!(speaker.voices().is_empty());
    }
}
