//! Speech through the platform's command-line synthesizer
//!
//! Uses `espeak-ng` (or `espeak`) on Linux and `say` on macOS. Each
//! utterance runs as a child process; cancelling kills it.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use super::{SpeechEngine, Utterance, Voice};
use crate::{Error, Result};

/// Words per minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

#[derive(Debug, Clone)]
enum Synthesizer {
    Espeak(PathBuf),
    Say(PathBuf),
}

/// Engine driving a system synthesizer binary
pub struct SystemSpeech {
    synthesizer: Option<Synthesizer>,
    current: Option<Child>,
}

impl SystemSpeech {
    /// Locate a synthesizer on `PATH`
    ///
    /// Without one the engine reports itself unavailable.
    #[must_use]
    pub fn detect() -> Self {
        let synthesizer = which::which("espeak-ng")
            .or_else(|_| which::which("espeak"))
            .map(Synthesizer::Espeak)
            .or_else(|_| which::which("say").map(Synthesizer::Say))
            .ok();

        match &synthesizer {
            Some(Synthesizer::Espeak(path) | Synthesizer::Say(path)) => {
                tracing::debug!(path = %path.display(), "found speech synthesizer");
            }
            None => tracing::warn!("no speech synthesizer found, replies will not be spoken"),
        }

        Self {
            synthesizer,
            current: None,
        }
    }

    /// Block until the current utterance finishes
    ///
    /// # Errors
    ///
    /// Returns error if the synthesizer process cannot be waited on
    pub fn wait(&mut self) -> Result<()> {
        if let Some(mut child) = self.current.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(Error::Speech(format!("synthesizer exited with {status}")));
            }
        }
        Ok(())
    }

    fn list_voices(synthesizer: &Synthesizer) -> Result<Vec<Voice>> {
        let (path, output) = match synthesizer {
            Synthesizer::Espeak(path) => (
                path,
                Command::new(path)
                    .arg("--voices")
                    .stderr(Stdio::null())
                    .output()?,
            ),
            Synthesizer::Say(path) => (
                path,
                Command::new(path)
                    .args(["-v", "?"])
                    .stderr(Stdio::null())
                    .output()?,
            ),
        };

        if !output.status.success() {
            return Err(Error::Speech(format!(
                "{} exited with {}",
                path.display(),
                output.status
            )));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(match synthesizer {
            Synthesizer::Espeak(_) => parse_espeak_voices(&listing),
            Synthesizer::Say(_) => parse_say_voices(&listing),
        })
    }

    fn command_for(synthesizer: &Synthesizer, utterance: &Utterance) -> Command {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(1.0) as u32;

        match synthesizer {
            Synthesizer::Espeak(path) => {
                let mut cmd = Command::new(path);
                let voice = utterance
                    .voice
                    .as_ref()
                    .map_or_else(|| utterance.lang.to_lowercase(), |v| v.id.clone());
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let pitch = (50.0 * utterance.pitch).clamp(0.0, 99.0) as u32;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let amplitude = (100.0 * utterance.volume).clamp(0.0, 200.0) as u32;
                cmd.arg("-v")
                    .arg(voice)
                    .arg("-s")
                    .arg(wpm.to_string())
                    .arg("-p")
                    .arg(pitch.to_string())
                    .arg("-a")
                    .arg(amplitude.to_string())
                    .arg("--")
                    .arg(&utterance.text);
                cmd
            }
            Synthesizer::Say(path) => {
                let mut cmd = Command::new(path);
                if let Some(voice) = &utterance.voice {
                    cmd.arg("-v").arg(&voice.id);
                }
                cmd.arg("-r").arg(wpm.to_string()).arg("--").arg(&utterance.text);
                cmd
            }
        }
    }
}

impl SpeechEngine for SystemSpeech {
    fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    fn voices(&self) -> Vec<Voice> {
        let Some(synthesizer) = &self.synthesizer else {
            return Vec::new();
        };

        Self::list_voices(synthesizer).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to list voices");
            Vec::new()
        })
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        let Some(synthesizer) = self.synthesizer.clone() else {
            return Err(Error::Speech("no speech synthesizer available".to_string()));
        };

        // `say` has no volume control; a silent utterance plays nothing anyway
        if utterance.volume <= 0.0 {
            return Ok(());
        }

        self.cancel();

        let child = Self::command_for(&synthesizer, utterance)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tracing::debug!(pid = child.id(), chars = utterance.text.len(), "speaking");
        self.current = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if matches!(child.try_wait(), Ok(None)) {
                if let Err(e) = child.kill() {
                    tracing::debug!(error = %e, "failed to stop utterance");
                }
            }
            let _ = child.wait();
        }
    }
}

impl Drop for SystemSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Engine that never speaks, for headless use
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeech;

impl SpeechEngine for SilentSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&mut self, _utterance: &Utterance) -> Result<()> {
        Ok(())
    }

    fn cancel(&mut self) {}
}

/// Parse `espeak-ng --voices` output
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 10)
/// ```
#[must_use]
pub fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let (id, name) = (cols.get(1)?, cols.get(3)?);
            Some(Voice {
                id: (*id).to_string(),
                name: name.replace('_', " "),
                lang: normalize_locale(id),
            })
        })
        .collect()
}

/// Parse `say -v ?` output
///
/// ```text
/// Alex                en_US    # Most people recognize me by my voice.
/// Bad News            en_US    # The light you see at the end of the tunnel...
/// ```
#[must_use]
pub fn parse_say_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let spec = line.split('#').next()?.trim();
            let (name, lang) = spec.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Voice {
                id: name.to_string(),
                name: name.to_string(),
                lang: normalize_locale(lang),
            })
        })
        .collect()
}

/// `en_us` / `en-us` → `en-US`
fn normalize_locale(raw: &str) -> String {
    let mut parts = raw.split(['-', '_']);
    let language = parts.next().unwrap_or_default().to_lowercase();

    let rest: Vec<String> = parts
        .map(|part| {
            if part.len() == 2 {
                part.to_uppercase()
            } else {
                part.to_lowercase()
            }
        })
        .collect();

    if rest.is_empty() {
        language
    } else {
        format!("{language}-{}", rest.join("-"))
    }
}
