//! Input capture
//!
//! Commands come from the text field (button or Enter without Shift) or from
//! a one-shot speech recognition result. Blank input never becomes a
//! [`Command`].

mod recognition;

pub use recognition::{
    HttpRecognizer, RecognitionEvent, SpeechRecognizer, UnsupportedRecognizer, recognizer_from_config,
};

/// A trimmed, non-empty user instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Trim raw input; `None` if nothing is left
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key events the text field reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter { shift: bool },
}

/// Editable command field
#[derive(Debug, Default, Clone)]
pub struct InputField {
    text: String,
}

impl InputField {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current field contents
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the field contents (e.g. with a recognized transcript)
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Apply a key press
    ///
    /// Enter without Shift submits; Enter with Shift inserts a newline.
    pub fn key_press(&mut self, key: Key) -> Option<Command> {
        match key {
            Key::Char(c) => {
                self.text.push(c);
                None
            }
            Key::Backspace => {
                self.text.pop();
                None
            }
            Key::Enter { shift: true } => {
                self.text.push('\n');
                None
            }
            Key::Enter { shift: false } => self.submit(),
        }
    }

    /// Take the field contents as a command
    ///
    /// The field is cleared only when a command is produced; blank input is
    /// left in place and nothing is returned.
    pub fn submit(&mut self) -> Option<Command> {
        let command = Command::parse(&self.text)?;
        self.text.clear();
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(field: &mut InputField, s: &str) {
        for c in s.chars() {
            assert!(field.key_press(Key::Char(c)).is_none());
        }
    }

    #[test]
    fn command_is_trimmed() {
        let command = Command::parse("\t summarize my inbox \n").unwrap();
        assert_eq!(command.as_str(), "summarize my inbox");
    }

    #[test]
    fn blank_input_is_not_a_command() {
        assert!(Command::parse("").is_none());
        assert!(Command::parse("   \n\t ").is_none());
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut field = InputField::new();
        type_str(&mut field, "read latest");

        let command = field.key_press(Key::Enter { shift: false }).unwrap();
        assert_eq!(command.as_str(), "read latest");
        assert_eq!(field.text(), "");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut field = InputField::new();
        type_str(&mut field, "line one");
        assert!(field.key_press(Key::Enter { shift: true }).is_none());
        type_str(&mut field, "line two");

        assert_eq!(field.text(), "line one\nline two");
        let command = field.submit().unwrap();
        assert_eq!(command.as_str(), "line one\nline two");
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut field = InputField::new();
        type_str(&mut field, "   ");
        assert!(field.key_press(Key::Enter { shift: false }).is_none());
        assert_eq!(field.text(), "   ");
    }

    #[test]
    fn backspace_edits() {
        let mut field = InputField::new();
        type_str(&mut field, "hix");
        field.key_press(Key::Backspace);
        assert_eq!(field.text(), "hi");
    }
}
