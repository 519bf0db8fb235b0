//! Chat transcript
//!
//! Entries are appended in arrival order and never edited. Outstanding
//! requests show a thinking placeholder keyed by their [`Ticket`], removed
//! once the request resolves.

use chrono::{DateTime, Utc};

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// CSS-style class name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// One finalized transcript message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub text: String,
    pub role: Role,
    pub at: DateTime<Utc>,
}

/// Identifies one outstanding backend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A row in the transcript view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Message(Entry),
    Thinking(Ticket),
}

/// Scrolling chat transcript
#[derive(Debug, Default)]
pub struct Transcript {
    items: Vec<Item>,
    next_ticket: u64,
    /// Number of rows scrolled into view
    scroll: usize,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and scroll to it
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.items.push(Item::Message(Entry {
            text: text.into(),
            role,
            at: Utc::now(),
        }));
        self.scroll_to_bottom();
    }

    /// Show a thinking placeholder for a new request
    pub fn begin_thinking(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.items.push(Item::Thinking(ticket));
        self.scroll_to_bottom();
        ticket
    }

    /// Remove the placeholder of a request
    ///
    /// Returns `false` if there was none.
    pub fn end_thinking(&mut self, ticket: Ticket) -> bool {
        let before = self.items.len();
        self.items
            .retain(|item| !matches!(item, Item::Thinking(t) if *t == ticket));
        self.scroll = self.scroll.min(self.items.len());
        self.items.len() != before
    }

    /// Whether any request is still outstanding
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        self.items.iter().any(|item| matches!(item, Item::Thinking(_)))
    }

    /// Finalized messages in arrival order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.items.iter().filter_map(|item| match item {
            Item::Message(entry) => Some(entry),
            Item::Thinking(_) => None,
        })
    }

    /// All rows including placeholders
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Entry> {
        self.entries().last()
    }

    /// Number of finalized messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.items.len();
    }

    /// Whether the newest row is in view
    #[must_use]
    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll == self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(Role::User, "summarize my inbox");
        transcript.push(Role::Bot, "A: x");

        let roles: Vec<_> = transcript.entries().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Bot]);
        assert_eq!(transcript.last().unwrap().text, "A: x");
    }

    #[test]
    fn placeholder_is_not_an_entry() {
        let mut transcript = Transcript::new();
        let ticket = transcript.begin_thinking();
        assert!(transcript.is_thinking());
        assert!(transcript.is_empty());

        assert!(transcript.end_thinking(ticket));
        assert!(!transcript.is_thinking());
        assert!(!transcript.end_thinking(ticket));
    }

    #[test]
    fn ending_one_placeholder_keeps_others() {
        let mut transcript = Transcript::new();
        let first = transcript.begin_thinking();
        let second = transcript.begin_thinking();
        assert_ne!(first, second);

        transcript.end_thinking(first);
        assert_eq!(transcript.items(), &[Item::Thinking(second)]);
    }

    #[test]
    fn new_rows_scroll_into_view() {
        let mut transcript = Transcript::new();
        transcript.push(Role::Bot, "hello");
        transcript.push(Role::User, "hi");
        assert!(transcript.is_scrolled_to_bottom());

        let ticket = transcript.begin_thinking();
        assert!(transcript.is_scrolled_to_bottom());

        transcript.end_thinking(ticket);
        assert!(transcript.is_scrolled_to_bottom());

        transcript.push(Role::Bot, "reply");
        assert!(transcript.is_scrolled_to_bottom());
    }
}
