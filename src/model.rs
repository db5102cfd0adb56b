use serde::Serialize;

/// Sentinel sender used when no header match yields a name.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// One reconstructed message from a quoted reply chain.
///
/// `timestamp` is display text only and may be empty; it is never parsed
/// into a structured date. `content` is an HTML fragment and may still carry
/// nested artifacts when the cleaner declines to strip them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sender: String,
    pub timestamp: String,
    pub content: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, timestamp: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            timestamp: timestamp.into(),
            content: content.into(),
        }
    }
}

/// An ordered message sequence extracted from one quoted-content region.
///
/// `messages` is in extraction order: the first segment encountered is the
/// most deeply nested (oldest) reply. Display layers may reverse for
/// newest-first, but this order is fixed at extraction time. `raw_html` is
/// the source markup kept verbatim for the original-view toggle; it is
/// archival and never re-parsed.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub raw_html: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Which side of a chat layout a message lands on. Derived per render by the
/// flow classifier, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}
