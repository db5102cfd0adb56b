pub mod clean;
pub mod flow;
pub mod headers;
pub mod segment;

use crate::config::SelectorConfig;
use crate::model::Conversation;

/// Full extraction pass over one quoted-content fragment: boundary
/// detection, segmentation, then per-message cleanup. The raw markup is
/// retained verbatim on the conversation for the original-view toggle.
pub fn extract_conversation(html: &str, cfg: &SelectorConfig) -> Conversation {
    let mut messages = segment::segment(html, cfg);
    for message in &mut messages {
        message.content = clean::clean_content(&message.content, cfg);
    }
    Conversation {
        raw_html: html.to_string(),
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_cleans_nested_quotes_out_of_content() {
        let html = "<p>On Wed, Dana wrote:</p>\
                    <blockquote><div>Top of the chain.</div>\
                    <p>On Tue, Lee wrote:</p>\
                    <blockquote><div>Older reply.</div></blockquote></blockquote>";
        let convo = extract_conversation(html, &SelectorConfig::default());
        assert_eq!(convo.messages.len(), 2);
        // outer message loses its nested quote and the repeated header
        assert!(convo.messages[0].content.contains("Top of the chain."));
        assert!(!convo.messages[0].content.contains("Older reply."));
        assert!(!convo.messages[0].content.contains("wrote:"));
        // raw markup is retained untouched
        assert_eq!(convo.raw_html, html);
    }

    #[test]
    fn fixture_thread_round_trip() {
        let html = std::fs::read_to_string("tests/fixtures/nested_thread.html").unwrap();
        let convo = extract_conversation(&html, &SelectorConfig::default());
        assert_eq!(convo.messages.len(), 3);
        assert!(convo
            .messages
            .iter()
            .all(|m| !m.content.trim().is_empty() || !m.sender.is_empty()));
    }
}
