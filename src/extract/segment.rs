use kuchiki::NodeRef;
use regex::Regex;
use tracing::debug;

use super::headers;
use crate::config::SelectorConfig;
use crate::dom;
use crate::model::{Message, UNKNOWN_SENDER};

/// Split one quoted-content fragment into ordered messages.
///
/// Strategy 1 (structural) claims the whole fragment when any quote-block
/// element exists; the textual fallback only runs on quote-block-free
/// markup. The two never mix within one fragment.
pub fn segment(html: &str, cfg: &SelectorConfig) -> Vec<Message> {
    let doc = dom::parse_fragment(html);
    let quotes = dom::select_first_list(&doc, &cfg.quote_blocks);
    if !quotes.is_empty() {
        return segment_structural(&quotes);
    }
    segment_textual(html)
}

/// One message per quote block, document order. The first block encountered
/// is the most deeply nested reply, so extraction order is oldest first.
fn segment_structural(quotes: &[NodeRef]) -> Vec<Message> {
    quotes
        .iter()
        .map(|quote| {
            let (sender, timestamp) = headers::header_text_for_quote(quote)
                .and_then(|text| headers::parse_header(&text))
                .unwrap_or_else(|| (UNKNOWN_SENDER.to_string(), String::new()));
            Message::new(sender, timestamp, dom::inner_html(quote))
        })
        .collect()
}

/// Replace every matched header span with a positional placeholder, split on
/// the placeholders, and pair each part with the header that preceded it.
/// The text before the first placeholder is pre-quote content, not a message.
fn segment_textual(html: &str) -> Vec<Message> {
    let hits = headers::scan_text(html);
    if hits.is_empty() {
        return Vec::new();
    }

    let prefix = placeholder_prefix(html);
    let mut marked = String::with_capacity(html.len());
    let mut cursor = 0;
    for (i, hit) in hits.iter().enumerate() {
        marked.push_str(&html[cursor..hit.start]);
        marked.push_str(&format!("{prefix}{i}@@"));
        cursor = hit.end;
    }
    marked.push_str(&html[cursor..]);

    let splitter = Regex::new(&format!(r"{}\d+@@", regex::escape(&prefix)))
        .expect("placeholder pattern is valid");
    let parts: Vec<&str> = splitter.split(&marked).collect();
    if parts.len() < 2 {
        debug!(matches = hits.len(), "header matches but nothing to split, giving up");
        return Vec::new();
    }

    parts
        .into_iter()
        .skip(1)
        .zip(&hits)
        .map(|(content, hit)| Message::new(hit.sender.clone(), hit.timestamp.clone(), content))
        .collect()
}

/// A placeholder prefix guaranteed absent from the document, so splitting
/// can never collide with real content.
fn placeholder_prefix(html: &str) -> String {
    let mut counter = 0u32;
    let mut prefix = "@@quote-mark-".to_string();
    while html.contains(&prefix) {
        counter += 1;
        prefix = format!("@@quote-mark-{counter}-");
    }
    prefix
}
