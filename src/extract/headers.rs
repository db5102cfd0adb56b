use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;

use crate::model::UNKNOWN_SENDER;

/// `On <timestamp>, <sender> wrote:` — the lazy first capture stops at the
/// first comma-delimited clause, so "On Mon, Jan 1, 2024, Alice wrote:"
/// yields timestamp "Mon" with the rest left for the name clause.
pub(crate) static ON_WROTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)On (.+?),? (.+?)(?:\s+<[^>]+>)? wrote:").unwrap());

/// `From: <sender> ... Date: <timestamp>` with the Date clause optional.
/// Anchored per line so a match never swallows following content.
pub(crate) static FROM_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)From:[ \t]*(.+?)(?:\s+<[^>]+>)?(?:\s+Date:[ \t]*(.+?))?[ \t]*$").unwrap()
});

/// Cheap probe for "this element's text looks like a reply header".
pub(crate) static HEADER_PROBE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)wrote:|On .+:|From:|Date:").unwrap());

/// Tags and (possibly entity-escaped) `<email>` suffixes stripped from
/// captured names and timestamps.
static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|&lt;.*?&gt;").unwrap());

/// How far back through preceding element siblings the structural strategy
/// looks for a header before giving up on a quote block.
const MAX_SIBLING_SCAN: usize = 10;

/// One header occurrence found by the textual scan. Offsets are byte
/// positions of the matched span in the source fragment.
#[derive(Debug, Clone)]
pub struct HeaderHit {
    pub start: usize,
    pub end: usize,
    pub sender: String,
    pub timestamp: String,
}

/// Scan raw markup for every header-pattern match, both idioms, offsets
/// strictly increasing. Overlapping matches keep the earlier one.
pub fn scan_text(html: &str) -> Vec<HeaderHit> {
    let mut hits: Vec<HeaderHit> = Vec::new();

    for caps in ON_WROTE_RE.captures_iter(html) {
        let span = caps.get(0).expect("whole match");
        hits.push(HeaderHit {
            start: span.start(),
            end: span.end(),
            sender: name_clause(&caps[2]),
            timestamp: tidy(&caps[1]),
        });
    }
    for caps in FROM_DATE_RE.captures_iter(html) {
        let span = caps.get(0).expect("whole match");
        let timestamp = caps.get(2).map(|m| tidy(m.as_str())).unwrap_or_default();
        hits.push(HeaderHit {
            start: span.start(),
            end: span.end(),
            sender: or_unknown(tidy(&caps[1])),
            timestamp,
        });
    }

    hits.sort_by_key(|h| h.start);
    let mut deduped: Vec<HeaderHit> = Vec::new();
    for hit in hits {
        if deduped.last().is_none_or(|prev| hit.start >= prev.end) {
            deduped.push(hit);
        }
    }
    deduped
}

/// Parse a header's text into (sender, timestamp). The two idioms are
/// mutually exclusive; the "wrote:" form wins.
pub fn parse_header(text: &str) -> Option<(String, String)> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(caps) = ON_WROTE_RE.captures(&flat) {
        return Some((name_clause(&caps[2]), tidy(&caps[1])));
    }
    if let Some(caps) = FROM_DATE_RE.captures(&flat) {
        let timestamp = caps.get(2).map(|m| tidy(m.as_str())).unwrap_or_default();
        return Some((or_unknown(tidy(&caps[1])), timestamp));
    }
    None
}

/// Find the header text associated with a quote block: the nearest preceding
/// element sibling whose text matches the probe, else the same walk over the
/// parent's preceding siblings. At most [`MAX_SIBLING_SCAN`] siblings per
/// level.
pub fn header_text_for_quote(quote: &NodeRef) -> Option<String> {
    find_in_preceding(quote)
        .or_else(|| quote.parent().as_ref().and_then(find_in_preceding))
}

fn find_in_preceding(node: &NodeRef) -> Option<String> {
    node.preceding_siblings()
        .filter(|sibling| sibling.as_element().is_some())
        .take(MAX_SIBLING_SCAN)
        .map(|sibling| sibling.text_contents())
        .find(|text| HEADER_PROBE_RE.is_match(text))
        .map(|text| text.trim().to_string())
}

/// The name clause of an "On ..., NAME wrote:" capture: everything after the
/// last comma, markup and address stripped.
fn name_clause(raw: &str) -> String {
    let cleaned = tidy(raw);
    let name = cleaned.rsplit(',').next().unwrap_or("").trim().to_string();
    or_unknown(name)
}

fn tidy(raw: &str) -> String {
    let stripped = MARKUP_RE.replace_all(raw, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn or_unknown(name: String) -> String {
    if name.is_empty() {
        UNKNOWN_SENDER.to_string()
    } else {
        name
    }
}
