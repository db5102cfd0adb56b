use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;
use tracing::debug;

use super::headers::{FROM_DATE_RE, ON_WROTE_RE};
use crate::config::SelectorConfig;
use crate::dom;

/// Read-notification footer injected by mail-tracking extensions.
static TRACKER_FOOTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Sender notified by[^<\n]*").unwrap());

static BR_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:<br[^>]*>\s*){3,}").unwrap());

/// Header-looking paragraphs longer than this are assumed to be real content
/// that merely starts like a header, and are left alone.
const MAX_HEADER_PARA_LEN: usize = 160;

/// Rule-4 thresholds: a bare timestamp clause and the total remaining text.
const TIMESTAMP_ONLY_MAX: usize = 32;
const METADATA_TEXT_MAX: usize = 48;

/// Reduce one message's markup to the text it newly contributed: drop nested
/// quotes, repeated boilerplate headers, and tracking artifacts.
///
/// Every reduction is skipped when it would leave nothing; for non-empty
/// input the only empty return is the bare-timestamp case (rule 4), which is
/// pure metadata rather than content.
pub fn clean_content(html: &str, cfg: &SelectorConfig) -> String {
    if html.trim().is_empty() {
        return html.to_string();
    }

    let doc = dom::parse_fragment(html);
    strip_quote_containers(&doc, cfg);
    strip_header_paragraphs(&doc);
    strip_tracking_pixels(&doc, cfg);

    let mut out = dom::fragment_html(&doc);
    out = strip_header_lines(&out);
    if is_metadata_only(&out) {
        debug!("content reduced to a bare timestamp, dropping it");
        return String::new();
    }
    out = collapse_break_runs(&out);

    // re-serialize so a second pass sees the identical tree
    let out = dom::fragment_html(&dom::parse_fragment(&out));
    if text_of_html(&out).trim().is_empty() {
        debug!("cleanup would remove everything, returning content unchanged");
        return html.to_string();
    }
    out
}

/// Rule 1: quoted replies and expanded-content containers contribute nothing
/// new; remove them wholesale unless they are all there is.
fn strip_quote_containers(doc: &NodeRef, cfg: &SelectorConfig) {
    let mut targets: Vec<NodeRef> = Vec::new();
    for selector in &cfg.strip_containers {
        targets.extend(dom::select_nodes(doc, selector));
    }
    if targets.is_empty() {
        return;
    }
    if !has_text_outside(doc, &targets) {
        debug!("quote strip would leave nothing, keeping quotes");
        return;
    }
    for node in targets {
        node.detach();
    }
}

/// Rule 2: short paragraph/div elements that are nothing but a reply header.
/// Skipped entirely when no non-header text node would survive.
fn strip_header_paragraphs(doc: &NodeRef) {
    let candidates: Vec<NodeRef> = doc
        .descendants()
        .filter(|node| {
            let Some(element) = node.as_element() else {
                return false;
            };
            if !matches!(element.name.local.as_ref(), "p" | "div") {
                return false;
            }
            let text = node.text_contents();
            let text = text.trim();
            !text.is_empty() && text.len() <= MAX_HEADER_PARA_LEN && is_header_text(text)
        })
        .collect();
    if candidates.is_empty() {
        return;
    }
    if !has_text_outside(doc, &candidates) {
        debug!("only quoted headers remain, keeping them");
        return;
    }
    for node in candidates {
        node.detach();
    }
}

/// Rule 5: 1x1 or known-tracker images.
fn strip_tracking_pixels(doc: &NodeRef, cfg: &SelectorConfig) {
    for img in dom::select_nodes(doc, "img") {
        if is_tracking_pixel(&img, cfg) {
            img.detach();
        }
    }
}

/// Rule 3: the same header idioms, applied to the serialized markup. Each
/// pattern is skipped when stripping it would leave no text at all.
fn strip_header_lines(html: &str) -> String {
    let mut out = html.to_string();
    for re in [&*ON_WROTE_RE, &*FROM_DATE_RE, &*TRACKER_FOOTER_RE] {
        if !re.is_match(&out) {
            continue;
        }
        let candidate = re.replace_all(&out, "").into_owned();
        if text_of_html(&candidate).trim().is_empty() {
            debug!("pattern strip would empty the content, skipping");
            continue;
        }
        out = candidate;
    }
    out
}

/// Rule 6.
fn collapse_break_runs(html: &str) -> String {
    BR_RUN_RE.replace_all(html, "<br><br>").into_owned()
}

/// Rule 4: nothing left but a short bare timestamp.
fn is_metadata_only(html: &str) -> bool {
    let text = text_of_html(html);
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    !flat.is_empty()
        && flat.len() < TIMESTAMP_ONLY_MAX
        && flat.len() < METADATA_TEXT_MAX
        && is_timestamp_only(&flat)
}

fn is_header_text(text: &str) -> bool {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    ON_WROTE_RE.is_match(&flat)
        || FROM_DATE_RE.is_match(&flat)
        || TRACKER_FOOTER_RE.is_match(&flat)
}

fn is_tracking_pixel(node: &NodeRef, cfg: &SelectorConfig) -> bool {
    let Some(element) = node.as_element() else {
        return false;
    };
    let attrs = element.attributes.borrow();
    let src = attrs.get("src").unwrap_or("").to_ascii_lowercase();
    if cfg.tracker_src_hints.iter().any(|hint| src.contains(hint.as_str())) {
        return true;
    }
    let width = attrs.get("width").and_then(parse_dimension);
    let height = attrs.get("height").and_then(parse_dimension);
    match (width, height) {
        (Some(w), Some(h)) => w <= 1 && h <= 1,
        (Some(w), None) => w <= 1,
        (None, Some(h)) => h <= 1,
        (None, None) => false,
    }
}

fn parse_dimension(raw: &str) -> Option<u32> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Any non-whitespace text node outside the to-be-removed subtrees?
fn has_text_outside(doc: &NodeRef, removed: &[NodeRef]) -> bool {
    doc.descendants().any(|node| {
        let is_text = node
            .as_text()
            .map_or(false, |text| !text.borrow().trim().is_empty());
        is_text
            && !node
                .ancestors()
                .any(|ancestor| removed.iter().any(|r| same_node(&ancestor, r)))
    })
}

fn same_node(a: &NodeRef, b: &NodeRef) -> bool {
    std::rc::Rc::ptr_eq(&a.0, &b.0)
}

fn text_of_html(html: &str) -> String {
    dom::parse_fragment(html).text_contents()
}

fn is_timestamp_only(text: &str) -> bool {
    let mut saw_token = false;
    let separators =
        |c: char| c.is_whitespace() || matches!(c, ',' | '.' | ':' | ';' | '/' | '-' | '(' | ')');
    for token in text.split(separators) {
        if token.is_empty() {
            continue;
        }
        saw_token = true;
        if !is_time_token(token) {
            return false;
        }
    }
    saw_token
}

fn is_time_token(token: &str) -> bool {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    const WORDS: &[&str] = &[
        "mon", "tue", "wed", "thu", "fri", "sat", "sun",
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
        "jan", "feb", "mar", "apr", "may", "jun",
        "jul", "aug", "sep", "oct", "nov", "dec",
        "january", "february", "march", "april", "june", "july",
        "august", "september", "october", "november", "december",
        "am", "pm", "at", "on",
    ];
    WORDS.contains(&token.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SelectorConfig {
        SelectorConfig::default()
    }

    #[test]
    fn strips_nested_quote_keeps_new_text() {
        let html = "<div>New reply text.</div><blockquote><div>old stuff</div></blockquote>";
        let out = clean_content(html, &cfg());
        assert!(out.contains("New reply text."));
        assert!(!out.contains("old stuff"));
        assert!(!out.contains("blockquote"));
    }

    #[test]
    fn keeps_quote_that_is_everything() {
        let html = "<blockquote><p>only quoted words</p></blockquote>";
        let out = clean_content(html, &cfg());
        assert!(out.contains("only quoted words"));
        assert!(out.contains("blockquote"));
    }

    #[test]
    fn removes_short_header_paragraph() {
        let html = "<p>On Mon, Alice wrote:</p><div>Real content here.</div>";
        let out = clean_content(html, &cfg());
        assert!(out.contains("Real content here."));
        assert!(!out.contains("wrote:"));
    }

    #[test]
    fn keeps_header_when_it_is_all_there_is() {
        let html = "<p>On Mon, Alice wrote:</p>";
        let out = clean_content(html, &cfg());
        assert!(out.contains("wrote:"));
    }

    #[test]
    fn long_prose_starting_like_a_header_survives() {
        let body = "From: my perspective the launch went well and we should write \
                    up what we learned, ship the follow-on fixes next sprint, and then \
                    revisit the rollout checklist with the wider team before the next one.";
        let html = format!("<div>{body}</div><div>Second paragraph.</div>");
        let out = clean_content(&html, &cfg());
        assert!(out.contains("launch went well"));
    }

    #[test]
    fn removes_tracking_footer_paragraph() {
        let html = "<p>Sender notified by Mailtrack</p><div>Body text.</div>";
        let out = clean_content(html, &cfg());
        assert!(out.contains("Body text."));
        assert!(!out.contains("Mailtrack"));
    }

    #[test]
    fn strips_tracking_pixel() {
        let html = "<div>Hi</div><img src=\"https://mailtrack.io/trace/mail/abc.gif\" width=\"1\" height=\"1\">";
        let out = clean_content(html, &cfg());
        assert!(out.contains("Hi"));
        assert!(!out.contains("img"));
    }

    #[test]
    fn keeps_real_images() {
        let html = "<div>Screenshot attached.</div><img src=\"cid:graph.png\" width=\"480\" height=\"320\">";
        let out = clean_content(html, &cfg());
        assert!(out.contains("img"));
    }

    #[test]
    fn collapses_break_runs() {
        let out = clean_content("a<br><br><br><br>b", &cfg());
        let breaks = out.matches("<br>").count();
        assert_eq!(breaks, 2);
    }

    #[test]
    fn bare_timestamp_is_blanked() {
        assert_eq!(clean_content("<div>Mon, Jan 1, 2024</div>", &cfg()), "");
    }

    #[test]
    fn short_real_text_is_not_blanked() {
        let out = clean_content("<div>May do.</div>", &cfg());
        assert!(out.contains("May do."));
    }

    #[test]
    fn never_empty_for_nonempty_input() {
        let inputs = [
            "<blockquote>quoted</blockquote>",
            "<p>From: Bob</p>",
            "plain words",
            "<div>On Mon, Alice wrote:</div>",
        ];
        for html in inputs {
            assert!(
                !clean_content(html, &cfg()).trim().is_empty(),
                "emptied {html:?}"
            );
        }
    }

    #[test]
    fn idempotent_on_cleaned_output() {
        let inputs = [
            "<div>New reply text.</div><blockquote><div>old stuff</div></blockquote>",
            "<p>On Mon, Alice wrote:</p><div>Real content here.</div>",
            "a<br><br><br><br>b",
            "<blockquote><p>only quoted words</p></blockquote>",
            "Thanks! <img src=\"x.png\" width=\"1\" height=\"1\">",
        ];
        for html in inputs {
            let once = clean_content(html, &cfg());
            let twice = clean_content(&once, &cfg());
            assert_eq!(once, twice, "not idempotent for {html:?}");
        }
    }
}
