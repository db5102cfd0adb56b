use kuchiki::NodeRef;
use tracing::{debug, info};

use crate::config::SelectorConfig;
use crate::dom;
use crate::extract;
use crate::render::{self, RenderOptions, PROCESSED_ATTR};

/// Format one quoted-content fragment.
///
/// `None` means there is nothing to do: blank input, or the fragment already
/// carries the processed marker (not an error, just a short-circuit). A
/// fragment with no extractable structure still formats, via the simple
/// fallback view.
pub fn format_fragment(html: &str, cfg: &SelectorConfig, opts: RenderOptions) -> Option<String> {
    if html.trim().is_empty() {
        debug!("empty fragment, nothing to format");
        return None;
    }
    let doc = dom::parse_fragment(html);
    if dom::tree_has_attr(&doc, PROCESSED_ATTR) {
        debug!("fragment already formatted, skipping");
        return None;
    }

    let convo = extract::extract_conversation(html, cfg);
    if convo.is_empty() {
        debug!("no conversation structure found, falling back to simple formatting");
        return Some(render::simple_view(html));
    }
    info!(messages = convo.messages.len(), "formatting conversation");
    Some(render::conversation_view(&convo, opts))
}

/// Scan a whole saved page, reformat every quoted region in place, and
/// return the rewritten page. `None` when no region needed work.
pub fn enhance_document(html: &str, cfg: &SelectorConfig, opts: RenderOptions) -> Option<String> {
    let doc = dom::parse_fragment(html);

    let mut containers = dom::select_first_list(&doc, &cfg.message_containers);
    if containers.is_empty() {
        // unrecognized page markup: treat the whole body as one container
        containers = dom::select_nodes(&doc, "body");
    }

    let mut formatted = 0usize;
    for container in &containers {
        let Some(region) = find_quoted_region(container, cfg) else {
            continue;
        };
        let region_html = dom::inner_html(&region);
        let Some(output) = format_fragment(&region_html, cfg, opts) else {
            continue;
        };
        dom::replace_inner_html(&region, &output);
        dom::set_attr(&region, PROCESSED_ATTR, "true");
        formatted += 1;
    }

    if formatted == 0 {
        debug!("no quoted regions to enhance");
        return None;
    }
    info!(regions = formatted, "enhanced document");
    Some(doc.to_string())
}

/// Locate the quoted/expanded region inside one message container. First
/// selector with live matches wins; among those, prefer a region that shows
/// reply indicators; regions inside already-formatted markup are skipped.
fn find_quoted_region(container: &NodeRef, cfg: &SelectorConfig) -> Option<NodeRef> {
    for selector in &cfg.quoted_regions {
        let nodes = dom::select_nodes(container, selector);
        if nodes.is_empty() {
            continue;
        }
        let fresh: Vec<NodeRef> = nodes.into_iter().filter(|n| !is_processed(n)).collect();
        if fresh.is_empty() {
            continue;
        }
        if let Some(best) = fresh.iter().find(|n| looks_quoted(n)) {
            return Some(best.clone());
        }
        return Some(fresh[0].clone());
    }
    debug!("no quoted region in container");
    None
}

/// The marker on the node itself or any ancestor counts: a region nested in
/// formatted output (the archived original, for instance) must stay put.
fn is_processed(node: &NodeRef) -> bool {
    node.inclusive_ancestors()
        .any(|ancestor| dom::has_attr(&ancestor, PROCESSED_ATTR))
}

fn looks_quoted(node: &NodeRef) -> bool {
    let text = node.text_contents();
    text.contains("wrote:")
        || text.contains("From:")
        || !dom::select_nodes(node, "blockquote").is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SelectorConfig {
        SelectorConfig::default()
    }

    const FRAGMENT: &str =
        "<p>On Mon, Jan 1, 2024, Alice wrote:</p><blockquote>Hi there</blockquote>";

    #[test]
    fn formats_a_fragment_once() {
        let out = format_fragment(FRAGMENT, &cfg(), RenderOptions::default()).unwrap();
        assert!(out.contains("rethread-container"));
        assert!(out.contains("Alice"));
    }

    #[test]
    fn reformatting_is_a_noop() {
        let once = format_fragment(FRAGMENT, &cfg(), RenderOptions::default()).unwrap();
        assert!(format_fragment(&once, &cfg(), RenderOptions::default()).is_none());
    }

    #[test]
    fn empty_input_is_a_noop() {
        assert!(format_fragment("   ", &cfg(), RenderOptions::default()).is_none());
    }

    #[test]
    fn structureless_content_gets_simple_view() {
        let out = format_fragment("<p>just some words</p>", &cfg(), RenderOptions::default())
            .unwrap();
        assert!(out.contains("rethread-simple"));
        assert!(out.contains("just some words"));
    }

    #[test]
    fn enhances_page_in_place() {
        let page = format!("<div role=\"listitem\"><div class=\"gmail_quote\">{FRAGMENT}</div></div>");
        let out = enhance_document(&page, &cfg(), RenderOptions::default()).unwrap();
        assert!(out.contains("rethread-container"));
        assert!(out.contains("listitem"));
    }

    #[test]
    fn enhanced_page_is_stable_on_rescan() {
        let page = format!("<div role=\"listitem\"><div class=\"gmail_quote\">{FRAGMENT}</div></div>");
        let once = enhance_document(&page, &cfg(), RenderOptions::default()).unwrap();
        assert!(enhance_document(&once, &cfg(), RenderOptions::default()).is_none());
    }

    #[test]
    fn page_without_quotes_is_left_alone() {
        let page = "<div role=\"listitem\"><p>no quoting here</p></div>";
        assert!(enhance_document(page, &cfg(), RenderOptions::default()).is_none());
    }

    #[test]
    fn falls_back_to_body_when_containers_missing() {
        let page = format!("<section><div class=\"gmail_quote\">{FRAGMENT}</div></section>");
        let out = enhance_document(&page, &cfg(), RenderOptions::default()).unwrap();
        assert!(out.contains("rethread-container"));
    }

    #[test]
    fn fixture_page_enhances() {
        let html = std::fs::read_to_string("tests/fixtures/nested_thread.html").unwrap();
        let out = enhance_document(&html, &cfg(), RenderOptions::default()).unwrap();
        assert!(out.contains("rethread-container"));
        assert!(out.contains(PROCESSED_ATTR));
    }
}
