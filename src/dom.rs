use kuchiki::traits::*;
use kuchiki::NodeRef;
use tracing::warn;

/// Parse an HTML fragment (or whole page) into a tree handle.
///
/// The parser wraps fragments in a full document; [`fragment_html`] is the
/// matching serializer that unwraps them again.
pub fn parse_fragment(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

/// Serialize the body children of a parsed tree back to fragment markup.
pub fn fragment_html(doc: &NodeRef) -> String {
    if let Ok(mut bodies) = doc.select("body") {
        if let Some(body) = bodies.next() {
            return body
                .as_node()
                .children()
                .map(|child| child.to_string())
                .collect();
        }
    }
    doc.to_string()
}

/// Serialize a node's children (the node's inner markup).
pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

/// All matches for one selector, in document order. Invalid selector strings
/// are logged and treated as matching nothing.
pub fn select_nodes(scope: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match scope.select(selector) {
        Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
        Err(()) => {
            warn!(selector, "invalid selector, skipping");
            Vec::new()
        }
    }
}

/// Try an ordered selector list; the first selector that yields matches wins.
pub fn select_first_list(scope: &NodeRef, selectors: &[String]) -> Vec<NodeRef> {
    for selector in selectors {
        let nodes = select_nodes(scope, selector);
        if !nodes.is_empty() {
            return nodes;
        }
    }
    Vec::new()
}

/// Swap a node's children for freshly parsed markup.
pub fn replace_inner_html(node: &NodeRef, html: &str) {
    let old: Vec<NodeRef> = node.children().collect();
    for child in old {
        child.detach();
    }
    for child in fragment_children(html) {
        child.detach();
        node.append(child);
    }
}

fn fragment_children(html: &str) -> Vec<NodeRef> {
    let doc = parse_fragment(html);
    if let Ok(mut bodies) = doc.select("body") {
        if let Some(body) = bodies.next() {
            return body.as_node().children().collect();
        }
    }
    Vec::new()
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value.to_string());
    }
}

/// Whether this element itself carries the attribute.
pub fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.attributes.borrow().contains(name))
        .unwrap_or(false)
}

/// Whether any element in the tree carries the attribute.
pub fn tree_has_attr(doc: &NodeRef, name: &str) -> bool {
    doc.select(&format!("[{name}]"))
        .map(|mut matches| matches.next().is_some())
        .unwrap_or(false)
}

/// Append to an element's class list, preserving existing classes.
pub fn add_class(node: &NodeRef, class: &str) {
    if let Some(element) = node.as_element() {
        let mut attrs = element.attributes.borrow_mut();
        let merged = match attrs.get("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        attrs.insert("class", merged);
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_round_trip() {
        let doc = parse_fragment("<p>hi</p><blockquote>quoted</blockquote>");
        let html = fragment_html(&doc);
        assert!(html.contains("<p>hi</p>"));
        assert!(html.contains("<blockquote>quoted</blockquote>"));
    }

    #[test]
    fn select_first_list_prefers_earlier_selector() {
        let doc = parse_fragment("<div class=\"gmail_quote\">a</div><blockquote>b</blockquote>");
        let nodes = select_first_list(
            &doc,
            &["blockquote".to_string(), ".gmail_quote".to_string()],
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(inner_html(&nodes[0]), "b");
    }

    #[test]
    fn select_first_list_falls_through_empty_selectors() {
        let doc = parse_fragment("<div class=\"gmail_quote\">a</div>");
        let nodes = select_first_list(
            &doc,
            &["blockquote".to_string(), ".gmail_quote".to_string()],
        );
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let doc = parse_fragment("<p>hi</p>");
        assert!(select_nodes(&doc, "p[[[").is_empty());
    }

    #[test]
    fn replace_inner_html_swaps_children() {
        let doc = parse_fragment("<div id=\"x\"><p>old</p></div>");
        let target = select_nodes(&doc, "#x").remove(0);
        replace_inner_html(&target, "<span>new</span>");
        assert_eq!(inner_html(&target), "<span>new</span>");
    }

    #[test]
    fn add_class_preserves_existing() {
        let doc = parse_fragment("<div class=\"a\">x</div>");
        let node = select_nodes(&doc, "div").remove(0);
        add_class(&node, "b");
        assert!(node.to_string().contains("class=\"a b\""));
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
