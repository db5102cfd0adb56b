use crate::dom;
use crate::extract::flow;
use crate::model::{Conversation, Message, Side};

/// One-shot marker written onto formatted markup. Every entry point checks
/// it first and bails, which is what makes re-formatting a no-op.
pub const PROCESSED_ATTR: &str = "data-rethread-formatted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Thread,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub view: View,
    pub sort: SortOrder,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            view: View::Thread,
            sort: SortOrder::NewestFirst,
        }
    }
}

/// Build the full formatted container: both views (the non-active one
/// hidden) plus the untouched original markup in a hidden side-container.
///
/// Extraction order is oldest first; newest-first display reverses here, at
/// render time only. Sides are recomputed over the displayed order on every
/// call.
pub fn conversation_view(convo: &Conversation, opts: RenderOptions) -> String {
    let mut ordered: Vec<Message> = convo.messages.clone();
    if opts.sort == SortOrder::NewestFirst {
        ordered.reverse();
    }
    let sides = flow::assign_sides(&ordered);

    let (thread_style, chat_style) = match opts.view {
        View::Thread => ("", " style=\"display:none\""),
        View::Chat => (" style=\"display:none\"", ""),
    };

    format!(
        "<div class=\"rethread-container\" {attr}=\"true\">\
         <div class=\"rethread-conversation rethread-thread-view\"{thread_style}>{thread}</div>\
         <div class=\"rethread-conversation rethread-chat-view\"{chat_style}>{chat}</div>\
         <div class=\"rethread-original\" style=\"display:none\">{raw}</div>\
         </div>",
        attr = PROCESSED_ATTR,
        thread = thread_view(&ordered),
        chat = chat_view(&ordered, &sides),
        raw = convo.raw_html,
    )
}

fn thread_view(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            format!(
                "<div class=\"rethread-message\">\
                 <div class=\"rethread-header\">\
                 <div class=\"rethread-sender\">{sender}</div>\
                 <div class=\"rethread-timestamp\">{timestamp}</div>\
                 </div>\
                 <div class=\"rethread-content\">{content}</div>\
                 </div>",
                sender = dom::escape_html(&message.sender),
                timestamp = dom::escape_html(&message.timestamp),
                content = message.content,
            )
        })
        .collect()
}

fn chat_view(messages: &[Message], sides: &[Side]) -> String {
    messages
        .iter()
        .zip(sides)
        .map(|(message, side)| {
            let side_class = match side {
                Side::Left => "rethread-left",
                Side::Right => "rethread-right",
            };
            format!(
                "<div class=\"rethread-bubble {side_class}\">\
                 <div class=\"rethread-bubble-meta\">\
                 <span class=\"rethread-sender\">{sender}</span> \
                 <span class=\"rethread-timestamp\">{timestamp}</span>\
                 </div>\
                 <div class=\"rethread-bubble-body\">{content}</div>\
                 </div>",
                sender = dom::escape_html(&message.sender),
                timestamp = dom::escape_html(&message.timestamp),
                content = message.content,
            )
        })
        .collect()
}

/// Fallback when no conversation structure could be extracted: a flat copy
/// with quote levels tagged for styling, plus the hidden original and the
/// marker. The user never sees an error, just the plainer view.
pub fn simple_view(raw_html: &str) -> String {
    let doc = dom::parse_fragment(raw_html);
    let quotes = dom::select_nodes(&doc, "blockquote");
    for quote in &quotes {
        dom::add_class(quote, "rethread-simple-quote");
        let nested = quote.ancestors().any(|ancestor| {
            ancestor
                .as_element()
                .map_or(false, |el| el.name.local.as_ref() == "blockquote")
        });
        if nested {
            dom::add_class(quote, "rethread-nested-quote");
        }
    }
    let formatted = dom::fragment_html(&doc);

    format!(
        "<div class=\"rethread-container rethread-simple\" {PROCESSED_ATTR}=\"true\">\
         <div class=\"rethread-simple-content\">{formatted}</div>\
         <div class=\"rethread-original\" style=\"display:none\">{raw_html}</div>\
         </div>"
    )
}
