use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Ordered CSS-selector fallback lists for each extraction target.
///
/// Host webmail markup churns; keeping these as data means a markup change is
/// a config edit, not a code change. Within a list the first selector that
/// yields matches wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    /// Per-message containers inside a conversation page.
    pub message_containers: Vec<String>,
    /// Regions holding the quoted/expanded reply chain inside one message.
    pub quoted_regions: Vec<String>,
    /// Elements that semantically mark a single quoted reply.
    pub quote_blocks: Vec<String>,
    /// Containers the cleaner strips wholesale from a message's content.
    pub strip_containers: Vec<String>,
    /// Substrings of `img src` values that identify tracking pixels.
    pub tracker_src_hints: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            message_containers: vec![
                "div[role=\"listitem\"]".into(),
                ".h7".into(),
                ".gs".into(),
                ".adn".into(),
            ],
            quoted_regions: vec![
                ".adL".into(),
                ".gmail_quote".into(),
                "blockquote".into(),
                ".gmail_extra".into(),
                "div[dir=\"ltr\"]".into(),
            ],
            quote_blocks: vec!["blockquote".into(), ".gmail_quote".into()],
            strip_containers: vec![
                "blockquote".into(),
                ".gmail_quote".into(),
                ".gmail_extra".into(),
                ".adL".into(),
            ],
            tracker_src_hints: vec![
                "mailtrack".into(),
                "tracking".into(),
                "pixel".into(),
                "beacon".into(),
                "open.gif".into(),
            ],
        }
    }
}

impl SelectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading selector config {}", path.display()))?;
        let cfg = serde_json::from_str(&raw)
            .with_context(|| format!("parsing selector config {}", path.display()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated() {
        let cfg = SelectorConfig::default();
        assert!(!cfg.quote_blocks.is_empty());
        assert_eq!(cfg.quote_blocks[0], "blockquote");
        assert!(cfg.quoted_regions.len() >= 3);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let cfg: SelectorConfig =
            serde_json::from_str(r#"{"quote_blocks": ["q.reply"]}"#).unwrap();
        assert_eq!(cfg.quote_blocks, vec!["q.reply".to_string()]);
        // untouched lists fall back to the defaults
        assert_eq!(cfg.message_containers, SelectorConfig::default().message_containers);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(serde_json::from_str::<SelectorConfig>(r#"{"quote_block": []}"#).is_err());
    }
}
