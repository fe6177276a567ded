use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::ParseError;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("Invalid script selector"));

// Used when the DOM parser finds nothing, e.g. scripts swallowed by <noscript>/<textarea>
static SCRIPT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script\b([^>]*)>(.*?)</script\s*>"#).expect("Invalid script tag regex")
});

static ID_ATTR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bid\s*=\s*["']?([^"'\s>]+)"#).expect("Invalid id attribute regex")
});

/// Text of one `<script>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    /// Position among the document's script elements.
    pub index: usize,
    pub id: Option<String>,
    pub text: String,
    /// Built from decoded payload rather than read from the page.
    pub synthetic: bool,
}

impl ScriptBlock {
    pub fn new(index: usize, id: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            index,
            id: id.map(str::to_string),
            text: text.into(),
            synthetic: false,
        }
    }

    pub fn synthetic(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            text: text.into(),
            synthetic: true,
        }
    }
}

/// Ordered script blocks of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptSet {
    blocks: Vec<ScriptBlock>,
}

impl ScriptSet {
    pub fn new(blocks: Vec<ScriptBlock>) -> Self {
        Self { blocks }
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let blocks = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| ScriptBlock::new(index, None, text))
            .collect();
        Self { blocks }
    }

    pub fn blocks(&self) -> &[ScriptBlock] {
        &self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptBlock> {
        self.blocks.iter()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|block| block.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// This set followed by `other`.
    pub fn chained(&self, other: &ScriptSet) -> ScriptSet {
        let mut blocks = self.blocks.clone();
        blocks.extend(other.blocks.iter().cloned());
        ScriptSet { blocks }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub scripts: ScriptSet,
    /// The DOM parser found nothing and the regex scan was used.
    pub permissive: bool,
}

/// Collects the non-empty script blocks of an HTML document.
pub fn parse_document(html: &str) -> Result<ParsedDocument, ParseError> {
    let trimmed = html.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    if !trimmed.contains('<') {
        // A saved API response rather than a page
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            debug!("Document has no markup, treating it as a single JSON payload");
            return Ok(ParsedDocument {
                scripts: ScriptSet::new(vec![ScriptBlock::new(0, None, trimmed)]),
                permissive: true,
            });
        }
        return Err(ParseError::NoMarkup);
    }

    let document = Html::parse_document(html);
    let blocks: Vec<ScriptBlock> = document
        .select(&SCRIPT_SELECTOR)
        .enumerate()
        .filter_map(|(index, element)| {
            let text = element.text().collect::<String>();
            if text.trim().is_empty() {
                return None;
            }
            Some(ScriptBlock::new(index, element.value().attr("id"), text))
        })
        .collect();

    if !blocks.is_empty() {
        debug!("Found {} non-empty script blocks", blocks.len());
        return Ok(ParsedDocument {
            scripts: ScriptSet::new(blocks),
            permissive: false,
        });
    }

    let recovered = scan_script_tags(html);
    debug!("Permissive scan recovered {} script blocks", recovered.len());
    Ok(ParsedDocument {
        permissive: !recovered.is_empty(),
        scripts: ScriptSet::new(recovered),
    })
}

fn scan_script_tags(html: &str) -> Vec<ScriptBlock> {
    SCRIPT_TAG_REGEX
        .captures_iter(html)
        .enumerate()
        .filter_map(|(index, cap)| {
            let text = cap.get(2)?.as_str();
            if text.trim().is_empty() {
                return None;
            }
            let id = cap
                .get(1)
                .and_then(|attrs| ID_ATTR_REGEX.captures(attrs.as_str()))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str());
            Some(ScriptBlock::new(index, id, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_scripts_with_ids() {
        let html = r#"<html><head>
            <script src="/app.js"></script>
            <script id="__NEXT_DATA__" type="application/json">{"props":{}}</script>
            </head><body><script>window.a = 1;</script></body></html>"#;
        let parsed = parse_document(html).unwrap();
        assert!(!parsed.permissive);
        assert_eq!(parsed.scripts.len(), 2);
        assert_eq!(parsed.scripts.blocks()[0].id.as_deref(), Some("__NEXT_DATA__"));
        assert_eq!(parsed.scripts.blocks()[0].index, 1);
        assert_eq!(parsed.scripts.blocks()[1].text, "window.a = 1;");
        assert!(parsed.scripts.iter().all(|block| !block.synthetic));
    }

    #[test]
    fn recovers_scripts_hidden_from_the_dom() {
        let html = r#"<html><body><textarea><script id="state">{"a":1}</script></textarea></body></html>"#;
        let parsed = parse_document(html).unwrap();
        assert!(parsed.permissive);
        assert_eq!(parsed.scripts.len(), 1);
        assert_eq!(parsed.scripts.blocks()[0].id.as_deref(), Some("state"));
        assert_eq!(parsed.scripts.blocks()[0].text, r#"{"a":1}"#);
    }

    #[test]
    fn empty_and_markupless_documents_fail() {
        assert!(matches!(parse_document("  \n"), Err(ParseError::EmptyDocument)));
        assert!(matches!(parse_document("just text"), Err(ParseError::NoMarkup)));
    }

    #[test]
    fn bare_json_is_one_block() {
        let parsed = parse_document(r#"{"attributeId":"c_brand"}"#).unwrap();
        assert_eq!(parsed.scripts.len(), 1);
    }
}
