use crate::{
    AnchorError, Document, Highlighter, HostSurface, DEFAULT_PANEL_ID, PHRASE_CHAR_LIMIT,
    PHRASE_WORD_LIMIT,
};
use std::time::Instant;
use tracing::debug;

/// Leading words of `captured` used as the page search key.
///
/// Takes the first 50 characters, trims them, then keeps at most five
/// whitespace-separated words joined by single spaces.
pub fn search_phrase(captured: &str) -> String {
    let head: String = captured.chars().take(PHRASE_CHAR_LIMIT).collect();
    head.split_whitespace()
        .take(PHRASE_WORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatch<E> {
    pub element: E,
    pub phrase: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Locator {
    panel_id: String,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator {
    pub fn new() -> Self {
        Self {
            panel_id: DEFAULT_PANEL_ID.to_string(),
        }
    }

    pub fn with_panel_id(panel_id: impl Into<String>) -> Self {
        Self {
            panel_id: panel_id.into(),
        }
    }

    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    /// First text node outside the panel containing the search phrase.
    pub fn find<D: Document>(
        &self,
        document: &D,
        captured: &str,
    ) -> Result<AnchorMatch<D::Element>, AnchorError> {
        let phrase = search_phrase(captured);
        if phrase.is_empty() {
            return Err(AnchorError::AnchorNotFound);
        }
        for node in document.text_nodes() {
            if !node.text.contains(&phrase) {
                continue;
            }
            if self.inside_panel(document, &node.element) {
                continue;
            }
            return Ok(AnchorMatch {
                element: node.element,
                phrase,
                text: node.text,
            });
        }
        debug!(event = "anchor_not_found", phrase = %phrase);
        Err(AnchorError::AnchorNotFound)
    }

    /// Find the captured text, scroll its element into view and tint it until
    /// the highlighter's next expired `tick`.
    pub fn locate<D, S>(
        &self,
        document: &D,
        surface: &mut S,
        highlighter: &mut Highlighter<D::Element>,
        captured: &str,
        now: Instant,
    ) -> Result<AnchorMatch<D::Element>, AnchorError>
    where
        D: Document,
        S: HostSurface<D::Element>,
    {
        let found = self.find(document, captured)?;
        surface.scroll_into_view(&found.element);
        highlighter.highlight(surface, &found.element, now);
        debug!(event = "anchor_located", element = ?found.element, phrase = %found.phrase);
        Ok(found)
    }

    fn inside_panel<D: Document>(&self, document: &D, element: &D::Element) -> bool {
        document
            .ancestor_ids(element)
            .iter()
            .any(|id| *id == self.panel_id)
    }
}
