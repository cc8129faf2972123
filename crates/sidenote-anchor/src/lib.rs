//! Relocates captured text inside the host page and briefly highlights it.
//!
//! The page is reached only through two traits: [`Document`] for read-only
//! text inspection and [`HostSurface`] for the scroll request and background
//! tint. [`HtmlDocument`] provides both over a static HTML string.

use thiserror::Error;

pub mod document;
pub mod highlight;
pub mod html;
pub mod locator;

pub use document::{Document, HostSurface, TextNode};
pub use highlight::Highlighter;
pub use html::{HtmlDocument, HtmlSurface};
pub use locator::{search_phrase, AnchorMatch, Locator};

/// Element id of the annotation panel; text inside it is never a match.
pub const DEFAULT_PANEL_ID: &str = "sidenote-panel";

pub const HIGHLIGHT_TINT: &str = "rgba(255, 235, 59, 0.3)";

/// Leading characters of the captured text used to build the search phrase.
pub const PHRASE_CHAR_LIMIT: usize = 50;
pub const PHRASE_WORD_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("Text not found in current page")]
    AnchorNotFound,
}
