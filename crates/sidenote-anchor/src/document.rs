use std::fmt::Debug;

/// A run of text and the element that directly contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode<E> {
    pub text: String,
    pub element: E,
}

pub trait Document {
    type Element: Clone + Eq + Debug;

    /// Every text node in document order.
    fn text_nodes(&self) -> Vec<TextNode<Self::Element>>;

    /// `id` attributes of `element` and its ancestors, nearest first.
    fn ancestor_ids(&self, element: &Self::Element) -> Vec<String>;
}

/// The writes the locator and highlighter are allowed to make.
///
/// `None` as a background means no explicit inline color, which is distinct
/// from any color value and must round-trip through a highlight.
pub trait HostSurface<E> {
    fn scroll_into_view(&mut self, element: &E);
    fn background(&self, element: &E) -> Option<String>;
    fn set_background(&mut self, element: &E, color: Option<String>);
    fn is_attached(&self, element: &E) -> bool;
}
