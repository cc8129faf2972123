use crate::{Document, HostSurface, TextNode};
use ego_tree::{NodeId, NodeRef};
use scraper::{node::Node, ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};

/// A parsed, static HTML page.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// Search root: `<body>`, so head text such as `<title>` never matches.
    fn body(&self) -> NodeRef<'_, Node> {
        let selector = Selector::parse("body").expect("valid selector");
        let body = self.html.select(&selector).next().map(|body| *body);
        body.unwrap_or_else(|| self.html.tree.root())
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Short selector-like label such as `p#intro.lead`.
    pub fn describe(&self, id: NodeId) -> String {
        let Some(element) = self.element(id) else {
            return "#text".to_string();
        };
        let value = element.value();
        let mut label = value.name().to_string();
        if let Some(id) = value.id() {
            label.push('#');
            label.push_str(id);
        }
        for class in value.classes() {
            label.push('.');
            label.push_str(class);
        }
        label
    }

    /// Background declared in the element's inline `style` attribute.
    pub fn inline_background(&self, id: NodeId) -> Option<String> {
        let style = self.element(id)?.value().attr("style")?;
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(name, _)| {
                let name = name.trim();
                name.eq_ignore_ascii_case("background-color")
                    || name.eq_ignore_ascii_case("background")
            })
            .map(|(_, value)| value.trim().to_string())
            .last()
    }
}

fn text_parent(node: &NodeRef<'_, Node>) -> Option<NodeId> {
    node.parent()
        .filter(|parent| parent.value().is_element())
        .map(|parent| parent.id())
}

impl Document for HtmlDocument {
    type Element = NodeId;

    fn text_nodes(&self) -> Vec<TextNode<NodeId>> {
        self.body()
            .descendants()
            .filter_map(|node| {
                let Node::Text(text) = node.value() else {
                    return None;
                };
                if text.trim().is_empty() {
                    return None;
                }
                Some(TextNode {
                    text: text.to_string(),
                    element: text_parent(&node)?,
                })
            })
            .collect()
    }

    fn ancestor_ids(&self, element: &NodeId) -> Vec<String> {
        let Some(node) = self.html.tree.get(*element) else {
            return Vec::new();
        };
        std::iter::once(node)
            .chain(node.ancestors())
            .filter_map(ElementRef::wrap)
            .filter_map(|el| el.value().id().map(str::to_string))
            .collect()
    }
}

/// Style overlay for an [`HtmlDocument`].
///
/// The parsed tree is read-only, so background writes and scroll requests are
/// recorded here. Reads fall back to the inline style of the source page.
pub struct HtmlSurface<'a> {
    document: &'a HtmlDocument,
    backgrounds: HashMap<NodeId, Option<String>>,
    detached: HashSet<NodeId>,
    scrolled: Vec<NodeId>,
}

impl<'a> HtmlSurface<'a> {
    pub fn new(document: &'a HtmlDocument) -> Self {
        Self {
            document,
            backgrounds: HashMap::new(),
            detached: HashSet::new(),
            scrolled: Vec::new(),
        }
    }

    /// Mark an element as removed from the page.
    pub fn detach(&mut self, element: NodeId) {
        self.detached.insert(element);
    }

    pub fn scrolled(&self) -> &[NodeId] {
        &self.scrolled
    }
}

impl HostSurface<NodeId> for HtmlSurface<'_> {
    fn scroll_into_view(&mut self, element: &NodeId) {
        self.scrolled.push(*element);
    }

    fn background(&self, element: &NodeId) -> Option<String> {
        match self.backgrounds.get(element) {
            Some(color) => color.clone(),
            None => self.document.inline_background(*element),
        }
    }

    fn set_background(&mut self, element: &NodeId, color: Option<String>) {
        self.backgrounds.insert(*element, color);
    }

    fn is_attached(&self, element: &NodeId) -> bool {
        self.document.html.tree.get(*element).is_some() && !self.detached.contains(element)
    }
}
