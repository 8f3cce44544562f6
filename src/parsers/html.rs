//! Listing extraction from marketplace search pages.
//!
//! The heuristics only need a handful of tree capabilities (element name,
//! attributes, text, parent, next sibling, descendants) so they are written
//! against [`DocNode`]. [`ScraperNode`] adapts a parsed `scraper` document;
//! tests drive the same functions with hand-built trees.
//!
//! For every anchor whose `href` starts with the listing path prefix:
//! - Title is the anchor's trimmed text, URL is `base_domain + href`.
//! - The container is the anchor's nearest `div` ancestor.
//! - Price is the first text node under the container containing `$`.
//! - Asset type is the text of the first `span` under the container.
//! - Short description is the text of the container's next sibling node.
//!
//! Any auxiliary field that cannot be found is an empty string.

use ego_tree::NodeRef;
use scraper::{Html, Node};

use crate::models::ListingRow;

pub const CONTAINER_TAG: &str = "div";
pub const ASSET_TYPE_TAG: &str = "span";
pub const PRICE_MARKER: char = '$';

pub trait DocNode: Sized {
    /// Tag name for elements, `None` for text and other nodes.
    fn element_name(&self) -> Option<&str>;
    fn attr(&self, name: &str) -> Option<&str>;
    /// The text of a text node, `None` for everything else.
    fn own_text(&self) -> Option<&str>;
    fn parent(&self) -> Option<Self>;
    fn next_sibling(&self) -> Option<Self>;
    /// Every node below this one in document order, excluding itself.
    fn descendants(&self) -> Vec<Self>;

    fn text_content(&self) -> String {
        if let Some(text) = self.own_text() {
            return text.to_string();
        }
        let nodes = self.descendants();
        nodes.iter().filter_map(DocNode::own_text).collect()
    }
}

/// Where listing anchors point and how to turn them into absolute URLs.
#[derive(Debug, Clone)]
pub struct ListingLayout {
    pub base_domain: String,
    pub path_prefix: String,
}

pub fn find_container<N: DocNode>(node: &N) -> Option<N> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if candidate.element_name() == Some(CONTAINER_TAG) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

pub fn price_text<N: DocNode>(container: &N) -> String {
    container
        .descendants()
        .iter()
        .filter_map(DocNode::own_text)
        .find(|text| text.contains(PRICE_MARKER))
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

pub fn asset_type<N: DocNode>(container: &N) -> String {
    container
        .descendants()
        .iter()
        .find(|n| n.element_name() == Some(ASSET_TYPE_TAG))
        .map(|n| n.text_content().trim().to_string())
        .unwrap_or_default()
}

pub fn short_description<N: DocNode>(container: &N) -> String {
    container
        .next_sibling()
        .map(|sibling| sibling.text_content().trim().to_string())
        .unwrap_or_default()
}

/// `None` when the node is not a listing anchor or has no `href`.
pub fn listing_row<N: DocNode>(anchor: &N, layout: &ListingLayout) -> Option<ListingRow> {
    if anchor.element_name() != Some("a") {
        return None;
    }
    let href = anchor.attr("href")?;
    if !href.starts_with(&layout.path_prefix) {
        return None;
    }

    let title = anchor.text_content().trim().to_string();
    let url = format!("{}{}", layout.base_domain, href);

    let (price, asset, short_desc) = match find_container(anchor) {
        Some(container) => (
            price_text(&container),
            asset_type(&container),
            short_description(&container),
        ),
        None => Default::default(),
    };

    Some(ListingRow::marketplace(title, url, price, asset, short_desc))
}

pub fn extract_listings<N: DocNode>(root: &N, layout: &ListingLayout) -> Vec<ListingRow> {
    root.descendants()
        .iter()
        .filter_map(|node| listing_row(node, layout))
        .collect()
}

/// Parses `body` and returns one row per listing anchor, in document order.
pub fn extract_html(body: &str, layout: &ListingLayout) -> Vec<ListingRow> {
    let document = Html::parse_document(body);
    extract_listings(&ScraperNode::from(document.tree.root()), layout)
}

#[derive(Clone, Copy)]
pub struct ScraperNode<'a>(NodeRef<'a, Node>);

impl<'a> From<NodeRef<'a, Node>> for ScraperNode<'a> {
    fn from(node: NodeRef<'a, Node>) -> Self {
        ScraperNode(node)
    }
}

impl<'a> DocNode for ScraperNode<'a> {
    fn element_name(&self) -> Option<&str> {
        self.0.value().as_element().map(|e| e.name())
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.0.value().as_element().and_then(|e| e.attr(name))
    }

    fn own_text(&self) -> Option<&str> {
        self.0.value().as_text().map(|t| &**t)
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().map(ScraperNode)
    }

    fn next_sibling(&self) -> Option<Self> {
        self.0.next_sibling().map(ScraperNode)
    }

    fn descendants(&self) -> Vec<Self> {
        self.0.descendants().skip(1).map(ScraperNode).collect()
    }
}
