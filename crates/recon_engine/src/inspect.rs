//! Read-only queries over a snapshot of the live page.

use std::collections::BTreeMap;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InspectError {
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Plain-data view of one matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    node: NodeId,
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
}

impl ElementHandle {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Raw text content of the element and its descendants.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text content with whitespace runs collapsed and the ends trimmed.
    pub fn normalized_text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn class_name(&self) -> &str {
        self.attribute("class").unwrap_or("")
    }
}

pub trait PageInspector {
    /// URL of the inspected page.
    fn url(&self) -> &str;

    /// Visible text of the whole page.
    fn extract_text(&self) -> String;

    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, InspectError>;

    /// Matches of `selector` among the descendants of `scope`.
    fn query_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, InspectError>;
}

/// `PageInspector` over a parsed HTML document.
pub struct HtmlInspector {
    url: String,
    document: Html,
}

impl HtmlInspector {
    pub fn parse(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
        }
    }
}

impl PageInspector for HtmlInspector {
    fn url(&self) -> &str {
        &self.url
    }

    fn extract_text(&self) -> String {
        let mut text = VisibleText::default();
        for child in self.document.root_element().children() {
            collect_visible_text(child, &mut text);
        }
        text.finish()
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, InspectError> {
        let parsed = parse_selector(selector)?;
        Ok(self.document.select(&parsed).map(to_handle).collect())
    }

    fn query_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, InspectError> {
        let parsed = parse_selector(selector)?;
        let Some(element) = self.document.tree.get(scope.node).and_then(ElementRef::wrap) else {
            return Ok(Vec::new());
        };
        Ok(element.select(&parsed).map(to_handle).collect())
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, InspectError> {
    Selector::parse(selector).map_err(|err| InspectError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{err:?}"),
    })
}

fn to_handle(element: ElementRef<'_>) -> ElementHandle {
    let value = element.value();
    ElementHandle {
        node: element.id(),
        tag: value.name().to_ascii_lowercase(),
        text: element.text().collect(),
        attributes: value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    }
}

fn collect_visible_text(node: NodeRef<'_, Node>, text: &mut VisibleText) {
    match node.value() {
        Node::Text(content) => text.append(content),
        Node::Element(element) => {
            let tag = element.name().to_ascii_lowercase();
            match tag.as_str() {
                "script" | "style" | "noscript" | "template" | "head" => {}
                _ => {
                    let block = is_block(&tag);
                    if block {
                        text.boundary();
                    }
                    for child in node.children() {
                        collect_visible_text(child, text);
                    }
                    if block {
                        text.boundary();
                    }
                }
            }
        }
        _ => {
            for child in node.children() {
                collect_visible_text(child, text);
            }
        }
    }
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "nav"
            | "aside"
            | "main"
            | "figure"
            | "figcaption"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "blockquote"
            | "address"
            | "ul"
            | "ol"
            | "li"
            | "br"
            | "hr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "option"
            | "form"
            | "label"
    )
}

#[derive(Default)]
struct VisibleText {
    builder: String,
    last_char: Option<char>,
}

impl VisibleText {
    fn append(&mut self, content: &str) {
        for ch in content.chars() {
            if ch.is_whitespace() {
                self.boundary();
            } else {
                self.builder.push(ch);
                self.last_char = Some(ch);
            }
        }
    }

    fn boundary(&mut self) {
        if self.builder.is_empty() || self.last_char == Some(' ') {
            return;
        }
        self.builder.push(' ');
        self.last_char = Some(' ');
    }

    fn finish(self) -> String {
        self.builder.trim_end().to_string()
    }
}
