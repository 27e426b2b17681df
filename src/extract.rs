//! Turns raw markup into a title and the visible text of its body.
//!
//! Input is parsed as an HTML5 document. The HTML5 parsing algorithm recovers
//! from any malformed input, so extraction never fails: the worst case is an
//! empty title and body. Plain-text and Markdown files end up wrapped in an
//! implicit `<body>`, so their whole content becomes the body and the title
//! stays empty.

use scraper::{Html, Node};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub body: String,
}

pub fn extract(raw: &[u8]) -> Extracted {
    let source = String::from_utf8_lossy(raw);
    if source.trim().is_empty() {
        return Extracted::default();
    }

    let html = Html::parse_document(&source);
    let root = html.tree.root();

    let title = root
        .descendants()
        .find(|node| is_element(node.value(), "title") && node.has_children())
        .and_then(|node| node.first_child())
        .and_then(|child| child.value().as_text().map(|text| text.trim().to_string()))
        .unwrap_or_default();

    let body = root
        .descendants()
        .find(|node| is_element(node.value(), "body"))
        .map(|body| join_text(body.descendants().map(|node| node.value())))
        .unwrap_or_default();

    Extracted { title, body }
}

fn is_element(node: &Node, name: &str) -> bool {
    node.as_element()
        .is_some_and(|element| element.name() == name)
}

/// Joins the non-blank text nodes, each followed by one space.
fn join_text<'a>(nodes: impl Iterator<Item = &'a Node>) -> String {
    let mut out = String::new();
    for node in nodes {
        let Some(text) = node.as_text() else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        out.push_str(text);
        out.push(' ');
    }
    out
}
