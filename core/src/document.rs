//! Parsed HTML documents returned for `ResponseMode::Document`.
//!
//! `scraper` trees are not `Send`, so the fallback transport converts the parse
//! result into this owned document before leaving its blocking thread.
//!
//! # Design
//! Nodes live in one flat `Vec` in document order and refer to their children
//! by index. Building, walking, cloning and dropping a document never recurse,
//! so nesting depth in hostile markup cannot exhaust the thread's stack.

use std::collections::HashMap;

use scraper::Html;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    kind: Kind,
    children: Vec<usize>,
}

/// An owned, fully parsed HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    // Preorder; index 0 is the `<html>` element.
    slots: Vec<Slot>,
}

/// A node in a parsed document.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Element(Element<'a>),
    Text(&'a str),
}

/// An HTML element borrowed from its [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    index: usize,
}

impl<'a> Element<'a> {
    fn parts(&self) -> (&'a str, &'a [(String, String)]) {
        match &self.doc.slots[self.index].kind {
            Kind::Element { name, attrs } => (name.as_str(), attrs.as_slice()),
            Kind::Text(_) => ("", &[]),
        }
    }

    pub fn name(&self) -> &'a str {
        self.parts().0
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.parts()
            .1
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        doc.slots[self.index]
            .children
            .iter()
            .map(move |&index| doc.node(index))
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut pending: Vec<usize> = self.doc.slots[self.index].children.clone();
        pending.reverse();
        while let Some(index) = pending.pop() {
            let slot = &self.doc.slots[index];
            match &slot.kind {
                Kind::Text(text) => out.push_str(text),
                Kind::Element { .. } => pending.extend(slot.children.iter().rev()),
            }
        }
        out
    }
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut slots: Vec<Slot> = Vec::new();
        let mut positions: HashMap<_, usize> = HashMap::new();

        // Preorder, so every parent is placed before its children.
        for node in parsed.root_element().descendants() {
            let kind = match node.value() {
                scraper::Node::Element(el) => Kind::Element {
                    name: el.name().to_string(),
                    attrs: el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
                scraper::Node::Text(text) => {
                    let text: &str = &text.text;
                    Kind::Text(text.to_owned())
                }
                _ => continue,
            };
            let parent = node
                .parent()
                .and_then(|parent| positions.get(&parent.id()).copied());
            if !slots.is_empty() && parent.is_none() {
                continue;
            }
            let index = slots.len();
            slots.push(Slot {
                kind,
                children: Vec::new(),
            });
            positions.insert(node.id(), index);
            if let Some(parent) = parent {
                slots[parent].children.push(index);
            }
        }

        Self { slots }
    }

    fn node(&self, index: usize) -> Node<'_> {
        match &self.slots[index].kind {
            Kind::Element { .. } => Node::Element(Element { doc: self, index }),
            Kind::Text(text) => Node::Text(text.as_str()),
        }
    }

    /// The `<html>` element.
    pub fn root(&self) -> Element<'_> {
        Element { doc: self, index: 0 }
    }

    pub fn title(&self) -> Option<String> {
        self.elements_by_tag("title")
            .first()
            .map(|el| el.text().trim().to_string())
    }

    /// Every element named `name`, in document order.
    pub fn elements_by_tag(&self, name: &str) -> Vec<Element<'_>> {
        let name = name.to_ascii_lowercase();
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(&slot.kind, Kind::Element { name: n, .. } if *n == name))
            .map(|(index, _)| Element { doc: self, index })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html lang="en">
  <head><title> Hello </title></head>
  <body>
    <a href="/one">One</a>
    <p>Some <b>bold</b> text</p>
    <a href="/two">Two</a>
  </body>
</html>"#;

    #[test]
    fn parses_title() {
        assert_eq!(Document::parse(PAGE).title().as_deref(), Some("Hello"));
    }

    #[test]
    fn finds_elements_in_document_order() {
        let doc = Document::parse(PAGE);
        let links: Vec<_> = doc
            .elements_by_tag("A")
            .iter()
            .filter_map(|a| a.attr("href"))
            .collect();
        assert_eq!(links, vec!["/one", "/two"]);
    }

    #[test]
    fn element_text_includes_descendants() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.elements_by_tag("p")[0].text(), "Some bold text");
        assert_eq!(doc.root().attr("lang"), Some("en"));
    }

    #[test]
    fn children_keep_source_order() {
        let doc = Document::parse("<p>a<b>b</b>c</p>");
        let p = doc.elements_by_tag("p")[0];
        let kinds: Vec<String> = p
            .children()
            .map(|child| match child {
                Node::Element(el) => format!("<{}>", el.name()),
                Node::Text(text) => text.to_string(),
            })
            .collect();
        assert_eq!(kinds, vec!["a", "<b>", "c"]);
    }

    #[test]
    fn fragments_are_wrapped_in_a_document() {
        let doc = Document::parse("<p>bare</p>");
        assert_eq!(doc.root().name(), "html");
        assert_eq!(doc.elements_by_tag("body").len(), 1);
    }

    #[test]
    fn deep_nesting_fits_on_a_small_stack() {
        const DEPTH: usize = 10_000;
        let html = format!("{}deep{}", "<div>".repeat(DEPTH), "</div>".repeat(DEPTH));

        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                let doc = Document::parse(&html);
                let copy = doc.clone();
                assert_eq!(copy, doc);
                let divs = doc.elements_by_tag("div");
                (divs.len(), divs[0].text(), doc.root().text())
            })
            .unwrap();

        let (divs, outer_text, root_text) = handle.join().unwrap();
        assert_eq!(divs, DEPTH);
        assert_eq!(outer_text, "deep");
        assert_eq!(root_text, "deep");
    }
}
