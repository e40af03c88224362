// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor element model.
//!
//! Owned value representation of an XML element inside a deployment
//! descriptor. Elements are plain data: they can be cloned out of one
//! document and inserted into another without carrying any document handle
//! around, which is exactly what the merge engine needs when it shuttles
//! subtrees between a left document, a right document, and the target being
//! built.
//!
//! # Path Lookup
//!
//! Elements support a small slash-separated lookup syntax, e.g.
//! `"web-resource-collection/web-resource-name"`. Each step descends into the
//! _first_ child element carrying that name. This is the lookup used both by
//! identity extraction and by template token substitution, so the
//! first-match rule keeps the two consistent.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// A single node within an element's child list.
///
/// Whitespace-only text is dropped at parse time, so a `Text` node always
/// carries significant content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element detached from any owning document.
///
/// # Invariant
///
/// - Child order is preserved exactly as constructed; ordering policy lives
///   in [`Descriptor`](crate::descriptor::Descriptor), not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Construct new empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Construct new element holding a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.push_text(text);
        element
    }

    /// Tag name of this element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: impl AsRef<str>) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name.as_ref())
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any previous value under the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Iterate over attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// All child nodes in document order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Iterate over child elements only, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Append a child element at the end of the child list.
    pub fn push_element(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    /// Insert a child element at a specific index of the child list.
    ///
    /// Indices past the end are clamped to an append.
    pub fn insert_element(&mut self, index: usize, element: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(element));
    }

    /// Append a text node at the end of the child list.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Detach the child node at the given index.
    pub(crate) fn remove_node(&mut self, index: usize) -> Node {
        self.children.remove(index)
    }

    /// First-level text content of this element.
    ///
    /// Returns the first text child, if any. Mixed content keeps only its
    /// leading text for identity purposes.
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            Node::Element(_) => None,
        })
    }

    /// Resolve a slash-separated child path to the first matching element.
    ///
    /// An empty path resolves to `self`.
    pub fn find(&self, path: impl AsRef<str>) -> Option<&Element> {
        let mut current = self;
        for step in path.as_ref().split('/').filter(|step| !step.is_empty()) {
            current = current
                .child_elements()
                .find(|child| child.name() == step)?;
        }

        Some(current)
    }

    /// Resolve a slash-separated child path to its first-level text content.
    pub fn find_text(&self, path: impl AsRef<str>) -> Option<&str> {
        self.find(path).and_then(Element::text)
    }

    /// Visit every text node in this subtree with a mutable closure.
    ///
    /// Traversal is depth-first in document order. Used by template
    /// substitution to rewrite placeholder tokens in place.
    pub fn visit_text_mut(&mut self, visit: &mut dyn FnMut(&mut String)) {
        for node in &mut self.children {
            match node {
                Node::Text(text) => visit(text),
                Node::Element(element) => element.visit_text_mut(visit),
            }
        }
    }
}

impl Display for Element {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write_element(fmt, self, 0)
    }
}

fn write_element(fmt: &mut Formatter<'_>, element: &Element, depth: usize) -> FmtResult {
    let pad = "  ".repeat(depth);
    write!(fmt, "{pad}<{}", element.name())?;
    for (key, value) in element.attributes() {
        write!(fmt, " {key}=\"{}\"", escape(value))?;
    }

    if element.children.is_empty() {
        return writeln!(fmt, "/>");
    }

    // INVARIANT: Elements holding only text render on one line.
    let text_only = element
        .children
        .iter()
        .all(|node| matches!(node, Node::Text(_)));
    if text_only {
        write!(fmt, ">")?;
        for node in &element.children {
            if let Node::Text(text) = node {
                write!(fmt, "{}", escape(text))?;
            }
        }
        return writeln!(fmt, "</{}>", element.name());
    }

    writeln!(fmt, ">")?;
    for node in &element.children {
        match node {
            Node::Element(child) => write_element(fmt, child, depth + 1)?,
            Node::Text(text) => writeln!(fmt, "{pad}  {}", escape(text))?,
        }
    }
    writeln!(fmt, "{pad}</{}>", element.name())
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn servlet() -> Element {
        let mut element = Element::new("servlet");
        element.push_element(Element::with_text("servlet-name", "dispatch"));
        element.push_element(Element::with_text("servlet-class", "org.acme.Dispatch"));
        let mut param = Element::new("init-param");
        param.push_element(Element::with_text("param-name", "debug"));
        param.push_element(Element::with_text("param-value", "true"));
        element.push_element(param);
        element
    }

    #[test]
    fn find_resolves_first_match() {
        let element = servlet();

        let result = element.find_text("servlet-name");
        assert_eq!(result, Some("dispatch"));

        let result = element.find_text("init-param/param-value");
        assert_eq!(result, Some("true"));

        let result = element.find_text("init-param/no-such-child");
        assert_eq!(result, None);
    }

    #[test]
    fn find_empty_path_resolves_to_self() {
        let element = Element::with_text("display-name", "store");
        let result = element.find("").map(Element::name);
        assert_eq!(result, Some("display-name"));
    }

    #[test]
    fn text_skips_nested_elements() {
        let element = servlet();
        assert_eq!(element.text(), None);
        assert_eq!(element.find("servlet-class").and_then(Element::text), Some("org.acme.Dispatch"));
    }

    #[test]
    fn visit_text_mut_reaches_whole_subtree() {
        let mut element = servlet();
        element.visit_text_mut(&mut |text| *text = text.to_uppercase());

        assert_eq!(element.find_text("servlet-name"), Some("DISPATCH"));
        assert_eq!(element.find_text("init-param/param-name"), Some("DEBUG"));
    }

    #[test]
    fn display_renders_indented_subtree() {
        let result = servlet().to_string();
        let expect = indoc! {r#"
            <servlet>
              <servlet-name>dispatch</servlet-name>
              <servlet-class>org.acme.Dispatch</servlet-class>
              <init-param>
                <param-name>debug</param-name>
                <param-value>true</param-value>
              </init-param>
            </servlet>
        "#};
        assert_eq!(result, expect);
    }

    #[test]
    fn display_escapes_markup() {
        let mut element = Element::with_text("param-value", "a < b && c > d");
        element.set_attribute("id", "\"quoted\"");
        let result = element.to_string();
        let expect = "<param-value id=\"&quot;quoted&quot;\">a &lt; b &amp;&amp; c &gt; d</param-value>\n";
        assert_eq!(result, expect);
    }
}
