// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment descriptor document model.
//!
//! A __descriptor__ is a parsed XML deployment configuration document bound
//! to exactly one [`DescriptorSchema`]. The schema is what separates this
//! model from a generic DOM: the grammars behind files like `web.xml`
//! mandate a fixed order for top-level elements, so blindly appending a new
//! `servlet` entry after a `security-constraint` produces a document the
//! container will reject. Every insertion through [`Descriptor::add_element`]
//! therefore lands at the schema-correct position, no matter what order the
//! merge engine happens to process elements in.
//!
//! # Lifecycle
//!
//! A descriptor is created by parsing XML text against a schema, mutated by
//! the merge engine, and serialized back out through its [`Display`]
//! implementation. Nothing is persisted in between.
//!
//! # See Also
//!
//! 1. [`DescriptorSchema`]
//! 2. [`merge`](crate::merge)

pub mod element;
pub mod schema;

use crate::descriptor::{
    element::{Element, Node},
    schema::{DescriptorSchema, DescriptorTag},
};

use std::fmt::{Display, Formatter, Result as FmtResult};

/// An ordered XML document restricted to one schema.
///
/// # Invariant
///
/// - Children of the root inserted via [`Descriptor::add_element`] always
///   satisfy the schema's canonical element order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    schema: DescriptorSchema,
    root: Element,
}

impl Descriptor {
    /// Construct new empty descriptor holding only the schema's root.
    pub fn new(schema: DescriptorSchema) -> Self {
        let root = Element::new(schema.root());
        Self { schema, root }
    }

    /// Parse XML text into a descriptor bound to the given schema.
    ///
    /// Whitespace-only text nodes are dropped; significant text is kept with
    /// surrounding whitespace trimmed.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::Parse`] if the text is not well-formed
    ///   XML.
    /// - Return [`DescriptorError::RootMismatch`] if the document's root
    ///   element is not the one the schema mandates.
    pub fn parse(schema: DescriptorSchema, xml: impl AsRef<str>) -> Result<Self> {
        let document = roxmltree::Document::parse(xml.as_ref())?;
        let node = document.root_element();
        if node.tag_name().name() != schema.root() {
            return Err(DescriptorError::RootMismatch {
                expect: schema.root().to_owned(),
                found: node.tag_name().name().to_owned(),
            });
        }

        let root = element_from_node(node);
        Ok(Self { schema, root })
    }

    /// Schema this descriptor is bound to.
    pub fn schema(&self) -> &DescriptorSchema {
        &self.schema
    }

    /// Root element accessor.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Iterate over top-level elements carrying the given tag name.
    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.root
            .child_elements()
            .filter(move |element| element.name() == name)
    }

    /// Insert a top-level element at its schema-correct position.
    ///
    /// The element lands after the last sibling of the same tag and before
    /// the first sibling whose tag sorts later in the schema's canonical
    /// order. Tags the schema does not know sort after all known tags and
    /// keep their arrival order among themselves.
    pub fn add_element(&mut self, element: Element) {
        let index = self.insert_index(element.name());
        self.root.insert_element(index, element);
    }

    /// Detach the first top-level element matching under the tag's identity
    /// rule.
    ///
    /// Returns the detached subtree, or `None` if nothing matched. Calling
    /// again with the same arguments is a no-op.
    pub fn remove_element(&mut self, tag: &DescriptorTag, element: &Element) -> Option<Element> {
        let index = self.position_of(tag, element)?;
        match self.root.remove_node(index) {
            Node::Element(detached) => Some(detached),
            // Unreachable: position_of only ever reports element nodes.
            Node::Text(_) => None,
        }
    }

    /// Swap a matched top-level element for a replacement, in place.
    ///
    /// The replacement takes the old element's exact position, preserving
    /// document order. Returns `false` and falls back to a schema-ordered
    /// [`Descriptor::add_element`] when the old element is no longer
    /// present.
    pub fn replace_element(
        &mut self,
        tag: &DescriptorTag,
        old: &Element,
        replacement: Element,
    ) -> bool {
        match self.position_of(tag, old) {
            Some(index) => {
                self.root.remove_node(index);
                self.root.insert_element(index, replacement);
                true
            }
            None => {
                self.add_element(replacement);
                false
            }
        }
    }

    fn position_of(&self, tag: &DescriptorTag, element: &Element) -> Option<usize> {
        self.root.children().iter().position(|node| match node {
            Node::Element(candidate) => {
                candidate.name() == element.name() && tag.matches(candidate, element)
            }
            Node::Text(_) => false,
        })
    }

    fn insert_index(&self, name: &str) -> usize {
        let children = self.root.children();
        match self.schema.order_index(name) {
            // INVARIANT: Known tags insert before the first sibling that
            // sorts later; unknown siblings sort last.
            Some(order) => children
                .iter()
                .position(|node| match node {
                    Node::Element(sibling) => {
                        self.schema.order_index(sibling.name()).unwrap_or(usize::MAX) > order
                    }
                    Node::Text(_) => false,
                })
                .unwrap_or(children.len()),
            // INVARIANT: Unknown tags append after their last same-tag
            // sibling, else at the very end.
            None => children
                .iter()
                .rposition(|node| match node {
                    Node::Element(sibling) => sibling.name() == name,
                    Node::Text(_) => false,
                })
                .map(|index| index + 1)
                .unwrap_or(children.len()),
        }
    }
}

impl Display for Descriptor {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        write!(fmt, "{}", self.root)
    }
}

/// Parse a standalone XML fragment into a detached element.
///
/// Used wherever an element arrives outside of a full document, e.g. merge
/// templates configured inline or loaded from a file.
///
/// # Errors
///
/// - Return [`DescriptorError::Parse`] if the fragment is not well-formed
///   XML.
pub fn parse_element(xml: impl AsRef<str>) -> Result<Element> {
    let document = roxmltree::Document::parse(xml.as_ref())?;
    Ok(element_from_node(document.root_element()))
}

fn element_from_node(node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = Element::new(node.tag_name().name());
    for attribute in node.attributes() {
        element.set_attribute(attribute.name(), attribute.value());
    }

    for child in node.children() {
        if child.is_element() {
            element.push_element(element_from_node(child));
        } else if let Some(text) = child.text() {
            let text = text.trim();
            if !text.is_empty() {
                element.push_text(text);
            }
        }
    }

    element
}

/// Descriptor document error types.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// Input text is not well-formed XML.
    #[error(transparent)]
    Parse(#[from] roxmltree::Error),

    /// Document root does not match the schema's mandated root element.
    #[error("expected root element <{expect}>, found <{found}>")]
    RootMismatch { expect: String, found: String },
}

/// Friendly result alias :3
pub type Result<T, E = DescriptorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn named(tag: &str, name_tag: &str, name: &str) -> Element {
        let mut element = Element::new(tag);
        element.push_element(Element::with_text(name_tag, name));
        element
    }

    #[test]
    fn add_element_keeps_schema_order_for_any_insertion_order() {
        let schema = DescriptorSchema::web_app();
        let entries = [
            named("security-constraint", "display-name", "lockdown"),
            named("servlet", "servlet-name", "dispatch"),
            Element::with_text("display-name", "store"),
            named("filter", "filter-name", "audit"),
        ];

        // Insert in reverse grammar order; the document must come out sorted
        // regardless.
        let mut descriptor = Descriptor::new(schema);
        for entry in entries {
            descriptor.add_element(entry);
        }

        let result: Vec<_> = descriptor
            .root()
            .child_elements()
            .map(Element::name)
            .collect();
        let expect = vec!["display-name", "filter", "servlet", "security-constraint"];
        assert_eq!(result, expect);
    }

    #[test]
    fn add_element_groups_same_tag_siblings() {
        let mut descriptor = Descriptor::new(DescriptorSchema::web_app());
        descriptor.add_element(named("servlet", "servlet-name", "first"));
        descriptor.add_element(named("filter", "filter-name", "audit"));
        descriptor.add_element(named("servlet", "servlet-name", "second"));

        let result: Vec<_> = descriptor
            .elements("servlet")
            .map(|servlet| servlet.find_text("servlet-name").unwrap())
            .collect();
        assert_eq!(result, vec!["first", "second"]);
    }

    #[test]
    fn add_element_sorts_unknown_tags_last() {
        let mut descriptor = Descriptor::new(DescriptorSchema::web_app());
        descriptor.add_element(Element::with_text("vendor-extension", "one"));
        descriptor.add_element(named("servlet", "servlet-name", "dispatch"));
        descriptor.add_element(Element::with_text("vendor-extension", "two"));

        let result: Vec<_> = descriptor
            .root()
            .child_elements()
            .map(Element::name)
            .collect();
        let expect = vec!["servlet", "vendor-extension", "vendor-extension"];
        assert_eq!(result, expect);
    }

    #[test]
    fn remove_element_is_idempotent() {
        let schema = DescriptorSchema::web_app();
        let tag = schema.tag("servlet").unwrap().clone();
        let servlet = named("servlet", "servlet-name", "dispatch");

        let mut descriptor = Descriptor::new(schema);
        descriptor.add_element(servlet.clone());

        let result = descriptor.remove_element(&tag, &servlet);
        assert_eq!(result, Some(servlet.clone()));

        let result = descriptor.remove_element(&tag, &servlet);
        assert_eq!(result, None);
    }

    #[test]
    fn replace_element_preserves_position() {
        let schema = DescriptorSchema::web_app();
        let tag = schema.tag("servlet").unwrap().clone();

        let mut descriptor = Descriptor::new(schema);
        descriptor.add_element(named("servlet", "servlet-name", "first"));
        descriptor.add_element(named("servlet", "servlet-name", "second"));
        descriptor.add_element(named("servlet", "servlet-name", "third"));

        let mut replacement = named("servlet", "servlet-name", "second");
        replacement.push_element(Element::with_text("load-on-startup", "1"));
        let old = named("servlet", "servlet-name", "second");
        assert!(descriptor.replace_element(&tag, &old, replacement));

        let result: Vec<_> = descriptor
            .elements("servlet")
            .map(|servlet| servlet.find_text("servlet-name").unwrap())
            .collect();
        assert_eq!(result, vec!["first", "second", "third"]);

        let upgraded = descriptor.elements("servlet").nth(1).unwrap();
        assert_eq!(upgraded.find_text("load-on-startup"), Some("1"));
    }

    #[test]
    fn parse_drops_insignificant_whitespace() -> anyhow::Result<()> {
        let descriptor = Descriptor::parse(
            DescriptorSchema::web_app(),
            indoc! {r#"
                <?xml version="1.0" encoding="UTF-8"?>
                <web-app>
                  <servlet>
                    <servlet-name>dispatch</servlet-name>
                    <servlet-class>org.acme.Dispatch</servlet-class>
                  </servlet>
                </web-app>
            "#},
        )?;

        let servlet = descriptor.elements("servlet").next().unwrap();
        assert_eq!(servlet.find_text("servlet-name"), Some("dispatch"));
        assert_eq!(servlet.children().len(), 2);

        Ok(())
    }

    #[test]
    fn parse_rejects_unexpected_root() {
        let result = Descriptor::parse(DescriptorSchema::web_app(), "<ejb-jar/>");
        assert!(matches!(
            result,
            Err(DescriptorError::RootMismatch { .. })
        ));
    }

    #[test]
    fn display_serializes_with_declaration() -> anyhow::Result<()> {
        let xml = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <web-app>
              <display-name>store</display-name>
              <servlet>
                <servlet-name>dispatch</servlet-name>
                <servlet-class>org.acme.Dispatch</servlet-class>
              </servlet>
            </web-app>
        "#};

        let descriptor = Descriptor::parse(DescriptorSchema::web_app(), xml)?;
        assert_eq!(descriptor.to_string(), xml);

        Ok(())
    }
}
