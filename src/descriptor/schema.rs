// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor schema model.
//!
//! A schema describes one kind of deployment descriptor as plain data: the
//! canonical order its grammar mandates for top-level elements, and how
//! instances of each element kind are told apart across two documents. New
//! descriptor kinds are new schema _values_, never new types, so callers can
//! assemble one inline, load one from a merge plan, or grab the bundled
//! `web-app` grammar.
//!
//! # Identity
//!
//! Merging needs to decide when an element in the left document and an
//! element in the right document are "the same". Each tag may carry an
//! [`Identifier`]: a path whose text content acts as the element's key, e.g.
//! `servlet-name` for `servlet` entries. Two same-tag elements match if and
//! only if both keys resolve and compare equal. A tag without an identifier
//! falls back to value equality of the whole subtree, so only literally
//! identical elements pair up.

use crate::descriptor::element::Element;

/// Identity-key extraction policy for one element kind.
///
/// Wraps the path whose first-level text content distinguishes two same-tag
/// elements, e.g. `web-resource-collection/web-resource-name` for
/// `security-constraint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    path: String,
}

impl Identifier {
    /// Construct new identifier from a slash-separated child path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Path evaluated against element instances.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Extract the identity key of an element instance.
    ///
    /// Returns `None` when the path does not resolve, in which case the
    /// element matches nothing during a merge.
    pub fn identify(&self, element: &Element) -> Option<String> {
        element.find_text(&self.path).map(|text| text.trim().to_owned())
    }
}

/// Schema-level metadata for one element kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTag {
    name: String,
    unique: bool,
    identifier: Option<Identifier>,
}

impl DescriptorTag {
    /// Construct new tag allowing multiple instances, with no identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            identifier: None,
        }
    }

    /// Mark this tag as legal at most once per document.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Attach an identity-key path to this tag.
    pub fn identified_by(mut self, path: impl Into<String>) -> Self {
        self.identifier = Some(Identifier::new(path));
        self
    }

    /// Element name this tag describes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether only one instance of this tag is legal per document.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Configured identifier, if any.
    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Identity key of an element instance under this tag's identifier.
    pub fn identity_of(&self, element: &Element) -> Option<String> {
        self.identifier
            .as_ref()
            .and_then(|identifier| identifier.identify(element))
    }

    /// Decide whether two elements count as "the same" under this tag.
    ///
    /// With an identifier: both keys must resolve and compare equal. Without
    /// one: the subtrees must be value-equal.
    pub fn matches(&self, left: &Element, right: &Element) -> bool {
        if left.name() != right.name() {
            return false;
        }

        match &self.identifier {
            Some(identifier) => match (identifier.identify(left), identifier.identify(right)) {
                (Some(left_key), Some(right_key)) => left_key == right_key,
                _ => false,
            },
            None => left == right,
        }
    }
}

/// One deployment descriptor grammar as data.
///
/// The `tags` listing doubles as the canonical order the grammar mandates
/// for children of the root element. Insertion through
/// [`Descriptor::add_element`](crate::descriptor::Descriptor::add_element)
/// keeps documents sorted by this order no matter what sequence elements
/// arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSchema {
    name: String,
    root: String,
    tags: Vec<DescriptorTag>,
}

impl DescriptorSchema {
    /// Construct new schema from a canonical tag ordering.
    pub fn new(
        name: impl Into<String>,
        root: impl Into<String>,
        tags: impl IntoIterator<Item = DescriptorTag>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            tags: tags.into_iter().collect(),
        }
    }

    /// Human-readable schema identifier, e.g. `"web-app-2.3"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the mandated root element.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Look up tag metadata by element name.
    pub fn tag(&self, name: impl AsRef<str>) -> Option<&DescriptorTag> {
        self.tags.iter().find(|tag| tag.name() == name.as_ref())
    }

    /// Position of an element name in the canonical top-level order.
    pub fn order_index(&self, name: impl AsRef<str>) -> Option<usize> {
        self.tags.iter().position(|tag| tag.name() == name.as_ref())
    }

    /// Iterate over tag metadata in canonical order.
    pub fn tags(&self) -> impl Iterator<Item = &DescriptorTag> {
        self.tags.iter()
    }

    /// The Servlet 2.3 `web-app` grammar.
    ///
    /// Canonical element order and the customary identity keys: named
    /// entries key on their name element, mappings key on what they map,
    /// and `security-constraint` keys on the resource collection name.
    pub fn web_app() -> Self {
        Self::new(
            "web-app-2.3",
            "web-app",
            [
                DescriptorTag::new("icon").unique(),
                DescriptorTag::new("display-name").unique(),
                DescriptorTag::new("description").unique(),
                DescriptorTag::new("distributable").unique(),
                DescriptorTag::new("context-param").identified_by("param-name"),
                DescriptorTag::new("filter").identified_by("filter-name"),
                DescriptorTag::new("filter-mapping").identified_by("filter-name"),
                DescriptorTag::new("listener").identified_by("listener-class"),
                DescriptorTag::new("servlet").identified_by("servlet-name"),
                DescriptorTag::new("servlet-mapping").identified_by("url-pattern"),
                DescriptorTag::new("session-config").unique(),
                DescriptorTag::new("mime-mapping").identified_by("extension"),
                DescriptorTag::new("welcome-file-list").unique(),
                DescriptorTag::new("error-page"),
                DescriptorTag::new("taglib").identified_by("taglib-uri"),
                DescriptorTag::new("resource-env-ref").identified_by("resource-env-ref-name"),
                DescriptorTag::new("resource-ref").identified_by("res-ref-name"),
                DescriptorTag::new("security-constraint")
                    .identified_by("web-resource-collection/web-resource-name"),
                DescriptorTag::new("login-config").unique(),
                DescriptorTag::new("security-role").identified_by("role-name"),
                DescriptorTag::new("env-entry").identified_by("env-entry-name"),
                DescriptorTag::new("ejb-ref").identified_by("ejb-ref-name"),
                DescriptorTag::new("ejb-local-ref").identified_by("ejb-ref-name"),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn servlet(name: &str, class: &str) -> Element {
        let mut element = Element::new("servlet");
        element.push_element(Element::with_text("servlet-name", name));
        element.push_element(Element::with_text("servlet-class", class));
        element
    }

    #[test]
    fn identifier_extracts_trimmed_key() {
        let identifier = Identifier::new("servlet-name");
        let mut element = Element::new("servlet");
        element.push_element(Element::with_text("servlet-name", "  dispatch \n"));

        let result = identifier.identify(&element);
        assert_eq!(result, Some("dispatch".into()));
    }

    #[test]
    fn identifier_missing_path_yields_none() {
        let identifier = Identifier::new("servlet-name");
        let element = Element::new("servlet");
        assert_eq!(identifier.identify(&element), None);
    }

    #[test]
    fn tag_matches_by_identity_key() {
        let tag = DescriptorTag::new("servlet").identified_by("servlet-name");
        let left = servlet("dispatch", "org.acme.Old");
        let right = servlet("dispatch", "org.acme.New");
        let other = servlet("upload", "org.acme.Upload");

        assert!(tag.matches(&left, &right));
        assert!(!tag.matches(&left, &other));
    }

    #[test]
    fn tag_without_identifier_matches_by_value() {
        let tag = DescriptorTag::new("error-page");
        let left = Element::with_text("error-page", "404");
        let same = Element::with_text("error-page", "404");
        let other = Element::with_text("error-page", "500");

        assert!(tag.matches(&left, &same));
        assert!(!tag.matches(&left, &other));
    }

    #[test]
    fn tag_with_unresolvable_key_matches_nothing() {
        let tag = DescriptorTag::new("servlet").identified_by("servlet-name");
        let anonymous = Element::new("servlet");

        assert!(!tag.matches(&anonymous, &anonymous.clone()));
    }

    #[test]
    fn web_app_order_follows_grammar() {
        let schema = DescriptorSchema::web_app();

        let filter = schema.order_index("filter").unwrap();
        let servlet = schema.order_index("servlet").unwrap();
        let constraint = schema.order_index("security-constraint").unwrap();
        assert!(filter < servlet);
        assert!(servlet < constraint);
        assert_eq!(schema.order_index("no-such-tag"), None);
    }
}
