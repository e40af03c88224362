// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Merge conflict strategies.
//!
//! A strategy decides what happens to one element group during a merge. The
//! orchestrator never switches on strategy type: it always invokes whichever
//! of the three callbacks matches the observed membership of an element
//! (left-only, right-only, or identity-matched on both sides), and the
//! strategy mutates the target descriptor in response.
//!
//! All three callbacks are required. There is no silent inherited default;
//! the deliberate no-op lives in [`Skip`], which any composite strategy can
//! hold wherever "do nothing" is the intended policy. Since the target is
//! seeded from the left document, a no-op keeps the existing configuration.
//!
//! # Per-Group State Machine
//!
//! Each element group resolves exactly once, synchronously:
//! __Unseen → {LeftOnly, RightOnly, Both} → Resolved__. There is no retry or
//! partial-failure state; an error aborts the whole merge.

use crate::{
    descriptor::{
        self,
        element::Element,
        schema::DescriptorTag,
        Descriptor,
    },
    merge::{MergePair, Result},
};

use regex::Regex;
use std::{collections::HashMap, sync::OnceLock};
use tracing::warn;

/// Per-tag conflict resolution policy.
///
/// Each callback returns the count of elements it merged into the target;
/// zero means the element was deliberately dropped. Strategies hold only
/// configuration, never per-merge state, so one instance may serve any
/// number of sequential merges.
pub trait MergeStrategy {
    /// Element appears only in the left document.
    fn in_left(&self, target: &mut Descriptor, tag: &DescriptorTag, left: &Element)
        -> Result<usize>;

    /// Element appears only in the right document.
    fn in_right(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        right: &Element,
    ) -> Result<usize>;

    /// An identity-matched pair appears on both sides.
    fn in_both(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        pair: MergePair<'_>,
    ) -> Result<usize>;
}

/// The documented no-op strategy.
///
/// Leaves the target untouched for every membership, meaning left-side
/// content survives as-is and incoming right-side content is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Skip;

impl MergeStrategy for Skip {
    fn in_left(&self, _: &mut Descriptor, _: &DescriptorTag, _: &Element) -> Result<usize> {
        Ok(0)
    }

    fn in_right(&self, _: &mut Descriptor, _: &DescriptorTag, _: &Element) -> Result<usize> {
        Ok(0)
    }

    fn in_both(&self, _: &mut Descriptor, _: &DescriptorTag, _: MergePair<'_>) -> Result<usize> {
        Ok(0)
    }
}

/// Favor the existing configuration, add only what is missing.
///
/// Right-only elements are copied into the target; matched pairs keep the
/// left subtree untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Preserve;

impl MergeStrategy for Preserve {
    fn in_left(&self, _: &mut Descriptor, _: &DescriptorTag, _: &Element) -> Result<usize> {
        Ok(0)
    }

    fn in_right(
        &self,
        target: &mut Descriptor,
        _: &DescriptorTag,
        right: &Element,
    ) -> Result<usize> {
        target.add_element(right.clone());
        Ok(1)
    }

    fn in_both(&self, _: &mut Descriptor, _: &DescriptorTag, _: MergePair<'_>) -> Result<usize> {
        Ok(0)
    }
}

/// Right-hand document values always win on conflict.
///
/// Right-only elements are added; matched pairs drop the left subtree and
/// take the right one instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overwrite;

impl MergeStrategy for Overwrite {
    fn in_left(&self, _: &mut Descriptor, _: &DescriptorTag, _: &Element) -> Result<usize> {
        Ok(0)
    }

    fn in_right(
        &self,
        target: &mut Descriptor,
        _: &DescriptorTag,
        right: &Element,
    ) -> Result<usize> {
        target.add_element(right.clone());
        Ok(1)
    }

    fn in_both(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        pair: MergePair<'_>,
    ) -> Result<usize> {
        target.remove_element(tag, pair.left);
        target.add_element(pair.right.clone());
        Ok(1)
    }
}

/// Pick the strategy applicable to one element instance.
///
/// The extension point for dispatch criteria beyond identity keys, e.g. by
/// attribute value or element position.
pub trait StrategySelector {
    /// Resolve the strategy to forward an element's callbacks to.
    fn select(&self, tag: &DescriptorTag, element: &Element) -> &dyn MergeStrategy;
}

/// Generic dispatching strategy.
///
/// Implements all three callbacks by resolving the applicable strategy
/// through its selector and forwarding. For [`MergeStrategy::in_both`] the
/// left element drives selection.
#[derive(Debug)]
pub struct ChoiceStrategy<S>
where
    S: StrategySelector,
{
    selector: S,
}

impl<S> ChoiceStrategy<S>
where
    S: StrategySelector,
{
    /// Construct new dispatching strategy over a selector.
    pub fn new(selector: S) -> Self {
        Self { selector }
    }
}

impl<S> MergeStrategy for ChoiceStrategy<S>
where
    S: StrategySelector,
{
    fn in_left(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        left: &Element,
    ) -> Result<usize> {
        self.selector.select(tag, left).in_left(target, tag, left)
    }

    fn in_right(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        right: &Element,
    ) -> Result<usize> {
        self.selector.select(tag, right).in_right(target, tag, right)
    }

    fn in_both(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        pair: MergePair<'_>,
    ) -> Result<usize> {
        self.selector
            .select(tag, pair.left)
            .in_both(target, tag, pair)
    }
}

/// Identity-key selector backing [`ChooseByIdentity`].
///
/// Maps identity keys to strategies with a default fallback, so different
/// elements of the _same_ tag can merge under different policies.
pub struct IdentitySelector {
    default_strategy: Box<dyn MergeStrategy>,
    by_key: HashMap<String, Box<dyn MergeStrategy>>,
}

impl StrategySelector for IdentitySelector {
    fn select(&self, tag: &DescriptorTag, element: &Element) -> &dyn MergeStrategy {
        tag.identity_of(element)
            .and_then(|key| self.by_key.get(&key))
            .map(Box::as_ref)
            .unwrap_or(self.default_strategy.as_ref())
    }
}

/// Dispatch by identity key with a default fallback.
pub type ChooseByIdentity = ChoiceStrategy<IdentitySelector>;

impl ChoiceStrategy<IdentitySelector> {
    /// Construct new identity dispatcher with a default fallback strategy.
    pub fn by_identity(default_strategy: Box<dyn MergeStrategy>) -> Self {
        Self::new(IdentitySelector {
            default_strategy,
            by_key: HashMap::new(),
        })
    }

    /// Register a strategy for one identity key.
    ///
    /// Configuration-time operation; must not be called while a merge using
    /// this strategy is in flight.
    pub fn add_strategy_for_key(&mut self, key: impl Into<String>, strategy: Box<dyn MergeStrategy>) {
        self.selector.by_key.insert(key.into(), strategy);
    }

    /// Builder-style variant of [`ChooseByIdentity::add_strategy_for_key`].
    pub fn with_strategy_for_key(
        mut self,
        key: impl Into<String>,
        strategy: Box<dyn MergeStrategy>,
    ) -> Self {
        self.add_strategy_for_key(key, strategy);
        self
    }
}

/// Upper bound on whole-text substitution passes.
///
/// Substituted values may themselves contain tokens, so substitution runs in
/// passes until a fixpoint; the bound stops malformed self-referential paths
/// from looping forever.
const MAX_SUBSTITUTION_PASSES: usize = 8;

fn token_pattern() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    // INVARIANT: Paths are slash-separated tag names, so the capture stops
    // at anything else and surrounding punctuation stays literal text.
    ONCE.get_or_init(|| Regex::new(r"\$(left|right):([\w/.-]+)").unwrap())
}

/// Synthesize matched pairs from a fixed template.
///
/// The template is an element whose text nodes may carry
/// `$left:<path>` / `$right:<path>` tokens, where a path is a slash-separated
/// chain of tag names. On a matched pair, every token
/// is replaced with the text found at that path in the corresponding source
/// element (empty string when the path does not resolve), and the
/// synthesized element takes the left element's former position in the
/// target. Right-only elements are added verbatim, without the template.
#[derive(Debug, Clone)]
pub struct TemplateStrategy {
    template: Element,
}

impl TemplateStrategy {
    /// Construct new template strategy from a literal element.
    pub fn new(template: Element) -> Self {
        Self { template }
    }

    /// Parse the template once from XML text, failing fast when malformed.
    ///
    /// # Errors
    ///
    /// - Return [`MergeError::Descriptor`](crate::merge::MergeError) if the
    ///   text is not a well-formed XML fragment.
    pub fn from_xml(xml: impl AsRef<str>) -> Result<Self> {
        Ok(Self::new(descriptor::parse_element(xml)?))
    }

    fn synthesize(&self, pair: MergePair<'_>) -> Element {
        let mut synthesized = self.template.clone();
        synthesized.visit_text_mut(&mut |text| substitute(text, pair));
        synthesized
    }
}

impl MergeStrategy for TemplateStrategy {
    fn in_left(&self, _: &mut Descriptor, _: &DescriptorTag, _: &Element) -> Result<usize> {
        Ok(0)
    }

    fn in_right(
        &self,
        target: &mut Descriptor,
        _: &DescriptorTag,
        right: &Element,
    ) -> Result<usize> {
        target.add_element(right.clone());
        Ok(1)
    }

    fn in_both(
        &self,
        target: &mut Descriptor,
        tag: &DescriptorTag,
        pair: MergePair<'_>,
    ) -> Result<usize> {
        let synthesized = self.synthesize(pair);
        target.replace_element(tag, pair.left, synthesized);
        Ok(1)
    }
}

/// Replace every token in one text node, to a fixpoint.
///
/// Unresolvable paths substitute the empty string rather than erroring, so
/// templates stay robust against optional fields.
fn substitute(text: &mut String, pair: MergePair<'_>) {
    for pass in 0..=MAX_SUBSTITUTION_PASSES {
        if !token_pattern().is_match(text) {
            return;
        }

        if pass == MAX_SUBSTITUTION_PASSES {
            warn!(text = %text, "substitution pass bound reached, leaving remaining tokens");
            return;
        }

        let replaced = token_pattern().replace_all(text, |captures: &regex::Captures<'_>| {
            let source = match &captures[1] {
                "left" => pair.left,
                _ => pair.right,
            };
            source.find_text(&captures[2]).unwrap_or_default().to_owned()
        });
        *text = replaced.into_owned();
    }
}
