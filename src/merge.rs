// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor merge orchestration.
//!
//! Combines two descriptors of the same schema into one, tag group by tag
//! group, with a pluggable per-tag conflict policy.
//!
//! # How a Merge Runs
//!
//! The target starts as a deep clone of the left document, i.e. the
//! configuration that already exists. The orchestrator then walks every
//! distinct top-level tag found in either document, partitions that tag's
//! elements into matched pairs, left-only, and right-only under the tag's
//! identity rule, and hands each group to the strategy registered for that
//! tag. Strategies mutate the target; a no-op therefore _keeps_ whatever the
//! left document already had.
//!
//! Final placement in the target always follows the schema's canonical
//! element order, never the order groups happen to be processed in.
//!
//! # Failure Semantics
//!
//! A merge either completes or fails as a whole. Any error raised inside a
//! strategy callback propagates out of [`DescriptorMerger::merge`] and the
//! caller must discard the half-built target. Merges are deterministic pure
//! functions of their inputs, so there is nothing to retry.
//!
//! # See Also
//!
//! 1. [`strategy`]
//! 2. [`Descriptor`](crate::descriptor::Descriptor)

pub mod strategy;

use crate::{
    descriptor::{
        element::Element,
        schema::DescriptorTag,
        Descriptor,
    },
    merge::strategy::MergeStrategy,
};

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

/// An ephemeral pairing of a left element and its identity-matched right
/// counterpart, handed to [`MergeStrategy::in_both`].
#[derive(Debug, Clone, Copy)]
pub struct MergePair<'a> {
    pub left: &'a Element,
    pub right: &'a Element,
}

/// Per-tag merge counts accumulated over one merge run.
///
/// A count of zero is meaningful: it marks a tag whose elements were all
/// deliberately dropped by their strategy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    counts: BTreeMap<String, usize>,
}

impl MergeReport {
    /// Elements merged for one tag name.
    pub fn count_for(&self, tag: impl AsRef<str>) -> usize {
        self.counts.get(tag.as_ref()).copied().unwrap_or(0)
    }

    /// Total elements merged across all tags.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Iterate over per-tag counts in tag-name order.
    pub fn counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(tag, count)| (tag.as_str(), *count))
    }

    fn record(&mut self, tag: impl Into<String>, count: usize) {
        self.counts.insert(tag.into(), count);
    }
}

/// Drives the merge of two descriptors through per-tag strategies.
///
/// Holds a tag-name-to-strategy table plus a default strategy for unmapped
/// tags. The default is always present, so every element group resolves to
/// _some_ policy even if that policy is a deliberate no-op.
///
/// Configuration-time mutation ([`DescriptorMerger::set_strategy`]) must not
/// race a merge in flight; the merge itself holds only `&self`.
pub struct DescriptorMerger {
    default_strategy: Box<dyn MergeStrategy>,
    strategies: HashMap<String, Box<dyn MergeStrategy>>,
}

impl DescriptorMerger {
    /// Construct new merger with a document-wide default strategy.
    pub fn new(default_strategy: Box<dyn MergeStrategy>) -> Self {
        Self {
            default_strategy,
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy for one tag name, replacing any previous one.
    pub fn set_strategy(&mut self, tag: impl Into<String>, strategy: Box<dyn MergeStrategy>) {
        self.strategies.insert(tag.into(), strategy);
    }

    /// Builder-style variant of [`DescriptorMerger::set_strategy`].
    pub fn with_strategy(
        mut self,
        tag: impl Into<String>,
        strategy: Box<dyn MergeStrategy>,
    ) -> Self {
        self.set_strategy(tag, strategy);
        self
    }

    /// Merge two descriptors into a new one.
    ///
    /// # Errors
    ///
    /// - Return [`MergeError::SchemaMismatch`] if the descriptors carry
    ///   different schemas.
    /// - Propagate any error raised by a strategy callback; the target is
    ///   invalid in that case.
    #[instrument(skip(self, left, right), level = "debug")]
    pub fn merge(&self, left: &Descriptor, right: &Descriptor) -> Result<(Descriptor, MergeReport)> {
        if left.schema() != right.schema() {
            return Err(MergeError::SchemaMismatch {
                left: left.schema().name().to_owned(),
                right: right.schema().name().to_owned(),
            });
        }

        let mut target = left.clone();
        let mut report = MergeReport::default();
        for name in distinct_tag_names(left, right) {
            // INVARIANT: Tags the schema does not describe merge under an
            // ad-hoc identifier-less tag, i.e. value equality.
            let tag = match left.schema().tag(&name) {
                Some(tag) => tag.clone(),
                None => DescriptorTag::new(name.clone()),
            };

            let strategy = self.strategy_for(&name);
            let (pairs, left_only, right_only) = partition(&tag, left, right);
            debug!(
                tag = %name,
                pairs = pairs.len(),
                left_only = left_only.len(),
                right_only = right_only.len(),
                "partitioned element group"
            );

            let mut merged = 0;
            for pair in pairs {
                merged += strategy.in_both(&mut target, &tag, pair)?;
            }
            for element in left_only {
                merged += strategy.in_left(&mut target, &tag, element)?;
            }
            for element in right_only {
                merged += strategy.in_right(&mut target, &tag, element)?;
            }

            report.record(name, merged);
        }

        info!(total = report.total(), "merge complete");
        Ok((target, report))
    }

    fn strategy_for(&self, tag: &str) -> &dyn MergeStrategy {
        match self.strategies.get(tag) {
            Some(strategy) => strategy.as_ref(),
            None => self.default_strategy.as_ref(),
        }
    }
}

/// Distinct top-level tag names across both documents, in first-seen order.
fn distinct_tag_names(left: &Descriptor, right: &Descriptor) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let elements = left
        .root()
        .child_elements()
        .chain(right.root().child_elements());
    for element in elements {
        if !names.iter().any(|name| name == element.name()) {
            names.push(element.name().to_owned());
        }
    }

    names
}

type Partition<'a> = (Vec<MergePair<'a>>, Vec<&'a Element>, Vec<&'a Element>);

/// Split one tag's elements into matched pairs, left-only, and right-only.
///
/// Pairing is greedy: each left element takes the first still-unmatched
/// right element it matches under the tag's identity rule. Unique tags pair
/// positionally instead, so both sides' singletons always form a pair and a
/// merge can never emit a second instance.
fn partition<'a>(
    tag: &'a DescriptorTag,
    left: &'a Descriptor,
    right: &'a Descriptor,
) -> Partition<'a> {
    let mut right_pool: Vec<Option<&Element>> = right.elements(tag.name()).map(Some).collect();
    let mut pairs = Vec::new();
    let mut left_only = Vec::new();

    for candidate in left.elements(tag.name()) {
        let mut matched = None;
        for slot in &mut right_pool {
            // INVARIANT: A unique tag holds at most one element per side, so
            // its instances pair positionally, never by identity.
            if slot.is_some_and(|element| tag.is_unique() || tag.matches(candidate, element)) {
                matched = slot.take();
                break;
            }
        }

        match matched {
            Some(element) => pairs.push(MergePair {
                left: candidate,
                right: element,
            }),
            None => left_only.push(candidate),
        }
    }

    let right_only = right_pool.into_iter().flatten().collect();
    (pairs, left_only, right_only)
}

/// Merge orchestration error types.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Input descriptors are bound to different schemas.
    #[error("cannot merge descriptors of different schemas: left is {left}, right is {right}")]
    SchemaMismatch { left: String, right: String },

    /// Descriptor parsing or manipulation fails inside a strategy.
    #[error(transparent)]
    Descriptor(#[from] crate::descriptor::DescriptorError),
}

/// Friendly result alias :3
pub type Result<T, E = MergeError> = std::result::Result<T, E>;
