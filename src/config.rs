// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Merge plan layout.
//!
//! Specify the layout for the TOML merge plan that Oximerge uses to simplify
//! the process of serialization and deserialization. File I/O for the plan
//! itself is left to the caller; template files referenced by rules are read
//! here at build time so a bad reference fails before any merge starts.
//!
//! # General Layout
//!
//! A merge plan is composed of three basic parts: a schema, a default
//! strategy, and rules. The schema section declares the descriptor grammar
//! as data, i.e. the root element plus the canonical ordering of top-level
//! tags and their identity paths. The default strategy names the policy for
//! every tag no rule mentions. Each rule binds one tag to a strategy:
//! `preserve`, `overwrite`, `skip`, `choose` (per-identity-key dispatch with
//! a fallback), or `template` (synthesis from an inline or file-referenced
//! XML template).

use crate::{
    descriptor::schema::{DescriptorSchema, DescriptorTag},
    merge::{
        strategy::{ChooseByIdentity, MergeStrategy, Overwrite, Preserve, Skip, TemplateStrategy},
        DescriptorMerger,
    },
};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::PathBuf,
    str::FromStr,
};

/// Merge plan layout.
///
/// Assembles into a [`DescriptorSchema`] plus a fully configured
/// [`DescriptorMerger`]. Construction is the fail-fast point for every
/// configuration error: unknown strategy names, missing template files, and
/// malformed template XML all surface here, naming the offending value.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct MergePlan {
    /// Descriptor grammar the plan merges against.
    pub schema: SchemaLayout,

    /// Strategy name applied to tags without an explicit rule.
    #[serde(default = "default_strategy_name")]
    pub default: String,

    /// Per-tag strategy bindings.
    #[serde(rename = "rule")]
    pub rules: Option<Vec<MergeRule>>,
}

fn default_strategy_name() -> String {
    "preserve".into()
}

impl MergePlan {
    /// Build the descriptor schema declared by this plan.
    pub fn schema(&self) -> DescriptorSchema {
        let tags = self.schema.tags.iter().map(|layout| {
            let mut tag = DescriptorTag::new(&layout.name);
            if layout.unique.unwrap_or(false) {
                tag = tag.unique();
            }
            if let Some(identifier) = &layout.identifier {
                tag = tag.identified_by(identifier);
            }
            tag
        });

        DescriptorSchema::new(&self.schema.name, &self.schema.root, tags)
    }

    /// Build the merger this plan configures.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::UnknownStrategy`] if any strategy name is not
    ///   recognized.
    /// - Return [`ConfigError::MissingTemplate`] if a template rule carries
    ///   neither inline XML nor a file reference.
    /// - Return [`ConfigError::ReadTemplate`] if a referenced template file
    ///   cannot be read.
    /// - Return [`ConfigError::Template`] if template XML is malformed.
    pub fn merger(&self) -> Result<DescriptorMerger> {
        let mut merger = DescriptorMerger::new(simple_strategy(&self.default)?);
        for rule in self.rules.iter().flatten() {
            merger.set_strategy(&rule.tag, rule.strategy()?);
        }

        Ok(merger)
    }
}

impl FromStr for MergePlan {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut plan: MergePlan = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on template file references.
        for rule in plan.rules.iter_mut().flatten() {
            if let Some(path) = &rule.template_file {
                rule.template_file = Some(PathBuf::from(
                    shellexpand::full(path.to_string_lossy().as_ref())
                        .map_err(ConfigError::ShellExpansion)?
                        .into_owned(),
                ));
            }
        }

        Ok(plan)
    }
}

impl Display for MergePlan {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Descriptor grammar declared as plan data.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SchemaLayout {
    /// Human-readable schema identifier, e.g. "web-app-2.3".
    pub name: String,

    /// Name of the mandated root element.
    pub root: String,

    /// Canonical top-level tag ordering.
    #[serde(rename = "tag", default)]
    pub tags: Vec<TagLayout>,
}

/// One tag entry of the schema section.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct TagLayout {
    /// Element name.
    pub name: String,

    /// Whether only one instance is legal per document.
    pub unique: Option<bool>,

    /// Identity-key path matching "the same" element across documents.
    pub identifier: Option<String>,
}

/// One tag-to-strategy binding.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct MergeRule {
    /// Tag name the rule applies to.
    pub tag: String,

    /// Strategy name: preserve, overwrite, skip, choose, or template.
    pub strategy: String,

    /// Fallback strategy name for a choose rule.
    pub default: Option<String>,

    /// Identity key to strategy name table for a choose rule.
    pub choice: Option<BTreeMap<String, String>>,

    /// Inline template XML for a template rule.
    pub template: Option<String>,

    /// Path to a template XML file for a template rule.
    #[serde(rename = "template-file")]
    pub template_file: Option<PathBuf>,
}

impl MergeRule {
    fn strategy(&self) -> Result<Box<dyn MergeStrategy>> {
        match self.strategy.as_str() {
            "choose" => self.choose_strategy(),
            "template" => self.template_strategy(),
            name => simple_strategy(name),
        }
    }

    fn choose_strategy(&self) -> Result<Box<dyn MergeStrategy>> {
        let fallback: Box<dyn MergeStrategy> = match &self.default {
            Some(name) => simple_strategy(name)?,
            None => Box::new(Skip),
        };

        let mut choose = ChooseByIdentity::by_identity(fallback);
        for (key, name) in self.choice.iter().flatten() {
            choose.add_strategy_for_key(key, simple_strategy(name)?);
        }

        Ok(Box::new(choose))
    }

    fn template_strategy(&self) -> Result<Box<dyn MergeStrategy>> {
        let xml = match (&self.template, &self.template_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => read_to_string(path).map_err(|err| ConfigError::ReadTemplate {
                source: err,
                template_path: path.clone(),
            })?,
            (None, None) => {
                return Err(ConfigError::MissingTemplate {
                    tag: self.tag.clone(),
                })
            }
        };

        let strategy = TemplateStrategy::from_xml(xml).map_err(|err| ConfigError::Template {
            source: err,
            tag: self.tag.clone(),
        })?;

        Ok(Box::new(strategy))
    }
}

fn simple_strategy(name: &str) -> Result<Box<dyn MergeStrategy>> {
    match name {
        "preserve" => Ok(Box::new(Preserve)),
        "overwrite" => Ok(Box::new(Overwrite)),
        "skip" => Ok(Box::new(Skip)),
        unknown => Err(ConfigError::UnknownStrategy(unknown.to_owned())),
    }
}

/// Merge plan error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize merge plan.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize merge plan.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on a template file reference.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// A rule names a strategy this crate does not provide.
    #[error("unknown merge strategy {0:?}")]
    UnknownStrategy(String),

    /// A template rule carries neither inline XML nor a file reference.
    #[error("template rule for tag {tag:?} needs a template or template-file entry")]
    MissingTemplate { tag: String },

    /// A referenced template file cannot be read.
    #[error("failed to read template file at {:?}", template_path.display())]
    ReadTemplate {
        #[source]
        source: std::io::Error,
        template_path: PathBuf,
    },

    /// Template XML fails to parse.
    #[error("malformed template for tag {tag:?}")]
    Template {
        #[source]
        source: crate::merge::MergeError,
        tag: String,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
