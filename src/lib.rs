// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Schema-aware merging of XML deployment descriptors.
//!
//! Java application servers configure deployed applications through XML
//! deployment descriptors like `web.xml`. Combining two of them, say a
//! hand-maintained descriptor with one generated by tooling, is not plain
//! tree merging: the grammar mandates a fixed order for top-level elements,
//! two `servlet` entries are "the same" only when their `servlet-name`
//! matches, and different element kinds call for different conflict
//! policies.
//!
//! Oximerge models all of that explicitly:
//!
//! - [`descriptor`] holds the document model: a descriptor bound to a
//!   schema value describing canonical element order and per-tag identity.
//! - [`merge`] drives the merge: per-tag pluggable strategies (preserve,
//!   overwrite, choose-by-identity, template synthesis) over a single-pass
//!   orchestrator.
//! - [`config`] loads a TOML merge plan declaring both the schema and the
//!   tag-to-strategy table.
//!
//! The engine is synchronous and pure: one call merges one pair of
//! descriptors to completion, and strategies carry configuration only, so
//! independent merges may run concurrently without coordination.

pub mod config;
pub mod descriptor;
pub mod merge;
