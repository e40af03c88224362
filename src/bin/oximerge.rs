// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use oximerge::{config::MergePlan, descriptor::Descriptor};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  oximerge merge [options] <left_xml> <right_xml>\n  oximerge check [options] <xml>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Merge(opts) => run_merge(opts),
            Command::Check(opts) => run_check(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Merge two descriptors according to a merge plan.
    #[command(override_usage = "oximerge merge [options] <left_xml> <right_xml>")]
    Merge(MergeOptions),

    /// Parse one descriptor and report its top-level elements.
    #[command(override_usage = "oximerge check [options] <xml>")]
    Check(CheckOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MergeOptions {
    /// Path to TOML merge plan.
    #[arg(short, long, value_name = "path")]
    pub plan: PathBuf,

    /// Existing descriptor acting as the merge base.
    #[arg(required = true, value_name = "left_xml")]
    pub left: PathBuf,

    /// Incoming descriptor merged on top.
    #[arg(required = true, value_name = "right_xml")]
    pub right: PathBuf,

    /// Write merged descriptor here instead of stdout.
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CheckOptions {
    /// Path to TOML merge plan.
    #[arg(short, long, value_name = "path")]
    pub plan: PathBuf,

    /// Descriptor to inspect.
    #[arg(required = true, value_name = "xml")]
    pub file: PathBuf,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_plan(path: &PathBuf) -> Result<MergePlan> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read merge plan at {:?}", path.display()))?
        .parse()
        .with_context(|| format!("failed to parse merge plan at {:?}", path.display()))
}

fn load_descriptor(plan: &MergePlan, path: &PathBuf) -> Result<Descriptor> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor at {:?}", path.display()))?;

    Descriptor::parse(plan.schema(), xml)
        .with_context(|| format!("failed to parse descriptor at {:?}", path.display()))
}

fn run_merge(opts: MergeOptions) -> Result<()> {
    let plan = load_plan(&opts.plan)?;
    let merger = plan.merger()?;
    let left = load_descriptor(&plan, &opts.left)?;
    let right = load_descriptor(&plan, &opts.right)?;

    let (merged, report) = merger.merge(&left, &right)?;
    for (tag, count) in report.counts() {
        info!("merged {count} element(s) for tag <{tag}>");
    }

    match opts.output {
        Some(path) => fs::write(&path, merged.to_string())
            .with_context(|| format!("failed to write merged descriptor at {:?}", path.display()))?,
        None => print!("{merged}"),
    }

    Ok(())
}

fn run_check(opts: CheckOptions) -> Result<()> {
    let plan = load_plan(&opts.plan)?;
    let descriptor = load_descriptor(&plan, &opts.file)?;

    let schema = descriptor.schema();
    for element in descriptor.root().child_elements() {
        let key = schema
            .tag(element.name())
            .and_then(|tag| tag.identity_of(element));
        match key {
            Some(key) => println!("<{}> identity {key:?}", element.name()),
            None => println!("<{}>", element.name()),
        }
    }

    Ok(())
}
