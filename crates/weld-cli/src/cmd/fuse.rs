//! `weld fuse`: validate fragments, run the fusion engine, emit documents.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::info;

use weld_core::config::load_config;
use weld_core::model::Element;
use weld_fuse::FusionEngine;
use weld_xmi::{FusedDocument, XmiWriter};

use super::load_fragment;

#[derive(Args, Debug)]
pub struct FuseArgs {
    /// Fragment JSON files to fuse.
    #[arg(required = true, value_name = "FRAGMENT")]
    pub fragments: Vec<PathBuf>,

    /// Write the fused JSON document here. Defaults to stdout when neither
    /// output path is given.
    #[arg(long, value_name = "PATH")]
    pub out_json: Option<PathBuf>,

    /// Write the XMI document here.
    #[arg(long, value_name = "PATH")]
    pub out_xmi: Option<PathBuf>,

    /// Merge threshold τ override (0..=1).
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Per-element candidate cap override.
    #[arg(long)]
    pub cap: Option<usize>,

    /// Emit compact documents instead of pretty-printed ones.
    #[arg(long)]
    pub compact: bool,

    /// Omit the metadata block from the XMI document.
    #[arg(long)]
    pub no_metadata: bool,

    /// Drop relationships that become identical after fusion.
    #[arg(long)]
    pub dedup_relationships: bool,

    /// Drop relationships whose endpoints cannot be resolved after fusion
    /// instead of failing the run.
    #[arg(long)]
    pub repair: bool,

    /// Configuration file.
    #[arg(long, value_name = "PATH", default_value = "weld.toml")]
    pub config: PathBuf,
}

pub fn run_fuse(args: &FuseArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(threshold) = args.threshold {
        config.fusion.threshold = threshold;
    }
    if let Some(cap) = args.cap {
        config.fusion.candidate_cap = Some(cap);
    }
    config.fusion.dedup_relationships |= args.dedup_relationships;
    config.fusion.repair_dangling |= args.repair;
    if args.compact {
        config.output.pretty = false;
    }
    if args.no_metadata {
        config.output.metadata = false;
    }

    // The engine re-validates, but overrides are checked up front so a bad
    // flag fails before any file is read.
    config.fusion.validate()?;

    // Validate every fragment independently and report every failure; the
    // run aborts only after all diagnostics are collected. Downstream gets
    // a complete fused output or nothing.
    let mut elements: Vec<Element> = Vec::new();
    let mut failures = Vec::new();
    for path in &args.fragments {
        match load_fragment(path) {
            Ok(fragment) => {
                info!(
                    fragment = %fragment.label,
                    elements = fragment.elements.len(),
                    "fragment validated"
                );
                elements.extend(fragment.into_elements());
            }
            Err(failure) => failures.push(failure),
        }
    }
    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("error: {failure}");
        }
        bail!("{} of {} fragments rejected", failures.len(), args.fragments.len());
    }

    let engine = FusionEngine::new(config.fusion.clone())?;
    let outcome = engine.fuse(&elements)?;
    info!(stats = %outcome.stats, "fused {} fragments", args.fragments.len());

    let document = FusedDocument::from_outcome(&outcome)?;
    let json = document
        .to_json_string(config.output.pretty)
        .context("serialize fused document")?;

    match &args.out_json {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("write fused JSON to {}", path.display()))?;
            info!(path = %path.display(), "wrote fused JSON");
        }
        None if args.out_xmi.is_none() => println!("{json}"),
        None => {}
    }

    if let Some(path) = &args.out_xmi {
        let writer = XmiWriter::new(config.output.clone());
        let xmi = writer.write(&outcome.graph)?;
        std::fs::write(path, &xmi)
            .with_context(|| format!("write XMI to {}", path.display()))?;
        info!(path = %path.display(), "wrote XMI");
    }

    println!(
        "fused {} fragments: {}",
        args.fragments.len(),
        outcome.stats
    );
    Ok(())
}
