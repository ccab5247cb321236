//! `weld check`: validate fragments without fusing.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use weld_core::graph::ElementGraph;

use super::load_fragment;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Fragment JSON files to validate.
    #[arg(required = true, value_name = "FRAGMENT")]
    pub fragments: Vec<PathBuf>,

    /// Print each element's canonical path key (`Kind::Root.….Name`).
    #[arg(long)]
    pub keys: bool,
}

pub fn run_check(args: &CheckArgs) -> Result<()> {
    let mut failed = 0_usize;
    for path in &args.fragments {
        match load_fragment(path) {
            Ok(fragment) => {
                println!(
                    "ok: {} ({} elements)",
                    fragment.label,
                    fragment.elements.len()
                );
                if args.keys {
                    print_keys(fragment.into_elements())?;
                }
            }
            Err(failure) => {
                eprintln!("error: {failure}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} fragments rejected", args.fragments.len());
    }
    println!("all {} fragments valid", args.fragments.len());
    Ok(())
}

/// Print the canonical path key of every element in one fragment.
fn print_keys(elements: Vec<weld_core::model::Element>) -> Result<()> {
    let graph = ElementGraph::new(elements)?;
    for element in graph.iter() {
        if let Some(key) = graph.canonical_key(&element.id)? {
            println!("  {:<24} {key}", element.id);
        }
    }
    Ok(())
}
