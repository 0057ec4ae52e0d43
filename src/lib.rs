pub mod cli;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use std::collections::HashSet;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use crate::model::MapFragment;

/// Summary printed by `--stats`.
#[derive(Debug, Serialize)]
struct MapStats {
    width: i32,
    height: i32,
    depth: i32,
    dictionary_rows: usize,
    distinct_prefabs: usize,
    instances: usize,
    grid_gaps: usize,
}

impl MapStats {
    fn collect(fragment: &MapFragment) -> Self {
        let distinct: HashSet<String> = fragment
            .dictionary
            .values()
            .flatten()
            .map(|prefab| prefab.signature())
            .collect();
        let instances: usize = fragment
            .grid
            .values()
            .filter_map(|key| fragment.dictionary.get(key))
            .map(Vec::len)
            .sum();
        Self {
            width: fragment.size.width,
            height: fragment.size.height,
            depth: fragment.size.depth,
            dictionary_rows: fragment.dictionary.len(),
            distinct_prefabs: distinct.len(),
            instances,
            grid_gaps: fragment.gap_count(),
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Decode ─────────────────────────────────────────────────────
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;
    let fragment = parser::decode(&text)
        .with_context(|| format!("Decoding {}", args.input.display()))?;
    println!(
        "Decoded {} map, {} dictionary rows",
        fragment.size,
        fragment.dictionary.len()
    );

    // 2. ── Report ─────────────────────────────────────────────────────
    if args.stats {
        let stats = MapStats::collect(&fragment);
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    // 3. ── Re-encode ──────────────────────────────────────────────────
    match &args.output {
        Some(path) => {
            writer::emit(&fragment, path)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", writer::dmm::encode(&fragment)),
    }

    Ok(())
}
