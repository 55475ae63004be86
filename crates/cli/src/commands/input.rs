use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use spreadline_core::engine::Engine;
use spreadline_core::ingest::parse_batch;
use spreadline_core::Proposal;

/// Reads a JSON array of raw proposals and normalizes it with the engine's settings.
pub fn read_proposals(path: &Path, engine: &Engine) -> Result<Vec<Proposal>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read input file `{}`", path.display()))?;
    let batch = parse_batch(&raw)
        .with_context(|| format!("input file `{}` is not a proposal array", path.display()))?;
    Ok(engine.normalize(&batch))
}
