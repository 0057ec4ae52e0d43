//! Writers for the persistent map format.

pub mod dmm;
pub mod keys;

use std::path::Path;

use anyhow::Context;

use crate::model::MapFragment;

/// Encode `fragment` and write it to `path`. Errors carry the attempted
/// path; nothing is retried.
pub fn emit(fragment: &MapFragment, path: &Path) -> anyhow::Result<()> {
    let text = dmm::encode(fragment);
    std::fs::write(path, text).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}
