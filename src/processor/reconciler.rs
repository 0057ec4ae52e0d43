//! Reconciliation of prefabs against the type environment.
//!
//! A map written under one environment can reference types a later
//! environment no longer defines. Rather than dropping those prefabs (and
//! their hand-edited variables) on load, they are rewritten onto configured
//! placeholder types with the original path and variables tucked into two
//! tracking variables. Editing continues, the placeholders render and save
//! like any other prefab, and [`replacement_prefab`] later turns one back
//! into a real prefab of a chosen type, restoring every variable the new
//! type still declares.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::model::{
    PATH_AREA, PATH_TURF, Prefab, TypeEnvironment, VarSet, is_path_base, quote_text,
    split_unquoted, unquote_text,
};

/// Variable holding the quoted original type path on a placeholder.
pub const VAR_ORIGINAL_PATH: &str = "original_path";
/// Variable holding the quoted original variable text on a placeholder.
pub const VAR_ORIGINAL_VARS: &str = "original_vars";

/// Placeholder type paths, one per category. An empty path means prefabs of
/// that category are discarded instead of preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsoleteConfig {
    pub object_path: String,
    pub turf_path: String,
    pub area_path: String,
}

impl ObsoleteConfig {
    /// The placeholder path for `path`'s category. Turfs and areas get
    /// their own placeholders; everything else counts as an object.
    fn placeholder_for(&self, path: &str) -> &str {
        if is_path_base(PATH_TURF, path) {
            &self.turf_path
        } else if is_path_base(PATH_AREA, path) {
            &self.area_path
        } else {
            &self.object_path
        }
    }
}

/// Outcome of checking one prefab against the environment.
#[derive(Debug, Clone)]
pub enum Reconciliation {
    /// The type exists; use the prefab as-is.
    Resolved,
    /// The type is gone; use this placeholder instead.
    Placeholder(Prefab),
    /// The type is gone and no placeholder applies; drop the prefab.
    Discarded,
}

/// Check `prefab` against `env` and decide what to do with it.
pub fn reconcile_prefab(
    prefab: &Prefab,
    env: &dyn TypeEnvironment,
    config: &ObsoleteConfig,
) -> Reconciliation {
    if env.contains(prefab.path()) {
        return Reconciliation::Resolved;
    }

    let placeholder_path = config.placeholder_for(prefab.path());
    if placeholder_path.is_empty() {
        debug!("discarding {}: no placeholder configured", prefab.path());
        return Reconciliation::Discarded;
    }
    let Some(defaults) = env.default_vars(placeholder_path) else {
        warn!(
            "discarding {}: placeholder {placeholder_path} is not in the environment",
            prefab.path()
        );
        return Reconciliation::Discarded;
    };

    let snapshot = prefab.vars().flatten_text();
    let mut vars = VarSet::from_pairs([(VAR_ORIGINAL_PATH, quote_text(prefab.path()))]);
    if !snapshot.is_empty() {
        vars = vars.modified(VAR_ORIGINAL_VARS, &quote_text(&snapshot));
    }
    info!("preserving {} as {placeholder_path}", prefab.path());
    Reconciliation::Placeholder(Prefab::new(
        placeholder_path.to_string(),
        Arc::new(vars.with_parent(defaults)),
    ))
}

/// True when `path` is one of the configured placeholder types.
pub fn is_placeholder_path(path: &str, config: &ObsoleteConfig) -> bool {
    [&config.object_path, &config.turf_path, &config.area_path]
        .into_iter()
        .any(|p| !p.is_empty() && p == path)
}

/// What a placeholder remembers about the prefab it stands in for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoleteInfo {
    pub original_path: String,
    pub original_vars: Vec<(String, String)>,
}

/// Read the tracking variables back out of a placeholder. `None` when the
/// prefab carries no original path, i.e. it is not a placeholder.
pub fn obsolete_info(prefab: &Prefab) -> Option<ObsoleteInfo> {
    let raw_path = prefab.vars().get(VAR_ORIGINAL_PATH)?;
    let original_path = unquote_text(raw_path);
    if original_path.is_empty() {
        return None;
    }
    let original_vars = prefab
        .vars()
        .get(VAR_ORIGINAL_VARS)
        .map(parse_original_vars)
        .unwrap_or_default();
    Some(ObsoleteInfo {
        original_path,
        original_vars,
    })
}

/// Split a quoted `k=v;k=v` snapshot back into pairs. Values may contain
/// quoted `;` and `=`, so the split is quote-aware.
fn parse_original_vars(raw: &str) -> Vec<(String, String)> {
    let text = unquote_text(raw);
    if text.is_empty() {
        return Vec::new();
    }
    let mut pairs = Vec::new();
    for segment in split_unquoted(&text, ';') {
        let Some(eq) = segment.find('=') else {
            continue;
        };
        if eq == 0 {
            continue;
        }
        pairs.push((segment[..eq].to_string(), segment[eq + 1..].to_string()));
    }
    pairs
}

/// Build the prefab that replaces a placeholder once the user picks a real
/// type for it. Starts from `chosen`'s variables and layers the preserved
/// original values on top, skipping the tracking variables themselves.
pub fn replacement_prefab(placeholder: &Prefab, chosen: &Prefab) -> Prefab {
    let raw = placeholder
        .vars()
        .get(VAR_ORIGINAL_VARS)
        .unwrap_or_default();
    let mut vars = (**chosen.vars()).clone();
    for (name, value) in parse_original_vars(raw) {
        if name == VAR_ORIGINAL_PATH || name == VAR_ORIGINAL_VARS {
            continue;
        }
        vars = vars.modified(&name, &value);
    }
    Prefab::new(chosen.path().to_string(), Arc::new(vars))
}
