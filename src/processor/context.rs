//! Shared state for editing operations.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::model::TypeEnvironment;
use crate::processor::reconciler::ObsoleteConfig;

/// Seed used when the caller does not pick one. Fixed so that two runs over
/// the same map produce the same output.
pub const DEFAULT_SEED: u64 = 42;

/// Editor-wide settings, deserializable from a JSON config file. Every field
/// has a default so a partial file still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Placeholder paths for types missing from the environment.
    pub obsolete: ObsoleteConfig,
    /// Pick a random cardinal direction for placed prefabs that have a
    /// `dir` variable.
    pub randomize_direction: bool,
}

/// How a placement interacts with what is already on the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceMode {
    /// Areas and turfs replace their own kind; objects stack.
    #[default]
    Primary,
    /// Objects also replace their own kind.
    Alternate,
}

/// Everything a placement needs besides the map itself: the type
/// environment, the config, and a seeded rng.
pub struct EditContext<'a> {
    pub env: &'a dyn TypeEnvironment,
    pub config: EditorConfig,
    pub rng: ChaCha8Rng,
}

impl<'a> EditContext<'a> {
    pub fn new(env: &'a dyn TypeEnvironment, config: EditorConfig) -> Self {
        Self::with_seed(env, config, DEFAULT_SEED)
    }

    pub fn with_seed(env: &'a dyn TypeEnvironment, config: EditorConfig, seed: u64) -> Self {
        Self {
            env,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}
