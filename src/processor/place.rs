//! Placing prefabs onto a live map.
//!
//! Placement is where the tile exclusivity rules are enforced: in primary
//! mode a tile holds at most one area and one turf, in alternate mode at
//! most one object.
//! Every placed prefab goes through reconciliation first, so stamping an
//! old map region onto a new map preserves its unresolvable prefabs as
//! placeholders instead of silently dropping them.

use std::sync::Arc;

use log::debug;
use rand::Rng;

use crate::model::{
    Coord, InstanceId, LiveMap, PATH_AREA, PATH_OBJ, PATH_TURF, Prefab, is_path_base,
};
use crate::processor::context::{EditContext, PlaceMode};
use crate::processor::reconciler::{Reconciliation, reconcile_prefab};

/// The four cardinal facings, in engine encoding.
pub const CARDINAL_DIRS: [i32; 4] = [1, 2, 4, 8];

const VAR_DIR: &str = "dir";

/// Place one prefab at `coord`, enforcing the tile exclusivity rules for
/// `mode`. Returns the new instance id, or `None` when the coordinate is
/// out of bounds or reconciliation discarded the prefab.
pub fn place_prefab(
    map: &mut LiveMap,
    coord: Coord,
    prefab: &Prefab,
    ctx: &mut EditContext<'_>,
    mode: PlaceMode,
) -> Option<InstanceId> {
    if !map.contains(coord) {
        debug!("place: {coord} is outside the {} map", map.size());
        return None;
    }

    let mut to_place = match reconcile_prefab(prefab, ctx.env, &ctx.config.obsolete) {
        Reconciliation::Resolved => prefab.clone(),
        Reconciliation::Placeholder(placeholder) => placeholder,
        Reconciliation::Discarded => return None,
    };

    match mode {
        PlaceMode::Primary => {
            if is_path_base(PATH_AREA, to_place.path()) {
                map.remove_by_category(coord, PATH_AREA);
            } else if is_path_base(PATH_TURF, to_place.path()) {
                map.remove_by_category(coord, PATH_TURF);
            }
        }
        PlaceMode::Alternate => {
            if is_path_base(PATH_OBJ, to_place.path()) {
                map.remove_by_category(coord, PATH_OBJ);
            }
        }
    }

    if ctx.config.randomize_direction && to_place.vars().get(VAR_DIR).is_some() {
        let dir = CARDINAL_DIRS[ctx.rng.gen_range(0..CARDINAL_DIRS.len())];
        let vars = to_place.vars().modified(VAR_DIR, &dir.to_string());
        to_place = Prefab::new(to_place.path().to_string(), Arc::new(vars));
    }

    map.instance_add(coord, to_place)
}
