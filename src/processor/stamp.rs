//! Capturing map regions and stamping them back down.
//!
//! A stamp is an ordinary [`MapFragment`] cut from a live map, so it saves,
//! loads and previews with the same machinery as a whole map. Replay runs
//! every prefab through the placement policy, which is what makes stamps
//! safe across environments: content whose types no longer resolve comes
//! back as placeholders instead of vanishing.

use log::{debug, info};

use crate::model::{Coord, LiveMap, MapError, MapFragment, MapSize};
use crate::processor::context::{EditContext, PlaceMode};
use crate::processor::place::place_prefab;
use crate::processor::preview::{PreviewImage, SpriteSource, render_preview};
use crate::writer::keys::DictionaryBuilder;

/// A captured region plus its rendered preview.
pub struct Stamp {
    pub fragment: MapFragment,
    pub preview: PreviewImage,
}

/// Snapshot the axis-aligned bounding box of `selection` into a fragment.
/// The whole box is captured, selected or not; tiles outside the map read
/// as empty. Fragment coordinates are rebased to start at (1,1,1).
pub fn capture(map: &LiveMap, selection: &[Coord]) -> Result<MapFragment, MapError> {
    let Some(&first) = selection.first() else {
        return Err(MapError::EmptySelection);
    };
    let mut min = first;
    let mut max = first;
    for &coord in selection {
        min.x = min.x.min(coord.x);
        min.y = min.y.min(coord.y);
        min.z = min.z.min(coord.z);
        max.x = max.x.max(coord.x);
        max.y = max.y.max(coord.y);
        max.z = max.z.max(coord.z);
    }

    let size = MapSize::new(max.x - min.x + 1, max.y - min.y + 1, max.z - min.z + 1);
    let mut fragment = MapFragment::new(size);
    let mut builder = DictionaryBuilder::new();
    for local in size.iter_coords() {
        let source = Coord::new(min.x + local.x - 1, min.y + local.y - 1, min.z + local.z - 1);
        let key = builder.key_for(&map.prefab_stack(source));
        fragment.grid.insert(local, key);
    }
    fragment.dictionary = builder.into_dictionary();

    debug!(
        "captured a {} stamp from {} selected tiles",
        fragment.size,
        selection.len()
    );
    Ok(fragment)
}

/// [`capture`] plus a preview raster.
pub fn capture_stamp(
    map: &LiveMap,
    selection: &[Coord],
    sprites: &dyn SpriteSource,
) -> Result<Stamp, MapError> {
    let fragment = capture(map, selection)?;
    let preview = render_preview(&fragment, sprites);
    Ok(Stamp { fragment, preview })
}

/// Stamp `fragment` down with its (1,1,1) corner at `origin`. Every prefab
/// goes through the placement policy; targets outside the map are skipped.
/// Returns how many instances were placed.
pub fn replay(
    map: &mut LiveMap,
    fragment: &MapFragment,
    origin: Coord,
    ctx: &mut EditContext<'_>,
    mode: PlaceMode,
) -> usize {
    let mut placed = 0usize;
    for local in fragment.size.iter_coords() {
        let target = Coord::new(
            origin.x + local.x - 1,
            origin.y + local.y - 1,
            origin.z + local.z - 1,
        );
        if !map.contains(target) {
            continue;
        }
        for prefab in fragment.prefabs_at(local) {
            if place_prefab(map, target, prefab, ctx, mode).is_some() {
                placed += 1;
            }
        }
    }
    info!(
        "replayed a {} stamp at {origin}: {placed} instances placed",
        fragment.size
    );
    placed
}
