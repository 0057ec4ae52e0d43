//! Live, editable map state: tiles, instances and the owning prefab store.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use crate::processor::reconciler::{ObsoleteConfig, Reconciliation, reconcile_prefab};
use crate::writer::keys::DictionaryBuilder;

use super::error::MapError;
use super::fragment::{MapFragment, PrefabStack};
use super::prefab::Prefab;
use super::store::PrefabStore;
use super::{Coord, InstanceId, MapSize, TypeEnvironment, is_path_base};

/// One placed prefab plus the transient identity editing operations track.
#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    prefab: Arc<Prefab>,
}

impl Instance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn prefab(&self) -> &Arc<Prefab> {
        &self.prefab
    }
}

/// A coordinate plus its instance stack, bottom to top.
#[derive(Debug)]
pub struct Tile {
    coord: Coord,
    instances: Vec<Instance>,
}

impl Tile {
    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

/// The single-writer editing surface. Owns its prefab store and hands out
/// instance ids that stay unique for the map's lifetime. All mutation goes
/// through the methods here so the store and the tiles never drift apart.
#[derive(Debug)]
pub struct LiveMap {
    size: MapSize,
    tiles: Vec<Tile>,
    store: PrefabStore,
    next_instance_id: InstanceId,
}

impl LiveMap {
    pub fn new(size: MapSize) -> Self {
        let mut tiles = Vec::with_capacity(size.volume());
        for coord in size.iter_coords() {
            tiles.push(Tile {
                coord,
                instances: Vec::new(),
            });
        }
        Self {
            size,
            tiles,
            store: PrefabStore::new(),
            next_instance_id: 1,
        }
    }

    /// Build a live map from a decoded fragment. Every placed prefab passes
    /// through obsolete reconciliation first; loading is verbatim placement,
    /// no exclusivity policy applies here.
    pub fn load(
        fragment: &MapFragment,
        env: &dyn TypeEnvironment,
        config: &ObsoleteConfig,
    ) -> LiveMap {
        let mut map = LiveMap::new(fragment.size);
        let mut preserved = 0usize;
        let mut discarded = 0usize;
        for coord in fragment.size.iter_coords() {
            for prefab in fragment.prefabs_at(coord) {
                match reconcile_prefab(prefab, env, config) {
                    Reconciliation::Resolved => {
                        map.instance_add(coord, (**prefab).clone());
                    }
                    Reconciliation::Placeholder(placeholder) => {
                        map.instance_add(coord, placeholder);
                        preserved += 1;
                    }
                    Reconciliation::Discarded => discarded += 1,
                }
            }
        }
        if preserved > 0 {
            info!("load: preserved {preserved} unresolvable instances as placeholders");
        }
        if discarded > 0 {
            warn!("load: discarded {discarded} unresolvable instances");
        }
        map
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn store(&self) -> &PrefabStore {
        &self.store
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.size.contains(coord)
    }

    fn tile_index(&self, coord: Coord) -> Option<usize> {
        self.size
            .contains(coord)
            .then(|| self.size.linear_index(coord))
    }

    pub fn tile(&self, coord: Coord) -> Option<&Tile> {
        self.tile_index(coord).map(|idx| &self.tiles[idx])
    }

    /// The instance stack at `coord`; empty off the map.
    pub fn instances(&self, coord: Coord) -> &[Instance] {
        self.tile(coord).map(Tile::instances).unwrap_or(&[])
    }

    /// The prefab stack at `coord` in stack order, for snapshotting.
    pub fn prefab_stack(&self, coord: Coord) -> PrefabStack {
        self.instances(coord)
            .iter()
            .map(|instance| instance.prefab.clone())
            .collect()
    }

    /// Intern `prefab` into this map's store and stack a fresh instance on
    /// top of the tile. `None` when `coord` is off the map.
    pub fn instance_add(&mut self, coord: Coord, prefab: Prefab) -> Option<InstanceId> {
        let idx = self.tile_index(coord)?;
        let interned = self.store.intern(prefab);
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        self.tiles[idx].instances.push(Instance {
            id,
            prefab: interned,
        });
        Some(id)
    }

    /// Remove the instance with `id` from the tile; `false` when absent.
    pub fn instance_remove(&mut self, coord: Coord, id: InstanceId) -> bool {
        let Some(idx) = self.tile_index(coord) else {
            return false;
        };
        let instances = &mut self.tiles[idx].instances;
        let before = instances.len();
        instances.retain(|instance| instance.id != id);
        instances.len() != before
    }

    /// Remove every instance whose path sits under `base` (`/turf`,
    /// `/area`, `/obj`). Returns how many went away.
    pub fn remove_by_category(&mut self, coord: Coord, base: &str) -> usize {
        let Some(idx) = self.tile_index(coord) else {
            return 0;
        };
        let instances = &mut self.tiles[idx].instances;
        let before = instances.len();
        instances.retain(|instance| !is_path_base(base, instance.prefab.path()));
        before - instances.len()
    }

    /// Swap one instance for a new prefab, appended at the top of the
    /// stack. The placement half of the replace-obsolete workflow.
    pub fn replace_instance(
        &mut self,
        coord: Coord,
        id: InstanceId,
        prefab: Prefab,
    ) -> Result<InstanceId, MapError> {
        let idx = self
            .tile_index(coord)
            .ok_or_else(|| MapError::NotFound(format!("tile at {coord}")))?;
        let pos = self.tiles[idx]
            .instances
            .iter()
            .position(|instance| instance.id == id)
            .ok_or_else(|| MapError::NotFound(format!("instance {id} at {coord}")))?;
        self.tiles[idx].instances.remove(pos);
        let interned = self.store.intern(prefab);
        let new_id = self.next_instance_id;
        self.next_instance_id += 1;
        self.tiles[idx].instances.push(Instance {
            id: new_id,
            prefab: interned,
        });
        Ok(new_id)
    }

    /// Whole-map snapshot with deterministic re-keying.
    pub fn to_fragment(&self) -> MapFragment {
        let mut builder = DictionaryBuilder::new();
        let mut grid = HashMap::new();
        for coord in self.size.iter_coords() {
            let key = builder.key_for(&self.prefab_stack(coord));
            grid.insert(coord, key);
        }
        MapFragment {
            size: self.size,
            dictionary: builder.into_dictionary(),
            grid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarSet;

    fn prefab(path: &str) -> Prefab {
        Prefab::new(path, Arc::new(VarSet::new()))
    }

    #[test]
    fn test_instance_add_and_remove() {
        let mut map = LiveMap::new(MapSize::new(2, 2, 1));
        let at = Coord::new(1, 1, 1);

        let turf = map.instance_add(at, prefab("/turf/floor")).unwrap();
        let item = map.instance_add(at, prefab("/obj/item/wrench")).unwrap();
        assert_ne!(turf, item);
        assert_eq!(map.instances(at).len(), 2);
        assert_eq!(map.instances(at)[1].prefab().path(), "/obj/item/wrench");

        assert!(map.instance_remove(at, item));
        assert!(!map.instance_remove(at, item));
        assert_eq!(map.instances(at).len(), 1);
    }

    #[test]
    fn test_add_out_of_bounds_is_none() {
        let mut map = LiveMap::new(MapSize::new(2, 2, 1));
        assert!(map.instance_add(Coord::new(3, 1, 1), prefab("/turf/floor")).is_none());
        assert!(map.instances(Coord::new(3, 1, 1)).is_empty());
    }

    #[test]
    fn test_remove_by_category() {
        let mut map = LiveMap::new(MapSize::new(1, 1, 1));
        let at = Coord::new(1, 1, 1);
        map.instance_add(at, prefab("/turf/floor"));
        map.instance_add(at, prefab("/obj/item/wrench"));
        map.instance_add(at, prefab("/obj/machine/vendor"));

        assert_eq!(map.remove_by_category(at, "/obj"), 2);
        assert_eq!(map.instances(at).len(), 1);
        assert_eq!(map.instances(at)[0].prefab().path(), "/turf/floor");
        assert_eq!(map.remove_by_category(at, "/area"), 0);
    }

    #[test]
    fn test_replace_instance_lands_on_top() {
        let mut map = LiveMap::new(MapSize::new(1, 1, 1));
        let at = Coord::new(1, 1, 1);
        map.instance_add(at, prefab("/turf/floor"));
        let old = map.instance_add(at, prefab("/obj/old_console")).unwrap();
        map.instance_add(at, prefab("/obj/item/wrench"));

        let new = map.replace_instance(at, old, prefab("/obj/console")).unwrap();
        assert_ne!(new, old);

        let paths: Vec<&str> = map
            .instances(at)
            .iter()
            .map(|instance| instance.prefab().path())
            .collect();
        assert_eq!(paths, vec!["/turf/floor", "/obj/item/wrench", "/obj/console"]);

        match map.replace_instance(at, old, prefab("/obj/console")) {
            Err(MapError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_store_is_shared_across_tiles() {
        let mut map = LiveMap::new(MapSize::new(2, 1, 1));
        map.instance_add(Coord::new(1, 1, 1), prefab("/turf/floor"));
        map.instance_add(Coord::new(2, 1, 1), prefab("/turf/floor"));

        assert_eq!(map.store().len(), 1);
        let a = map.instances(Coord::new(1, 1, 1))[0].prefab().clone();
        let b = map.instances(Coord::new(2, 1, 1))[0].prefab().clone();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
