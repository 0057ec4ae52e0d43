//! Core data model shared by the codec and the editing engine.
//!
//! Everything here is plain data: coordinates, sizes, identities and the
//! type-path conventions of the engine. The interesting behaviour lives in
//! the sibling modules (`vars`, `prefab`, `store`, `fragment`, `map`).

pub mod environment;
pub mod error;
pub mod fragment;
pub mod map;
pub mod prefab;
pub mod store;
pub mod vars;

pub use environment::{StaticEnvironment, TypeEnvironment};
pub use error::MapError;
pub use fragment::{Key, MapFragment, PrefabStack};
pub use map::{Instance, LiveMap, Tile};
pub use prefab::Prefab;
pub use store::PrefabStore;
pub use vars::{VarSet, quote_text, split_unquoted, unquote_text};

use std::fmt;

/// Numeric identity of an interned prefab. Assigned by the owning
/// `PrefabStore`, starting at 1.
pub type PrefabId = u64;

/// Sentinel id for a prefab that has not been interned yet.
pub const ID_NONE: PrefabId = 0;

/// Transient identity of a tile instance, used by editing operations.
/// Allocated per live map and never reused within its lifetime.
pub type InstanceId = u64;

/// Type-path roots the engine distinguishes for placement rules.
pub const PATH_AREA: &str = "/area";
pub const PATH_TURF: &str = "/turf";
pub const PATH_OBJ: &str = "/obj";

/// One tile position. 1-based inside a fragment; arbitrary origin on a
/// live map. Signed so offset arithmetic can go out of bounds safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Extents of a map or fragment. All components are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSize {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl MapSize {
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn volume(&self) -> usize {
        (self.width as usize) * (self.height as usize) * (self.depth as usize)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x >= 1
            && coord.x <= self.width
            && coord.y >= 1
            && coord.y <= self.height
            && coord.z >= 1
            && coord.z <= self.depth
    }

    /// Canonical traversal order used everywhere a deterministic pass over
    /// the whole volume is needed: z ascending, then y ascending, then x
    /// ascending.
    pub fn iter_coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let (w, h, d) = (self.width, self.height, self.depth);
        (1..=d).flat_map(move |z| {
            (1..=h).flat_map(move |y| (1..=w).map(move |x| Coord::new(x, y, z)))
        })
    }

    /// Row-major linear index for tile storage. Caller guarantees the
    /// coordinate is in bounds.
    pub fn linear_index(&self, coord: Coord) -> usize {
        let x = (coord.x - 1) as usize;
        let y = (coord.y - 1) as usize;
        let z = (coord.z - 1) as usize;
        (z * self.height as usize + y) * self.width as usize + x
    }
}

impl fmt::Display for MapSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// True when `path` sits at or under `base` in the type tree.
///
/// `/turf` matches `/turf` and `/turf/floor`, but not `/turfs`.
pub fn is_path_base(base: &str, path: &str) -> bool {
    path == base || (path.starts_with(base) && path[base.len()..].starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_path_base() {
        let test_cases = vec![
            ("/turf", "/turf", true),
            ("/turf", "/turf/floor", true),
            ("/turf", "/turf/floor/wood", true),
            ("/turf", "/turfs", false),
            ("/turf", "/area", false),
            ("/obj", "/obj/item", true),
            ("/obj", "/mob/rat", false),
        ];

        for (base, path, expected) in test_cases {
            assert_eq!(is_path_base(base, path), expected, "{base} vs {path}");
        }
    }

    #[test]
    fn test_iter_coords_order() {
        let size = MapSize::new(2, 2, 2);
        let coords: Vec<Coord> = size.iter_coords().collect();

        assert_eq!(coords.len(), 8);
        // z varies slowest, x fastest
        assert_eq!(coords[0], Coord::new(1, 1, 1));
        assert_eq!(coords[1], Coord::new(2, 1, 1));
        assert_eq!(coords[2], Coord::new(1, 2, 1));
        assert_eq!(coords[4], Coord::new(1, 1, 2));
        assert_eq!(coords[7], Coord::new(2, 2, 2));
    }

    #[test]
    fn test_linear_index_matches_traversal() {
        let size = MapSize::new(3, 4, 2);
        for (i, coord) in size.iter_coords().enumerate() {
            assert_eq!(size.linear_index(coord), i);
        }
    }

    #[test]
    fn test_contains() {
        let size = MapSize::new(3, 3, 1);
        assert!(size.contains(Coord::new(1, 1, 1)));
        assert!(size.contains(Coord::new(3, 3, 1)));
        assert!(!size.contains(Coord::new(0, 1, 1)));
        assert!(!size.contains(Coord::new(4, 1, 1)));
        assert!(!size.contains(Coord::new(1, 1, 2)));
        assert!(!size.contains(Coord::new(1, -2, 1)));
    }
}
