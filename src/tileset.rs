use crate::document::{TileDefinition, TileSet};
use std::borrow::Cow;

/// Horizontal mirror flag, bit 31 of a raw cell.
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical mirror flag, bit 30.
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal mirror flag, bit 29.
pub const FLIP_D: u32 = 0x2000_0000;

/// Orientation bits carried by a raw cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Orientation {
    /// Mirrored left/right
    pub flip_h: bool,
    /// Mirrored top/bottom
    pub flip_v: bool,
    /// Mirrored across the top-left/bottom-right diagonal
    pub flip_d: bool,
}

impl Orientation {
    /// No flips.
    pub const NONE: Orientation = Orientation {
        flip_h: false,
        flip_v: false,
        flip_d: false,
    };

    /// `true` if any flag is set.
    pub fn any(self) -> bool {
        self.flip_h || self.flip_v || self.flip_d
    }
}

/// Raw 32-bit cell value: gid plus orientation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    /// The value exactly as stored, flags included.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Split into the plain gid and its orientation. Flags are tested
    /// horizontal, vertical, diagonal, clearing each as it matches.
    pub fn decode(self) -> (u32, Orientation) {
        let mut gid = self.0;
        let mut o = Orientation::NONE;
        if gid & FLIP_H != 0 {
            o.flip_h = true;
            gid &= !FLIP_H;
        }
        if gid & FLIP_V != 0 {
            o.flip_v = true;
            gid &= !FLIP_V;
        }
        if gid & FLIP_D != 0 {
            o.flip_d = true;
            gid &= !FLIP_D;
        }
        (gid, o)
    }

    /// Gid with the orientation flags stripped.
    #[inline]
    pub fn clean(self) -> u32 {
        self.decode().0
    }

    /// `true` for gid 0, the empty cell, whatever flags are set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.clean() == 0
    }
}

/// A tile looked up from a gid. The definition is borrowed from its tileset
/// (or synthesised for sheet cells without an entry); orientation is per
/// instance.
#[derive(Debug, Clone)]
pub struct ResolvedTile<'a> {
    /// Owning tileset
    pub tileset: &'a TileSet,
    /// Definition, shared unless synthesised
    pub tile: Cow<'a, TileDefinition>,
    /// Gid with flags stripped
    pub gid: u32,
    /// Flags decoded from the raw value
    pub orientation: Orientation,
}

impl ResolvedTile<'_> {
    /// Id inside the owning tileset.
    pub fn local_id(&self) -> u32 {
        self.tile.id
    }
}

/// Non-overlapping gid ranges sorted by `first_gid`.
pub struct TilesetRegistry<'a> {
    sets: Vec<&'a TileSet>,
}

impl<'a> TilesetRegistry<'a> {
    /// Registry over `tilesets`, in any order.
    pub fn new(tilesets: &'a [TileSet]) -> Self {
        let mut sets: Vec<&TileSet> = tilesets.iter().collect();
        sets.sort_by_key(|t| t.first_gid);
        Self { sets }
    }

    /// Tileset whose range starts at or before `gid`.
    fn owner(&self, gid: u32) -> Option<&'a TileSet> {
        let idx = self.sets.partition_point(|t| t.first_gid <= gid);
        idx.checked_sub(1).map(|i| self.sets[i])
    }

    /// Look up a local id inside one tileset. Sheet sets answer for every id
    /// in range even without an explicit entry.
    pub fn tile_in(tileset: &'a TileSet, local_id: u32) -> Option<Cow<'a, TileDefinition>> {
        if let Some(def) = tileset.tile(local_id) {
            return Some(Cow::Borrowed(def));
        }
        if tileset.is_sheet() && local_id < tileset.tile_count {
            return Some(Cow::Owned(TileDefinition::bare(local_id)));
        }
        None
    }

    /// Resolve a raw cell value. `None` for empty cells and for gids no
    /// tileset claims.
    pub fn resolve(&self, raw: TileId) -> Option<ResolvedTile<'a>> {
        let (gid, orientation) = raw.decode();
        if gid == 0 {
            return None;
        }
        let tileset = self.owner(gid)?;
        let local = gid - tileset.first_gid;
        if tileset.is_sheet() && local >= tileset.tile_count {
            return None;
        }
        let tile = Self::tile_in(tileset, local)?;
        Some(ResolvedTile {
            tileset,
            tile,
            gid,
            orientation,
        })
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// `true` for a map without tilesets.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
