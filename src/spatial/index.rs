use macroquad::prelude::*;
use std::collections::HashMap;

/// Default chunk edge, in output units.
pub const CHUNK_SIZE: i32 = 256;

/// Entities whose bounds touch more chunks than this are kept in a single
/// overflow list instead of being filed chunk by chunk.
pub const MAX_CHUNKS_PER_ENTRY: u64 = 1024;

/// Integer chunk address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Column, growing with world x
    pub x: i32,
    /// Row, growing with world y
    pub y: i32,
}

/// Chunk containing `p`. Coordinates outside the `i32` range saturate.
#[inline]
pub fn world_to_chunk(p: Vec2, chunk_size: i32) -> ChunkCoord {
    ChunkCoord {
        x: (p.x.floor() as i32).div_euclid(chunk_size),
        y: (p.y.floor() as i32).div_euclid(chunk_size),
    }
}

/// Inclusive rectangle of chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Lowest column and row
    pub min: ChunkCoord,
    /// Highest column and row
    pub max: ChunkCoord,
}

impl ChunkRange {
    /// Chunks covering the rectangle spanned by two corners in any order.
    pub fn covering(a: Vec2, b: Vec2, chunk_size: i32) -> Self {
        let a = world_to_chunk(a, chunk_size);
        let b = world_to_chunk(b, chunk_size);
        ChunkRange {
            min: ChunkCoord {
                x: a.x.min(b.x),
                y: a.y.min(b.y),
            },
            max: ChunkCoord {
                x: a.x.max(b.x),
                y: a.y.max(b.y),
            },
        }
    }

    /// Number of chunks in the range.
    pub fn count(&self) -> u64 {
        let w = (self.max.x as i64 - self.min.x as i64 + 1) as u64;
        let h = (self.max.y as i64 - self.min.y as i64 + 1) as u64;
        w.saturating_mul(h)
    }

    /// `true` if `c` lies inside.
    pub fn contains(&self, c: ChunkCoord) -> bool {
        (self.min.x..=self.max.x).contains(&c.x) && (self.min.y..=self.max.y).contains(&c.y)
    }

    /// Every chunk, row by row. Lazy: nothing is allocated.
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| ChunkCoord { x, y }))
    }
}

/// Chunked spatial hash over the bounds of the entities in one sprite list.
/// Stores entity indices; an entity spanning several chunks is filed in each.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    chunk_size: i32,
    pub(crate) buckets: HashMap<ChunkCoord, Vec<usize>>,
    pub(crate) oversized: Vec<usize>,
    len: usize,
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(CHUNK_SIZE)
    }
}

impl SpatialHash {
    /// Empty hash with square chunks of `chunk_size` units.
    pub fn new(chunk_size: i32) -> Self {
        SpatialHash {
            chunk_size: chunk_size.max(1),
            buckets: HashMap::new(),
            oversized: Vec::new(),
            len: 0,
        }
    }

    /// Chunk edge in output units.
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Number of entities inserted.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` before the first insert.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File entity `index` under every chunk its bounds touch.
    pub fn insert(&mut self, index: usize, min: Vec2, max: Vec2) {
        let range = ChunkRange::covering(min, max, self.chunk_size);
        if range.count() > MAX_CHUNKS_PER_ENTRY {
            self.oversized.push(index);
        } else {
            for coord in range.iter() {
                self.buckets.entry(coord).or_default().push(index);
            }
        }
        self.len += 1;
    }

    pub(crate) fn bucket(&self, coord: ChunkCoord) -> &[usize] {
        self.buckets.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }
}
