use super::index::{ChunkRange, SpatialHash};
use macroquad::prelude::*;

impl SpatialHash {
    /// Candidate entity indices whose chunks overlap the rectangle, sorted and
    /// without repeats. Candidates still need an exact bounds test.
    pub fn query_rect(&self, a: Vec2, b: Vec2) -> Vec<usize> {
        let range = ChunkRange::covering(a, b, self.chunk_size());
        let mut out: Vec<usize> = self.oversized.clone();
        if range.count() <= self.buckets.len() as u64 {
            out.extend(range.iter().flat_map(|c| self.bucket(c).iter().copied()));
        } else {
            // Wider than the occupied chunks: scan what exists
            out.extend(
                self.buckets
                    .iter()
                    .filter(|(c, _)| range.contains(**c))
                    .flat_map(|(_, ids)| ids.iter().copied()),
            );
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}
