mod index;
mod query;

pub use index::{
    world_to_chunk, ChunkCoord, ChunkRange, SpatialHash, CHUNK_SIZE, MAX_CHUNKS_PER_ENTRY,
};
