use glam::{IVec3, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::block::{drop_for, BlockId};
use crate::chunk::ChunkData;
use crate::coords::{column_chunk, column_footprint, world_to_chunk, ChunkPos, CHUNK_SIZE};
use crate::worldgen::WorldGenerator;

/// Read access to blocks by world coordinate.
pub trait BlockAccess {
    /// Returns AIR outside the world height or inside chunks that do not exist.
    fn block(&self, pos: IVec3) -> BlockId;
}

/// Item left behind when a block is broken.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DropEvent {
    pub item: BlockId,
    pub source: BlockId,
    /// Centre of the broken block.
    pub position: Vec3,
}

/// Chunked block storage with dirty tracking.
///
/// A chunk is dirty when its mesh no longer matches the blocks or lighting it was
/// built from. The dirty set is the only record of that; meshing drains it.
pub struct VoxelStorage {
    chunks: FxHashMap<ChunkPos, ChunkData>,
    dirty: FxHashSet<ChunkPos>,
    generator: Option<WorldGenerator>,
    rng: fastrand::Rng,
}

impl VoxelStorage {
    /// Storage whose lazily created chunks start as air.
    pub fn empty() -> Self {
        Self {
            chunks: FxHashMap::default(),
            dirty: FxHashSet::default(),
            generator: None,
            rng: fastrand::Rng::with_seed(0),
        }
    }

    /// Storage whose lazily created chunks come from terrain generation.
    pub fn with_generator(generator: WorldGenerator) -> Self {
        let rng = fastrand::Rng::with_seed(generator.seed);
        Self {
            generator: Some(generator),
            rng,
            ..Self::empty()
        }
    }

    /// Reseeds the random source used for chance-based drops.
    pub fn with_drop_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn generator(&self) -> Option<&WorldGenerator> {
        self.generator.as_ref()
    }

    pub fn get(&self, pos: IVec3) -> BlockId {
        let Some((chunk_pos, local)) = world_to_chunk(pos) else {
            return BlockId::AIR;
        };
        self.chunks
            .get(&chunk_pos)
            .map_or(BlockId::AIR, |chunk| chunk.get(local))
    }

    /// Writes a block, creating its chunk if needed.
    ///
    /// Marks every chunk whose faces can see the edited cell dirty and returns the
    /// drop when a block was broken. Writes outside the world height and writes of
    /// the value already present change nothing.
    pub fn set(&mut self, pos: IVec3, block: BlockId) -> Option<DropEvent> {
        let (chunk_pos, local) = world_to_chunk(pos)?;
        self.ensure_chunk(chunk_pos);
        let previous = self.chunks.get_mut(&chunk_pos)?.set(local, block);
        if previous == block {
            return None;
        }

        self.mark_footprint_dirty(pos.x, pos.z);

        if block != BlockId::AIR {
            return None;
        }
        drop_for(previous, self.rng.f32()).map(|item| DropEvent {
            item,
            source: previous,
            position: pos.as_vec3() + Vec3::splat(0.5),
        })
    }

    /// Creates the chunk if it is missing. Returns true when a chunk was created.
    pub fn ensure_chunk(&mut self, pos: ChunkPos) -> bool {
        if self.chunks.contains_key(&pos) {
            return false;
        }
        let data = match &self.generator {
            Some(generator) => generator.generate_chunk(pos),
            None => ChunkData::new_empty(),
        };
        debug!("Created chunk ({}, {})", pos.x, pos.z);
        self.insert_chunk(pos, data);
        true
    }

    /// Installs chunk data, replacing anything at `pos`.
    ///
    /// The chunk and its existing neighbours are marked dirty since their boundary
    /// faces previously looked into a missing chunk.
    pub fn insert_chunk(&mut self, pos: ChunkPos, data: ChunkData) {
        self.chunks.insert(pos, data);
        for neighbor in pos.neighborhood() {
            self.mark_dirty(neighbor);
        }
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&ChunkData> {
        self.chunks.get(&pos)
    }

    pub fn contains_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn chunk_positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Marks an existing chunk dirty. Returns false for missing chunks.
    pub fn mark_dirty(&mut self, pos: ChunkPos) -> bool {
        if !self.chunks.contains_key(&pos) {
            return false;
        }
        self.dirty.insert(pos);
        true
    }

    fn mark_footprint_dirty(&mut self, x: i32, z: i32) {
        for chunk_pos in column_footprint(x, z) {
            self.mark_dirty(chunk_pos);
        }
    }

    /// Marks every existing chunk overlapping the horizontal block range
    /// `[min_x, max_x] × [min_z, max_z]`.
    pub fn mark_area_dirty(&mut self, min_x: i32, min_z: i32, max_x: i32, max_z: i32) {
        let low = column_chunk(min_x, min_z);
        let high = column_chunk(max_x, max_z);
        for cz in low.z..=high.z {
            for cx in low.x..=high.x {
                self.mark_dirty(ChunkPos::new(cx, cz));
            }
        }
    }

    pub fn is_dirty(&self, pos: ChunkPos) -> bool {
        self.dirty.contains(&pos)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Clears the dirty set and returns its contents in a stable order.
    pub fn take_dirty(&mut self) -> Vec<ChunkPos> {
        let mut dirty: Vec<_> = self.dirty.drain().collect();
        dirty.sort_unstable();
        dirty
    }

    /// Whether an entity can occupy the cell.
    pub fn is_passable(&self, pos: IVec3) -> bool {
        !self.get(pos).is_meshed()
    }

    /// Height of the topmost block with geometry in the column, if any.
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        let chunk = self.chunks.get(&column_chunk(x, z))?;
        let size = CHUNK_SIZE as i32;
        chunk
            .top_meshed(x.rem_euclid(size) as u8, z.rem_euclid(size) as u8)
            .map(i32::from)
    }

    /// Drops every chunk and all dirty state.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.dirty.clear();
    }
}

impl BlockAccess for VoxelStorage {
    fn block(&self, pos: IVec3) -> BlockId {
        self.get(pos)
    }
}
