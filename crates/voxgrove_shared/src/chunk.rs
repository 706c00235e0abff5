use crate::block::BlockId;
use crate::coords::{local_to_index, LocalPos, CHUNK_AREA, CHUNK_SIZE, CHUNK_VOLUME, WORLD_HEIGHT};

/// Block array for one 16×32×16 chunk column, indexed `x + z*16 + y*16*16`.
#[derive(Clone, Debug)]
pub struct ChunkData {
    pub blocks: Box<[BlockId; CHUNK_VOLUME]>,
}

impl ChunkData {
    pub fn new_empty() -> Self {
        Self {
            blocks: Box::new([BlockId::AIR; CHUNK_VOLUME]),
        }
    }

    pub fn new_filled(block: BlockId) -> Self {
        Self {
            blocks: Box::new([block; CHUNK_VOLUME]),
        }
    }

    pub fn get(&self, local: LocalPos) -> BlockId {
        self.blocks[local_to_index(local)]
    }

    /// Writes `block` and returns the block it replaced.
    pub fn set(&mut self, local: LocalPos, block: BlockId) -> BlockId {
        let index = local_to_index(local);
        std::mem::replace(&mut self.blocks[index], block)
    }

    /// Fills local column `(x, z)` from `y_start` up to but excluding `y_end`.
    pub fn fill_column(&mut self, x: u8, z: u8, y_start: usize, y_end: usize, block: BlockId) {
        for y in y_start..y_end.min(WORLD_HEIGHT) {
            self.set(LocalPos { x, y: y as u8, z }, block);
        }
    }

    /// Height of the topmost block with cube geometry in local column `(x, z)`.
    pub fn top_meshed(&self, x: u8, z: u8) -> Option<u8> {
        let column = usize::from(x) + usize::from(z) * CHUNK_SIZE;
        (0..WORLD_HEIGHT)
            .rev()
            .find(|&y| self.blocks[column + y * CHUNK_AREA].is_meshed())
            .map(|y| y as u8)
    }

    pub fn count(&self, block: BlockId) -> usize {
        self.blocks.iter().filter(|&&b| b == block).count()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&b| b == BlockId::AIR)
    }
}

impl Default for ChunkData {
    fn default() -> Self {
        Self::new_empty()
    }
}
