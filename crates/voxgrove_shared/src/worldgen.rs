use glam::IVec3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::chunk::ChunkData;
use crate::coords::{chunk_to_world, world_to_chunk, ChunkPos, LocalPos, CHUNK_SIZE, WORLD_HEIGHT};

/// Tallest tree above its root block: four trunk blocks, the leaf layers and the cap.
const TREE_HEIGHT: i32 = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub base_height: i32,
    pub wave_amplitude: f64,
    pub wave_frequency: f64,
    pub roughness_amplitude: f64,
    pub roughness_scale: f64,
    pub max_trees_per_chunk: u32,
    /// Columns with |x| and |z| below this stay flat at `base_height`.
    pub spawn_flat_radius: i32,
    /// No trees grow with |x| and |z| below this.
    pub spawn_tree_clearance: i32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            base_height: 12,
            wave_amplitude: 3.0,
            wave_frequency: 0.1,
            roughness_amplitude: 1.5,
            roughness_scale: 0.045,
            max_trees_per_chunk: 2,
            spawn_flat_radius: 3,
            spawn_tree_clearance: 5,
        }
    }
}

/// Deterministic height-field terrain with sparse trees.
#[derive(Clone, Debug)]
pub struct WorldGenerator {
    pub seed: u64,
    pub settings: TerrainSettings,
    roughness: Perlin,
}

impl WorldGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_settings(seed, TerrainSettings::default())
    }

    pub fn with_settings(seed: u64, settings: TerrainSettings) -> Self {
        Self {
            seed,
            settings,
            roughness: Perlin::new(seed as u32),
        }
    }

    /// Surface (grass) height of the column at world `(x, z)`.
    pub fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let settings = &self.settings;
        if world_x.abs() < settings.spawn_flat_radius && world_z.abs() < settings.spawn_flat_radius {
            return settings.base_height;
        }

        let wx = world_x as f64;
        let wz = world_z as f64;
        let waves = (wx * settings.wave_frequency).sin() * settings.wave_amplitude
            + (wz * settings.wave_frequency).cos() * settings.wave_amplitude;
        let rough = self
            .roughness
            .get([wx * settings.roughness_scale, wz * settings.roughness_scale])
            * settings.roughness_amplitude;

        let height = settings.base_height + (waves + rough).floor() as i32;
        height.clamp(1, WORLD_HEIGHT as i32 - 2)
    }

    fn column_block(world_y: i32, surface_y: i32) -> BlockId {
        if world_y == 0 {
            BlockId::BEDROCK
        } else if world_y < surface_y - 3 {
            BlockId::STONE
        } else if world_y < surface_y {
            BlockId::DIRT
        } else if world_y == surface_y {
            BlockId::GRASS
        } else {
            BlockId::AIR
        }
    }

    fn chunk_hash(&self, pos: ChunkPos, salt: u64) -> u64 {
        let mut hash = self
            .seed
            .wrapping_add(salt)
            .wrapping_mul(6364136223846793005)
            .wrapping_add((pos.x as i64 as u64).wrapping_mul(1442695040888963407))
            .wrapping_add((pos.z as i64 as u64).wrapping_mul(1103515245));
        hash ^= hash >> 29;
        hash = hash.wrapping_mul(0xbf58476d1ce4e5b9);
        hash ^ (hash >> 32)
    }

    /// Local trunk positions for this chunk's trees. Trunks stay two blocks away from
    /// the chunk edge so a whole canopy fits inside the chunk.
    fn tree_sites(&self, pos: ChunkPos) -> Vec<(u8, u8)> {
        let count = self.chunk_hash(pos, 17) % (u64::from(self.settings.max_trees_per_chunk) + 1);
        let span = (CHUNK_SIZE - 4) as u64;
        (0..count)
            .map(|index| {
                let hash = self.chunk_hash(pos, 101 + index * 31);
                let x = 2 + (hash >> 8) % span;
                let z = 2 + (hash >> 24) % span;
                (x as u8, z as u8)
            })
            .collect()
    }

    pub fn generate_chunk(&self, pos: ChunkPos) -> ChunkData {
        let mut chunk = ChunkData::new_empty();
        let mut surface_heights = [[0i32; CHUNK_SIZE]; CHUNK_SIZE];

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let anchor = chunk_to_world(
                    pos,
                    LocalPos {
                        x: x as u8,
                        y: 0,
                        z: z as u8,
                    },
                );
                let surface_y = self.surface_height(anchor.x, anchor.z);
                surface_heights[z][x] = surface_y;

                for y in 0..=surface_y {
                    let block = Self::column_block(y, surface_y);
                    chunk.set(
                        LocalPos {
                            x: x as u8,
                            y: y as u8,
                            z: z as u8,
                        },
                        block,
                    );
                }
            }
        }

        let clearance = self.settings.spawn_tree_clearance;
        for (x, z) in self.tree_sites(pos) {
            let surface_y = surface_heights[usize::from(z)][usize::from(x)];
            let anchor = chunk_to_world(pos, LocalPos { x, y: 0, z });
            if anchor.x.abs() < clearance && anchor.z.abs() < clearance {
                continue;
            }
            if surface_y + 1 + TREE_HEIGHT >= WORLD_HEIGHT as i32 {
                continue;
            }
            let ground = LocalPos {
                x,
                y: surface_y as u8,
                z,
            };
            // A second site may land inside the first tree's canopy.
            if chunk.get(ground) != BlockId::GRASS
                || chunk.get(LocalPos { y: ground.y + 1, ..ground }) != BlockId::AIR
            {
                continue;
            }

            let root = IVec3::new(anchor.x, surface_y + 1, anchor.z);
            for (world, block) in tree_blocks(root) {
                let Some((owner, local)) = world_to_chunk(world) else {
                    continue;
                };
                if owner != pos {
                    continue;
                }
                if block == BlockId::WOOD || chunk.get(local) == BlockId::AIR {
                    chunk.set(local, block);
                }
            }
        }

        chunk
    }
}

/// Blocks of a tree whose trunk starts at `root`.
///
/// Four trunk blocks, two leaf layers of radius 2 without corners around the top of
/// the trunk, a radius 1 layer above it and a single leaf cap.
pub fn tree_blocks(root: IVec3) -> Vec<(IVec3, BlockId)> {
    let mut blocks = Vec::with_capacity(64);
    for dy in 0..4 {
        blocks.push((root + IVec3::new(0, dy, 0), BlockId::WOOD));
    }
    for dy in 2..=4 {
        let radius: i32 = if dy == 4 { 1 } else { 2 };
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() == 2 && dz.abs() == 2 {
                    continue;
                }
                if dx == 0 && dz == 0 && dy < 4 {
                    continue;
                }
                blocks.push((root + IVec3::new(dx, dy, dz), BlockId::LEAVES));
            }
        }
    }
    blocks.push((root + IVec3::new(0, 5, 0), BlockId::LEAVES));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let generator = WorldGenerator::new(1234);
        let a = generator.generate_chunk(ChunkPos::new(2, -1));
        let b = generator.generate_chunk(ChunkPos::new(2, -1));
        assert_eq!(a.blocks, b.blocks);
    }

    #[test]
    fn spawn_area_is_flat_at_base_height() {
        let generator = WorldGenerator::new(99);
        for x in -2..=2 {
            for z in -2..=2 {
                assert_eq!(generator.surface_height(x, z), 12);
            }
        }
    }

    #[test]
    fn columns_are_layered_bedrock_stone_dirt_grass() {
        let generator = WorldGenerator::new(7);
        let chunk = generator.generate_chunk(ChunkPos::new(0, 0));
        let local = |y: u8| LocalPos { x: 1, y, z: 1 };
        let surface = generator.surface_height(1, 1) as u8;

        assert_eq!(chunk.get(local(0)), BlockId::BEDROCK);
        assert_eq!(chunk.get(local(surface)), BlockId::GRASS);
        assert_eq!(chunk.get(local(surface - 1)), BlockId::DIRT);
        assert_eq!(chunk.get(local(surface - 3)), BlockId::DIRT);
        assert_eq!(chunk.get(local(surface - 4)), BlockId::STONE);
        assert_eq!(chunk.get(local(surface + 1)), BlockId::AIR);
    }

    #[test]
    fn heights_stay_inside_the_world() {
        let generator = WorldGenerator::with_settings(
            5,
            TerrainSettings {
                wave_amplitude: 40.0,
                ..TerrainSettings::default()
            },
        );
        for x in -64..64 {
            let height = generator.surface_height(x, x * 3);
            assert!((1..WORLD_HEIGHT as i32 - 1).contains(&height));
        }
    }

    #[test]
    fn tree_template_has_trunk_and_cap() {
        let root = IVec3::new(10, 13, 10);
        let blocks = tree_blocks(root);
        let wood = blocks.iter().filter(|(_, b)| *b == BlockId::WOOD).count();
        assert_eq!(wood, 4);
        assert!(blocks.contains(&(root + IVec3::new(0, 5, 0), BlockId::LEAVES)));
        assert!(!blocks
            .iter()
            .any(|(pos, _)| *pos == root + IVec3::new(2, 2, 2)));
    }

    #[test]
    fn no_trees_near_spawn() {
        let generator = WorldGenerator::with_settings(
            3,
            TerrainSettings {
                max_trees_per_chunk: 8,
                ..TerrainSettings::default()
            },
        );
        for pos in [ChunkPos::new(0, 0), ChunkPos::new(-1, -1), ChunkPos::new(-1, 0), ChunkPos::new(0, -1)] {
            let chunk = generator.generate_chunk(pos);
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let anchor = chunk_to_world(pos, LocalPos { x: x as u8, y: 0, z: z as u8 });
                    if anchor.x.abs() < 5 && anchor.z.abs() < 5 {
                        let top = generator.surface_height(anchor.x, anchor.z) as u8;
                        let above = LocalPos { x: x as u8, y: top + 1, z: z as u8 };
                        assert_ne!(chunk.get(above), BlockId::WOOD);
                    }
                }
            }
        }
    }

    #[test]
    fn some_chunks_grow_trees() {
        let generator = WorldGenerator::new(42);
        let wood: usize = (3..12)
            .map(|x| generator.generate_chunk(ChunkPos::new(x, 4)).count(BlockId::WOOD))
            .sum();
        assert!(wood > 0);
        assert_eq!(wood % 4, 0);
    }
}
