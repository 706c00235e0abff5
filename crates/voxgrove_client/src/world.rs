use std::time::Instant;

use glam::{IVec3, Vec3};
use rayon::ThreadPoolBuildError;
use rustc_hash::FxHashMap;
use tracing::{debug, info};
use voxgrove_shared::ao::face_ao_brightness;
use voxgrove_shared::block::BlockId;
use voxgrove_shared::chunk::ChunkData;
use voxgrove_shared::coords::{in_height_range, world_to_chunk, ChunkPos};
use voxgrove_shared::daylight::DayCycle;
use voxgrove_shared::face::Face;
use voxgrove_shared::lighting::{DynamicLight, LightAccess, LightId, ShadowBaker};
use voxgrove_shared::storage::{DropEvent, VoxelStorage};
use voxgrove_shared::worldgen::{tree_blocks, WorldGenerator};

use crate::config::EngineConfig;
use crate::mesh_worker::MeshWorker;
use crate::renderer::mesh::{generate_mesh, generate_quads, ChunkMesh, Quad};

/// What one call to [`WorldEngine::tick`] did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub day_rolled: bool,
    pub sky_changed: bool,
    pub rebaked_chunks: usize,
    pub remeshed_chunks: usize,
    pub quads: usize,
}

/// Owns the blocks, their shadows and meshes, and keeps the three consistent.
///
/// Gameplay code only reads and writes blocks through [`WorldEngine::get_block`] and
/// [`WorldEngine::set_block`]. Every edit leaves the affected chunks dirty and the
/// next [`WorldEngine::tick`] remeshes them.
pub struct WorldEngine {
    config: EngineConfig,
    storage: VoxelStorage,
    shadows: ShadowBaker,
    day: DayCycle,
    mesher: MeshWorker,
    meshes: FxHashMap<ChunkPos, ChunkMesh>,
    torch_lights: FxHashMap<IVec3, LightId>,
}

impl WorldEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ThreadPoolBuildError> {
        let generator =
            WorldGenerator::with_settings(config.world.seed, config.world.terrain.clone());
        Self::with_storage(config, VoxelStorage::with_generator(generator))
    }

    /// Engine over caller-provided storage, e.g. an empty world without terrain.
    pub fn with_storage(
        config: EngineConfig,
        storage: VoxelStorage,
    ) -> Result<Self, ThreadPoolBuildError> {
        let mesher = MeshWorker::new(&config.meshing, config.mesh_settings())?;
        let day = DayCycle::new(config.day.clone());
        let mut shadows = ShadowBaker::new(config.lighting.clone());
        shadows.set_sky_level(shadows.current_sky_light(day.sun_height()));

        Ok(Self {
            config,
            storage,
            shadows,
            day,
            mesher,
            meshes: FxHashMap::default(),
            torch_lights: FxHashMap::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &VoxelStorage {
        &self.storage
    }

    pub fn shadows(&self) -> &ShadowBaker {
        &self.shadows
    }

    pub fn day(&self) -> &DayCycle {
        &self.day
    }

    /// Jumps the clock. Sky light follows at the next poll.
    pub fn set_time_of_day(&mut self, fraction: f32) {
        self.day.set_fraction(fraction);
    }

    /// Generates every chunk within the configured radius and bakes their shadows.
    ///
    /// Does nothing for storage without a terrain generator.
    pub fn generate_world(&mut self) {
        let Some(generator) = self.storage.generator() else {
            return;
        };
        let started = Instant::now();
        let radius = self.config.world.radius_chunks.max(0);
        let positions: Vec<ChunkPos> = (-radius..radius)
            .flat_map(|cz| (-radius..radius).map(move |cx| ChunkPos::new(cx, cz)))
            .filter(|pos| !self.storage.contains_chunk(*pos))
            .collect();

        let generated: Vec<(ChunkPos, ChunkData)> = match self.mesher.jobs() {
            Some(jobs) => jobs.map_batch(positions.clone(), |pos| (pos, generator.generate_chunk(pos))),
            None => positions
                .iter()
                .map(|pos| (*pos, generator.generate_chunk(*pos)))
                .collect(),
        };
        for (pos, data) in generated {
            self.storage.insert_chunk(pos, data);
        }
        info!(
            "Generated {} chunks in {:.2}ms",
            positions.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        self.shadows
            .set_sky_level(self.shadows.current_sky_light(self.day.sun_height()));
        self.shadows.bake_all_chunks(&self.storage, positions);
    }

    /// Installs chunk data and bakes its shadows.
    pub fn insert_chunk(&mut self, pos: ChunkPos, data: ChunkData) {
        self.storage.insert_chunk(pos, data);
        self.shadows.bake_chunk(&self.storage, pos);
    }

    pub fn get_block(&self, pos: IVec3) -> BlockId {
        self.storage.get(pos)
    }

    /// Writes a block and keeps shadows and torch lights in step with it.
    ///
    /// Items that cannot be placed are ignored. Returns the item dropped when a block
    /// is broken.
    pub fn set_block(&mut self, pos: IVec3, block: BlockId) -> Option<DropEvent> {
        if block != BlockId::AIR && !block.is_placeable() {
            return None;
        }
        let (chunk_pos, _) = world_to_chunk(pos)?;
        self.ensure_chunk(chunk_pos);

        let previous = self.storage.get(pos);
        if previous == block {
            return None;
        }

        let dropped = self.storage.set(pos, block);
        self.shadows
            .update_columns_around(&self.storage, pos.x, pos.z);

        if previous.light_emission() > 0 {
            if let Some(id) = self.torch_lights.remove(&pos) {
                self.remove_light(id);
            }
        }
        if block.light_emission() > 0 {
            let id = self.add_light(
                pos.as_vec3() + Vec3::splat(0.5),
                self.config.lighting.torch_intensity,
                self.config.lighting.torch_radius,
            );
            self.torch_lights.insert(pos, id);
        }

        dropped
    }

    /// Creates and bakes the chunk if it is missing.
    fn ensure_chunk(&mut self, pos: ChunkPos) {
        if self.storage.ensure_chunk(pos) {
            self.shadows.bake_chunk(&self.storage, pos);
        }
    }

    /// Grows the sapling at `pos` into a tree. Only air is overwritten.
    ///
    /// Returns false when there is no sapling or the tree would not fit.
    pub fn grow_tree(&mut self, pos: IVec3) -> bool {
        if self.get_block(pos) != BlockId::SAPLING {
            return false;
        }
        let blocks = tree_blocks(pos);
        if blocks.iter().any(|(cell, _)| !in_height_range(cell.y)) {
            return false;
        }

        // Generate every chunk the canopy reaches first, so its terrain counts as
        // occupied.
        for (cell, _) in &blocks {
            if let Some((chunk_pos, _)) = world_to_chunk(*cell) {
                self.ensure_chunk(chunk_pos);
            }
        }

        for (cell, block) in blocks {
            if cell == pos || self.get_block(cell) == BlockId::AIR {
                self.set_block(cell, block);
            }
        }
        debug!("Grew tree at {:?}", pos);
        true
    }

    pub fn add_light(&mut self, position: Vec3, intensity: f32, radius: f32) -> LightId {
        let id = self.shadows.add_light(position, intensity, radius);
        if let Some(light) = self.shadows.light(id).copied() {
            self.mark_light_dirty(&light);
        }
        id
    }

    /// Moves a light. Returns false for unknown ids.
    pub fn update_light(&mut self, id: LightId, position: Vec3) -> bool {
        let Some(previous) = self.shadows.update_light(id, position) else {
            return false;
        };
        self.mark_light_dirty(&previous);
        if let Some(light) = self.shadows.light(id).copied() {
            self.mark_light_dirty(&light);
        }
        true
    }

    pub fn remove_light(&mut self, id: LightId) -> bool {
        let Some(light) = self.shadows.remove_light(id) else {
            return false;
        };
        self.mark_light_dirty(&light);
        true
    }

    fn mark_light_dirty(&mut self, light: &DynamicLight) {
        let reach = light.radius.ceil() as i32 + 1;
        let center = light.position.floor().as_ivec3();
        self.storage.mark_area_dirty(
            center.x - reach,
            center.z - reach,
            center.x + reach,
            center.z + reach,
        );
    }

    /// Runs one frame: advances the clock, re-bakes a slice of the world after a sky
    /// change and remeshes every dirty chunk.
    pub fn tick(&mut self, dt: f32) -> FrameStats {
        let mut stats = FrameStats {
            day_rolled: self.day.advance(dt),
            ..FrameStats::default()
        };
        stats.sky_changed = self.shadows.poll_sky(dt, self.day.sun_height());

        let budget = self.config.lighting.rebake_chunks_per_tick;
        let rebaked = self.shadows.process_rebake(&self.storage, budget);
        stats.rebaked_chunks = rebaked.len();
        // Border faces sample the shadow of the cell in front of them, which can
        // belong to the neighbouring chunk.
        for pos in rebaked {
            for neighbor in pos.neighborhood() {
                self.storage.mark_dirty(neighbor);
            }
        }

        let (chunks, quads) = self.remesh_dirty();
        stats.remeshed_chunks = chunks;
        stats.quads = quads;

        if stats.remeshed_chunks > 0 || stats.sky_changed {
            debug!(
                "Frame: remeshed {} chunks ({} quads), re-baked {}, {} re-bakes pending",
                stats.remeshed_chunks,
                stats.quads,
                stats.rebaked_chunks,
                self.shadows.pending_rebakes()
            );
        }
        stats
    }

    /// Meshes every dirty chunk and clears the dirty set. Returns the chunk and quad
    /// counts.
    pub fn remesh_dirty(&mut self) -> (usize, usize) {
        let dirty = self.storage.take_dirty();
        if dirty.is_empty() {
            return (0, 0);
        }
        let meshed = self.mesher.mesh_chunks(&self.storage, &self.shadows, dirty);
        let chunks = meshed.len();
        let mut quads = 0;
        for chunk in meshed {
            quads += chunk.mesh.quad_count();
            self.meshes.insert(chunk.chunk_pos, chunk.mesh);
        }
        (chunks, quads)
    }

    pub fn mesh(&self, pos: ChunkPos) -> Option<&ChunkMesh> {
        self.meshes.get(&pos)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (ChunkPos, &ChunkMesh)> + '_ {
        self.meshes.iter().map(|(pos, mesh)| (*pos, mesh))
    }

    /// Builds a mesh from the current state without storing it.
    pub fn generate_mesh(&self, pos: ChunkPos) -> ChunkMesh {
        generate_mesh(&self.storage, &self.shadows, pos, self.mesher.settings())
    }

    pub fn quads(&self, pos: ChunkPos) -> Vec<Quad> {
        generate_quads(&self.storage, &self.shadows, pos, self.mesher.settings())
    }

    pub fn shadow_brightness(&self, pos: IVec3) -> f32 {
        self.shadows.shadow_brightness(pos)
    }

    /// AO brightness of the four corners of one face of the block at `pos`.
    pub fn face_ao(&self, pos: IVec3, face: Face) -> [f32; 4] {
        face_ao_brightness(&self.storage, pos, face, &self.config.ambient_occlusion)
    }

    /// Combined sky and point light at a cell, `None` before its chunk is baked.
    pub fn light_level(&self, pos: IVec3) -> Option<f32> {
        self.shadows.light_level(pos)
    }

    pub fn is_passable(&self, pos: IVec3) -> bool {
        self.storage.is_passable(pos)
    }

    pub fn is_dirty(&self, pos: ChunkPos) -> bool {
        self.storage.is_dirty(pos)
    }

    pub fn dirty_count(&self) -> usize {
        self.storage.dirty_count()
    }

    /// Drops every chunk, light and mesh.
    pub fn teardown(&mut self) {
        info!(
            "Tearing down world with {} chunks",
            self.storage.chunk_count()
        );
        self.storage.clear();
        self.shadows.clear();
        self.meshes.clear();
        self.torch_lights.clear();
    }
}
