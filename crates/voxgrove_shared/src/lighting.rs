use std::time::Instant;

use glam::{IVec3, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use voxgrove_core::WorkQueue;

use crate::coords::{
    column_chunk, in_height_range, local_to_index, world_to_chunk, ChunkPos, LocalPos,
    CHUNK_AREA, CHUNK_SIZE, CHUNK_VOLUME, WORLD_HEIGHT,
};
use crate::storage::BlockAccess;

pub const MAX_LIGHT_LEVEL: u8 = 15;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub enabled: bool,
    /// Sky level once the sun is below the twilight band.
    pub night_level: u8,
    /// Half-width, in sun-height units, of the band around the horizon where sky
    /// light fades between night and day.
    pub twilight_band: f32,
    /// Sky light lost per foliage block.
    pub foliage_attenuation: u8,
    /// Brightness at light level 0.
    pub min_brightness: f32,
    /// Exponent of the level-to-brightness curve. Must exceed 1.
    pub brightness_exponent: f32,
    /// Brightness reported for chunks that were never baked.
    pub unbaked_brightness: f32,
    /// Seconds between checks for a sky level change.
    pub sky_poll_interval: f32,
    /// Chunks re-baked per tick after a sky level change.
    pub rebake_chunks_per_tick: usize,
    pub torch_intensity: f32,
    pub torch_radius: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            night_level: 6,
            twilight_band: 0.2,
            foliage_attenuation: 2,
            min_brightness: 0.2,
            brightness_exponent: 1.6,
            unbaked_brightness: 0.6,
            sky_poll_interval: 1.0,
            rebake_chunks_per_tick: 4,
            torch_intensity: 14.0,
            torch_radius: 8.0,
        }
    }
}

/// Sky light for a sun height in `[-1, 1]`.
///
/// Full daylight above the twilight band, `night_level` below it, linear in between.
pub fn sky_light_level(sun_height: f32, settings: &LightingSettings) -> u8 {
    let night = settings.night_level.min(MAX_LIGHT_LEVEL);
    let band = settings.twilight_band.max(f32::EPSILON);
    if sun_height >= band {
        return MAX_LIGHT_LEVEL;
    }
    if sun_height <= -band {
        return night;
    }
    let t = (sun_height + band) / (2.0 * band);
    let level = f32::from(night) + t * f32::from(MAX_LIGHT_LEVEL - night);
    (level.round() as u8).clamp(night, MAX_LIGHT_LEVEL)
}

/// Maps a light level to a brightness multiplier in `[min_brightness, 1]`.
pub fn light_brightness(level: f32, settings: &LightingSettings) -> f32 {
    let normalized = (level / f32::from(MAX_LIGHT_LEVEL)).clamp(0.0, 1.0);
    let curve = normalized.powf(settings.brightness_exponent.max(1.0));
    settings.min_brightness + (1.0 - settings.min_brightness) * curve
}

/// Sky light for every cell of the column at world `(x, z)`, indexed by y.
///
/// Light enters at `sky_level` and sweeps down. Cells without geometry pass it on,
/// foliage weakens it, and the first opaque block takes the current value while
/// everything under it stays dark.
pub fn bake_column<W: BlockAccess + ?Sized>(
    world: &W,
    x: i32,
    z: i32,
    sky_level: u8,
    foliage_attenuation: u8,
) -> [u8; WORLD_HEIGHT] {
    let mut levels = [0u8; WORLD_HEIGHT];
    let mut light = sky_level.min(MAX_LIGHT_LEVEL);
    for y in (0..WORLD_HEIGHT).rev() {
        let block = world.block(IVec3::new(x, y as i32, z));
        if block.is_opaque() {
            levels[y] = light;
            break;
        }
        if block.is_foliage() {
            light = light.saturating_sub(foliage_attenuation);
        }
        levels[y] = light;
    }
    levels
}

/// Baked sky light for one chunk, laid out like its block array.
#[derive(Clone, Debug)]
pub struct LightMap {
    levels: Box<[u8; CHUNK_VOLUME]>,
}

impl LightMap {
    pub fn new() -> Self {
        Self {
            levels: Box::new([0; CHUNK_VOLUME]),
        }
    }

    pub fn get(&self, local: LocalPos) -> u8 {
        self.levels[local_to_index(local)]
    }

    fn set_column(&mut self, x: u8, z: u8, column: &[u8; WORLD_HEIGHT]) {
        let base = usize::from(x) + usize::from(z) * CHUNK_SIZE;
        for (y, level) in column.iter().enumerate() {
            self.levels[base + y * CHUNK_AREA] = (*level).min(MAX_LIGHT_LEVEL);
        }
    }

    fn column(&self, x: u8, z: u8) -> [u8; WORLD_HEIGHT] {
        let base = usize::from(x) + usize::from(z) * CHUNK_SIZE;
        std::array::from_fn(|y| self.levels[base + y * CHUNK_AREA])
    }
}

impl Default for LightMap {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(u32);

/// Point light owned by a caller, such as a torch or campfire.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DynamicLight {
    pub position: Vec3,
    /// Light level at the centre.
    pub intensity: f32,
    pub radius: f32,
}

impl DynamicLight {
    pub fn new(position: Vec3, intensity: f32, radius: f32) -> Self {
        assert!(
            radius.is_finite() && radius > 0.0,
            "light radius must be positive and finite, got {radius}"
        );
        Self {
            position,
            intensity,
            radius,
        }
    }

    /// `intensity * (1 - d/r)^2` inside the radius, 0 at and beyond it.
    pub fn contribution(&self, point: Vec3) -> f32 {
        let distance = self.position.distance(point);
        if distance >= self.radius {
            return 0.0;
        }
        let falloff = 1.0 - distance / self.radius;
        self.intensity * falloff * falloff
    }
}

/// Per-cell brightness consumed by the meshers.
pub trait LightAccess {
    fn shadow_brightness(&self, pos: IVec3) -> f32;
}

/// Lighting that leaves every face at full brightness.
#[derive(Copy, Clone, Debug, Default)]
pub struct FullBright;

impl LightAccess for FullBright {
    fn shadow_brightness(&self, _pos: IVec3) -> f32 {
        1.0
    }
}

/// Column sky light per chunk plus dynamic point lights.
///
/// A chunk without a [`LightMap`] has never been baked and reads as
/// `unbaked_brightness`. Bakes are synchronous per chunk and per column; a sky level
/// change re-bakes the world a few chunks per tick through a coalescing queue.
pub struct ShadowBaker {
    settings: LightingSettings,
    maps: FxHashMap<ChunkPos, LightMap>,
    lights: FxHashMap<LightId, DynamicLight>,
    next_light_id: u32,
    sky_level: u8,
    poll_timer: f32,
    rebake_queue: WorkQueue<ChunkPos>,
}

impl ShadowBaker {
    pub fn new(settings: LightingSettings) -> Self {
        Self {
            settings,
            maps: FxHashMap::default(),
            lights: FxHashMap::default(),
            next_light_id: 0,
            sky_level: MAX_LIGHT_LEVEL,
            poll_timer: 0.0,
            rebake_queue: WorkQueue::new(),
        }
    }

    pub fn settings(&self) -> &LightingSettings {
        &self.settings
    }

    /// Sky level used by bakes.
    pub fn sky_level(&self) -> u8 {
        self.sky_level
    }

    /// Sets the bake sky level without scheduling anything. Existing maps keep their
    /// old values until re-baked.
    pub fn set_sky_level(&mut self, level: u8) {
        self.sky_level = level.min(MAX_LIGHT_LEVEL);
    }

    pub fn current_sky_light(&self, sun_height: f32) -> u8 {
        sky_light_level(sun_height, &self.settings)
    }

    pub fn bake_column<W: BlockAccess + ?Sized>(&self, world: &W, x: i32, z: i32) -> [u8; WORLD_HEIGHT] {
        bake_column(world, x, z, self.sky_level, self.settings.foliage_attenuation)
    }

    pub fn bake_chunk<W: BlockAccess + ?Sized>(&mut self, world: &W, pos: ChunkPos) {
        let origin = pos.origin();
        let mut map = LightMap::new();
        for z in 0..CHUNK_SIZE as u8 {
            for x in 0..CHUNK_SIZE as u8 {
                let column = self.bake_column(world, origin.x + i32::from(x), origin.z + i32::from(z));
                map.set_column(x, z, &column);
            }
        }
        self.maps.insert(pos, map);
    }

    pub fn bake_all_chunks<W, I>(&mut self, world: &W, chunks: I)
    where
        W: BlockAccess + ?Sized,
        I: IntoIterator<Item = ChunkPos>,
    {
        let started = Instant::now();
        let mut count = 0usize;
        for pos in chunks {
            self.bake_chunk(world, pos);
            self.rebake_queue.remove(&pos);
            count += 1;
        }
        info!(
            "Baked shadows for {} chunks at sky level {} in {:.2}ms",
            count,
            self.sky_level,
            started.elapsed().as_secs_f64() * 1000.0
        );
    }

    /// Re-bakes the column at world `(x, z)` if its chunk has been baked.
    pub fn update_column<W: BlockAccess + ?Sized>(&mut self, world: &W, x: i32, z: i32) -> bool {
        let chunk_pos = column_chunk(x, z);
        if !self.maps.contains_key(&chunk_pos) {
            return false;
        }
        let column = self.bake_column(world, x, z);
        let size = CHUNK_SIZE as i32;
        let Some(map) = self.maps.get_mut(&chunk_pos) else {
            return false;
        };
        map.set_column(x.rem_euclid(size) as u8, z.rem_euclid(size) as u8, &column);
        true
    }

    /// Re-bakes the column at `(x, z)` and its eight neighbours after an edit there.
    pub fn update_columns_around<W: BlockAccess + ?Sized>(&mut self, world: &W, x: i32, z: i32) -> usize {
        let mut updated = 0;
        for dz in -1..=1 {
            for dx in -1..=1 {
                if self.update_column(world, x + dx, z + dz) {
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Baked column values at world `(x, z)`.
    pub fn column_levels(&self, x: i32, z: i32) -> Option<[u8; WORLD_HEIGHT]> {
        let size = CHUNK_SIZE as i32;
        self.maps
            .get(&column_chunk(x, z))
            .map(|map| map.column(x.rem_euclid(size) as u8, z.rem_euclid(size) as u8))
    }

    pub fn is_baked(&self, pos: ChunkPos) -> bool {
        self.maps.contains_key(&pos)
    }

    pub fn add_light(&mut self, position: Vec3, intensity: f32, radius: f32) -> LightId {
        let id = LightId(self.next_light_id);
        self.next_light_id = self.next_light_id.wrapping_add(1);
        self.lights.insert(id, DynamicLight::new(position, intensity, radius));
        id
    }

    /// Moves a light. Returns its previous state, or `None` for unknown ids.
    pub fn update_light(&mut self, id: LightId, position: Vec3) -> Option<DynamicLight> {
        let light = self.lights.get_mut(&id)?;
        let previous = *light;
        light.position = position;
        Some(previous)
    }

    pub fn remove_light(&mut self, id: LightId) -> Option<DynamicLight> {
        self.lights.remove(&id)
    }

    pub fn light(&self, id: LightId) -> Option<&DynamicLight> {
        self.lights.get(&id)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Strongest point light reaching the centre of the cell.
    pub fn dynamic_level(&self, pos: IVec3) -> f32 {
        let center = pos.as_vec3() + Vec3::splat(0.5);
        self.lights
            .values()
            .map(|light| light.contribution(center))
            .fold(0.0, f32::max)
    }

    /// Baked sky light at a cell. Above the world is open sky and below it is dark.
    pub fn sky_level_at(&self, pos: IVec3) -> Option<u8> {
        if pos.y >= WORLD_HEIGHT as i32 {
            return Some(self.sky_level);
        }
        if !in_height_range(pos.y) {
            return Some(0);
        }
        let (chunk_pos, local) = world_to_chunk(pos)?;
        self.maps.get(&chunk_pos).map(|map| map.get(local))
    }

    /// Sky and point light combined, or `None` when the cell was never baked.
    pub fn light_level(&self, pos: IVec3) -> Option<f32> {
        let sky = f32::from(self.sky_level_at(pos)?);
        Some(sky.max(self.dynamic_level(pos)).min(f32::from(MAX_LIGHT_LEVEL)))
    }

    pub fn brightness(&self, level: f32) -> f32 {
        light_brightness(level, &self.settings)
    }

    /// Counts down to the next sky check and schedules a whole-world re-bake when
    /// the sky level moved. Returns true when a re-bake was scheduled.
    pub fn poll_sky(&mut self, dt: f32, sun_height: f32) -> bool {
        self.poll_timer += dt.max(0.0);
        if self.poll_timer < self.settings.sky_poll_interval {
            return false;
        }
        self.poll_timer = 0.0;

        let level = self.current_sky_light(sun_height);
        if level == self.sky_level {
            return false;
        }
        debug!("Sky light changed from {} to {}", self.sky_level, level);
        self.sky_level = level;

        let mut chunks: Vec<_> = self.maps.keys().copied().collect();
        chunks.sort_unstable();
        self.rebake_queue.extend(chunks);
        true
    }

    /// Re-bakes up to `budget` queued chunks and returns the ones re-baked.
    pub fn process_rebake<W: BlockAccess + ?Sized>(&mut self, world: &W, budget: usize) -> Vec<ChunkPos> {
        let batch = self.rebake_queue.drain_budget(budget);
        let mut rebaked = Vec::with_capacity(batch.len());
        for pos in batch {
            if self.maps.contains_key(&pos) {
                self.bake_chunk(world, pos);
                rebaked.push(pos);
            }
        }
        if !rebaked.is_empty() && self.rebake_queue.is_empty() {
            debug!("Sky re-bake finished at level {}", self.sky_level);
        }
        rebaked
    }

    pub fn pending_rebakes(&self) -> usize {
        self.rebake_queue.len()
    }

    /// Drops all baked data and lights.
    pub fn clear(&mut self) {
        self.maps.clear();
        self.lights.clear();
        self.rebake_queue.clear();
    }
}

impl LightAccess for ShadowBaker {
    fn shadow_brightness(&self, pos: IVec3) -> f32 {
        if !self.settings.enabled {
            return 1.0;
        }
        match self.light_level(pos) {
            Some(level) => self.brightness(level),
            None => self
                .settings
                .unbaked_brightness
                .max(self.brightness(self.dynamic_level(pos))),
        }
    }
}
