use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use voxgrove_shared::ao::{ao_brightness, face_ao, AoSettings};
use voxgrove_shared::block::BlockId;
use voxgrove_shared::coords::{ChunkPos, CHUNK_DIMS};
use voxgrove_shared::face::Face;
use voxgrove_shared::lighting::LightAccess;
use voxgrove_shared::storage::BlockAccess;

/// Triangles sharing the 0-2 diagonal.
const DIAGONAL_02: [u32; 6] = [0, 1, 2, 0, 2, 3];
/// Triangles sharing the 1-3 diagonal.
const DIAGONAL_13: [u32; 6] = [0, 1, 3, 1, 2, 3];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshStrategy {
    /// One unit quad per visible face.
    Simple,
    /// Coplanar faces with matching shading merged into rectangles.
    #[default]
    Greedy,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSettings {
    pub strategy: MeshStrategy,
    pub ao: AoSettings,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ChunkVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub brightness: f32,
    pub block: u32,
}
const _: [(); 40] = [(); std::mem::size_of::<ChunkVertex>()];

#[derive(Debug, Clone, Default)]
pub struct ChunkMesh {
    pub vertices: Vec<ChunkVertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }
}

/// A visible rectangle of block faces, before it becomes vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quad {
    pub block: BlockId,
    pub face: Face,
    /// Block at the minimum corner of the run.
    pub origin: IVec3,
    /// Extent along the face's u axis, in blocks.
    pub width: u32,
    /// Extent along the face's v axis, in blocks.
    pub height: u32,
    pub ao: [u8; 4],
    pub shadow: f32,
    /// AO brightness × shadow × face shade, per vertex.
    pub brightness: [f32; 4],
}

impl Quad {
    fn new(
        block: BlockId,
        face: Face,
        origin: IVec3,
        width: u32,
        height: u32,
        ao: [u8; 4],
        shadow: f32,
        settings: &MeshSettings,
    ) -> Self {
        let shade = face.shade();
        let brightness = ao.map(|corner| ao_brightness(corner, settings.ao.min_brightness) * shadow * shade);
        Self {
            block,
            face,
            origin,
            width,
            height,
            ao,
            shadow,
            brightness,
        }
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    pub fn positions(&self) -> [Vec3; 4] {
        let spec = self.face.spec();
        let origin = self.origin.as_vec3();
        self.face.corners().map(|offset| {
            let mut position = origin;
            position[spec.axis] += offset[spec.axis] as f32;
            position[spec.u_axis] += (offset[spec.u_axis] * self.width as i32) as f32;
            position[spec.v_axis] += (offset[spec.v_axis] * self.height as i32) as f32;
            position
        })
    }

    /// Texture coordinates in tile units, so textures repeat once per block.
    pub fn tex_coords(&self) -> [[f32; 2]; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]]
    }

    /// Vertex indices for the two triangles, relative to the quad's first vertex.
    pub fn indices(&self) -> [u32; 6] {
        quad_indices(self.ao)
    }
}

/// Picks the split diagonal from AO alone so shadows never change the triangulation.
/// The diagonal through the darker pair keeps the falloff symmetric.
pub fn quad_indices(ao: [u8; 4]) -> [u32; 6] {
    let diagonal_02 = u16::from(ao[0]) + u16::from(ao[2]);
    let diagonal_13 = u16::from(ao[1]) + u16::from(ao[3]);
    if diagonal_02 > diagonal_13 {
        DIAGONAL_13
    } else {
        DIAGONAL_02
    }
}

fn exposed_block<W: BlockAccess + ?Sized>(world: &W, pos: IVec3, face: Face) -> Option<BlockId> {
    let block = world.block(pos);
    if !block.is_meshed() {
        return None;
    }
    let neighbor = world.block(pos + face.normal());
    block.face_visible_against(neighbor).then_some(block)
}

fn cell_position(chunk_origin: IVec3, face: Face, slice: usize, u: usize, v: usize) -> IVec3 {
    let spec = face.spec();
    let mut local = [0i32; 3];
    local[spec.axis] = slice as i32;
    local[spec.u_axis] = u as i32;
    local[spec.v_axis] = v as i32;
    chunk_origin + IVec3::from_array(local)
}

pub fn simple_quads<W, L>(world: &W, lights: &L, chunk_pos: ChunkPos, settings: &MeshSettings) -> Vec<Quad>
where
    W: BlockAccess + ?Sized,
    L: LightAccess + ?Sized,
{
    let origin = chunk_pos.origin();
    let mut quads = Vec::new();
    for y in 0..CHUNK_DIMS[1] {
        for z in 0..CHUNK_DIMS[2] {
            for x in 0..CHUNK_DIMS[0] {
                let pos = origin + IVec3::new(x as i32, y as i32, z as i32);
                for face in Face::ALL {
                    let Some(block) = exposed_block(world, pos, face) else {
                        continue;
                    };
                    let ao = face_ao(world, pos, face, &settings.ao);
                    let shadow = lights.shadow_brightness(pos + face.normal());
                    quads.push(Quad::new(block, face, pos, 1, 1, ao, shadow, settings));
                }
            }
        }
    }
    quads
}

#[derive(Copy, Clone, PartialEq)]
struct MaskCell {
    block: BlockId,
    ao: [u8; 4],
    shadow: f32,
}

/// Merges visible faces slice by slice.
///
/// Cells only merge when block, AO corners and shadow all match, so every corner of
/// a merged quad carries exactly the shading its unit faces would have had.
pub fn greedy_quads<W, L>(world: &W, lights: &L, chunk_pos: ChunkPos, settings: &MeshSettings) -> Vec<Quad>
where
    W: BlockAccess + ?Sized,
    L: LightAccess + ?Sized,
{
    let origin = chunk_pos.origin();
    let mut quads = Vec::new();
    let mut mask: Vec<Option<MaskCell>> = Vec::new();

    for face in Face::ALL {
        let spec = face.spec();
        let slices = CHUNK_DIMS[spec.axis];
        let u_len = CHUNK_DIMS[spec.u_axis];
        let v_len = CHUNK_DIMS[spec.v_axis];
        mask.clear();
        mask.resize(u_len * v_len, None);

        for slice in 0..slices {
            mask.fill(None);

            for v in 0..v_len {
                for u in 0..u_len {
                    let pos = cell_position(origin, face, slice, u, v);
                    let Some(block) = exposed_block(world, pos, face) else {
                        continue;
                    };
                    mask[v * u_len + u] = Some(MaskCell {
                        block,
                        ao: face_ao(world, pos, face, &settings.ao),
                        shadow: lights.shadow_brightness(pos + face.normal()),
                    });
                }
            }

            for v in 0..v_len {
                let mut u = 0usize;
                while u < u_len {
                    let Some(cell) = mask[v * u_len + u] else {
                        u += 1;
                        continue;
                    };

                    let mut width = 1usize;
                    while u + width < u_len && mask[v * u_len + u + width] == Some(cell) {
                        width += 1;
                    }

                    let mut height = 1usize;
                    'height: while v + height < v_len {
                        let row = (v + height) * u_len;
                        for du in 0..width {
                            if mask[row + u + du] != Some(cell) {
                                break 'height;
                            }
                        }
                        height += 1;
                    }

                    quads.push(Quad::new(
                        cell.block,
                        face,
                        cell_position(origin, face, slice, u, v),
                        width as u32,
                        height as u32,
                        cell.ao,
                        cell.shadow,
                        settings,
                    ));

                    for dv in 0..height {
                        let row = (v + dv) * u_len;
                        mask[row + u..row + u + width].fill(None);
                    }

                    u += width;
                }
            }
        }
    }

    quads
}

pub fn generate_quads<W, L>(world: &W, lights: &L, chunk_pos: ChunkPos, settings: &MeshSettings) -> Vec<Quad>
where
    W: BlockAccess + ?Sized,
    L: LightAccess + ?Sized,
{
    match settings.strategy {
        MeshStrategy::Simple => simple_quads(world, lights, chunk_pos, settings),
        MeshStrategy::Greedy => greedy_quads(world, lights, chunk_pos, settings),
    }
}

pub fn build_chunk_mesh(quads: &[Quad]) -> ChunkMesh {
    let mut mesh = ChunkMesh {
        vertices: Vec::with_capacity(quads.len() * 4),
        indices: Vec::with_capacity(quads.len() * 6),
    };

    for quad in quads {
        let base = mesh.vertices.len() as u32;
        let normal = quad.face.normal().as_vec3().to_array();
        let positions = quad.positions();
        let tex_coords = quad.tex_coords();
        for corner in 0..4 {
            mesh.vertices.push(ChunkVertex {
                position: positions[corner].to_array(),
                normal,
                tex_coord: tex_coords[corner],
                brightness: quad.brightness[corner],
                block: u32::from(quad.block.0),
            });
        }
        mesh.indices
            .extend(quad.indices().iter().map(|index| base + index));
    }

    mesh
}

pub fn generate_mesh<W, L>(world: &W, lights: &L, chunk_pos: ChunkPos, settings: &MeshSettings) -> ChunkMesh
where
    W: BlockAccess + ?Sized,
    L: LightAccess + ?Sized,
{
    build_chunk_mesh(&generate_quads(world, lights, chunk_pos, settings))
}

#[cfg(test)]
mod tests {
    use voxgrove_shared::lighting::{FullBright, LightingSettings, ShadowBaker};
    use voxgrove_shared::storage::VoxelStorage;
    use voxgrove_shared::worldgen::WorldGenerator;

    use super::*;

    const ORIGIN_CHUNK: ChunkPos = ChunkPos::new(0, 0);

    fn settings(strategy: MeshStrategy) -> MeshSettings {
        MeshSettings {
            strategy,
            ao: AoSettings::default(),
        }
    }

    fn world_with(blocks: &[(IVec3, BlockId)]) -> VoxelStorage {
        let mut storage = VoxelStorage::empty();
        for (pos, block) in blocks {
            storage.set(*pos, *block);
        }
        storage
    }

    fn total_area(quads: &[Quad]) -> u32 {
        quads.iter().map(Quad::area).sum()
    }

    #[test]
    fn lone_block_yields_six_unshaded_unit_quads() {
        let storage = world_with(&[(IVec3::new(0, 10, 0), BlockId::STONE)]);
        for strategy in [MeshStrategy::Simple, MeshStrategy::Greedy] {
            let quads = generate_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(strategy));
            assert_eq!(quads.len(), 6, "{strategy:?}");
            for quad in &quads {
                assert_eq!(quad.area(), 1);
                assert_eq!(quad.ao, [3; 4]);
                for brightness in quad.brightness {
                    assert!((brightness - quad.face.shade()).abs() < 1e-6);
                }
            }
            let mut faces: Vec<_> = quads.iter().map(|quad| quad.face.key()).collect();
            faces.sort_unstable();
            assert_eq!(faces, vec!["+x", "+y", "+z", "-x", "-y", "-z"]);
        }
    }

    #[test]
    fn shared_face_between_neighbors_is_culled() {
        let storage = world_with(&[
            (IVec3::new(0, 10, 0), BlockId::STONE),
            (IVec3::new(1, 10, 0), BlockId::STONE),
        ]);

        let simple = simple_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        assert_eq!(simple.len(), 10);
        assert!(!simple
            .iter()
            .any(|quad| quad.origin == IVec3::new(0, 10, 0) && quad.face == Face::PosX));
        assert!(!simple
            .iter()
            .any(|quad| quad.origin == IVec3::new(1, 10, 0) && quad.face == Face::NegX));

        let greedy = greedy_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Greedy));
        assert_eq!(greedy.len(), 6);
        assert_eq!(total_area(&greedy), 10);
    }

    #[test]
    fn checkerboard_does_not_merge() {
        let mut blocks = Vec::new();
        for y in 0..8 {
            for z in 0..16 {
                for x in 0..16 {
                    if (x + y + z) % 2 == 0 {
                        blocks.push((IVec3::new(x, y, z), BlockId::STONE));
                    }
                }
            }
        }
        let storage = world_with(&blocks);
        let simple = simple_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        let greedy = greedy_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Greedy));
        assert_eq!(greedy.len(), simple.len());
        assert!(greedy.iter().all(|quad| quad.width == 1 && quad.height == 1));
    }

    #[test]
    fn flat_slab_top_merges_into_one_quad() {
        let mut blocks = Vec::new();
        for z in 0..3 {
            for x in 0..5 {
                blocks.push((IVec3::new(x, 10, z), BlockId::PLANKS));
            }
        }
        let storage = world_with(&blocks);
        let mut baker = ShadowBaker::new(LightingSettings::default());
        baker.bake_chunk(&storage, ORIGIN_CHUNK);

        let quads = greedy_quads(&storage, &baker, ORIGIN_CHUNK, &settings(MeshStrategy::Greedy));
        let tops: Vec<_> = quads.iter().filter(|quad| quad.face == Face::PosY).collect();
        assert_eq!(tops.len(), 1);
        assert_eq!((tops[0].width, tops[0].height), (5, 3));
        assert_eq!(tops[0].origin, IVec3::new(0, 10, 0));

        let positions = tops[0].positions();
        for position in positions {
            assert_eq!(position.y, 11.0);
            assert!(position.x == 0.0 || position.x == 5.0);
            assert!(position.z == 0.0 || position.z == 3.0);
        }
        assert_eq!(tops[0].tex_coords()[2], [5.0, 3.0]);
    }

    #[test]
    fn greedy_covers_the_same_faces_as_simple_on_terrain() {
        let mut storage = VoxelStorage::with_generator(WorldGenerator::new(11));
        for pos in ChunkPos::new(1, 1).neighborhood() {
            storage.ensure_chunk(pos);
        }
        let mut baker = ShadowBaker::new(LightingSettings::default());
        for pos in ChunkPos::new(1, 1).neighborhood() {
            baker.bake_chunk(&storage, pos);
        }
        let simple = simple_quads(&storage, &baker, ChunkPos::new(1, 1), &settings(MeshStrategy::Simple));
        let greedy = greedy_quads(&storage, &baker, ChunkPos::new(1, 1), &settings(MeshStrategy::Greedy));
        assert_eq!(total_area(&greedy), simple.len() as u32);
        assert!(greedy.len() < simple.len());
    }

    #[test]
    fn diagonal_neighbor_darkens_one_corner() {
        let storage = world_with(&[
            (IVec3::new(5, 10, 5), BlockId::STONE),
            (IVec3::new(4, 11, 6), BlockId::STONE),
        ]);
        let quads = simple_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        let top = quads
            .iter()
            .find(|quad| quad.origin == IVec3::new(5, 10, 5) && quad.face == Face::PosY)
            .expect("top face");
        assert_eq!(top.ao, [2, 3, 3, 3]);
        let expected = ao_brightness(2, AoSettings::default().min_brightness);
        assert!((top.brightness[0] - expected).abs() < 1e-6);
        assert!((top.brightness[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn brightness_multiplies_ao_shadow_and_face_shade() {
        let quad = Quad::new(
            BlockId::STONE,
            Face::PosX,
            IVec3::ZERO,
            1,
            1,
            [3, 2, 1, 0],
            0.5,
            &settings(MeshStrategy::Simple),
        );
        for corner in 0..4 {
            let expected = ao_brightness(quad.ao[corner], 0.2) * 0.5 * 0.8;
            assert!((quad.brightness[corner] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn diagonal_follows_the_darker_pair() {
        assert_eq!(quad_indices([3, 3, 3, 3]), DIAGONAL_02);
        assert_eq!(quad_indices([0, 3, 3, 3]), DIAGONAL_02);
        assert_eq!(quad_indices([3, 0, 3, 3]), DIAGONAL_13);
        assert_eq!(quad_indices([3, 3, 3, 1]), DIAGONAL_13);
    }

    #[test]
    fn shadow_never_changes_the_triangulation() {
        let settings = settings(MeshStrategy::Simple);
        let lit = Quad::new(BlockId::DIRT, Face::PosY, IVec3::ZERO, 1, 1, [3, 1, 3, 3], 1.0, &settings);
        let dark = Quad::new(BlockId::DIRT, Face::PosY, IVec3::ZERO, 1, 1, [3, 1, 3, 3], 0.2, &settings);
        assert_ne!(lit.brightness, dark.brightness);
        assert_eq!(build_chunk_mesh(&[lit]).indices, build_chunk_mesh(&[dark]).indices);
    }

    #[test]
    fn every_triangle_faces_outward() {
        let settings = settings(MeshStrategy::Simple);
        for face in Face::ALL {
            for ao in [[3, 3, 3, 3], [3, 0, 3, 3]] {
                let quad = Quad::new(BlockId::STONE, face, IVec3::new(2, 2, 2), 3, 2, ao, 1.0, &settings);
                let mesh = build_chunk_mesh(&[quad]);
                let normal = face.normal().as_vec3();
                for triangle in mesh.indices.chunks(3) {
                    let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[triangle[i] as usize].position));
                    let facing = (b - a).cross(c - a).normalize();
                    assert!((facing - normal).length() < 1e-5, "{face} with ao {ao:?}");
                }
            }
        }
    }

    #[test]
    fn faces_at_world_floor_and_ceiling_render() {
        let storage = world_with(&[
            (IVec3::new(3, 0, 3), BlockId::BEDROCK),
            (IVec3::new(8, 31, 8), BlockId::STONE),
        ]);
        let quads = simple_quads(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        assert!(quads
            .iter()
            .any(|quad| quad.origin == IVec3::new(3, 0, 3) && quad.face == Face::NegY));
        assert!(quads
            .iter()
            .any(|quad| quad.origin == IVec3::new(8, 31, 8) && quad.face == Face::PosY));
    }

    #[test]
    fn leaves_cull_against_leaves_but_not_against_stone() {
        let leaves = world_with(&[
            (IVec3::new(4, 10, 4), BlockId::LEAVES),
            (IVec3::new(5, 10, 4), BlockId::LEAVES),
        ]);
        let quads = simple_quads(&leaves, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        assert_eq!(quads.len(), 10);

        let mixed = world_with(&[
            (IVec3::new(4, 10, 4), BlockId::STONE),
            (IVec3::new(5, 10, 4), BlockId::LEAVES),
        ]);
        let quads = simple_quads(&mixed, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        assert_eq!(quads.len(), 11);
        assert!(quads
            .iter()
            .any(|quad| quad.block == BlockId::STONE && quad.face == Face::PosX));
    }

    #[test]
    fn blocks_without_geometry_are_not_meshed() {
        let storage = world_with(&[
            (IVec3::new(1, 5, 1), BlockId::SAPLING),
            (IVec3::new(2, 5, 1), BlockId::TORCH),
        ]);
        let mesh = generate_mesh(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Greedy));
        assert!(mesh.is_empty());
    }

    #[test]
    fn mesh_has_four_vertices_and_six_indices_per_quad() {
        let storage = world_with(&[(IVec3::new(0, 10, 0), BlockId::WATERMELON)]);
        let mesh = generate_mesh(&storage, &FullBright, ORIGIN_CHUNK, &settings(MeshStrategy::Greedy));
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.quad_count(), 6);
        assert!(mesh.indices.iter().all(|&index| (index as usize) < mesh.vertices.len()));
        assert!(mesh
            .vertices
            .iter()
            .all(|vertex| vertex.block == u32::from(BlockId::WATERMELON.0)));
    }

    #[test]
    fn faces_in_shadow_are_darker() {
        let storage = world_with(&[
            (IVec3::new(6, 20, 6), BlockId::STONE),
            (IVec3::new(6, 10, 6), BlockId::STONE),
        ]);
        let mut baker = ShadowBaker::new(LightingSettings::default());
        baker.bake_chunk(&storage, ORIGIN_CHUNK);
        let quads = simple_quads(&storage, &baker, ORIGIN_CHUNK, &settings(MeshStrategy::Simple));
        let top = |y: i32| {
            quads
                .iter()
                .find(|quad| quad.origin == IVec3::new(6, y, 6) && quad.face == Face::PosY)
                .expect("top face")
                .shadow
        };
        assert!((top(20) - 1.0).abs() < 1e-6);
        assert!(top(10) < 0.5);
    }
}
