use std::ops::{Add, Sub};

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Horizontal edge length of a chunk, in blocks.
pub const CHUNK_SIZE: usize = 16;
/// Every chunk spans the full world height.
pub const WORLD_HEIGHT: usize = 32;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;
pub const CHUNK_VOLUME: usize = CHUNK_AREA * WORLD_HEIGHT;
/// Block extents of a chunk along x, y, z.
pub const CHUNK_DIMS: [usize; 3] = [CHUNK_SIZE, WORLD_HEIGHT, CHUNK_SIZE];

/// Horizontal chunk coordinate. Chunks are columns, so there is no y component.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World coordinate of the chunk's minimum corner at y = 0.
    pub fn origin(self) -> IVec3 {
        let size = CHUNK_SIZE as i32;
        IVec3::new(self.x * size, 0, self.z * size)
    }

    /// The 3×3 block of chunks centred on this one, including itself.
    pub fn neighborhood(self) -> impl Iterator<Item = ChunkPos> {
        (-1..=1).flat_map(move |dz| (-1..=1).map(move |dx| ChunkPos::new(self.x + dx, self.z + dz)))
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

pub fn in_height_range(y: i32) -> bool {
    (0..WORLD_HEIGHT as i32).contains(&y)
}

/// Chunk owning the column at world `(x, z)`.
pub fn column_chunk(x: i32, z: i32) -> ChunkPos {
    let size = CHUNK_SIZE as i32;
    ChunkPos {
        x: div_rem_floor(x, size).0,
        z: div_rem_floor(z, size).0,
    }
}

/// Maps a world position to its chunk and local coordinate.
///
/// Returns `None` outside `0..WORLD_HEIGHT`; those cells belong to no chunk.
pub fn world_to_chunk(world_pos: IVec3) -> Option<(ChunkPos, LocalPos)> {
    if !in_height_range(world_pos.y) {
        return None;
    }
    let size = CHUNK_SIZE as i32;

    let (chunk_x, local_x) = div_rem_floor(world_pos.x, size);
    let (chunk_z, local_z) = div_rem_floor(world_pos.z, size);

    Some((
        ChunkPos {
            x: chunk_x,
            z: chunk_z,
        },
        LocalPos {
            x: local_x as u8,
            y: world_pos.y as u8,
            z: local_z as u8,
        },
    ))
}

pub fn chunk_to_world(chunk_pos: ChunkPos, local: LocalPos) -> IVec3 {
    chunk_pos.origin() + IVec3::new(i32::from(local.x), i32::from(local.y), i32::from(local.z))
}

pub fn local_to_index(local: LocalPos) -> usize {
    usize::from(local.x) + usize::from(local.z) * CHUNK_SIZE + usize::from(local.y) * CHUNK_AREA
}

pub fn index_to_local(index: usize) -> LocalPos {
    assert!(index < CHUNK_VOLUME, "chunk index out of bounds: {index}");

    let y = index / CHUNK_AREA;
    let rem = index % CHUNK_AREA;
    let z = rem / CHUNK_SIZE;
    let x = rem % CHUNK_SIZE;

    LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    }
}

/// Chunks owning any column within one block of `(x, z)`, diagonals included.
pub fn column_footprint(x: i32, z: i32) -> impl Iterator<Item = ChunkPos> {
    let min = column_chunk(x - 1, z - 1);
    let max = column_chunk(x + 1, z + 1);
    (min.z..=max.z).flat_map(move |cz| (min.x..=max.x).map(move |cx| ChunkPos::new(cx, cz)))
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::*;

    #[test]
    fn local_to_index_round_trips_back_to_local_coords() {
        for y in 0..WORLD_HEIGHT {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let local = LocalPos {
                        x: x as u8,
                        y: y as u8,
                        z: z as u8,
                    };
                    let index = local_to_index(local);
                    assert_eq!(index_to_local(index), local);
                }
            }
        }
    }

    #[test]
    fn index_layout_is_x_then_z_then_y() {
        assert_eq!(local_to_index(LocalPos { x: 1, y: 0, z: 0 }), 1);
        assert_eq!(local_to_index(LocalPos { x: 0, y: 0, z: 1 }), CHUNK_SIZE);
        assert_eq!(local_to_index(LocalPos { x: 0, y: 1, z: 0 }), CHUNK_AREA);
    }

    #[test]
    #[should_panic(expected = "chunk index out of bounds")]
    fn index_to_local_rejects_out_of_range_index() {
        index_to_local(CHUNK_VOLUME);
    }

    #[test]
    fn world_to_chunk_handles_negative_and_positive_coordinates() {
        let (chunk0, local0) = world_to_chunk(IVec3::new(-1, 5, -1)).expect("in range");
        assert_eq!(chunk0, ChunkPos::new(-1, -1));
        assert_eq!(
            local0,
            LocalPos {
                x: (CHUNK_SIZE - 1) as u8,
                y: 5,
                z: (CHUNK_SIZE - 1) as u8,
            }
        );

        let (chunk1, local1) = world_to_chunk(IVec3::new(16, 31, 0)).expect("in range");
        assert_eq!(chunk1, ChunkPos::new(1, 0));
        assert_eq!(local1, LocalPos { x: 0, y: 31, z: 0 });

        let world = IVec3::new(-33, 20, 66);
        let (chunk2, local2) = world_to_chunk(world).expect("in range");
        assert_eq!(chunk_to_world(chunk2, local2), world);
    }

    #[test]
    fn world_to_chunk_rejects_heights_outside_the_world() {
        assert!(world_to_chunk(IVec3::new(0, -1, 0)).is_none());
        assert!(world_to_chunk(IVec3::new(0, WORLD_HEIGHT as i32, 0)).is_none());
    }

    #[test]
    fn chunk_pos_arithmetic_is_component_wise() {
        let a = ChunkPos::new(10, 4);
        let b = ChunkPos::new(-3, 1);
        assert_eq!(a + b, ChunkPos::new(7, 5));
        assert_eq!(a - b, ChunkPos::new(13, 3));
    }

    #[test]
    fn interior_column_footprint_is_a_single_chunk() {
        let chunks: Vec<_> = column_footprint(5, 5).collect();
        assert_eq!(chunks, vec![ChunkPos::new(0, 0)]);
    }

    #[test]
    fn corner_column_footprint_includes_diagonal_chunk() {
        let mut chunks: Vec<_> = column_footprint(0, 0).collect();
        chunks.sort();
        assert_eq!(
            chunks,
            vec![
                ChunkPos::new(-1, -1),
                ChunkPos::new(-1, 0),
                ChunkPos::new(0, -1),
                ChunkPos::new(0, 0),
            ]
        );
    }

    #[test]
    fn edge_column_footprint_includes_face_neighbor_only() {
        let mut chunks: Vec<_> = column_footprint(15, 7).collect();
        chunks.sort();
        assert_eq!(chunks, vec![ChunkPos::new(0, 0), ChunkPos::new(1, 0)]);
    }

    #[test]
    fn neighborhood_has_nine_chunks() {
        let around: Vec<_> = ChunkPos::new(2, -3).neighborhood().collect();
        assert_eq!(around.len(), 9);
        assert!(around.contains(&ChunkPos::new(1, -4)));
        assert!(around.contains(&ChunkPos::new(3, -2)));
    }
}
