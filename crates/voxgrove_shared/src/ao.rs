use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::face::Face;
use crate::storage::BlockAccess;

/// Unoccluded corner value.
pub const MAX_AO: u8 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoSettings {
    pub enabled: bool,
    /// Brightness of a fully occluded corner.
    pub min_brightness: f32,
    /// Lets foliage darken corners like opaque blocks do.
    pub foliage_occludes: bool,
}

impl Default for AoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_brightness: 0.2,
            foliage_occludes: false,
        }
    }
}

/// AO of one corner from its two edge neighbours and the diagonal between them.
///
/// Two occluding edge neighbours give full occlusion whatever the diagonal holds.
pub fn vertex_ao(side1: bool, side2: bool, corner: bool) -> u8 {
    if side1 && side2 {
        return 0;
    }
    MAX_AO - (u8::from(side1) + u8::from(side2) + u8::from(corner))
}

pub fn ao_brightness(ao: u8, min_brightness: f32) -> f32 {
    let ao = ao.min(MAX_AO) as f32;
    min_brightness + (ao / MAX_AO as f32) * (1.0 - min_brightness)
}

/// Cells sampled for corner `corner` of `face` on the block at `pos`:
/// the two edge neighbours followed by the diagonal.
///
/// All three sit in the layer in front of the face, displaced towards the corner
/// along the face's two in-plane axes.
pub fn corner_samples(pos: IVec3, face: Face, corner: usize) -> [IVec3; 3] {
    let spec = face.spec();
    let offset = face.corners()[corner];
    let front = pos + spec.normal;

    let mut step_u = IVec3::ZERO;
    step_u[spec.u_axis] = if offset[spec.u_axis] == 1 { 1 } else { -1 };
    let mut step_v = IVec3::ZERO;
    step_v[spec.v_axis] = if offset[spec.v_axis] == 1 { 1 } else { -1 };

    [front + step_u, front + step_v, front + step_u + step_v]
}

/// Per-corner AO for one face, in [`crate::face::CUBE_FACES`] vertex order.
pub fn face_ao<W: BlockAccess + ?Sized>(
    world: &W,
    pos: IVec3,
    face: Face,
    settings: &AoSettings,
) -> [u8; 4] {
    if !settings.enabled {
        return [MAX_AO; 4];
    }
    let occludes = |cell: IVec3| world.block(cell).occludes_ao(settings.foliage_occludes);
    std::array::from_fn(|corner| {
        let [side1, side2, diagonal] = corner_samples(pos, face, corner);
        vertex_ao(occludes(side1), occludes(side2), occludes(diagonal))
    })
}

pub fn face_ao_brightness<W: BlockAccess + ?Sized>(
    world: &W,
    pos: IVec3,
    face: Face,
    settings: &AoSettings,
) -> [f32; 4] {
    face_ao(world, pos, face, settings).map(|ao| ao_brightness(ao, settings.min_brightness))
}
