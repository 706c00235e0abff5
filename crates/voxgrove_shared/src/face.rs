use std::fmt;
use std::str::FromStr;

use glam::IVec3;

/// One of the six axis-aligned cube faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    pub fn spec(self) -> &'static FaceSpec {
        &FACE_SPECS[self as usize]
    }

    pub fn normal(self) -> IVec3 {
        self.spec().normal
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// Unit-cube corner offsets of this face, see [`CUBE_FACES`].
    pub fn corners(self) -> &'static [[i32; 3]; 4] {
        &CUBE_FACES[self as usize]
    }

    /// Static directional shade. Top faces are brightest, bottoms darkest, and the
    /// two horizontal axes differ slightly so edges stay readable.
    pub fn shade(self) -> f32 {
        match self {
            Face::PosY => 1.0,
            Face::NegY => 0.5,
            Face::PosX | Face::NegX => 0.8,
            Face::PosZ | Face::NegZ => 0.7,
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Face {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Face::ALL
            .into_iter()
            .find(|face| face.key() == s)
            .ok_or_else(|| format!("malformed face key '{s}', expected one of +x -x +y -y +z -z"))
    }
}

#[derive(Copy, Clone, Debug)]
pub struct FaceSpec {
    pub key: &'static str,
    pub axis: usize,
    pub sign: i32,
    /// Axis along the quad's first edge (vertex 0 to 1).
    pub u_axis: usize,
    /// Axis along the quad's second edge (vertex 1 to 2).
    pub v_axis: usize,
    pub normal: IVec3,
}

pub const FACE_SPECS: [FaceSpec; 6] = [
    FaceSpec {
        key: "+x",
        axis: 0,
        sign: 1,
        u_axis: 2,
        v_axis: 1,
        normal: IVec3::new(1, 0, 0),
    },
    FaceSpec {
        key: "-x",
        axis: 0,
        sign: -1,
        u_axis: 2,
        v_axis: 1,
        normal: IVec3::new(-1, 0, 0),
    },
    FaceSpec {
        key: "+y",
        axis: 1,
        sign: 1,
        u_axis: 0,
        v_axis: 2,
        normal: IVec3::new(0, 1, 0),
    },
    FaceSpec {
        key: "-y",
        axis: 1,
        sign: -1,
        u_axis: 0,
        v_axis: 2,
        normal: IVec3::new(0, -1, 0),
    },
    FaceSpec {
        key: "+z",
        axis: 2,
        sign: 1,
        u_axis: 0,
        v_axis: 1,
        normal: IVec3::new(0, 0, 1),
    },
    FaceSpec {
        key: "-z",
        axis: 2,
        sign: -1,
        u_axis: 0,
        v_axis: 1,
        normal: IVec3::new(0, 0, -1),
    },
];

/// Corner offsets of each face on the unit cube, in [`Face`] order.
///
/// Vertices run counter-clockwise seen from outside the cube, starting at the
/// bottom-left corner, so `(0,1,2)` and `(0,2,3)` are front-facing and the quad
/// diagonals are `0-2` and `1-3`. AO corner `i` and mesh vertex `i` are the same
/// point.
pub const CUBE_FACES: [[[i32; 3]; 4]; 6] = [
    // +x
    [[1, 0, 1], [1, 0, 0], [1, 1, 0], [1, 1, 1]],
    // -x
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [0, 1, 0]],
    // +y
    [[0, 1, 1], [1, 1, 1], [1, 1, 0], [0, 1, 0]],
    // -y
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [0, 0, 1]],
    // +z
    [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]],
    // -z
    [[1, 0, 0], [0, 0, 0], [0, 1, 0], [1, 1, 0]],
];
