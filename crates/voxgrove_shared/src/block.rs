use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const AIR: Self = Self(0);
    pub const GRASS: Self = Self(1);
    pub const DIRT: Self = Self(2);
    pub const STONE: Self = Self(3);
    pub const WOOD: Self = Self(4);
    pub const LEAVES: Self = Self(5);
    pub const PLANKS: Self = Self(6);
    pub const BEDROCK: Self = Self(7);
    pub const WATERMELON: Self = Self(8);
    pub const SWORD: Self = Self(9);
    pub const PICKAXE: Self = Self(10);
    pub const TORCH: Self = Self(11);
    pub const SAPLING: Self = Self(12);

    pub fn properties(self) -> &'static BlockProperties {
        block_properties(self)
    }

    pub fn name(self) -> &'static str {
        self.properties().name
    }

    /// Blocks drawn as full cubes.
    pub fn is_meshed(self) -> bool {
        self.properties().flags.contains(BlockFlags::MESHED)
    }

    /// Cells with no cube geometry: neighbouring faces are always exposed and sky
    /// light passes through unchanged.
    pub fn is_transparent(self) -> bool {
        !self.is_meshed()
    }

    /// Fully blocks sky light and darkens AO corners.
    pub fn is_opaque(self) -> bool {
        self.properties().flags.contains(BlockFlags::OPAQUE)
    }

    pub fn is_foliage(self) -> bool {
        self.properties().flags.contains(BlockFlags::FOLIAGE)
    }

    pub fn is_placeable(self) -> bool {
        self.properties().flags.contains(BlockFlags::PLACEABLE)
    }

    pub fn light_emission(self) -> u8 {
        self.properties().light_emission
    }

    /// Whether this block darkens the AO corners of faces next to it.
    pub fn occludes_ao(self, foliage_occludes: bool) -> bool {
        self.is_opaque() || (foliage_occludes && self.is_foliage())
    }

    /// Whether the face of `self` that touches `neighbor` is visible.
    ///
    /// Faces against cells without geometry always show. Foliage lets the faces of
    /// other blocks show through it, but identical foliage culls against itself.
    pub fn face_visible_against(self, neighbor: BlockId) -> bool {
        if neighbor.is_transparent() {
            return true;
        }
        neighbor.is_foliage() && neighbor != self
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_PROPERTIES
            .iter()
            .position(|props| props.name.eq_ignore_ascii_case(name))
            .map(|index| BlockId(index as u8))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockId::from_name(s.trim()).ok_or_else(|| format!("unknown block name '{s}'"))
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u8 {
        const MESHED = 1 << 0;
        const OPAQUE = 1 << 1;
        const FOLIAGE = 1 << 2;
        const PLACEABLE = 1 << 3;
    }
}

/// What breaking a block leaves behind.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BlockDrop {
    Itself,
    Nothing,
    Item(BlockId),
    Chance { item: BlockId, probability: f32 },
}

#[derive(Clone, Debug)]
pub struct BlockProperties {
    pub name: &'static str,
    pub flags: BlockFlags,
    pub light_emission: u8,
    pub drop: BlockDrop,
}

const SOLID: BlockFlags = BlockFlags::MESHED
    .union(BlockFlags::OPAQUE)
    .union(BlockFlags::PLACEABLE);

const fn block(name: &'static str, flags: BlockFlags, drop: BlockDrop) -> BlockProperties {
    BlockProperties {
        name,
        flags,
        light_emission: 0,
        drop,
    }
}

/// Indexed by `BlockId.0`.
static BLOCK_PROPERTIES: [BlockProperties; 13] = [
    block("air", BlockFlags::empty(), BlockDrop::Nothing),
    block("grass", SOLID, BlockDrop::Item(BlockId::DIRT)),
    block("dirt", SOLID, BlockDrop::Itself),
    block("stone", SOLID, BlockDrop::Itself),
    block("wood", SOLID, BlockDrop::Itself),
    block(
        "leaves",
        BlockFlags::MESHED
            .union(BlockFlags::FOLIAGE)
            .union(BlockFlags::PLACEABLE),
        BlockDrop::Chance {
            item: BlockId::SAPLING,
            probability: 0.2,
        },
    ),
    block("planks", SOLID, BlockDrop::Itself),
    block("bedrock", SOLID, BlockDrop::Nothing),
    block("watermelon", SOLID, BlockDrop::Itself),
    block("sword", BlockFlags::empty(), BlockDrop::Itself),
    block("pickaxe", BlockFlags::empty(), BlockDrop::Itself),
    BlockProperties {
        name: "torch",
        flags: BlockFlags::PLACEABLE,
        light_emission: 14,
        drop: BlockDrop::Itself,
    },
    block("sapling", BlockFlags::PLACEABLE, BlockDrop::Itself),
];

/// Unknown ids fall back to air.
pub fn block_properties(id: BlockId) -> &'static BlockProperties {
    BLOCK_PROPERTIES
        .get(usize::from(id.0))
        .unwrap_or(&BLOCK_PROPERTIES[0])
}

pub fn all_blocks() -> impl Iterator<Item = BlockId> {
    (0..BLOCK_PROPERTIES.len()).map(|index| BlockId(index as u8))
}

/// Item produced when `broken` is replaced by air.
///
/// `roll` is a uniform sample in `[0, 1)` used by chance-based drops.
pub fn drop_for(broken: BlockId, roll: f32) -> Option<BlockId> {
    if broken == BlockId::AIR {
        return None;
    }
    match broken.properties().drop {
        BlockDrop::Itself => Some(broken),
        BlockDrop::Nothing => None,
        BlockDrop::Item(item) => Some(item),
        BlockDrop::Chance { item, probability } => (roll < probability).then_some(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_property_table_names() {
        assert_eq!(BlockId::AIR.name(), "air");
        assert_eq!(BlockId::LEAVES.name(), "leaves");
        assert_eq!(BlockId::BEDROCK.name(), "bedrock");
        assert_eq!(BlockId::TORCH.name(), "torch");
        assert_eq!(BlockId::SAPLING.name(), "sapling");
        assert_eq!(all_blocks().count(), 13);
    }

    #[test]
    fn unknown_ids_behave_like_air() {
        let unknown = BlockId(200);
        assert_eq!(unknown.name(), "air");
        assert!(unknown.is_transparent());
        assert!(!unknown.is_opaque());
    }

    #[test]
    fn transparency_and_opacity_match_block_roles() {
        for transparent in [BlockId::AIR, BlockId::SAPLING, BlockId::TORCH, BlockId::SWORD] {
            assert!(transparent.is_transparent(), "{transparent} should be transparent");
            assert!(!transparent.is_opaque());
        }
        for opaque in [BlockId::GRASS, BlockId::STONE, BlockId::BEDROCK, BlockId::WATERMELON] {
            assert!(opaque.is_meshed());
            assert!(opaque.is_opaque(), "{opaque} should be opaque");
        }
        assert!(BlockId::LEAVES.is_meshed());
        assert!(!BlockId::LEAVES.is_opaque());
        assert!(BlockId::LEAVES.is_foliage());
    }

    #[test]
    fn leaves_only_occlude_ao_when_enabled() {
        assert!(!BlockId::LEAVES.occludes_ao(false));
        assert!(BlockId::LEAVES.occludes_ao(true));
        assert!(BlockId::STONE.occludes_ao(false));
        assert!(!BlockId::SAPLING.occludes_ao(true));
    }

    #[test]
    fn face_visibility_rules() {
        assert!(BlockId::STONE.face_visible_against(BlockId::AIR));
        assert!(BlockId::STONE.face_visible_against(BlockId::SAPLING));
        assert!(!BlockId::STONE.face_visible_against(BlockId::DIRT));
        assert!(BlockId::STONE.face_visible_against(BlockId::LEAVES));
        assert!(!BlockId::LEAVES.face_visible_against(BlockId::LEAVES));
        assert!(!BlockId::LEAVES.face_visible_against(BlockId::STONE));
        assert!(BlockId::LEAVES.face_visible_against(BlockId::AIR));
    }

    #[test]
    fn drops_follow_block_rules() {
        assert_eq!(drop_for(BlockId::GRASS, 0.0), Some(BlockId::DIRT));
        assert_eq!(drop_for(BlockId::STONE, 0.9), Some(BlockId::STONE));
        assert_eq!(drop_for(BlockId::SAPLING, 0.5), Some(BlockId::SAPLING));
        assert_eq!(drop_for(BlockId::BEDROCK, 0.0), None);
        assert_eq!(drop_for(BlockId::AIR, 0.0), None);
        assert_eq!(drop_for(BlockId::LEAVES, 0.1), Some(BlockId::SAPLING));
        assert_eq!(drop_for(BlockId::LEAVES, 0.2), None);
        assert_eq!(drop_for(BlockId::LEAVES, 0.95), None);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("Stone".parse::<BlockId>(), Ok(BlockId::STONE));
        assert_eq!(BlockId::from_name("WATERMELON"), Some(BlockId::WATERMELON));
        assert!("obsidian".parse::<BlockId>().is_err());
    }

    #[test]
    fn only_torch_emits_light() {
        for id in all_blocks() {
            if id == BlockId::TORCH {
                assert_eq!(id.light_emission(), 14);
            } else {
                assert_eq!(id.light_emission(), 0, "{id} should not emit light");
            }
        }
    }

    #[test]
    fn tools_are_not_placeable() {
        assert!(!BlockId::SWORD.is_placeable());
        assert!(!BlockId::PICKAXE.is_placeable());
        assert!(BlockId::TORCH.is_placeable());
        assert!(BlockId::STONE.is_placeable());
    }
}
