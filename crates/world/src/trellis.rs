//! In-memory trellis grid backing the vine state machine.
//!
//! Blocks are stored sparsely by position; unset cells are air. Growth stage
//! is encoded in the block ID range per family, the same way crop stages map
//! onto consecutive IDs elsewhere in this codebase's lineage.

use crate::vine::{
    GrapeVariant, SoundCue, VineInstance, WorldMutator, WorldQuery, MAX_AGE,
};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use vineyard_core::{BlockPos, Direction, ItemKind, ItemStack};

/// Numeric block identifier.
pub type BlockId = u16;

/// Block IDs for the vineyard grid.
pub mod vine_blocks {
    use super::BlockId;

    pub const AIR: BlockId = 0;
    pub const STONE: BlockId = 1;
    pub const DIRT: BlockId = 2;
    pub const FENCE: BlockId = 10;
    pub const RED_GRAPE_HEAD: BlockId = 11;
    pub const ATTACHED_RED_GRAPE_HEAD: BlockId = 12;
    pub const WHITE_GRAPE_HEAD: BlockId = 13;
    pub const ATTACHED_WHITE_GRAPE_HEAD: BlockId = 14;
    pub const RED_GRAPE_0: BlockId = 20;
    pub const RED_GRAPE_3: BlockId = 23;
    pub const WHITE_GRAPE_0: BlockId = 24;
    pub const WHITE_GRAPE_3: BlockId = 27;
}

/// Base block ID for a family's stage-0 canopy.
pub fn grape_base_id(variant: GrapeVariant) -> BlockId {
    match variant {
        GrapeVariant::Red => vine_blocks::RED_GRAPE_0,
        GrapeVariant::White => vine_blocks::WHITE_GRAPE_0,
    }
}

/// Block ID for a family's canopy at `stage` (clamped to `MAX_AGE`).
pub fn grape_block_id(variant: GrapeVariant, stage: u8) -> BlockId {
    grape_base_id(variant) + stage.min(MAX_AGE) as BlockId
}

/// Decode a canopy block ID into its family and stage.
pub fn grape_at(block_id: BlockId) -> Option<(GrapeVariant, u8)> {
    if (vine_blocks::RED_GRAPE_0..=vine_blocks::RED_GRAPE_3).contains(&block_id) {
        Some((GrapeVariant::Red, (block_id - vine_blocks::RED_GRAPE_0) as u8))
    } else if (vine_blocks::WHITE_GRAPE_0..=vine_blocks::WHITE_GRAPE_3).contains(&block_id) {
        Some((
            GrapeVariant::White,
            (block_id - vine_blocks::WHITE_GRAPE_0) as u8,
        ))
    } else {
        None
    }
}

/// Decode a head-marker block ID (free-standing or attached) into its family.
pub fn head_marker(block_id: BlockId) -> Option<GrapeVariant> {
    match block_id {
        vine_blocks::RED_GRAPE_HEAD | vine_blocks::ATTACHED_RED_GRAPE_HEAD => {
            Some(GrapeVariant::Red)
        }
        vine_blocks::WHITE_GRAPE_HEAD | vine_blocks::ATTACHED_WHITE_GRAPE_HEAD => {
            Some(GrapeVariant::White)
        }
        _ => None,
    }
}

/// Whether a block ID is a trellis support.
pub fn is_support(block_id: BlockId) -> bool {
    block_id == vine_blocks::FENCE
}

/// A feedback cue recorded by the grid for the host to play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueRecord {
    /// Where the cue originated.
    pub pos: BlockPos,
    /// Which cue to play.
    pub cue: SoundCue,
    /// Randomized pitch in `[0.8, 1.2)`.
    pub pitch: f32,
}

/// Sparse block grid with a light map, drop log, and cue log.
pub struct TrellisWorld {
    blocks: HashMap<BlockPos, BlockId>,
    light: HashMap<BlockPos, u8>,
    /// Light level assumed for cells without an explicit entry (open sky).
    default_light: u8,
    drops: Vec<(BlockPos, ItemStack)>,
    cues: Vec<CueRecord>,
    dirty: BTreeSet<BlockPos>,
}

impl TrellisWorld {
    /// Create an empty grid under full skylight.
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            light: HashMap::new(),
            default_light: 15,
            drops: Vec::new(),
            cues: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Block at `pos`; unset cells are air.
    pub fn block_at(&self, pos: BlockPos) -> BlockId {
        self.blocks.get(&pos).copied().unwrap_or(vine_blocks::AIR)
    }

    /// Place a block, overwriting whatever was there.
    pub fn set_block(&mut self, pos: BlockPos, block_id: BlockId) {
        if block_id == vine_blocks::AIR {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block_id);
        }
    }

    /// Override the light level at a cell.
    pub fn set_light(&mut self, pos: BlockPos, level: u8) {
        self.light.insert(pos, level.min(15));
    }

    /// The canopy at `pos`, if the cell holds one.
    pub fn vine_at(&self, pos: BlockPos) -> Option<(GrapeVariant, VineInstance)> {
        let (variant, stage) = grape_at(self.block_at(pos))?;
        Some((variant, VineInstance::new(pos, stage)))
    }

    /// Plant a stage-0 canopy if the placement rules allow it.
    pub fn plant(&mut self, variant: GrapeVariant, pos: BlockPos) -> bool {
        let controller = crate::vine::VineGrowthController::new(variant);
        if !self.is_open_space(pos) || !controller.can_occupy(pos, self) {
            return false;
        }
        self.set_block(pos, grape_block_id(variant, 0));
        true
    }

    /// Drain the accumulated item drops.
    pub fn take_drops(&mut self) -> Vec<(BlockPos, ItemStack)> {
        std::mem::take(&mut self.drops)
    }

    /// Drain the accumulated feedback cues.
    pub fn take_cues(&mut self) -> Vec<CueRecord> {
        std::mem::take(&mut self.cues)
    }

    /// Take the set of cells whose stage changed (clears internal state).
    pub fn take_dirty_cells(&mut self) -> BTreeSet<BlockPos> {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for TrellisWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldQuery for TrellisWorld {
    fn base_light_level(&self, pos: BlockPos, skylight_subtract: u8) -> u8 {
        self.light
            .get(&pos)
            .copied()
            .unwrap_or(self.default_light)
            .saturating_sub(skylight_subtract)
    }

    fn is_open_space(&self, pos: BlockPos) -> bool {
        self.block_at(pos) == vine_blocks::AIR
    }

    fn is_along_support(&self, pos: BlockPos) -> bool {
        Direction::HORIZONTAL
            .iter()
            .any(|direction| is_support(self.block_at(pos.offset(*direction))))
    }

    fn head_marker_at(&self, pos: BlockPos) -> Option<GrapeVariant> {
        head_marker(self.block_at(pos))
    }
}

impl WorldMutator for TrellisWorld {
    fn set_stage(&mut self, pos: BlockPos, new_stage: u8) {
        // Stale request: the cell no longer holds a canopy. Drop it; the
        // next scheduled evaluation re-derives fresh state.
        let Some((variant, _)) = grape_at(self.block_at(pos)) else {
            debug!(?pos, new_stage, "dropping stale stage write");
            return;
        };
        self.set_block(pos, grape_block_id(variant, new_stage));
        self.dirty.insert(pos);
    }

    fn grant_items(&mut self, pos: BlockPos, kind: ItemKind, count: u32) {
        self.drops.push((pos, ItemStack::new(kind, count)));
    }

    fn emit_feedback(&mut self, pos: BlockPos, cue: SoundCue, pitch: f32) {
        self.cues.push(CueRecord { pos, cue, pitch });
    }
}
