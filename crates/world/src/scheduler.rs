//! Deterministic scheduling for registered canopies.
//!
//! The system owns the set of cells that need growth evaluations and drives
//! the state machine with a per-tick seeded RNG stream, so a whole run is
//! reproducible from the world seed alone.

use crate::trellis::TrellisWorld;
use crate::vine::{UseOutcome, VineGrowthController};
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use tracing::debug;
use vineyard_core::{scoped_rng, BlockPos, ItemKind, SimTick};

// "GRAPEVIN" / "GRAPEUSE": separate random streams for growth and use
// interactions so a harvest never perturbs the growth timeline.
const TICK_STREAM_DOMAIN: u64 = 0x4752_4150_4556_494E;
const USE_STREAM_DOMAIN: u64 = 0x4752_4150_4555_5345;

/// Deterministic growth driver for grape canopies.
pub struct VineGrowthSystem {
    world_seed: u64,
    /// Registered canopy cells (BTreeSet for deterministic iteration).
    vines: BTreeSet<BlockPos>,
}

impl VineGrowthSystem {
    /// Create a new growth system.
    pub fn new(world_seed: u64) -> Self {
        Self {
            world_seed,
            vines: BTreeSet::new(),
        }
    }

    /// Register a canopy cell for growth evaluations.
    pub fn register(&mut self, pos: BlockPos) {
        self.vines.insert(pos);
    }

    /// Unregister a canopy cell (e.g. when the block is broken).
    pub fn unregister(&mut self, pos: BlockPos) {
        self.vines.remove(&pos);
    }

    /// Number of registered canopy cells.
    pub fn vine_count(&self) -> usize {
        self.vines.len()
    }

    /// Run one scheduled evaluation over every registered canopy.
    ///
    /// Ripe canopies stay registered: unlike a crop that is done growing
    /// once mature, a harvested canopy winds back to stage 1 and becomes
    /// eligible again. Cells that no longer hold a canopy unregister
    /// themselves.
    pub fn tick(&mut self, tick: SimTick, world: &mut TrellisWorld) {
        if self.vines.is_empty() {
            return;
        }

        let mut rng = scoped_rng(self.world_seed, TICK_STREAM_DOMAIN, tick);

        // Collect cells to evaluate (avoid borrow issues).
        let to_check: Vec<BlockPos> = self.vines.iter().copied().collect();

        for pos in to_check {
            let Some((variant, instance)) = world.vine_at(pos) else {
                debug!(?pos, "unregistering cell that no longer holds a canopy");
                self.vines.remove(&pos);
                continue;
            };
            let controller = VineGrowthController::new(variant);
            if !controller.is_growth_eligible(instance) {
                continue;
            }
            controller.evaluate_growth_tick(instance, world, &mut rng);
        }
    }

    /// Dispatch a use (right-click) interaction at `pos`.
    ///
    /// Returns [`UseOutcome::Unhandled`] when the cell holds no canopy.
    pub fn interact(
        &self,
        tick: SimTick,
        pos: BlockPos,
        held: Option<ItemKind>,
        world: &mut TrellisWorld,
    ) -> UseOutcome {
        let Some((variant, instance)) = world.vine_at(pos) else {
            return UseOutcome::Unhandled;
        };
        let controller = VineGrowthController::new(variant);
        let mut rng = self.use_rng(tick, pos);
        controller.attempt_harvest(instance, held, world, &mut rng)
    }

    /// Resolve a [`UseOutcome::Deferred`] interaction by advancing the
    /// canopy one stage. Returns false when there is nothing to fertilize.
    pub fn apply_accelerant(&self, pos: BlockPos, world: &mut TrellisWorld) -> bool {
        let Some((variant, instance)) = world.vine_at(pos) else {
            return false;
        };
        let controller = VineGrowthController::new(variant);
        if !controller.is_growth_eligible(instance) {
            return false;
        }
        controller.apply_accelerant(instance, world);
        true
    }

    /// Per-interaction RNG stream, mixed with the cell so two harvests on
    /// the same tick draw independently.
    fn use_rng(&self, tick: SimTick, pos: BlockPos) -> StdRng {
        let pos_mix = (pos.x as u64)
            .wrapping_mul(0x517C_C1B7_2722_0A95)
            .wrapping_add((pos.y as u64).wrapping_mul(0x2545_F491_4F6C_DD1D))
            .wrapping_add(pos.z as u64);
        scoped_rng(self.world_seed ^ pos_mix, USE_STREAM_DOMAIN, tick)
    }
}
