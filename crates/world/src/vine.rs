//! Grape canopy growth and harvest state machine.
//!
//! A canopy block ripens through integer stages, gated by light and a random
//! tick chance, and can be picked repeatedly: harvesting a ripe canopy grants
//! grape bunches and winds the stage back to 1 rather than destroying it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use vineyard_core::{BlockPos, Direction, ItemKind};

/// Final growth stage; canopies at this stage are harvestable.
pub const MAX_AGE: u8 = 3;

/// Minimum light level above a canopy for it to ripen.
pub const GROWTH_LIGHT_FLOOR: u8 = 9;

/// One growth roll in this many succeeds per evaluation.
pub const GROWTH_CHANCE_IN: u32 = 5;

/// Stage a canopy is wound back to after harvest (not zero; the canopy
/// itself survives picking).
pub const HARVEST_RESET_STAGE: u8 = 1;

/// Grape family a canopy belongs to.
///
/// The family decides which head markers a canopy may attach to and which
/// item a harvest yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrapeVariant {
    /// Red grape line.
    Red,
    /// White grape line.
    White,
}

impl GrapeVariant {
    /// Item granted when a ripe canopy of this family is picked.
    pub fn yield_item(self) -> ItemKind {
        match self {
            GrapeVariant::Red => ItemKind::RedGrapeBunch,
            GrapeVariant::White => ItemKind::WhiteGrapeBunch,
        }
    }
}

/// A single canopy instance: where it sits and how far it has grown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VineInstance {
    /// Cell the canopy occupies.
    pub pos: BlockPos,
    /// Growth stage in `[0, MAX_AGE]`.
    pub stage: u8,
}

impl VineInstance {
    /// Create an instance, clamping the stage into its valid range.
    pub fn new(pos: BlockPos, stage: u8) -> Self {
        Self {
            pos,
            stage: stage.min(MAX_AGE),
        }
    }
}

/// Audio feedback cues requested by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Berries plucked from a ripe canopy.
    GrapePluck,
}

/// Outcome of a use interaction on a canopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseOutcome {
    /// The interaction produced an effect; stop upstream processing.
    Consumed,
    /// A growth-accelerant collaborator should process this interaction.
    Deferred,
    /// Nothing here; fall through to default interaction behavior.
    Unhandled,
}

/// Read-only questions the state machine asks of the surrounding world.
pub trait WorldQuery {
    /// Light level at `pos` after subtracting `skylight_subtract` from the
    /// sky contribution.
    fn base_light_level(&self, pos: BlockPos, skylight_subtract: u8) -> u8;

    /// Whether `pos` holds nothing a canopy would collide with.
    fn is_open_space(&self, pos: BlockPos) -> bool;

    /// Whether `pos` is horizontally adjacent to a trellis support.
    fn is_along_support(&self, pos: BlockPos) -> bool;

    /// The grape family of the head marker at `pos`, if one (free-standing
    /// or support-attached) is there.
    fn head_marker_at(&self, pos: BlockPos) -> Option<GrapeVariant>;
}

/// Mutation requests the state machine issues; the world applies them.
///
/// A `set_stage` against a cell that no longer holds a matching canopy is a
/// stale request and must be dropped by the implementation, never escalated.
pub trait WorldMutator {
    /// Write a new growth stage for the canopy at `pos`.
    fn set_stage(&mut self, pos: BlockPos, new_stage: u8);

    /// Grant `count` items of `kind` at `pos`.
    fn grant_items(&mut self, pos: BlockPos, kind: ItemKind, count: u32);

    /// Emit an audio cue at `pos` with the given pitch.
    fn emit_feedback(&mut self, pos: BlockPos, cue: SoundCue, pitch: f32);
}

/// Growth and harvest decisions for one grape family.
///
/// Every operation is a total, synchronous function of its inputs plus at
/// most a few random draws; the controller never mutates any cell other than
/// the instance's own.
#[derive(Debug, Clone, Copy)]
pub struct VineGrowthController {
    variant: GrapeVariant,
}

impl VineGrowthController {
    /// Controller for canopies of `variant`.
    pub fn new(variant: GrapeVariant) -> Self {
        Self { variant }
    }

    /// Family this controller decides for.
    pub fn variant(&self) -> GrapeVariant {
        self.variant
    }

    /// Whether the instance still has growing to do.
    ///
    /// Exposed separately so a scheduler can skip ripe canopies without
    /// paying for an evaluation.
    pub fn is_growth_eligible(&self, instance: VineInstance) -> bool {
        instance.stage < MAX_AGE
    }

    /// One scheduled growth evaluation.
    ///
    /// Rolls a 1-in-[`GROWTH_CHANCE_IN`] chance and, if the cell above is lit
    /// to at least [`GROWTH_LIGHT_FLOOR`], requests a stage increment of
    /// exactly one. On any failed gate this is a no-op; the next evaluation
    /// independently re-rolls.
    pub fn evaluate_growth_tick<W, R>(&self, instance: VineInstance, world: &mut W, rng: &mut R)
    where
        W: WorldQuery + WorldMutator,
        R: Rng,
    {
        if !self.is_growth_eligible(instance) {
            return;
        }
        if rng.gen_range(0..GROWTH_CHANCE_IN) != 0 {
            return;
        }
        if world.base_light_level(instance.pos.up(), 0) < GROWTH_LIGHT_FLOOR {
            return;
        }
        world.set_stage(instance.pos, instance.stage + 1);
    }

    /// A use (right-click) interaction on the canopy.
    ///
    /// Ripe canopies are picked: one or two grape bunches drop, a pluck cue
    /// plays at a randomized pitch, and the stage winds back to
    /// [`HARVEST_RESET_STAGE`]. Holding a growth accelerant on an unripe
    /// canopy defers to fertilizer handling instead.
    pub fn attempt_harvest<M, R>(
        &self,
        instance: VineInstance,
        held: Option<ItemKind>,
        mutator: &mut M,
        rng: &mut R,
    ) -> UseOutcome
    where
        M: WorldMutator,
        R: Rng,
    {
        let is_ripe = instance.stage == MAX_AGE;

        if !is_ripe && held.is_some_and(ItemKind::is_growth_accelerant) {
            return UseOutcome::Deferred;
        }
        if is_ripe {
            let count = 1 + rng.gen_range(0..2u32);
            mutator.grant_items(instance.pos, self.variant.yield_item(), count);
            let pitch = 0.8 + rng.gen::<f32>() * 0.4;
            mutator.emit_feedback(instance.pos, SoundCue::GrapePluck, pitch);
            mutator.set_stage(instance.pos, HARVEST_RESET_STAGE);
            return UseOutcome::Consumed;
        }
        UseOutcome::Unhandled
    }

    /// Resolve a [`UseOutcome::Deferred`] interaction: advance one stage,
    /// clamped at [`MAX_AGE`].
    pub fn apply_accelerant<M: WorldMutator>(&self, instance: VineInstance, mutator: &mut M) {
        let next = (instance.stage + 1).min(MAX_AGE);
        mutator.set_stage(instance.pos, next);
    }

    /// Whether a canopy of this family may exist at `pos`.
    ///
    /// Pure and safe to call speculatively, e.g. from a placement preview.
    pub fn can_occupy<Q: WorldQuery>(&self, pos: BlockPos, query: &Q) -> bool {
        query.is_along_support(pos)
            && self.is_along_vine_head(pos, query)
            && query.is_open_space(pos.down())
    }

    /// Cardinal-adjacency check against head markers of the same family.
    fn is_along_vine_head<Q: WorldQuery>(&self, pos: BlockPos, query: &Q) -> bool {
        Direction::HORIZONTAL
            .iter()
            .any(|direction| query.head_marker_at(pos.offset(*direction)) == Some(self.variant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Request {
        SetStage(BlockPos, u8),
        Grant(BlockPos, ItemKind, u32),
        Feedback(BlockPos, SoundCue, f32),
    }

    /// A scripted world with fixed query answers and a mutation log.
    struct TestWorld {
        light_above: u8,
        along_support: bool,
        head_marker: Option<GrapeVariant>,
        open_below: bool,
        requests: Vec<Request>,
    }

    impl TestWorld {
        fn lit() -> Self {
            Self {
                light_above: 15,
                along_support: true,
                head_marker: Some(GrapeVariant::Red),
                open_below: true,
                requests: Vec::new(),
            }
        }

        fn dark() -> Self {
            Self {
                light_above: 0,
                ..Self::lit()
            }
        }
    }

    impl WorldQuery for TestWorld {
        fn base_light_level(&self, _pos: BlockPos, skylight_subtract: u8) -> u8 {
            self.light_above.saturating_sub(skylight_subtract)
        }

        fn is_open_space(&self, _pos: BlockPos) -> bool {
            self.open_below
        }

        fn is_along_support(&self, _pos: BlockPos) -> bool {
            self.along_support
        }

        fn head_marker_at(&self, _pos: BlockPos) -> Option<GrapeVariant> {
            self.head_marker
        }
    }

    impl WorldMutator for TestWorld {
        fn set_stage(&mut self, pos: BlockPos, new_stage: u8) {
            self.requests.push(Request::SetStage(pos, new_stage));
        }

        fn grant_items(&mut self, pos: BlockPos, kind: ItemKind, count: u32) {
            self.requests.push(Request::Grant(pos, kind, count));
        }

        fn emit_feedback(&mut self, pos: BlockPos, cue: SoundCue, pitch: f32) {
            self.requests.push(Request::Feedback(pos, cue, pitch));
        }
    }

    fn controller() -> VineGrowthController {
        VineGrowthController::new(GrapeVariant::Red)
    }

    fn pos() -> BlockPos {
        BlockPos::new(3, 64, -2)
    }

    #[test]
    fn eligibility_tracks_max_age() {
        let controller = controller();
        for stage in 0..MAX_AGE {
            assert!(controller.is_growth_eligible(VineInstance::new(pos(), stage)));
        }
        assert!(!controller.is_growth_eligible(VineInstance::new(pos(), MAX_AGE)));
    }

    #[test]
    fn instance_stage_is_clamped() {
        assert_eq!(VineInstance::new(pos(), 200).stage, MAX_AGE);
    }

    #[test]
    fn growth_never_happens_in_the_dark() {
        let controller = controller();
        let mut world = TestWorld::dark();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            controller.evaluate_growth_tick(VineInstance::new(pos(), 0), &mut world, &mut rng);
        }
        assert!(world.requests.is_empty());
    }

    #[test]
    fn growth_increments_stage_by_exactly_one() {
        let controller = controller();
        let mut world = TestWorld::lit();
        let mut rng = StdRng::seed_from_u64(7);
        // The 1-in-5 roll fails a run of 1000 evaluations with probability
        // (4/5)^1000, so this loop reliably observes one growth event.
        for _ in 0..1000 {
            controller.evaluate_growth_tick(VineInstance::new(pos(), 0), &mut world, &mut rng);
            if !world.requests.is_empty() {
                break;
            }
        }
        assert_eq!(world.requests, vec![Request::SetStage(pos(), 1)]);
    }

    #[test]
    fn growth_from_penultimate_stage_reaches_max_and_stops() {
        let controller = controller();
        let mut world = TestWorld::lit();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            controller
                .evaluate_growth_tick(VineInstance::new(pos(), MAX_AGE - 1), &mut world, &mut rng);
            if !world.requests.is_empty() {
                break;
            }
        }
        assert_eq!(world.requests, vec![Request::SetStage(pos(), MAX_AGE)]);
        assert!(!controller.is_growth_eligible(VineInstance::new(pos(), MAX_AGE)));
    }

    #[test]
    fn ripe_canopy_never_grows_further() {
        let controller = controller();
        let mut world = TestWorld::lit();
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..1000 {
            controller.evaluate_growth_tick(
                VineInstance::new(pos(), MAX_AGE),
                &mut world,
                &mut rng,
            );
        }
        assert!(world.requests.is_empty());
    }

    #[test]
    fn harvest_at_max_age_grants_and_resets_to_one() {
        let controller = controller();
        let mut world = TestWorld::lit();
        let mut rng = StdRng::seed_from_u64(17);
        let outcome = controller.attempt_harvest(
            VineInstance::new(pos(), MAX_AGE),
            None,
            &mut world,
            &mut rng,
        );
        assert_eq!(outcome, UseOutcome::Consumed);
        assert_eq!(world.requests.len(), 3);
        match world.requests[0] {
            Request::Grant(at, kind, count) => {
                assert_eq!(at, pos());
                assert_eq!(kind, ItemKind::RedGrapeBunch);
                assert!((1..=2).contains(&count));
            }
            ref other => panic!("expected grant first, got {other:?}"),
        }
        match world.requests[1] {
            Request::Feedback(at, cue, pitch) => {
                assert_eq!(at, pos());
                assert_eq!(cue, SoundCue::GrapePluck);
                assert!((0.8..1.2).contains(&pitch));
            }
            ref other => panic!("expected feedback second, got {other:?}"),
        }
        assert_eq!(
            world.requests[2],
            Request::SetStage(pos(), HARVEST_RESET_STAGE)
        );
    }

    #[test]
    fn harvest_yield_covers_both_counts() {
        let controller = controller();
        let mut seen = [false; 3];
        for seed in 0..200 {
            let mut world = TestWorld::lit();
            let mut rng = StdRng::seed_from_u64(seed);
            controller.attempt_harvest(
                VineInstance::new(pos(), MAX_AGE),
                None,
                &mut world,
                &mut rng,
            );
            let Request::Grant(_, _, count) = world.requests[0] else {
                panic!("harvest must grant items first");
            };
            assert!((1..=2).contains(&count));
            seen[count as usize] = true;
        }
        assert!(seen[1] && seen[2], "200 harvests should see both yields");
    }

    #[test]
    fn white_variant_yields_white_bunches() {
        let controller = VineGrowthController::new(GrapeVariant::White);
        let mut world = TestWorld::lit();
        let mut rng = StdRng::seed_from_u64(19);
        controller.attempt_harvest(
            VineInstance::new(pos(), MAX_AGE),
            None,
            &mut world,
            &mut rng,
        );
        assert!(matches!(
            world.requests[0],
            Request::Grant(_, ItemKind::WhiteGrapeBunch, _)
        ));
    }

    #[test]
    fn accelerant_defers_below_max_age() {
        let controller = controller();
        for stage in 0..MAX_AGE {
            let mut world = TestWorld::lit();
            let mut rng = StdRng::seed_from_u64(23);
            let outcome = controller.attempt_harvest(
                VineInstance::new(pos(), stage),
                Some(ItemKind::BoneMeal),
                &mut world,
                &mut rng,
            );
            assert_eq!(outcome, UseOutcome::Deferred);
            assert!(world.requests.is_empty());
        }
    }

    #[test]
    fn accelerant_in_hand_does_not_block_harvest_at_max_age() {
        let controller = controller();
        let mut world = TestWorld::lit();
        let mut rng = StdRng::seed_from_u64(29);
        let outcome = controller.attempt_harvest(
            VineInstance::new(pos(), MAX_AGE),
            Some(ItemKind::BoneMeal),
            &mut world,
            &mut rng,
        );
        assert_eq!(outcome, UseOutcome::Consumed);
    }

    #[test]
    fn unripe_canopy_without_accelerant_is_unhandled() {
        let controller = controller();
        for held in [None, Some(ItemKind::RedGrapeBunch)] {
            for stage in 0..MAX_AGE {
                let mut world = TestWorld::lit();
                let mut rng = StdRng::seed_from_u64(31);
                let outcome = controller.attempt_harvest(
                    VineInstance::new(pos(), stage),
                    held,
                    &mut world,
                    &mut rng,
                );
                assert_eq!(outcome, UseOutcome::Unhandled);
                assert!(world.requests.is_empty());
            }
        }
    }

    #[test]
    fn apply_accelerant_clamps_at_max_age() {
        let controller = controller();

        let mut world = TestWorld::lit();
        controller.apply_accelerant(VineInstance::new(pos(), 1), &mut world);
        assert_eq!(world.requests, vec![Request::SetStage(pos(), 2)]);

        let mut world = TestWorld::lit();
        controller.apply_accelerant(VineInstance::new(pos(), MAX_AGE), &mut world);
        assert_eq!(world.requests, vec![Request::SetStage(pos(), MAX_AGE)]);
    }

    #[test]
    fn can_occupy_requires_all_three_conditions() {
        let controller = controller();
        for support in [false, true] {
            for head in [false, true] {
                for open in [false, true] {
                    let world = TestWorld {
                        light_above: 15,
                        along_support: support,
                        head_marker: head.then_some(GrapeVariant::Red),
                        open_below: open,
                        requests: Vec::new(),
                    };
                    assert_eq!(
                        controller.can_occupy(pos(), &world),
                        support && head && open,
                        "support={support} head={head} open={open}"
                    );
                }
            }
        }
    }

    #[test]
    fn can_occupy_rejects_other_family_heads() {
        let controller = controller();
        let world = TestWorld {
            head_marker: Some(GrapeVariant::White),
            ..TestWorld::lit()
        };
        assert!(!controller.can_occupy(pos(), &world));
    }

    proptest! {
        #[test]
        fn growth_requests_never_exceed_max_age(stage in 0u8..=MAX_AGE, seed: u64) {
            let controller = controller();
            let mut world = TestWorld::lit();
            let mut rng = StdRng::seed_from_u64(seed);
            controller.evaluate_growth_tick(VineInstance::new(pos(), stage), &mut world, &mut rng);
            for request in &world.requests {
                let Request::SetStage(_, new_stage) = request else {
                    panic!("growth must only write stages");
                };
                prop_assert_eq!(*new_stage, stage + 1);
                prop_assert!(*new_stage <= MAX_AGE);
            }
        }

        #[test]
        fn harvest_outcome_matches_stage_and_hand(stage in 0u8..=MAX_AGE, bone_meal: bool, seed: u64) {
            let controller = controller();
            let mut world = TestWorld::lit();
            let mut rng = StdRng::seed_from_u64(seed);
            let held = bone_meal.then_some(ItemKind::BoneMeal);
            let outcome = controller.attempt_harvest(
                VineInstance::new(pos(), stage),
                held,
                &mut world,
                &mut rng,
            );
            let expected = if stage == MAX_AGE {
                UseOutcome::Consumed
            } else if bone_meal {
                UseOutcome::Deferred
            } else {
                UseOutcome::Unhandled
            };
            prop_assert_eq!(outcome, expected);
            prop_assert_eq!(outcome == UseOutcome::Consumed, !world.requests.is_empty());
        }
    }
}
