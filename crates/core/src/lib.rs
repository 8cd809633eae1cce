#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod item;
pub mod pos;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use item::{ItemKind, ItemStack};
pub use pos::{BlockPos, Direction};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Helper to derive a reproducible RNG seeded by world + domain + tick.
///
/// Each subsystem passes its own `domain` constant so two systems ticking on
/// the same world never consume the same random stream.
pub fn scoped_rng(world_seed: u64, domain: u64, tick: SimTick) -> StdRng {
    let seed = world_seed
        ^ domain.rotate_left(17)
        ^ tick.0.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(seed)
}
