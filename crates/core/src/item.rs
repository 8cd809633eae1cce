//! Item kinds and stacks used by the vineyard simulation.

use serde::{Deserialize, Serialize};

/// Kinds of items the simulation can grant or consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Harvested bunch of red grapes.
    RedGrapeBunch,
    /// Harvested bunch of white grapes.
    WhiteGrapeBunch,
    /// Growth accelerant; defers interaction to fertilizer handling.
    BoneMeal,
}

impl ItemKind {
    /// Maximum stack size for this item kind.
    pub fn max_stack_size(self) -> u32 {
        match self {
            // Harvested produce stacks like other food items.
            ItemKind::RedGrapeBunch | ItemKind::WhiteGrapeBunch => 16,
            ItemKind::BoneMeal => 64,
        }
    }

    /// Whether holding this item during a use interaction defers the
    /// interaction to growth-accelerant handling.
    pub fn is_growth_accelerant(self) -> bool {
        matches!(self, ItemKind::BoneMeal)
    }
}

/// A homogeneous stack of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Kind of item in the stack.
    pub kind: ItemKind,
    /// Number of items; never exceeds `kind.max_stack_size()`.
    pub count: u32,
}

impl ItemStack {
    /// Create a stack, clamping `count` to the kind's stack limit.
    pub fn new(kind: ItemKind, count: u32) -> Self {
        Self {
            kind,
            count: count.min(kind.max_stack_size()),
        }
    }
}
