//! Orders on the board and their departure bookkeeping.
//!
//! An order's status follows its instances: Waiting until the first bundle
//! is assigned, Cooking while any instance is live, back to Waiting if they
//! are all lost, and Completed when the main plate is served. Expiry and
//! departure sweeps live in the kitchen tick; this module holds the state.

use crate::fixed::Ticks;
use crate::id::{OrderId, RecipeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// On the board, nothing assigned yet (or everything was lost).
    Waiting,
    /// At least one instance is live.
    Cooking,
    /// Served; lingers briefly for display, then departs.
    Completed,
}

/// One customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOrder {
    pub recipe: RecipeId,
    /// Copied from the recipe at intake, so the board needs no catalog lookup.
    pub menu_name: String,
    pub entered_at: Ticks,
    pub status: OrderStatus,
}

impl MenuOrder {
    pub fn new(recipe: RecipeId, menu_name: String, entered_at: Ticks) -> Self {
        Self {
            recipe,
            menu_name,
            entered_at,
            status: OrderStatus::Waiting,
        }
    }

    /// Seconds on the board.
    pub fn age(&self, now: Ticks) -> Ticks {
        now.saturating_sub(self.entered_at)
    }

    /// Whether the hard timeout applies. Completed orders never expire.
    pub fn expires(&self) -> bool {
        self.status != OrderStatus::Completed
    }
}

/// A scheduled board departure for a completed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartureTimer {
    pub order: OrderId,
    pub due: Ticks,
}
