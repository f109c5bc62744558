//! Read-only query API for inspecting kitchen state.
//!
//! Provides snapshot types that aggregate engine state into convenient views
//! for rendering, UI, and FFI consumers. All types are owned copies -- no
//! references into internal engine storage.

use crate::fixed::{Fixed64, Ticks};
use crate::fryer::BasketStatus;
use crate::id::{BasketId, BundleId, BurnerId, InstanceId, OrderId, RecipeId};
use crate::instance::{IngredientPortion, Location};
use crate::order::OrderStatus;
use crate::wok::{BurnerCondition, HeatLevel};

// ---------------------------------------------------------------------------
// Burner snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single wok burner.
///
/// Contains the thermal state, the pan's physical condition, and the
/// occupying bundle if one is assigned. Suitable for driving a station UI.
#[derive(Debug, Clone)]
pub struct BurnerSnapshot {
    /// The burner's index on the range.
    pub burner: BurnerId,
    /// Whether the flame is lit.
    pub is_on: bool,
    /// Current flame setting.
    pub heat_level: HeatLevel,
    /// Physical condition of the pan (clean, wet, dirty, ...).
    pub condition: BurnerCondition,
    /// Pan surface temperature in degrees Celsius.
    pub temperature: Fixed64,
    /// Whether the pan currently holds water.
    pub has_water: bool,
    /// Water temperature in degrees Celsius. Meaningless when `has_water` is false.
    pub water_temperature: Fixed64,
    /// Whether the water has boiled and dwelled long enough to cook with.
    pub is_boiling: bool,
    /// Bundle instance cooking on this burner, if any.
    pub occupant: Option<InstanceId>,
}

// ---------------------------------------------------------------------------
// Basket snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single fryer basket.
#[derive(Debug, Clone)]
pub struct BasketSnapshot {
    /// The basket's index on the fryer.
    pub basket: BasketId,
    /// Lifecycle status (empty, assigned, burned).
    pub status: BasketStatus,
    /// Whether the basket is lowered into the oil.
    pub submerged: bool,
    /// Tick of the first lower, if the load has ever touched oil.
    pub started_at: Option<Ticks>,
    /// Bundle instance loaded in this basket, if any.
    pub occupant: Option<InstanceId>,
}

// ---------------------------------------------------------------------------
// Microwave snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of the microwave queue.
///
/// Only the head of the queue runs; the rest wait their turn. The head's
/// progress is surfaced here so a UI can show a countdown.
#[derive(Debug, Clone)]
pub struct MicrowaveSnapshot {
    /// Queued instances, head first.
    pub queue: Vec<InstanceId>,
    /// Ticks the head has accrued so far. `None` when the queue is empty.
    pub head_elapsed: Option<Ticks>,
    /// The head's configured timer. `None` when empty or untimed.
    pub head_timer: Option<Ticks>,
}

// ---------------------------------------------------------------------------
// Instance snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single bundle instance.
///
/// Combines location, recipe progress, cooking timers, and the portion log
/// into one owned value. Suitable for passing across FFI boundaries or to
/// rendering code.
#[derive(Debug, Clone)]
pub struct InstanceSnapshot {
    /// The instance's key.
    pub instance: InstanceId,
    /// Order this instance belongs to.
    pub order: OrderId,
    /// Catalog bundle this instance was built from.
    pub bundle: BundleId,
    /// Where the instance currently is in the kitchen.
    pub location: Location,
    /// Index of the active recipe step.
    pub current_step: usize,
    /// Total steps in the bundle's recipe.
    pub total_steps: usize,
    /// Ticks accrued at a timed station.
    pub elapsed: Ticks,
    /// Configured cook timer, if the station is timed.
    pub timer: Option<Ticks>,
    /// Mistakes recorded against this instance so far.
    pub errors: u32,
    /// Portions still available for merging onto a plate.
    pub available_amount: u32,
    /// Everything that has gone into the pan, in feed order.
    pub portions: Vec<IngredientPortion>,
}

// ---------------------------------------------------------------------------
// Order snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single menu order.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    /// The order's key.
    pub order: OrderId,
    /// Recipe the customer ordered.
    pub recipe: RecipeId,
    /// Display name of the recipe, copied out of the catalog at entry.
    pub menu_name: String,
    /// Lifecycle status (waiting, cooking, completed).
    pub status: OrderStatus,
    /// Ticks since the order was entered.
    pub age: Ticks,
}

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// Station utilization counts for the whole kitchen.
///
/// Cheap to compute every tick; the stats layer samples this to build
/// utilization windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    /// Burners installed on the range.
    pub burners_total: usize,
    /// Burners with an assigned bundle.
    pub burners_busy: usize,
    /// Baskets installed on the fryer.
    pub baskets_total: usize,
    /// Baskets with a loaded bundle.
    pub baskets_busy: usize,
    /// Instances queued at the microwave, including the head.
    pub microwave_depth: usize,
    /// Instances anywhere in the kitchen that have not reached a terminal
    /// location.
    pub live_instances: usize,
}
