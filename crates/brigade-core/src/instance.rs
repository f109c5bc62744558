//! Live bundle state: where an instance is in its lifecycle, how far its
//! cooking sequence has progressed, and what has landed in the pan so far.
//!
//! The lifecycle is a one-way walk: NotAssigned -> a cooking station ->
//! PlateSelect -> a deco area -> Merged or Served. There are no reverse
//! edges; abandoning an instance means discarding it.

use crate::catalog::Unit;
use crate::fixed::Ticks;
use crate::id::{
    BasketId, BundleId, BurnerId, IngredientId, InstanceId, OrderId, RequirementId,
};
use crate::plating::PlatingState;
use serde::{Deserialize, Serialize};

/// Where an instance currently sits. Variants double as lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// Created but not yet placed on a station.
    NotAssigned,
    Wok { burner: BurnerId },
    Fryer { basket: BasketId },
    Microwave,
    /// Cooking finished; waiting for a plate choice.
    PlateSelect,
    /// On the main plate, receiving decoration.
    DecoMain,
    /// In the setting area, waiting to merge into a main plate.
    DecoSetting,
    /// Fully absorbed into another instance's plate.
    Merged { target: InstanceId },
    Served,
}

impl Location {
    /// Whether the instance is on a cooking station.
    pub fn is_cooking(self) -> bool {
        matches!(
            self,
            Location::Wok { .. } | Location::Fryer { .. } | Location::Microwave
        )
    }

    /// Terminal states: nothing further happens to the instance.
    pub fn is_terminal(self) -> bool {
        matches!(self, Location::Merged { .. } | Location::Served)
    }

    /// The station this location occupies, if any.
    pub fn station(self) -> Option<StationRef> {
        match self {
            Location::Wok { burner } => Some(StationRef::Wok(burner)),
            Location::Fryer { basket } => Some(StationRef::Fryer(basket)),
            Location::Microwave => Some(StationRef::Microwave),
            _ => None,
        }
    }
}

/// A cooking station slot, independent of any occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationRef {
    Wok(BurnerId),
    Fryer(BasketId),
    Microwave,
}

/// One ingredient deposit recorded against an instance, for the ticket log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientPortion {
    pub ingredient: IngredientId,
    pub display_name: String,
    pub amount: u32,
    pub unit: Unit,
}

/// Progress through a bundle's cooking sequence plus the station timer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingProgress {
    /// Index into the bundle's ordered step list.
    pub current_step: usize,
    pub total_steps: usize,
    /// Requirements of the current step satisfied so far. Cleared on advance.
    pub satisfied: Vec<RequirementId>,
    pub started_at: Ticks,
    /// Configured duration for timed stations (fryer, microwave).
    pub timer: Option<Ticks>,
    /// Seconds accrued under the station's accrual condition.
    pub elapsed: Ticks,
    /// Microwave power setting, when assigned there.
    pub power: Option<u8>,
}

impl CookingProgress {
    pub fn new(total_steps: usize, started_at: Ticks) -> Self {
        Self {
            current_step: 0,
            total_steps,
            satisfied: Vec::new(),
            started_at,
            timer: None,
            elapsed: 0,
            power: None,
        }
    }

    /// All steps done; the bundle can leave the station.
    pub fn is_complete(&self) -> bool {
        self.current_step >= self.total_steps
    }

    /// Move to the next step, clearing the per-step satisfied set.
    pub fn advance(&mut self) {
        self.current_step += 1;
        self.satisfied.clear();
    }

    /// Whether the station timer has run its configured course.
    pub fn timer_elapsed(&self) -> bool {
        match self.timer {
            Some(target) => self.elapsed >= target,
            None => false,
        }
    }
}

/// One live bundle being cooked, plated, or merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleInstance {
    pub order: OrderId,
    pub bundle: BundleId,
    pub location: Location,
    pub cooking: CookingProgress,
    /// Set once the instance is routed onto a plate.
    pub plating: Option<PlatingState>,
    /// Everything dropped into this instance, in order.
    pub portions: Vec<IngredientPortion>,
    /// Mistakes recorded under lenient enforcement.
    pub errors: u32,
    /// Portions left for merging; drawn down by partial merges.
    pub available_amount: u32,
}

impl BundleInstance {
    pub fn new(
        order: OrderId,
        bundle: BundleId,
        location: Location,
        total_steps: usize,
        now: Ticks,
        portion_yield: u32,
    ) -> Self {
        Self {
            order,
            bundle,
            location,
            cooking: CookingProgress::new(total_steps, now),
            plating: None,
            portions: Vec::new(),
            errors: 0,
            available_amount: portion_yield,
        }
    }
}
