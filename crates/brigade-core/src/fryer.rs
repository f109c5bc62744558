//! Fryer baskets: submersion-gated timers over a constant oil bath.
//!
//! The oil holds a fixed temperature; all the play is in when the basket is
//! down. Time accrues only while submerged, lifting pauses it, and leaving a
//! load down past its target plus the grace margin ruins the basket.

use crate::fixed::{Fixed64, Ticks};
use crate::id::InstanceId;
use serde::{Deserialize, Serialize};

/// The oil bath temperature. Held constant by the fryer's thermostat.
pub const OIL_TEMP: Fixed64 = Fixed64::lit("180");
/// Submerged seconds past the configured target before the load burns.
pub const BURN_GRACE_TICKS: Ticks = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BasketStatus {
    #[default]
    Empty,
    Assigned,
    /// Left down too long. The load is ruined and must be discarded.
    Burned,
}

/// One fryer basket and its submersion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FryerBasket {
    pub status: BasketStatus,
    pub submerged: bool,
    /// Tick of the first lowering; None until the basket first goes down.
    pub started_at: Option<Ticks>,
    pub occupant: Option<InstanceId>,
}

impl Default for FryerBasket {
    fn default() -> Self {
        Self::new()
    }
}

impl FryerBasket {
    pub fn new() -> Self {
        Self {
            status: BasketStatus::Empty,
            submerged: false,
            started_at: None,
            occupant: None,
        }
    }

    pub fn ready_for_assign(&self) -> bool {
        self.status == BasketStatus::Empty && self.occupant.is_none()
    }

    pub fn assign(&mut self, instance: InstanceId) {
        self.status = BasketStatus::Assigned;
        self.occupant = Some(instance);
        self.submerged = false;
        self.started_at = None;
    }

    /// Lower the basket into the oil. The start timestamp is set once, on the
    /// first lowering, and survives later lifts.
    pub fn lower(&mut self, now: Ticks) {
        self.submerged = true;
        self.started_at.get_or_insert(now);
    }

    pub fn lift(&mut self) {
        self.submerged = false;
    }

    /// Whether the occupant's timer should accrue this tick.
    pub fn accruing(&self) -> bool {
        self.status == BasketStatus::Assigned && self.submerged
    }

    pub fn mark_burned(&mut self) {
        self.status = BasketStatus::Burned;
    }

    /// Reset to an empty basket, from any state including Burned.
    pub fn release(&mut self) {
        *self = FryerBasket::new();
    }
}
