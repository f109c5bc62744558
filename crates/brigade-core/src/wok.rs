//! Wok burner thermal model.
//!
//! Each burner is an independent pan with a gas knob. Dry pans climb toward
//! a hard ceiling with quadratically-damped gains, so the last degrees take
//! far longer than the first. Past the overheat threshold the pan is on a
//! path to ruin; past the burn threshold it and anything in it are lost.
//! Water changes the regime entirely: the pan is quenched to the boil point
//! and the water column heats linearly instead, with a dwell requirement
//! before it counts as boiling.
//!
//! All rates are per tick (one second) in Q32.32, so the curve is
//! bit-identical across runs.

use crate::catalog::IngredientCategory;
use crate::fixed::{Fixed64, Ticks};
use crate::id::InstanceId;
use serde::{Deserialize, Serialize};

/// Resting temperature of an unheated pan, in degrees C.
pub const AMBIENT_TEMP: Fixed64 = Fixed64::lit("25");
/// Asymptotic ceiling of the dry-pan curve.
pub const MAX_WOK_TEMP: Fixed64 = Fixed64::lit("340");
/// Above this the pan reads as overheating.
pub const OVERHEAT_TEMP: Fixed64 = Fixed64::lit("260");
/// At this the pan and its contents are ruined.
pub const BURN_TEMP: Fixed64 = Fixed64::lit("300");
/// Dry-pan gain per tick at full headroom and heat level 1.
pub const BASE_HEAT_RATE: Fixed64 = Fixed64::lit("2");
/// Dry-pan loss per tick with the burner off.
pub const COOL_RATE: Fixed64 = Fixed64::lit("5");
/// A washed (wet) pan reads clean again once it dries past this.
pub const DRY_TEMP: Fixed64 = Fixed64::lit("60");
/// Water gain per tick with the burner on.
pub const WATER_HEAT_RATE: Fixed64 = Fixed64::lit("2.5");
/// Water loss per tick with the burner off.
pub const WATER_COOL_RATE: Fixed64 = Fixed64::lit("3");
/// Water ceiling; also the pan clamp while water is present.
pub const BOIL_TEMP: Fixed64 = Fixed64::lit("100");
/// Consecutive ticks the water must hold at the boil point to count as boiling.
pub const BOIL_DWELL_TICKS: Ticks = 5;
/// Pan temperature shed by one stir-fry toss.
pub const STIR_TEMP_DROP: Fixed64 = Fixed64::lit("8");

/// Gas knob setting. Scales the dry-pan heat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeatLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl HeatLevel {
    pub fn multiplier(self) -> Fixed64 {
        match self {
            HeatLevel::Low => Fixed64::lit("1"),
            HeatLevel::Medium => Fixed64::lit("1.5"),
            HeatLevel::High => Fixed64::lit("2"),
        }
    }
}

/// Pan condition, derived from use and from ascending temperature thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BurnerCondition {
    /// Ready for a new assignment.
    #[default]
    Clean,
    /// Just washed; dries back to Clean once the pan warms past [`DRY_TEMP`].
    Wet,
    /// Used by a finished or discarded cook; needs a wash.
    Dirty,
    /// Ruined by heat; needs a wash.
    Burned,
    /// Dry pan past [`OVERHEAT_TEMP`]; recoverable by cooling.
    Overheating,
}

/// What one thermal tick did to the burner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurnerTick {
    /// The pan crossed the burn threshold this tick.
    pub burned: bool,
    /// The water finished its dwell and is now boiling.
    pub started_boiling: bool,
}

/// One wok burner: gas knob, pan, and optionally a column of water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Burner {
    pub is_on: bool,
    pub heat_level: HeatLevel,
    pub condition: BurnerCondition,
    pub temperature: Fixed64,
    pub has_water: bool,
    pub water_temperature: Fixed64,
    /// Consecutive ticks the water has held at the boil point.
    pub boil_dwell: Ticks,
    pub is_boiling: bool,
    pub occupant: Option<InstanceId>,
}

impl Default for Burner {
    fn default() -> Self {
        Self::new()
    }
}

impl Burner {
    pub fn new() -> Self {
        Self {
            is_on: false,
            heat_level: HeatLevel::default(),
            condition: BurnerCondition::Clean,
            temperature: AMBIENT_TEMP,
            has_water: false,
            water_temperature: AMBIENT_TEMP,
            boil_dwell: 0,
            is_boiling: false,
            occupant: None,
        }
    }

    /// A burner accepts a new assignment only when clean and empty.
    pub fn ready_for_assign(&self) -> bool {
        self.condition == BurnerCondition::Clean && self.occupant.is_none()
    }

    /// Advance the thermal model by one tick.
    pub fn tick(&mut self) -> BurnerTick {
        let mut out = BurnerTick::default();
        if self.has_water {
            self.tick_water(&mut out);
        } else if self.is_on {
            self.heat_dry();
        } else {
            self.cool_dry();
        }
        self.settle_condition(&mut out);
        out
    }

    // Gain shrinks with the square of remaining headroom, so the pan races
    // through the low range and crawls toward the ceiling.
    fn heat_dry(&mut self) {
        if self.temperature >= MAX_WOK_TEMP {
            self.temperature = MAX_WOK_TEMP;
            return;
        }
        let headroom = (MAX_WOK_TEMP - self.temperature) / (MAX_WOK_TEMP - AMBIENT_TEMP);
        let gain = BASE_HEAT_RATE * self.heat_level.multiplier() * headroom * headroom;
        self.temperature = (self.temperature + gain).min(MAX_WOK_TEMP);
    }

    fn cool_dry(&mut self) {
        self.temperature = (self.temperature - COOL_RATE).max(AMBIENT_TEMP);
    }

    fn tick_water(&mut self, out: &mut BurnerTick) {
        if self.is_on {
            if self.water_temperature >= BOIL_TEMP {
                self.water_temperature = BOIL_TEMP;
                if !self.is_boiling {
                    self.boil_dwell += 1;
                    if self.boil_dwell >= BOIL_DWELL_TICKS {
                        self.is_boiling = true;
                        out.started_boiling = true;
                    }
                }
            } else {
                self.water_temperature =
                    (self.water_temperature + WATER_HEAT_RATE).min(BOIL_TEMP);
            }
        } else {
            self.water_temperature = (self.water_temperature - WATER_COOL_RATE).max(AMBIENT_TEMP);
            self.reset_boil();
        }
    }

    fn settle_condition(&mut self, out: &mut BurnerTick) {
        match self.condition {
            BurnerCondition::Clean => {
                if !self.has_water && self.temperature >= OVERHEAT_TEMP {
                    self.condition = BurnerCondition::Overheating;
                }
            }
            BurnerCondition::Overheating => {
                if self.temperature >= BURN_TEMP {
                    self.condition = BurnerCondition::Burned;
                    out.burned = true;
                } else if self.temperature < OVERHEAT_TEMP {
                    self.condition = BurnerCondition::Clean;
                }
            }
            BurnerCondition::Wet => {
                if self.temperature >= DRY_TEMP {
                    self.condition = BurnerCondition::Clean;
                }
            }
            // A dirty pan left on the flame still ruins itself.
            BurnerCondition::Dirty => {
                if !self.has_water && self.temperature >= BURN_TEMP {
                    self.condition = BurnerCondition::Burned;
                    out.burned = true;
                }
            }
            BurnerCondition::Burned => {}
        }
    }

    /// Drop one ingredient portion into the pan: water-like liquids flood it,
    /// everything else pulls heat out of whichever medium is on top.
    pub fn feed(&mut self, category: IngredientCategory) {
        if category.is_water_like() && !self.has_water {
            self.add_water();
        } else {
            self.apply_feed_drop(category);
        }
    }

    fn add_water(&mut self) {
        self.has_water = true;
        self.water_temperature = AMBIENT_TEMP;
        // Water quenches the pan down to the boil point at most.
        self.temperature = self.temperature.min(BOIL_TEMP);
        self.reset_boil();
    }

    fn apply_feed_drop(&mut self, category: IngredientCategory) {
        let drop = category.feed_temp_drop();
        if drop == Fixed64::ZERO {
            return;
        }
        if self.has_water {
            self.water_temperature = (self.water_temperature - drop).max(AMBIENT_TEMP);
            if self.water_temperature < BOIL_TEMP {
                self.reset_boil();
            }
        } else {
            self.temperature = (self.temperature - drop).max(AMBIENT_TEMP);
        }
    }

    /// Thermal side effect of a stir-fry toss.
    pub fn stir_effect(&mut self) {
        if !self.has_water {
            self.temperature = (self.temperature - STIR_TEMP_DROP).max(AMBIENT_TEMP);
        }
    }

    /// Clear the slot after a cook leaves, by completion or discard. The pan
    /// keeps its heat but needs a wash before the next assignment.
    pub fn vacate(&mut self) {
        self.occupant = None;
        self.has_water = false;
        self.water_temperature = AMBIENT_TEMP;
        self.reset_boil();
        if self.condition != BurnerCondition::Burned {
            self.condition = BurnerCondition::Dirty;
        }
    }

    /// Reset to a freshly washed pan. Clears water, heat history, and ruin.
    pub fn wash(&mut self) {
        self.condition = BurnerCondition::Wet;
        self.temperature = AMBIENT_TEMP;
        self.has_water = false;
        self.water_temperature = AMBIENT_TEMP;
        self.reset_boil();
    }

    fn reset_boil(&mut self) {
        self.boil_dwell = 0;
        self.is_boiling = false;
    }
}
