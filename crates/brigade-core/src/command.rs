//! The command surface: envelope enum, outcome types, and a bounded
//! execution log.
//!
//! Commands are synchronous and atomic with respect to a tick: the host
//! calls a handler (directly or through [`Kitchen::dispatch`]), the kitchen
//! mutates in place, and the outcome comes back on the same call. There is
//! no pending queue. The log exists for debugging and session review, not
//! for replay.
//!
//! [`Kitchen::dispatch`]: crate::kitchen::Kitchen::dispatch

use crate::catalog::ActionType;
use crate::fixed::Ticks;
use crate::id::*;
use crate::instance::{Location, StationRef};
use crate::kitchen::{MergeReport, ServeReport};
use crate::plating::{DecoRejection, DecoReport, PlateKind};
use crate::validator::{ActionRejection, ActionReport, FeedRejection, FeedReport};
use crate::wok::HeatLevel;

// ---------------------------------------------------------------------------
// Assignment configuration
// ---------------------------------------------------------------------------

/// Player-supplied overrides for a timed-station assignment.
///
/// Both fields fall back to the bundle's declared action parameters when
/// `None`. Under strict enforcement, supplying a value that disagrees with
/// the declared parameters rejects the assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignConfig {
    pub timer: Option<Ticks>,
    pub power: Option<u8>,
}

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single command against the kitchen, as submitted by the host layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Put a new order for the given recipe on the board.
    EnterOrder { recipe: RecipeId },
    /// Create an instance of a bundle on a station slot.
    AssignBundle {
        order: OrderId,
        bundle: BundleId,
        station: StationRef,
        config: AssignConfig,
    },
    /// Feed a measured portion against one requirement of the current step.
    AddIngredient {
        instance: InstanceId,
        requirement: RequirementId,
        amount: u32,
    },
    /// Perform a cooking action on the instance's station.
    ExecuteAction {
        instance: InstanceId,
        action: ActionType,
    },
    /// Take a fully cooked instance off its station.
    CompleteBundle { instance: InstanceId },
    /// Choose a plate and route the instance to its deco area.
    RouteAfterPlate {
        instance: InstanceId,
        plate: PlateKind,
    },
    /// Apply a garnish from stock onto a plated instance.
    ApplyGarnish {
        instance: InstanceId,
        ingredient: IngredientId,
        position: GridPos,
        amount: u32,
    },
    /// Move portions from a setting-area instance onto a plated one.
    MergeBundle {
        source: InstanceId,
        target: InstanceId,
        amount: u32,
    },
    /// Hand the plated instance to its order.
    ServeBundle { instance: InstanceId },
    /// Throw the instance away and free its station.
    DiscardBundle { instance: InstanceId },

    // -- Station-only physical operations --
    LowerBasket { basket: BasketId },
    LiftBasket { basket: BasketId },
    ToggleBurner { burner: BurnerId },
    SetHeatLevel { burner: BurnerId, level: HeatLevel },
    WashStation { burner: BurnerId },
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result payload of an accepted command dispatched through the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutput {
    OrderEntered(OrderId),
    BundleAssigned(InstanceId),
    Feed(FeedReport),
    Action(ActionReport),
    Completed,
    Routed,
    Deco(DecoReport),
    Merge(MergeReport),
    Serve(ServeReport),
    Discarded,
    /// A station-only operation with no report payload.
    Station,
}

/// What a command did: accepted with its report, or refused with a reason.
///
/// A rejection is an expected, recoverable outcome (wrong move, slot busy);
/// it never carries a state change in strict mode. Consistency violations
/// (unknown ids) are a separate hard-error channel and do not appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Accepted(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// The acceptance report, if accepted.
    pub fn accepted(self) -> Option<T> {
        match self {
            Outcome::Accepted(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    /// The refusal reason, if rejected.
    pub fn rejected(&self) -> Option<&Rejection> {
        match self {
            Outcome::Accepted(_) => None,
            Outcome::Rejected(rejection) => Some(rejection),
        }
    }

    /// Map the acceptance payload, passing rejections through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Accepted(value) => Outcome::Accepted(f(value)),
            Outcome::Rejected(rejection) => Outcome::Rejected(rejection),
        }
    }
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error(transparent)]
    Feed(#[from] FeedRejection),
    #[error(transparent)]
    Action(#[from] ActionRejection),
    #[error(transparent)]
    Deco(#[from] DecoRejection),

    #[error("slot {0:?} already holds an instance")]
    SlotOccupied(StationRef),
    #[error("station {0:?} is not ready for an assignment")]
    StationNotReady(StationRef),
    #[error("supplied config disagrees with the declared step parameters")]
    ParamMismatch {
        declared_timer: Option<Ticks>,
        declared_power: Option<u8>,
    },
    #[error("basket {0:?} is submerged; lift it first")]
    BasketSubmerged(BasketId),
    #[error("basket {0:?} burned its load; discard it")]
    LoadBurned(BasketId),
    #[error("the microwave head is mid-run")]
    MicrowaveBusy,
    #[error("cooking is at step {current_step} of {total_steps}")]
    CookingIncomplete {
        current_step: usize,
        total_steps: usize,
    },
    #[error("instance at {location:?} does not take this command")]
    WrongStage { location: Location },
    #[error("source holds {available} portions, {proposed} proposed")]
    InsufficientPortions { available: u32, proposed: u32 },
    #[error("no deco rule of the recipe accepts this source")]
    NoMatchingDecoRule,
}

// ---------------------------------------------------------------------------
// CommandLog
// ---------------------------------------------------------------------------

/// Bounded execution history: (tick, command) pairs in dispatch order.
///
/// A capacity of 0 disables recording entirely.
#[derive(Debug, Default)]
pub struct CommandLog {
    entries: Vec<(Ticks, Command)>,
    max_entries: usize,
}

impl CommandLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Record one dispatched command. Oldest entries are trimmed beyond the
    /// capacity.
    pub fn record(&mut self, tick: Ticks, command: Command) {
        if self.max_entries == 0 {
            return;
        }
        self.entries.push((tick, command));
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[(Ticks, Command)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
