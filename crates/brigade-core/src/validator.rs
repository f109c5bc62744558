//! Step validation: turns a player's feed or action proposal into a ruling.
//!
//! The validator is pure over a resolved view of the current step plus the
//! station's physical readings; the kitchen resolves ids and applies the
//! reported effects. Enforcement mode shapes the rulings: strict refuses
//! mismatched play outright, lenient accepts it, flags a mistake, and lets
//! the physics happen anyway. Physical preconditions gate advancement in
//! both modes. An action can never complete before its station is ready.

use crate::catalog::{ActionType, Catalog, RequirementDef, StepKind};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{BundleId, RequirementId, StepId};
use crate::instance::CookingProgress;
use crate::policy::EnforcementMode;

/// The current step of a bundle, resolved against the catalog.
#[derive(Debug, Clone)]
pub struct ActiveStep<'a> {
    pub id: StepId,
    pub kind: &'a StepKind,
    pub requirements: Vec<(RequirementId, &'a RequirementDef)>,
}

/// Resolve a bundle's step at `step_index`, or None once past the end.
pub fn active_step(catalog: &Catalog, bundle: BundleId, step_index: usize) -> Option<ActiveStep<'_>> {
    let step_id = *catalog.steps_of(bundle)?.get(step_index)?;
    let def = catalog.step(step_id)?;
    let requirements = catalog
        .requirements_of(step_id)
        .unwrap_or(&[])
        .iter()
        .filter_map(|&req_id| Some((req_id, catalog.requirement(req_id)?)))
        .collect();
    Some(ActiveStep {
        id: step_id,
        kind: &def.kind,
        requirements,
    })
}

/// A player's attempt to satisfy one requirement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedProposal {
    pub requirement: RequirementId,
    pub amount: u32,
}

/// What an accepted feed did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedReport {
    /// Requirement marked satisfied, if the proposal matched one.
    pub satisfied: Option<RequirementId>,
    /// Whether the station feels the thermal side effect of the drop.
    pub side_effect: bool,
    pub step_advanced: bool,
    pub bundle_complete: bool,
    /// Accepted under lenient enforcement despite a mismatch.
    pub mistake: bool,
}

/// Why a feed was refused (strict mode only; lenient absorbs these).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FeedRejection {
    #[error("no active requirement matches the proposal")]
    RequirementNotActive,
    #[error("requirement wants exactly {required}, got {proposed}")]
    AmountMismatch { required: u32, proposed: u32 },
}

/// Rule on one feed proposal, mutating `cooking` on acceptance.
pub fn rule_feed(
    active: Option<&ActiveStep<'_>>,
    cooking: &mut CookingProgress,
    proposal: FeedProposal,
    mode: EnforcementMode,
) -> Result<FeedReport, FeedRejection> {
    let step = active.filter(|s| matches!(s.kind, StepKind::Ingredient));
    let matched = step.and_then(|s| {
        s.requirements
            .iter()
            .find(|(id, _)| *id == proposal.requirement && !cooking.satisfied.contains(id))
    });

    let Some(&(req_id, def)) = matched else {
        // Wrong row, already-satisfied row, action step, or finished bundle.
        if mode.is_strict() {
            return Err(FeedRejection::RequirementNotActive);
        }
        // Lenient: the drop goes in the log but never touches the station.
        return Ok(FeedReport {
            satisfied: None,
            side_effect: false,
            step_advanced: false,
            bundle_complete: cooking.is_complete(),
            mistake: true,
        });
    };

    let mut mistake = false;
    if proposal.amount != def.amount {
        if mode.is_strict() {
            return Err(FeedRejection::AmountMismatch {
                required: def.amount,
                proposed: proposal.amount,
            });
        }
        mistake = true;
    }

    cooking.satisfied.push(req_id);

    // All rows of the step satisfied: advance and clear.
    let step_advanced = step.is_some_and(|s| {
        s.requirements
            .iter()
            .all(|(id, _)| cooking.satisfied.contains(id))
    });
    if step_advanced {
        cooking.advance();
    }

    Ok(FeedReport {
        satisfied: Some(req_id),
        side_effect: true,
        step_advanced,
        bundle_complete: cooking.is_complete(),
        mistake,
    })
}

/// Station readings the action rules consult. Fields are None where the
/// instance's station has no such medium.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicalContext {
    pub pan_temperature: Option<Fixed64>,
    pub water_boiling: Option<bool>,
    pub oil_temperature: Option<Fixed64>,
    pub elapsed: Ticks,
    pub timer: Option<Ticks>,
}

/// A physical reason an action cannot complete yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionFailure {
    #[error("pan at {actual} below required {required}")]
    PanTooCold { required: Fixed64, actual: Fixed64 },
    #[error("water is not boiling")]
    WaterNotBoiling,
    #[error("timer has {remaining}s remaining")]
    TimerNotElapsed { remaining: Ticks },
    #[error("station cannot perform this action")]
    WrongStation,
}

/// What an accepted action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionReport {
    pub side_effect: bool,
    pub step_advanced: bool,
    pub bundle_complete: bool,
    pub mistake: bool,
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejection {
    #[error("current step takes ingredients, not an action")]
    NotAnActionStep,
    #[error("step expects {expected:?}")]
    WrongAction { expected: ActionType },
    #[error("station not ready: {0}")]
    Blocked(#[from] PreconditionFailure),
}

/// Rule on one action attempt, mutating `cooking` on advancement.
///
/// Unlike feeds, a physically performed action always lands its side effect
/// in lenient mode, even when it was the wrong move.
pub fn rule_action(
    active: Option<&ActiveStep<'_>>,
    cooking: &mut CookingProgress,
    action: ActionType,
    physical: &PhysicalContext,
    mode: EnforcementMode,
) -> Result<ActionReport, ActionRejection> {
    let lenient_slip = |cooking: &CookingProgress| ActionReport {
        side_effect: true,
        step_advanced: false,
        bundle_complete: cooking.is_complete(),
        mistake: true,
    };

    let Some(step) = active else {
        return if mode.is_strict() {
            Err(ActionRejection::NotAnActionStep)
        } else {
            Ok(lenient_slip(cooking))
        };
    };

    let StepKind::Action { action: expected, params } = step.kind else {
        return if mode.is_strict() {
            Err(ActionRejection::NotAnActionStep)
        } else {
            Ok(lenient_slip(cooking))
        };
    };

    if action != *expected {
        return if mode.is_strict() {
            Err(ActionRejection::WrongAction {
                expected: *expected,
            })
        } else {
            Ok(lenient_slip(cooking))
        };
    }

    if let Err(failure) = check_precondition(action, params.min_temperature, physical) {
        return if mode.is_strict() {
            Err(ActionRejection::Blocked(failure))
        } else {
            // The toss still happened; the step is simply not done.
            Ok(lenient_slip(cooking))
        };
    }

    cooking.advance();
    Ok(ActionReport {
        side_effect: true,
        step_advanced: true,
        bundle_complete: cooking.is_complete(),
        mistake: false,
    })
}

fn check_precondition(
    action: ActionType,
    min_temperature: Option<Fixed64>,
    physical: &PhysicalContext,
) -> Result<(), PreconditionFailure> {
    match action {
        ActionType::StirFry => {
            let Some(actual) = physical.pan_temperature else {
                return Err(PreconditionFailure::WrongStation);
            };
            if let Some(required) = min_temperature
                && actual < required
            {
                return Err(PreconditionFailure::PanTooCold { required, actual });
            }
            Ok(())
        }
        ActionType::Boil => match physical.water_boiling {
            Some(true) => Ok(()),
            Some(false) => Err(PreconditionFailure::WaterNotBoiling),
            None => Err(PreconditionFailure::WrongStation),
        },
        ActionType::DeepFry | ActionType::Microwave => {
            let Some(timer) = physical.timer else {
                return Err(PreconditionFailure::WrongStation);
            };
            if physical.elapsed < timer {
                return Err(PreconditionFailure::TimerNotElapsed {
                    remaining: timer - physical.elapsed,
                });
            }
            Ok(())
        }
    }
}
