//! Plate composition: the 3x3 grid, layer stacking, and the deco rule
//! walk that turns a recipe's plating sequence into accept/reject decisions.
//!
//! The composer is pure over resolved rule views; the kitchen resolves ids
//! and owns the instances, this module owns the rules of arrangement.

use crate::catalog::{DecoRuleDef, DecoSource};
use crate::id::{DecoRuleId, GridPos, InstanceId};
use crate::policy::EnforcementMode;
use serde::{Deserialize, Serialize};

/// Plate shapes a finished bundle can be routed onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlateKind {
    Flat,
    Bowl,
    Platter,
}

/// One deposit on a grid cell. Later layers sit on top of earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoLayer {
    pub source: DecoSource,
    pub amount: u32,
}

/// A plating rule applied so far, with where and how much.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDeco {
    pub rule: DecoRuleId,
    pub position: GridPos,
    pub amount: u32,
}

/// Composition state of one plate. Created when a finished bundle is routed
/// onto a plate, then grown by garnish applications and bundle merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatingState {
    pub plate: PlateKind,
    /// Row-major 3x3 grid; each cell stacks layers in application order.
    pub cells: Vec<Vec<DecoLayer>>,
    pub applied: Vec<AppliedDeco>,
    /// Instances fully absorbed into this plate.
    pub merged_bundles: Vec<InstanceId>,
}

impl PlatingState {
    pub fn new(plate: PlateKind) -> Self {
        Self {
            plate,
            cells: vec![Vec::new(); GridPos::CELLS as usize],
            applied: Vec::new(),
            merged_bundles: Vec::new(),
        }
    }

    /// Total amount applied against one rule across all deposits.
    pub fn applied_amount(&self, rule: DecoRuleId) -> u32 {
        self.applied
            .iter()
            .filter(|a| a.rule == rule)
            .map(|a| a.amount)
            .sum()
    }

    pub fn layers_at(&self, pos: GridPos) -> &[DecoLayer] {
        &self.cells[pos.0 as usize]
    }
}

/// A deco rule resolved against the catalog, ready for the composer.
#[derive(Debug, Clone, Copy)]
pub struct DecoRuleView<'a> {
    pub id: DecoRuleId,
    pub def: &'a DecoRuleDef,
}

/// Whether one rule's demand is fully met by the plate so far.
pub fn rule_satisfied(rule: &DecoRuleView<'_>, plating: &PlatingState) -> bool {
    match rule.def.source {
        // Garnish amounts are exact-or-rejected, so one deposit settles it.
        DecoSource::Garnish(_) => plating.applied.iter().any(|a| a.rule == rule.id),
        DecoSource::Bundle(_) => plating.applied_amount(rule.id) >= rule.def.required_amount,
    }
}

/// Whether the whole plating sequence is satisfied.
pub fn plating_complete(rules: &[DecoRuleView<'_>], plating: &PlatingState) -> bool {
    rules.iter().all(|r| rule_satisfied(r, plating))
}

/// Outcome of a successful deco application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoReport {
    /// This rule's demand is now fully met.
    pub rule_satisfied: bool,
    /// Every rule of the sequence is now met.
    pub plating_complete: bool,
    /// Accepted out of order under lenient enforcement.
    pub mistake: bool,
}

/// Why a deco application was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecoRejection {
    #[error("rule already satisfied")]
    AlreadyComplete,
    #[error("rule requires grid position {expected:?}")]
    WrongPosition { expected: GridPos },
    #[error("earlier rule {unmet:?} is not satisfied yet")]
    OutOfOrder { unmet: DecoRuleId },
    #[error("rule requires exactly {required}, got {proposed}")]
    AmountMismatch { required: u32, proposed: u32 },
    #[error("merge of {proposed} exceeds the {remaining} still required")]
    ExceedsRemainder { remaining: u32, proposed: u32 },
    #[error("rule source does not match the applied item")]
    SourceKindMismatch,
}

/// Validate and apply one deposit against rule `rules[rule_idx]`.
///
/// Checks run in a fixed order: completion, position, ordering, quantity.
/// Ordering violations are forgiven (with a mistake flag) under lenient
/// enforcement; every other refusal holds in both modes.
pub fn apply_deco(
    rules: &[DecoRuleView<'_>],
    rule_idx: usize,
    plating: &mut PlatingState,
    position: GridPos,
    amount: u32,
    mode: EnforcementMode,
) -> Result<DecoReport, DecoRejection> {
    let rule = &rules[rule_idx];
    if rule_satisfied(rule, plating) {
        return Err(DecoRejection::AlreadyComplete);
    }
    if let Some(expected) = rule.def.position
        && expected != position
    {
        return Err(DecoRejection::WrongPosition { expected });
    }

    let mut mistake = false;
    if let Some(unmet) = rules[..rule_idx]
        .iter()
        .find(|prior| !rule_satisfied(prior, plating))
    {
        if mode.is_strict() {
            return Err(DecoRejection::OutOfOrder { unmet: unmet.id });
        }
        mistake = true;
    }

    match rule.def.source {
        DecoSource::Garnish(_) => {
            if amount != rule.def.required_amount {
                return Err(DecoRejection::AmountMismatch {
                    required: rule.def.required_amount,
                    proposed: amount,
                });
            }
        }
        DecoSource::Bundle(_) => {
            let remaining = rule.def.required_amount - plating.applied_amount(rule.id);
            if amount > remaining {
                return Err(DecoRejection::ExceedsRemainder {
                    remaining,
                    proposed: amount,
                });
            }
        }
    }

    plating.applied.push(AppliedDeco {
        rule: rule.id,
        position,
        amount,
    });
    plating.cells[position.0 as usize].push(DecoLayer {
        source: rule.def.source,
        amount,
    });

    Ok(DecoReport {
        rule_satisfied: rule_satisfied(rule, plating),
        plating_complete: plating_complete(rules, plating),
        mistake,
    })
}
