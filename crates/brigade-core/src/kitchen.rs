//! The kitchen engine: owns the catalog, stations, instances, and orders,
//! and orchestrates the tick pipeline.
//!
//! # Architecture
//!
//! The `Kitchen` owns:
//! - An immutable [`Catalog`] (recipes, bundles, steps, requirements, deco rules)
//! - A bank of wok [`Burner`]s and fryer [`FryerBasket`]s, plus one [`MicrowaveQueue`]
//! - The live [`BundleInstance`] set and the [`MenuOrder`] board
//! - An [`EventBus`] for typed kitchen events
//! - A [`CommandLog`] of dispatched commands
//!
//! # Tick pipeline
//!
//! Each `tick()` runs, in fixed order:
//! 1. **Order sweep** -- departure timers fire; hard-timeout orders are
//!    force-expired and their live instances destroyed.
//! 2. **Station physics** -- every burner's thermal step; a burn destroys
//!    the occupying instance.
//! 3. **Cooking timers** -- per-instance accrual (fryer gated on submersion,
//!    microwave gated on being the queue head), deep-fry auto-advance, and
//!    the fryer burn check against the grace margin.
//! 4. **Event delivery** -- buffered events go out to passive listeners.
//! 5. **Bookkeeping** -- the tick counter advances.
//!
//! Commands are synchronous and atomic with respect to a tick; there is one
//! logical thread of control and no locking.

use crate::catalog::{ActionType, Catalog, DecoSource, StepKind};
use crate::command::{AssignConfig, Command, CommandLog, CommandOutput, Outcome, Rejection};
use crate::event::{DiscardReason, EventBus, EventKind, KitchenEvent, PassiveListener};
use crate::fixed::Ticks;
use crate::fryer::{BasketStatus, FryerBasket, BURN_GRACE_TICKS, OIL_TEMP};
use crate::id::*;
use crate::instance::{BundleInstance, IngredientPortion, Location, StationRef};
use crate::microwave::MicrowaveQueue;
use crate::order::{DepartureTimer, MenuOrder, OrderStatus};
use crate::plating::{
    apply_deco, plating_complete, rule_satisfied, DecoReport, DecoRuleView, PlateKind,
    PlatingState,
};
use crate::policy::EnforcementMode;
use crate::query::{
    BasketSnapshot, BurnerSnapshot, InstanceSnapshot, MicrowaveSnapshot, Occupancy, OrderSnapshot,
};
use crate::validator::{
    active_step, rule_action, rule_feed, ActionReport, FeedProposal, FeedReport, PhysicalContext,
};
use crate::wok::{Burner, HeatLevel};
use slotmap::SlotMap;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Session-level kitchen configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Validation policy for the whole session.
    pub mode: EnforcementMode,
    /// Number of wok burners.
    pub burner_count: usize,
    /// Number of fryer baskets.
    pub basket_count: usize,
    /// Ticks before a non-completed order is force-expired.
    pub order_timeout: Ticks,
    /// Ticks a completed order lingers on the board before departing.
    pub order_linger: Ticks,
    /// Ring-buffer capacity per event kind.
    pub event_capacity: usize,
    /// Command log capacity. 0 disables recording.
    pub command_log_capacity: usize,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::Strict,
            burner_count: 4,
            basket_count: 2,
            order_timeout: 600,
            order_linger: 30,
            event_capacity: 64,
            command_log_capacity: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Consistency violations: a referenced id is absent from the catalog or the
/// live sets. These are data or programmer errors and fail loudly, unlike
/// [`Rejection`]s, which are expected player outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KitchenError {
    #[error("instance {0:?} is not in the kitchen")]
    UnknownInstance(InstanceId),
    #[error("order {0:?} is not on the board")]
    UnknownOrder(OrderId),
    #[error("recipe {0:?} is not in the catalog")]
    UnknownRecipe(RecipeId),
    #[error("bundle {0:?} is not in the catalog")]
    UnknownBundle(BundleId),
    #[error("ingredient {0:?} is not in the catalog")]
    UnknownIngredient(IngredientId),
    #[error("requirement {0:?} is not in the catalog")]
    UnknownRequirement(RequirementId),
    #[error("burner {0:?} does not exist")]
    UnknownBurner(BurnerId),
    #[error("basket {0:?} does not exist")]
    UnknownBasket(BasketId),
    #[error("bundle {bundle:?} does not belong to recipe {recipe:?}")]
    BundleNotInRecipe { bundle: BundleId, recipe: RecipeId },
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What an accepted merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// The underlying deco ruling.
    pub deco: DecoReport,
    /// Portions moved from the source.
    pub drawn: u32,
    /// The source gave up its last portion and moved to `Merged`.
    pub source_exhausted: bool,
}

/// What an accepted serve did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeReport {
    pub order: OrderId,
    /// Whether the plate met every deco rule the bundle demanded.
    /// Reported, never blocking.
    pub deco_complete: bool,
}

// ---------------------------------------------------------------------------
// Kitchen
// ---------------------------------------------------------------------------

/// The simulation core. All commands mutate in place and return
/// synchronously; the host drives time through [`Kitchen::tick`] at 1 Hz.
#[derive(Debug)]
pub struct Kitchen {
    catalog: Catalog,
    config: KitchenConfig,
    /// Completed ticks since the session opened.
    clock: Ticks,

    burners: Vec<Burner>,
    baskets: Vec<FryerBasket>,
    microwave: MicrowaveQueue,

    instances: SlotMap<InstanceId, BundleInstance>,
    orders: SlotMap<OrderId, MenuOrder>,
    /// Pending departure timers for completed orders.
    departures: Vec<DepartureTimer>,

    /// Typed event bus for kitchen events.
    pub event_bus: EventBus,
    command_log: CommandLog,
    served_count: u64,
}

impl Kitchen {
    pub fn new(catalog: Catalog, config: KitchenConfig) -> Self {
        info!(
            recipes = catalog.recipe_count(),
            bundles = catalog.bundle_count(),
            burners = config.burner_count,
            baskets = config.basket_count,
            mode = ?config.mode,
            "kitchen opened"
        );
        Self {
            burners: (0..config.burner_count).map(|_| Burner::new()).collect(),
            baskets: (0..config.basket_count)
                .map(|_| FryerBasket::new())
                .collect(),
            microwave: MicrowaveQueue::new(),
            instances: SlotMap::with_key(),
            orders: SlotMap::with_key(),
            departures: Vec::new(),
            event_bus: EventBus::new(config.event_capacity),
            command_log: CommandLog::new(config.command_log_capacity),
            served_count: 0,
            catalog,
            config,
            clock: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn clock(&self) -> Ticks {
        self.clock
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    pub fn mode(&self) -> EnforcementMode {
        self.config.mode
    }

    pub fn served_count(&self) -> u64 {
        self.served_count
    }

    pub fn instance(&self, id: InstanceId) -> Option<&BundleInstance> {
        self.instances.get(id)
    }

    pub fn order(&self, id: OrderId) -> Option<&MenuOrder> {
        self.orders.get(id)
    }

    pub fn burner(&self, id: BurnerId) -> Option<&Burner> {
        self.burners.get(id.0 as usize)
    }

    pub fn basket(&self, id: BasketId) -> Option<&FryerBasket> {
        self.baskets.get(id.0 as usize)
    }

    pub fn microwave(&self) -> &MicrowaveQueue {
        &self.microwave
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.command_log
    }

    /// Suppress an event kind on the bus.
    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    /// Register a passive event listener.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Outcome plumbing
    // -----------------------------------------------------------------------

    /// Accept a command: deliver buffered events, then hand back the report.
    fn finish<T>(&mut self, value: T) -> Result<Outcome<T>, KitchenError> {
        self.event_bus.deliver();
        Ok(Outcome::Accepted(value))
    }

    /// Refuse a command. Lenient slips are not refusals; anything that lands
    /// here left no state change behind.
    fn refuse<T>(&mut self, rejection: Rejection) -> Result<Outcome<T>, KitchenError> {
        debug!(%rejection, "command refused");
        self.event_bus.deliver();
        Ok(Outcome::Rejected(rejection))
    }

    fn burner_entry_mut(&mut self, id: BurnerId) -> Result<&mut Burner, KitchenError> {
        self.burners
            .get_mut(id.0 as usize)
            .ok_or(KitchenError::UnknownBurner(id))
    }

    fn basket_entry_mut(&mut self, id: BasketId) -> Result<&mut FryerBasket, KitchenError> {
        self.baskets
            .get_mut(id.0 as usize)
            .ok_or(KitchenError::UnknownBasket(id))
    }

    /// Deco rules of a recipe as ordered views into the catalog.
    fn deco_views(&self, recipe: RecipeId) -> Vec<DecoRuleView<'_>> {
        self.catalog
            .deco_rules_of(recipe)
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| {
                self.catalog
                    .deco_rule(*id)
                    .map(|def| DecoRuleView { id: *id, def })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Commands: order board
    // -----------------------------------------------------------------------

    /// Put a new order for `recipe` on the board, status `Waiting`.
    pub fn enter_order(&mut self, recipe: RecipeId) -> Result<Outcome<OrderId>, KitchenError> {
        let Some(def) = self.catalog.recipe(recipe) else {
            return Err(KitchenError::UnknownRecipe(recipe));
        };
        let menu_name = def.menu_name.clone();
        let now = self.clock;
        let order = self.orders.insert(MenuOrder::new(recipe, menu_name, now));
        self.event_bus.emit(KitchenEvent::OrderEntered {
            order,
            recipe,
            tick: now,
        });
        self.finish(order)
    }

    // -----------------------------------------------------------------------
    // Commands: bundle lifecycle
    // -----------------------------------------------------------------------

    /// Create an instance of `bundle` for `order` on a station slot.
    ///
    /// Station readiness is checked here (clean unoccupied burner, empty
    /// basket; the microwave queue takes any depth). For timed stations the
    /// supplied config is reconciled with the bundle's declared action
    /// parameters: strict mode rejects a disagreement, lenient mode takes
    /// the supplied values as given.
    pub fn assign_bundle(
        &mut self,
        order: OrderId,
        bundle: BundleId,
        station: StationRef,
        config: AssignConfig,
    ) -> Result<Outcome<InstanceId>, KitchenError> {
        let Some(menu_order) = self.orders.get(order) else {
            return Err(KitchenError::UnknownOrder(order));
        };
        let recipe = menu_order.recipe;
        let Some(bundle_def) = self.catalog.bundle(bundle) else {
            return Err(KitchenError::UnknownBundle(bundle));
        };
        if bundle_def.recipe != recipe {
            return Err(KitchenError::BundleNotInRecipe { bundle, recipe });
        }
        let portion_yield = bundle_def.portion_yield;
        let total_steps = self.catalog.steps_of(bundle).map_or(0, |steps| steps.len());

        match station {
            StationRef::Wok(burner) => {
                let Some(b) = self.burners.get(burner.0 as usize) else {
                    return Err(KitchenError::UnknownBurner(burner));
                };
                if b.occupant.is_some() {
                    return self.refuse(Rejection::SlotOccupied(station));
                }
                if !b.ready_for_assign() {
                    return self.refuse(Rejection::StationNotReady(station));
                }
            }
            StationRef::Fryer(basket) => {
                let Some(b) = self.baskets.get(basket.0 as usize) else {
                    return Err(KitchenError::UnknownBasket(basket));
                };
                if b.occupant.is_some() {
                    return self.refuse(Rejection::SlotOccupied(station));
                }
                if !b.ready_for_assign() {
                    return self.refuse(Rejection::StationNotReady(station));
                }
            }
            StationRef::Microwave => {}
        }

        let declared = self.catalog.timed_action(bundle);
        let declared_timer = declared.and_then(|(_, p)| p.required_duration);
        let declared_power = declared.and_then(|(_, p)| p.power);
        let timed = matches!(station, StationRef::Fryer(_) | StationRef::Microwave);
        if timed && self.config.mode.is_strict() {
            let timer_clash =
                matches!((config.timer, declared_timer), (Some(t), Some(d)) if t != d);
            let power_clash =
                matches!((config.power, declared_power), (Some(p), Some(d)) if p != d);
            if timer_clash || power_clash {
                return self.refuse(Rejection::ParamMismatch {
                    declared_timer,
                    declared_power,
                });
            }
        }

        let location = match station {
            StationRef::Wok(burner) => Location::Wok { burner },
            StationRef::Fryer(basket) => Location::Fryer { basket },
            StationRef::Microwave => Location::Microwave,
        };
        let now = self.clock;
        let mut instance =
            BundleInstance::new(order, bundle, location, total_steps, now, portion_yield);
        if timed {
            instance.cooking.timer = config.timer.or(declared_timer);
            instance.cooking.power = config.power.or(declared_power);
        }
        let id = self.instances.insert(instance);

        match station {
            StationRef::Wok(burner) => self.burners[burner.0 as usize].occupant = Some(id),
            StationRef::Fryer(basket) => self.baskets[basket.0 as usize].assign(id),
            StationRef::Microwave => self.microwave.enqueue(id),
        }

        if let Some(menu_order) = self.orders.get_mut(order)
            && menu_order.status == OrderStatus::Waiting
        {
            menu_order.status = OrderStatus::Cooking;
            self.event_bus
                .emit(KitchenEvent::OrderStarted { order, tick: now });
        }
        self.event_bus.emit(KitchenEvent::BundleAssigned {
            instance: id,
            order,
            bundle,
            station,
            tick: now,
        });
        self.finish(id)
    }

    /// Feed a measured portion against one requirement of the instance's
    /// current step.
    ///
    /// Physical refusals (submerged basket, running microwave head) hold in
    /// both enforcement modes. The validator rules on the rest; an accepted
    /// or leniently absorbed feed is logged on the instance's ticket, and a
    /// matched feed lands its station side effect (wok temperature drop
    /// keyed by the ingredient's category).
    pub fn add_ingredient(
        &mut self,
        instance: InstanceId,
        requirement: RequirementId,
        amount: u32,
    ) -> Result<Outcome<FeedReport>, KitchenError> {
        let mode = self.config.mode;
        let Some(req_def) = self.catalog.requirement(requirement) else {
            return Err(KitchenError::UnknownRequirement(requirement));
        };
        let ingredient = req_def.ingredient;
        let display_name = req_def.display_name.clone();
        let unit = req_def.unit;
        let Some(ing_def) = self.catalog.ingredient(ingredient) else {
            return Err(KitchenError::UnknownIngredient(ingredient));
        };
        let category = ing_def.category;

        let Some(inst) = self.instances.get_mut(instance) else {
            return Err(KitchenError::UnknownInstance(instance));
        };
        let location = inst.location;
        if !location.is_cooking() {
            return self.refuse(Rejection::WrongStage { location });
        }
        match location {
            Location::Fryer { basket } => {
                if self
                    .baskets
                    .get(basket.0 as usize)
                    .is_some_and(|b| b.submerged)
                {
                    return self.refuse(Rejection::BasketSubmerged(basket));
                }
            }
            Location::Microwave => {
                // Mid-run head: the door stays shut until the timer is done.
                if self.microwave.head() == Some(instance)
                    && inst.cooking.elapsed > 0
                    && !inst.cooking.timer_elapsed()
                {
                    return self.refuse(Rejection::MicrowaveBusy);
                }
            }
            _ => {}
        }

        let active = active_step(&self.catalog, inst.bundle, inst.cooking.current_step);
        let ruling = rule_feed(
            active.as_ref(),
            &mut inst.cooking,
            FeedProposal {
                requirement,
                amount,
            },
            mode,
        );
        let report = match ruling {
            Ok(report) => report,
            Err(rejection) => return self.refuse(rejection.into()),
        };

        // Everything that physically left the player's hand goes on the ticket.
        inst.portions.push(IngredientPortion {
            ingredient,
            display_name,
            amount,
            unit,
        });
        if report.mistake {
            inst.errors += 1;
        }
        let errors = inst.errors;
        let step_index = inst.cooking.current_step;

        if report.side_effect
            && let Location::Wok { burner } = location
            && let Some(b) = self.burners.get_mut(burner.0 as usize)
        {
            b.feed(category);
        }

        let tick = self.clock;
        self.event_bus.emit(KitchenEvent::IngredientAdded {
            instance,
            requirement,
            amount,
            satisfied: report.satisfied.is_some(),
            tick,
        });
        if report.mistake {
            self.event_bus.emit(KitchenEvent::MistakeRecorded {
                instance,
                total: errors,
                tick,
            });
        }
        if report.step_advanced {
            self.event_bus.emit(KitchenEvent::StepAdvanced {
                instance,
                step_index,
                tick,
            });
            if report.bundle_complete {
                self.event_bus
                    .emit(KitchenEvent::BundleCompleted { instance, tick });
            }
        }
        self.finish(report)
    }

    /// Perform a cooking action on the instance's station.
    ///
    /// The station supplies the physical readings; the validator rules. A
    /// physically performed action always lands its station side effect,
    /// even when it was the wrong move under lenient enforcement.
    pub fn execute_action(
        &mut self,
        instance: InstanceId,
        action: ActionType,
    ) -> Result<Outcome<ActionReport>, KitchenError> {
        let mode = self.config.mode;
        let Some(inst) = self.instances.get_mut(instance) else {
            return Err(KitchenError::UnknownInstance(instance));
        };
        let location = inst.location;
        let physical = match location {
            Location::Wok { burner } => {
                let Some(b) = self.burners.get(burner.0 as usize) else {
                    return Err(KitchenError::UnknownBurner(burner));
                };
                PhysicalContext {
                    pan_temperature: Some(b.temperature),
                    water_boiling: Some(b.is_boiling),
                    oil_temperature: None,
                    elapsed: inst.cooking.elapsed,
                    timer: inst.cooking.timer,
                }
            }
            Location::Fryer { .. } => PhysicalContext {
                oil_temperature: Some(OIL_TEMP),
                elapsed: inst.cooking.elapsed,
                timer: inst.cooking.timer,
                ..Default::default()
            },
            Location::Microwave => PhysicalContext {
                elapsed: inst.cooking.elapsed,
                timer: inst.cooking.timer,
                ..Default::default()
            },
            _ => return self.refuse(Rejection::WrongStage { location }),
        };

        let active = active_step(&self.catalog, inst.bundle, inst.cooking.current_step);
        let ruling = rule_action(active.as_ref(), &mut inst.cooking, action, &physical, mode);
        let report = match ruling {
            Ok(report) => report,
            Err(rejection) => return self.refuse(rejection.into()),
        };
        if report.mistake {
            inst.errors += 1;
        }
        let errors = inst.errors;
        let step_index = inst.cooking.current_step;

        // A stir-fry toss sheds pan heat whether or not it was the right move.
        if report.side_effect
            && action == ActionType::StirFry
            && let Location::Wok { burner } = location
            && let Some(b) = self.burners.get_mut(burner.0 as usize)
        {
            b.stir_effect();
        }

        let tick = self.clock;
        if report.side_effect {
            self.event_bus.emit(KitchenEvent::ActionPerformed {
                instance,
                action,
                auto: false,
                tick,
            });
        }
        if report.mistake {
            self.event_bus.emit(KitchenEvent::MistakeRecorded {
                instance,
                total: errors,
                tick,
            });
        }
        if report.step_advanced {
            self.event_bus.emit(KitchenEvent::StepAdvanced {
                instance,
                step_index,
                tick,
            });
            if report.bundle_complete {
                self.event_bus
                    .emit(KitchenEvent::BundleCompleted { instance, tick });
            }
        }
        self.finish(report)
    }

    /// Take a fully cooked instance off its station. The wok burner is left
    /// dirty, a fryer basket empties, the microwave head dequeues.
    pub fn complete_bundle(&mut self, instance: InstanceId) -> Result<Outcome<()>, KitchenError> {
        let Some(inst) = self.instances.get_mut(instance) else {
            return Err(KitchenError::UnknownInstance(instance));
        };
        let location = inst.location;
        if !location.is_cooking() {
            return self.refuse(Rejection::WrongStage { location });
        }
        // A load that outlived its grace margin only leaves via discard.
        if let Location::Fryer { basket } = location
            && self
                .baskets
                .get(basket.0 as usize)
                .is_some_and(|b| b.status == BasketStatus::Burned)
        {
            return self.refuse(Rejection::LoadBurned(basket));
        }
        if !inst.cooking.is_complete() {
            let current_step = inst.cooking.current_step;
            let total_steps = inst.cooking.total_steps;
            return self.refuse(Rejection::CookingIncomplete {
                current_step,
                total_steps,
            });
        }
        inst.location = Location::PlateSelect;
        match location {
            Location::Wok { burner } => self.burners[burner.0 as usize].vacate(),
            Location::Fryer { basket } => self.baskets[basket.0 as usize].release(),
            Location::Microwave => {
                self.microwave.remove(instance);
            }
            _ => {}
        }
        self.finish(())
    }

    /// Choose a plate. Main dishes open a plating grid and move to the deco
    /// area; side dishes move to the setting area to await merging.
    pub fn route_after_plate(
        &mut self,
        instance: InstanceId,
        plate: PlateKind,
    ) -> Result<Outcome<()>, KitchenError> {
        let Some(inst) = self.instances.get_mut(instance) else {
            return Err(KitchenError::UnknownInstance(instance));
        };
        let location = inst.location;
        if location != Location::PlateSelect {
            return self.refuse(Rejection::WrongStage { location });
        }
        let Some(bundle_def) = self.catalog.bundle(inst.bundle) else {
            return Err(KitchenError::UnknownBundle(inst.bundle));
        };
        if bundle_def.is_main_dish {
            inst.plating = Some(PlatingState::new(plate));
            inst.location = Location::DecoMain;
        } else {
            inst.location = Location::DecoSetting;
        }
        let tick = self.clock;
        self.event_bus.emit(KitchenEvent::BundlePlated {
            instance,
            plate,
            tick,
        });
        self.finish(())
    }

    /// Apply a garnish from stock onto a plated instance. The garnish is
    /// matched to the first unmet deco rule that consumes it.
    pub fn apply_garnish(
        &mut self,
        instance: InstanceId,
        ingredient: IngredientId,
        position: GridPos,
        amount: u32,
    ) -> Result<Outcome<DecoReport>, KitchenError> {
        if self.catalog.ingredient(ingredient).is_none() {
            return Err(KitchenError::UnknownIngredient(ingredient));
        }
        let mode = self.config.mode;
        let Some(inst) = self.instances.get_mut(instance) else {
            return Err(KitchenError::UnknownInstance(instance));
        };
        let location = inst.location;
        let Some(bundle_def) = self.catalog.bundle(inst.bundle) else {
            return Err(KitchenError::UnknownBundle(inst.bundle));
        };
        let recipe = bundle_def.recipe;
        if location != Location::DecoMain {
            return self.refuse(Rejection::WrongStage { location });
        }
        let Some(plating) = inst.plating.as_mut() else {
            return self.refuse(Rejection::WrongStage { location });
        };

        let views: Vec<DecoRuleView<'_>> = self
            .catalog
            .deco_rules_of(recipe)
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| {
                self.catalog
                    .deco_rule(*id)
                    .map(|def| DecoRuleView { id: *id, def })
            })
            .collect();
        let Some(rule_idx) = views.iter().position(|v| {
            matches!(v.def.source, DecoSource::Garnish(g) if g == ingredient)
                && !rule_satisfied(v, plating)
        }) else {
            return self.refuse(Rejection::NoMatchingDecoRule);
        };

        let report = match apply_deco(&views, rule_idx, plating, position, amount, mode) {
            Ok(report) => report,
            Err(rejection) => return self.refuse(rejection.into()),
        };
        let rule = views[rule_idx].id;
        if report.mistake {
            inst.errors += 1;
        }
        let errors = inst.errors;

        let tick = self.clock;
        self.event_bus.emit(KitchenEvent::DecoApplied {
            instance,
            rule,
            position,
            amount,
            tick,
        });
        if report.mistake {
            self.event_bus.emit(KitchenEvent::MistakeRecorded {
                instance,
                total: errors,
                tick,
            });
        }
        self.finish(report)
    }

    /// Move portions from a setting-area instance onto a plated one.
    ///
    /// The source must sit in the setting area with enough portions left;
    /// the target's recipe must carry an unmet deco rule consuming the
    /// source's bundle. Partial merges draw the source down; the last
    /// portion relocates it to `Merged`.
    pub fn merge_bundle(
        &mut self,
        source: InstanceId,
        target: InstanceId,
        amount: u32,
    ) -> Result<Outcome<MergeReport>, KitchenError> {
        let mode = self.config.mode;
        let Some(src) = self.instances.get(source) else {
            return Err(KitchenError::UnknownInstance(source));
        };
        let src_location = src.location;
        let src_bundle = src.bundle;
        let available = src.available_amount;
        let Some(tgt) = self.instances.get(target) else {
            return Err(KitchenError::UnknownInstance(target));
        };
        let tgt_location = tgt.location;
        let tgt_bundle = tgt.bundle;

        if src_location != Location::DecoSetting {
            return self.refuse(Rejection::WrongStage {
                location: src_location,
            });
        }
        if tgt_location != Location::DecoMain {
            return self.refuse(Rejection::WrongStage {
                location: tgt_location,
            });
        }
        if amount == 0 || amount > available {
            return self.refuse(Rejection::InsufficientPortions {
                available,
                proposed: amount,
            });
        }

        let Some(tgt_def) = self.catalog.bundle(tgt_bundle) else {
            return Err(KitchenError::UnknownBundle(tgt_bundle));
        };
        let recipe = tgt_def.recipe;
        let views: Vec<DecoRuleView<'_>> = self
            .catalog
            .deco_rules_of(recipe)
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| {
                self.catalog
                    .deco_rule(*id)
                    .map(|def| DecoRuleView { id: *id, def })
            })
            .collect();

        let Some(tgt) = self.instances.get_mut(target) else {
            return Err(KitchenError::UnknownInstance(target));
        };
        let Some(plating) = tgt.plating.as_mut() else {
            return self.refuse(Rejection::WrongStage {
                location: tgt_location,
            });
        };
        let Some(rule_idx) = views.iter().position(|v| {
            matches!(v.def.source, DecoSource::Bundle(b) if b == src_bundle)
                && !rule_satisfied(v, plating)
        }) else {
            return self.refuse(Rejection::NoMatchingDecoRule);
        };

        // Merged food lands on the rule's declared cell, or the plate center.
        let position = views[rule_idx].def.position.unwrap_or(GridPos(4));
        let report = match apply_deco(&views, rule_idx, plating, position, amount, mode) {
            Ok(report) => report,
            Err(rejection) => return self.refuse(rejection.into()),
        };
        if !plating.merged_bundles.contains(&source) {
            plating.merged_bundles.push(source);
        }
        let rule = views[rule_idx].id;
        if report.mistake {
            tgt.errors += 1;
        }
        let errors = tgt.errors;

        // Draw the moved portions down on the source side.
        let source_exhausted = {
            let Some(src) = self.instances.get_mut(source) else {
                return Err(KitchenError::UnknownInstance(source));
            };
            src.available_amount -= amount;
            if src.available_amount == 0 {
                src.location = Location::Merged { target };
                true
            } else {
                false
            }
        };

        let tick = self.clock;
        self.event_bus.emit(KitchenEvent::DecoApplied {
            instance: target,
            rule,
            position,
            amount,
            tick,
        });
        self.event_bus.emit(KitchenEvent::BundleMerged {
            source,
            target,
            amount,
            exhausted: source_exhausted,
            tick,
        });
        if report.mistake {
            self.event_bus.emit(KitchenEvent::MistakeRecorded {
                instance: target,
                total: errors,
                tick,
            });
        }
        self.finish(MergeReport {
            deco: report,
            drawn: amount,
            source_exhausted,
        })
    }

    /// Hand the plated instance to its order. Deco completeness is reported,
    /// never blocking. Completes the order and schedules its departure.
    pub fn serve_bundle(
        &mut self,
        instance: InstanceId,
    ) -> Result<Outcome<ServeReport>, KitchenError> {
        let Some(inst) = self.instances.get(instance) else {
            return Err(KitchenError::UnknownInstance(instance));
        };
        let location = inst.location;
        if location != Location::DecoMain {
            return self.refuse(Rejection::WrongStage { location });
        }
        let order = inst.order;
        let bundle = inst.bundle;
        let Some(bundle_def) = self.catalog.bundle(bundle) else {
            return Err(KitchenError::UnknownBundle(bundle));
        };
        let recipe = bundle_def.recipe;
        let deco_required = bundle_def.deco_required;

        let plate_complete = match inst.plating.as_ref() {
            Some(plating) => {
                let views = self.deco_views(recipe);
                plating_complete(&views, plating)
            }
            None => true,
        };
        let deco_complete = !deco_required || plate_complete;

        if !self.orders.contains_key(order) {
            return Err(KitchenError::UnknownOrder(order));
        }

        let tick = self.clock;
        if let Some(inst) = self.instances.get_mut(instance) {
            inst.location = Location::Served;
        }
        self.served_count += 1;

        let linger = self.config.order_linger;
        if let Some(menu_order) = self.orders.get_mut(order)
            && menu_order.status != OrderStatus::Completed
        {
            menu_order.status = OrderStatus::Completed;
            self.departures.push(DepartureTimer {
                order,
                due: tick + linger,
            });
            self.event_bus
                .emit(KitchenEvent::OrderCompleted { order, tick });
        }
        self.event_bus.emit(KitchenEvent::BundleServed {
            instance,
            order,
            deco_complete,
            tick,
        });
        self.finish(ServeReport {
            order,
            deco_complete,
        })
    }

    /// Throw the instance away, unconditionally. Frees its station and, when
    /// this was the order's last live instance, puts the order back to
    /// `Waiting`.
    pub fn discard_bundle(&mut self, instance: InstanceId) -> Result<Outcome<()>, KitchenError> {
        if !self.instances.contains_key(instance) {
            return Err(KitchenError::UnknownInstance(instance));
        }
        self.remove_instance(instance, Some(DiscardReason::Manual));
        self.finish(())
    }

    // -----------------------------------------------------------------------
    // Commands: station-only physical operations
    // -----------------------------------------------------------------------

    pub fn lower_basket(&mut self, basket: BasketId) -> Result<Outcome<()>, KitchenError> {
        let now = self.clock;
        let b = self.basket_entry_mut(basket)?;
        b.lower(now);
        self.finish(())
    }

    pub fn lift_basket(&mut self, basket: BasketId) -> Result<Outcome<()>, KitchenError> {
        let b = self.basket_entry_mut(basket)?;
        b.lift();
        self.finish(())
    }

    pub fn toggle_burner(&mut self, burner: BurnerId) -> Result<Outcome<()>, KitchenError> {
        let b = self.burner_entry_mut(burner)?;
        b.is_on = !b.is_on;
        self.finish(())
    }

    pub fn set_heat_level(
        &mut self,
        burner: BurnerId,
        level: HeatLevel,
    ) -> Result<Outcome<()>, KitchenError> {
        let b = self.burner_entry_mut(burner)?;
        b.heat_level = level;
        self.finish(())
    }

    /// Wash a burner's pan. Refused while an instance occupies it.
    pub fn wash_station(&mut self, burner: BurnerId) -> Result<Outcome<()>, KitchenError> {
        let b = self.burner_entry_mut(burner)?;
        if b.occupant.is_some() {
            return self.refuse(Rejection::SlotOccupied(StationRef::Wok(burner)));
        }
        b.wash();
        self.finish(())
    }

    // -----------------------------------------------------------------------
    // Command envelope
    // -----------------------------------------------------------------------

    /// Dispatch a [`Command`] envelope, recording it in the command log.
    pub fn dispatch(&mut self, command: Command) -> Result<Outcome<CommandOutput>, KitchenError> {
        self.command_log.record(self.clock, command.clone());
        match command {
            Command::EnterOrder { recipe } => Ok(self
                .enter_order(recipe)?
                .map(CommandOutput::OrderEntered)),
            Command::AssignBundle {
                order,
                bundle,
                station,
                config,
            } => Ok(self
                .assign_bundle(order, bundle, station, config)?
                .map(CommandOutput::BundleAssigned)),
            Command::AddIngredient {
                instance,
                requirement,
                amount,
            } => Ok(self
                .add_ingredient(instance, requirement, amount)?
                .map(CommandOutput::Feed)),
            Command::ExecuteAction { instance, action } => Ok(self
                .execute_action(instance, action)?
                .map(CommandOutput::Action)),
            Command::CompleteBundle { instance } => Ok(self
                .complete_bundle(instance)?
                .map(|_| CommandOutput::Completed)),
            Command::RouteAfterPlate { instance, plate } => Ok(self
                .route_after_plate(instance, plate)?
                .map(|_| CommandOutput::Routed)),
            Command::ApplyGarnish {
                instance,
                ingredient,
                position,
                amount,
            } => Ok(self
                .apply_garnish(instance, ingredient, position, amount)?
                .map(CommandOutput::Deco)),
            Command::MergeBundle {
                source,
                target,
                amount,
            } => Ok(self
                .merge_bundle(source, target, amount)?
                .map(CommandOutput::Merge)),
            Command::ServeBundle { instance } => {
                Ok(self.serve_bundle(instance)?.map(CommandOutput::Serve))
            }
            Command::DiscardBundle { instance } => Ok(self
                .discard_bundle(instance)?
                .map(|_| CommandOutput::Discarded)),
            Command::LowerBasket { basket } => Ok(self
                .lower_basket(basket)?
                .map(|_| CommandOutput::Station)),
            Command::LiftBasket { basket } => {
                Ok(self.lift_basket(basket)?.map(|_| CommandOutput::Station))
            }
            Command::ToggleBurner { burner } => Ok(self
                .toggle_burner(burner)?
                .map(|_| CommandOutput::Station)),
            Command::SetHeatLevel { burner, level } => Ok(self
                .set_heat_level(burner, level)?
                .map(|_| CommandOutput::Station)),
            Command::WashStation { burner } => Ok(self
                .wash_station(burner)?
                .map(|_| CommandOutput::Station)),
        }
    }

    // -----------------------------------------------------------------------
    // Tick pipeline
    // -----------------------------------------------------------------------

    /// Advance the kitchen by one second.
    pub fn tick(&mut self) {
        self.phase_order_sweep();
        self.phase_station_physics();
        self.phase_cooking_timers();
        self.event_bus.deliver();
        self.clock += 1;
    }

    // -- Phase 1: order sweep ----------------------------------------------

    fn phase_order_sweep(&mut self) {
        let now = self.clock;

        // Departure timers fire for lingering completed orders.
        let due: Vec<OrderId> = self
            .departures
            .iter()
            .filter(|timer| timer.due <= now)
            .map(|timer| timer.order)
            .collect();
        self.departures.retain(|timer| timer.due > now);
        for order in due {
            self.drop_order(order, true);
        }

        // Hard timeout force-expires orders still being worked.
        let timeout = self.config.order_timeout;
        let expired: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|(_, o)| o.expires() && o.age(now) >= timeout)
            .map(|(id, _)| id)
            .collect();
        for order in expired {
            warn!(?order, "order hit the hard timeout");
            self.drop_order(order, false);
        }
    }

    /// Take an order off the board, destroying what it leaves behind.
    /// Served instances leave silently; unfinished ones are discarded.
    /// Merged instances stay: their food lives on another plate.
    fn drop_order(&mut self, order: OrderId, departed: bool) {
        if self.orders.remove(order).is_none() {
            return;
        }
        let members: Vec<(InstanceId, Location)> = self
            .instances
            .iter()
            .filter(|(_, inst)| inst.order == order)
            .map(|(id, inst)| (id, inst.location))
            .collect();
        for (id, location) in members {
            if !self.instances.contains_key(id) {
                continue; // went down with an earlier plate this sweep
            }
            match location {
                Location::Served => self.remove_instance(id, None),
                Location::Merged { .. } => {}
                _ => self.remove_instance(
                    id,
                    Some(if departed {
                        DiscardReason::OrderDeparted
                    } else {
                        DiscardReason::OrderExpired
                    }),
                ),
            }
        }
        let tick = self.clock;
        if departed {
            self.event_bus.emit(KitchenEvent::OrderDeparted { order, tick });
        } else {
            self.event_bus.emit(KitchenEvent::OrderExpired { order, tick });
        }
    }

    // -- Phase 2: station physics ------------------------------------------

    fn phase_station_physics(&mut self) {
        let tick = self.clock;
        for idx in 0..self.burners.len() {
            let result = self.burners[idx].tick();
            let burner = BurnerId(idx as u8);
            if result.started_boiling {
                self.event_bus
                    .emit(KitchenEvent::WaterBoiled { burner, tick });
            }
            if result.burned {
                let occupant = self.burners[idx].occupant.take();
                warn!(burner = idx, "pan burned");
                self.event_bus.emit(KitchenEvent::StationBurned {
                    station: StationRef::Wok(burner),
                    instance: occupant,
                    tick,
                });
                if let Some(id) = occupant {
                    self.remove_instance(id, Some(DiscardReason::StationBurned));
                }
            }
        }
    }

    // -- Phase 3: cooking timers -------------------------------------------

    fn phase_cooking_timers(&mut self) {
        let tick = self.clock;

        // Wok occupants accrue unconditionally while on the pan.
        for (_, inst) in self.instances.iter_mut() {
            if matches!(inst.location, Location::Wok { .. }) {
                inst.cooking.elapsed += 1;
            }
        }

        // Fryer baskets: submersion-gated accrual, exact-completion
        // auto-advance, then the grace-margin burn check in the same pass so
        // the burn lands the tick the grace expires.
        for idx in 0..self.baskets.len() {
            if !self.baskets[idx].accruing() {
                continue;
            }
            let Some(id) = self.baskets[idx].occupant else {
                continue;
            };
            let Some(inst) = self.instances.get_mut(id) else {
                continue;
            };
            inst.cooking.elapsed += 1;

            let deep_fry_current = active_step(&self.catalog, inst.bundle, inst.cooking.current_step)
                .is_some_and(|s| {
                    matches!(
                        s.kind,
                        StepKind::Action {
                            action: ActionType::DeepFry,
                            ..
                        }
                    )
                });
            if deep_fry_current && inst.cooking.timer_elapsed() {
                inst.cooking.advance();
                let step_index = inst.cooking.current_step;
                let complete = inst.cooking.is_complete();
                self.event_bus.emit(KitchenEvent::ActionPerformed {
                    instance: id,
                    action: ActionType::DeepFry,
                    auto: true,
                    tick,
                });
                self.event_bus.emit(KitchenEvent::StepAdvanced {
                    instance: id,
                    step_index,
                    tick,
                });
                if complete {
                    self.event_bus
                        .emit(KitchenEvent::BundleCompleted { instance: id, tick });
                }
            }

            let burned = matches!(
                inst.cooking.timer,
                Some(timer) if inst.cooking.elapsed >= timer + BURN_GRACE_TICKS
            );
            if burned {
                self.baskets[idx].mark_burned();
                warn!(basket = idx, "fryer load burned");
                self.event_bus.emit(KitchenEvent::StationBurned {
                    station: StationRef::Fryer(BasketId(idx as u8)),
                    instance: Some(id),
                    tick,
                });
            }
        }

        // Microwave: only the head runs, and it stops when its timer is done.
        if let Some(head) = self.microwave.head()
            && let Some(inst) = self.instances.get_mut(head)
            && inst.cooking.timer.is_some()
            && !inst.cooking.timer_elapsed()
        {
            inst.cooking.elapsed += 1;
        }
    }

    // -----------------------------------------------------------------------
    // Unified release path
    // -----------------------------------------------------------------------

    /// Remove an instance and free whatever it held. Every removal -- manual
    /// discard, wok burn, order expiry, departure -- funnels through here so
    /// no cleanup field is missed. `reason` is `None` for instances that
    /// left honestly (served and carried out); those get no discard event.
    fn remove_instance(&mut self, instance: InstanceId, reason: Option<DiscardReason>) {
        let Some(inst) = self.instances.remove(instance) else {
            return;
        };
        match inst.location {
            Location::Wok { burner } => {
                if let Some(b) = self.burners.get_mut(burner.0 as usize) {
                    b.vacate();
                }
            }
            Location::Fryer { basket } => {
                if let Some(b) = self.baskets.get_mut(basket.0 as usize) {
                    b.release();
                }
            }
            Location::Microwave => {
                self.microwave.remove(instance);
            }
            _ => {}
        }
        let tick = self.clock;
        if let Some(reason) = reason {
            self.event_bus.emit(KitchenEvent::BundleDiscarded {
                instance,
                order: inst.order,
                reason,
                tick,
            });
        }

        // Anything merged onto this plate goes with it. Riders can belong to
        // other orders, so every touched order gets the revert check below.
        let riders: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(_, i)| matches!(i.location, Location::Merged { target } if target == instance))
            .map(|(id, _)| id)
            .collect();
        let mut affected = vec![inst.order];
        for rider in riders {
            let Some(ridden) = self.instances.remove(rider) else {
                continue;
            };
            if let Some(reason) = reason {
                self.event_bus.emit(KitchenEvent::BundleDiscarded {
                    instance: rider,
                    order: ridden.order,
                    reason,
                    tick,
                });
            }
            if !affected.contains(&ridden.order) {
                affected.push(ridden.order);
            }
        }

        // With its last live instance gone, an in-progress order goes back
        // on the board for a fresh start.
        for order in affected {
            let revert = match self.orders.get(order) {
                Some(o) if o.status == OrderStatus::Cooking => !self
                    .instances
                    .iter()
                    .any(|(_, i)| i.order == order && !i.location.is_terminal()),
                _ => false,
            };
            if revert && let Some(o) = self.orders.get_mut(order) {
                o.status = OrderStatus::Waiting;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn burner_snapshot(&self, burner: BurnerId) -> Option<BurnerSnapshot> {
        let b = self.burners.get(burner.0 as usize)?;
        Some(BurnerSnapshot {
            burner,
            is_on: b.is_on,
            heat_level: b.heat_level,
            condition: b.condition,
            temperature: b.temperature,
            has_water: b.has_water,
            water_temperature: b.water_temperature,
            is_boiling: b.is_boiling,
            occupant: b.occupant,
        })
    }

    pub fn basket_snapshot(&self, basket: BasketId) -> Option<BasketSnapshot> {
        let b = self.baskets.get(basket.0 as usize)?;
        Some(BasketSnapshot {
            basket,
            status: b.status,
            submerged: b.submerged,
            started_at: b.started_at,
            occupant: b.occupant,
        })
    }

    pub fn microwave_snapshot(&self) -> MicrowaveSnapshot {
        let queue: Vec<InstanceId> = self.microwave.iter().collect();
        let (head_elapsed, head_timer) = match self.microwave.head().and_then(|id| self.instances.get(id)) {
            Some(inst) => (Some(inst.cooking.elapsed), inst.cooking.timer),
            None => (None, None),
        };
        MicrowaveSnapshot {
            queue,
            head_elapsed,
            head_timer,
        }
    }

    pub fn instance_snapshot(&self, instance: InstanceId) -> Option<InstanceSnapshot> {
        let inst = self.instances.get(instance)?;
        Some(InstanceSnapshot {
            instance,
            order: inst.order,
            bundle: inst.bundle,
            location: inst.location,
            current_step: inst.cooking.current_step,
            total_steps: inst.cooking.total_steps,
            elapsed: inst.cooking.elapsed,
            timer: inst.cooking.timer,
            errors: inst.errors,
            available_amount: inst.available_amount,
            portions: inst.portions.clone(),
        })
    }

    /// All orders on the board, oldest first.
    pub fn order_snapshots(&self) -> Vec<OrderSnapshot> {
        let now = self.clock;
        let mut snapshots: Vec<OrderSnapshot> = self
            .orders
            .iter()
            .map(|(id, o)| OrderSnapshot {
                order: id,
                recipe: o.recipe,
                menu_name: o.menu_name.clone(),
                status: o.status,
                age: o.age(now),
            })
            .collect();
        snapshots.sort_by(|a, b| b.age.cmp(&a.age));
        snapshots
    }

    /// Station utilization counts.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            burners_total: self.burners.len(),
            burners_busy: self.burners.iter().filter(|b| b.occupant.is_some()).count(),
            baskets_total: self.baskets.len(),
            baskets_busy: self.baskets.iter().filter(|b| b.occupant.is_some()).count(),
            microwave_depth: self.microwave.len(),
            live_instances: self
                .instances
                .iter()
                .filter(|(_, i)| !i.location.is_terminal())
                .count(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
