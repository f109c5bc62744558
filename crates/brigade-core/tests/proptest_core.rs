//! Property-based tests for the brigade-core kitchen engine.
//!
//! Uses proptest to generate random op sequences against the wok thermal
//! model, the fryer timing discipline, the full command surface, and the
//! plating composer, then verify structural invariants hold.

use brigade_core::catalog::IngredientCategory;
use brigade_core::command::{AssignConfig, Outcome};
use brigade_core::event::EventKind;
use brigade_core::fixed::{Fixed64, Ticks};
use brigade_core::fryer::{BURN_GRACE_TICKS, BasketStatus};
use brigade_core::id::*;
use brigade_core::instance::{Location, StationRef};
use brigade_core::kitchen::{Kitchen, KitchenConfig};
use brigade_core::order::OrderStatus;
use brigade_core::plating::PlateKind;
use brigade_core::policy::EnforcementMode;
use brigade_core::test_utils::*;
use brigade_core::wok::{
    AMBIENT_TEMP, BOIL_TEMP, Burner, BurnerCondition, HeatLevel, MAX_WOK_TEMP,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Generators
// ===========================================================================

/// Operations against a single raw burner.
#[derive(Debug, Clone)]
enum PanOp {
    Tick,
    Toggle,
    SetHeat(u8),
    Feed(u8),
    Stir,
    Wash,
}

fn arb_pan_sequence(max_ops: usize) -> impl Strategy<Value = Vec<PanOp>> {
    proptest::collection::vec(
        prop_oneof![
            4 => Just(PanOp::Tick),
            1 => Just(PanOp::Toggle),
            1 => (0..3u8).prop_map(PanOp::SetHeat),
            1 => (0..5u8).prop_map(PanOp::Feed),
            1 => Just(PanOp::Stir),
            1 => Just(PanOp::Wash),
        ],
        1..=max_ops,
    )
}

fn feed_category(selector: u8) -> IngredientCategory {
    match selector % 5 {
        0 => IngredientCategory::Liquid,
        1 => IngredientCategory::Protein,
        2 => IngredientCategory::Vegetable,
        3 => IngredientCategory::Aromatic,
        _ => IngredientCategory::Garnish,
    }
}

/// Operations against one assigned fryer basket.
#[derive(Debug, Clone)]
enum FryerOp {
    Tick,
    Lower,
    Lift,
}

fn arb_fryer_sequence(max_ops: usize) -> impl Strategy<Value = Vec<FryerOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => Just(FryerOp::Tick),
            1 => Just(FryerOp::Lower),
            1 => Just(FryerOp::Lift),
        ],
        1..=max_ops,
    )
}

/// Commands thrown at a full kitchen. Index fields are taken modulo the
/// live pools, so every op stays meaningful as the pools grow and shrink.
#[derive(Debug, Clone)]
enum ServiceOp {
    EnterRice,
    EnterReheat,
    AssignWok(usize, u8),
    AssignFryer(usize, u8),
    AssignMicrowave(usize),
    Feed(usize),
    ToggleBurner(u8),
    Lower(u8),
    Lift(u8),
    Wash(u8),
    Complete(usize),
    Discard(usize),
    Tick,
}

fn arb_service_sequence(max_ops: usize) -> impl Strategy<Value = Vec<ServiceOp>> {
    proptest::collection::vec(
        prop_oneof![
            2 => Just(ServiceOp::EnterRice),
            1 => Just(ServiceOp::EnterReheat),
            2 => (0..32usize, 0..4u8).prop_map(|(o, b)| ServiceOp::AssignWok(o, b)),
            1 => (0..32usize, 0..2u8).prop_map(|(o, b)| ServiceOp::AssignFryer(o, b)),
            1 => (0..32usize).prop_map(ServiceOp::AssignMicrowave),
            2 => (0..64usize).prop_map(ServiceOp::Feed),
            1 => (0..4u8).prop_map(ServiceOp::ToggleBurner),
            1 => (0..2u8).prop_map(ServiceOp::Lower),
            1 => (0..2u8).prop_map(ServiceOp::Lift),
            1 => (0..4u8).prop_map(ServiceOp::Wash),
            1 => (0..64usize).prop_map(ServiceOp::Complete),
            1 => (0..64usize).prop_map(ServiceOp::Discard),
            4 => Just(ServiceOp::Tick),
        ],
        1..=max_ops,
    )
}

/// Decoration attempts against a plated fried rice main.
#[derive(Debug, Clone)]
enum DecoOp {
    Sesame(u8, u32),
    Nori(u8, u32),
    Merge(u32),
}

fn arb_deco_sequence(max_ops: usize) -> impl Strategy<Value = Vec<DecoOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..9u8, 0..8u32).prop_map(|(pos, amount)| DecoOp::Sesame(pos, amount)),
            (0..9u8, 0..8u32).prop_map(|(pos, amount)| DecoOp::Nori(pos, amount)),
            (0..8u32).prop_map(DecoOp::Merge),
        ],
        1..=max_ops,
    )
}

// ===========================================================================
// Consistency checks
// ===========================================================================

/// Cross-check station occupant back-references against instance locations:
/// every occupant is a live instance located on that station, no instance is
/// parked on two stations, and the occupancy tallies agree.
fn check_station_links(kitchen: &Kitchen, tracked: &[InstanceId]) -> Result<(), TestCaseError> {
    let mut seen: Vec<InstanceId> = Vec::new();
    let mut burners_busy = 0;
    for i in 0..kitchen.config().burner_count {
        let id = BurnerId(i as u8);
        let Some(occupant) = kitchen.burner(id).and_then(|b| b.occupant) else {
            continue;
        };
        burners_busy += 1;
        let inst = kitchen.instance(occupant);
        prop_assert!(inst.is_some(), "burner {i} holds a dead instance");
        prop_assert_eq!(inst.map(|inst| inst.location), Some(Location::Wok { burner: id }));
        prop_assert!(!seen.contains(&occupant), "instance parked on two stations");
        seen.push(occupant);
    }
    let mut baskets_busy = 0;
    for i in 0..kitchen.config().basket_count {
        let id = BasketId(i as u8);
        let Some(occupant) = kitchen.basket(id).and_then(|b| b.occupant) else {
            continue;
        };
        baskets_busy += 1;
        let inst = kitchen.instance(occupant);
        prop_assert!(inst.is_some(), "basket {i} holds a dead instance");
        prop_assert_eq!(inst.map(|inst| inst.location), Some(Location::Fryer { basket: id }));
        prop_assert!(!seen.contains(&occupant), "instance parked on two stations");
        seen.push(occupant);
    }
    for occupant in kitchen.microwave().iter() {
        let inst = kitchen.instance(occupant);
        prop_assert!(inst.is_some(), "microwave queue holds a dead instance");
        prop_assert_eq!(inst.map(|inst| inst.location), Some(Location::Microwave));
        prop_assert!(!seen.contains(&occupant), "instance parked on two stations");
        seen.push(occupant);
    }

    let occupancy = kitchen.occupancy();
    prop_assert_eq!(occupancy.burners_busy, burners_busy);
    prop_assert_eq!(occupancy.baskets_busy, baskets_busy);
    prop_assert_eq!(occupancy.microwave_depth, kitchen.microwave().len());

    // The reverse direction, over every instance this run ever created:
    // an instance that claims a station is that station's occupant.
    for &id in tracked {
        let Some(inst) = kitchen.instance(id) else {
            continue;
        };
        match inst.location {
            Location::Wok { burner } => {
                let occupant = kitchen.burner(burner).and_then(|b| b.occupant);
                prop_assert_eq!(occupant, Some(id), "wok back-reference out of sync");
            }
            Location::Fryer { basket } => {
                let occupant = kitchen.basket(basket).and_then(|b| b.occupant);
                prop_assert_eq!(occupant, Some(id), "fryer back-reference out of sync");
            }
            Location::Microwave => {
                prop_assert!(
                    kitchen.microwave().iter().any(|q| q == id),
                    "instance claims the microwave but is not queued"
                );
            }
            _ => {}
        }
    }
    Ok(())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Thermal bounds: no op sequence pushes a pan outside its envelope,
    /// boiling implies water at the boil point, and a burned pan stays
    /// burned until washed.
    #[test]
    fn pan_physics_stays_bounded(
        start_temp in 25..=340u32,
        ops in arb_pan_sequence(300),
    ) {
        let mut pan = Burner::new();
        pan.is_on = true;
        pan.heat_level = HeatLevel::High;
        pan.temperature = Fixed64::from_num(start_temp);

        for op in ops {
            let was_burned = pan.condition == BurnerCondition::Burned;
            let washed = matches!(op, PanOp::Wash);
            match op {
                PanOp::Tick => {
                    pan.tick();
                }
                PanOp::Toggle => pan.is_on = !pan.is_on,
                PanOp::SetHeat(level) => {
                    pan.heat_level = match level % 3 {
                        0 => HeatLevel::Low,
                        1 => HeatLevel::Medium,
                        _ => HeatLevel::High,
                    };
                }
                PanOp::Feed(selector) => pan.feed(feed_category(selector)),
                PanOp::Stir => pan.stir_effect(),
                PanOp::Wash => pan.wash(),
            }

            prop_assert!(pan.temperature >= AMBIENT_TEMP);
            prop_assert!(pan.temperature <= MAX_WOK_TEMP);
            prop_assert!(pan.water_temperature >= AMBIENT_TEMP);
            prop_assert!(pan.water_temperature <= BOIL_TEMP);
            if pan.is_boiling {
                prop_assert!(pan.has_water, "boiling without water");
                prop_assert_eq!(pan.water_temperature, BOIL_TEMP);
            }
            if was_burned && !washed {
                prop_assert_eq!(pan.condition, BurnerCondition::Burned);
            }
        }
    }

    /// Fryer elapsed time accrues exactly one tick per submerged tick of a
    /// live assignment, the start timestamp never moves once set, and the
    /// grace-margin burn fires exactly once.
    #[test]
    fn fryer_accrues_only_while_submerged(ops in arb_fryer_sequence(250)) {
        let mut kitchen = fixture_kitchen_with(KitchenConfig {
            order_timeout: 1_000_000,
            ..KitchenConfig::default()
        });
        let burns = Rc::new(RefCell::new(0u32));
        let sink = burns.clone();
        kitchen.on_passive(
            EventKind::StationBurned,
            Box::new(move |_| *sink.borrow_mut() += 1),
        );

        let recipe = kitchen.catalog().recipe_id("fried rice set").unwrap();
        let bundle = kitchen.catalog().bundle_id("fried shrimp").unwrap();
        let shrimp = req(kitchen.catalog(), "fried shrimp", 0, 0);
        let batter = req(kitchen.catalog(), "fried shrimp", 0, 1);
        let order = accept(kitchen.enter_order(recipe));
        let load = accept(kitchen.assign_bundle(
            order,
            bundle,
            StationRef::Fryer(BasketId(0)),
            AssignConfig::default(),
        ));
        accept(kitchen.add_ingredient(load, shrimp, 4));
        accept(kitchen.add_ingredient(load, batter, 100));

        let timer = kitchen.instance(load).unwrap().cooking.timer.unwrap();
        let mut expected: Ticks = 0;
        let mut started: Option<Ticks> = None;

        for op in ops {
            match op {
                FryerOp::Lower => {
                    let _ = kitchen.lower_basket(BasketId(0));
                }
                FryerOp::Lift => {
                    let _ = kitchen.lift_basket(BasketId(0));
                }
                FryerOp::Tick => {
                    let accruing = {
                        let basket = kitchen.basket(BasketId(0)).unwrap();
                        basket.submerged && basket.status == BasketStatus::Assigned
                    };
                    kitchen.tick();
                    if accruing {
                        expected += 1;
                    }
                }
            }

            let inst = kitchen.instance(load).unwrap();
            prop_assert_eq!(inst.cooking.elapsed, expected);
            prop_assert!(expected <= timer + BURN_GRACE_TICKS);

            let basket = kitchen.basket(BasketId(0)).unwrap();
            match (started, basket.started_at) {
                (Some(first), now) => prop_assert_eq!(now, Some(first)),
                (None, now) => started = now,
            }
        }

        let burned = expected >= timer + BURN_GRACE_TICKS;
        prop_assert_eq!(*burns.borrow(), if burned { 1 } else { 0 });
        prop_assert_eq!(
            kitchen.basket(BasketId(0)).unwrap().status == BasketStatus::Burned,
            burned
        );
    }

    /// Any storm of commands leaves station back-references and instance
    /// locations in agreement, and no unfinished order outlives the hard
    /// timeout.
    #[test]
    fn command_storm_keeps_stations_consistent(ops in arb_service_sequence(150)) {
        let timeout = 50;
        let mut kitchen = fixture_kitchen_with(KitchenConfig {
            order_timeout: timeout,
            ..KitchenConfig::default()
        });
        let rice_recipe = kitchen.catalog().recipe_id("fried rice set").unwrap();
        let reheat_recipe = kitchen.catalog().recipe_id("reheat bowl").unwrap();
        let rice = kitchen.catalog().bundle_id("fried rice").unwrap();
        let shrimp = kitchen.catalog().bundle_id("fried shrimp").unwrap();
        let bowl = kitchen.catalog().bundle_id("leftover bowl").unwrap();
        let rice_req = req(kitchen.catalog(), "fried rice", 0, 0);

        let mut rice_orders: Vec<OrderId> = Vec::new();
        let mut reheat_orders: Vec<OrderId> = Vec::new();
        let mut instances: Vec<InstanceId> = Vec::new();

        for op in ops {
            match op {
                ServiceOp::EnterRice => {
                    if let Ok(Outcome::Accepted(id)) = kitchen.enter_order(rice_recipe) {
                        rice_orders.push(id);
                    }
                }
                ServiceOp::EnterReheat => {
                    if let Ok(Outcome::Accepted(id)) = kitchen.enter_order(reheat_recipe) {
                        reheat_orders.push(id);
                    }
                }
                ServiceOp::AssignWok(o, b) => {
                    if !rice_orders.is_empty() {
                        let order = rice_orders[o % rice_orders.len()];
                        if let Ok(Outcome::Accepted(id)) = kitchen.assign_bundle(
                            order,
                            rice,
                            StationRef::Wok(BurnerId(b % 4)),
                            AssignConfig::default(),
                        ) {
                            instances.push(id);
                        }
                    }
                }
                ServiceOp::AssignFryer(o, b) => {
                    if !rice_orders.is_empty() {
                        let order = rice_orders[o % rice_orders.len()];
                        if let Ok(Outcome::Accepted(id)) = kitchen.assign_bundle(
                            order,
                            shrimp,
                            StationRef::Fryer(BasketId(b % 2)),
                            AssignConfig::default(),
                        ) {
                            instances.push(id);
                        }
                    }
                }
                ServiceOp::AssignMicrowave(o) => {
                    if !reheat_orders.is_empty() {
                        let order = reheat_orders[o % reheat_orders.len()];
                        if let Ok(Outcome::Accepted(id)) = kitchen.assign_bundle(
                            order,
                            bowl,
                            StationRef::Microwave,
                            AssignConfig::default(),
                        ) {
                            instances.push(id);
                        }
                    }
                }
                ServiceOp::Feed(i) => {
                    if !instances.is_empty() {
                        let id = instances[i % instances.len()];
                        let _ = kitchen.add_ingredient(id, rice_req, 300);
                    }
                }
                ServiceOp::ToggleBurner(b) => {
                    let _ = kitchen.toggle_burner(BurnerId(b % 4));
                }
                ServiceOp::Lower(b) => {
                    let _ = kitchen.lower_basket(BasketId(b % 2));
                }
                ServiceOp::Lift(b) => {
                    let _ = kitchen.lift_basket(BasketId(b % 2));
                }
                ServiceOp::Wash(b) => {
                    let _ = kitchen.wash_station(BurnerId(b % 4));
                }
                ServiceOp::Complete(i) => {
                    if !instances.is_empty() {
                        let _ = kitchen.complete_bundle(instances[i % instances.len()]);
                    }
                }
                ServiceOp::Discard(i) => {
                    if !instances.is_empty() {
                        let _ = kitchen.discard_bundle(instances[i % instances.len()]);
                    }
                }
                ServiceOp::Tick => kitchen.tick(),
            }
        }

        check_station_links(&kitchen, &instances)?;

        for snapshot in kitchen.order_snapshots() {
            if snapshot.status != OrderStatus::Completed {
                prop_assert!(
                    snapshot.age <= timeout,
                    "order age {} past the timeout",
                    snapshot.age
                );
            }
        }
    }

    /// Plating rule bounds hold under arbitrary decoration attempts: a
    /// positioned garnish only ever lands on its declared cell at its exact
    /// amount, and merged portions are conserved between source and plate.
    #[test]
    fn deco_rules_hold_under_random_decoration(ops in arb_deco_sequence(60)) {
        let mut kitchen = fixture_kitchen_with(KitchenConfig {
            mode: EnforcementMode::Lenient,
            order_timeout: 1_000_000,
            ..KitchenConfig::default()
        });
        let recipe = kitchen.catalog().recipe_id("fried rice set").unwrap();
        let rice = kitchen.catalog().bundle_id("fried rice").unwrap();
        let sesame = kitchen.catalog().ingredient_id("sesame").unwrap();
        let nori = kitchen.catalog().ingredient_id("nori").unwrap();

        let order = accept(kitchen.enter_order(recipe));
        let main = accept(kitchen.assign_bundle(
            order,
            rice,
            StationRef::Wok(BurnerId(0)),
            AssignConfig::default(),
        ));
        cook_fried_rice(&mut kitchen, main);
        accept(kitchen.complete_bundle(main));
        accept(kitchen.route_after_plate(main, PlateKind::Platter));
        let side = cook_fried_shrimp(&mut kitchen, order, BasketId(0));

        for op in ops {
            match op {
                DecoOp::Sesame(pos, amount) => {
                    let _ = kitchen.apply_garnish(main, sesame, GridPos(pos), amount);
                }
                DecoOp::Nori(pos, amount) => {
                    let _ = kitchen.apply_garnish(main, nori, GridPos(pos), amount);
                }
                DecoOp::Merge(amount) => {
                    let _ = kitchen.merge_bundle(side, main, amount);
                }
            }
        }

        let rules = kitchen.catalog().deco_rules_of(recipe).unwrap();
        let (shrimp_rule, sesame_rule, nori_rule) = (rules[0], rules[1], rules[2]);
        let plating = kitchen.instance(main).unwrap().plating.as_ref().unwrap();

        let sesame_hits: Vec<_> = plating
            .applied
            .iter()
            .filter(|a| a.rule == sesame_rule)
            .collect();
        prop_assert!(sesame_hits.len() <= 1, "exact-amount garnish applied twice");
        for hit in &sesame_hits {
            prop_assert_eq!(hit.position, GridPos(4));
            prop_assert_eq!(hit.amount, 5);
        }
        let nori_hits: Vec<_> = plating
            .applied
            .iter()
            .filter(|a| a.rule == nori_rule)
            .collect();
        prop_assert!(nori_hits.len() <= 1, "exact-amount garnish applied twice");
        for hit in &nori_hits {
            prop_assert_eq!(hit.amount, 2);
        }

        let drawn = plating.applied_amount(shrimp_rule);
        prop_assert!(drawn <= 6, "merged past the rule total");
        let source = kitchen.instance(side).unwrap();
        prop_assert_eq!(source.available_amount + drawn, 6);
        if source.available_amount == 0 {
            prop_assert_eq!(source.location, Location::Merged { target: main });
            prop_assert!(plating.merged_bundles.contains(&side));
        } else {
            prop_assert_eq!(source.location, Location::DecoSetting);
        }
    }
}
