//! Happy-path service round trips across every station.
//!
//! Drives complete menu orders the way a front-of-house client would: order
//! entry, station assignment, ingredient feeds, action timing, plating,
//! decoration, merging, and service, asserting on the events and snapshots
//! the core exposes along the way.

use std::cell::RefCell;
use std::rc::Rc;

use brigade_core::catalog::ActionType;
use brigade_core::command::{AssignConfig, Rejection};
use brigade_core::event::EventKind;
use brigade_core::id::{BasketId, BurnerId, GridPos};
use brigade_core::instance::{Location, StationRef};
use brigade_core::kitchen::KitchenConfig;
use brigade_core::order::OrderStatus;
use brigade_core::plating::PlateKind;
use brigade_core::policy::EnforcementMode;
use brigade_core::test_utils::*;
use brigade_core::wok::HeatLevel;

// ===========================================================================
// Test 1: the fried rice set, start to finish under strict enforcement
// ===========================================================================

#[test]
fn fried_rice_set_full_service() {
    let mut kitchen = fixture_kitchen(EnforcementMode::Strict);
    let recipe = kitchen.catalog().recipe_id("fried rice set").unwrap();
    let rice_bundle = kitchen.catalog().bundle_id("fried rice").unwrap();
    let sesame = kitchen.catalog().ingredient_id("sesame").unwrap();
    let nori = kitchen.catalog().ingredient_id("nori").unwrap();

    // Count the service-level events as they fire.
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    for (kind, label) in [
        (EventKind::OrderCompleted, "completed"),
        (EventKind::OrderDeparted, "departed"),
        (EventKind::OrderExpired, "expired"),
        (EventKind::MistakeRecorded, "mistake"),
        (EventKind::BundleDiscarded, "discarded"),
    ] {
        let sink = log.clone();
        kitchen.on_passive(kind, Box::new(move |_| sink.borrow_mut().push(label)));
    }

    let order = accept(kitchen.enter_order(recipe));
    assert_eq!(kitchen.order(order).unwrap().status, OrderStatus::Waiting);

    // Main dish on burner 0.
    let main = accept(kitchen.assign_bundle(
        order,
        rice_bundle,
        StationRef::Wok(BurnerId(0)),
        AssignConfig::default(),
    ));
    assert_eq!(kitchen.order(order).unwrap().status, OrderStatus::Cooking);
    cook_fried_rice(&mut kitchen, main);
    accept(kitchen.complete_bundle(main));
    assert_eq!(
        kitchen.instance(main).unwrap().location,
        Location::PlateSelect
    );

    // A main dish picks a plate and opens its decoration grid.
    accept(kitchen.route_after_plate(main, PlateKind::Platter));
    assert_eq!(kitchen.instance(main).unwrap().location, Location::DecoMain);

    // Side dish through the fryer, routed to the setting area.
    let side = cook_fried_shrimp(&mut kitchen, order, BasketId(0));
    assert_eq!(
        kitchen.instance(side).unwrap().location,
        Location::DecoSetting
    );
    assert_eq!(kitchen.instance(side).unwrap().available_amount, 6);

    // Strict mode holds the deco order: garnish before the shrimp is refused.
    let early = kitchen
        .apply_garnish(main, sesame, GridPos(4), 5)
        .unwrap();
    assert!(early.is_rejected());

    // Merge the shrimp across two passes. Four portions leave the source
    // standing; the last two absorb it onto the platter.
    let first = accept(kitchen.merge_bundle(side, main, 4));
    assert_eq!(first.drawn, 4);
    assert!(!first.source_exhausted);
    assert!(!first.deco.rule_satisfied);
    assert_eq!(kitchen.instance(side).unwrap().available_amount, 2);

    let second = accept(kitchen.merge_bundle(side, main, 2));
    assert!(second.source_exhausted);
    assert!(second.deco.rule_satisfied);
    assert_eq!(
        kitchen.instance(side).unwrap().location,
        Location::Merged { target: main }
    );

    // Sesame is pinned to the grid center; nori goes anywhere.
    let report = accept(kitchen.apply_garnish(main, sesame, GridPos(4), 5));
    assert!(report.rule_satisfied);
    let report = accept(kitchen.apply_garnish(main, nori, GridPos(0), 2));
    assert!(report.rule_satisfied);
    assert!(report.plating_complete);

    // Serve. The order completes and lingers before departing.
    let serve = accept(kitchen.serve_bundle(main));
    assert!(serve.deco_complete);
    assert_eq!(serve.order, order);
    assert_eq!(kitchen.served_count(), 1);
    assert_eq!(kitchen.order(order).unwrap().status, OrderStatus::Completed);

    let linger = kitchen.config().order_linger;
    for _ in 0..=linger {
        kitchen.tick();
    }
    assert_eq!(kitchen.order_count(), 0);
    assert_eq!(kitchen.instance_count(), 0);

    // One completion, one departure; no mistakes, no expiry, and the served
    // plate leaves without a discard event.
    let log = log.borrow();
    assert_eq!(log.iter().filter(|l| **l == "completed").count(), 1);
    assert_eq!(log.iter().filter(|l| **l == "departed").count(), 1);
    assert_eq!(log.iter().filter(|l| **l == "expired").count(), 0);
    assert_eq!(log.iter().filter(|l| **l == "mistake").count(), 0);
    assert_eq!(log.iter().filter(|l| **l == "discarded").count(), 0);
}

// ===========================================================================
// Test 2: miso soup exercises the water model and the boil gate
// ===========================================================================

#[test]
fn miso_soup_boil_path() {
    let mut kitchen = fixture_kitchen(EnforcementMode::Strict);
    let recipe = kitchen.catalog().recipe_id("miso soup set").unwrap();
    let bundle = kitchen.catalog().bundle_id("miso soup").unwrap();
    let order = accept(kitchen.enter_order(recipe));
    let soup = accept(kitchen.assign_bundle(
        order,
        bundle,
        StationRef::Wok(BurnerId(1)),
        AssignConfig::default(),
    ));

    let water = req(kitchen.catalog(), "miso soup", 0, 0);
    let miso = req(kitchen.catalog(), "miso soup", 2, 0);
    let tofu = req(kitchen.catalog(), "miso soup", 2, 1);

    // Water in the pan switches the burner to the water model.
    accept(kitchen.add_ingredient(soup, water, 500));
    assert!(kitchen.burner(BurnerId(1)).unwrap().has_water);

    // Boiling before the water is hot is refused outright.
    let early = kitchen.execute_action(soup, ActionType::Boil).unwrap();
    assert!(early.is_rejected());

    accept(kitchen.toggle_burner(BurnerId(1)));
    accept(kitchen.set_heat_level(BurnerId(1), HeatLevel::High));

    let boiled = Rc::new(RefCell::new(0u32));
    let sink = boiled.clone();
    kitchen.on_passive(
        EventKind::WaterBoiled,
        Box::new(move |_| *sink.borrow_mut() += 1),
    );

    // Heat to the boil, then through the dwell.
    for _ in 0..100 {
        kitchen.tick();
        if kitchen.burner(BurnerId(1)).unwrap().is_boiling {
            break;
        }
    }
    let burner = kitchen.burner(BurnerId(1)).unwrap();
    assert!(burner.is_boiling);
    assert_eq!(*boiled.borrow(), 1);

    // The boil gate opens; the remaining feeds finish the bundle.
    let report = accept(kitchen.execute_action(soup, ActionType::Boil));
    assert!(report.step_advanced);
    accept(kitchen.add_ingredient(soup, miso, 50));
    let report = accept(kitchen.add_ingredient(soup, tofu, 100));
    assert!(report.bundle_complete);

    accept(kitchen.toggle_burner(BurnerId(1)));
    accept(kitchen.complete_bundle(soup));
    accept(kitchen.route_after_plate(soup, PlateKind::Bowl));

    // Soup demands no decoration, so the serve still reads complete.
    let serve = accept(kitchen.serve_bundle(soup));
    assert!(serve.deco_complete);
    assert_eq!(kitchen.order(order).unwrap().status, OrderStatus::Completed);
}

// ===========================================================================
// Test 3: the microwave runs its queue head only, in FIFO order
// ===========================================================================

#[test]
fn microwave_runs_head_only_fifo() {
    let mut kitchen = fixture_kitchen(EnforcementMode::Strict);
    let recipe = kitchen.catalog().recipe_id("reheat bowl").unwrap();
    let bundle = kitchen.catalog().bundle_id("leftover bowl").unwrap();
    let stew = req(kitchen.catalog(), "leftover bowl", 0, 0);

    let order_a = accept(kitchen.enter_order(recipe));
    let order_b = accept(kitchen.enter_order(recipe));
    let first = accept(kitchen.assign_bundle(
        order_a,
        bundle,
        StationRef::Microwave,
        AssignConfig::default(),
    ));
    let second = accept(kitchen.assign_bundle(
        order_b,
        bundle,
        StationRef::Microwave,
        AssignConfig::default(),
    ));
    assert_eq!(kitchen.microwave().len(), 2);
    assert_eq!(kitchen.microwave().head(), Some(first));

    accept(kitchen.add_ingredient(first, stew, 400));
    accept(kitchen.add_ingredient(second, stew, 400));

    // Only the head accrues time.
    for _ in 0..30 {
        kitchen.tick();
    }
    assert_eq!(kitchen.instance(first).unwrap().cooking.elapsed, 30);
    assert_eq!(kitchen.instance(second).unwrap().cooking.elapsed, 0);

    // Popping the door early is refused while the head is mid-run.
    let early = kitchen.execute_action(first, ActionType::Microwave).unwrap();
    assert!(early.is_rejected());

    // The head stops at its timer and waits for the player.
    for _ in 0..40 {
        kitchen.tick();
    }
    assert_eq!(kitchen.instance(first).unwrap().cooking.elapsed, 60);
    assert_eq!(kitchen.instance(second).unwrap().cooking.elapsed, 0);

    let report = accept(kitchen.execute_action(first, ActionType::Microwave));
    assert!(report.bundle_complete);
    accept(kitchen.complete_bundle(first));
    assert_eq!(kitchen.microwave().head(), Some(second));

    // The next bowl starts from zero once it reaches the head.
    for _ in 0..60 {
        kitchen.tick();
    }
    assert_eq!(kitchen.instance(second).unwrap().cooking.elapsed, 60);
    let report = accept(kitchen.execute_action(second, ActionType::Microwave));
    assert!(report.bundle_complete);
    accept(kitchen.complete_bundle(second));
    assert!(kitchen.microwave().is_empty());

    // Both bowls plate and serve; each order completes independently.
    for bowl in [first, second] {
        accept(kitchen.route_after_plate(bowl, PlateKind::Bowl));
        let serve = accept(kitchen.serve_bundle(bowl));
        assert!(serve.deco_complete);
    }
    assert_eq!(kitchen.served_count(), 2);
    assert_eq!(kitchen.order(order_a).unwrap().status, OrderStatus::Completed);
    assert_eq!(kitchen.order(order_b).unwrap().status, OrderStatus::Completed);
}

// ===========================================================================
// Test 4: timed assignment config reconciles against the declared step
// ===========================================================================

#[test]
fn assignment_config_reconciliation() {
    // Strict mode rejects a timer that disagrees with the recipe.
    let mut kitchen = fixture_kitchen(EnforcementMode::Strict);
    let recipe = kitchen.catalog().recipe_id("reheat bowl").unwrap();
    let bundle = kitchen.catalog().bundle_id("leftover bowl").unwrap();
    let order = accept(kitchen.enter_order(recipe));

    let clash = kitchen
        .assign_bundle(
            order,
            bundle,
            StationRef::Microwave,
            AssignConfig {
                timer: Some(90),
                power: None,
            },
        )
        .unwrap();
    assert!(matches!(
        clash.rejected(),
        Some(Rejection::ParamMismatch {
            declared_timer: Some(60),
            declared_power: Some(7),
        })
    ));

    // Lenient mode takes the supplied values as given.
    let mut kitchen = fixture_kitchen(EnforcementMode::Lenient);
    let order = accept(kitchen.enter_order(recipe));
    let bowl = accept(kitchen.assign_bundle(
        order,
        bundle,
        StationRef::Microwave,
        AssignConfig {
            timer: Some(90),
            power: Some(3),
        },
    ));
    let cooking = &kitchen.instance(bowl).unwrap().cooking;
    assert_eq!(cooking.timer, Some(90));
    assert_eq!(cooking.power, Some(3));

    // Omitted fields fall back to the declared parameters.
    let mut kitchen = fixture_kitchen(EnforcementMode::Strict);
    let order = accept(kitchen.enter_order(recipe));
    let bowl = accept(kitchen.assign_bundle(
        order,
        bundle,
        StationRef::Microwave,
        AssignConfig::default(),
    ));
    let cooking = &kitchen.instance(bowl).unwrap().cooking;
    assert_eq!(cooking.timer, Some(60));
    assert_eq!(cooking.power, Some(7));
}

// ===========================================================================
// Test 5: lenient mode absorbs deco disorder as recorded mistakes
// ===========================================================================

#[test]
fn lenient_deco_disorder_records_mistakes() {
    let mut kitchen = fixture_kitchen_with(KitchenConfig {
        mode: EnforcementMode::Lenient,
        order_timeout: 10_000,
        ..KitchenConfig::default()
    });
    let recipe = kitchen.catalog().recipe_id("fried rice set").unwrap();
    let rice_bundle = kitchen.catalog().bundle_id("fried rice").unwrap();
    let sesame = kitchen.catalog().ingredient_id("sesame").unwrap();

    let mistakes = Rc::new(RefCell::new(0u32));
    let sink = mistakes.clone();
    kitchen.on_passive(
        EventKind::MistakeRecorded,
        Box::new(move |_| *sink.borrow_mut() += 1),
    );

    let order = accept(kitchen.enter_order(recipe));
    let main = accept(kitchen.assign_bundle(
        order,
        rice_bundle,
        StationRef::Wok(BurnerId(0)),
        AssignConfig::default(),
    ));
    cook_fried_rice(&mut kitchen, main);
    accept(kitchen.complete_bundle(main));
    accept(kitchen.route_after_plate(main, PlateKind::Platter));

    // A pinned garnish off its cell is refused even in lenient mode.
    let wrong_spot = kitchen
        .apply_garnish(main, sesame, GridPos(0), 5)
        .unwrap();
    assert!(wrong_spot.is_rejected());
    assert_eq!(*mistakes.borrow(), 0);

    // Sesame ahead of the shrimp rule: lenient accepts it and flags the slip.
    let report = accept(kitchen.apply_garnish(main, sesame, GridPos(4), 5));
    assert!(report.mistake);
    assert!(report.rule_satisfied);
    assert_eq!(*mistakes.borrow(), 1);
    assert_eq!(kitchen.instance(main).unwrap().errors, 1);

    // Exact-amount demands bind in lenient mode too.
    let nori = kitchen.catalog().ingredient_id("nori").unwrap();
    let short_pinch = kitchen.apply_garnish(main, nori, GridPos(8), 1).unwrap();
    assert!(short_pinch.is_rejected());

    // Finish the plate: shrimp all at once, nori loose.
    let side = cook_fried_shrimp(&mut kitchen, order, BasketId(1));
    let merged = accept(kitchen.merge_bundle(side, main, 6));
    assert!(merged.source_exhausted);
    let report = accept(kitchen.apply_garnish(main, nori, GridPos(8), 2));
    assert!(report.plating_complete);

    let serve = accept(kitchen.serve_bundle(main));
    assert!(serve.deco_complete);
}
