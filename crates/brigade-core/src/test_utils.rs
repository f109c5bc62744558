//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{
    ActionParams, ActionType, Catalog, CatalogBuilder, CookingType, DecoSource,
    IngredientCategory, StepKind, Unit,
};
use crate::command::{AssignConfig, Outcome};
use crate::fixed::Fixed64;
use crate::id::*;
use crate::instance::{Location, StationRef};
use crate::kitchen::{Kitchen, KitchenConfig, KitchenError};
use crate::plating::PlateKind;
use crate::policy::EnforcementMode;
use crate::wok::HeatLevel;

// ===========================================================================
// Fixture catalog
// ===========================================================================

/// A small but complete menu exercising every station.
///
/// - "fried rice set": a wok main (two stir-fries around a sauce step) plated
///   with six fried shrimp from the fryer, sesame pinned to the center cell,
///   and loose nori.
/// - "miso soup set": a boil recipe for the water model.
/// - "reheat bowl": a microwave recipe for the queue.
pub fn fixture_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();

    let rice = b.register_ingredient("rice", IngredientCategory::Starch);
    let egg = b.register_ingredient("egg", IngredientCategory::Protein);
    b.register_ingredient("scallion", IngredientCategory::Aromatic);
    let soy = b.register_ingredient("soy sauce", IngredientCategory::Sauce);
    let water = b.register_ingredient("water", IngredientCategory::Liquid);
    let tofu = b.register_ingredient("tofu", IngredientCategory::Protein);
    let miso = b.register_ingredient("miso paste", IngredientCategory::Sauce);
    let shrimp = b.register_ingredient("shrimp", IngredientCategory::Protein);
    let batter = b.register_ingredient("batter", IngredientCategory::Starch);
    let sesame = b.register_ingredient("sesame", IngredientCategory::Garnish);
    let nori = b.register_ingredient("nori", IngredientCategory::Garnish);
    let stew = b.register_ingredient("leftover stew", IngredientCategory::Starch);

    let hot_toss = StepKind::Action {
        action: ActionType::StirFry,
        params: ActionParams {
            min_temperature: Some(Fixed64::lit("180")),
            ..ActionParams::default()
        },
    };

    let rice_set = b.register_recipe("fried rice set");
    let fried_rice = b.register_bundle(rice_set, "fried rice", CookingType::Hot, true, true, 1);
    let s0 = b.register_step(fried_rice, 0, StepKind::Ingredient, None);
    b.register_requirement(s0, rice, 300, Unit::Grams, "Day-old rice");
    b.register_requirement(s0, egg, 2, Unit::Pieces, "Eggs");
    b.register_step(fried_rice, 1, hot_toss.clone(), None);
    let s2 = b.register_step(fried_rice, 2, StepKind::Ingredient, None);
    b.register_requirement(s2, soy, 30, Unit::Milliliters, "Soy sauce");
    b.register_step(fried_rice, 3, hot_toss, None);

    let fried_shrimp =
        b.register_bundle(rice_set, "fried shrimp", CookingType::Hot, false, false, 6);
    let s0 = b.register_step(fried_shrimp, 0, StepKind::Ingredient, None);
    b.register_requirement(s0, shrimp, 4, Unit::Pieces, "Shrimp");
    b.register_requirement(s0, batter, 100, Unit::Grams, "Batter");
    b.register_step(
        fried_shrimp,
        1,
        StepKind::Action {
            action: ActionType::DeepFry,
            params: ActionParams {
                required_duration: Some(120),
                ..ActionParams::default()
            },
        },
        None,
    );

    b.register_deco_rule(rice_set, 0, DecoSource::Bundle(fried_shrimp), None, 6);
    b.register_deco_rule(rice_set, 1, DecoSource::Garnish(sesame), Some(GridPos(4)), 5);
    b.register_deco_rule(rice_set, 2, DecoSource::Garnish(nori), None, 2);

    let soup_set = b.register_recipe("miso soup set");
    let miso_soup = b.register_bundle(soup_set, "miso soup", CookingType::Hot, true, false, 1);
    let s0 = b.register_step(miso_soup, 0, StepKind::Ingredient, None);
    b.register_requirement(s0, water, 500, Unit::Milliliters, "Water");
    b.register_step(
        miso_soup,
        1,
        StepKind::Action {
            action: ActionType::Boil,
            params: ActionParams::default(),
        },
        None,
    );
    let s2 = b.register_step(miso_soup, 2, StepKind::Ingredient, None);
    b.register_requirement(s2, miso, 50, Unit::Grams, "Miso paste");
    b.register_requirement(s2, tofu, 100, Unit::Grams, "Silken tofu");

    let reheat = b.register_recipe("reheat bowl");
    let bowl = b.register_bundle(reheat, "leftover bowl", CookingType::Hot, true, false, 1);
    let s0 = b.register_step(bowl, 0, StepKind::Ingredient, None);
    b.register_requirement(s0, stew, 400, Unit::Grams, "Leftover stew");
    b.register_step(
        bowl,
        1,
        StepKind::Action {
            action: ActionType::Microwave,
            params: ActionParams {
                required_duration: Some(60),
                power: Some(7),
                ..ActionParams::default()
            },
        },
        None,
    );

    b.build().unwrap()
}

// ===========================================================================
// Kitchen constructors
// ===========================================================================

pub fn fixture_kitchen(mode: EnforcementMode) -> Kitchen {
    fixture_kitchen_with(KitchenConfig {
        mode,
        ..KitchenConfig::default()
    })
}

pub fn fixture_kitchen_with(config: KitchenConfig) -> Kitchen {
    Kitchen::new(fixture_catalog(), config)
}

// ===========================================================================
// Lookup helpers
// ===========================================================================

/// Requirement at `row` of the `step`-th step of the named bundle.
pub fn req(catalog: &Catalog, bundle: &str, step: usize, row: usize) -> RequirementId {
    let bundle = catalog.bundle_id(bundle).unwrap();
    let step = catalog.steps_of(bundle).unwrap()[step];
    catalog.requirements_of(step).unwrap()[row]
}

/// Unwrap a command result all the way to its accepted value.
pub fn accept<T>(result: Result<Outcome<T>, KitchenError>) -> T {
    match result.unwrap() {
        Outcome::Accepted(value) => value,
        Outcome::Rejected(rejection) => panic!("unexpected rejection: {rejection}"),
    }
}

// ===========================================================================
// Service helpers
// ===========================================================================

/// Tick until the burner reaches `target` degrees. Panics if it never does.
pub fn heat_burner(kitchen: &mut Kitchen, burner: BurnerId, target: &str) {
    let target = Fixed64::lit(target);
    for _ in 0..2000 {
        if kitchen.burner(burner).is_some_and(|b| b.temperature >= target) {
            return;
        }
        kitchen.tick();
    }
    panic!("burner never reached {target}");
}

/// Drive an assigned fried rice bundle through all four steps.
/// Assumes its burner starts off and cold; leaves it off again, dirty-hot.
pub fn cook_fried_rice(kitchen: &mut Kitchen, instance: InstanceId) {
    let Location::Wok { burner } = kitchen.instance(instance).unwrap().location else {
        panic!("fried rice is not on a wok");
    };
    let rice = req(kitchen.catalog(), "fried rice", 0, 0);
    let egg = req(kitchen.catalog(), "fried rice", 0, 1);
    let soy = req(kitchen.catalog(), "fried rice", 2, 0);

    accept(kitchen.add_ingredient(instance, rice, 300));
    accept(kitchen.add_ingredient(instance, egg, 2));
    accept(kitchen.toggle_burner(burner));
    accept(kitchen.set_heat_level(burner, HeatLevel::High));
    heat_burner(kitchen, burner, "180");
    accept(kitchen.execute_action(instance, ActionType::StirFry));
    accept(kitchen.add_ingredient(instance, soy, 30));
    heat_burner(kitchen, burner, "180");
    accept(kitchen.execute_action(instance, ActionType::StirFry));
    accept(kitchen.toggle_burner(burner));
}

/// Fry a batch of shrimp for `order` in the given basket and route it to the
/// setting area. Returns the finished side's instance.
pub fn cook_fried_shrimp(kitchen: &mut Kitchen, order: OrderId, basket: BasketId) -> InstanceId {
    let bundle = kitchen.catalog().bundle_id("fried shrimp").unwrap();
    let shrimp = req(kitchen.catalog(), "fried shrimp", 0, 0);
    let batter = req(kitchen.catalog(), "fried shrimp", 0, 1);

    let id = accept(kitchen.assign_bundle(
        order,
        bundle,
        StationRef::Fryer(basket),
        AssignConfig::default(),
    ));
    accept(kitchen.add_ingredient(id, shrimp, 4));
    accept(kitchen.add_ingredient(id, batter, 100));
    accept(kitchen.lower_basket(basket));
    for _ in 0..120 {
        kitchen.tick();
    }
    accept(kitchen.lift_basket(basket));
    accept(kitchen.complete_bundle(id));
    accept(kitchen.route_after_plate(id, PlateKind::Flat));
    id
}
