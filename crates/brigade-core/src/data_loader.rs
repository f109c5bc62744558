//! Data-driven menu loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`CatalogBuilder`] for menus defined in data files. Steps and deco rules
//! take their ordering from array position; ingredient and bundle references
//! are resolved by name.

use crate::catalog::{
    ActionParams, ActionType, CatalogBuilder, CatalogError, CookingType, DecoSource,
    IngredientCategory, StepKind, Unit,
};
use crate::fixed::{Fixed64, Ticks};
use crate::id::GridPos;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during menu loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("unknown ingredient reference: {0}")]
    UnknownIngredientRef(String),
    #[error("unknown bundle reference: {0}")]
    UnknownBundleRef(String),
    #[error("unknown {kind} keyword: {value}")]
    UnknownKeyword { kind: &'static str, value: String },
    #[error("step declares both an action and ingredients")]
    MixedStep,
    #[error("deco rule needs exactly one of garnish/bundle")]
    BadDecoSource,
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level menu data structure for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct MenuData {
    #[serde(default)]
    pub ingredients: Vec<IngredientData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
}

/// JSON representation of a pantry ingredient.
#[derive(Debug, serde::Deserialize)]
pub struct IngredientData {
    pub name: String,
    pub category: String, // "protein", "starch", "liquid", ...
}

/// JSON representation of a sellable recipe.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    pub menu_name: String,
    #[serde(default)]
    pub bundles: Vec<BundleData>,
    #[serde(default)]
    pub deco_rules: Vec<DecoRuleData>,
}

/// JSON representation of one cookable bundle of a recipe.
#[derive(Debug, serde::Deserialize)]
pub struct BundleData {
    pub name: String,
    pub cooking_type: String, // "hot" or "cold"
    #[serde(default)]
    pub is_main_dish: bool,
    #[serde(default)]
    pub deco_required: bool,
    pub portion_yield: u32,
    #[serde(default)]
    pub steps: Vec<StepData>,
}

/// JSON representation of a cooking step. Ordered by array position.
/// Either `action` or `ingredients` must be present, never both.
#[derive(Debug, serde::Deserialize)]
pub struct StepData {
    #[serde(default)]
    pub action: Option<String>, // "stir_fry", "boil", "deep_fry", "microwave"
    #[serde(default)]
    pub ingredients: Vec<RequirementData>,
    #[serde(default)]
    pub required_duration: Option<Ticks>,
    #[serde(default)]
    pub power: Option<u8>,
    #[serde(default)]
    pub min_temperature: Option<f64>,
    #[serde(default)]
    pub time_limit: Option<Ticks>,
}

/// JSON representation of one ingredient demand (references by name).
#[derive(Debug, serde::Deserialize)]
pub struct RequirementData {
    pub ingredient: String,
    pub amount: u32,
    pub unit: String, // "grams", "milliliters", "pieces"
    #[serde(default)]
    pub display_name: Option<String>,
}

/// JSON representation of a plating rule. Ordered by array position.
#[derive(Debug, serde::Deserialize)]
pub struct DecoRuleData {
    #[serde(default)]
    pub garnish: Option<String>, // ingredient by name
    #[serde(default)]
    pub bundle: Option<String>, // bundle by name, same recipe
    #[serde(default)]
    pub position: Option<u8>, // grid cell 0..9
    pub amount: u32,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a menu from a JSON string.
pub fn load_menu_json(json: &str) -> Result<CatalogBuilder, DataLoadError> {
    let data: MenuData = serde_json::from_str(json)?;
    build_menu(data)
}

/// Load a menu from JSON bytes.
pub fn load_menu_json_bytes(bytes: &[u8]) -> Result<CatalogBuilder, DataLoadError> {
    let data: MenuData = serde_json::from_slice(bytes)?;
    build_menu(data)
}

fn parse_category(value: &str) -> Result<IngredientCategory, DataLoadError> {
    Ok(match value {
        "protein" => IngredientCategory::Protein,
        "vegetable" => IngredientCategory::Vegetable,
        "aromatic" => IngredientCategory::Aromatic,
        "fat" => IngredientCategory::Fat,
        "sauce" => IngredientCategory::Sauce,
        "starch" => IngredientCategory::Starch,
        "liquid" => IngredientCategory::Liquid,
        "garnish" => IngredientCategory::Garnish,
        _ => {
            return Err(DataLoadError::UnknownKeyword {
                kind: "category",
                value: value.to_string(),
            });
        }
    })
}

fn parse_unit(value: &str) -> Result<Unit, DataLoadError> {
    Ok(match value {
        "grams" => Unit::Grams,
        "milliliters" => Unit::Milliliters,
        "pieces" => Unit::Pieces,
        _ => {
            return Err(DataLoadError::UnknownKeyword {
                kind: "unit",
                value: value.to_string(),
            });
        }
    })
}

fn parse_action(value: &str) -> Result<ActionType, DataLoadError> {
    Ok(match value {
        "stir_fry" => ActionType::StirFry,
        "boil" => ActionType::Boil,
        "deep_fry" => ActionType::DeepFry,
        "microwave" => ActionType::Microwave,
        _ => {
            return Err(DataLoadError::UnknownKeyword {
                kind: "action",
                value: value.to_string(),
            });
        }
    })
}

fn parse_cooking_type(value: &str) -> Result<CookingType, DataLoadError> {
    Ok(match value {
        "hot" => CookingType::Hot,
        "cold" => CookingType::Cold,
        _ => {
            return Err(DataLoadError::UnknownKeyword {
                kind: "cooking type",
                value: value.to_string(),
            });
        }
    })
}

fn parse_step_kind(step: &StepData) -> Result<StepKind, DataLoadError> {
    match &step.action {
        Some(name) => {
            if !step.ingredients.is_empty() {
                return Err(DataLoadError::MixedStep);
            }
            Ok(StepKind::Action {
                action: parse_action(name)?,
                params: ActionParams {
                    required_duration: step.required_duration,
                    power: step.power,
                    min_temperature: step.min_temperature.map(Fixed64::from_num),
                },
            })
        }
        None => Ok(StepKind::Ingredient),
    }
}

fn build_menu(data: MenuData) -> Result<CatalogBuilder, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    // Phase 1: Register all ingredients.
    for ingredient in &data.ingredients {
        builder.register_ingredient(&ingredient.name, parse_category(&ingredient.category)?);
    }

    // Phase 2: Per recipe, register bundles with their steps and requirements,
    // then the recipe's deco rules (which may reference those bundles by name).
    for recipe in &data.recipes {
        let recipe_id = builder.register_recipe(&recipe.menu_name);

        for bundle in &recipe.bundles {
            let bundle_id = builder.register_bundle(
                recipe_id,
                &bundle.name,
                parse_cooking_type(&bundle.cooking_type)?,
                bundle.is_main_dish,
                bundle.deco_required,
                bundle.portion_yield,
            );
            for (order, step) in bundle.steps.iter().enumerate() {
                let kind = parse_step_kind(step)?;
                let step_id =
                    builder.register_step(bundle_id, order as u32, kind, step.time_limit);
                for entry in &step.ingredients {
                    let ingredient_id = builder
                        .ingredient_id(&entry.ingredient)
                        .ok_or_else(|| {
                            DataLoadError::UnknownIngredientRef(entry.ingredient.clone())
                        })?;
                    let display_name = entry.display_name.as_deref().unwrap_or(&entry.ingredient);
                    builder.register_requirement(
                        step_id,
                        ingredient_id,
                        entry.amount,
                        parse_unit(&entry.unit)?,
                        display_name,
                    );
                }
            }
        }

        for (order, rule) in recipe.deco_rules.iter().enumerate() {
            let source = match (&rule.garnish, &rule.bundle) {
                (Some(name), None) => DecoSource::Garnish(
                    builder
                        .ingredient_id(name)
                        .ok_or_else(|| DataLoadError::UnknownIngredientRef(name.clone()))?,
                ),
                (None, Some(name)) => DecoSource::Bundle(
                    builder
                        .bundle_id(name)
                        .ok_or_else(|| DataLoadError::UnknownBundleRef(name.clone()))?,
                ),
                _ => return Err(DataLoadError::BadDecoSource),
            };
            builder.register_deco_rule(
                recipe_id,
                order as u32,
                source,
                rule.position.map(GridPos),
                rule.amount,
            );
        }
    }

    info!(
        ingredients = data.ingredients.len(),
        recipes = data.recipes.len(),
        "menu data loaded"
    );
    Ok(builder)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_empty_json() {
        let json = r#"{"ingredients": [], "recipes": []}"#;
        let builder = load_menu_json(json).unwrap();
        let catalog = builder.build().unwrap();
        assert_eq!(catalog.ingredient_count(), 0);
        assert_eq!(catalog.recipe_count(), 0);
    }

    #[test]
    fn load_ingredients_only() {
        let json = r#"{"ingredients": [
            {"name": "rice", "category": "starch"},
            {"name": "egg", "category": "protein"}
        ]}"#;
        let catalog = load_menu_json(json).unwrap().build().unwrap();
        assert_eq!(catalog.ingredient_count(), 2);
        assert!(catalog.ingredient_id("rice").is_some());
        let egg = catalog.ingredient_id("egg").unwrap();
        assert_eq!(
            catalog.ingredient(egg).unwrap().category,
            IngredientCategory::Protein
        );
    }

    #[test]
    fn load_full_menu() {
        let json = r#"{
            "ingredients": [
                {"name": "rice", "category": "starch"},
                {"name": "shrimp", "category": "protein"},
                {"name": "sesame", "category": "garnish"}
            ],
            "recipes": [{
                "menu_name": "fried rice set",
                "bundles": [
                    {
                        "name": "fried rice",
                        "cooking_type": "hot",
                        "is_main_dish": true,
                        "deco_required": true,
                        "portion_yield": 1,
                        "steps": [
                            {"ingredients": [{"ingredient": "rice", "amount": 300, "unit": "grams"}]},
                            {"action": "stir_fry", "min_temperature": 180.0}
                        ]
                    },
                    {
                        "name": "fried shrimp",
                        "cooking_type": "hot",
                        "portion_yield": 6,
                        "steps": [
                            {"ingredients": [{"ingredient": "shrimp", "amount": 4, "unit": "pieces"}]},
                            {"action": "deep_fry", "required_duration": 120}
                        ]
                    }
                ],
                "deco_rules": [
                    {"bundle": "fried shrimp", "amount": 6},
                    {"garnish": "sesame", "position": 4, "amount": 5}
                ]
            }]
        }"#;
        let catalog = load_menu_json(json).unwrap().build().unwrap();
        assert_eq!(catalog.recipe_count(), 1);
        assert_eq!(catalog.bundle_count(), 2);

        let recipe = catalog.recipe_id("fried rice set").unwrap();
        let shrimp = catalog.bundle_id("fried shrimp").unwrap();
        assert_eq!(catalog.bundles_of(recipe).unwrap().len(), 2);
        assert_eq!(catalog.deco_rules_of(recipe).unwrap().len(), 2);

        let (action, params) = catalog.timed_action(shrimp).unwrap();
        assert_eq!(action, ActionType::DeepFry);
        assert_eq!(params.required_duration, Some(120));
    }

    #[test]
    fn step_order_comes_from_array_position() {
        let json = r#"{
            "ingredients": [{"name": "water", "category": "liquid"}],
            "recipes": [{
                "menu_name": "soup",
                "bundles": [{
                    "name": "pot",
                    "cooking_type": "hot",
                    "portion_yield": 1,
                    "steps": [
                        {"ingredients": [{"ingredient": "water", "amount": 500, "unit": "milliliters"}]},
                        {"action": "boil"}
                    ]
                }]
            }]
        }"#;
        let catalog = load_menu_json(json).unwrap().build().unwrap();
        let pot = catalog.bundle_id("pot").unwrap();
        let steps = catalog.steps_of(pot).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(catalog.step(steps[0]).unwrap().kind, StepKind::Ingredient);
        assert!(matches!(
            catalog.step(steps[1]).unwrap().kind,
            StepKind::Action {
                action: ActionType::Boil,
                ..
            }
        ));
    }

    #[test]
    fn min_temperature_parses_to_fixed() {
        let json = r#"{
            "recipes": [{
                "menu_name": "toss",
                "bundles": [{
                    "name": "wok", "cooking_type": "hot", "portion_yield": 1,
                    "steps": [{"action": "stir_fry", "min_temperature": 180.0}]
                }]
            }]
        }"#;
        let catalog = load_menu_json(json).unwrap().build().unwrap();
        let wok = catalog.bundle_id("wok").unwrap();
        let step = catalog.steps_of(wok).unwrap()[0];
        let StepKind::Action { params, .. } = &catalog.step(step).unwrap().kind else {
            panic!("expected an action step");
        };
        assert_eq!(params.min_temperature, Some(Fixed64::lit("180")));
    }

    #[test]
    fn display_name_falls_back_to_ingredient() {
        let json = r#"{
            "ingredients": [{"name": "rice", "category": "starch"}],
            "recipes": [{
                "menu_name": "plain rice",
                "bundles": [{
                    "name": "rice bowl", "cooking_type": "hot", "portion_yield": 1,
                    "steps": [{"ingredients": [{"ingredient": "rice", "amount": 200, "unit": "grams"}]}]
                }]
            }]
        }"#;
        let catalog = load_menu_json(json).unwrap().build().unwrap();
        let bowl = catalog.bundle_id("rice bowl").unwrap();
        let step = catalog.steps_of(bowl).unwrap()[0];
        let req = catalog.requirements_of(step).unwrap()[0];
        assert_eq!(catalog.requirement(req).unwrap().display_name, "rice");
    }

    #[test]
    fn unknown_ingredient_fails() {
        let json = r#"{
            "recipes": [{
                "menu_name": "ghost",
                "bundles": [{
                    "name": "pan", "cooking_type": "hot", "portion_yield": 1,
                    "steps": [{"ingredients": [{"ingredient": "nonexistent", "amount": 1, "unit": "pieces"}]}]
                }]
            }]
        }"#;
        assert!(matches!(
            load_menu_json(json).unwrap_err(),
            DataLoadError::UnknownIngredientRef(_)
        ));
    }

    #[test]
    fn unknown_deco_bundle_fails() {
        let json = r#"{
            "recipes": [{
                "menu_name": "ghost",
                "deco_rules": [{"bundle": "nonexistent", "amount": 1}]
            }]
        }"#;
        assert!(matches!(
            load_menu_json(json).unwrap_err(),
            DataLoadError::UnknownBundleRef(_)
        ));
    }

    #[test]
    fn unknown_category_fails() {
        let json = r#"{"ingredients": [{"name": "rice", "category": "mineral"}]}"#;
        assert!(matches!(
            load_menu_json(json).unwrap_err(),
            DataLoadError::UnknownKeyword {
                kind: "category",
                ..
            }
        ));
    }

    #[test]
    fn mixed_step_fails() {
        let json = r#"{
            "ingredients": [{"name": "rice", "category": "starch"}],
            "recipes": [{
                "menu_name": "bad",
                "bundles": [{
                    "name": "pan", "cooking_type": "hot", "portion_yield": 1,
                    "steps": [{
                        "action": "stir_fry",
                        "ingredients": [{"ingredient": "rice", "amount": 1, "unit": "grams"}]
                    }]
                }]
            }]
        }"#;
        assert!(matches!(
            load_menu_json(json).unwrap_err(),
            DataLoadError::MixedStep
        ));
    }

    #[test]
    fn deco_rule_without_source_fails() {
        let json = r#"{
            "recipes": [{"menu_name": "bad", "deco_rules": [{"amount": 1}]}]
        }"#;
        assert!(matches!(
            load_menu_json(json).unwrap_err(),
            DataLoadError::BadDecoSource
        ));
    }

    #[test]
    fn load_invalid_json_fails() {
        let result = load_menu_json("not valid json {{{");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), DataLoadError::JsonParse(_)));
    }

    #[test]
    fn deco_position_off_grid_fails_at_build() {
        let json = r#"{
            "ingredients": [{"name": "sesame", "category": "garnish"}],
            "recipes": [{
                "menu_name": "bad",
                "deco_rules": [{"garnish": "sesame", "position": 9, "amount": 1}]
            }]
        }"#;
        let builder = load_menu_json(json).unwrap();
        assert!(matches!(
            builder.build(),
            Err(CatalogError::DecoOffGrid(_, _))
        ));
    }
}
