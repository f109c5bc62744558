use crate::fixed::{Fixed64, Ticks};
use crate::id::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a bundle is cooked on a station or assembled cold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookingType {
    Hot,
    Cold,
}

/// Measurement unit for an ingredient requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Grams,
    Milliliters,
    Pieces,
}

/// Broad ingredient class. Drives the thermal side effect of dropping the
/// ingredient into a hot wok, and marks water-like liquids that switch the
/// burner into the water-heating model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngredientCategory {
    Protein,
    Vegetable,
    Aromatic,
    Fat,
    Sauce,
    Starch,
    Liquid,
    Garnish,
}

impl IngredientCategory {
    /// Temperature drop applied to the receiving pan (or its water) when a
    /// portion of this category lands in it. Bigger, wetter loads pull more heat.
    pub fn feed_temp_drop(self) -> Fixed64 {
        match self {
            IngredientCategory::Liquid => Fixed64::lit("40"),
            IngredientCategory::Protein => Fixed64::lit("30"),
            IngredientCategory::Starch => Fixed64::lit("20"),
            IngredientCategory::Vegetable => Fixed64::lit("15"),
            IngredientCategory::Sauce => Fixed64::lit("10"),
            IngredientCategory::Fat | IngredientCategory::Aromatic => Fixed64::lit("5"),
            IngredientCategory::Garnish => Fixed64::ZERO,
        }
    }

    /// Water-like liquids flood the pan and switch it to the water model.
    pub fn is_water_like(self) -> bool {
        matches!(self, IngredientCategory::Liquid)
    }
}

/// Player-performed (or, for deep-frying, timer-driven) cooking action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    StirFry,
    Boil,
    DeepFry,
    Microwave,
}

/// Parameters attached to an action step. All optional; which ones are
/// meaningful depends on the action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionParams {
    /// Seconds the station timer must run before the action can complete.
    pub required_duration: Option<Ticks>,
    /// Microwave power setting.
    pub power: Option<u8>,
    /// Minimum pan temperature for the action to take.
    pub min_temperature: Option<Fixed64>,
}

/// What a cooking step asks of the player.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Add ingredients; the step carries one requirement per ingredient.
    Ingredient,
    /// Perform a cooking action under the given parameters.
    Action {
        action: ActionType,
        params: ActionParams,
    },
}

/// A sellable menu entry. Orders reference recipes; recipes group bundles.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    /// Display name shown on the order board.
    pub menu_name: String,
}

/// One cookable component of a recipe.
#[derive(Debug, Clone)]
pub struct BundleDef {
    pub recipe: RecipeId,
    pub name: String,
    pub cooking_type: CookingType,
    /// Main dishes go to the main plate and receive decoration; the rest
    /// merge into a main from the setting area.
    pub is_main_dish: bool,
    pub deco_required: bool,
    /// Portions produced by one cook; drawn down by partial merges.
    pub portion_yield: u32,
}

/// One step in a bundle's cooking sequence.
#[derive(Debug, Clone)]
pub struct StepDef {
    pub bundle: BundleId,
    /// Position in the sequence, contiguous from 0.
    pub order: u32,
    pub kind: StepKind,
    /// Optional pacing hint surfaced to the UI; the core does not enforce it.
    pub time_limit: Option<Ticks>,
}

/// An ingredient demand attached to an ingredient step.
#[derive(Debug, Clone)]
pub struct RequirementDef {
    pub step: StepId,
    pub ingredient: IngredientId,
    pub amount: u32,
    pub unit: Unit,
    /// Label shown in the requirement row.
    pub display_name: String,
}

/// An ingredient definition.
#[derive(Debug, Clone)]
pub struct IngredientDef {
    pub name: String,
    pub category: IngredientCategory,
}

/// Where a plating rule's material comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoSource {
    /// A garnish item applied directly from the pantry.
    Garnish(IngredientId),
    /// A cooked bundle merged in from the setting area.
    Bundle(BundleId),
}

/// One rule of a recipe's plating phase. Rules are consumed in ascending
/// `order` and together define what a finished plate looks like.
#[derive(Debug, Clone)]
pub struct DecoRuleDef {
    pub recipe: RecipeId,
    /// Global ordering index within the recipe's plating sequence.
    pub order: u32,
    pub source: DecoSource,
    /// Required grid cell, or None when any cell is acceptable.
    pub position: Option<GridPos>,
    pub required_amount: u32,
}

/// Builder for constructing an immutable Catalog.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    bundles: Vec<BundleDef>,
    bundle_name_to_id: HashMap<String, BundleId>,
    ingredients: Vec<IngredientDef>,
    ingredient_name_to_id: HashMap<String, IngredientId>,
    steps: Vec<StepDef>,
    requirements: Vec<RequirementDef>,
    deco_rules: Vec<DecoRuleDef>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a recipe. Returns its ID.
    pub fn register_recipe(&mut self, menu_name: &str) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            menu_name: menu_name.to_string(),
        });
        self.recipe_name_to_id.insert(menu_name.to_string(), id);
        id
    }

    /// Phase 1: Register an ingredient. Returns its ID.
    pub fn register_ingredient(&mut self, name: &str, category: IngredientCategory) -> IngredientId {
        let id = IngredientId(self.ingredients.len() as u32);
        self.ingredients.push(IngredientDef {
            name: name.to_string(),
            category,
        });
        self.ingredient_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a bundle under a recipe. Returns its ID.
    pub fn register_bundle(
        &mut self,
        recipe: RecipeId,
        name: &str,
        cooking_type: CookingType,
        is_main_dish: bool,
        deco_required: bool,
        portion_yield: u32,
    ) -> BundleId {
        let id = BundleId(self.bundles.len() as u32);
        self.bundles.push(BundleDef {
            recipe,
            name: name.to_string(),
            cooking_type,
            is_main_dish,
            deco_required,
            portion_yield,
        });
        self.bundle_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a step in a bundle's sequence. Returns its ID.
    pub fn register_step(
        &mut self,
        bundle: BundleId,
        order: u32,
        kind: StepKind,
        time_limit: Option<Ticks>,
    ) -> StepId {
        let id = StepId(self.steps.len() as u32);
        self.steps.push(StepDef {
            bundle,
            order,
            kind,
            time_limit,
        });
        id
    }

    /// Phase 1: Register an ingredient requirement on a step. Returns its ID.
    pub fn register_requirement(
        &mut self,
        step: StepId,
        ingredient: IngredientId,
        amount: u32,
        unit: Unit,
        display_name: &str,
    ) -> RequirementId {
        let id = RequirementId(self.requirements.len() as u32);
        self.requirements.push(RequirementDef {
            step,
            ingredient,
            amount,
            unit,
            display_name: display_name.to_string(),
        });
        id
    }

    /// Phase 1: Register a plating rule for a recipe. Returns its ID.
    pub fn register_deco_rule(
        &mut self,
        recipe: RecipeId,
        order: u32,
        source: DecoSource,
        position: Option<GridPos>,
        required_amount: u32,
    ) -> DecoRuleId {
        let id = DecoRuleId(self.deco_rules.len() as u32);
        self.deco_rules.push(DecoRuleDef {
            recipe,
            order,
            source,
            position,
            required_amount,
        });
        id
    }

    /// Phase 2: Mutate an existing bundle by name.
    pub fn mutate_bundle<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut BundleDef),
    {
        let id = self
            .bundle_name_to_id
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        f(&mut self.bundles[id.0 as usize]);
        Ok(())
    }

    /// Lookup recipe ID by menu name.
    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Lookup bundle ID by name.
    pub fn bundle_id(&self, name: &str) -> Option<BundleId> {
        self.bundle_name_to_id.get(name).copied()
    }

    /// Lookup ingredient ID by name.
    pub fn ingredient_id(&self, name: &str) -> Option<IngredientId> {
        self.ingredient_name_to_id.get(name).copied()
    }

    /// Phase 3: Validate every cross-reference, freeze the definitions, and
    /// precompute the ordered lookup caches the validator walks every command.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        for (i, bundle) in self.bundles.iter().enumerate() {
            if bundle.recipe.0 as usize >= self.recipes.len() {
                return Err(CatalogError::BadRecipeRef(BundleId(i as u32), bundle.recipe));
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.bundle.0 as usize >= self.bundles.len() {
                return Err(CatalogError::BadBundleRef(StepId(i as u32), step.bundle));
            }
        }
        for (i, req) in self.requirements.iter().enumerate() {
            let id = RequirementId(i as u32);
            if req.step.0 as usize >= self.steps.len() {
                return Err(CatalogError::BadStepRef(id, req.step));
            }
            if req.ingredient.0 as usize >= self.ingredients.len() {
                return Err(CatalogError::BadIngredientRef(id, req.ingredient));
            }
        }
        for (i, rule) in self.deco_rules.iter().enumerate() {
            let id = DecoRuleId(i as u32);
            if rule.recipe.0 as usize >= self.recipes.len() {
                return Err(CatalogError::DecoBadRecipeRef(id, rule.recipe));
            }
            if let Some(pos) = rule.position
                && !pos.in_grid()
            {
                return Err(CatalogError::DecoOffGrid(id, pos));
            }
            match rule.source {
                DecoSource::Garnish(ing) => {
                    if ing.0 as usize >= self.ingredients.len() {
                        return Err(CatalogError::DecoBadSource(id));
                    }
                }
                DecoSource::Bundle(b) => {
                    if b.0 as usize >= self.bundles.len() {
                        return Err(CatalogError::DecoBadSource(id));
                    }
                    // A rule can only consume bundles of its own recipe.
                    if self.bundles[b.0 as usize].recipe != rule.recipe {
                        return Err(CatalogError::DecoForeignBundle(id, b));
                    }
                }
            }
        }

        // Per-bundle ordered step cache. Sequences must be contiguous from 0.
        let mut bundle_steps: Vec<Vec<(u32, StepId)>> = vec![Vec::new(); self.bundles.len()];
        for (i, step) in self.steps.iter().enumerate() {
            bundle_steps[step.bundle.0 as usize].push((step.order, StepId(i as u32)));
        }
        let mut steps_by_bundle = Vec::with_capacity(self.bundles.len());
        for (b, mut entries) in bundle_steps.into_iter().enumerate() {
            entries.sort_by_key(|(order, _)| *order);
            for (slot, (order, _)) in entries.iter().enumerate() {
                if *order != slot as u32 {
                    return Err(CatalogError::BrokenStepSequence {
                        bundle: BundleId(b as u32),
                        order: *order,
                    });
                }
            }
            steps_by_bundle.push(entries.into_iter().map(|(_, id)| id).collect::<Vec<_>>());
        }

        let mut requirements_by_step: Vec<Vec<RequirementId>> = vec![Vec::new(); self.steps.len()];
        for (i, req) in self.requirements.iter().enumerate() {
            requirements_by_step[req.step.0 as usize].push(RequirementId(i as u32));
        }

        let mut bundles_by_recipe: Vec<Vec<BundleId>> = vec![Vec::new(); self.recipes.len()];
        for (i, bundle) in self.bundles.iter().enumerate() {
            bundles_by_recipe[bundle.recipe.0 as usize].push(BundleId(i as u32));
        }

        // Per-recipe deco rules, ascending by ordering index, which must be unique.
        let mut deco_by_recipe: Vec<Vec<(u32, DecoRuleId)>> = vec![Vec::new(); self.recipes.len()];
        for (i, rule) in self.deco_rules.iter().enumerate() {
            deco_by_recipe[rule.recipe.0 as usize].push((rule.order, DecoRuleId(i as u32)));
        }
        let mut deco_rules_by_recipe = Vec::with_capacity(self.recipes.len());
        for (r, mut entries) in deco_by_recipe.into_iter().enumerate() {
            entries.sort_by_key(|(order, _)| *order);
            for pair in entries.windows(2) {
                if pair[0].0 == pair[1].0 {
                    return Err(CatalogError::DuplicateDecoOrder {
                        recipe: RecipeId(r as u32),
                        order: pair[0].0,
                    });
                }
            }
            deco_rules_by_recipe.push(entries.into_iter().map(|(_, id)| id).collect::<Vec<_>>());
        }

        Ok(Catalog {
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            bundles: self.bundles,
            bundle_name_to_id: self.bundle_name_to_id,
            ingredients: self.ingredients,
            ingredient_name_to_id: self.ingredient_name_to_id,
            steps: self.steps,
            requirements: self.requirements,
            deco_rules: self.deco_rules,
            steps_by_bundle,
            requirements_by_step,
            bundles_by_recipe,
            deco_rules_by_recipe,
        })
    }
}

/// Immutable catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Catalog {
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    bundles: Vec<BundleDef>,
    bundle_name_to_id: HashMap<String, BundleId>,
    ingredients: Vec<IngredientDef>,
    ingredient_name_to_id: HashMap<String, IngredientId>,
    steps: Vec<StepDef>,
    requirements: Vec<RequirementDef>,
    deco_rules: Vec<DecoRuleDef>,
    steps_by_bundle: Vec<Vec<StepId>>,
    requirements_by_step: Vec<Vec<RequirementId>>,
    bundles_by_recipe: Vec<Vec<BundleId>>,
    deco_rules_by_recipe: Vec<Vec<DecoRuleId>>,
}

impl Catalog {
    pub fn recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn bundle(&self, id: BundleId) -> Option<&BundleDef> {
        self.bundles.get(id.0 as usize)
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<&IngredientDef> {
        self.ingredients.get(id.0 as usize)
    }

    pub fn step(&self, id: StepId) -> Option<&StepDef> {
        self.steps.get(id.0 as usize)
    }

    pub fn requirement(&self, id: RequirementId) -> Option<&RequirementDef> {
        self.requirements.get(id.0 as usize)
    }

    pub fn deco_rule(&self, id: DecoRuleId) -> Option<&DecoRuleDef> {
        self.deco_rules.get(id.0 as usize)
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn bundle_id(&self, name: &str) -> Option<BundleId> {
        self.bundle_name_to_id.get(name).copied()
    }

    pub fn ingredient_id(&self, name: &str) -> Option<IngredientId> {
        self.ingredient_name_to_id.get(name).copied()
    }

    /// Steps of a bundle in cooking order.
    pub fn steps_of(&self, bundle: BundleId) -> Option<&[StepId]> {
        self.steps_by_bundle.get(bundle.0 as usize).map(Vec::as_slice)
    }

    /// Requirements attached to a step, in registration order.
    pub fn requirements_of(&self, step: StepId) -> Option<&[RequirementId]> {
        self.requirements_by_step
            .get(step.0 as usize)
            .map(Vec::as_slice)
    }

    /// Bundles belonging to a recipe.
    pub fn bundles_of(&self, recipe: RecipeId) -> Option<&[BundleId]> {
        self.bundles_by_recipe
            .get(recipe.0 as usize)
            .map(Vec::as_slice)
    }

    /// Plating rules of a recipe, ascending by ordering index.
    pub fn deco_rules_of(&self, recipe: RecipeId) -> Option<&[DecoRuleId]> {
        self.deco_rules_by_recipe
            .get(recipe.0 as usize)
            .map(Vec::as_slice)
    }

    /// The timed action a bundle cooks under, if any. Used to validate the
    /// timer and power supplied when the bundle is assigned to a station.
    pub fn timed_action(&self, bundle: BundleId) -> Option<(ActionType, ActionParams)> {
        for step_id in self.steps_of(bundle)? {
            if let Some(StepDef {
                kind: StepKind::Action { action, params },
                ..
            }) = self.step(*step_id)
                && params.required_duration.is_some()
            {
                return Some((*action, *params));
            }
        }
        None
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    pub fn ingredient_count(&self) -> usize {
        self.ingredients.len()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bundle {0:?} references missing recipe {1:?}")]
    BadRecipeRef(BundleId, RecipeId),
    #[error("step {0:?} references missing bundle {1:?}")]
    BadBundleRef(StepId, BundleId),
    #[error("requirement {0:?} references missing step {1:?}")]
    BadStepRef(RequirementId, StepId),
    #[error("requirement {0:?} references missing ingredient {1:?}")]
    BadIngredientRef(RequirementId, IngredientId),
    #[error("bundle {bundle:?} step sequence is not contiguous at order {order}")]
    BrokenStepSequence { bundle: BundleId, order: u32 },
    #[error("recipe {recipe:?} declares two deco rules at order {order}")]
    DuplicateDecoOrder { recipe: RecipeId, order: u32 },
    #[error("deco rule {0:?} references missing recipe {1:?}")]
    DecoBadRecipeRef(DecoRuleId, RecipeId),
    #[error("deco rule {0:?} references a missing source")]
    DecoBadSource(DecoRuleId),
    #[error("deco rule {0:?} positions off the plating grid: {1:?}")]
    DecoOffGrid(DecoRuleId, GridPos),
    #[error("deco rule {0:?} consumes bundle {1:?} from a different recipe")]
    DecoForeignBundle(DecoRuleId, BundleId),
}
