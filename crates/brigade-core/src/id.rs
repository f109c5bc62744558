use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a live bundle instance on the line.
    pub struct InstanceId;

    /// Identifies an order on the board.
    pub struct OrderId;
}

/// Identifies a recipe (a sellable menu entry) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

/// Identifies a bundle (one cookable component of a recipe) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleId(pub u32);

/// Identifies a step within a bundle's cooking sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub u32);

/// Identifies an ingredient requirement attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementId(pub u32);

/// Identifies an ingredient in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientId(pub u32);

/// Identifies a plating rule for a recipe's decoration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecoRuleId(pub u32);

/// Identifies a wok burner on the range. Burners are a fixed bank, indexed from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BurnerId(pub u8);

/// Identifies a fryer basket. Baskets are a fixed bank, indexed from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BasketId(pub u8);

/// A cell on the 3x3 plating grid, row-major, 0 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos(pub u8);

impl GridPos {
    /// Number of cells on the plating grid.
    pub const CELLS: u8 = 9;

    /// Whether this position lands on the grid at all.
    pub fn in_grid(self) -> bool {
        self.0 < Self::CELLS
    }

    pub fn row(self) -> u8 {
        self.0 / 3
    }

    pub fn col(self) -> u8 {
        self.0 % 3
    }
}
