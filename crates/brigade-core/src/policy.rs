use serde::{Deserialize, Serialize};

/// Difficulty switch injected once at kitchen construction.
///
/// Strict rejects mismatched play (wrong ingredient, wrong amount, wrong
/// action, out-of-order deco) with no state change. Lenient accepts the same
/// play, records a mistake on the instance, and lets physics fall where it
/// may. Physical preconditions (pan too cold, water not boiling, timer not
/// elapsed) hold in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnforcementMode {
    #[default]
    Strict,
    Lenient,
}

impl EnforcementMode {
    pub fn is_strict(self) -> bool {
        matches!(self, EnforcementMode::Strict)
    }

    pub fn is_lenient(self) -> bool {
        matches!(self, EnforcementMode::Lenient)
    }
}
