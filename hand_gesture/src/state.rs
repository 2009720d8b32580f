//! The two-valued interaction state shared by the classifier's consumer and
//! the morph engine.

use serde::{Deserialize, Serialize};

/// Which configuration the particle ensemble is heading toward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionState {
    /// Particles drift in a loose cloud.
    #[default]
    Scattered,
    /// Particles assemble into the tree silhouette.
    Formed,
}

impl InteractionState {
    /// Morph factor this state pulls toward.
    pub fn morph_target(self) -> f32 {
        match self {
            InteractionState::Scattered => 0.0,
            InteractionState::Formed    => 1.0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            InteractionState::Scattered => InteractionState::Formed,
            InteractionState::Formed    => InteractionState::Scattered,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InteractionState::Scattered => "scattered",
            InteractionState::Formed    => "formed",
        }
    }
}
