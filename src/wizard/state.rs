//! Wizard state machine: tracks which question the user is answering.

use serde::{Deserialize, Serialize};

/// The steps of the personal-details conversation.
///
/// Progresses linearly: AwaitingSex → AwaitingAge → AwaitingHeight →
/// AwaitingWeight → AwaitingDiet → AwaitingConfirmation → Completed.
/// A negative answer at AwaitingConfirmation jumps back to AwaitingSex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    AwaitingSex,
    AwaitingAge,
    AwaitingHeight,
    AwaitingWeight,
    AwaitingDiet,
    AwaitingConfirmation,
    Completed,
}

impl WizardStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: WizardStep) -> bool {
        use WizardStep::*;
        matches!(
            (self, target),
            (AwaitingSex, AwaitingAge)
                | (AwaitingAge, AwaitingHeight)
                | (AwaitingHeight, AwaitingWeight)
                | (AwaitingWeight, AwaitingDiet)
                | (AwaitingDiet, AwaitingConfirmation)
                | (AwaitingConfirmation, Completed)
                | (AwaitingConfirmation, AwaitingSex)
        )
    }

    /// Whether the conversation is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Get the next step in the forward progression, if any.
    pub fn next(&self) -> Option<WizardStep> {
        use WizardStep::*;
        match self {
            AwaitingSex => Some(AwaitingAge),
            AwaitingAge => Some(AwaitingHeight),
            AwaitingHeight => Some(AwaitingWeight),
            AwaitingWeight => Some(AwaitingDiet),
            AwaitingDiet => Some(AwaitingConfirmation),
            AwaitingConfirmation => Some(Completed),
            Completed => None,
        }
    }

    /// Whether free text typed by the user is interpreted as an answer.
    ///
    /// Sex and confirmation are answered with buttons only.
    pub fn accepts_text(&self) -> bool {
        matches!(
            self,
            Self::AwaitingAge | Self::AwaitingHeight | Self::AwaitingWeight | Self::AwaitingDiet
        )
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::AwaitingSex
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingSex => "awaiting_sex",
            Self::AwaitingAge => "awaiting_age",
            Self::AwaitingHeight => "awaiting_height",
            Self::AwaitingWeight => "awaiting_weight",
            Self::AwaitingDiet => "awaiting_diet",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}
