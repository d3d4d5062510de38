//! The wizard's transition logic, free of timers and I/O.
//!
//! [`Wizard::handle`] consumes one user event and returns a [`Turn`]: the
//! entry to echo for the user plus the assistant replies to deliver, each
//! tagged with how long the bot should appear to type. The session layer
//! owns the clock.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{CollectedProfile, DietPreference, Sex};
use super::prompts;
use super::state::WizardStep;
use super::validation::{match_diet, parse_age, parse_height, parse_weight};
use crate::error::WizardError;

/// Answer to the confirmation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Yes,
    No,
}

impl Confirmation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Yes => prompts::CONFIRM_YES_LABEL,
            Self::No => prompts::CONFIRM_NO_LABEL,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("yes") || raw == prompts::CONFIRM_YES_LABEL {
            Some(Self::Yes)
        } else if raw.eq_ignore_ascii_case("no") || raw == prompts::CONFIRM_NO_LABEL {
            Some(Self::No)
        } else {
            None
        }
    }
}

/// A button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selection {
    Sex(Sex),
    Diet(DietPreference),
    Confirm(Confirmation),
}

impl Selection {
    /// Build a selection from loosely typed `kind`/`value` strings.
    pub fn parse(kind: &str, value: &str) -> Result<Self, WizardError> {
        let unknown = || WizardError::UnknownOption {
            kind: kind.to_string(),
            value: value.to_string(),
        };
        match kind.trim() {
            "sex" => Sex::parse(value).map(Self::Sex).ok_or_else(unknown),
            "diet" => match_diet(value).map(Self::Diet).ok_or_else(unknown),
            "confirm" => Confirmation::parse(value).map(Self::Confirm).ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    /// Text echoed into the transcript as the user's entry.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sex(s) => s.label(),
            Self::Diet(d) => d.label(),
            Self::Confirm(c) => c.label(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Sex(_) => "sex selection",
            Self::Diet(_) => "diet selection",
            Self::Confirm(_) => "confirmation",
        }
    }
}

/// One user event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    /// Free text from the input box.
    Text(String),
    /// A button or chip.
    Select(Selection),
}

/// How long the bot waits before a reply lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDelay {
    /// Appended together with the event, no typing delay.
    None,
    /// The ordinary typing delay.
    Short,
    /// The longer delay used for the rendered summary.
    Summary,
}

/// An assistant message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub delay: ReplyDelay,
    pub text: String,
}

impl BotReply {
    fn now(text: impl Into<String>) -> Self {
        Self {
            delay: ReplyDelay::None,
            text: text.into(),
        }
    }

    fn short(text: impl Into<String>) -> Self {
        Self {
            delay: ReplyDelay::Short,
            text: text.into(),
        }
    }

    fn summary(text: impl Into<String>) -> Self {
        Self {
            delay: ReplyDelay::Summary,
            text: text.into(),
        }
    }
}

/// The result of handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    /// The user's entry, appended synchronously.
    pub user_entry: Option<String>,
    /// Assistant replies in delivery order.
    pub replies: Vec<BotReply>,
    /// Set when the step changed.
    pub transition: Option<(WizardStep, WizardStep)>,
}

impl Turn {
    /// True for ignored input (blank text).
    pub fn is_empty(&self) -> bool {
        self.user_entry.is_none() && self.replies.is_empty()
    }
}

/// Step and draft of one conversation.
#[derive(Debug, Clone, Default)]
pub struct Wizard {
    step: WizardStep,
    profile: CollectedProfile,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn profile(&self) -> &CollectedProfile {
        &self.profile
    }

    /// The message that opens every conversation.
    pub fn greeting() -> BotReply {
        BotReply::now(prompts::GREETING)
    }

    /// Return to the first question with an empty draft.
    pub fn reset(&mut self) -> BotReply {
        self.step = WizardStep::AwaitingSex;
        self.profile.clear();
        Self::greeting()
    }

    /// Handle one event.
    ///
    /// Rejected answers are not errors: they produce a turn whose reply
    /// explains the problem and leave the step unchanged. Errors are reserved
    /// for events that are not offered at the current step.
    pub fn handle(&mut self, input: WizardInput) -> Result<Turn, WizardError> {
        match input {
            WizardInput::Text(raw) => self.handle_text(&raw),
            WizardInput::Select(selection) => self.handle_selection(selection),
        }
    }

    fn handle_text(&mut self, raw: &str) -> Result<Turn, WizardError> {
        let text = raw.trim();
        if text.is_empty() {
            return Ok(Turn::default());
        }
        if self.step.is_terminal() {
            return Err(self.unexpected("text input"));
        }

        let from = self.step;
        let replies = match self.step {
            WizardStep::AwaitingSex | WizardStep::AwaitingConfirmation => {
                vec![BotReply::short(prompts::USE_BUTTONS)]
            }
            WizardStep::AwaitingAge => match parse_age(text) {
                Ok(age) => {
                    self.profile.age = Some(age);
                    self.advance(WizardStep::AwaitingHeight);
                    vec![BotReply::short(prompts::ASK_HEIGHT)]
                }
                Err(e) => vec![BotReply::short(e.message)],
            },
            WizardStep::AwaitingHeight => match parse_height(text) {
                Ok(height) => {
                    self.profile.height_cm = Some(height);
                    self.advance(WizardStep::AwaitingWeight);
                    vec![BotReply::short(prompts::ASK_WEIGHT)]
                }
                Err(e) => vec![BotReply::short(e.message)],
            },
            WizardStep::AwaitingWeight => match parse_weight(text) {
                Ok(weight) => {
                    self.profile.weight_kg = Some(weight);
                    self.advance(WizardStep::AwaitingDiet);
                    vec![BotReply::short(prompts::ASK_DIET)]
                }
                Err(e) => vec![BotReply::short(e.message)],
            },
            WizardStep::AwaitingDiet => match match_diet(text) {
                Some(diet) => self.choose_diet(diet),
                None => vec![BotReply::short(prompts::unknown_diet())],
            },
            WizardStep::Completed => unreachable!("terminal step handled above"),
        };

        Ok(self.turn(from, text.to_string(), replies))
    }

    fn handle_selection(&mut self, selection: Selection) -> Result<Turn, WizardError> {
        let from = self.step;
        let replies = match (self.step, selection) {
            (WizardStep::AwaitingSex, Selection::Sex(sex)) => {
                self.profile.sex = Some(sex);
                self.advance(WizardStep::AwaitingAge);
                vec![BotReply::short(prompts::ASK_AGE)]
            }
            (WizardStep::AwaitingDiet, Selection::Diet(diet)) => self.choose_diet(diet),
            (WizardStep::AwaitingConfirmation, Selection::Confirm(Confirmation::Yes)) => {
                self.advance(WizardStep::Completed);
                vec![BotReply::short(prompts::CONFIRMED)]
            }
            (WizardStep::AwaitingConfirmation, Selection::Confirm(Confirmation::No)) => {
                self.profile.clear();
                self.advance(WizardStep::AwaitingSex);
                vec![BotReply::short(prompts::RESTART)]
            }
            _ => return Err(self.unexpected(selection.name())),
        };

        Ok(self.turn(from, selection.label().to_string(), replies))
    }

    fn choose_diet(&mut self, diet: DietPreference) -> Vec<BotReply> {
        self.profile.diet_preference = Some(diet);
        self.advance(WizardStep::AwaitingConfirmation);
        vec![
            BotReply::short(prompts::SUMMARY_INTRO),
            BotReply::summary(prompts::summary(&self.profile)),
        ]
    }

    fn advance(&mut self, target: WizardStep) {
        debug_assert!(
            self.step.can_transition_to(target),
            "illegal wizard transition {} -> {}",
            self.step,
            target
        );
        debug!(from = %self.step, to = %target, "Wizard step advanced");
        self.step = target;
    }

    fn turn(&self, from: WizardStep, user_entry: String, replies: Vec<BotReply>) -> Turn {
        Turn {
            user_entry: Some(user_entry),
            replies,
            transition: (from != self.step).then_some((from, self.step)),
        }
    }

    fn unexpected(&self, event: &str) -> WizardError {
        WizardError::UnexpectedEvent {
            step: self.step,
            event: event.to_string(),
        }
    }
}
