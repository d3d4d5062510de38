//! Personal-details wizard.
//!
//! A conversational flow that collects sex, age, height, weight and diet one
//! question at a time:
//!
//! ```text
//! AwaitingSex → AwaitingAge → AwaitingHeight → AwaitingWeight
//!     → AwaitingDiet → AwaitingConfirmation → Completed
//!                              │
//!                              └─ "no" → AwaitingSex (draft cleared)
//! ```
//!
//! [`machine::Wizard`] holds the pure transition logic. [`session::WizardSession`]
//! wraps it with a transcript, typing delays and subscribers, and
//! [`finalize::Finalizer`] submits the result. [`direct::DirectForm`] is the
//! single-screen alternative that shares validation and finalization.

pub mod direct;
pub mod finalize;
pub mod machine;
pub mod model;
pub mod prompts;
pub mod session;
pub mod state;
pub mod transcript;
pub mod validation;
pub mod ws;

pub use direct::DirectForm;
pub use finalize::{FinalizeOutcome, Finalizer, SubmissionGuard, SubmissionState};
pub use machine::{Confirmation, Selection, Wizard, WizardInput};
pub use model::{CollectedProfile, DietPreference, PersonalInfo, Sex};
pub use session::{SessionEvent, SessionRegistry, SessionSnapshot, WizardSession};
pub use state::WizardStep;
pub use transcript::{Speaker, Transcript, TranscriptEntry};
pub use ws::wizard_routes;
