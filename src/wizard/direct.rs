//! Direct input form: every answer at once, validated with the same rules
//! as the chat wizard.

use serde::Deserialize;

use super::finalize::{FinalizeOutcome, Finalizer, SubmissionGuard};
use super::model::{DietPreference, PersonalInfo, Sex};
use super::validation::{ValidationError, parse_age, parse_height, parse_weight};
use crate::error::SubmissionError;

/// Shown when the form is submitted without a sex.
pub const MISSING_SEX_MESSAGE: &str = "성별을 선택해주세요.";
/// Shown when the form is submitted without a diet.
pub const MISSING_DIET_MESSAGE: &str = "다이어트 방식을 선택해주세요.";

/// The form as posted by the client. Numbers arrive as the raw text of the
/// input boxes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectForm {
    pub sex: Option<Sex>,
    pub age: String,
    #[serde(alias = "heightCm")]
    pub height: String,
    #[serde(alias = "weightKg")]
    pub weight: String,
    #[serde(alias = "dietPreference")]
    pub diet: Option<DietPreference>,
}

impl Default for DirectForm {
    fn default() -> Self {
        Self {
            sex: None,
            age: "25".to_string(),
            height: "160".to_string(),
            weight: "50".to_string(),
            diet: None,
        }
    }
}

impl DirectForm {
    /// Validate every field, reporting the first problem in form order.
    pub fn validate(&self) -> Result<PersonalInfo, SubmissionError> {
        let sex = self.sex.ok_or_else(|| SubmissionError::Invalid {
            field: "sex".to_string(),
            message: MISSING_SEX_MESSAGE.to_string(),
        })?;
        let age = parse_age(&self.age).map_err(invalid)?;
        let height_cm = parse_height(&self.height).map_err(invalid)?;
        let weight_kg = parse_weight(&self.weight).map_err(invalid)?;
        let diet = self.diet.ok_or_else(|| SubmissionError::Invalid {
            field: "diet".to_string(),
            message: MISSING_DIET_MESSAGE.to_string(),
        })?;

        Ok(PersonalInfo {
            sex: sex.label().to_string(),
            age,
            height_cm,
            weight_kg,
            diet: diet.label().to_string(),
        })
    }

    /// Validate, then run the shared finalize sequence under `guard`.
    pub async fn submit(
        &self,
        finalizer: &Finalizer,
        guard: &SubmissionGuard,
    ) -> Result<FinalizeOutcome, SubmissionError> {
        let profile = self.validate()?;
        finalizer.submit_profile(guard, profile).await
    }
}

fn invalid(e: ValidationError) -> SubmissionError {
    SubmissionError::Invalid {
        field: e.field.to_string(),
        message: e.message.to_string(),
    }
}
