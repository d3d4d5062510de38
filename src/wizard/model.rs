//! Profile data models: the draft collected by the wizard and the finalized
//! snapshot handed to the preferences service.

use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;

/// Biological sex as asked by the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    /// Canonical short value, e.g. `"male"`.
    pub fn value(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Label shown to the user and sent to the backend.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "남성",
            Self::Female => "여성",
        }
    }

    /// Parse either the canonical value or the label.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.value().eq_ignore_ascii_case(raw) || s.label() == raw)
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The five supported dietary styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietPreference {
    Balanced,
    #[serde(rename = "lowcarb")]
    LowCarb,
    Keto,
    #[serde(rename = "highprotein")]
    HighProtein,
    Intermittent,
}

impl DietPreference {
    pub const ALL: [DietPreference; 5] = [
        DietPreference::Balanced,
        DietPreference::LowCarb,
        DietPreference::Keto,
        DietPreference::HighProtein,
        DietPreference::Intermittent,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::LowCarb => "lowcarb",
            Self::Keto => "keto",
            Self::HighProtein => "highprotein",
            Self::Intermittent => "intermittent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Balanced => "균형식",
            Self::LowCarb => "저탄고지",
            Self::Keto => "키토",
            Self::HighProtein => "고단백",
            Self::Intermittent => "간헐적 단식",
        }
    }
}

impl std::fmt::Display for DietPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// In-progress answers. Every field starts unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedProfile {
    pub sex: Option<Sex>,
    pub age: Option<u32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub diet_preference: Option<DietPreference>,
}

impl CollectedProfile {
    /// All five answers are present.
    pub fn is_complete(&self) -> bool {
        self.sex.is_some()
            && self.age.is_some()
            && self.height_cm.is_some()
            && self.weight_kg.is_some()
            && self.diet_preference.is_some()
    }

    /// Drop every answer.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Snapshot the draft into a profile with display labels.
    ///
    /// Fails with [`SubmissionError::Incomplete`] if any field is missing.
    pub fn finalize(&self) -> Result<PersonalInfo, SubmissionError> {
        match (
            self.sex,
            self.age,
            self.height_cm,
            self.weight_kg,
            self.diet_preference,
        ) {
            (Some(sex), Some(age), Some(height_cm), Some(weight_kg), Some(diet)) => {
                Ok(PersonalInfo {
                    sex: sex.label().to_string(),
                    age,
                    height_cm,
                    weight_kg,
                    diet: diet.label().to_string(),
                })
            }
            _ => Err(SubmissionError::Incomplete {
                message: INCOMPLETE_PROFILE_MESSAGE.to_string(),
            }),
        }
    }
}

/// Shown when finalize is attempted with missing answers.
pub const INCOMPLETE_PROFILE_MESSAGE: &str =
    "입력 정보가 부족합니다. 성별/나이/키/몸무게/다이어트를 모두 입력해주세요.";

/// Finalized personal details, as sent to the backend and kept in the
/// profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    /// Sex label (`"남성"` / `"여성"`).
    pub sex: String,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// Diet label, e.g. `"저탄고지"`.
    pub diet: String,
}

impl PersonalInfo {
    /// Body mass index: weight / (height in metres)².
    pub fn bmi(&self) -> f64 {
        let height_m = self.height_cm / 100.0;
        self.weight_kg / (height_m * height_m)
    }

    /// BMI rounded to one decimal for display.
    pub fn bmi_display(&self) -> String {
        format!("{:.1}", self.bmi())
    }
}
