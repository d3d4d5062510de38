//! Answer validation shared by the chat wizard and the direct input form.

use super::model::DietPreference;

/// Which numeric field a rule guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Age,
    HeightCm,
    WeightKg,
}

impl std::fmt::Display for NumericField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Age => "age",
            Self::HeightCm => "heightCm",
            Self::WeightKg => "weightKg",
        };
        write!(f, "{s}")
    }
}

/// Bounds and error text for one numeric answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRule {
    pub field: NumericField,
    pub min: f64,
    /// When false the minimum itself is rejected.
    pub min_inclusive: bool,
    /// Always inclusive.
    pub max: f64,
    /// Reject fractional values.
    pub integer: bool,
    pub error_message: &'static str,
}

/// A rejected answer, with the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: NumericField,
    pub message: &'static str,
}

pub const AGE_RULE: NumericRule = NumericRule {
    field: NumericField::Age,
    min: 0.0,
    min_inclusive: false,
    max: 120.0,
    integer: true,
    error_message: "올바른 나이를 숫자로 입력해주세요! (1-120세)",
};

pub const HEIGHT_RULE: NumericRule = NumericRule {
    field: NumericField::HeightCm,
    min: 100.0,
    min_inclusive: true,
    max: 250.0,
    integer: false,
    error_message: "올바른 키를 숫자로 입력해주세요! (100-250cm)",
};

pub const WEIGHT_RULE: NumericRule = NumericRule {
    field: NumericField::WeightKg,
    min: 20.0,
    min_inclusive: true,
    max: 300.0,
    integer: false,
    error_message: "올바른 몸무게를 숫자로 입력해주세요! (20-300kg)",
};

/// The rule table, in the order the wizard asks.
pub const NUMERIC_RULES: [NumericRule; 3] = [AGE_RULE, HEIGHT_RULE, WEIGHT_RULE];

impl NumericRule {
    /// Whether an already-parsed value satisfies the bounds.
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let above_min = if self.min_inclusive {
            value >= self.min
        } else {
            value > self.min
        };
        above_min && value <= self.max && (!self.integer || value.fract() == 0.0)
    }

    /// Parse raw text and check it against the bounds.
    pub fn parse(&self, raw: &str) -> Result<f64, ValidationError> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| self.accepts(*v))
            .ok_or(ValidationError {
                field: self.field,
                message: self.error_message,
            })
    }
}

/// Parse an age answer.
pub fn parse_age(raw: &str) -> Result<u32, ValidationError> {
    // Integer and range checked by the rule; the cast cannot truncate.
    AGE_RULE.parse(raw).map(|v| v as u32)
}

pub fn parse_height(raw: &str) -> Result<f64, ValidationError> {
    HEIGHT_RULE.parse(raw)
}

pub fn parse_weight(raw: &str) -> Result<f64, ValidationError> {
    WEIGHT_RULE.parse(raw)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Resolve typed text to a diet.
///
/// Accepts the canonical value (`"lowcarb"`), the label (`"저탄고지"`), or the
/// label with whitespace removed (`"간헐적단식"`). Whitespace anywhere in the
/// input and ASCII case are ignored.
pub fn match_diet(raw: &str) -> Option<DietPreference> {
    let stripped = strip_whitespace(raw);
    if stripped.is_empty() {
        return None;
    }
    let lowered = stripped.to_lowercase();
    DietPreference::ALL
        .into_iter()
        .find(|d| d.value() == lowered || strip_whitespace(d.label()) == stripped)
}
