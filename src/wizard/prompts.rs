//! Assistant message texts and the summary rendering.

use super::model::{CollectedProfile, DietPreference};

pub const GREETING: &str = "안녕하세요! 친근한 건강 코치예요 🙂\n먼저 성별을 선택해주세요!";

pub const ASK_AGE: &str = "좋아요! 이제 나이를 알려주세요. 숫자로만 입력해주세요!";
pub const ASK_HEIGHT: &str = "좋아요! 이번엔 키(cm)를 알려주세요!";
pub const ASK_WEIGHT: &str = "훌륭해요! 이제 몸무게(kg)를 알려주세요!";
pub const ASK_DIET: &str = "마지막이에요! 선호하는 다이어트 방식을 골라주세요.\n아래 버튼 중 하나를 눌러도 좋고, 직접 입력해도 됩니다! 🙂";

pub const USE_BUTTONS: &str = "위의 버튼 중에서 선택해주세요! 👆";

pub const SUMMARY_INTRO: &str = "좋아요! 입력해주신 정보를 정리해볼게요.";

pub const CONFIRMED: &str = "완료되었습니다! 🎉 입력해주신 정보로 맞춤 건강 관리를 도와드릴게요!";
pub const RESTART: &str = "알겠습니다! 처음부터 다시 입력받겠습니다. 성별부터 다시 선택해주세요!";

/// Label of the affirmative confirmation button, echoed as the user's entry.
pub const CONFIRM_YES_LABEL: &str = "네, 맞습니다";
/// Label of the negative confirmation button.
pub const CONFIRM_NO_LABEL: &str = "아니오, 다시 입력";

/// Input placeholder for a step, empty when no text box is shown.
pub fn placeholder(step: super::state::WizardStep) -> &'static str {
    use super::state::WizardStep::*;
    match step {
        AwaitingSex | AwaitingConfirmation => "위의 버튼을 선택해주세요",
        AwaitingAge => "나이를 입력하세요 (예: 29)",
        AwaitingHeight => "키를 입력하세요 (예: 170)",
        AwaitingWeight => "몸무게를 입력하세요 (예: 65.5)",
        AwaitingDiet => "다이어트 방식을 입력하거나 위 버튼을 선택하세요",
        Completed => "",
    }
}

/// Reply for diet text that matched nothing; lists every label.
pub fn unknown_diet() -> String {
    let labels: Vec<&str> = DietPreference::ALL.iter().map(|d| d.label()).collect();
    format!("목록 중에서 선택해 주세요: {}", labels.join(", "))
}

/// Render the draft as the confirmation card.
///
/// Missing fields render as `-` (sex as `미입력`).
pub fn summary(profile: &CollectedProfile) -> String {
    let sex = profile.sex.map(|s| s.label()).unwrap_or("미입력");
    let age = profile
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    let height = profile
        .height_cm
        .map(format_number)
        .unwrap_or_else(|| "-".to_string());
    let weight = profile
        .weight_kg
        .map(format_number)
        .unwrap_or_else(|| "-".to_string());
    let diet = profile.diet_preference.map(|d| d.label()).unwrap_or("-");

    let lines = [
        "📋 입력 정보 확인".to_string(),
        String::new(),
        format!("성별: {sex}"),
        format!("나이: {age}세"),
        format!("키: {height}cm"),
        format!("몸무게: {weight}kg"),
        format!("다이어트: {diet}"),
        String::new(),
        "모든 정보가 정확한가요?".to_string(),
    ];
    lines.join("\n")
}

/// Whole numbers print without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
