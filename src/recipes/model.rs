//! Recipe shapes returned by the backend, and normalization into the
//! preview card the client renders.
//!
//! The backend answers with several shapes depending on which endpoint and
//! which generation of the card pipeline produced the record. Every shape is
//! classified into [`RawRecipe`] first, then flattened by
//! [`RawRecipe::normalize`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Preview text is cut to this many characters.
pub const DESCRIPTION_MAX_CHARS: usize = 90;
/// Preview lists keep this many items.
pub const PREVIEW_ITEMS: usize = 3;

static OBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]{24}$").expect("valid object id pattern"));
static TAG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#,;|\s]+").expect("valid tag separator pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Keys on the card that may carry tags.
const CARD_TAG_KEYS: [&str; 8] = [
    "tags",
    "hashTags",
    "hashtags",
    "chips",
    "labels",
    "tagList",
    "categories",
    "category",
];
/// Keys on a variant that may carry tags.
const VARIANT_TAG_KEYS: [&str; 2] = ["tags", "labels"];

/// The preview card shown in the recommendation carousel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    /// `recipe_cards` object id, when the record carried a valid one.
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub image_url: String,
    pub tags: Vec<String>,
}

/// Full card detail. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeFull {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients_full: Vec<String>,
    #[serde(default)]
    pub steps_full: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A backend record, classified by shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawRecipe<'a> {
    /// Preview fields live on the card itself.
    Flat(&'a Map<String, Value>),
    /// The card carries a single `variant` object.
    Variant {
        card: &'a Map<String, Value>,
        variant: &'a Map<String, Value>,
    },
    /// The card carries a `variants` list; the first entry is used.
    Variants {
        card: &'a Map<String, Value>,
        variants: &'a [Value],
    },
    /// Not a JSON object.
    Unrecognized,
}

impl<'a> RawRecipe<'a> {
    pub fn classify(value: &'a Value) -> Self {
        let Some(card) = value.as_object() else {
            return Self::Unrecognized;
        };
        if let Some(variant) = card.get("variant").and_then(Value::as_object) {
            return Self::Variant { card, variant };
        }
        match card.get("variants").and_then(Value::as_array) {
            Some(variants) => Self::Variants { card, variants },
            None => Self::Flat(card),
        }
    }

    fn card(&self) -> Option<&'a Map<String, Value>> {
        match *self {
            Self::Flat(card) | Self::Variant { card, .. } | Self::Variants { card, .. } => {
                Some(card)
            }
            Self::Unrecognized => None,
        }
    }

    fn variant(&self) -> Option<&'a Map<String, Value>> {
        match *self {
            Self::Variant { variant, .. } => Some(variant),
            Self::Variants { variants, .. } => variants.first().and_then(Value::as_object),
            _ => None,
        }
    }

    /// Flatten into a preview card. `None` for unrecognized records.
    pub fn normalize(&self) -> Option<RecipeSummary> {
        let card = self.card()?;
        let variant = self.variant();

        let description = ["summary", "description", "subtitle"]
            .iter()
            .find_map(|k| card.get(*k).and_then(Value::as_str))
            .or_else(|| variant.and_then(|v| v.get("summary")).and_then(Value::as_str))
            .map(preview_text)
            .unwrap_or_default();

        let ingredients = first_list(&[(Some(card), "ingredients"), (variant, "key_ingredients")]);
        let steps = first_list(&[
            (Some(card), "steps"),
            (variant, "steps"),
            (variant, "steps_compact"),
        ]);

        let mut tags = Vec::new();
        for key in CARD_TAG_KEYS {
            tags.extend(tag_values(card.get(key)));
        }
        if let Some(v) = variant {
            for key in VARIANT_TAG_KEYS {
                tags.extend(tag_values(v.get(key)));
            }
        }

        let image_url = ["imageUrl", "image"]
            .iter()
            .find_map(|k| card.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        Some(RecipeSummary {
            id: card_id(card),
            title: card
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description,
            ingredients,
            steps,
            image_url,
            tags: dedup(tags),
        })
    }
}

/// Normalize a list response. Anything other than an array yields no cards.
pub fn normalize_list(value: &Value) -> Vec<RecipeSummary> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| RawRecipe::classify(item).normalize())
                .collect()
        })
        .unwrap_or_default()
}

/// True for a 24-character hex object id.
pub fn is_object_id(s: &str) -> bool {
    OBJECT_ID.is_match(s)
}

/// `id` when it is an object id; otherwise the first present fallback key,
/// accepted only if it is one.
fn card_id(card: &Map<String, Value>) -> Option<String> {
    if let Some(id) = card.get("id").and_then(Value::as_str) {
        if is_object_id(id) {
            return Some(id.to_string());
        }
    }

    let nested = card.get("card").and_then(Value::as_object);
    let candidate = present(card.get("cardId"))
        .or_else(|| present(card.get("card_id")))
        .or_else(|| nested.and_then(|c| present(c.get("_id"))))
        .or_else(|| nested.and_then(|c| present(c.get("id"))))
        .or_else(|| present(card.get("_id")))?;

    candidate
        .as_str()
        .filter(|s| is_object_id(s))
        .map(str::to_string)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Collapse whitespace runs and cut to the preview length.
fn preview_text(raw: &str) -> String {
    WHITESPACE
        .replace_all(raw, " ")
        .chars()
        .take(DESCRIPTION_MAX_CHARS)
        .collect()
}

/// The first `(object, key)` that holds an array, as trimmed non-empty
/// strings cut to the preview length.
fn first_list(sources: &[(Option<&Map<String, Value>>, &str)]) -> Vec<String> {
    sources
        .iter()
        .find_map(|(obj, key)| obj.and_then(|o| o.get(*key)).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(scalar_text)
                .take(PREVIEW_ITEMS)
                .collect()
        })
        .unwrap_or_default()
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Tags from an array, or from a string split on `#`, `,`, `;`, `|` and
/// whitespace.
fn tag_values(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) => TAG_SEPARATORS
            .split(s)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
