//! Diary quality extraction
//!
//! The diary analysis service is asked for a JSON object with `warmth`,
//! `positivity`, `detail`, `calmness` (0-1) and `mood`, but its output may be
//! wrapped in prose or code fences, or be malformed. Extraction never fails:
//! - Strict JSON parse of the outermost object first, if it has any quality key
//! - Field-by-field pattern fallback when the strict parse fails
//! - Missing numeric fields default to 0, a missing mood to `None`

use crate::scoring::normalize_quality;
use crate::types::DiaryQuality;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static WARMTH: LazyLock<Regex> = LazyLock::new(|| numeric_field("warmth"));
static POSITIVITY: LazyLock<Regex> = LazyLock::new(|| numeric_field("positivity"));
static DETAIL: LazyLock<Regex> = LazyLock::new(|| numeric_field("detail"));
static CALMNESS: LazyLock<Regex> = LazyLock::new(|| numeric_field("calmness"));
static MOOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""mood"\s*:\s*"([^"]+)""#).expect("mood pattern is valid")
});

fn numeric_field(key: &str) -> Regex {
    Regex::new(&format!(r#""{key}"\s*:\s*(-?\d+(?:\.\d+)?)"#))
        .expect("numeric field pattern is valid")
}

/// Shape of a well-formed analysis object
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuality {
    warmth: Option<f64>,
    positivity: Option<f64>,
    detail: Option<f64>,
    calmness: Option<f64>,
    mood: Option<String>,
}

/// Extract diary quality signals from raw analysis text.
pub fn extract_diary_quality(raw: &str) -> DiaryQuality {
    let text = strip_code_fences(raw);

    let quality = match parse_strict(&text) {
        Some(parsed) => parsed,
        None => {
            tracing::debug!("diary analysis is not strict JSON, using pattern fallback");
            parse_lenient(&text)
        }
    };

    normalize_quality(quality)
}

/// Parse the outer object; an object carrying none of the numeric keys
/// (e.g. the qualities nested one level down) is not a strict match.
fn parse_strict(text: &str) -> Option<DiaryQuality> {
    let span = object_span(text)?;
    let raw: RawQuality = serde_json::from_str(span).ok()?;
    if [raw.warmth, raw.positivity, raw.detail, raw.calmness]
        .iter()
        .all(Option::is_none)
    {
        return None;
    }

    Some(DiaryQuality {
        warmth: raw.warmth.unwrap_or(0.0),
        positivity: raw.positivity.unwrap_or(0.0),
        detail: raw.detail.unwrap_or(0.0),
        calmness: raw.calmness.unwrap_or(0.0),
        mood: raw.mood,
    })
}

fn parse_lenient(text: &str) -> DiaryQuality {
    DiaryQuality {
        warmth: first_number(&WARMTH, text),
        positivity: first_number(&POSITIVITY, text),
        detail: first_number(&DETAIL, text),
        calmness: first_number(&CALMNESS, text),
        mood: MOOD
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
    }
}

fn first_number(pattern: &Regex, text: &str) -> f64 {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Remove markdown code fences and a leading `json` language tag
pub(crate) fn strip_code_fences(raw: &str) -> String {
    let unfenced = raw.replace("```", "");
    let trimmed = unfenced.trim();
    let without_tag = match trimmed.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &trimmed[4..],
        _ => trimmed,
    };
    without_tag.trim().to_string()
}

/// The span from the first `{` to the last `}`, if any
pub(crate) fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
