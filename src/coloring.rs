//! Coloring analysis parsing
//!
//! The coloring exercise is scored upstream by an image-analysis service that
//! answers with `{"mood", "personality", "score", "summary"}`, loosely formatted.
//! This module recovers those fields and builds the `ColoringRecord`.

use crate::quality::{object_span, strip_code_fences};
use crate::types::ColoringRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Score used when the analysis carries no usable score
pub const NEUTRAL_COLORING_SCORE: u8 = 75;

static SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"score"\s*:\s*(\d{1,3})"#).expect("score pattern is valid")
});
static MOOD: LazyLock<Regex> = LazyLock::new(|| text_field("mood"));
static PERSONALITY: LazyLock<Regex> = LazyLock::new(|| text_field("personality"));
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| text_field("summary"));

fn text_field(key: &str) -> Regex {
    Regex::new(&format!(r#"(?is)"{key}"\s*:\s*"(.*?)""#)).expect("text field pattern is valid")
}

/// Fields recovered from a coloring analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColoringAnalysis {
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ColoringAnalysis {
    /// Parse analysis text, strict JSON first, then per-field patterns
    pub fn parse(raw: &str) -> Self {
        let text = strip_code_fences(raw);

        let parsed = object_span(&text)
            .and_then(|span| serde_json::from_str::<ColoringAnalysis>(span).ok())
            .filter(|parsed| parsed != &Self::default())
            .unwrap_or_else(|| Self::parse_lenient(&text));

        Self {
            mood: non_blank(parsed.mood),
            personality: non_blank(parsed.personality),
            score: parsed.score.map(|s| s.min(100)),
            summary: non_blank(parsed.summary),
        }
    }

    fn parse_lenient(text: &str) -> Self {
        let capture = |pattern: &Regex| {
            pattern
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        };

        Self {
            mood: capture(&MOOD),
            personality: capture(&PERSONALITY),
            score: capture(&SCORE).and_then(|s| s.parse::<u16>().ok()).map(|s| s.min(100) as u8),
            summary: capture(&SUMMARY),
        }
    }

    /// The parsed score, or the neutral default when absent
    pub fn score_or_default(&self) -> u8 {
        self.score.unwrap_or(NEUTRAL_COLORING_SCORE)
    }
}

impl ColoringRecord {
    /// Build a record from raw analysis text, keeping the text as metadata
    pub fn from_analysis(raw: &str) -> Self {
        let analysis = ColoringAnalysis::parse(raw);
        if analysis.score.is_none() {
            tracing::debug!(
                default = NEUTRAL_COLORING_SCORE,
                "coloring analysis has no score, using neutral default"
            );
        }
        Self {
            score: analysis.score_or_default(),
            analysis_meta: Some(raw.to_string()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_clean_json() {
        let raw = r#"{"mood":"bright","personality":"curious","score":85,"summary":"Warm colors, tidy fill."}"#;
        let analysis = ColoringAnalysis::parse(raw);
        assert_eq!(
            analysis,
            ColoringAnalysis {
                mood: Some("bright".to_string()),
                personality: Some("curious".to_string()),
                score: Some(85),
                summary: Some("Warm colors, tidy fill.".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"mood\":\"calm\",\"score\":64}\n```";
        let analysis = ColoringAnalysis::parse(raw);
        assert_eq!(analysis.mood.as_deref(), Some("calm"));
        assert_eq!(analysis.score, Some(64));
    }

    #[test]
    fn test_lenient_fallback() {
        // Unterminated object with mixed-case keys
        let raw = "{\"Mood\": \"steady\", \"SCORE\": 92, \"summary\": \"Even strokes\nacross the ring.\"";
        let analysis = ColoringAnalysis::parse(raw);
        assert_eq!(analysis.mood.as_deref(), Some("steady"));
        assert_eq!(analysis.score, Some(92));
        assert_eq!(analysis.summary.as_deref(), Some("Even strokes\nacross the ring."));
        assert!(analysis.personality.is_none());
    }

    #[test]
    fn test_wrapped_analysis_uses_pattern_fallback() {
        let raw = r#"{"result": {"mood": "bright", "score": 81}}"#;
        let analysis = ColoringAnalysis::parse(raw);
        assert_eq!(analysis.mood.as_deref(), Some("bright"));
        assert_eq!(analysis.score, Some(81));
    }

    #[test]
    fn test_score_clamped_to_hundred() {
        let analysis = ColoringAnalysis::parse(r#"{"score": 250}"#);
        assert_eq!(analysis.score, Some(100));
        let analysis = ColoringAnalysis::parse(r#""score": 999 and more"#);
        assert_eq!(analysis.score, Some(100));
    }

    #[test]
    fn test_record_defaults_to_neutral_score() {
        let record = ColoringRecord::from_analysis("the model refused to answer");
        assert_eq!(record.score, NEUTRAL_COLORING_SCORE);
        assert_eq!(
            record.analysis_meta.as_deref(),
            Some("the model refused to answer")
        );
    }

    #[test]
    fn test_record_uses_parsed_score() {
        let record = ColoringRecord::from_analysis(r#"{"score": 58, "mood": "tired"}"#);
        assert_eq!(record.score, 58);
    }
}
