//! Activity scorers
//!
//! Pure scoring functions for the three daily activities:
//! - Word chain: speed, accuracy and completion blended into 0-100
//! - Memory diary: weighted quality signals minus a length penalty
//! - Coloring: pass-through of the upstream score
//!
//! The weights and thresholds below are product-tuning constants.

use crate::error::ComputeError;
use crate::quality::extract_diary_quality;
use crate::types::{ColoringRecord, DiaryQuality, WordChainTelemetry};
use serde::{Deserialize, Serialize};

/// Latency at or below which speed is fully credited (ms)
pub const FASTEST_LATENCY_MS: f64 = 500.0;
/// Latency at or above which speed earns nothing (ms)
pub const SLOWEST_LATENCY_MS: f64 = 3000.0;

pub const SPEED_WEIGHT: f64 = 0.5;
pub const ACCURACY_WEIGHT: f64 = 0.4;
pub const COMPLETION_WEIGHT: f64 = 0.1;

pub const WARMTH_WEIGHT: f64 = 0.4;
pub const POSITIVITY_WEIGHT: f64 = 0.3;
pub const DETAIL_WEIGHT: f64 = 0.2;
pub const CALMNESS_WEIGHT: f64 = 0.1;

/// Entries shorter than this many characters lose `SHORT_ENTRY_PENALTY`
pub const SHORT_ENTRY_CHARS: usize = 20;
pub const SHORT_ENTRY_PENALTY: f64 = -20.0;
/// Entries shorter than this many characters lose `BRIEF_ENTRY_PENALTY`
pub const BRIEF_ENTRY_CHARS: usize = 40;
pub const BRIEF_ENTRY_PENALTY: f64 = -10.0;

/// External text-analysis collaborator for diary entries.
///
/// Returns raw text that should loosely contain the quality JSON object.
pub trait DiaryAnalyzer {
    fn analyze(&self, title: &str, content: &str) -> Result<String, ComputeError>;
}

impl<F> DiaryAnalyzer for F
where
    F: Fn(&str, &str) -> Result<String, ComputeError>,
{
    fn analyze(&self, title: &str, content: &str) -> Result<String, ComputeError> {
        self(title, content)
    }
}

/// Analyzer that replays analysis text obtained ahead of time.
///
/// With no text it fails, so callers fall back to neutral qualities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecomputedAnalysis(pub Option<String>);

impl DiaryAnalyzer for PrecomputedAnalysis {
    fn analyze(&self, _title: &str, _content: &str) -> Result<String, ComputeError> {
        self.0
            .clone()
            .ok_or_else(|| ComputeError::AnalysisFailed("no analysis text available".to_string()))
    }
}

/// Diary sub-score together with the qualities it was computed from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiaryScore {
    pub score: u8,
    pub quality: DiaryQuality,
}

/// Score a word-chain session.
pub fn score_word_chain(telemetry: &WordChainTelemetry) -> u8 {
    let latency = telemetry.average_latency_ms as f64;
    let speed = ((SLOWEST_LATENCY_MS - latency) / (SLOWEST_LATENCY_MS - FASTEST_LATENCY_MS))
        .clamp(0.0, 1.0);
    let accuracy = unit(telemetry.valid_answer_ratio);
    let completion =
        (telemetry.rounds_completed as f64 / telemetry.target_rounds.max(1) as f64).clamp(0.0, 1.0);

    let score = to_score(
        100.0 * (SPEED_WEIGHT * speed + ACCURACY_WEIGHT * accuracy + COMPLETION_WEIGHT * completion),
    );

    tracing::debug!(speed, accuracy, completion, score, "scored word chain");
    score
}

/// Score a diary entry, calling the analyzer only for non-blank content.
///
/// Blank content scores 0 with all-zero qualities and never reaches the analyzer.
pub fn score_diary(
    analyzer: &dyn DiaryAnalyzer,
    title: &str,
    content: &str,
) -> Result<DiaryScore, ComputeError> {
    if content.trim().is_empty() {
        return Ok(DiaryScore::default());
    }

    let raw = analyzer.analyze(title, content)?;
    let quality = extract_diary_quality(&raw);
    Ok(score_diary_with_quality(quality, content))
}

/// Score a diary entry from already extracted qualities.
///
/// Qualities are clamped to 0-1 first, so cached or host-supplied values
/// cannot push the score or the reported qualities out of range.
pub fn score_diary_with_quality(quality: DiaryQuality, content: &str) -> DiaryScore {
    if content.trim().is_empty() {
        return DiaryScore::default();
    }

    let quality = normalize_quality(quality);

    let base = 100.0
        * (WARMTH_WEIGHT * quality.warmth
            + POSITIVITY_WEIGHT * quality.positivity
            + DETAIL_WEIGHT * quality.detail
            + CALMNESS_WEIGHT * quality.calmness);
    let penalty = length_penalty(content);
    let score = to_score(base + penalty);

    tracing::debug!(base, penalty, score, "scored diary");
    DiaryScore { score, quality }
}

/// Penalty for short entries, by character count.
pub fn length_penalty(content: &str) -> f64 {
    let len = content.chars().count();
    if len < SHORT_ENTRY_CHARS {
        SHORT_ENTRY_PENALTY
    } else if len < BRIEF_ENTRY_CHARS {
        BRIEF_ENTRY_PENALTY
    } else {
        0.0
    }
}

/// Coloring sub-score: the upstream score, or 0 when there is no record.
pub fn coloring_score(record: Option<&ColoringRecord>) -> u8 {
    record.map(|r| r.score.min(100)).unwrap_or(0)
}

/// Clamp every signal to 0-1 and drop a blank mood
pub(crate) fn normalize_quality(quality: DiaryQuality) -> DiaryQuality {
    DiaryQuality {
        warmth: unit(quality.warmth),
        positivity: unit(quality.positivity),
        detail: unit(quality.detail),
        calmness: unit(quality.calmness),
        mood: quality.mood.filter(|m| !m.trim().is_empty()),
    }
}

/// Round half-up and clamp to 0-100
pub(crate) fn to_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Clamp to 0-1, mapping non-finite values to 0
pub(crate) fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
