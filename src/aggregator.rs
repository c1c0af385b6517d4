//! Daily aggregation
//!
//! Combines the three activity sub-scores and the diary qualities into the
//! emotion, cognition and memory dimensions and one composite daily total.

use crate::scoring::{to_score, unit};
use crate::types::{DiaryQuality, DimensionScores, WordChainTelemetry};

pub const EMOTION_QUALITY_WEIGHT: f64 = 0.6;
pub const EMOTION_COLOR_WEIGHT: f64 = 0.4;
pub const COGNITION_WORD_WEIGHT: f64 = 0.7;
pub const COGNITION_DETAIL_WEIGHT: f64 = 0.3;
pub const MEMORY_ACCURACY_WEIGHT: f64 = 0.5;
pub const MEMORY_DETAIL_WEIGHT: f64 = 0.5;

pub const TOTAL_DIARY_WEIGHT: f64 = 0.35;
pub const TOTAL_COLOR_WEIGHT: f64 = 0.35;
pub const TOTAL_WORD_WEIGHT: f64 = 0.30;

/// Warmth above this no longer adds to the synergy bonus
pub const WARMTH_SYNERGY_CAP: f64 = 0.5;
pub const WARMTH_SYNERGY_SCALE: f64 = 6.0;
/// Calmness above this no longer adds to the synergy bonus
pub const CALMNESS_SYNERGY_CAP: f64 = 0.7;
pub const CALMNESS_SYNERGY_SCALE: f64 = 4.0;

/// Aggregate a day's sub-scores into dimension scores and a total.
///
/// `word` supplies the answer accuracy used by the memory dimension; without a
/// word-chain session that term is 0.
pub fn aggregate(
    word: Option<&WordChainTelemetry>,
    word_score: u8,
    diary_score: u8,
    quality: &DiaryQuality,
    color_score: u8,
) -> DimensionScores {
    let word_pct = f64::from(word_score.min(100)) / 100.0;
    let color_pct = f64::from(color_score.min(100)) / 100.0;
    let warmth = unit(quality.warmth);
    let positivity = unit(quality.positivity);
    let detail = unit(quality.detail);
    let calmness = unit(quality.calmness);
    let accuracy = word.map(|w| unit(w.valid_answer_ratio)).unwrap_or(0.0);

    let emotion_pct = (EMOTION_QUALITY_WEIGHT * ((warmth + positivity) / 2.0)
        + EMOTION_COLOR_WEIGHT * color_pct)
        .clamp(0.0, 1.0);
    let cognition_pct =
        (COGNITION_WORD_WEIGHT * word_pct + COGNITION_DETAIL_WEIGHT * detail).clamp(0.0, 1.0);
    let memory_pct =
        (MEMORY_ACCURACY_WEIGHT * accuracy + MEMORY_DETAIL_WEIGHT * detail).clamp(0.0, 1.0);

    let base = TOTAL_DIARY_WEIGHT * f64::from(diary_score.min(100))
        + TOTAL_COLOR_WEIGHT * f64::from(color_score.min(100))
        + TOTAL_WORD_WEIGHT * f64::from(word_score.min(100));
    let warm_synergy = warmth.min(WARMTH_SYNERGY_CAP) * WARMTH_SYNERGY_SCALE;
    let calm_synergy = calmness.min(CALMNESS_SYNERGY_CAP) * CALMNESS_SYNERGY_SCALE;

    let scores = DimensionScores {
        emotion: to_score(emotion_pct * 100.0),
        cognition: to_score(cognition_pct * 100.0),
        memory: to_score(memory_pct * 100.0),
        total: to_score(base + warm_synergy + calm_synergy),
    };

    tracing::debug!(
        emotion = scores.emotion,
        cognition = scores.cognition,
        memory = scores.memory,
        total = scores.total,
        "aggregated daily scores"
    );
    scores
}
