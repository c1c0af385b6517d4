//! Core types for the Synheart Bloom engine
//!
//! This module defines the records that flow through each stage of the engine:
//! activity telemetry, diary qualities, daily summaries, and calendar cells.

use crate::error::ComputeError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of word-chain rounds a full session asks for
pub const DEFAULT_TARGET_ROUNDS: u32 = 5;

fn default_target_rounds() -> u32 {
    DEFAULT_TARGET_ROUNDS
}

/// Explicit user identifier passed into every scoring and persistence call
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user id, rejecting blank identifiers
    pub fn new(id: impl Into<String>) -> Result<Self, ComputeError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ComputeError::InvalidUserId(
                "user id must not be blank".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Telemetry from one completed word-chain session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordChainTelemetry {
    /// Number of rounds the user answered
    pub rounds_completed: u32,
    /// Mean answer latency across rounds (ms)
    pub average_latency_ms: u64,
    /// Share of answers judged valid (0-1)
    pub valid_answer_ratio: f64,
    /// Rounds a full session asks for
    #[serde(default = "default_target_rounds")]
    pub target_rounds: u32,
}

impl WordChainTelemetry {
    /// Create telemetry with the default target of five rounds
    pub fn new(rounds_completed: u32, average_latency_ms: u64, valid_answer_ratio: f64) -> Self {
        Self {
            rounds_completed,
            average_latency_ms,
            valid_answer_ratio,
            target_rounds: DEFAULT_TARGET_ROUNDS,
        }
    }

    /// Check the documented ranges
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.target_rounds == 0 {
            return Err(ComputeError::InvalidTelemetry(
                "target_rounds must be greater than zero".to_string(),
            ));
        }
        if !self.valid_answer_ratio.is_finite() || !(0.0..=1.0).contains(&self.valid_answer_ratio)
        {
            return Err(ComputeError::InvalidTelemetry(format!(
                "valid_answer_ratio must be within 0-1, got {}",
                self.valid_answer_ratio
            )));
        }
        Ok(())
    }
}

/// Bounded quality signals extracted from diary analysis text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiaryQuality {
    pub warmth: f64,
    pub positivity: f64,
    pub detail: f64,
    pub calmness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

/// A single memory-diary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryRecord {
    pub title: String,
    pub content: String,
    /// Qualities from an earlier analysis, reused instead of re-analyzing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_quality: Option<DiaryQuality>,
}

impl DiaryRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            analysis_quality: None,
        }
    }
}

/// Result of a coloring exercise; the score is computed upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColoringRecord {
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_meta: Option<String>,
}

/// The latest activity records available for one day; any may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayActivity {
    #[serde(default)]
    pub word: Option<WordChainTelemetry>,
    #[serde(default)]
    pub diary: Option<DiaryRecord>,
    #[serde(default)]
    pub coloring: Option<ColoringRecord>,
}

/// Derived wellbeing dimensions plus the composite total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub emotion: u8,
    pub cognition: u8,
    pub memory: u8,
    pub total: u8,
}

/// Persisted per-day summary, unique per (user, date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_score: u8,
    pub word_score: u8,
    pub diary_score: u8,
    pub color_score: u8,
    pub emotion_score: u8,
    pub cognition_score: u8,
    pub memory_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DailySummary {
    /// Assemble a summary from the three sub-scores and the aggregated dimensions
    pub fn new(
        date: NaiveDate,
        word_score: u8,
        diary_score: u8,
        color_score: u8,
        dimensions: DimensionScores,
        detail: Option<String>,
    ) -> Self {
        Self {
            date,
            total_score: dimensions.total,
            word_score,
            diary_score,
            color_score,
            emotion_score: dimensions.emotion,
            cognition_score: dimensions.cognition,
            memory_score: dimensions.memory,
            detail,
        }
    }

    pub fn dimensions(&self) -> DimensionScores {
        DimensionScores {
            emotion: self.emotion_score,
            cognition: self.cognition_score,
            memory: self.memory_score,
            total: self.total_score,
        }
    }
}

/// One cell of a month grid; `date == None` marks padding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCell {
    pub date: Option<NaiveDate>,
    pub label: String,
    pub summary: Option<DailySummary>,
}

impl CalendarCell {
    pub fn blank() -> Self {
        Self {
            date: None,
            label: String::new(),
            summary: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.date.is_none()
    }
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, validating that month is 1-12 and the year is representable
    pub fn new(year: i32, month: u32) -> Result<Self, ComputeError> {
        if !(1..=12).contains(&month) {
            return Err(ComputeError::InvalidMonth(format!(
                "month must be 1-12, got {month}"
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ComputeError::InvalidMonth(format!(
                "{year:04}-{month:02} is out of range"
            )));
        }
        Ok(Self { year, month })
    }

    /// Month containing the given date
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.day(self.length()).unwrap_or_else(|| self.first_day())
    }

    /// Number of days in the month
    pub fn length(&self) -> u32 {
        match self.month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ if NaiveDate::from_ymd_opt(self.year, 2, 29).is_some() => 29,
            _ => 28,
        }
    }

    /// Date of day `d` (1-based), if it exists in this month
    pub fn day(&self, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, d)
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ComputeError;

    /// Parse `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|e| ComputeError::InvalidMonth(format!("{s}: {e}")))?;
        Ok(Self::of(date))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(month: YearMonth) -> Self {
        month.to_string()
    }
}

/// Coarse band used when displaying any 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Low,
    Fair,
    Good,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=59 => ScoreBand::Low,
            60..=79 => ScoreBand::Fair,
            _ => ScoreBand::Good,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Low => "low",
            ScoreBand::Fair => "fair",
            ScoreBand::Good => "good",
        }
    }
}

/// Badge shown next to the daily total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyBadge {
    Outstanding,
    Great,
    Good,
    Steady,
}

impl DailyBadge {
    pub fn for_total(total: u8) -> Self {
        match total {
            90..=u8::MAX => DailyBadge::Outstanding,
            75..=89 => DailyBadge::Great,
            60..=74 => DailyBadge::Good,
            _ => DailyBadge::Steady,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DailyBadge::Outstanding => "Outstanding day",
            DailyBadge::Great => "Really good",
            DailyBadge::Good => "A good day",
            DailyBadge::Steady => "One calm step at a time",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_id_rejects_blank() {
        assert!(UserId::new("   ").is_err());
        assert_eq!(UserId::new(" alice ").unwrap().as_str(), "alice");

        let parsed: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_telemetry_default_target_rounds() {
        let telemetry: WordChainTelemetry = serde_json::from_str(
            r#"{"rounds_completed": 3, "average_latency_ms": 1200, "valid_answer_ratio": 0.8}"#,
        )
        .unwrap();
        assert_eq!(telemetry.target_rounds, 5);
        assert!(telemetry.validate().is_ok());
    }

    #[test]
    fn test_telemetry_validation() {
        let mut telemetry = WordChainTelemetry::new(5, 900, 1.2);
        assert!(telemetry.validate().is_err());

        telemetry.valid_answer_ratio = 0.5;
        telemetry.target_rounds = 0;
        assert!(telemetry.validate().is_err());
    }

    #[test]
    fn test_year_month_lengths() {
        assert_eq!(YearMonth::new(2024, 2).unwrap().length(), 29);
        assert_eq!(YearMonth::new(2023, 2).unwrap().length(), 28);
        assert_eq!(YearMonth::new(2100, 2).unwrap().length(), 28);
        assert_eq!(YearMonth::new(2024, 4).unwrap().length(), 30);
        assert_eq!(YearMonth::new(2024, 12).unwrap().length(), 31);
        assert_eq!(
            YearMonth::new(2024, 2).unwrap().last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_year_month_navigation() {
        let jan = YearMonth::new(2025, 1).unwrap();
        assert_eq!(jan.previous(), YearMonth::new(2024, 12).unwrap());
        assert_eq!(jan.previous().next(), jan);
        assert_eq!(YearMonth::new(2024, 12).unwrap().next(), jan);
    }

    #[test]
    fn test_year_month_parse_and_display() {
        let month: YearMonth = "2024-05".parse().unwrap();
        assert_eq!(month, YearMonth::new(2024, 5).unwrap());
        assert_eq!(month.to_string(), "2024-05");
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!(YearMonth::new(2024, 0).is_err());

        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, "\"2024-05\"");
    }

    #[test]
    fn test_score_band_edges() {
        assert_eq!(ScoreBand::for_score(0), ScoreBand::Low);
        assert_eq!(ScoreBand::for_score(59), ScoreBand::Low);
        assert_eq!(ScoreBand::for_score(60), ScoreBand::Fair);
        assert_eq!(ScoreBand::for_score(79), ScoreBand::Fair);
        assert_eq!(ScoreBand::for_score(80), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(100), ScoreBand::Good);
    }

    #[test]
    fn test_daily_badge_tiers() {
        assert_eq!(DailyBadge::for_total(95), DailyBadge::Outstanding);
        assert_eq!(DailyBadge::for_total(90), DailyBadge::Outstanding);
        assert_eq!(DailyBadge::for_total(75), DailyBadge::Great);
        assert_eq!(DailyBadge::for_total(60), DailyBadge::Good);
        assert_eq!(DailyBadge::for_total(59), DailyBadge::Steady);
    }
}
