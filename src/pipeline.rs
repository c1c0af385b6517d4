//! Pipeline orchestration
//!
//! This module provides the public entry points for Synheart Bloom.
//! It runs the daily flow from stored activity records to a persisted summary
//! and a month calendar view.

use crate::aggregator::aggregate;
use crate::calendar::build_month_grid;
use crate::error::ComputeError;
use crate::scoring::{
    coloring_score, score_diary, score_diary_with_quality, score_word_chain, DiaryAnalyzer,
    DiaryScore,
};
use crate::store::WellbeingStore;
use crate::types::{
    CalendarCell, DailyBadge, DailySummary, DayActivity, DiaryQuality, DimensionScores,
    ScoreBand, UserId, YearMonth,
};
use crate::{BLOOM_VERSION, PRODUCER_NAME};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sub-scores, qualities and dimensions computed for a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayScores {
    pub word_score: u8,
    pub diary_score: u8,
    pub color_score: u8,
    pub diary_quality: DiaryQuality,
    pub dimensions: DimensionScores,
}

impl DayScores {
    /// The summary row for `date`, with mood and qualities kept as detail
    pub fn to_summary(&self, date: NaiveDate) -> DailySummary {
        DailySummary::new(
            date,
            self.word_score,
            self.diary_score,
            self.color_score,
            self.dimensions,
            summary_detail(&self.diary_quality),
        )
    }
}

/// Producer identification attached to reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Outcome of finalizing a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub producer: Producer,
    pub user_id: UserId,
    pub summary: DailySummary,
    pub diary_quality: DiaryQuality,
    pub badge: DailyBadge,
    pub band: ScoreBand,
    /// Whether the upsert succeeded
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

#[derive(Serialize)]
struct SummaryDetail<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    mood: Option<&'a str>,
    warmth: f64,
    positivity: f64,
    detail: f64,
    calmness: f64,
}

fn summary_detail(quality: &DiaryQuality) -> Option<String> {
    let detail = SummaryDetail {
        mood: quality.mood.as_deref(),
        warmth: quality.warmth,
        positivity: quality.positivity,
        detail: quality.detail,
        calmness: quality.calmness,
    };
    serde_json::to_string(&detail).ok()
}

/// Score a day's activities.
///
/// A failing analyzer degrades to all-zero diary qualities instead of failing
/// the whole day.
pub fn score_day(activity: &DayActivity, analyzer: &dyn DiaryAnalyzer) -> DayScores {
    let word_score = activity.word.as_ref().map(score_word_chain).unwrap_or(0);

    let diary = match &activity.diary {
        None => DiaryScore::default(),
        Some(record) => match &record.analysis_quality {
            Some(quality) => score_diary_with_quality(quality.clone(), &record.content),
            None => score_diary(analyzer, &record.title, &record.content).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "diary analysis failed, using neutral qualities");
                score_diary_with_quality(DiaryQuality::default(), &record.content)
            }),
        },
    };

    let color_score = coloring_score(activity.coloring.as_ref());
    let dimensions = aggregate(
        activity.word.as_ref(),
        word_score,
        diary.score,
        &diary.quality,
        color_score,
    );

    DayScores {
        word_score,
        diary_score: diary.score,
        color_score,
        diary_quality: diary.quality,
        dimensions,
    }
}

/// Processor for the daily finalize and calendar flows.
///
/// Holds the diary analyzer and a per-instance id stamped on every report.
pub struct DailyProcessor<'a> {
    analyzer: &'a dyn DiaryAnalyzer,
    instance_id: Uuid,
}

impl<'a> DailyProcessor<'a> {
    pub fn new(analyzer: &'a dyn DiaryAnalyzer) -> Self {
        Self {
            analyzer,
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Gather the user's latest activity records; read failures count as missing
    pub fn load_activity(&self, store: &dyn WellbeingStore, user: &UserId) -> DayActivity {
        DayActivity {
            word: or_missing(store.last_word_telemetry(user), "word telemetry", user),
            diary: or_missing(store.last_diary(user), "diary", user),
            coloring: or_missing(store.last_coloring(user), "coloring", user),
        }
    }

    /// Compute the user's scores from their latest records without persisting
    pub fn compute(&self, store: &dyn WellbeingStore, user: &UserId) -> DayScores {
        let activity = self.load_activity(store, user);
        score_day(&activity, self.analyzer)
    }

    /// Compute, upsert and report the summary for `date`.
    ///
    /// A failed upsert is reported in the result; the computed summary is
    /// returned either way.
    pub fn finalize_day(
        &self,
        store: &mut dyn WellbeingStore,
        user: &UserId,
        date: NaiveDate,
    ) -> DailyReport {
        let scores = self.compute(&*store, user);
        let summary = scores.to_summary(date);

        let persist_error = match store.upsert_daily_summary(user, &summary) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(user = %user, %date, error = %e, "failed to persist daily summary");
                Some(e.to_string())
            }
        };

        tracing::info!(
            user = %user,
            %date,
            total = summary.total_score,
            persisted = persist_error.is_none(),
            "finalized day"
        );

        DailyReport {
            producer: self.producer(),
            user_id: user.clone(),
            badge: DailyBadge::for_total(summary.total_score),
            band: ScoreBand::for_score(summary.total_score),
            diary_quality: scores.diary_quality,
            summary,
            persisted: persist_error.is_none(),
            persist_error,
        }
    }

    /// Month grid for the user.
    ///
    /// `pending` overlays a freshly computed summary that may not have been
    /// persisted, so the grid still shows it.
    pub fn month_view(
        &self,
        store: &dyn WellbeingStore,
        user: &UserId,
        month: YearMonth,
        pending: Option<&DailySummary>,
    ) -> Result<Vec<CalendarCell>, ComputeError> {
        let mut summaries = store.daily_summaries(user, month.first_day(), month.last_day())?;
        if let Some(summary) = pending.filter(|s| month.contains(s.date)) {
            summaries.push(summary.clone());
        }
        Ok(build_month_grid(month, &summaries))
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: BLOOM_VERSION.to_string(),
            instance_id: self.instance_id.to_string(),
        }
    }
}

fn or_missing<T>(result: Result<Option<T>, ComputeError>, what: &str, user: &UserId) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(user = %user, error = %e, "failed to read {what}, treating as missing");
        None
    })
}
