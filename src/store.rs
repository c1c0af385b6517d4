//! Activity and summary persistence
//!
//! `WellbeingStore` is the persistence collaborator the engine reads activity
//! records from and writes daily summaries to. `InMemoryStore` is a
//! JSON-serializable implementation used by the CLI and tests.

use crate::error::ComputeError;
use crate::types::{
    ColoringRecord, DailySummary, DayActivity, DiaryRecord, UserId, WordChainTelemetry,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persistence collaborator, keyed by explicit user id
pub trait WellbeingStore {
    /// Most recent word-chain session for the user
    fn last_word_telemetry(&self, user: &UserId)
        -> Result<Option<WordChainTelemetry>, ComputeError>;

    /// Most recent diary entry for the user
    fn last_diary(&self, user: &UserId) -> Result<Option<DiaryRecord>, ComputeError>;

    /// Most recent coloring result for the user
    fn last_coloring(&self, user: &UserId) -> Result<Option<ColoringRecord>, ComputeError>;

    /// Insert or replace the summary for `(user, summary.date)`
    fn upsert_daily_summary(
        &mut self,
        user: &UserId,
        summary: &DailySummary,
    ) -> Result<(), ComputeError>;

    /// Summaries with `start <= date <= end`, ordered by date
    fn daily_summaries(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, ComputeError>;
}

/// Everything recorded for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLedger {
    #[serde(default)]
    pub word_sessions: Vec<WordChainTelemetry>,
    #[serde(default)]
    pub diaries: Vec<DiaryRecord>,
    #[serde(default)]
    pub colorings: Vec<ColoringRecord>,
    /// Kept sorted by date, one entry per date
    #[serde(default)]
    pub summaries: Vec<DailySummary>,
}

impl UserLedger {
    /// Sort summaries by date, keeping the last row for each date
    fn normalize_summaries(&mut self) {
        self.summaries.sort_by_key(|s| s.date);
        let mut unique: Vec<DailySummary> = Vec::with_capacity(self.summaries.len());
        for summary in self.summaries.drain(..) {
            match unique.last_mut() {
                Some(last) if last.date == summary.date => *last = summary,
                _ => unique.push(summary),
            }
        }
        self.summaries = unique;
    }
}

/// In-memory store that can be saved to and loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryStore {
    users: BTreeMap<String, UserLedger>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self, user: &UserId) -> Option<&UserLedger> {
        self.users.get(user.as_str())
    }

    fn ledger_mut(&mut self, user: &UserId) -> &mut UserLedger {
        self.users.entry(user.as_str().to_string()).or_default()
    }

    pub fn record_word_telemetry(&mut self, user: &UserId, telemetry: WordChainTelemetry) {
        self.ledger_mut(user).word_sessions.push(telemetry);
    }

    pub fn record_diary(&mut self, user: &UserId, diary: DiaryRecord) {
        self.ledger_mut(user).diaries.push(diary);
    }

    pub fn record_coloring(&mut self, user: &UserId, coloring: ColoringRecord) {
        self.ledger_mut(user).colorings.push(coloring);
    }

    /// Append whichever records the activity bundle carries
    pub fn record_activity(&mut self, user: &UserId, activity: DayActivity) {
        let ledger = self.ledger_mut(user);
        ledger.word_sessions.extend(activity.word);
        ledger.diaries.extend(activity.diary);
        ledger.colorings.extend(activity.coloring);
    }

    /// Number of users with any recorded data
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Load a store from JSON.
    ///
    /// Summaries are re-sorted by date and deduplicated, last row winning.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut store: Self = serde_json::from_str(json)?;
        for ledger in store.users.values_mut() {
            ledger.normalize_summaries();
        }
        Ok(store)
    }

    /// Serialize the store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl WellbeingStore for InMemoryStore {
    fn last_word_telemetry(
        &self,
        user: &UserId,
    ) -> Result<Option<WordChainTelemetry>, ComputeError> {
        Ok(self.ledger(user).and_then(|l| l.word_sessions.last().cloned()))
    }

    fn last_diary(&self, user: &UserId) -> Result<Option<DiaryRecord>, ComputeError> {
        Ok(self.ledger(user).and_then(|l| l.diaries.last().cloned()))
    }

    fn last_coloring(&self, user: &UserId) -> Result<Option<ColoringRecord>, ComputeError> {
        Ok(self.ledger(user).and_then(|l| l.colorings.last().cloned()))
    }

    fn upsert_daily_summary(
        &mut self,
        user: &UserId,
        summary: &DailySummary,
    ) -> Result<(), ComputeError> {
        let summaries = &mut self.ledger_mut(user).summaries;
        match summaries.binary_search_by_key(&summary.date, |s| s.date) {
            Ok(idx) => summaries[idx] = summary.clone(),
            Err(idx) => summaries.insert(idx, summary.clone()),
        }
        Ok(())
    }

    fn daily_summaries(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, ComputeError> {
        Ok(self
            .ledger(user)
            .map(|l| {
                l.summaries
                    .iter()
                    .filter(|s| s.date >= start && s.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DimensionScores;
    use pretty_assertions::assert_eq;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn summary(d: u32, total: u8) -> DailySummary {
        DailySummary::new(
            date(d),
            60,
            70,
            80,
            DimensionScores {
                emotion: 65,
                cognition: 55,
                memory: 45,
                total,
            },
            Some(r#"{"mood":"calm"}"#.to_string()),
        )
    }

    #[test]
    fn test_upsert_then_fetch_round_trip() {
        let mut store = InMemoryStore::new();
        let alice = user("alice");
        let row = summary(10, 71);

        store.upsert_daily_summary(&alice, &row).unwrap();
        let fetched = store.daily_summaries(&alice, date(1), date(31)).unwrap();

        assert_eq!(fetched, vec![row]);
    }

    #[test]
    fn test_upsert_is_idempotent_and_last_write_wins() {
        let mut store = InMemoryStore::new();
        let alice = user("alice");

        store.upsert_daily_summary(&alice, &summary(10, 71)).unwrap();
        store.upsert_daily_summary(&alice, &summary(10, 71)).unwrap();
        assert_eq!(store.daily_summaries(&alice, date(10), date(10)).unwrap().len(), 1);

        store.upsert_daily_summary(&alice, &summary(10, 40)).unwrap();
        let fetched = store.daily_summaries(&alice, date(10), date(10)).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].total_score, 40);
    }

    #[test]
    fn test_range_is_inclusive_and_sorted() {
        let mut store = InMemoryStore::new();
        let alice = user("alice");
        for (d, total) in [(20, 1), (3, 2), (15, 3), (31, 4)] {
            store.upsert_daily_summary(&alice, &summary(d, total)).unwrap();
        }

        let fetched = store.daily_summaries(&alice, date(3), date(20)).unwrap();
        let dates: Vec<NaiveDate> = fetched.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date(3), date(15), date(20)]);
    }

    #[test]
    fn test_users_are_isolated() {
        let mut store = InMemoryStore::new();
        store.upsert_daily_summary(&user("alice"), &summary(1, 50)).unwrap();
        store.record_word_telemetry(&user("alice"), WordChainTelemetry::new(5, 900, 1.0));

        let bob = user("bob");
        assert!(store.daily_summaries(&bob, date(1), date(31)).unwrap().is_empty());
        assert!(store.last_word_telemetry(&bob).unwrap().is_none());
    }

    #[test]
    fn test_last_records_are_most_recent() {
        let mut store = InMemoryStore::new();
        let alice = user("alice");
        store.record_diary(&alice, DiaryRecord::new("first", "one"));
        store.record_diary(&alice, DiaryRecord::new("second", "two"));
        store.record_coloring(
            &alice,
            ColoringRecord {
                score: 30,
                analysis_meta: None,
            },
        );
        store.record_coloring(
            &alice,
            ColoringRecord {
                score: 90,
                analysis_meta: None,
            },
        );

        assert_eq!(store.last_diary(&alice).unwrap().unwrap().title, "second");
        assert_eq!(store.last_coloring(&alice).unwrap().unwrap().score, 90);
    }

    #[test]
    fn test_record_activity_appends_present_records() {
        let mut store = InMemoryStore::new();
        let alice = user("alice");
        store.record_diary(&alice, DiaryRecord::new("earlier", "kept"));
        store.record_activity(
            &alice,
            DayActivity {
                word: Some(WordChainTelemetry::new(3, 1400, 0.6)),
                diary: None,
                coloring: Some(ColoringRecord {
                    score: 70,
                    analysis_meta: None,
                }),
            },
        );

        assert_eq!(store.last_diary(&alice).unwrap().unwrap().title, "earlier");
        assert_eq!(store.last_word_telemetry(&alice).unwrap().unwrap().rounds_completed, 3);
        assert_eq!(store.last_coloring(&alice).unwrap().unwrap().score, 70);
    }

    #[test]
    fn test_loaded_store_is_sorted_before_upsert() {
        let rows: Vec<DailySummary> =
            vec![summary(20, 1), summary(10, 3), summary(3, 2), summary(10, 4)];
        let json = serde_json::json!({
            "users": { "alice": { "summaries": rows } }
        })
        .to_string();

        let mut store = InMemoryStore::from_json(&json).unwrap();
        let alice = user("alice");
        store.upsert_daily_summary(&alice, &summary(3, 99)).unwrap();

        let fetched: Vec<(NaiveDate, u8)> = store
            .daily_summaries(&alice, date(1), date(31))
            .unwrap()
            .iter()
            .map(|s| (s.date, s.total_score))
            .collect();
        assert_eq!(fetched, vec![(date(3), 99), (date(10), 4), (date(20), 1)]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = InMemoryStore::new();
        let alice = user("alice");
        store.record_word_telemetry(&alice, WordChainTelemetry::new(4, 1100, 0.75));
        store.upsert_daily_summary(&alice, &summary(2, 66)).unwrap();

        let json = store.to_json().unwrap();
        let loaded = InMemoryStore::from_json(&json).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.user_count(), 1);
    }
}
