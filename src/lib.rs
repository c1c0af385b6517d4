//! Synheart Bloom - On-device daily wellbeing scoring engine
//!
//! Bloom turns the results of three short guided activities into a daily
//! wellbeing summary: word-chain telemetry, memory-diary analysis and a
//! coloring score → activity sub-scores → emotion/cognition/memory dimensions
//! and a composite total → a Sunday-first month calendar.
//!
//! ## Modules
//!
//! - **Scoring**: `quality`, `scoring`, `aggregator` are pure functions
//! - **Presentation**: `calendar` lays summaries out by month
//! - **Orchestration**: `pipeline` reads and writes through a `WellbeingStore`
//! - **Activities**: `word_chain`, `coloring` and `fill` support the exercises
//!   that produce the inputs

pub mod aggregator;
pub mod calendar;
pub mod coloring;
pub mod error;
pub mod fill;
pub mod pipeline;
pub mod quality;
pub mod scoring;
pub mod store;
pub mod types;
pub mod word_chain;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::aggregate;
pub use calendar::build_month_grid;
pub use error::ComputeError;
pub use pipeline::{score_day, DailyProcessor, DailyReport, DayScores};
pub use quality::extract_diary_quality;
pub use scoring::{score_diary, score_word_chain, DiaryAnalyzer};
pub use store::{InMemoryStore, WellbeingStore};
pub use types::{
    CalendarCell, DailySummary, DayActivity, DiaryQuality, UserId, WordChainTelemetry, YearMonth,
};

/// Bloom version embedded in every daily report
pub const BLOOM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for daily reports
pub const PRODUCER_NAME: &str = "synheart-bloom";
