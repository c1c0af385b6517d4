//! FFI bindings for Synheart Bloom
//!
//! This module provides C-compatible functions for calling Bloom from mobile hosts.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `bloom_free_string`.
//!
//! The host performs diary analysis itself and passes the raw analysis text in;
//! a NULL analysis degrades the diary to neutral qualities.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::build_month_grid;
use crate::error::ComputeError;
use crate::pipeline::{score_day, DailyProcessor};
use crate::quality::extract_diary_quality;
use crate::scoring::PrecomputedAnalysis;
use crate::store::InMemoryStore;
use crate::types::{DailySummary, DayActivity, UserId, YearMonth};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize a result for the host, recording the error on failure
fn json_result<T: Serialize>(result: Result<T, ComputeError>) -> *mut c_char {
    match result.and_then(|value| serde_json::to_string(&value).map_err(ComputeError::from)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn parse_date(date: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| ComputeError::ParseError(format!("invalid date '{date}': {e}")))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Extract diary qualities from raw analysis text.
///
/// # Safety
/// - `raw` must be a valid null-terminated C string.
/// - Returns a newly allocated JSON string that must be freed with `bloom_free_string`.
/// - Returns NULL on error; call `bloom_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bloom_extract_diary_quality(raw: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(raw) = cstr_to_string(raw) else {
        set_last_error("Invalid analysis string pointer");
        return ptr::null_mut();
    };

    json_result(Ok(extract_diary_quality(&raw)))
}

/// Score one day's activity bundle without persisting anything.
///
/// # Safety
/// - `activity_json` must be a valid null-terminated C string holding a
///   `DayActivity` object.
/// - `analysis` may be NULL; otherwise it must be a valid null-terminated C string.
/// - Returns a newly allocated JSON string that must be freed with `bloom_free_string`.
/// - Returns NULL on error; call `bloom_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bloom_score_day(
    activity_json: *const c_char,
    analysis: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(activity_json) = cstr_to_string(activity_json) else {
        set_last_error("Invalid activity string pointer");
        return ptr::null_mut();
    };
    let analyzer = PrecomputedAnalysis(cstr_to_string(analysis));

    json_result(
        serde_json::from_str::<DayActivity>(&activity_json)
            .map_err(ComputeError::from)
            .map(|activity| score_day(&activity, &analyzer)),
    )
}

/// Build the calendar grid for a month from a JSON array of daily summaries.
///
/// # Safety
/// - `summaries_json` must be a valid null-terminated C string.
/// - Returns a newly allocated JSON string that must be freed with `bloom_free_string`.
/// - Returns NULL on error; call `bloom_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bloom_month_grid(
    year: i32,
    month: u32,
    summaries_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(summaries_json) = cstr_to_string(summaries_json) else {
        set_last_error("Invalid summaries string pointer");
        return ptr::null_mut();
    };

    json_result(YearMonth::new(year, month).and_then(|month| {
        let summaries: Vec<DailySummary> = serde_json::from_str(&summaries_json)?;
        Ok(build_month_grid(month, &summaries))
    }))
}

// ============================================================================
// Stateful Store API
// ============================================================================

/// Opaque handle to an in-memory store
pub struct BloomStoreHandle {
    store: InMemoryStore,
}

/// Create an empty store.
///
/// # Safety
/// - Returns a pointer to a newly allocated store.
/// - Must be freed with `bloom_store_free`.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_new() -> *mut BloomStoreHandle {
    clear_last_error();
    Box::into_raw(Box::new(BloomStoreHandle {
        store: InMemoryStore::new(),
    }))
}

/// Free a store.
///
/// # Safety
/// - `store` must be a valid pointer returned by `bloom_store_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_free(store: *mut BloomStoreHandle) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Append a `DayActivity` bundle for a user.
///
/// # Safety
/// - `store` must be a valid pointer returned by `bloom_store_new`.
/// - `user_id` and `activity_json` must be valid null-terminated C strings.
/// - Returns 0 on success, -1 on error; call `bloom_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_record_activity(
    store: *mut BloomStoreHandle,
    user_id: *const c_char,
    activity_json: *const c_char,
) -> i32 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1;
    }
    let handle = &mut *store;

    let Some(user_id) = cstr_to_string(user_id) else {
        set_last_error("Invalid user_id string pointer");
        return -1;
    };
    let Some(activity_json) = cstr_to_string(activity_json) else {
        set_last_error("Invalid activity string pointer");
        return -1;
    };

    let recorded = UserId::new(user_id).and_then(|user| {
        let activity: DayActivity = serde_json::from_str(&activity_json)?;
        handle.store.record_activity(&user, activity);
        Ok(())
    });

    match recorded {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Compute and store the summary for a user's day, returning the report JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `bloom_store_new`.
/// - `user_id` and `date` (`YYYY-MM-DD`) must be valid null-terminated C strings.
/// - `analysis` may be NULL; otherwise it must be a valid null-terminated C string.
/// - Returns a newly allocated JSON string that must be freed with `bloom_free_string`.
/// - Returns NULL on error; call `bloom_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_finalize_day(
    store: *mut BloomStoreHandle,
    user_id: *const c_char,
    date: *const c_char,
    analysis: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &mut *store;

    let Some(user_id) = cstr_to_string(user_id) else {
        set_last_error("Invalid user_id string pointer");
        return ptr::null_mut();
    };
    let Some(date) = cstr_to_string(date) else {
        set_last_error("Invalid date string pointer");
        return ptr::null_mut();
    };
    let analyzer = PrecomputedAnalysis(cstr_to_string(analysis));

    json_result(UserId::new(user_id).and_then(|user| {
        let date = parse_date(&date)?;
        Ok(DailyProcessor::new(&analyzer).finalize_day(&mut handle.store, &user, date))
    }))
}

/// Return a user's calendar grid for `month` (`YYYY-MM`) as JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `bloom_store_new`.
/// - `user_id` and `month` must be valid null-terminated C strings.
/// - Returns a newly allocated JSON string that must be freed with `bloom_free_string`.
/// - Returns NULL on error; call `bloom_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_month_grid(
    store: *const BloomStoreHandle,
    user_id: *const c_char,
    month: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &*store;

    let Some(user_id) = cstr_to_string(user_id) else {
        set_last_error("Invalid user_id string pointer");
        return ptr::null_mut();
    };
    let Some(month) = cstr_to_string(month) else {
        set_last_error("Invalid month string pointer");
        return ptr::null_mut();
    };

    let analyzer = PrecomputedAnalysis(None);
    json_result(UserId::new(user_id).and_then(|user| {
        let month: YearMonth = month.parse()?;
        DailyProcessor::new(&analyzer).month_view(&handle.store, &user, month, None)
    }))
}

/// Save the store as JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `bloom_store_new`.
/// - Returns a newly allocated string that must be freed with `bloom_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_save(store: *const BloomStoreHandle) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &*store;

    match handle.store.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Replace the store's contents with previously saved JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `bloom_store_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `bloom_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn bloom_store_load(store: *mut BloomStoreHandle, json: *const c_char) -> i32 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1;
    }
    let handle = &mut *store;

    let Some(json) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match InMemoryStore::from_json(&json) {
        Ok(loaded) => {
            handle.store = loaded;
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Bloom functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Bloom function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bloom_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Bloom function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn bloom_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Bloom library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn bloom_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const ANALYSIS: &str =
        r#"{"warmth":0.8,"positivity":0.6,"detail":0.6,"calmness":0.7,"mood":"content"}"#;

    fn sample_activity() -> CString {
        CString::new(
            r#"{
                "word": {"rounds_completed": 5, "average_latency_ms": 1750, "valid_answer_ratio": 0.5},
                "diary": {"title": "Baking", "content": "We baked bread with my granddaughter and the whole kitchen smelled wonderful."},
                "coloring": {"score": 85}
            }"#,
        )
        .unwrap()
    }

    unsafe fn take_json(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null());
        let value = serde_json::from_str(CStr::from_ptr(ptr).to_str().unwrap()).unwrap();
        bloom_free_string(ptr);
        value
    }

    unsafe fn last_error() -> String {
        let error = bloom_last_error();
        assert!(!error.is_null());
        CStr::from_ptr(error).to_str().unwrap().to_string()
    }

    #[test]
    fn test_ffi_extract_diary_quality() {
        let raw = CString::new(format!("```json\n{ANALYSIS}\n```")).unwrap();
        unsafe {
            let quality = take_json(bloom_extract_diary_quality(raw.as_ptr()));
            assert_eq!(quality["warmth"], 0.8);
            assert_eq!(quality["mood"], "content");
        }
    }

    #[test]
    fn test_ffi_score_day() {
        let activity = sample_activity();
        let analysis = CString::new(ANALYSIS).unwrap();
        unsafe {
            let scores = take_json(bloom_score_day(activity.as_ptr(), analysis.as_ptr()));
            assert_eq!(scores["word_score"], 55);
            assert_eq!(scores["diary_score"], 69);
            assert_eq!(scores["dimensions"]["total"], 76);

            // Without analysis text the diary falls back to neutral qualities
            let scores = take_json(bloom_score_day(activity.as_ptr(), ptr::null()));
            assert_eq!(scores["diary_score"], 0);
        }
    }

    #[test]
    fn test_ffi_month_grid() {
        let summaries = CString::new("[]").unwrap();
        unsafe {
            let grid = take_json(bloom_month_grid(2023, 11, summaries.as_ptr()));
            assert_eq!(grid.as_array().unwrap().len(), 35);

            assert!(bloom_month_grid(2023, 13, summaries.as_ptr()).is_null());
            assert!(last_error().contains("month"));
        }
    }

    #[test]
    fn test_ffi_store_lifecycle() {
        let user = CString::new("alice").unwrap();
        let date = CString::new("2024-05-14").unwrap();
        let month = CString::new("2024-05").unwrap();
        let activity = sample_activity();
        let analysis = CString::new(ANALYSIS).unwrap();

        unsafe {
            let store = bloom_store_new();
            assert!(!store.is_null());

            assert_eq!(bloom_store_record_activity(store, user.as_ptr(), activity.as_ptr()), 0);

            let report = take_json(bloom_store_finalize_day(
                store,
                user.as_ptr(),
                date.as_ptr(),
                analysis.as_ptr(),
            ));
            assert_eq!(report["persisted"], true);
            assert_eq!(report["summary"]["total_score"], 76);
            assert_eq!(report["producer"]["name"], "synheart-bloom");

            let grid = take_json(bloom_store_month_grid(store, user.as_ptr(), month.as_ptr()));
            let filled = grid
                .as_array()
                .unwrap()
                .iter()
                .filter(|cell| !cell["summary"].is_null())
                .count();
            assert_eq!(filled, 1);

            // Save and reload into a fresh store
            let saved = bloom_store_save(store);
            assert!(!saved.is_null());
            let restored = bloom_store_new();
            assert_eq!(bloom_store_load(restored, saved), 0);
            let restored_grid =
                take_json(bloom_store_month_grid(restored, user.as_ptr(), month.as_ptr()));
            assert_eq!(restored_grid, grid);

            bloom_free_string(saved);
            bloom_store_free(store);
            bloom_store_free(restored);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let bad_json = CString::new("not json").unwrap();
        let blank_user = CString::new("   ").unwrap();
        let bad_date = CString::new("2024-13-40").unwrap();

        unsafe {
            assert!(bloom_score_day(bad_json.as_ptr(), ptr::null()).is_null());
            assert!(!last_error().is_empty());

            let store = bloom_store_new();
            assert_eq!(
                bloom_store_record_activity(store, blank_user.as_ptr(), bad_json.as_ptr()),
                -1
            );
            assert!(last_error().contains("user"));

            let user = CString::new("bob").unwrap();
            let report =
                bloom_store_finalize_day(store, user.as_ptr(), bad_date.as_ptr(), ptr::null());
            assert!(report.is_null());
            assert!(last_error().contains("date"));

            assert_eq!(
                bloom_store_record_activity(ptr::null_mut(), user.as_ptr(), bad_json.as_ptr()),
                -1
            );
            bloom_store_free(store);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = bloom_version();
            assert!(!version.is_null());
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::BLOOM_VERSION);
        }
    }
}
