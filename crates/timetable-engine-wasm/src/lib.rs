//! WASM bindings for timetable-engine.
//!
//! Exposes the client-side half of scheduling to JavaScript via
//! `wasm-bindgen`: semester week arithmetic, time-slot expansion and
//! stateless conflict detection for a draft assignment. Complex types cross
//! the boundary as JSON strings; dates are `YYYY-MM-DD`.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p timetable-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/timetable_engine_wasm.wasm
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use timetable_engine::calendar::{date_for_week_and_day, week_and_day_for_date};
use timetable_engine::model::MAX_SEMESTER_WEEKS;
use timetable_engine::{detect, expand_all, ClassAssignment, TimeSlot};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Plain-Rust implementations; the exports below only convert the error type
// ---------------------------------------------------------------------------

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn date_for_week_and_day_impl(semester_start: &str, week: i32, day_of_week: i32) -> Result<String, String> {
    if !(1..=7).contains(&day_of_week) {
        return Err(format!("day_of_week must be 1-7, got {}", day_of_week));
    }
    let start = parse_date(semester_start)?;
    let date = date_for_week_and_day(start, i64::from(week), i64::from(day_of_week))
        .map_err(|e| e.to_string())?;
    Ok(date.to_string())
}

fn validate_slots(slots: &[TimeSlot], owner: &str) -> Result<(), String> {
    for (i, slot) in slots.iter().enumerate() {
        slot.validate(MAX_SEMESTER_WEEKS)
            .map_err(|e| format!("Invalid time slot #{} of {}: {}", i, owner, e))?;
    }
    Ok(())
}

fn week_and_day_for_date_impl(semester_start: &str, date: &str) -> Result<String, String> {
    let start = parse_date(semester_start)?;
    let date = parse_date(date)?;
    let week_day = week_and_day_for_date(start, date).map_err(|e| e.to_string())?;
    to_json(&week_day)
}

fn expand_time_slots_impl(slots_json: &str, semester_start: &str) -> Result<String, String> {
    let slots: Vec<TimeSlot> =
        serde_json::from_str(slots_json).map_err(|e| format!("Invalid time slots JSON: {}", e))?;
    validate_slots(&slots, "input")?;
    let start = parse_date(semester_start)?;
    let occurrences = expand_all(&slots, start).map_err(|e| e.to_string())?;
    to_json(&occurrences)
}

fn detect_conflicts_impl(
    candidate_json: &str,
    others_json: &str,
    semester_start: &str,
) -> Result<String, String> {
    let candidate: ClassAssignment = serde_json::from_str(candidate_json)
        .map_err(|e| format!("Invalid candidate JSON: {}", e))?;
    let others: Vec<ClassAssignment> = serde_json::from_str(others_json)
        .map_err(|e| format!("Invalid assignments JSON: {}", e))?;
    let start = parse_date(semester_start)?;

    validate_slots(&candidate.class_time, "candidate")?;
    for other in &others {
        validate_slots(&other.class_time, &other.assignment_uuid.to_string())?;
    }

    let keys = detect(&candidate, &others, start).map_err(|e| e.to_string())?;
    to_json(&keys)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Date of `week` (1-based) and `day_of_week` (1 = Monday) in a semester
/// starting on `semester_start`. Returns `YYYY-MM-DD`.
#[wasm_bindgen(js_name = "dateForWeekAndDay")]
pub fn date_for_week_and_day_js(
    semester_start: &str,
    week: i32,
    day_of_week: i32,
) -> Result<String, JsValue> {
    date_for_week_and_day_impl(semester_start, week, day_of_week).map_err(|e| JsValue::from_str(&e))
}

/// Semester week and weekday of `date`, as `{"week": W, "day": D}`.
///
/// Fails for dates before `semester_start`.
#[wasm_bindgen(js_name = "weekAndDayForDate")]
pub fn week_and_day_for_date_js(semester_start: &str, date: &str) -> Result<String, JsValue> {
    week_and_day_for_date_impl(semester_start, date).map_err(|e| JsValue::from_str(&e))
}

/// Expand a JSON array of time slots into dated occurrences.
///
/// Returns a JSON array of `{date, day_of_week, period_start, period_end}`.
#[wasm_bindgen(js_name = "expandTimeSlots")]
pub fn expand_time_slots(slots_json: &str, semester_start: &str) -> Result<String, JsValue> {
    expand_time_slots_impl(slots_json, semester_start).map_err(|e| JsValue::from_str(&e))
}

/// Detect conflicts between a candidate assignment and a list of others.
///
/// Nothing is persisted; this is the check a scheduling form runs while the
/// user edits. A candidate that has not been saved yet should carry the nil
/// UUID. Returns a JSON array of conflict keys.
#[wasm_bindgen(js_name = "detectConflicts")]
pub fn detect_conflicts(
    candidate_json: &str,
    others_json: &str,
    semester_start: &str,
) -> Result<String, JsValue> {
    detect_conflicts_impl(candidate_json, others_json, semester_start)
        .map_err(|e| JsValue::from_str(&e))
}
