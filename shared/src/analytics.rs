//! Read-only statistics over the submissions sheet.
//!
//! Nothing here mutates or fails: absent columns read as all-null, and cells
//! that do not parse are skipped row by row.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::datastore::{columns, Table};
use crate::types::{PersonAnalytics, SummaryAnalytics, TaskTypeRejection, TrendPoint};

pub const ACCEPTED: &str = "Accepted";
pub const REJECTED: &str = "Rejected";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a timestamp cell: ISO-8601 / RFC 3339 text, form-export text
/// (`1/31/2024 14:05:00`) or a spreadsheet serial day number.
pub fn parse_timestamp(cell: &Value) -> Option<NaiveDateTime> {
    match cell {
        Value::String(s) => parse_timestamp_text(s.trim()),
        Value::Number(n) => n.as_f64().and_then(from_serial_days),
        _ => None,
    }
}

fn parse_timestamp_text(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn from_serial_days(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days <= 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (days * 86_400.0).round();
    if seconds >= i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(Duration::try_seconds(seconds as i64)?)
}

/// Most frequent value; ties go to whichever was seen first
fn mode<'a>(values: impl Iterator<Item = Cow<'a, str>>) -> Option<String> {
    let mut counts: HashMap<Cow<'a, str>, (usize, usize)> = HashMap::new();
    for (idx, value) in values.enumerate() {
        counts.entry(value).or_insert((0, idx)).0 += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, (count, first))| (*count, Reverse(*first)))
        .map(|(value, _)| value.into_owned())
}

fn count_eq(table: &Table, column: &str, value: &str) -> usize {
    table
        .rows()
        .filter(|row| row.text(column).as_deref() == Some(value))
        .count()
}

fn count_present(table: &Table, column: &str) -> usize {
    table.rows().filter(|row| row.get(column).is_some()).count()
}

pub fn summary(submissions: &Table) -> SummaryAnalytics {
    let unique_members = submissions
        .rows()
        .filter_map(|row| row.text(columns::NAME))
        .collect::<HashSet<_>>()
        .len();

    let most_common_mistake = mode(
        submissions
            .rows()
            .filter_map(|row| row.text(columns::MISTAKE_REASON)),
    );

    let reviewer_with_most_rejected = mode(
        submissions
            .rows()
            .filter(|row| row.text(columns::REJECTED).as_deref() == Some(REJECTED))
            .filter_map(|row| row.text(columns::NAME)),
    );

    SummaryAnalytics {
        total_submissions: submissions.len(),
        unique_members,
        accepted_count: count_eq(submissions, columns::REJECTED, ACCEPTED),
        rejected_count: count_eq(submissions, columns::REJECTED, REJECTED),
        changed_count: count_present(submissions, columns::CHANGED),
        most_common_mistake,
        reviewer_with_most_rejected,
    }
}

/// Statistics for one person's rows (already filtered by `Name`)
pub fn person_analytics(rows: &Table) -> PersonAnalytics {
    let summary = summary(rows);

    let last_submission = rows
        .rows()
        .filter_map(|row| row.get(columns::TIMESTAMP).and_then(parse_timestamp))
        .max()
        .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string());

    let mut mistake_reasons = BTreeMap::new();
    for reason in rows.rows().filter_map(|row| row.text(columns::MISTAKE_REASON)) {
        *mistake_reasons.entry(reason.into_owned()).or_insert(0) += 1;
    }

    PersonAnalytics {
        total_submitted: summary.total_submissions,
        changed_by_leader: summary.changed_count,
        leader_reviewed: count_present(rows, columns::LEADER_NAME),
        fully_aligned: count_eq(rows, columns::QC_ALIGNED, "Yes"),
        misaligned: count_eq(rows, columns::QC_ALIGNED, "No"),
        last_submission,
        mistake_reasons,
        summary,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Accepted/rejected split per task type, sorted by task type. Rows without
/// a task type or outcome are left out.
pub fn rejection_by_task_type(submissions: &Table) -> Vec<TaskTypeRejection> {
    let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for row in submissions.rows() {
        let (Some(task_type), Some(outcome)) =
            (row.text(columns::TASK_TYPE), row.text(columns::REJECTED))
        else {
            continue;
        };
        let entry = groups.entry(task_type.into_owned()).or_insert((0, 0));
        match outcome.as_ref() {
            ACCEPTED => entry.0 += 1,
            REJECTED => entry.1 += 1,
            _ => {}
        }
    }

    groups
        .into_iter()
        .map(|(task_type, (accepted, rejected))| {
            let total = accepted + rejected;
            let rejection_rate = if total > 0 {
                round2(rejected as f64 / total as f64 * 100.0)
            } else {
                0.0
            };
            TaskTypeRejection {
                task_type,
                accepted,
                rejected,
                total,
                rejection_rate,
            }
        })
        .collect()
}

/// Submissions per calendar day, ascending. Unparseable timestamps are dropped.
pub fn submission_trend(submissions: &Table) -> Vec<TrendPoint> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for ts in submissions
        .rows()
        .filter_map(|row| row.get(columns::TIMESTAMP).and_then(parse_timestamp))
    {
        *per_day.entry(ts.date()).or_insert(0) += 1;
    }

    per_day
        .into_iter()
        .map(|(date, count)| TrendPoint {
            date: date.format("%Y-%m-%d").to_string(),
            count,
        })
        .collect()
}
