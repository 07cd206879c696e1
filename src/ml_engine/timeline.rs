//! Patient timeline preparation.
//!
//! Turns a stored patient record (date of birth plus dated MoCA tests in any
//! order) into the chronological assessment sequence the feature deriver
//! expects, computing age and days-since-first-visit from calendar dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::PredictionError;
use crate::config::defaults::DAYS_PER_YEAR;
use crate::types::{Assessment, PatientRecord};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Chronological assessments plus each one's position in the source record.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTimeline {
    pub assessments: Vec<Assessment>,
    /// `original_indices[i]` is the index in `PatientRecord::moca_tests`
    /// of `assessments[i]`.
    pub original_indices: Vec<usize>,
}

impl PreparedTimeline {
    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }
}

/// Parse `YYYY-MM-DD`, RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]`.
///
/// Dates without an offset are taken as UTC.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, PredictionError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(PredictionError::MalformedPayload(format!(
        "unrecognised date '{raw}'"
    )))
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MS_PER_DAY
}

/// Sort a record's tests by date and compute the derived inputs.
///
/// Tests sharing a date keep their record order.
pub fn prepare(record: &PatientRecord) -> Result<PreparedTimeline, PredictionError> {
    let dob = parse_date(&record.dob)?;

    let mut dated = record
        .moca_tests
        .iter()
        .enumerate()
        .map(|(i, test)| -> Result<_, PredictionError> { Ok((parse_date(&test.date)?, i, test)) })
        .collect::<Result<Vec<_>, PredictionError>>()?;
    dated.sort_by_key(|(when, _, _)| *when);

    let Some(&(first, _, _)) = dated.first() else {
        return Ok(PreparedTimeline {
            assessments: Vec::new(),
            original_indices: Vec::new(),
        });
    };

    let mut assessments = Vec::with_capacity(dated.len());
    let mut original_indices = Vec::with_capacity(dated.len());
    for (when, index, test) in dated {
        assessments.push(Assessment {
            date: test.date.clone(),
            total_score: test.total_score,
            days_to_visit: days_between(first, when),
            age: days_between(dob, when) / DAYS_PER_YEAR,
            subscores: test.subscores,
        });
        original_indices.push(index);
    }

    Ok(PreparedTimeline {
        assessments,
        original_indices,
    })
}
