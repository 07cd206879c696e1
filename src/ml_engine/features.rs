//! Longitudinal Feature Deriver
//!
//! Turns a patient's time-ordered assessments into one fixed-width feature
//! vector per visit. Three pieces of state are carried forward across the
//! sequence: the previous total score, the previous day offset and every
//! total score seen so far.
//!
//! ## Column layout (18)
//!
//! | # | name | source |
//! |---|------|--------|
//! | 0 | age | raw |
//! | 1 | mocatots | raw total |
//! | 2-8 | visuospatial_exec .. orientation | raw subscores |
//! | 9 | mem_orient | memory_recall x orientation |
//! | 10 | exec_atten | visuospatial_exec x attention |
//! | 11 | age_moca | age x total |
//! | 12 | raw_recall | memory_recall (again) |
//! | 13 | raw_exec | visuospatial_exec (again) |
//! | 14 | cog_variance | population std of the 7 subscores |
//! | 15 | visit_number | 1-based |
//! | 16 | decline_rate | points/year vs. previous visit |
//! | 17 | avg_mocatots | mean of totals so far |
//!
//! The projection model takes the same 18 columns followed by `gap` (days).

use crate::config::defaults::{CURRENT_FEATURE_COUNT, DAYS_PER_YEAR, PROJECTION_FEATURE_COUNT};
use crate::types::Assessment;

/// Column names of the current-state model, in order.
pub const FEATURE_NAMES: [&str; CURRENT_FEATURE_COUNT] = [
    "age",
    "mocatots",
    "visuospatial_exec",
    "naming",
    "attention",
    "language",
    "abstraction",
    "memory_recall",
    "orientation",
    "mem_orient",
    "exec_atten",
    "age_moca",
    "raw_recall",
    "raw_exec",
    "cog_variance",
    "visit_number",
    "decline_rate",
    "avg_mocatots",
];

/// Name of the extra projection column.
pub const GAP_FEATURE_NAME: &str = "gap";

/// Column names of the projection model, in order.
pub fn projection_feature_names() -> Vec<&'static str> {
    FEATURE_NAMES
        .iter()
        .copied()
        .chain(std::iter::once(GAP_FEATURE_NAME))
        .collect()
}

// ============================================================================
// Feature Vector
// ============================================================================

/// The 18 model inputs for one visit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; CURRENT_FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value of a named column, if the name is part of the layout.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }

    /// The 19-column projection input: these features plus `gap_days`.
    pub fn with_projection_gap(&self, gap_days: f64) -> [f64; PROJECTION_FEATURE_COUNT] {
        let mut out = [0.0; PROJECTION_FEATURE_COUNT];
        out[..CURRENT_FEATURE_COUNT].copy_from_slice(&self.0);
        out[CURRENT_FEATURE_COUNT] = gap_days;
        out
    }

    pub fn cog_variance(&self) -> f64 {
        self.0[14]
    }

    pub fn avg_mocatots(&self) -> f64 {
        self.0[17]
    }
}

/// Derived features for one visit plus the values echoed in its result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisitFeatures {
    pub features: FeatureVector,
    pub decline_rate: f64,
    pub visit_number: u32,
}

// ============================================================================
// Longitudinal State
// ============================================================================

/// Accumulator threaded across one patient's visits.
///
/// Create a fresh state per patient; [`LongitudinalState::observe`] must be
/// fed visits in chronological order.
#[derive(Debug, Clone, Default)]
pub struct LongitudinalState {
    previous_total: Option<f64>,
    previous_days: Option<f64>,
    totals: Vec<f64>,
}

impl LongitudinalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visits observed so far.
    pub fn visits(&self) -> usize {
        self.totals.len()
    }

    /// Derive the features of the next visit and advance the state.
    pub fn observe(&mut self, assessment: &Assessment) -> VisitFeatures {
        let total = assessment.total_score;
        let days = assessment.days_to_visit;

        self.totals.push(total);
        let visit_number = u32::try_from(self.totals.len()).unwrap_or(u32::MAX);

        let decline_rate = match (self.previous_total, self.previous_days) {
            (Some(prev_total), Some(prev_days)) => decline_rate(prev_total, prev_days, total, days),
            _ => 0.0,
        };
        let avg_mocatots = mean(&self.totals);

        let sub = &assessment.subscores;
        let mem_orient = sub.memory_recall * sub.orientation;
        let exec_atten = sub.visuospatial_exec * sub.attention;
        let age_moca = assessment.age * total;
        let cog_variance = population_std(&sub.values());

        let features = FeatureVector([
            assessment.age,
            total,
            sub.visuospatial_exec,
            sub.naming,
            sub.attention,
            sub.language,
            sub.abstraction,
            sub.memory_recall,
            sub.orientation,
            mem_orient,
            exec_atten,
            age_moca,
            sub.memory_recall,
            sub.visuospatial_exec,
            cog_variance,
            f64::from(visit_number),
            decline_rate,
            avg_mocatots,
        ]);

        self.previous_total = Some(total);
        self.previous_days = Some(days);

        VisitFeatures {
            features,
            decline_rate,
            visit_number,
        }
    }
}

/// Derive features for a whole visit sequence with a fresh state.
pub fn derive_features(assessments: &[Assessment]) -> Vec<VisitFeatures> {
    let mut state = LongitudinalState::new();
    assessments.iter().map(|a| state.observe(a)).collect()
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Annualised change in total score since the previous visit.
///
/// Zero when the visits are on the same day or out of order.
pub fn decline_rate(previous_total: f64, previous_days: f64, total: f64, days: f64) -> f64 {
    let years_elapsed = (days - previous_days) / DAYS_PER_YEAR;
    if years_elapsed > 0.0 {
        (total - previous_total) / years_elapsed
    } else {
        0.0
    }
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    pairwise_sum(values) / values.len() as f64
}

/// Population (divide-by-N) standard deviation, two-pass.
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let squared: Vec<f64> = values.iter().map(|v| (v - m) * (v - m)).collect();
    (pairwise_sum(&squared) / values.len() as f64).sqrt()
}

const PAIRWISE_BLOCK: usize = 128;

/// Pairwise summation: 8 interleaved accumulators inside blocks of up to
/// 128, recursive halving above that. Model inputs were computed with this
/// reduction order; changing it changes low-order bits.
fn pairwise_sum(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 8 {
        let mut res = 0.0;
        for v in values {
            res += v;
        }
        res
    } else if n <= PAIRWISE_BLOCK {
        let mut r = [0.0; 8];
        r.copy_from_slice(&values[..8]);
        let mut i = 8;
        while i < n - (n % 8) {
            for (j, acc) in r.iter_mut().enumerate() {
                *acc += values[i + j];
            }
            i += 8;
        }
        let mut res = ((r[0] + r[1]) + (r[2] + r[3])) + ((r[4] + r[5]) + (r[6] + r[7]));
        for v in &values[i..] {
            res += v;
        }
        res
    } else {
        let mut n2 = n / 2;
        n2 -= n2 % 8;
        pairwise_sum(&values[..n2]) + pairwise_sum(&values[n2..])
    }
}
