//! Interval analysis: frequency bucket, regularity and next occurrence

use chrono::{Days, NaiveDate};

use super::amounts::{mean, population_std_dev};
use crate::models::{Frequency, TemporalStats, Transaction};

/// Outcome of a successful interval analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalAnalysis {
    pub stats: TemporalStats,
    /// Regularity score in [0, 1]
    pub confidence: f64,
}

/// Bucket a rounded average gap (inclusive ranges); None for non-positive gaps
pub fn classify_frequency(avg_days: i64) -> Option<Frequency> {
    match avg_days {
        5..=9 => Some(Frequency::Weekly),
        12..=16 => Some(Frequency::Biweekly),
        25..=35 => Some(Frequency::Monthly),
        85..=95 => Some(Frequency::Quarterly),
        350..=380 => Some(Frequency::Yearly),
        d if d > 0 => Some(Frequency::Irregular),
        _ => None,
    }
}

/// Analyze the gaps between dated members
///
/// Undated members are ignored. Returns None when fewer than two dates are
/// known or no positive gap remains.
pub fn analyze_intervals(members: &[&Transaction]) -> Option<TemporalAnalysis> {
    let mut dates: Vec<NaiveDate> = members.iter().filter_map(|t| t.transaction_date).collect();
    if dates.len() < 2 {
        return None;
    }
    dates.sort_unstable();

    // Same-day duplicates are not an interval
    let gaps: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .filter(|&days| days > 0)
        .map(|days| days as f64)
        .collect();
    if gaps.is_empty() {
        return None;
    }

    let avg = mean(&gaps);
    let interval_std_dev = population_std_dev(&gaps, avg);
    let avg_interval_days = avg.round() as i64;
    let frequency = classify_frequency(avg_interval_days)?;

    let last_occurrence = *dates.last()?;
    let next_expected = last_occurrence.checked_add_days(Days::new(avg_interval_days as u64))?;

    let confidence = (1.0 - interval_std_dev / avg_interval_days as f64).clamp(0.0, 1.0);

    Some(TemporalAnalysis {
        stats: TemporalStats {
            frequency,
            avg_interval_days,
            interval_std_dev,
            last_occurrence,
            next_expected,
        },
        confidence,
    })
}
