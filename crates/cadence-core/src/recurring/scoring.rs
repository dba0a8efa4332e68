//! Confidence scoring

use super::amounts::dispersion_ratio;
use super::temporal::TemporalAnalysis;
use crate::config::DetectionConfig;
use crate::models::{AmountStats, DetectionMode};

/// Confidence from occurrence count and amount consistency alone
///
/// Capped at `similarity_multiplier` so it never rivals a regular schedule.
pub fn similarity_confidence(
    occurrences: usize,
    amount: &AmountStats,
    config: &DetectionConfig,
) -> f64 {
    let occurrence_factor = if config.similarity_saturation == 0 {
        1.0
    } else {
        (occurrences as f64 / config.similarity_saturation as f64).min(1.0)
    };
    let consistency = dispersion_ratio(amount)
        .map(|ratio| (1.0 - ratio).max(0.0))
        .unwrap_or(0.0);

    occurrence_factor * consistency * config.similarity_multiplier
}

/// Pick the confidence and mode for a group
pub fn score(
    temporal: Option<&TemporalAnalysis>,
    occurrences: usize,
    amount: &AmountStats,
    config: &DetectionConfig,
) -> (f64, DetectionMode) {
    match temporal {
        Some(analysis) => (analysis.confidence, DetectionMode::Temporal),
        None => (
            similarity_confidence(occurrences, amount, config),
            DetectionMode::Similarity,
        ),
    }
}
