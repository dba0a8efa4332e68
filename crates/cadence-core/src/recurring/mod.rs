//! Recurring spending pattern detection
//!
//! A detection run is a full recompute:
//! 1. read every transaction from the store
//! 2. group by exact (source, category)
//! 3. per group: amount gate, interval analysis, label, confidence gate
//! 4. reconcile the surviving candidates with stored patterns in one write,
//!    logging the run in the same transaction
//!
//! Steps 2 and 3 are pure and live in [`detect_candidates`].

mod amounts;
mod description;
mod grouping;
mod scoring;
mod temporal;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::db::{Database, ReconcileStats, RunCounts, RunTrigger};
use crate::error::Result;
use crate::models::{DetectionMode, PatternCandidate, Transaction};

pub use amounts::{amount_stats, dispersion_ratio, passes_amount_gate};
pub use description::{common_prefix, description_label};
pub use grouping::{group_transactions, TransactionGroup};
pub use scoring::{score, similarity_confidence};
pub use temporal::{analyze_intervals, classify_frequency, TemporalAnalysis};

/// Why a group did not become a pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Amounts too spread out (or averaging zero)
    AmountDispersion,
    /// Scored below the confidence floor
    LowConfidence(f64),
}

/// Outcome of the pure part of a detection run
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub candidates: Vec<PatternCandidate>,
    pub groups_analyzed: usize,
    pub rejected_amount_dispersion: usize,
    pub rejected_low_confidence: usize,
}

/// Counters reported by a detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionResults {
    pub transactions_scanned: usize,
    pub groups_analyzed: usize,
    pub temporal_patterns: usize,
    pub similarity_patterns: usize,
    pub rejected_amount_dispersion: usize,
    pub rejected_low_confidence: usize,
    pub reconcile: ReconcileStats,
}

impl DetectionResults {
    pub fn patterns_found(&self) -> usize {
        self.temporal_patterns + self.similarity_patterns
    }
}

/// Build a candidate for one group, or say why it was rejected
pub fn build_candidate(
    group: &TransactionGroup<'_>,
    config: &DetectionConfig,
) -> std::result::Result<PatternCandidate, Rejection> {
    let amount = amount_stats(&group.members).ok_or(Rejection::AmountDispersion)?;
    if !passes_amount_gate(&amount, config.max_amount_dispersion) {
        return Err(Rejection::AmountDispersion);
    }

    let temporal = analyze_intervals(&group.members);
    let (confidence, detection_mode) = score(temporal.as_ref(), group.len(), &amount, config);
    if confidence < config.min_confidence {
        return Err(Rejection::LowConfidence(confidence));
    }

    let descriptions: Vec<&str> = group
        .members
        .iter()
        .map(|t| t.description.as_str())
        .collect();

    Ok(PatternCandidate {
        source: group.source.to_string(),
        category: group.category.to_string(),
        description_pattern: description_label(&descriptions, config.min_label_length),
        amount,
        temporal: temporal.map(|t| t.stats),
        occurrence_count: group.len() as i64,
        confidence,
        detection_mode,
    })
}

/// Run the pure pipeline and keep the rejection counts
pub fn analyze(transactions: &[Transaction], config: &DetectionConfig) -> Analysis {
    let groups = group_transactions(transactions, config.min_group_size);
    let mut analysis = Analysis {
        groups_analyzed: groups.len(),
        ..Default::default()
    };

    for group in &groups {
        match build_candidate(group, config) {
            Ok(candidate) => analysis.candidates.push(candidate),
            Err(Rejection::AmountDispersion) => {
                debug!(
                    source = group.source,
                    category = group.category,
                    "Group rejected: amounts too dispersed"
                );
                analysis.rejected_amount_dispersion += 1;
            }
            Err(Rejection::LowConfidence(confidence)) => {
                debug!(
                    source = group.source,
                    category = group.category,
                    confidence,
                    "Group rejected: low confidence"
                );
                analysis.rejected_low_confidence += 1;
            }
        }
    }

    analysis
}

/// Candidates for every group that passes both gates
pub fn detect_candidates(
    transactions: &[Transaction],
    config: &DetectionConfig,
) -> Vec<PatternCandidate> {
    analyze(transactions, config).candidates
}

/// Runs full detection against a database
pub struct RecurringDetector<'a> {
    db: &'a Database,
    config: DetectionConfig,
    trigger: RunTrigger,
}

impl<'a> RecurringDetector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, DetectionConfig::default())
    }

    pub fn with_config(db: &'a Database, config: DetectionConfig) -> Self {
        Self {
            db,
            config,
            trigger: RunTrigger::Manual,
        }
    }

    /// Record runs as started by `trigger` in the run log
    pub fn triggered_by(mut self, trigger: RunTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// One read, pure analysis, one atomic reconcile write
    pub fn run(&self) -> Result<DetectionResults> {
        let transactions = self.db.list_all_transactions()?;
        info!(
            transactions = transactions.len(),
            "Starting recurring pattern detection"
        );

        let analysis = analyze(&transactions, &self.config);
        let temporal_patterns = analysis
            .candidates
            .iter()
            .filter(|c| c.detection_mode == DetectionMode::Temporal)
            .count();

        let counts = RunCounts {
            trigger: self.trigger,
            transactions_scanned: transactions.len(),
            groups_analyzed: analysis.groups_analyzed,
            temporal_patterns,
            similarity_patterns: analysis.candidates.len() - temporal_patterns,
            rejected_amount_dispersion: analysis.rejected_amount_dispersion,
            rejected_low_confidence: analysis.rejected_low_confidence,
        };
        let reconcile = self.db.reconcile_patterns(&analysis.candidates, &counts)?;

        let results = DetectionResults {
            transactions_scanned: counts.transactions_scanned,
            groups_analyzed: counts.groups_analyzed,
            temporal_patterns: counts.temporal_patterns,
            similarity_patterns: counts.similarity_patterns,
            rejected_amount_dispersion: counts.rejected_amount_dispersion,
            rejected_low_confidence: counts.rejected_low_confidence,
            reconcile,
        };

        info!(
            patterns = results.patterns_found(),
            temporal = results.temporal_patterns,
            similarity = results.similarity_patterns,
            inserted = reconcile.inserted,
            confirmed_updated = reconcile.updated_confirmed,
            removed = reconcile.removed,
            "Recurring pattern detection complete"
        );

        Ok(results)
    }
}
