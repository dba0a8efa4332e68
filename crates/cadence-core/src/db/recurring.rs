//! Recurring pattern persistence
//!
//! `reconcile_patterns` is the only writer used by detection. It runs as one
//! SQLite transaction, holding the write lock from the start, so readers
//! never see a half-replaced pattern set and no import can commit between
//! its snapshot read and its writes.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use super::history::{record_decision, record_run, RunCounts};
use super::transactions::{row_to_transaction, TRANSACTION_COLUMNS};
use super::{begin_write, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    round2, AmountStats, DetectionMode, PatternCandidate, PatternDecision, PatternFilter,
    RecurringPattern, RecurringPatternWithTransactions, RecurringResponse, RecurringSummary,
    TemporalStats,
};

/// What a reconciliation changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// New pending patterns
    pub inserted: usize,
    /// Confirmed patterns whose statistics were refreshed
    pub updated_confirmed: usize,
    /// Pending or rejected patterns wiped before inserting
    pub removed: usize,
    /// Membership links created
    pub links_created: usize,
}

const PATTERN_COLUMNS: &str = r#"
    id, source, category, description_pattern,
    avg_amount, min_amount, max_amount, amount_std_dev,
    frequency, avg_interval_days, interval_std_dev, last_occurrence, next_expected,
    occurrence_count, confidence, detection_mode, is_confirmed, user_label,
    created_at, updated_at
"#;

fn row_to_pattern(row: &Row) -> rusqlite::Result<RecurringPattern> {
    let frequency: Option<String> = row.get(8)?;
    let avg_interval_days: Option<i64> = row.get(9)?;
    let interval_std_dev: Option<f64> = row.get(10)?;
    let last_occurrence = parse_date(row.get(11)?);
    let next_expected = parse_date(row.get(12)?);
    let mode_str: String = row.get(15)?;
    let created_at: String = row.get(18)?;
    let updated_at: String = row.get(19)?;

    let temporal = match (
        frequency.and_then(|f| f.parse().ok()),
        avg_interval_days,
        last_occurrence,
        next_expected,
    ) {
        (Some(frequency), Some(avg_interval_days), Some(last_occurrence), Some(next_expected)) => {
            Some(TemporalStats {
                frequency,
                avg_interval_days,
                interval_std_dev: interval_std_dev.unwrap_or(0.0),
                last_occurrence,
                next_expected,
            })
        }
        _ => None,
    };

    let detection_mode = mode_str.parse().unwrap_or(if temporal.is_some() {
        DetectionMode::Temporal
    } else {
        DetectionMode::Similarity
    });

    Ok(RecurringPattern {
        id: row.get(0)?,
        source: row.get(1)?,
        category: row.get(2)?,
        description_pattern: row.get(3)?,
        amount: AmountStats {
            average: row.get(4)?,
            min: row.get(5)?,
            max: row.get(6)?,
            std_dev: row.get(7)?,
        },
        temporal,
        occurrence_count: row.get(13)?,
        confidence: row.get(14)?,
        detection_mode,
        is_confirmed: row.get(16)?,
        user_label: row.get(17)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

/// The reconcile writes, run inside the caller's write transaction
pub(super) fn reconcile_in(tx: &Connection, candidates: &[PatternCandidate]) -> Result<ReconcileStats> {
    let mut stats = ReconcileStats::default();

    let confirmed: HashMap<(String, String), i64> = {
        let mut stmt = tx.prepare(
            "SELECT source, category, id FROM recurring_patterns WHERE is_confirmed = 1",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let source: String = row.get(0)?;
                let category: String = row.get(1)?;
                let id: i64 = row.get(2)?;
                Ok(((source, category), id))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        rows
    };

    stats.removed = tx.execute(
        "DELETE FROM recurring_patterns WHERE is_confirmed IS NULL OR is_confirmed = 0",
        [],
    )?;

    let orphaned = tx.execute(
        r#"
        DELETE FROM recurring_transactions
        WHERE pattern_id NOT IN (SELECT id FROM recurring_patterns)
           OR transaction_id NOT IN (SELECT id FROM transactions)
        "#,
        [],
    )?;
    if orphaned > 0 {
        debug!(orphaned, "Removed orphaned pattern links");
    }

    for candidate in candidates {
        let key = (candidate.source.clone(), candidate.category.clone());
        let temporal = candidate.temporal.as_ref();

        let pattern_id = if let Some(&id) = confirmed.get(&key) {
            tx.execute(
                r#"
                UPDATE recurring_patterns
                SET avg_amount = ?, min_amount = ?, max_amount = ?, amount_std_dev = ?,
                    frequency = ?, avg_interval_days = ?, interval_std_dev = ?,
                    last_occurrence = ?, next_expected = ?,
                    occurrence_count = ?, confidence = ?, detection_mode = ?,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
                params![
                    round2(candidate.amount.average),
                    round2(candidate.amount.min),
                    round2(candidate.amount.max),
                    round2(candidate.amount.std_dev),
                    temporal.map(|t| t.frequency.as_str()),
                    temporal.map(|t| t.avg_interval_days),
                    temporal.map(|t| t.interval_std_dev),
                    temporal.map(|t| t.last_occurrence.to_string()),
                    temporal.map(|t| t.next_expected.to_string()),
                    candidate.occurrence_count,
                    round2(candidate.confidence),
                    candidate.detection_mode.as_str(),
                    id,
                ],
            )?;
            stats.updated_confirmed += 1;
            id
        } else {
            tx.execute(
                r#"
                INSERT INTO recurring_patterns (
                    source, category, description_pattern,
                    avg_amount, min_amount, max_amount, amount_std_dev,
                    frequency, avg_interval_days, interval_std_dev, last_occurrence, next_expected,
                    occurrence_count, confidence, detection_mode
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    candidate.source,
                    candidate.category,
                    candidate.description_pattern,
                    round2(candidate.amount.average),
                    round2(candidate.amount.min),
                    round2(candidate.amount.max),
                    round2(candidate.amount.std_dev),
                    temporal.map(|t| t.frequency.as_str()),
                    temporal.map(|t| t.avg_interval_days),
                    temporal.map(|t| t.interval_std_dev),
                    temporal.map(|t| t.last_occurrence.to_string()),
                    temporal.map(|t| t.next_expected.to_string()),
                    candidate.occurrence_count,
                    round2(candidate.confidence),
                    candidate.detection_mode.as_str(),
                ],
            )?;
            stats.inserted += 1;
            tx.last_insert_rowid()
        };

        stats.links_created += tx.execute(
            r#"
            INSERT OR IGNORE INTO recurring_transactions (pattern_id, transaction_id)
            SELECT ?, id FROM transactions WHERE source = ? AND category = ?
            "#,
            params![pattern_id, candidate.source, candidate.category],
        )?;
    }

    Ok(stats)
}

impl Database {
    /// Merge freshly detected candidates into the stored pattern set and
    /// log the run
    ///
    /// Confirmed patterns keep their row, decision and label and only get
    /// new statistics. Every other pattern is dropped and replaced by the
    /// candidates. All-or-nothing: on error nothing is changed and no run
    /// is logged.
    pub fn reconcile_patterns(
        &self,
        candidates: &[PatternCandidate],
        counts: &RunCounts,
    ) -> Result<ReconcileStats> {
        let mut conn = self.conn()?;
        let tx = begin_write(&mut conn)?;

        let stats = reconcile_in(&tx, candidates)?;
        record_run(&tx, counts, &stats)?;

        tx.commit()?;
        Ok(stats)
    }

    /// List patterns matching `filter`, highest confidence first, with the
    /// projected monthly/yearly summary
    pub fn list_patterns(&self, filter: &PatternFilter) -> Result<RecurringResponse> {
        let conn = self.conn()?;

        let decision_clause = if filter.confirmed_only {
            "AND is_confirmed = 1"
        } else if filter.include_rejected {
            ""
        } else {
            "AND (is_confirmed IS NULL OR is_confirmed = 1)"
        };

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {PATTERN_COLUMNS}
            FROM recurring_patterns
            WHERE confidence >= ? {decision_clause}
            ORDER BY confidence DESC, id ASC
            "#
        ))?;

        let patterns = stmt
            .query_map(params![filter.min_confidence], row_to_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let summary = RecurringSummary::from_patterns(&patterns);
        Ok(RecurringResponse { patterns, summary })
    }

    /// Get a single pattern by ID
    pub fn get_pattern(&self, id: i64) -> Result<Option<RecurringPattern>> {
        let conn = self.conn()?;

        let pattern = conn
            .query_row(
                &format!("SELECT {PATTERN_COLUMNS} FROM recurring_patterns WHERE id = ?"),
                params![id],
                row_to_pattern,
            )
            .optional()?;

        Ok(pattern)
    }

    /// Get a pattern with its linked transactions (oldest first)
    pub fn get_pattern_with_transactions(
        &self,
        id: i64,
    ) -> Result<Option<RecurringPatternWithTransactions>> {
        let Some(pattern) = self.get_pattern(id)? else {
            return Ok(None);
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            JOIN recurring_transactions rt ON rt.transaction_id = t.id
            WHERE rt.pattern_id = ?
            ORDER BY t.transaction_date, t.id
            "#
        ))?;

        let transactions = stmt
            .query_map(params![id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(RecurringPatternWithTransactions {
            pattern,
            transactions,
        }))
    }

    /// Apply a user's decision; fields absent from `decision` are untouched
    ///
    /// The change and its history record are written together. An empty
    /// decision changes nothing and is not recorded.
    pub fn apply_decision(
        &self,
        id: i64,
        decision: &PatternDecision,
        actor: &str,
    ) -> Result<RecurringPattern> {
        if !decision.is_empty() {
            let label = decision
                .user_label
                .as_deref()
                .map(|l| l.trim().to_string());

            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(confirmed) = decision.is_confirmed {
                sets.push("is_confirmed = ?");
                values.push(Box::new(confirmed));
            }
            if let Some(label) = &label {
                sets.push("user_label = ?");
                values.push(Box::new((!label.is_empty()).then(|| label.clone())));
            }
            sets.push("updated_at = CURRENT_TIMESTAMP");
            values.push(Box::new(id));

            let mut conn = self.conn()?;
            let tx = begin_write(&mut conn)?;

            let sql = format!(
                "UPDATE recurring_patterns SET {} WHERE id = ?",
                sets.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|p| p.as_ref()).collect();
            if tx.execute(&sql, params_refs.as_slice())? == 0 {
                return Err(Error::NotFound(format!("recurring pattern {}", id)));
            }
            record_decision(&tx, id, actor, decision.is_confirmed, label.as_deref())?;

            tx.commit()?;
        }

        self.get_pattern(id)?
            .ok_or_else(|| Error::NotFound(format!("recurring pattern {}", id)))
    }

    /// Mark a pattern rejected (the row is kept until the next recompute)
    pub fn reject_pattern(&self, id: i64, actor: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = begin_write(&mut conn)?;

        let rows = tx.execute(
            "UPDATE recurring_patterns SET is_confirmed = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("recurring pattern {}", id)));
        }
        record_decision(&tx, id, actor, Some(false), None)?;

        tx.commit()?;
        Ok(())
    }
}
