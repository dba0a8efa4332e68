//! Detection run log and pattern decision history
//!
//! Runs are recorded inside the reconcile transaction and decisions inside
//! the update they describe, so neither log can disagree with the patterns.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::recurring::ReconcileStats;
use super::{parse_datetime, Database};
use crate::error::Result;

/// What started a detection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    /// Requested and awaited by a caller
    #[default]
    Manual,
    /// Fired after a data change, nobody waits for the result
    Background,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Background => "background",
        }
    }
}

impl std::str::FromStr for RunTrigger {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "background" => Ok(Self::Background),
            _ => Err(format!("Unknown run trigger: {}", s)),
        }
    }
}

/// Counters of a run that are known before its reconcile write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub trigger: RunTrigger,
    pub transactions_scanned: usize,
    pub groups_analyzed: usize,
    pub temporal_patterns: usize,
    pub similarity_patterns: usize,
    pub rejected_amount_dispersion: usize,
    pub rejected_low_confidence: usize,
}

/// A committed detection run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRun {
    pub id: i64,
    pub run_at: DateTime<Utc>,
    pub trigger: RunTrigger,
    pub transactions_scanned: i64,
    pub groups_analyzed: i64,
    pub temporal_patterns: i64,
    pub similarity_patterns: i64,
    pub rejected_amount_dispersion: i64,
    pub rejected_low_confidence: i64,
    pub reconcile: ReconcileStats,
}

/// A user decision about a pattern
///
/// Keeps the pattern's key because the pattern row itself may be gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub id: i64,
    pub decided_at: DateTime<Utc>,
    pub pattern_id: i64,
    pub source: String,
    pub category: String,
    pub actor: String,
    /// None when the decision left it unchanged
    pub is_confirmed: Option<bool>,
    /// None when unchanged, empty when the label was cleared
    pub user_label: Option<String>,
}

pub(super) fn record_run(conn: &Connection, counts: &RunCounts, stats: &ReconcileStats) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO detection_runs (
            trigger, transactions_scanned, groups_analyzed, temporal_patterns, similarity_patterns,
            rejected_amount_dispersion, rejected_low_confidence,
            inserted, updated_confirmed, removed, links_created
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            counts.trigger.as_str(),
            counts.transactions_scanned as i64,
            counts.groups_analyzed as i64,
            counts.temporal_patterns as i64,
            counts.similarity_patterns as i64,
            counts.rejected_amount_dispersion as i64,
            counts.rejected_low_confidence as i64,
            stats.inserted as i64,
            stats.updated_confirmed as i64,
            stats.removed as i64,
            stats.links_created as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Copy the pattern's key alongside the decision
pub(super) fn record_decision(
    conn: &Connection,
    pattern_id: i64,
    actor: &str,
    is_confirmed: Option<bool>,
    user_label: Option<&str>,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO pattern_decisions (pattern_id, source, category, actor, is_confirmed, user_label)
        SELECT id, source, category, ?, ?, ? FROM recurring_patterns WHERE id = ?
        "#,
        params![actor, is_confirmed, user_label, pattern_id],
    )?;
    Ok(())
}

fn row_to_run(row: &Row) -> rusqlite::Result<DetectionRun> {
    let run_at: String = row.get(1)?;
    let trigger: String = row.get(2)?;
    let count = |i: usize| -> rusqlite::Result<usize> { Ok(row.get::<_, i64>(i)?.max(0) as usize) };

    Ok(DetectionRun {
        id: row.get(0)?,
        run_at: parse_datetime(&run_at),
        trigger: trigger.parse().unwrap_or_default(),
        transactions_scanned: row.get(3)?,
        groups_analyzed: row.get(4)?,
        temporal_patterns: row.get(5)?,
        similarity_patterns: row.get(6)?,
        rejected_amount_dispersion: row.get(7)?,
        rejected_low_confidence: row.get(8)?,
        reconcile: ReconcileStats {
            inserted: count(9)?,
            updated_confirmed: count(10)?,
            removed: count(11)?,
            links_created: count(12)?,
        },
    })
}

impl Database {
    /// Most recent detection runs first
    pub fn list_detection_runs(&self, limit: i64) -> Result<Vec<DetectionRun>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, run_at, trigger, transactions_scanned, groups_analyzed,
                   temporal_patterns, similarity_patterns,
                   rejected_amount_dispersion, rejected_low_confidence,
                   inserted, updated_confirmed, removed, links_created
            FROM detection_runs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;

        let runs = stmt
            .query_map(params![limit], row_to_run)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Most recent decisions first
    pub fn list_decisions(&self, limit: i64) -> Result<Vec<DecisionRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, decided_at, pattern_id, source, category, actor, is_confirmed, user_label
            FROM pattern_decisions
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;

        let decisions = stmt
            .query_map(params![limit], |row| {
                let decided_at: String = row.get(1)?;
                Ok(DecisionRecord {
                    id: row.get(0)?,
                    decided_at: parse_datetime(&decided_at),
                    pattern_id: row.get(2)?,
                    source: row.get(3)?,
                    category: row.get(4)?,
                    actor: row.get(5)?,
                    is_confirmed: row.get(6)?,
                    user_label: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(decisions)
    }
}
