//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Import files and the transactions they own
//! - `transaction_filter` - WHERE-clause builder shared by listings and stats
//! - `stats` - Payment summary and per-category/per-source totals
//! - `recurring` - Recurring pattern reconciliation, listing and user decisions
//! - `history` - Detection run log and pattern decision history

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::TransactionBehavior;
use tracing::info;

use crate::error::Result;

mod history;
mod recurring;
mod stats;
mod transaction_filter;
mod transactions;

pub use history::{DecisionRecord, DetectionRun, RunCounts, RunTrigger};
pub use recurring::ReconcileStats;
pub use stats::{CategoryTotal, PaymentSummary, SourceTotal};
pub use transaction_filter::TransactionFilter;
pub use transactions::{PageRequest, Pagination, TransactionPage};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored calendar date; anything malformed reads back as absent
pub(crate) fn parse_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Start a transaction that takes the write lock up front
///
/// A deferred transaction that reads before it writes fails with
/// SQLITE_BUSY_SNAPSHOT if another connection commits in between, and the
/// busy timeout does not retry that. Every multi-statement write uses this.
pub(crate) fn begin_write(conn: &mut DbConn) -> Result<rusqlite::Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path` and bring the schema up to date
    pub fn new(path: &str) -> Result<Self> {
        // Foreign keys and the busy timeout are per-connection in SQLite
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an isolated throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "cadence_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        // Remove any leftovers from an earlier run with the same pid
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path, suffix));
        }

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the reconciliation writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Imported spreadsheets
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                uploaded_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Transactions (owned by an import file)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                category TEXT NOT NULL,
                source TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                amount_original TEXT NOT NULL DEFAULT '',
                is_paid BOOLEAN NOT NULL DEFAULT 0,
                bank TEXT NOT NULL DEFAULT '',
                transaction_date DATE,                     -- YYYY-MM-DD, NULL when unknown
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_file ON transactions(file_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_key ON transactions(source, category, transaction_date);

            -- Recurring patterns (one per source/category key)
            -- AUTOINCREMENT so ids of wiped patterns are never handed out again
            CREATE TABLE IF NOT EXISTS recurring_patterns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                category TEXT NOT NULL,
                description_pattern TEXT,
                avg_amount REAL NOT NULL,
                min_amount REAL NOT NULL,
                max_amount REAL NOT NULL,
                amount_std_dev REAL NOT NULL,
                frequency TEXT,                            -- weekly, biweekly, monthly, quarterly, yearly, irregular
                avg_interval_days INTEGER,
                interval_std_dev REAL,
                last_occurrence DATE,
                next_expected DATE,
                occurrence_count INTEGER NOT NULL,
                confidence REAL NOT NULL,
                detection_mode TEXT NOT NULL,              -- temporal, similarity
                is_confirmed BOOLEAN,                      -- NULL = pending, 1 = confirmed, 0 = rejected
                user_label TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_recurring_patterns_key ON recurring_patterns(source, category);
            CREATE INDEX IF NOT EXISTS idx_recurring_patterns_confidence ON recurring_patterns(confidence);

            -- Pattern membership links
            CREATE TABLE IF NOT EXISTS recurring_transactions (
                pattern_id INTEGER NOT NULL REFERENCES recurring_patterns(id) ON DELETE CASCADE,
                transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                PRIMARY KEY (pattern_id, transaction_id)
            );

            CREATE INDEX IF NOT EXISTS idx_recurring_transactions_tx ON recurring_transactions(transaction_id);

            -- One row per committed detection run
            CREATE TABLE IF NOT EXISTS detection_runs (
                id INTEGER PRIMARY KEY,
                run_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                trigger TEXT NOT NULL,                     -- manual, background
                transactions_scanned INTEGER NOT NULL,
                groups_analyzed INTEGER NOT NULL,
                temporal_patterns INTEGER NOT NULL,
                similarity_patterns INTEGER NOT NULL,
                rejected_amount_dispersion INTEGER NOT NULL,
                rejected_low_confidence INTEGER NOT NULL,
                inserted INTEGER NOT NULL,
                updated_confirmed INTEGER NOT NULL,
                removed INTEGER NOT NULL,
                links_created INTEGER NOT NULL
            );

            -- User decisions on patterns; the key is copied because pending
            -- and rejected pattern rows are wiped on every recompute
            CREATE TABLE IF NOT EXISTS pattern_decisions (
                id INTEGER PRIMARY KEY,
                decided_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                pattern_id INTEGER NOT NULL,
                source TEXT NOT NULL,
                category TEXT NOT NULL,
                actor TEXT NOT NULL,
                is_confirmed BOOLEAN,                      -- NULL = left unchanged
                user_label TEXT                            -- NULL = left unchanged, '' = cleared
            );

            CREATE INDEX IF NOT EXISTS idx_pattern_decisions_key ON pattern_decisions(source, category);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
