//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_detect` - Recompute recurring patterns

use anyhow::{Context, Result};
use cadence_core::{AppConfig, Database, DetectionResults, DetectionTrigger};

/// Open (and migrate) the configured database
pub fn open_db(config: &AppConfig) -> Result<Database> {
    Database::new(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path))
}

pub fn cmd_init(config: &AppConfig) -> Result<()> {
    println!("🔧 Initializing database at {}...", config.db_path);

    let db = open_db(config)?;
    let files = db.list_files()?;
    if !files.is_empty() {
        println!("   Found {} existing import file(s)", files.len());
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: cadence import --file export.csv");
    println!("  2. Review patterns: cadence recurring");
    println!("  3. Start web UI: cadence serve");

    Ok(())
}

/// Run detection through the single-flight trigger
///
/// Fails when another run of the same trigger is in flight.
pub fn run_detection(trigger: &DetectionTrigger) -> Result<DetectionResults> {
    trigger
        .run_detection()
        .context("Recurring detection failed")?
        .ok_or_else(|| anyhow::anyhow!("Recurring detection is already running"))
}

pub fn print_detection_results(results: &DetectionResults) {
    println!(
        "   Scanned {} transactions in {} groups",
        results.transactions_scanned, results.groups_analyzed
    );
    println!(
        "   🔁 {} temporal, {} similarity patterns",
        results.temporal_patterns, results.similarity_patterns
    );
    if results.rejected_amount_dispersion + results.rejected_low_confidence > 0 {
        println!(
            "   Skipped {} groups with unstable amounts, {} below the confidence floor",
            results.rejected_amount_dispersion, results.rejected_low_confidence
        );
    }
    println!(
        "   Stored: {} new, {} confirmed updated, {} removed",
        results.reconcile.inserted, results.reconcile.updated_confirmed, results.reconcile.removed
    );
}

pub fn cmd_detect(trigger: &DetectionTrigger) -> Result<()> {
    println!("🔍 Detecting recurring spending...");

    let results = run_detection(trigger)?;
    print_detection_results(&results);

    println!();
    println!("✅ Detection complete! Review with: cadence recurring");

    Ok(())
}
