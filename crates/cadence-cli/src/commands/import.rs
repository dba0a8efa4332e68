//! Import command implementations

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::{parse_csv, Database, DetectionTrigger};
use tracing::info;

use super::{print_detection_results, run_detection, truncate, CLI_ACTOR};

pub fn cmd_import(
    db: &Database,
    trigger: &DetectionTrigger,
    file: &Path,
    name: Option<&str>,
    skip_detection: bool,
) -> Result<()> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    println!("📥 Importing {}...", file.display());

    let parsed = parse_csv(BufReader::new(csv_file))
        .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;

    let name = name.map(str::to_string).unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string())
    });

    let file_id = db
        .import_file(&name, &parsed.transactions)
        .context("Failed to store transactions")?;

    info!(
        actor = CLI_ACTOR,
        file_id,
        imported = parsed.transactions.len(),
        skipped = parsed.skipped_rows,
        "Imported file"
    );

    println!(
        "   Imported {} transactions as file #{} ({})",
        parsed.transactions.len(),
        file_id,
        name
    );
    if parsed.skipped_rows > 0 {
        println!(
            "   ⚠️  Skipped {} rows without a readable amount",
            parsed.skipped_rows
        );
    }

    if skip_detection {
        println!("   Detection skipped (--no-detect). Run: cadence detect");
        return Ok(());
    }

    println!();
    println!("🔍 Detecting recurring spending...");
    let results = run_detection(trigger)?;
    print_detection_results(&results);

    Ok(())
}

pub fn cmd_files_list(db: &Database) -> Result<()> {
    let files = db.list_files()?;

    if files.is_empty() {
        println!("No files imported yet. Import one with:");
        println!("  cadence import --file export.csv");
        return Ok(());
    }

    println!();
    println!("📁 Imported Files");
    println!("   ─────────────────────────────────────────────────────────────");

    for file in files {
        println!(
            "   #{:<4} │ {:30} │ {:>5} transactions │ {}",
            file.id,
            truncate(&file.name, 30),
            file.transaction_count,
            file.uploaded_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

pub fn cmd_files_remove(db: &Database, trigger: &DetectionTrigger, id: i64) -> Result<()> {
    let file = db
        .get_file(id)?
        .ok_or_else(|| anyhow::anyhow!("File not found: {}", id))?;

    db.delete_file(id)?;
    info!(actor = CLI_ACTOR, file_id = id, "Deleted file");

    println!(
        "🗑️  Removed file #{} ({}) and its {} transactions",
        id, file.name, file.transaction_count
    );

    let results = run_detection(trigger)?;
    println!(
        "   Patterns refreshed: {} found, {} removed",
        results.patterns_found(),
        results.reconcile.removed
    );

    Ok(())
}
