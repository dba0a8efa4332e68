//! Recurring pattern command implementations

use anyhow::{Context, Result};
use cadence_core::models::{PatternDecision, PatternFilter, RecurringPattern};
use cadence_core::{Database, Error};

use super::{truncate, CLI_ACTOR};

fn status_icon(pattern: &RecurringPattern) -> &'static str {
    match pattern.is_confirmed {
        Some(true) => "✅",
        Some(false) => "❌",
        None => "❔",
    }
}

fn not_found(id: i64) -> anyhow::Error {
    anyhow::anyhow!("Recurring pattern not found: {}", id)
}

pub fn cmd_recurring_list(db: &Database, filter: &PatternFilter) -> Result<()> {
    let response = db.list_patterns(filter)?;

    if response.patterns.is_empty() {
        println!("No recurring patterns found. Run:");
        println!("  cadence detect");
        return Ok(());
    }

    println!();
    println!("🔁 Recurring Spending");
    println!("   ─────────────────────────────────────────────────────────────");

    for pattern in &response.patterns {
        let freq_str = pattern
            .frequency()
            .map(|f| f.as_str())
            .unwrap_or("similar");
        let next_str = pattern
            .temporal
            .map(|t| t.next_expected.to_string())
            .unwrap_or_else(|| "?".to_string());

        println!(
            "   {} #{:<4} {:24} │ {:>9.2}/{:<9} │ {:>3}x │ {:>3.0}% │ next {}",
            status_icon(pattern),
            pattern.id,
            truncate(pattern.display_label(), 24),
            pattern.amount.average,
            freq_str,
            pattern.occurrence_count,
            pattern.confidence * 100.0,
            next_str
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {} patterns │ {:.2} per month │ {:.2} per year",
        response.summary.pattern_count, response.summary.total_monthly, response.summary.total_yearly
    );

    Ok(())
}

pub fn cmd_recurring_show(db: &Database, id: i64) -> Result<()> {
    let detail = db
        .get_pattern_with_transactions(id)?
        .ok_or_else(|| not_found(id))?;
    let pattern = &detail.pattern;

    println!();
    println!(
        "{} {} ({} / {})",
        status_icon(pattern),
        pattern.display_label(),
        pattern.source,
        pattern.category
    );
    println!(
        "   Amount:     {:.2} average ({:.2} to {:.2}, σ {:.2})",
        pattern.amount.average, pattern.amount.min, pattern.amount.max, pattern.amount.std_dev
    );
    match pattern.temporal {
        Some(t) => {
            println!(
                "   Frequency:  {} (every ~{} days, σ {:.1})",
                t.frequency, t.avg_interval_days, t.interval_std_dev
            );
            println!("   Last seen:  {}", t.last_occurrence);
            println!("   Next due:   {}", t.next_expected);
        }
        None => println!("   Frequency:  unknown (detected by amount similarity)"),
    }
    println!(
        "   Confidence: {:.0}% ({} occurrences, {})",
        pattern.confidence * 100.0,
        pattern.occurrence_count,
        pattern.detection_mode
    );

    println!();
    for tx in &detail.transactions {
        let date = tx
            .transaction_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!(
            "   {} │ {:>10.2} │ {}",
            date,
            tx.amount,
            truncate(&tx.description, 40)
        );
    }

    Ok(())
}

fn apply(db: &Database, id: i64, decision: PatternDecision) -> Result<RecurringPattern> {
    match db.apply_decision(id, &decision, CLI_ACTOR) {
        Ok(pattern) => Ok(pattern),
        Err(Error::NotFound(_)) => Err(not_found(id)),
        Err(e) => Err(e).context("Failed to update pattern"),
    }
}

pub fn cmd_recurring_confirm(db: &Database, id: i64, label: Option<&str>) -> Result<()> {
    let decision = PatternDecision {
        is_confirmed: Some(true),
        user_label: label.map(str::to_string),
    };
    let pattern = apply(db, id, decision)?;

    println!("✅ Confirmed #{} ({})", id, pattern.display_label());
    println!("   It will be kept and refreshed on every recomputation.");

    Ok(())
}

pub fn cmd_recurring_reject(db: &Database, id: i64) -> Result<()> {
    let pattern = db.get_pattern(id)?.ok_or_else(|| not_found(id))?;
    db.reject_pattern(id, CLI_ACTOR)
        .context("Failed to reject pattern")?;

    println!("❌ Rejected #{} ({})", id, pattern.display_label());
    println!("   It is hidden until the next recomputation.");

    Ok(())
}

pub fn cmd_recurring_label(db: &Database, id: i64, text: &str) -> Result<()> {
    let decision = PatternDecision {
        is_confirmed: None,
        user_label: Some(text.to_string()),
    };
    let pattern = apply(db, id, decision)?;

    match &pattern.user_label {
        Some(label) => println!("🏷️  Labeled #{} as \"{}\"", id, label),
        None => println!("🏷️  Cleared label of #{}", id),
    }

    Ok(())
}

pub fn cmd_recurring_history(db: &Database, limit: i64) -> Result<()> {
    let runs = db.list_detection_runs(limit)?;
    let decisions = db.list_decisions(limit)?;

    println!();
    println!("🕒 Detection Runs");
    println!("   ─────────────────────────────────────────────────────────────");
    if runs.is_empty() {
        println!("   No detection runs yet. Run: cadence detect");
    }
    for run in &runs {
        println!(
            "   #{:<4} │ {} │ {:10} │ {:>5} scanned │ +{} ~{} -{}",
            run.id,
            run.run_at.format("%Y-%m-%d %H:%M"),
            run.trigger.as_str(),
            run.transactions_scanned,
            run.reconcile.inserted,
            run.reconcile.updated_confirmed,
            run.reconcile.removed
        );
    }

    println!();
    println!("📝 Pattern Decisions");
    println!("   ─────────────────────────────────────────────────────────────");
    if decisions.is_empty() {
        println!("   No decisions yet.");
    }
    for decision in &decisions {
        let verdict = match decision.is_confirmed {
            Some(true) => "confirmed",
            Some(false) => "rejected",
            None => "relabeled",
        };
        let label = match decision.user_label.as_deref() {
            Some("") => " (label cleared)".to_string(),
            Some(label) => format!(" as \"{}\"", truncate(label, 20)),
            None => String::new(),
        };
        println!(
            "   {} │ #{:<4} {:24} │ {}{} by {}",
            decision.decided_at.format("%Y-%m-%d %H:%M"),
            decision.pattern_id,
            truncate(&format!("{} / {}", decision.source, decision.category), 24),
            verdict,
            label,
            decision.actor
        );
    }

    Ok(())
}
