//! Spending statistics command

use anyhow::Result;
use cadence_core::{Database, TransactionFilter};

use super::truncate;

pub fn cmd_stats(db: &Database, filter: &TransactionFilter) -> Result<()> {
    let summary = db.payment_summary(filter)?;

    println!();
    println!("📊 Spending Stats");
    println!("   ─────────────────────────────────────────────────────────────");

    if summary.paid_count + summary.unpaid_count == 0 {
        println!("   No transactions match.");
        return Ok(());
    }

    println!("   Total:  {:>10.2}", summary.total_spent);
    println!(
        "   Paid:   {:>10.2} ({} transactions)",
        summary.paid_amount, summary.paid_count
    );
    println!(
        "   Unpaid: {:>10.2} ({} transactions)",
        summary.unpaid_amount, summary.unpaid_count
    );

    if let Some(top) = db.top_category(filter)? {
        println!("   Top category: {} ({:.1}%)", top.category, top.percentage);
    }

    let categories = db.category_totals(filter)?;
    println!();
    println!(
        "   {:25} │ {:>10} │ {:>6} │ {:>5}",
        "Category", "Amount", "%", "Count"
    );
    println!("   ──────────────────────────┼────────────┼────────┼───────");
    for row in &categories {
        println!(
            "   {:25} │ {:>10.2} │ {:>5.1}% │ {:>5}",
            truncate(&row.category, 25),
            row.total,
            row.percentage,
            row.count
        );
    }

    let sources = db.source_totals(filter)?;
    println!();
    println!(
        "   {:25} │ {:>10} │ {:>6} │ {:>5}",
        "Source", "Amount", "%", "Count"
    );
    println!("   ──────────────────────────┼────────────┼────────┼───────");
    for row in &sources {
        println!(
            "   {:25} │ {:>10.2} │ {:>5.1}% │ {:>5}",
            truncate(&row.source, 25),
            row.total,
            row.percentage,
            row.count
        );
    }

    Ok(())
}
