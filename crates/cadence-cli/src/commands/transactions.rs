//! Transaction command implementations

use anyhow::Result;
use cadence_core::db::PageRequest;
use cadence_core::{Database, TransactionFilter};

use super::truncate;

/// List the newest `limit` transactions matching the filter
pub fn cmd_transactions_list(db: &Database, filter: &TransactionFilter, limit: i64) -> Result<()> {
    let page = db.list_transactions(
        filter,
        Some(PageRequest {
            page: 1,
            per_page: limit,
        }),
    )?;
    let total = page.pagination.total_items;

    if page.data.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  cadence import --file export.csv");
        return Ok(());
    }

    println!();
    println!("📝 Transactions ({} total)", total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in &page.data {
        let date = tx
            .transaction_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "----------".to_string());
        let paid = if tx.is_paid { "✅" } else { "  " };

        println!(
            "   {} │ {:>10.2} │ {} │ {:16} │ {:14} │ {}",
            date,
            tx.amount,
            paid,
            truncate(&tx.source, 16),
            truncate(&tx.category, 14),
            truncate(&tx.description, 30)
        );
    }

    let shown = page.data.len() as i64;
    if total > shown {
        println!("   ... {} more (use --limit)", total - shown);
    }

    Ok(())
}
