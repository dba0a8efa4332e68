//! Test fixtures for cadence-core and downstream crates
//!
//! Enabled for this crate's tests and, via the `test-utils` feature, for the
//! server and CLI test suites.

use chrono::{Days, NaiveDate, Utc};

use crate::models::{NewTransaction, Transaction};

/// Parse a `YYYY-MM-DD` literal
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date must be YYYY-MM-DD")
}

/// An in-memory transaction for pure engine tests
pub fn transaction(
    id: i64,
    source: &str,
    category: &str,
    amount: f64,
    transaction_date: Option<&str>,
) -> Transaction {
    Transaction {
        id,
        file_id: 1,
        category: category.to_string(),
        source: source.to_string(),
        description: format!("{} payment", source),
        amount,
        amount_original: amount.to_string(),
        is_paid: true,
        bank: String::new(),
        transaction_date: transaction_date.map(date),
        created_at: Utc::now(),
    }
}

/// A transaction ready to be imported
pub fn new_transaction(
    source: &str,
    category: &str,
    amount: f64,
    transaction_date: Option<&str>,
) -> NewTransaction {
    NewTransaction {
        category: category.to_string(),
        source: source.to_string(),
        description: format!("{} payment", source),
        amount,
        amount_original: amount.to_string(),
        is_paid: true,
        bank: String::new(),
        transaction_date: transaction_date.map(date),
    }
}

/// `count` charges of `amount`, `step_days` apart starting at `start`
pub fn series(
    source: &str,
    category: &str,
    amount: f64,
    start: &str,
    step_days: u64,
    count: usize,
) -> Vec<NewTransaction> {
    let start = date(start);
    (0..count)
        .map(|i| {
            let day = start
                .checked_add_days(Days::new(step_days * i as u64))
                .expect("test date in range");
            NewTransaction {
                transaction_date: Some(day),
                ..new_transaction(source, category, amount, None)
            }
        })
        .collect()
}

/// The canonical monthly subscription: four charges of 45.00, 30 days apart
pub fn netflix_monthly() -> Vec<NewTransaction> {
    series("Netflix", "Subscription", 45.0, "2024-01-01", 30, 4)
}

/// Minimal CSV export with every supported column
pub const SAMPLE_CSV: &str = "\
Date,Source,Category,Description,Amount,Paid
2024-01-05,Netflix,Subscription,NETFLIX.COM 1001,\"15,99\",yes
2024-02-04,Netflix,Subscription,NETFLIX.COM 1002,\"15,99\",yes
2024-03-05,Netflix,Subscription,NETFLIX.COM 1003,\"15,99\",no
05/01/2024,Gym,Health,Monthly membership,30.00,x
04.02.2024,Gym,Health,Monthly membership,30.00,
,Bakery,Food,Croissant,3.50,
";
