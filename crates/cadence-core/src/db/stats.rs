//! Spending statistics over a filtered set of transactions

use serde::Serialize;

use super::transaction_filter::TransactionFilter;
use super::Database;
use crate::error::Result;
use crate::models::round2;

/// How much of the filtered spending is paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub total_spent: f64,
    pub paid_amount: f64,
    pub unpaid_amount: f64,
    pub paid_count: i64,
    pub unpaid_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: i64,
    /// Share of the filtered total; 0 when that total is not positive
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTotal {
    pub source: String,
    pub total: f64,
    pub count: i64,
    pub percentage: f64,
}

/// (group value, total, count, percentage), largest total first
type GroupTotals = Vec<(String, f64, i64, f64)>;

impl Database {
    pub fn payment_summary(&self, filter: &TransactionFilter) -> Result<PaymentSummary> {
        let conn = self.conn()?;
        let built = filter.build();

        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(t.amount), 0),
                COALESCE(SUM(CASE WHEN t.is_paid = 1 THEN t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.is_paid = 0 THEN t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.is_paid = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.is_paid = 0 THEN 1 ELSE 0 END), 0)
            FROM transactions t
            {}
            {}
            "#,
            built.join_clause, built.where_clause
        );

        let summary = conn.query_row(&sql, built.params_refs().as_slice(), |row| {
            Ok(PaymentSummary {
                total_spent: round2(row.get(0)?),
                paid_amount: round2(row.get(1)?),
                unpaid_amount: round2(row.get(2)?),
                paid_count: row.get(3)?,
                unpaid_count: row.get(4)?,
            })
        })?;

        Ok(summary)
    }

    pub fn category_totals(&self, filter: &TransactionFilter) -> Result<Vec<CategoryTotal>> {
        Ok(self
            .totals_by("t.category", filter)?
            .into_iter()
            .map(|(category, total, count, percentage)| CategoryTotal {
                category,
                total,
                count,
                percentage,
            })
            .collect())
    }

    pub fn source_totals(&self, filter: &TransactionFilter) -> Result<Vec<SourceTotal>> {
        Ok(self
            .totals_by("t.source", filter)?
            .into_iter()
            .map(|(source, total, count, percentage)| SourceTotal {
                source,
                total,
                count,
                percentage,
            })
            .collect())
    }

    /// The category with the largest total, if any transaction matches
    pub fn top_category(&self, filter: &TransactionFilter) -> Result<Option<CategoryTotal>> {
        Ok(self.category_totals(filter)?.into_iter().next())
    }

    fn totals_by(&self, column: &'static str, filter: &TransactionFilter) -> Result<GroupTotals> {
        let conn = self.conn()?;
        let built = filter.build();

        let sql = format!(
            r#"
            SELECT {column}, SUM(t.amount) AS total, COUNT(*)
            FROM transactions t
            {}
            {}
            GROUP BY {column}
            ORDER BY total DESC, {column}
            "#,
            built.join_clause, built.where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(built.params_refs().as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let grand_total: f64 = rows.iter().map(|(_, total, _)| total).sum();

        Ok(rows
            .into_iter()
            .map(|(value, total, count)| {
                let percentage = if grand_total > 0.0 {
                    round2(total / grand_total * 100.0)
                } else {
                    0.0
                };
                (value, round2(total), count, percentage)
            })
            .collect())
    }
}
