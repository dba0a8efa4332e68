//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Shared by `list_transactions` and the statistics queries so a listing
//! and its totals always cover the same rows.

use chrono::NaiveDate;

/// Which transactions a listing or statistic covers
///
/// Values inside one list are alternatives; the fields themselves must all
/// hold. The default filter matches every transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub file_ids: Vec<i64>,
    /// Substrings of the import file name
    pub file_names: Vec<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub exclude_categories: Vec<String>,
    pub exclude_sources: Vec<String>,
    pub is_paid: Option<bool>,
    /// Inclusive bounds; undated transactions never satisfy a bound
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Result of building a filter - contains SQL components and parameters
pub(crate) struct FilterResult {
    /// JOIN clause (empty string if no joins needed)
    pub join_clause: &'static str,
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one (source, category) key
    pub fn key(mut self, source: &str, category: &str) -> Self {
        self.source = Some(source.to_string());
        self.category = Some(category.to_string());
        self
    }

    pub fn is_paid(mut self, value: Option<bool>) -> Self {
        self.is_paid = value;
        self
    }

    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Build the filter components (transactions aliased as `t`)
    pub(crate) fn build(&self) -> FilterResult {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !self.file_ids.is_empty() {
            conditions.push(format!(
                "t.file_id IN ({})",
                placeholders(self.file_ids.len())
            ));
            for id in &self.file_ids {
                params.push(Box::new(*id));
            }
        }

        let needs_file_join = !self.file_names.is_empty();
        if needs_file_join {
            let alternatives = vec!["f.name LIKE ?"; self.file_names.len()].join(" OR ");
            conditions.push(format!("({})", alternatives));
            for name in &self.file_names {
                params.push(Box::new(format!("%{}%", name.trim())));
            }
        }

        if let Some(source) = &self.source {
            conditions.push("t.source = ?".to_string());
            params.push(Box::new(source.clone()));
        }
        if let Some(category) = &self.category {
            conditions.push("t.category = ?".to_string());
            params.push(Box::new(category.clone()));
        }

        if !self.exclude_categories.is_empty() {
            conditions.push(format!(
                "t.category NOT IN ({})",
                placeholders(self.exclude_categories.len())
            ));
            for category in &self.exclude_categories {
                params.push(Box::new(category.clone()));
            }
        }
        if !self.exclude_sources.is_empty() {
            conditions.push(format!(
                "t.source NOT IN ({})",
                placeholders(self.exclude_sources.len())
            ));
            for source in &self.exclude_sources {
                params.push(Box::new(source.clone()));
            }
        }

        if let Some(is_paid) = self.is_paid {
            conditions.push("t.is_paid = ?".to_string());
            params.push(Box::new(is_paid));
        }

        // Dates are stored as YYYY-MM-DD so text comparison orders them
        if let Some(from) = self.date_from {
            conditions.push("t.transaction_date >= ?".to_string());
            params.push(Box::new(from.to_string()));
        }
        if let Some(to) = self.date_to {
            conditions.push("t.transaction_date <= ?".to_string());
            params.push(Box::new(to.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        FilterResult {
            join_clause: if needs_file_join {
                "LEFT JOIN files f ON t.file_id = f.id"
            } else {
                ""
            },
            where_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Build a COUNT query
    pub fn count_query(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM transactions t {} {}",
            self.join_clause, self.where_clause
        )
    }

    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}
