//! Import file and transaction operations

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::transaction_filter::TransactionFilter;
use super::{begin_write, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ImportFile, NewTransaction, Transaction, TransactionPatch};

pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.file_id, t.category, t.source, t.description, t.amount, t.amount_original, t.is_paid, t.bank, t.transaction_date, t.created_at";

/// One page of a transaction listing (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub data: Vec<Transaction>,
    pub pagination: Pagination,
}

/// Map a row selected with `TRANSACTION_COLUMNS`
pub(crate) fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let date_str: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(10)?;

    Ok(Transaction {
        id: row.get(0)?,
        file_id: row.get(1)?,
        category: row.get(2)?,
        source: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        amount_original: row.get(6)?,
        is_paid: row.get(7)?,
        bank: row.get(8)?,
        transaction_date: parse_date(date_str),
        created_at: parse_datetime(&created_at_str),
    })
}

fn insert_transactions(
    conn: &rusqlite::Connection,
    file_id: i64,
    transactions: &[NewTransaction],
) -> Result<usize> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO transactions (file_id, category, source, description, amount, amount_original, is_paid, bank, transaction_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )?;

    for tx in transactions {
        stmt.execute(params![
            file_id,
            tx.category,
            tx.source,
            tx.description,
            tx.amount,
            tx.amount_original,
            tx.is_paid,
            tx.bank,
            tx.transaction_date.map(|d| d.to_string()),
        ])?;
    }

    Ok(transactions.len())
}

impl Database {
    /// Create a file record together with its transactions in one transaction
    pub fn import_file(&self, name: &str, transactions: &[NewTransaction]) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = begin_write(&mut conn)?;

        tx.execute("INSERT INTO files (name) VALUES (?)", params![name])?;
        let file_id = tx.last_insert_rowid();
        insert_transactions(&tx, file_id, transactions)?;

        tx.commit()?;
        Ok(file_id)
    }

    /// Replace every transaction of an existing file
    ///
    /// Links from patterns to the old transactions go with them. The file
    /// keeps its id; its name changes only when `name` is given.
    pub fn reimport_file(
        &self,
        file_id: i64,
        name: Option<&str>,
        transactions: &[NewTransaction],
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = begin_write(&mut conn)?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM files WHERE id = ?", params![file_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("file {}", file_id)));
        }

        tx.execute(
            "DELETE FROM transactions WHERE file_id = ?",
            params![file_id],
        )?;
        if let Some(name) = name {
            tx.execute(
                "UPDATE files SET name = ?, uploaded_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![name, file_id],
            )?;
        } else {
            tx.execute(
                "UPDATE files SET uploaded_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![file_id],
            )?;
        }
        let inserted = insert_transactions(&tx, file_id, transactions)?;

        tx.commit()?;
        Ok(inserted)
    }

    /// List import files, newest first
    pub fn list_files(&self) -> Result<Vec<ImportFile>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT f.id, f.name, f.uploaded_at, COUNT(t.id)
            FROM files f
            LEFT JOIN transactions t ON t.file_id = f.id
            GROUP BY f.id
            ORDER BY f.uploaded_at DESC, f.id DESC
            "#,
        )?;

        let files = stmt
            .query_map([], |row| {
                let uploaded_at: String = row.get(2)?;
                Ok(ImportFile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    uploaded_at: parse_datetime(&uploaded_at),
                    transaction_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Get a single import file
    pub fn get_file(&self, id: i64) -> Result<Option<ImportFile>> {
        let conn = self.conn()?;

        let file = conn
            .query_row(
                r#"
                SELECT f.id, f.name, f.uploaded_at,
                       (SELECT COUNT(*) FROM transactions t WHERE t.file_id = f.id)
                FROM files f
                WHERE f.id = ?
                "#,
                params![id],
                |row| {
                    let uploaded_at: String = row.get(2)?;
                    Ok(ImportFile {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        uploaded_at: parse_datetime(&uploaded_at),
                        transaction_count: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(file)
    }

    /// Delete a file; its transactions and their pattern links cascade
    pub fn delete_file(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM files WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    /// All transactions, ordered by source, category and date
    pub fn list_all_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            ORDER BY t.source, t.category, t.transaction_date, t.id
            "#
        ))?;

        let transactions = stmt
            .query_map([], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Transactions sharing one (source, category) key, newest first
    pub fn list_transactions_by_key(&self, source: &str, category: &str) -> Result<Vec<Transaction>> {
        let filter = TransactionFilter::new().key(source, category);
        Ok(self.list_transactions(&filter, None)?.data)
    }

    /// Transactions matching `filter`, newest first with undated ones last
    ///
    /// Without a page request every match is returned as a single page.
    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Option<PageRequest>,
    ) -> Result<TransactionPage> {
        if page.is_some_and(|p| p.page < 1 || p.per_page < 1) {
            return Err(Error::InvalidData(
                "page and per_page must be at least 1".into(),
            ));
        }

        let conn = self.conn()?;
        let built = filter.build();

        let total_items: i64 = conn.query_row(
            &built.count_query(),
            built.params_refs().as_slice(),
            |row| row.get(0),
        )?;

        // LIMIT -1 is unbounded in SQLite
        let (limit, offset) = match page {
            Some(p) => (p.per_page, p.offset()),
            None => (-1, 0),
        };

        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            {}
            {}
            ORDER BY t.transaction_date IS NULL, t.transaction_date DESC, t.id DESC
            LIMIT ? OFFSET ?
            "#,
            built.join_clause, built.where_clause
        );

        let mut params = built.params_refs();
        params.push(&limit);
        params.push(&offset);

        let mut stmt = conn.prepare(&sql)?;
        let data = stmt
            .query_map(params.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let pagination = match page {
            Some(p) => Pagination {
                page: p.page,
                per_page: p.per_page,
                total_items,
                total_pages: (total_items + p.per_page - 1) / p.per_page,
            },
            None => Pagination {
                page: 1,
                per_page: total_items,
                total_items,
                total_pages: 1,
            },
        };

        Ok(TransactionPage { data, pagination })
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let tx = conn
            .query_row(
                &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = ?"),
                params![id],
                row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// Apply a user's edit to one transaction
    ///
    /// Moving a transaction to another (source, category) key drops its
    /// pattern links; the next detection run links it again.
    pub fn update_transaction(&self, id: i64, patch: &TransactionPatch) -> Result<Transaction> {
        let not_found = || Error::NotFound(format!("transaction {}", id));

        if patch.is_empty() {
            return self.get_transaction(id)?.ok_or_else(not_found);
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        for (column, value) in [
            ("category = ?", &patch.category),
            ("source = ?", &patch.source),
        ] {
            if let Some(value) = value {
                let value = value.trim();
                if value.is_empty() {
                    return Err(Error::InvalidData(format!(
                        "{} must not be empty",
                        column.trim_end_matches(" = ?")
                    )));
                }
                sets.push(column);
                values.push(Box::new(value.to_string()));
            }
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            values.push(Box::new(description.trim().to_string()));
        }
        if let Some(amount) = patch.amount {
            if !amount.is_finite() {
                return Err(Error::InvalidData("amount must be a finite number".into()));
            }
            sets.push("amount = ?");
            values.push(Box::new(amount));
        }
        if let Some(is_paid) = patch.is_paid {
            sets.push("is_paid = ?");
            values.push(Box::new(is_paid));
        }
        if let Some(bank) = &patch.bank {
            sets.push("bank = ?");
            values.push(Box::new(bank.trim().to_string()));
        }
        if let Some(date) = patch.transaction_date {
            sets.push("transaction_date = ?");
            values.push(Box::new(date.to_string()));
        }
        values.push(Box::new(id));

        let mut conn = self.conn()?;
        let tx = begin_write(&mut conn)?;

        let sql = format!("UPDATE transactions SET {} WHERE id = ?", sets.join(", "));
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        if tx.execute(&sql, params_refs.as_slice())? == 0 {
            return Err(not_found());
        }

        if patch.source.is_some() || patch.category.is_some() {
            tx.execute(
                r#"
                DELETE FROM recurring_transactions
                WHERE transaction_id = ?
                  AND pattern_id NOT IN (
                      SELECT p.id FROM recurring_patterns p
                      JOIN transactions t ON t.source = p.source AND t.category = p.category
                      WHERE t.id = ?
                  )
                "#,
                params![id, id],
            )?;
        }

        tx.commit()?;
        self.get_transaction(id)?.ok_or_else(not_found)
    }

    /// Delete one transaction; its pattern links cascade
    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    /// Count all transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }
}
