//! CSV import of spending spreadsheets
//!
//! Exports often carry a few metadata lines above the real header, so the
//! header is the first row (within `HEADER_SEARCH_ROWS`) that names the
//! required columns. Header names are matched case-insensitively against a
//! set of aliases.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::NewTransaction;

const HEADER_SEARCH_ROWS: usize = 10;

/// Parsed rows plus how many data rows were dropped
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub transactions: Vec<NewTransaction>,
    /// Rows with a missing or unparseable amount, or unreadable bytes
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Source,
    Category,
    Description,
    Amount,
    Paid,
    Bank,
}

fn column_for(header: &str) -> Option<Column> {
    match header.trim().to_lowercase().as_str() {
        "date" | "transaction_date" | "transaction date" | "data" => Some(Column::Date),
        "source" | "payee" | "merchant" | "skąd" => Some(Column::Source),
        "category" | "rodzaj" => Some(Column::Category),
        "description" | "memo" | "co" => Some(Column::Description),
        "amount" | "za ile" => Some(Column::Amount),
        "paid" | "is_paid" | "opłacone?" => Some(Column::Paid),
        "bank" | "card" | "account" => Some(Column::Bank),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct ColumnIndex {
    date: Option<usize>,
    source: Option<usize>,
    category: Option<usize>,
    description: Option<usize>,
    amount: Option<usize>,
    paid: Option<usize>,
    bank: Option<usize>,
}

impl ColumnIndex {
    fn from_header(record: &StringRecord) -> Self {
        let mut index = Self::default();
        for (i, header) in record.iter().enumerate() {
            let slot = match column_for(header) {
                Some(Column::Date) => &mut index.date,
                Some(Column::Source) => &mut index.source,
                Some(Column::Category) => &mut index.category,
                Some(Column::Description) => &mut index.description,
                Some(Column::Amount) => &mut index.amount,
                Some(Column::Paid) => &mut index.paid,
                Some(Column::Bank) => &mut index.bank,
                None => continue,
            };
            // First matching column wins
            slot.get_or_insert(i);
        }
        index
    }

    fn is_complete(&self) -> bool {
        self.source.is_some() && self.category.is_some() && self.amount.is_some()
    }
}

fn cell(record: &StringRecord, index: Option<usize>) -> &str {
    index.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

/// Parse a spreadsheet export into transactions
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedImport> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut columns: Option<ColumnIndex> = None;
    let mut parsed = ParsedImport::default();

    for (row, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!(row, error = %e, "Skipping unreadable CSV row");
                if columns.is_some() {
                    parsed.skipped_rows += 1;
                }
                continue;
            }
        };

        if columns.is_none() {
            let candidate = ColumnIndex::from_header(&record);
            if candidate.is_complete() {
                columns = Some(candidate);
            } else if row + 1 >= HEADER_SEARCH_ROWS {
                break;
            }
            continue;
        }
        let Some(index) = columns.as_ref() else {
            continue;
        };

        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let amount_original = cell(&record, index.amount);
        let Some(amount) = normalize_amount(amount_original) else {
            debug!(row, amount = amount_original, "Skipping row without a usable amount");
            parsed.skipped_rows += 1;
            continue;
        };

        parsed.transactions.push(NewTransaction {
            category: cell(&record, index.category).to_string(),
            source: cell(&record, index.source).to_string(),
            description: cell(&record, index.description).to_string(),
            amount,
            amount_original: amount_original.to_string(),
            is_paid: parse_paid(cell(&record, index.paid)),
            bank: cell(&record, index.bank).to_string(),
            transaction_date: parse_date(cell(&record, index.date)),
        });
    }

    if columns.is_none() {
        return Err(Error::Import(
            "No header row with source, category and amount columns found".into(),
        ));
    }

    Ok(parsed)
}

/// Normalize an amount written in US or European style
///
/// When both `,` and `.` appear the right-most one is the decimal separator.
/// A single `,` is decimal only when exactly two digits follow it.
/// Parentheses mean negative.
pub fn normalize_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    let negative_parens = s.starts_with('(') && s.ends_with(')');

    let mut cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    cleaned = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            let decimals = &cleaned[comma + 1..];
            let single_comma = cleaned.matches(',').count() == 1;
            if single_comma && decimals.len() == 2 && decimals.chars().all(|c| c.is_ascii_digit()) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned,
    };

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative_parens { -value.abs() } else { value })
}

/// Parse a calendar date in one of the accepted layouts
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%d-%m-%Y", // 15-01-2024
        "%d/%m/%Y", // 15/01/2024
        "%Y/%m/%d", // 2024/01/15
        "%d.%m.%Y", // 15.01.2024
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Interpret a paid-flag cell
pub fn parse_paid(s: &str) -> bool {
    let s = s.trim();
    if s.contains('✅') {
        return true;
    }
    matches!(
        s.to_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, SAMPLE_CSV};

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("15.99"), Some(15.99));
        assert_eq!(normalize_amount("15,99"), Some(15.99));
        assert_eq!(normalize_amount("1,092.00"), Some(1092.0));
        assert_eq!(normalize_amount("1.092,00"), Some(1092.0));
        assert_eq!(normalize_amount("1,234"), Some(1234.0));
        assert_eq!(normalize_amount("1,234,567"), Some(1234567.0));
        assert_eq!(normalize_amount("$1,234.56"), Some(1234.56));
        assert_eq!(normalize_amount("45,00 zł"), Some(45.0));
        assert_eq!(normalize_amount("€ 12"), Some(12.0));
        assert_eq!(normalize_amount("1 092,50 PLN"), Some(1092.5));
        assert_eq!(normalize_amount("-123.45"), Some(-123.45));
        assert_eq!(normalize_amount("(100.00)"), Some(-100.0));
    }

    #[test]
    fn test_normalize_amount_rejects_garbage() {
        assert_eq!(normalize_amount(""), None);
        assert_eq!(normalize_amount("   "), None);
        assert_eq!(normalize_amount("n/a"), None);
        assert_eq!(normalize_amount("PLN"), None);
        assert_eq!(normalize_amount("1.2.3"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Some(date("2024-01-15"));
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("15-01-2024"), expected);
        assert_eq!(parse_date("15/01/2024"), expected);
        assert_eq!(parse_date("2024/01/15"), expected);
        assert_eq!(parse_date("15.01.2024"), expected);
        assert_eq!(parse_date(" 2024-01-15 "), expected);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("January 15"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("01/15/2024"), None);
    }

    #[test]
    fn test_parse_paid() {
        assert!(parse_paid("yes"));
        assert!(parse_paid("TRUE"));
        assert!(parse_paid("x"));
        assert!(parse_paid("1"));
        assert!(parse_paid("✅"));
        assert!(parse_paid("✅ done"));
        assert!(!parse_paid(""));
        assert!(!parse_paid("no"));
        assert!(!parse_paid("❌"));
    }

    #[test]
    fn test_parse_sample_csv() {
        let parsed = parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(parsed.skipped_rows, 0);
        assert_eq!(parsed.transactions.len(), 6);

        let first = &parsed.transactions[0];
        assert_eq!(first.source, "Netflix");
        assert_eq!(first.category, "Subscription");
        assert_eq!(first.description, "NETFLIX.COM 1001");
        assert_eq!(first.amount, 15.99);
        assert_eq!(first.amount_original, "15,99");
        assert!(first.is_paid);
        assert_eq!(first.transaction_date, Some(date("2024-01-05")));

        assert!(!parsed.transactions[2].is_paid);
        assert_eq!(
            parsed.transactions[3].transaction_date,
            Some(date("2024-01-05"))
        );
        assert_eq!(
            parsed.transactions[4].transaction_date,
            Some(date("2024-02-04"))
        );
        // Undated rows are kept
        assert_eq!(parsed.transactions[5].source, "Bakery");
        assert!(parsed.transactions[5].transaction_date.is_none());
    }

    #[test]
    fn test_parse_skips_metadata_and_empty_rows() {
        let csv = "\
Budget export
Generated 2024-04-01
,,,
Data,Rodzaj,Skąd,Co,Za ile,Opłacone?,Bank
2024-01-10,Rachunki,Orange,Internet,\"60,00 zł\",✅,mBank

2024-02-10,Rachunki,Orange,Internet,\"60,00 zł\",
2024-03-10,Rachunki,Orange,Internet,brak,
";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.transactions.len(), 2);
        assert_eq!(parsed.skipped_rows, 1);
        assert_eq!(parsed.transactions[0].source, "Orange");
        assert_eq!(parsed.transactions[0].category, "Rachunki");
        assert_eq!(parsed.transactions[0].amount, 60.0);
        assert!(parsed.transactions[0].is_paid);
        assert!(!parsed.transactions[1].is_paid);
        assert_eq!(parsed.transactions[0].bank, "mBank");
        // Short row: the bank cell is missing
        assert_eq!(parsed.transactions[1].bank, "");
    }

    #[test]
    fn test_parse_requires_columns() {
        let csv = "Date,Description,Amount\n2024-01-01,Coffee,3.50\n";
        let result = parse_csv(csv.as_bytes());
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[test]
    fn test_parse_short_rows() {
        let csv = "Source,Category,Amount,Date\nGym,Health,30\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.transactions.len(), 1);
        assert!(parsed.transactions[0].transaction_date.is_none());
        assert_eq!(parsed.transactions[0].description, "");
        assert_eq!(parsed.transactions[0].bank, "");
    }
}
