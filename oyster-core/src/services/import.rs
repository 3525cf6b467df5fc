//! Import service - bank CSV export into a user's transactions
//!
//! Expected layout: a header row, then one transaction per row with the date
//! (`M/D/YYYY`) in column 0, the description in column 2 and the amount split
//! across columns 3 and 4 (debit and credit; one of them is empty).

use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{Transaction, User};

const DATE_COL: usize = 0;
const DESCRIPTION_COL: usize = 2;
const DEBIT_COL: usize = 3;
const CREDIT_COL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Rows read from the CSV
    pub discovered: usize,
    /// Transactions added to the user
    pub imported: usize,
    /// Rows already present
    pub skipped: usize,
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%m/%d/%Y").ok()
}

fn parse_amount(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Read every transaction from a CSV export
///
/// All or nothing: the first malformed row aborts with a validation error
/// naming its line.
pub fn read_transactions<R: Read>(input: R) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| Error::validation(format!("Failed to read CSV header: {e}")))?;
    if headers.is_empty() {
        return Err(Error::validation("CSV file is empty"));
    }

    let mut transactions = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Line numbers are 1-based and the header is line 1
        let line = idx + 2;
        let record =
            result.map_err(|e| Error::validation(format!("line {line}: {e}")))?;

        if record.len() <= CREDIT_COL {
            return Err(Error::validation(format!(
                "line {line}: expected at least {} columns, got {}",
                CREDIT_COL + 1,
                record.len()
            )));
        }

        let date_str = &record[DATE_COL];
        let date = parse_date(date_str)
            .ok_or_else(|| Error::validation(format!("line {line}: invalid date '{date_str}'")))?;

        let amount_str = format!("{}{}", &record[DEBIT_COL], &record[CREDIT_COL]);
        let amount_str = amount_str.trim();
        let amount = parse_amount(amount_str).ok_or_else(|| {
            Error::validation(format!("line {line}: invalid amount '{amount_str}'"))
        })?;

        transactions.push(Transaction::new(&record[DESCRIPTION_COL], amount, date));
    }

    Ok(transactions)
}

/// Read a CSV export and merge it into the user's transactions
pub fn import_csv<R: Read>(user: &User, input: R) -> Result<ImportResult> {
    let transactions = read_transactions(input)?;
    let discovered = transactions.len();
    let imported = user.import_transactions(transactions);
    Ok(ImportResult {
        discovered,
        imported,
        skipped: discovered - imported,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KdfMetadata, Passkey, KEY_LEN};

    const EXPORT: &str = "\
Date,Check,Description,Debit,Credit
1/15/2024,,SAFEWAY #1234,-54.21,
01/20/2024,1001,RENT PAYMENT,-1500.00,
2/1/2024,,PAYROLL ACME INC,,2500.00
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_read_transactions() {
        let txs = read_transactions(EXPORT.as_bytes()).unwrap();
        assert_eq!(txs.len(), 3);

        assert_eq!(txs[0].description, "SAFEWAY #1234");
        assert_eq!(txs[0].amount, Decimal::new(-5421, 2));
        assert_eq!(txs[0].date, date(2024, 1, 15));

        assert_eq!(txs[1].date, date(2024, 1, 20));
        assert_eq!(txs[2].amount, Decimal::new(250000, 2));
        assert!(txs.iter().all(|t| !t.is_categorized()));
    }

    #[test]
    fn test_header_only() {
        let txs = read_transactions("Date,Check,Description,Debit,Credit\n".as_bytes()).unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(read_transactions("".as_bytes()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_bad_rows_abort_import() {
        let bad_date = "Date,Check,Description,Debit,Credit\n2024-01-15,,X,-1.00,\n";
        let err = read_transactions(bad_date.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");

        let bad_amount = "Date,Check,Description,Debit,Credit\n1/15/2024,,X,-1.00,\n1/16/2024,,Y,abc,\n";
        let err = read_transactions(bad_amount.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");

        let both_empty = "Date,Check,Description,Debit,Credit\n1/15/2024,,X,,\n";
        assert!(matches!(read_transactions(both_empty.as_bytes()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let input = "a,b,c\n1/15/2024,,X\n";
        assert!(matches!(read_transactions(input.as_bytes()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_import_csv_is_idempotent() {
        let user = User::new("bob", Passkey::from_bytes([0u8; KEY_LEN]), KdfMetadata::legacy());

        let first = import_csv(&user, EXPORT.as_bytes()).unwrap();
        assert_eq!(first, ImportResult { discovered: 3, imported: 3, skipped: 0 });

        let second = import_csv(&user, EXPORT.as_bytes()).unwrap();
        assert_eq!(second, ImportResult { discovered: 3, imported: 0, skipped: 3 });

        // Most recent first
        let dates: Vec<NaiveDate> = user.transactions().iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![date(2024, 2, 1), date(2024, 1, 20), date(2024, 1, 15)]);
    }
}
