use std::collections::HashSet;
use std::path::Path;

use chrono::{Local, NaiveDate};

use crate::categorizer::{Categorizer, UNCATEGORIZED};
use crate::error::Result;
use crate::formats::{field, parse_amount, CsvFormat};
use crate::ledger::Ledger;
use crate::models::{
    generate_id, ImportSession, ImportStatus, PreviewTransaction, Transaction, TransactionType,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const INCOME_KEYWORDS: &[&str] = &[
    "deposit",
    "salary",
    "payroll",
    "income",
    "payment",
    "credit",
    "refund",
    "transfer in",
    "direct deposit",
    "interest",
    "dividend",
    "bonus",
    "commission",
    "cash back",
];

pub fn is_income_description(description: &str) -> bool {
    let desc = description.to_lowercase();
    INCOME_KEYWORDS.iter().any(|k| desc.contains(k))
}

fn midnight_utc(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

// ---------------------------------------------------------------------------
// parse_csv
// ---------------------------------------------------------------------------

/// Outcome of parsing one file. Row problems end up in `errors`; they never
/// abort the parse.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub transactions: Vec<Transaction>,
    pub format: CsvFormat,
    pub errors: Vec<String>,
    /// Data rows seen, header excluded.
    pub total_rows: usize,
    pub success_count: usize,
}

pub fn parse_csv(file_path: &Path, format: &CsvFormat) -> Result<ImportResult> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = format.reader(file);

    let mut result = ImportResult {
        transactions: Vec::new(),
        format: format.clone(),
        errors: Vec::new(),
        total_rows: 0,
        success_count: 0,
    };

    for (idx, record) in rdr.byte_records().enumerate() {
        if idx == 0 && format.has_header {
            continue;
        }
        let row_num = idx + 1;
        result.total_rows += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                result.errors.push(format!("Row {row_num}: {e}"));
                continue;
            }
        };

        if record.len() < format.min_columns() {
            result.errors.push(format!("Row {row_num}: insufficient columns"));
            continue;
        }

        let date_field = field(&record, format.date_column);
        let date_raw = date_field.trim();
        let Some(date) = format.parse_date(date_raw) else {
            result.errors.push(format!("Row {row_num}: invalid date '{date_raw}'"));
            continue;
        };

        let amount_raw = field(&record, format.amount_column);
        let Some(amount) = parse_amount(&amount_raw) else {
            result
                .errors
                .push(format!("Row {row_num}: invalid amount '{amount_raw}'"));
            continue;
        };

        let description = field(&record, format.description_column).trim().to_string();
        let transaction_type = if format.amount_is_signed {
            if amount < 0.0 {
                TransactionType::Expense
            } else {
                TransactionType::Income
            }
        } else if is_income_description(&description) {
            TransactionType::Income
        } else {
            TransactionType::Expense
        };

        result.transactions.push(Transaction {
            id: generate_id(),
            amount: amount.abs(),
            description: description.clone(),
            category: UNCATEGORIZED.to_string(),
            transaction_type,
            date: midnight_utc(date),
            original_description: description,
            import_source: format.name.clone(),
            confidence: 0.0,
            is_imported: true,
        });
        result.success_count += 1;
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

pub fn preview_of(
    result: &ImportResult,
    max_rows: usize,
    categorizer: &Categorizer,
) -> Vec<PreviewTransaction> {
    result
        .transactions
        .iter()
        .take(max_rows)
        .map(|t| {
            let (category, confidence) =
                categorizer.categorize(&t.description, t.amount, t.transaction_type);
            PreviewTransaction {
                amount: t.amount,
                description: t.description.clone(),
                date: t.date.format("%b %d").to_string(),
                category,
                confidence,
            }
        })
        .collect()
}

/// Parse the file and categorize the first `max_rows` transactions for
/// display. The full parse comes back too so a later commit needs no
/// second read. Nothing is written anywhere.
pub fn import_preview(
    file_path: &Path,
    format: &CsvFormat,
    max_rows: usize,
    categorizer: &Categorizer,
) -> Result<(ImportResult, Vec<PreviewTransaction>)> {
    let result = parse_csv(file_path, format)?;
    let preview = preview_of(&result, max_rows, categorizer);
    Ok((result, preview))
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

type DuplicateKey = (NaiveDate, u64, TransactionType, String);

fn duplicate_key(t: &Transaction) -> DuplicateKey {
    let desc = if t.original_description.is_empty() {
        &t.description
    } else {
        &t.original_description
    };
    (
        t.date.date_naive(),
        t.amount.to_bits(),
        t.transaction_type,
        desc.to_lowercase(),
    )
}

/// Categorize parsed transactions and append them to the ledger. Rows that
/// repeat a transaction already in the ledger are skipped; repeats within
/// the file itself are kept.
pub fn commit_import(
    ledger: &mut Ledger,
    categorizer: &Categorizer,
    result: &ImportResult,
) -> ImportOutcome {
    let existing: HashSet<DuplicateKey> = ledger.transactions.iter().map(duplicate_key).collect();

    let mut outcome = ImportOutcome {
        imported: 0,
        skipped: 0,
    };
    for txn in &result.transactions {
        if existing.contains(&duplicate_key(txn)) {
            outcome.skipped += 1;
            continue;
        }
        let mut txn = txn.clone();
        let (category, confidence) =
            categorizer.categorize(&txn.description, txn.amount, txn.transaction_type);
        txn.category = category;
        txn.confidence = confidence;
        ledger.transactions.push(txn);
        outcome.imported += 1;
    }
    outcome
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

fn file_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string_lossy().to_string())
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Session for a committed import.
pub fn import_session(
    file_path: &Path,
    result: &ImportResult,
    preview: Vec<PreviewTransaction>,
    outcome: ImportOutcome,
) -> ImportSession {
    ImportSession {
        id: generate_id(),
        file_name: file_name(file_path),
        source: result.format.name.clone(),
        status: ImportStatus::Imported,
        total_count: result.transactions.len(),
        imported: outcome.imported,
        skipped: outcome.skipped,
        errors: result.errors.clone(),
        preview,
        timestamp: timestamp(),
    }
}

/// Session for an import that failed before any row was read.
pub fn failed_session(file_path: &Path, source: &str, message: &str) -> ImportSession {
    ImportSession {
        id: generate_id(),
        file_name: file_name(file_path),
        source: source.to_string(),
        status: ImportStatus::Error,
        total_count: 0,
        imported: 0,
        skipped: 0,
        errors: vec![message.to_string()],
        preview: Vec::new(),
        timestamp: timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{detect_format, BankFormat};
    use crate::rules::RuleStore;

    fn categorizer() -> Categorizer {
        Categorizer::new(RuleStore::from_user_rules(Path::new("unused.json"), vec![]))
    }

    fn write_chase_csv(dir: &Path, name: &str, rows: &[(&str, &str, &str)]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut content = String::from("Transaction Date,Post Date,Description,Amount\n");
        for (date, desc, amt) in rows {
            content.push_str(&format!("{date},{date},{desc},{amt}\n"));
        }
        std::fs::write(&path, &content).unwrap();
        path
    }

    #[test]
    fn test_is_income_description() {
        assert!(is_income_description("DIRECT DEPOSIT ACME"));
        assert!(is_income_description("Interest Earned"));
        assert!(is_income_description("cash back reward"));
        assert!(!is_income_description("KROGER #42"));
    }

    #[test]
    fn test_one_malformed_row_among_five_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "NETFLIX.COM", "-15.99"),
            ("01/16/2025", "STARBUCKS", "-4.75"),
            ("13/45/2025", "BROKEN ROW", "-1.00"),
            ("01/17/2025", "PAYROLL ACME", "2500.00"),
            ("01/18/2025", "SHELL OIL", "-40.12"),
        ]);
        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        assert_eq!(result.success_count, 4);
        assert_eq!(result.transactions.len(), 4);
        assert_eq!(result.total_rows, 5);
        assert_eq!(result.errors.len(), 1);
        // header is row 1, so the third data row is row 4
        assert_eq!(result.errors[0], "Row 4: invalid date '13/45/2025'");
    }

    #[test]
    fn test_latin1_bytes_stay_row_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut content = b"Transaction Date,Post Date,Description,Amount\n".to_vec();
        content.extend_from_slice(b"01/15/2025,01/15/2025,NETFLIX.COM,-15.99\n");
        content.extend_from_slice(b"01/16/2025,01/16/2025,CAF\xC9 DU MONDE,-8.50\n");
        content.extend_from_slice(b"01/17/2025,01/17/2025,PAYROLL ACME,2500.00\n");
        content.extend_from_slice(b"01/18/2025,01/18/2025,SHELL OIL,-40\xC9\n");
        std::fs::write(&path, content).unwrap();

        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        assert_eq!(result.total_rows, 4);
        assert_eq!(result.success_count, 3);
        assert_eq!(result.transactions[1].description, "CAF\u{FFFD} DU MONDE");
        assert_eq!(result.errors, vec!["Row 5: invalid amount '-40\u{FFFD}'".to_string()]);
    }

    #[test]
    fn test_short_year_rows_are_row_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase_csv(dir.path(), "stmt.csv", &[
            ("01/15/25", "NETFLIX.COM", "-15.99"),
            ("01/16/2025", "STARBUCKS", "-4.75"),
        ]);
        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        assert_eq!(result.success_count, 1);
        assert_eq!(result.errors, vec!["Row 2: invalid date '01/15/25'".to_string()]);
    }

    #[test]
    fn test_row_errors_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stmt.csv");
        std::fs::write(
            &path,
            "Transaction Date,Post Date,Description,Amount\n\
             01/15/2025,01/15/2025,SHORT\n\
             01/16/2025,01/16/2025,COFFEE,abc\n\
             01/17/2025,01/17/2025,TEA,-2.00\n",
        )
        .unwrap();
        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        assert_eq!(result.success_count, 1);
        assert_eq!(
            result.errors,
            vec![
                "Row 2: insufficient columns".to_string(),
                "Row 3: invalid amount 'abc'".to_string(),
            ]
        );
        assert_eq!(result.errors.len() + result.success_count, result.total_rows);
    }

    #[test]
    fn test_signed_amounts_set_type_and_store_positive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "NETFLIX.COM", "-15.99"),
            ("01/17/2025", "PAYROLL ACME", "\"$2,500.00\""),
            ("01/18/2025", "REVERSAL", "(12.00)"),
        ]);
        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        let t = &result.transactions;
        assert_eq!(t[0].transaction_type, TransactionType::Expense);
        assert_eq!(t[0].amount, 15.99);
        assert_eq!(t[1].transaction_type, TransactionType::Income);
        assert_eq!(t[1].amount, 2500.0);
        assert_eq!(t[2].transaction_type, TransactionType::Expense);
        assert_eq!(t[2].amount, 12.0);
        assert!(t.iter().all(|x| x.amount >= 0.0));
    }

    #[test]
    fn test_unsigned_format_infers_type_from_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bofa.csv");
        std::fs::write(
            &path,
            "Date,Description,Amount\n\
             01/15/2025,KROGER #42,52.10\n\
             01/16/2025,DIRECT DEPOSIT ACME,2000.00\n\
             01/17/2025,ATM WITHDRAWAL,-60.00\n",
        )
        .unwrap();
        let result = parse_csv(&path, &BankFormat::BankOfAmerica.format()).unwrap();
        let types: Vec<TransactionType> =
            result.transactions.iter().map(|t| t.transaction_type).collect();
        assert_eq!(
            types,
            vec![TransactionType::Expense, TransactionType::Income, TransactionType::Expense]
        );
        assert_eq!(result.transactions[2].amount, 60.0);
    }

    #[test]
    fn test_imported_transaction_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase_csv(dir.path(), "stmt.csv", &[("01/15/2025", " NETFLIX.COM ", "-15.99")]);
        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        let t = &result.transactions[0];
        assert_eq!(t.category, UNCATEGORIZED);
        assert!(t.is_imported);
        assert_eq!(t.import_source, "Chase");
        assert_eq!(t.description, "NETFLIX.COM");
        assert_eq!(t.original_description, "NETFLIX.COM");
        assert_eq!(t.date.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert!(!t.id.is_empty());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_csv(&dir.path().join("nope.csv"), &BankFormat::Chase.format());
        assert!(err.is_err());
    }

    #[test]
    fn test_preview_is_categorized_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "NETFLIX.COM", "-15.99"),
            ("01/16/2025", "AMAZON MKTPLACE", "-30.00"),
            ("01/17/2025", "MYSTERY", "-1.00"),
        ]);
        let c = categorizer();
        let format = detect_format(&path);
        let (result, preview) = import_preview(&path, &format, 2, &c).unwrap();
        assert_eq!(result.transactions.len(), 3);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].category, "Entertainment");
        assert_eq!(preview[0].date, "Jan 15");
        assert_eq!(preview[1].category, "Shopping");

        let (_, all) = import_preview(&path, &format, 50, &c).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].category, UNCATEGORIZED);
    }

    #[test]
    fn test_commit_categorizes_and_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_chase_csv(dir.path(), "a.csv", &[
            ("01/15/2025", "NETFLIX.COM", "-15.99"),
            ("01/16/2025", "STARBUCKS", "-4.75"),
        ]);
        let second = write_chase_csv(dir.path(), "b.csv", &[
            ("01/16/2025", "STARBUCKS", "-4.75"),
            ("01/18/2025", "STARBUCKS", "-4.75"),
            ("01/18/2025", "STARBUCKS", "-4.75"),
        ]);
        let c = categorizer();
        let format = BankFormat::Chase.format();
        let mut ledger = Ledger::default();

        let r1 = parse_csv(&first, &format).unwrap();
        let o1 = commit_import(&mut ledger, &c, &r1);
        assert_eq!(o1, ImportOutcome { imported: 2, skipped: 0 });
        assert_eq!(ledger.transactions[0].category, "Entertainment");
        assert!((ledger.transactions[0].confidence - 0.9).abs() < 1e-9);

        let r2 = parse_csv(&second, &format).unwrap();
        let o2 = commit_import(&mut ledger, &c, &r2);
        // the two identical rows on the 18th are both kept
        assert_eq!(o2, ImportOutcome { imported: 2, skipped: 1 });
        assert_eq!(ledger.transactions.len(), 4);
    }

    #[test]
    fn test_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase_csv(dir.path(), "stmt.csv", &[("01/15/2025", "NETFLIX.COM", "-15.99")]);
        let result = parse_csv(&path, &BankFormat::Chase.format()).unwrap();
        let preview = preview_of(&result, 10, &categorizer());

        let done = import_session(&path, &result, preview, ImportOutcome { imported: 1, skipped: 0 });
        assert_eq!(done.status, ImportStatus::Imported);
        assert_eq!(done.file_name, "stmt.csv");
        assert_eq!(done.source, "Chase");
        assert_eq!(done.total_count, 1);
        assert_eq!(done.imported, 1);
        assert_eq!(done.preview.len(), 1);

        let failed = failed_session(&path, "Chase", "IO error: boom");
        assert_eq!(failed.status, ImportStatus::Error);
        assert_eq!(failed.errors, vec!["IO error: boom".to_string()]);
    }
}
