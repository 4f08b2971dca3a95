use std::borrow::Cow;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Column layout of a bank's CSV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFormat {
    pub key: String,
    pub name: String,
    pub date_column: usize,
    pub description_column: usize,
    pub amount_column: usize,
    /// chrono strftime pattern, e.g. `%m/%d/%Y`.
    pub date_format: String,
    pub delimiter: u8,
    pub has_header: bool,
    /// Negative amounts are expenses. When false the transaction type is
    /// inferred from the description.
    pub amount_is_signed: bool,
}

impl CsvFormat {
    pub fn min_columns(&self) -> usize {
        self.date_column
            .max(self.description_column)
            .max(self.amount_column)
            + 1
    }

    /// chrono's `%Y` takes any digit count, so a short year under a
    /// four-digit pattern is refused here rather than landing in year 25.
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let date = NaiveDate::parse_from_str(raw.trim(), &self.date_format).ok()?;
        if self.date_format.contains("%Y") && date.year() < 1000 {
            return None;
        }
        Some(date)
    }

    pub(crate) fn reader(&self, file: std::fs::File) -> csv::Reader<std::io::BufReader<std::fs::File>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(std::io::BufReader::new(file))
    }
}

/// A cell as text. Exports in legacy encodings still yield a usable string;
/// undecodable bytes become U+FFFD.
pub(crate) fn field(record: &csv::ByteRecord, idx: usize) -> Cow<'_, str> {
    String::from_utf8_lossy(&record[idx])
}

// ---------------------------------------------------------------------------
// Known bank layouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BankFormat {
    Chase,
    BankOfAmerica,
    WellsFargo,
    Generic,
}

impl BankFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Chase => "chase",
            Self::BankOfAmerica => "bofa",
            Self::WellsFargo => "wells_fargo",
            Self::Generic => "generic",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chase => "Chase",
            Self::BankOfAmerica => "Bank of America",
            Self::WellsFargo => "Wells Fargo",
            Self::Generic => "Generic",
        }
    }

    pub fn format(&self) -> CsvFormat {
        let (date_column, description_column, amount_column, date_format, signed, header) =
            match self {
                Self::Chase => (0, 2, 3, "%m/%d/%Y", true, true),
                Self::BankOfAmerica => (0, 1, 2, "%m/%d/%Y", false, true),
                Self::WellsFargo => (1, 4, 2, "%m/%d/%y", true, true),
                Self::Generic => (0, 1, 2, "%Y-%m-%d", true, false),
            };
        CsvFormat {
            key: self.key().to_string(),
            name: self.name().to_string(),
            date_column,
            description_column,
            amount_column,
            date_format: date_format.to_string(),
            delimiter: b',',
            has_header: header,
            amount_is_signed: signed,
        }
    }
}

/// Detection order. Strict layouts first; the permissive generic layout is
/// last and doubles as the fallback.
pub const ALL_FORMATS: &[BankFormat] = &[
    BankFormat::Chase,
    BankFormat::BankOfAmerica,
    BankFormat::WellsFargo,
    BankFormat::Generic,
];

pub fn get_by_key(key: &str) -> Option<CsvFormat> {
    ALL_FORMATS
        .iter()
        .find(|f| f.key() == key)
        .map(BankFormat::format)
}

pub fn fallback_format() -> CsvFormat {
    ALL_FORMATS[ALL_FORMATS.len() - 1].format()
}

// ---------------------------------------------------------------------------
// Amount parsing
// ---------------------------------------------------------------------------

/// Parse a money cell. Tolerates `$`, thousands separators, spaces and
/// accounting-style parentheses, which mark a negative value.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    let negative = s.contains('(') && s.contains(')');
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '(' | ')' | ' '))
        .collect();
    let v = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -v.abs() } else { v })
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

const SAMPLE_ROWS: usize = 5;
const REQUIRED_HITS: usize = 3;

/// Count how many of the first data rows parse under `format`. Returns
/// `(hits, sampled)`, or None when the file cannot be read as CSV.
fn sample_format(path: &Path, format: &CsvFormat) -> Option<(usize, usize)> {
    let file = std::fs::File::open(path).ok()?;
    let mut rdr = format.reader(file);
    let skip = usize::from(format.has_header);

    let mut hits = 0usize;
    let mut sampled = 0usize;
    for record in rdr.byte_records().skip(skip).take(SAMPLE_ROWS) {
        sampled += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return None,
            Err(_) => continue,
        };
        if record.len() < format.min_columns() {
            continue;
        }
        if format.parse_date(&field(&record, format.date_column)).is_some()
            && parse_amount(&field(&record, format.amount_column)).is_some()
        {
            hits += 1;
        }
    }
    Some((hits, sampled))
}

/// Pick the first known layout that parses cleanly, falling back to the
/// generic layout. Never fails: an unreadable file also gets the fallback
/// and the error surfaces when the file is parsed.
pub fn detect_format(path: &Path) -> CsvFormat {
    for bank in ALL_FORMATS {
        let format = bank.format();
        let Some((hits, sampled)) = sample_format(path, &format) else {
            log::debug!("{}: not readable as {}", path.display(), format.name);
            continue;
        };
        log::debug!(
            "{}: {} parsed {hits}/{sampled} sample rows",
            path.display(),
            format.name
        );
        // Short files need min(3, rows) hits, so 3 of 4 is enough.
        if sampled > 0 && hits >= REQUIRED_HITS.min(sampled) {
            return format;
        }
    }
    fallback_format()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_amount_plain_and_signed() {
        assert_eq!(parse_amount("42.50"), Some(42.5));
        assert_eq!(parse_amount("  -15.99 "), Some(-15.99));
        assert_eq!(parse_amount("0"), Some(0.0));
    }

    #[test]
    fn test_parse_amount_currency_punctuation() {
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("-$50.00"), Some(-50.0));
        assert_eq!(parse_amount("$ 7.00"), Some(7.0));
    }

    #[test]
    fn test_parse_amount_parenthesized_negative() {
        assert_eq!(parse_amount("(500.00)"), Some(-500.0));
        assert_eq!(parse_amount("($1,234.56)"), Some(-1234.56));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_parse_date_patterns() {
        let chase = BankFormat::Chase.format();
        assert_eq!(
            chase.parse_date(" 01/15/2025 "),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(chase.parse_date("2025-01-15"), None);
        assert_eq!(chase.parse_date("02/30/2025"), None);

        let wf = BankFormat::WellsFargo.format();
        assert_eq!(wf.parse_date("01/15/25"), NaiveDate::from_ymd_opt(2025, 1, 15));

        let generic = BankFormat::Generic.format();
        assert_eq!(generic.parse_date("2025-01-15"), NaiveDate::from_ymd_opt(2025, 1, 15));
    }

    #[test]
    fn test_detects_chase() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "chase.csv",
            "Transaction Date,Post Date,Description,Amount\n\
             01/15/2025,01/16/2025,NETFLIX.COM,-15.99\n\
             01/16/2025,01/17/2025,STARBUCKS #123,-4.75\n\
             01/17/2025,01/18/2025,PAYROLL ACME,2500.00\n\
             01/18/2025,01/19/2025,SHELL OIL,-40.12\n\
             01/19/2025,01/20/2025,AMAZON MKTPLACE,-23.00\n",
        );
        assert_eq!(detect_format(&path).key, "chase");
    }

    #[test]
    fn test_chase_needs_three_of_five() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "chase.csv",
            "Transaction Date,Post Date,Description,Amount\n\
             01/15/2025,01/16/2025,NETFLIX.COM,-15.99\n\
             bad,01/17/2025,STARBUCKS,-4.75\n\
             01/17/2025,01/18/2025,PAYROLL ACME,2500.00\n\
             01/18/2025,01/19/2025,SHELL OIL,oops\n\
             01/19/2025,01/20/2025,AMAZON MKTPLACE,-23.00\n",
        );
        assert_eq!(detect_format(&path).key, "chase");
    }

    #[test]
    fn test_detects_bank_of_america() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bofa.csv",
            "Date,Description,Amount\n\
             01/15/2025,KROGER #42,52.10\n\
             01/16/2025,DIRECT DEPOSIT ACME,2000.00\n\
             01/17/2025,CVS PHARMACY,12.00\n",
        );
        assert_eq!(detect_format(&path).key, "bofa");
    }

    #[test]
    fn test_detects_wells_fargo() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "wf.csv",
            "Id,Date,Amount,Flag,Description\n\
             1,01/15/25,-52.10,*,KROGER #42\n\
             2,01/16/25,2000.00,*,PAYROLL ACME\n\
             3,01/17/25,-12.00,*,CVS PHARMACY\n",
        );
        assert_eq!(detect_format(&path).key, "wells_fargo");
    }

    #[test]
    fn test_detects_generic_iso() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "generic.csv",
            "2025-01-15,KROGER,-52.10\n\
             2025-01-16,PAYROLL,2000.00\n\
             2025-01-17,CVS,-12.00\n",
        );
        assert_eq!(detect_format(&path).key, "generic");
    }

    #[test]
    fn test_four_digit_year_patterns_refuse_short_years() {
        assert_eq!(BankFormat::Chase.format().parse_date("01/15/25"), None);
        assert_eq!(BankFormat::BankOfAmerica.format().parse_date("01/15/25"), None);
        assert_eq!(BankFormat::Generic.format().parse_date("25-01-15"), None);
    }

    #[test]
    fn test_two_digit_year_export_is_not_chase() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "short_year.csv",
            "Transaction Date,Post Date,Description,Amount\n\
             01/15/25,01/16/25,NETFLIX.COM,-15.99\n\
             01/16/25,01/17/25,STARBUCKS #123,-4.75\n\
             01/17/25,01/18/25,PAYROLL ACME,2500.00\n",
        );
        let format = detect_format(&path);
        assert_ne!(format.key, "chase");
        assert_ne!(format.key, "bofa");
    }

    #[test]
    fn test_latin1_row_does_not_derail_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut content = b"Transaction Date,Post Date,Description,Amount\n\
            01/15/2025,01/16/2025,NETFLIX.COM,-15.99\n"
            .to_vec();
        content.extend_from_slice(b"01/16/2025,01/17/2025,CAF\xC9 DU MONDE,-8.50\n");
        content.extend_from_slice(b"01/17/2025,01/18/2025,PAYROLL ACME,2500.00\n");
        content.extend_from_slice(b"01/18/2025,01/19/2025,SHELL OIL,-40.12\n");
        std::fs::write(&path, content).unwrap();
        assert_eq!(detect_format(&path).key, "chase");
    }

    #[test]
    fn test_unrecognized_layout_falls_back_to_generic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "weird.csv",
            "when;what;how much\n\
             15.01.2025;Bakery;3,50\n\
             16.01.2025;Rent;800,00\n\
             17.01.2025;Salary;2000,00\n",
        );
        let format = detect_format(&path);
        assert_eq!(format, fallback_format());
        assert_eq!(format.key, "generic");
        assert!(!format.has_header);
    }

    #[test]
    fn test_missing_file_falls_back_to_generic() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_format(&dir.path().join("missing.csv")).key, "generic");
    }

    #[test]
    fn test_short_file_needs_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ok = write_file(
            dir.path(),
            "ok.csv",
            "Date,x,Description,Amount\n01/15/2025,,COFFEE,-3.00\n01/16/2025,,TEA,-2.00\n",
        );
        assert_eq!(detect_format(&ok).key, "chase");
        let bad = write_file(
            dir.path(),
            "bad.csv",
            "Date,x,Description,Amount\n01/15/2025,,COFFEE,-3.00\n01/16/2025,,TEA,n/a\n",
        );
        assert_eq!(detect_format(&bad).key, "generic");
    }

    #[test]
    fn test_get_by_key() {
        assert_eq!(get_by_key("wells_fargo").unwrap().name, "Wells Fargo");
        assert!(get_by_key("monzo").is_none());
        assert_eq!(fallback_format().key, "generic");
    }
}
