//! Raw extract loading.
//!
//! This module turns a semicolon-delimited extract into `RawReading`s. It does
//! no cleaning: dates and times stay strings and zero readings stay zero.
//! The only interpretation applied is number parsing of the consumption cell.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors, exit code 3)
//! - **No silent drops**: an unreadable row aborts the load and names its line
//! - **Separation of concerns**: no normalization logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::RawReading;
use crate::error::{AppError, CleanError, EXIT_INPUT};

/// Header of the metropolitan-area code column.
pub const COL_AREA_CODE: &str = "Code métropole";
/// Header of the area display-name column.
pub const COL_AREA_NAME: &str = "Métropole";
pub const COL_DATE: &str = "Date";
pub const COL_TIME: &str = "Heures";
pub const COL_CONSUMPTION: &str = "Consommation (MW)";

/// Loader output.
#[derive(Debug, Clone)]
pub struct RawExtract {
    pub readings: Vec<RawReading>,
    /// Columns present in the file but not used by the pipeline.
    pub ignored_columns: Vec<String>,
}

/// Load an extract from a file on disk.
pub fn load_extract_path(path: &Path) -> Result<RawExtract, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open extract '{}': {e}", path.display()),
        )
    })?;
    let extract = read_extract(file)?;
    info!(
        path = %path.display(),
        rows = extract.readings.len(),
        "extract loaded"
    );
    Ok(extract)
}

/// Load an extract already held in memory (e.g. an HTTP response body).
pub fn load_extract_str(body: &str) -> Result<RawExtract, CleanError> {
    read_extract(body.as_bytes())
}

/// Read an extract from any reader.
pub fn read_extract<R: Read>(reader: R) -> Result<RawExtract, CleanError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| CleanError::Csv {
            line: 1,
            message: e.to_string(),
        })?
        .clone();

    let header_map = build_header_map(&headers);
    let columns = Columns::resolve(&header_map)?;

    let used = [
        columns.area_code,
        columns.area_name,
        columns.date,
        columns.time,
        columns.consumption,
    ];
    let ignored_columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| !used.contains(idx))
        .map(|(_, name)| name.to_string())
        .collect();
    if !ignored_columns.is_empty() {
        debug!(columns = ?ignored_columns, "ignoring extra columns");
    }

    let mut readings = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Row count + 2 only holds while no quoted field spans lines.
        let fallback = idx + 2;
        let record = result.map_err(|e| CleanError::Csv {
            line: source_line(e.position(), fallback),
            message: e.to_string(),
        })?;
        let line = source_line(record.position(), fallback);
        readings.push(parse_record(&record, &columns, line)?);
    }

    Ok(RawExtract {
        readings,
        ignored_columns,
    })
}

/// First rows of a file that carries the extract header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractPreview {
    /// Display name on the first data row, if any.
    pub area_name: Option<String>,
    pub first_date: Option<String>,
}

/// Read only the header and first record of `path`.
///
/// Fails with `MissingColumn` when the file is not an extract, so callers can
/// tell a consumption export from any other CSV without loading it.
pub fn preview_extract(path: &Path) -> Result<ExtractPreview, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open extract '{}': {e}", path.display()),
        )
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| CleanError::Csv {
            line: 1,
            message: e.to_string(),
        })?
        .clone();
    let columns = Columns::resolve(&build_header_map(&headers))?;

    let first = reader.records().next().and_then(Result::ok);
    let cell = |idx: usize| {
        first
            .as_ref()
            .and_then(|r| r.get(idx))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    Ok(ExtractPreview {
        area_name: cell(columns.area_name),
        first_date: cell(columns.date),
    })
}

fn source_line(position: Option<&csv::Position>, fallback: usize) -> usize {
    position.map_or(fallback, |p| p.line() as usize)
}

/// Column positions of the required fields.
#[derive(Debug, Clone, Copy)]
struct Columns {
    area_code: usize,
    area_name: usize,
    date: usize,
    time: usize,
    consumption: usize,
}

impl Columns {
    fn resolve(header_map: &HashMap<String, usize>) -> Result<Self, CleanError> {
        let find = |name: &str| {
            header_map
                .get(&normalize_header_name(name))
                .copied()
                .ok_or_else(|| CleanError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            area_code: find(COL_AREA_CODE)?,
            area_name: find(COL_AREA_NAME)?,
            date: find(COL_DATE)?,
            time: find(COL_TIME)?,
            consumption: find(COL_CONSUMPTION)?,
        })
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM; left
    // in place it makes the first required column look missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn parse_record(record: &StringRecord, columns: &Columns, line: usize) -> Result<RawReading, CleanError> {
    let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

    Ok(RawReading {
        line,
        area_code: cell(columns.area_code).to_string(),
        area_name: cell(columns.area_name).to_string(),
        date: cell(columns.date).to_string(),
        time: cell(columns.time).to_string(),
        consumption: parse_consumption(cell(columns.consumption), line)?,
    })
}

/// Parse a consumption cell: empty means "not reported".
fn parse_consumption(s: &str, line: usize) -> Result<Option<f64>, CleanError> {
    if s.is_empty() {
        return Ok(None);
    }
    let malformed = || CleanError::MalformedConsumption {
        line,
        value: s.to_string(),
    };
    let v = s.replace(',', ".").parse::<f64>().map_err(|_| malformed())?;
    if v.is_finite() { Ok(Some(v)) } else { Err(malformed()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Code métropole;Métropole;Date;Heures;Consommation (MW)";

    #[test]
    fn reads_rows_and_keeps_zero_readings() {
        let body = format!(
            "{HEADER}\n\
             200054781;Métropole du Grand Paris;2024-01-01;00:00;5012\n\
             200054781;Métropole du Grand Paris;2024-01-01;00:15;0\n\
             200054781;Métropole du Grand Paris;2024-01-01;00:30;\n"
        );
        let extract = load_extract_str(&body).unwrap();
        assert_eq!(extract.readings.len(), 3);

        let first = &extract.readings[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.area_code, "200054781");
        assert_eq!(first.time, "00:00");
        assert_eq!(first.consumption, Some(5012.0));

        assert_eq!(extract.readings[1].consumption, Some(0.0));
        assert_eq!(extract.readings[2].consumption, None);
    }

    #[test]
    fn headers_match_case_insensitively_with_bom_and_extra_columns() {
        let body = "\u{feff}code MÉTROPOLE;métropole;Date - Heure;date;heures;consommation (mw)\n\
                    X;Lyon;2024-01-01T00:00:00+01:00;2024-01-01;00:00;1234,5\n";
        let extract = load_extract_str(body).unwrap();
        assert_eq!(extract.ignored_columns, vec!["Date - Heure".to_string()]);
        assert_eq!(extract.readings[0].consumption, Some(1234.5));
        assert_eq!(extract.readings[0].area_name, "Lyon");
    }

    #[test]
    fn missing_column_is_reported_by_display_name() {
        let body = "Code métropole;Métropole;Date;Consommation (MW)\nX;Y;2024-01-01;1\n";
        let err = load_extract_str(body).unwrap_err();
        assert_eq!(err, CleanError::MissingColumn("Heures".to_string()));
    }

    #[test]
    fn non_numeric_consumption_names_the_line() {
        let body = format!("{HEADER}\nX;Y;2024-01-01;00:00;12\nX;Y;2024-01-01;00:15;n/a\n");
        let err = load_extract_str(&body).unwrap_err();
        assert_eq!(
            err,
            CleanError::MalformedConsumption {
                line: 3,
                value: "n/a".to_string()
            }
        );
    }

    #[test]
    fn line_numbers_follow_multiline_quoted_fields() {
        let body = format!(
            "{HEADER}\n\
             X;Y;2024-01-01;00:00;10\n\
             X;\"Lyon\nMétropole\";2024-01-01;00:15;11\n\
             X;Y;2024-01-01;00:30;n/a\n"
        );
        let err = load_extract_str(&body).unwrap_err();
        assert_eq!(
            err,
            CleanError::MalformedConsumption {
                line: 5,
                value: "n/a".to_string()
            }
        );

        let ok = format!("{HEADER}\nX;\"two\nlines\";2024-01-01;00:00;1\nX;Y;2024-01-01;00:15;2\n");
        let extract = load_extract_str(&ok).unwrap();
        assert_eq!(extract.readings[0].line, 2);
        assert_eq!(extract.readings[1].line, 4);
    }

    #[test]
    fn preview_reads_header_and_first_row_only() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "X;Métropole de Lyon;2024-01-01;00:00;10").unwrap();
        writeln!(file, "X;Métropole de Lyon;2024-01-01;00:15;not a number").unwrap();
        let preview = preview_extract(file.path()).unwrap();
        assert_eq!(preview.area_name.as_deref(), Some("Métropole de Lyon"));
        assert_eq!(preview.first_date.as_deref(), Some("2024-01-01"));

        let mut other = tempfile::NamedTempFile::new().unwrap();
        writeln!(other, "id;label").unwrap();
        assert_eq!(preview_extract(other.path()).unwrap_err().exit_code(), crate::error::EXIT_DATA);
    }

    #[test]
    fn loads_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "X;Y;2024-01-01;00:00;10").unwrap();
        let extract = load_extract_path(file.path()).unwrap();
        assert_eq!(extract.readings.len(), 1);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = load_extract_path(Path::new("/nonexistent/extract.csv")).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }
}
