//! Exports: statistics CSV, analysis report JSON and synthetic extracts.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::RawReading;
use crate::error::{AppError, EXIT_INPUT};
use crate::io::ingest::{COL_AREA_CODE, COL_AREA_NAME, COL_CONSUMPTION, COL_DATE, COL_TIME};
use crate::report::AnalysisReport;
use crate::stats::DescriptiveStats;

fn create(path: &Path, what: &str) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create {what} '{}': {e}", path.display())))
}

fn write_err(what: &str) -> impl Fn(csv::Error) -> AppError + '_ {
    move |e| AppError::new(EXIT_INPUT, format!("Failed to write {what}: {e}"))
}

/// Write the descriptive statistics as a one-row CSV.
pub fn write_stats_csv(path: &Path, stats: &DescriptiveStats) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(create(path, "statistics CSV")?);
    writer.serialize(stats).map_err(write_err("statistics CSV"))?;
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write statistics CSV: {e}")))
}

/// Write the full analysis report as pretty JSON.
pub fn write_report_json(path: &Path, report: &AnalysisReport) -> Result<(), AppError> {
    let mut file = create(path, "report JSON")?;
    serde_json::to_writer_pretty(&mut file, report)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write report JSON: {e}")))?;
    writeln!(file)
        .and_then(|()| file.flush())
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write report JSON: {e}")))
}

/// Write readings in the semicolon-delimited extract format the loader reads.
///
/// Absent consumption is written as an empty cell.
pub fn write_extract_csv<W: Write>(writer: W, readings: &[RawReading]) -> Result<(), AppError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    let err = write_err("extract");

    writer
        .write_record([COL_AREA_CODE, COL_AREA_NAME, COL_DATE, COL_TIME, COL_CONSUMPTION])
        .map_err(&err)?;
    for r in readings {
        let consumption = r.consumption.map(|v| format!("{v:.0}")).unwrap_or_default();
        writer
            .write_record([
                r.area_code.as_str(),
                r.area_name.as_str(),
                r.date.as_str(),
                r.time.as_str(),
                consumption.as_str(),
            ])
            .map_err(&err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write extract: {e}")))
}

pub fn write_extract_path(path: &Path, readings: &[RawReading]) -> Result<(), AppError> {
    write_extract_csv(create(path, "extract")?, readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::load_extract_str;
    use crate::stats::describe;

    #[test]
    fn extract_written_is_readable_by_the_loader() {
        let readings = vec![
            RawReading {
                line: 0,
                area_code: "200046977".to_string(),
                area_name: "Métropole de Lyon".to_string(),
                date: "2024-01-01".to_string(),
                time: "00:00".to_string(),
                consumption: Some(1523.0),
            },
            RawReading {
                line: 0,
                area_code: "200046977".to_string(),
                area_name: "Métropole de Lyon".to_string(),
                date: "2024-01-01".to_string(),
                time: "00:15".to_string(),
                consumption: None,
            },
        ];
        let mut buf = Vec::new();
        write_extract_csv(&mut buf, &readings).unwrap();
        let body = String::from_utf8(buf).unwrap();
        assert!(body.starts_with("Code métropole;Métropole;Date;Heures;Consommation (MW)\n"));

        let back = load_extract_str(&body).unwrap();
        assert_eq!(back.readings.len(), 2);
        assert_eq!(back.readings[0].consumption, Some(1523.0));
        assert_eq!(back.readings[1].consumption, None);
        assert_eq!(back.readings[1].line, 3);
    }

    #[test]
    fn stats_csv_has_header_and_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        write_stats_csv(&path, &describe(&[1.0, 2.0, 3.0]).unwrap()).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let mut lines = body.lines();
        assert_eq!(
            lines.next(),
            Some("count,mean,median,mode,min,max,range,std_dev,variance,skewness,kurtosis")
        );
        assert!(lines.next().unwrap().starts_with("3,2.0,2.0,1.0,1.0,3.0,2.0,1.0,1.0,"));
        assert_eq!(lines.next(), None);
    }
}
