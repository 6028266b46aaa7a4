//! Markdown audit bundle of one cleaning run: configuration, normalization
//! counts, tier counts and every absent run with its outcome.

use std::fs::{File, create_dir_all};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::config::{InputSource, RunConfig};
use crate::domain::FillSource;
use crate::error::{AppError, EXIT_RUNTIME};

pub fn write_audit_bundle(path: &Path, run: &RunConfig, out: &RunOutput) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir).map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to create audit dir: {e}")))?;
    }
    let file =
        File::create(path).map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to create audit file: {e}")))?;

    let mut w = BufWriter::new(file);
    write_audit(&mut w, run, out, &Local::now().to_rfc3339())
        .and_then(|()| w.flush())
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write audit '{}': {e}", path.display())))
}

/// Audit markdown; `generated` is stamped into the header.
pub fn write_audit<W: Write>(w: &mut W, run: &RunConfig, out: &RunOutput, generated: &str) -> io::Result<()> {
    let area = out.series.area();
    let sampling = out.series.sampling();

    writeln!(w, "# conso audit bundle")?;
    writeln!(w, "- generated: {generated}")?;
    writeln!(w, "- source: {}", out.source)?;
    writeln!(w, "- input: {}", describe_input(&run.input))?;
    writeln!(w, "- processing_date: {}", run.today)?;
    writeln!(w, "- area: {} ({})", area.name, area.code)?;
    writeln!(
        w,
        "- sampling: interval={} min, interpolation_limit={}, lag={} days ({} samples)",
        sampling.interval_minutes,
        sampling.interpolation_limit,
        sampling.lag_days,
        sampling.lag_samples()
    )?;
    if let (Some(first), Some(last)) = (out.series.first_instant(), out.series.last_instant()) {
        writeln!(w, "- span: {first} .. {last} ({} samples)", out.series.len())?;
    }
    if !out.ignored_columns.is_empty() {
        writeln!(w, "- ignored_columns: {}", out.ignored_columns.join(", "))?;
    }

    let n = &out.normalization;
    writeln!(w, "\n## Normalization")?;
    writeln!(w, "| rows_in | other_area | today | zeros | unreported | inserted |")?;
    writeln!(w, "| - | - | - | - | - | - |")?;
    writeln!(
        w,
        "| {} | {} | {} | {} | {} | {} |",
        n.rows_in, n.rows_other_area, n.rows_today, n.zero_readings, n.unreported, n.inserted
    )?;

    writeln!(w, "\n## Fill sources")?;
    writeln!(w, "| source | samples |")?;
    writeln!(w, "| - | - |")?;
    for source in [
        FillSource::Original,
        FillSource::Interpolated,
        FillSource::WeeklyLag,
        FillSource::Unreconstructed,
    ] {
        writeln!(w, "| {} | {} |", source.label(), out.summary.count(source))?;
    }

    writeln!(w, "\n## Absent runs")?;
    if out.summary.runs.is_empty() {
        writeln!(w, "none")?;
    } else {
        writeln!(w, "| start | samples | class |")?;
        writeln!(w, "| - | - | - |")?;
        for run in &out.summary.runs {
            writeln!(w, "| {} | {} | {} |", run.start, run.len, run.class.label())?;
        }
    }

    writeln!(w, "\n## Unreconstructable gaps")?;
    if out.summary.unreconstructable.is_empty() {
        writeln!(w, "none")?;
    } else {
        writeln!(w, "| start | end | samples |")?;
        writeln!(w, "| - | - | - |")?;
        for gap in &out.summary.unreconstructable {
            writeln!(w, "| {} | {} | {} |", gap.start, gap.end, gap.len)?;
        }
    }
    Ok(())
}

fn describe_input(input: &InputSource) -> String {
    match input {
        InputSource::File(path) => format!("file {}", path.display()),
        InputSource::Url(url) => format!("url {url}"),
        InputSource::Metropole(name) => format!("metropole {name}"),
        InputSource::Prompt => "interactive".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::clean_extract;
    use crate::domain::SamplingConfig;
    use crate::io::ingest::load_extract_str;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn run_config() -> RunConfig {
        RunConfig {
            input: InputSource::File(PathBuf::from("lyon.csv")),
            area: None,
            today: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            sampling: SamplingConfig::default(),
            adf_max_lag: None,
        }
    }

    fn output(run: &RunConfig) -> RunOutput {
        let body = "\
Code métropole;Métropole;Date;Heures;Consommation (MW)
1;Lyon;2024-01-01;00:00;100
1;Lyon;2024-01-01;00:15;0
1;Lyon;2024-01-01;00:30;120
1;Lyon;2024-01-01;00:45;130
";
        clean_extract("lyon.csv".to_string(), load_extract_str(body).unwrap(), run).unwrap()
    }

    #[test]
    fn audit_lists_configuration_and_runs() {
        let run = run_config();
        let mut buf = Vec::new();
        write_audit(&mut buf, &run, &output(&run), "now").unwrap();
        let md = String::from_utf8(buf).unwrap();
        assert!(md.starts_with("# conso audit bundle\n- generated: now\n"));
        assert!(md.contains("- input: file lyon.csv"));
        assert!(md.contains("interpolation_limit=4, lag=7 days (672 samples)"));
        assert!(md.contains("| interpolated | 1 |"));
        assert!(md.contains("| 2024-01-01 00:15:00 | 1 | interpolated |"));
        assert!(md.contains("## Unreconstructable gaps\nnone\n"));
    }

    #[test]
    fn bundle_is_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit/run.md");
        let run = run_config();
        write_audit_bundle(&path, &run, &output(&run)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Fill sources"));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::WriteZero, "no space left"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_propagated() {
        let run = run_config();
        let err = write_audit(&mut FullDisk, &run, &output(&run), "now").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn unwritable_path_is_a_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_config();
        let err = write_audit_bundle(dir.path(), &run, &output(&run)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
    }
}
