//! Interactive extract picker.
//!
//! Runs only when no source was given on the command line, in the
//! configuration file or in `CONSO_CSV`. Candidates are the files under the
//! working directory whose header carries the consumption columns; each is
//! listed with the metropole and first date of its first row.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::CSV_ENV;
use crate::error::{AppError, EXIT_INPUT};
use crate::io::ingest::{ExtractPreview, preview_extract};

const SEARCH_DEPTH: usize = 4;

/// A file that looks like a consumption extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub preview: ExtractPreview,
}

impl Candidate {
    fn label(&self) -> String {
        let path = self.path.strip_prefix(".").unwrap_or(self.path.as_path()).display();
        match (&self.preview.area_name, &self.preview.first_date) {
            (Some(area), Some(date)) => format!("{path}  [{area}, from {date}]"),
            (Some(area), None) => format!("{path}  [{area}]"),
            _ => format!("{path}  [no rows]"),
        }
    }
}

/// Prompt on the terminal for an extract found under the working directory.
pub fn prompt_for_csv_path() -> Result<PathBuf, AppError> {
    let candidates = discover_extracts(Path::new("."), SEARCH_DEPTH);
    let stdin = io::stdin();
    choose(&candidates, &mut stdin.lock(), &mut io::stdout())
}

/// Selection loop: a list number or a path; `q` or end of input cancels.
pub fn choose<R: BufRead, W: Write>(
    candidates: &[Candidate],
    input: &mut R,
    output: &mut W,
) -> Result<PathBuf, AppError> {
    if candidates.is_empty() {
        return Err(AppError::new(
            EXIT_INPUT,
            format!(
                "No consumption extract found under the working directory. \
                 Pass `-f <extract.csv>`, `--url`, `--metropole` or set {CSV_ENV}."
            ),
        ));
    }

    let prompt_err = |e: io::Error| AppError::new(EXIT_INPUT, format!("Failed to write prompt: {e}"));
    writeln!(output, "Found {} extract(s):", candidates.len()).map_err(prompt_err)?;
    for (idx, c) in candidates.iter().enumerate() {
        writeln!(output, "{:>3}) {}", idx + 1, c.label()).map_err(prompt_err)?;
    }

    loop {
        write!(output, "Extract number (1-{}) or path, q to quit: ", candidates.len()).map_err(prompt_err)?;
        output.flush().map_err(prompt_err)?;

        let mut line = String::new();
        let bytes = input
            .read_line(&mut line)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read input: {e}")))?;
        let line = line.trim();
        if bytes == 0 || line.eq_ignore_ascii_case("q") {
            return Err(AppError::new(EXIT_INPUT, "No extract selected."));
        }

        let picked = match line.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => return Ok(candidates[n - 1].path.clone()),
            Ok(n) => Err(format!("No extract numbered {n}.")),
            Err(_) => check_extract(Path::new(line)).map_err(|e| e.to_string()),
        };
        match picked {
            Ok(path) => return Ok(path),
            Err(msg) => writeln!(output, "{msg}").map_err(prompt_err)?,
        }
    }
}

/// Accept a typed path only if it is a readable extract.
pub fn check_extract(path: &Path) -> Result<PathBuf, AppError> {
    if !path.is_file() {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Not a file: {}", path.display()),
        ));
    }
    preview_extract(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("{} is not a consumption extract: {}", path.display(), e),
        )
    })?;
    Ok(path.to_path_buf())
}

/// Extracts under `root`, sorted by path. Hidden and build directories are
/// skipped; CSV files without the extract header are left out.
pub fn discover_extracts(root: &Path, max_depth: usize) -> Vec<Candidate> {
    let mut files = Vec::new();
    collect_csv_files(root, max_depth, &mut files);
    files.sort();

    files
        .into_iter()
        .filter_map(|path| match preview_extract(&path) {
            Ok(preview) => Some(Candidate { path, preview }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping non-extract csv");
                None
            }
        })
        .collect()
}

fn collect_csv_files(dir: &Path, depth_left: usize, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(kind) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if kind.is_dir() {
            if depth_left > 0 && !name.starts_with('.') && name != "target" {
                collect_csv_files(&path, depth_left - 1, out);
            }
        } else if kind.is_file() && name.to_ascii_lowercase().ends_with(".csv") {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "Code métropole;Métropole;Date;Heures;Consommation (MW)";

    fn write_extract(path: &Path, area: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("{HEADER}\n1;{area};2024-01-01;00:00;900\n")).unwrap();
    }

    fn candidates(dir: &Path) -> Vec<Candidate> {
        discover_extracts(dir, SEARCH_DEPTH)
    }

    #[test]
    fn offers_only_files_with_the_extract_header() {
        let dir = tempfile::tempdir().unwrap();
        write_extract(&dir.path().join("data/lyon.csv"), "Métropole de Lyon");
        write_extract(&dir.path().join("target/stale.csv"), "Stale");
        write_extract(&dir.path().join(".cache/hidden.csv"), "Hidden");
        fs::write(dir.path().join("data/prices.csv"), "id;price\n1;2\n").unwrap();

        let found = candidates(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, dir.path().join("data/lyon.csv"));
        assert_eq!(found[0].preview.area_name.as_deref(), Some("Métropole de Lyon"));
        assert!(found[0].label().ends_with("[Métropole de Lyon, from 2024-01-01]"));
    }

    #[test]
    fn picks_by_number_after_a_bad_choice() {
        let dir = tempfile::tempdir().unwrap();
        write_extract(&dir.path().join("a.csv"), "Lille");
        write_extract(&dir.path().join("b.csv"), "Nantes");
        let found = candidates(dir.path());

        let mut out = Vec::new();
        let picked = choose(&found, &mut Cursor::new("7\n2\n"), &mut out).unwrap();
        assert_eq!(picked, dir.path().join("b.csv"));

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.starts_with("Found 2 extract(s):\n"));
        assert!(shown.contains("No extract numbered 7."));
    }

    #[test]
    fn typed_path_must_be_an_extract() {
        let dir = tempfile::tempdir().unwrap();
        write_extract(&dir.path().join("a.csv"), "Lille");
        let other = dir.path().join("notes.csv");
        fs::write(&other, "just;text\n").unwrap();
        let typed = dir.path().join("elsewhere.txt");
        write_extract(&typed, "Rennes");
        let found = candidates(dir.path());

        let input = format!("{}\n{}\n", other.display(), typed.display());
        let mut out = Vec::new();
        let picked = choose(&found, &mut Cursor::new(input), &mut out).unwrap();
        assert_eq!(picked, typed);
        assert!(String::from_utf8(out).unwrap().contains("is not a consumption extract"));
    }

    #[test]
    fn quit_end_of_input_and_empty_list_are_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_extract(&dir.path().join("a.csv"), "Lille");
        let found = candidates(dir.path());

        for input in ["q\n", ""] {
            let err = choose(&found, &mut Cursor::new(input), &mut Vec::new()).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_INPUT);
        }
        let err = choose(&[], &mut Cursor::new("1\n"), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains(CSV_ENV));
    }
}
