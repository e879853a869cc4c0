//! Interactive menu for the common download tasks.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::Path;
use stockfetch_core::data::report::report_storage;
use stockfetch_core::data::{SymbolSource, TimeRange};
use stockfetch_core::BatchJobConfig;

const SAMPLE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Sample,
    All,
    Stats,
    Exit,
}

pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim() {
        "1" => Some(MenuChoice::Sample),
        "2" => Some(MenuChoice::All),
        "3" => Some(MenuChoice::Stats),
        "4" => Some(MenuChoice::Exit),
        _ => None,
    }
}

/// Only an explicit `y` confirms.
pub fn is_confirmed(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("y")
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> Result<String> {
    write!(out, "{text}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line)
}

/// Show the menu once and run the chosen action.
pub fn run_menu<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    storage_dir: &Path,
    listings_dir: &Path,
) -> Result<()> {
    writeln!(out, "stockfetch")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "Choose an action:")?;
    writeln!(out, "1. Download sample data (first {SAMPLE_SIZE} symbols)")?;
    writeln!(out, "2. Download all listed symbols")?;
    writeln!(out, "3. Show download statistics")?;
    writeln!(out, "4. Exit")?;

    let choice = prompt(input, out, "Enter choice (1-4): ")?;
    let listings = SymbolSource::Listings(listings_dir.to_path_buf());

    match parse_choice(&choice) {
        Some(MenuChoice::Sample) => {
            writeln!(out, "Downloading sample data...")?;
            let job = BatchJobConfig::new(10, 0.5, TimeRange::default())?;
            let symbols = listings.sample(SAMPLE_SIZE);
            if symbols.is_empty() {
                tracing::error!("no symbols found; run `stockfetch listings` first");
            } else {
                crate::execute_download(&symbols, &job, storage_dir)?;
            }
            writeln!(out, "{}", report_storage(storage_dir))?;
        }
        Some(MenuChoice::All) => {
            writeln!(out, "Warning: downloading every listed symbol can take hours.")?;
            let answer = prompt(input, out, "Continue? (y/N): ")?;
            if !is_confirmed(&answer) {
                writeln!(out, "Cancelled")?;
                return Ok(());
            }
            let job = BatchJobConfig::new(20, 1.0, TimeRange::default())?;
            let symbols = listings.load();
            if symbols.is_empty() {
                tracing::error!("no symbols found; run `stockfetch listings` first");
            } else {
                crate::execute_download(&symbols, &job, storage_dir)?;
                writeln!(out, "{}", report_storage(storage_dir))?;
            }
        }
        Some(MenuChoice::Stats) => writeln!(out, "{}", report_storage(storage_dir))?,
        Some(MenuChoice::Exit) => writeln!(out, "Bye")?,
        None => writeln!(out, "Invalid choice")?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str, storage_dir: &Path) -> String {
        let mut out = Vec::new();
        run_menu(
            &mut Cursor::new(input.as_bytes()),
            &mut out,
            storage_dir,
            Path::new("/nonexistent/listings"),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn choices_parse() {
        assert_eq!(parse_choice(" 1\n"), Some(MenuChoice::Sample));
        assert_eq!(parse_choice("4"), Some(MenuChoice::Exit));
        assert_eq!(parse_choice("5"), None);
        assert_eq!(parse_choice(""), None);
    }

    #[test]
    fn confirmation_requires_y() {
        assert!(is_confirmed("y\n"));
        assert!(is_confirmed("Y"));
        assert!(!is_confirmed(""));
        assert!(!is_confirmed("yes"));
    }

    #[test]
    fn stats_choice_reports_storage() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("AAPL.csv"), "Date\n").unwrap();

        let output = run("3\n", tmp.path());
        assert!(output.contains("Downloaded files: 1"));
    }

    #[test]
    fn declining_full_download_cancels() {
        let tmp = tempfile::tempdir().unwrap();
        let output = run("2\nn\n", tmp.path());
        assert!(output.contains("Cancelled"));
    }

    #[test]
    fn invalid_and_exit_choices() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run("9\n", tmp.path()).contains("Invalid choice"));
        assert!(run("4\n", tmp.path()).contains("Bye"));
    }

    #[test]
    fn sample_without_listings_downloads_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let output = run("1\n", tmp.path());
        assert!(output.contains("Downloaded files: 0"));
    }
}
