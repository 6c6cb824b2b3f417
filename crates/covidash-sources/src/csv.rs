//! Offline covid figures from a dashboard CSV export.
//!
//! The export has the columns
//! `areaCode,areaName,areaType,date,cumDailyNsoDeathsByDeathDate,hospitalCases,newCasesBySpecimenDate`
//! with a header line followed by one row per day, newest first.

use std::path::Path;

use covidash_core::CsvSummary;

use crate::error::SourceError;

const AREA_NAME_COL: usize = 1;
const DEATHS_COL: usize = 4;
const HOSPITAL_COL: usize = 5;
const NEW_CASES_COL: usize = 6;

/// Rows summed for the weekly case count. Row 1 is too fresh and row 2 is
/// still incomplete.
const WEEK_ROWS: std::ops::RangeInclusive<usize> = 3..=9;

/// First row where the cumulative death figure is considered settled.
const DEATHS_ROW: usize = 14;

/// Reads `path` and returns its lines with surrounding whitespace trimmed.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be read.
pub fn parse_csv_data(path: &Path) -> Result<Vec<String>, SourceError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(raw.lines().map(|line| line.trim().to_owned()).collect())
}

/// Extracts the weekly cases, current hospital cases and cumulative deaths
/// from the lines of a CSV export.
///
/// Line numbers in errors are 0-based indexes into `lines`, so the header is
/// line 0.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] when a required line is missing or a cell is
/// not an integer.
pub fn process_covid_csv_data<S: AsRef<str>>(lines: &[S]) -> Result<CsvSummary, SourceError> {
    let mut week_cases = 0i64;
    for index in WEEK_ROWS {
        week_cases = week_cases
            .checked_add(integer_cell(lines, index, NEW_CASES_COL)?)
            .ok_or_else(|| SourceError::Csv {
                line: index,
                reason: "weekly case total overflows".to_owned(),
            })?;
    }

    let hospital_cases = integer_cell(lines, 1, HOSPITAL_COL)?;

    let deaths_index = (DEATHS_ROW..lines.len())
        .find(|&i| cell(lines, i, DEATHS_COL).is_ok_and(|c| !c.is_empty()))
        .ok_or_else(|| SourceError::Csv {
            line: DEATHS_ROW,
            reason: format!("no cumulative death figure at or after line {DEATHS_ROW}"),
        })?;
    let cumulative_deaths = integer_cell(lines, deaths_index, DEATHS_COL)?;

    let area_name = cell(lines, 1, AREA_NAME_COL)
        .ok()
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    tracing::debug!(
        week_cases,
        hospital_cases,
        cumulative_deaths,
        "csv: processed covid export"
    );

    Ok(CsvSummary {
        area_name,
        week_cases,
        hospital_cases,
        cumulative_deaths,
    })
}

/// Reads and processes a CSV export in one step.
///
/// # Errors
///
/// Propagates errors from [`parse_csv_data`] and [`process_covid_csv_data`].
pub fn summarize_csv_file(path: &Path) -> Result<CsvSummary, SourceError> {
    let lines = parse_csv_data(path)?;
    process_covid_csv_data(&lines)
}

fn cell<S: AsRef<str>>(lines: &[S], index: usize, column: usize) -> Result<&str, SourceError> {
    let line = lines.get(index).ok_or_else(|| SourceError::Csv {
        line: index,
        reason: format!("expected at least {} lines, found {}", index + 1, lines.len()),
    })?;
    line.as_ref()
        .split(',')
        .nth(column)
        .map(str::trim)
        .ok_or_else(|| SourceError::Csv {
            line: index,
            reason: format!("missing column {column}"),
        })
}

fn integer_cell<S: AsRef<str>>(
    lines: &[S],
    index: usize,
    column: usize,
) -> Result<i64, SourceError> {
    let raw = cell(lines, index, column)?;
    raw.parse::<i64>().map_err(|_| SourceError::Csv {
        line: index,
        reason: format!("column {column} is not an integer: \"{raw}\""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "areaCode,areaName,areaType,date,cumDailyNsoDeathsByDeathDate,hospitalCases,newCasesBySpecimenDate";

    /// Twenty daily rows. Row `i` (1-based) has `10 * i` new cases and
    /// `5000 - i` deaths; only row 1 carries a hospital figure.
    fn lines() -> Vec<String> {
        let mut lines = vec![HEADER.to_owned()];
        for i in 1..=20 {
            let hospital = if i == 1 { "321" } else { "" };
            lines.push(format!(
                "E92000001,England,nation,2021-10-{:02},{},{hospital},{}",
                29 - i.min(28),
                5000 - i,
                10 * i
            ));
        }
        lines
    }

    #[test]
    fn sums_rows_three_to_nine_for_week_cases() {
        let summary = process_covid_csv_data(&lines()).unwrap();
        // 30 + 40 + ... + 90
        assert_eq!(summary.week_cases, 420);
    }

    #[test]
    fn reads_hospital_cases_and_area_from_first_row() {
        let summary = process_covid_csv_data(&lines()).unwrap();
        assert_eq!(summary.hospital_cases, 321);
        assert_eq!(summary.area_name.as_deref(), Some("England"));
    }

    #[test]
    fn reads_deaths_from_row_fourteen() {
        let summary = process_covid_csv_data(&lines()).unwrap();
        assert_eq!(summary.cumulative_deaths, 4986);
    }

    #[test]
    fn skips_blank_death_cells_after_row_fourteen() {
        let mut lines = lines();
        lines[14] = "E92000001,England,nation,2021-10-15,,,140".to_owned();
        lines[15] = "E92000001,England,nation,2021-10-14,,,150".to_owned();
        let summary = process_covid_csv_data(&lines).unwrap();
        assert_eq!(summary.cumulative_deaths, 4984);
    }

    #[test]
    fn overflowing_week_total_is_an_error() {
        let mut lines = lines();
        lines[3] = format!("E92000001,England,nation,2021-10-26,4997,,{}", i64::MAX);
        lines[4] = format!("E92000001,England,nation,2021-10-25,4996,,{}", i64::MAX);
        let err = process_covid_csv_data(&lines).unwrap_err();
        assert!(
            matches!(err, SourceError::Csv { line: 4, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn too_few_lines_is_an_error() {
        let short: Vec<String> = lines().into_iter().take(5).collect();
        let err = process_covid_csv_data(&short).unwrap_err();
        assert!(
            matches!(err, SourceError::Csv { line: 5, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let mut lines = lines();
        lines[4] = "E92000001,England,nation,2021-10-25,4996,,lots".to_owned();
        let err = process_covid_csv_data(&lines).unwrap_err();
        match err {
            SourceError::Csv { line, reason } => {
                assert_eq!(line, 4);
                assert!(reason.contains("lots"), "reason was: {reason}");
            }
            other => panic!("expected Csv error, got {other:?}"),
        }
    }

    #[test]
    fn missing_death_figures_is_an_error() {
        let mut lines = lines();
        for line in lines.iter_mut().skip(DEATHS_ROW) {
            *line = "E92000001,England,nation,2021-10-01,,,1".to_owned();
        }
        assert!(matches!(
            process_covid_csv_data(&lines),
            Err(SourceError::Csv { line: 14, .. })
        ));
    }

    #[test]
    fn fixture_file_is_summarized() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/nation_sample.csv");
        let summary = summarize_csv_file(&path).unwrap();
        assert_eq!(
            summary,
            CsvSummary {
                area_name: Some("England".to_owned()),
                week_cases: 240_299,
                hospital_cases: 7_019,
                cumulative_deaths: 141_544,
            }
        );
    }

    #[test]
    fn parse_csv_data_trims_lines() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/nation_sample.csv");
        let lines = parse_csv_data(&path).unwrap();
        assert_eq!(lines[0], HEADER);
        assert!(lines.iter().all(|l| l.trim() == l));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = parse_csv_data(Path::new("/nonexistent/covid.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
