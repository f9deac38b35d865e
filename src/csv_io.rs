use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, ensure, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SprintDraft, SprintRecord};

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "name",
    "startDate",
    "endDate",
    "plannedPoints",
    "completedPoints",
    "teamAvailability",
    "notes",
];

pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
const MAX_NAME_LEN: usize = 120;
const MAX_NOTES_LEN: usize = 1000;
const MAX_DATE_LEN: usize = 25;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SprintRow {
    name: String,
    start_date: String,
    end_date: String,
    planned_points: String,
    completed_points: String,
    team_availability: String,
    #[serde(default)]
    team_capacity: Option<String>,
    notes: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRow<'a> {
    name: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    planned_points: f64,
    completed_points: f64,
    team_availability: f64,
    notes: &'a str,
    team_capacity: Option<f64>,
}

/// Parses sprint rows, normalizing dates and clamping numbers into range.
pub fn parse_sprints<R: Read>(reader: R) -> anyhow::Result<Vec<SprintDraft>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }

    let mut drafts = Vec::new();
    for (index, result) in reader.deserialize::<SprintRow>().enumerate() {
        let row = result.with_context(|| format!("row {} is malformed", index + 2))?;
        drafts.push(draft_from_row(row));
    }

    ensure!(
        !drafts.is_empty(),
        "CSV file must contain a header and at least one data row"
    );
    Ok(drafts)
}

pub fn read_sprints_file(path: &Path) -> anyhow::Result<Vec<SprintDraft>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    ensure!(is_csv, "{} is not a .csv file", path.display());

    let size = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    ensure!(
        size <= MAX_FILE_BYTES,
        "{} is too large ({size} bytes, limit {MAX_FILE_BYTES})",
        path.display()
    );

    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let drafts = parse_sprints(file).with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::info!(rows = drafts.len(), path = %path.display(), "parsed sprint CSV");
    Ok(drafts)
}

pub fn write_sprints<W: Write>(writer: W, records: &[SprintRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(ExportRow {
            name: &record.name,
            start_date: record.start_date,
            end_date: record.end_date,
            planned_points: record.planned_points(),
            completed_points: record.completed_points(),
            team_availability: record.team_availability,
            notes: &record.notes,
            team_capacity: record.team_capacity,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Header plus one sample row.
pub fn template() -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REQUIRED_COLUMNS)?;
    writer.write_record([
        "Sprint 1",
        "2024-01-01",
        "2024-01-14",
        "32",
        "28",
        "90",
        "Good sprint, one story moved to next sprint",
    ])?;
    let bytes = writer.into_inner().context("failed to flush CSV template")?;
    Ok(String::from_utf8(bytes)?)
}

fn draft_from_row(row: SprintRow) -> SprintDraft {
    SprintDraft {
        name: sanitize_text(&row.name, MAX_NAME_LEN),
        start_date: normalize_date(&row.start_date),
        end_date: normalize_date(&row.end_date),
        planned_points: parse_points(&row.planned_points),
        completed_points: parse_points(&row.completed_points),
        team_availability: parse_availability(&row.team_availability),
        team_capacity: row
            .team_capacity
            .as_deref()
            .and_then(parse_number)
            .map(|v| v.max(0.0)),
        notes: sanitize_text(&row.notes, MAX_NOTES_LEN),
    }
}

fn parse_number(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_points(input: &str) -> f64 {
    parse_number(input).map(|v| v.max(0.0)).unwrap_or(0.0)
}

fn parse_availability(input: &str) -> f64 {
    parse_number(input)
        .map(|v| v.clamp(0.0, 100.0))
        .unwrap_or(100.0)
}

/// Strips control characters and HTML tags, softens quotes, caps length.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let without_controls: Vec<char> = input
        .chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F))
        .collect();

    let mut cleaned = String::with_capacity(without_controls.len());
    let mut i = 0;
    while i < without_controls.len() {
        let c = without_controls[i];
        if c == '<' {
            if let Some(offset) = without_controls[i + 1..].iter().position(|c| *c == '>') {
                i += offset + 2;
                continue;
            }
        }
        cleaned.push(match c {
            '"' | '`' => '\'',
            other => other,
        });
        i += 1;
    }

    let truncated: String = cleaned.chars().take(max_len).collect();
    truncated.trim().to_string()
}

/// Normalizes a loosely formatted date, falling back to today.
pub fn normalize_date(input: &str) -> NaiveDate {
    match parse_date(input) {
        Some(date) => date,
        None => {
            tracing::warn!(input, "unable to parse date, using current date");
            Utc::now().date_naive()
        }
    }
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let cleaned = sanitize_text(input, MAX_DATE_LEN).replace('\'', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let parts: Vec<&str> = cleaned.split(['/', '-']).collect();
    if parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        if let Some(date) = parse_numeric_date(parts[0], parts[1], parts[2]) {
            return Some(date);
        }
    }

    DateTime::parse_from_rfc3339(cleaned)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

fn parse_numeric_date(first: &str, second: &str, third: &str) -> Option<NaiveDate> {
    let a: u32 = first.parse().ok()?;
    let b: u32 = second.parse().ok()?;
    let c: i32 = third.parse().ok()?;

    match (first.len(), second.len(), third.len()) {
        // YYYY-MM-DD or YYYY/MM/DD
        (4, 1..=2, 1..=2) => in_range(a as i32, b, c as u32),
        // MM/DD/YYYY, then DD/MM/YYYY
        (1..=2, 1..=2, 4) => in_range(c, a, b).or_else(|| in_range(c, b, a)),
        // MM/DD/YY
        (1..=2, 1..=2, 2) => {
            let year = if c >= 50 { 1900 + c } else { 2000 + c };
            NaiveDate::from_ymd_opt(year, a, b)
        }
        _ => None,
    }
}

fn in_range(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sanitize_strips_markup_and_controls() {
        assert_eq!(sanitize_text("  <b>Sprint</b> 1\u{7}  ", 120), "Sprint 1");
        assert_eq!(sanitize_text("say \"hi\" `now`", 120), "say 'hi' 'now'");
        assert_eq!(sanitize_text("a < b", 120), "a < b");
        assert_eq!(sanitize_text("abcdef", 3), "abc");
    }

    #[test]
    fn dates_in_common_formats() {
        assert_eq!(parse_date("2024-01-15"), Some(date(2024, 1, 15)));
        assert_eq!(parse_date("01/15/2024"), Some(date(2024, 1, 15)));
        assert_eq!(parse_date("15/01/2024"), Some(date(2024, 1, 15)));
        assert_eq!(parse_date("2024/1/5"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("1/15/24"), Some(date(2024, 1, 15)));
        assert_eq!(parse_date("1/15/99"), Some(date(1999, 1, 15)));
        assert_eq!(parse_date("\"2024-02-29\""), Some(date(2024, 2, 29)));
        assert_eq!(parse_date("2024-03-01T10:00:00Z"), Some(date(2024, 3, 1)));
    }

    #[test]
    fn impossible_dates_are_rejected() {
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("13/13/2024"), None);
        assert_eq!(parse_date("01/01/1800"), None);
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn parse_clamps_and_defaults() {
        let input = "name,startDate,endDate,plannedPoints,completedPoints,teamAvailability,notes\n\
                     <i>Sprint 7</i>,2024-03-04,03/17/2024,-4,abc,140,fine\n\
                     Sprint 8,2024-03-18,2024-03-31,30,27,,\n";
        let drafts = parse_sprints(input.as_bytes()).unwrap();
        assert_eq!(drafts.len(), 2);

        let first = &drafts[0];
        assert_eq!(first.name, "Sprint 7");
        assert_eq!(first.end_date, date(2024, 3, 17));
        assert_eq!(first.planned_points, 0.0);
        assert_eq!(first.completed_points, 0.0);
        assert_eq!(first.team_availability, 100.0);
        assert_eq!(first.team_capacity, None);

        let second = &drafts[1];
        assert_eq!(second.planned_points, 30.0);
        assert_eq!(second.completed_points, 27.0);
        assert_eq!(second.team_availability, 100.0);
        assert_eq!(second.notes, "");
    }

    #[test]
    fn parse_reads_optional_capacity() {
        let input = "name,startDate,endDate,plannedPoints,completedPoints,teamAvailability,notes,teamCapacity\n\
                     Sprint 1,2024-01-01,2024-01-14,32,28,90,ok,25\n";
        let drafts = parse_sprints(input.as_bytes()).unwrap();
        assert_eq!(drafts[0].team_capacity, Some(25.0));
        assert_eq!(drafts[0].team_availability, 90.0);
    }

    #[test]
    fn parse_reports_missing_columns() {
        let input = "name,startDate,plannedPoints\nSprint 1,2024-01-01,30\n";
        let err = parse_sprints(input.as_bytes()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("endDate"));
        assert!(message.contains("teamAvailability"));
    }

    #[test]
    fn parse_requires_a_data_row() {
        let input = "name,startDate,endDate,plannedPoints,completedPoints,teamAvailability,notes\n";
        assert!(parse_sprints(input.as_bytes()).is_err());
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let input = "name,startDate,endDate,plannedPoints,completedPoints,teamAvailability,notes\n\
                     Sprint 1,2024-01-01,2024-01-14,32\n";
        assert!(parse_sprints(input.as_bytes()).is_err());
    }

    #[test]
    fn export_can_be_imported_again() {
        let records = sample();
        let mut buffer = Vec::new();
        write_sprints(&mut buffer, &records).unwrap();

        let drafts = parse_sprints(buffer.as_slice()).unwrap();
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[2].planned_points, 35.0);
        assert_eq!(drafts[2].completed_points, 26.0);
        assert_eq!(drafts[2].team_availability, 85.0);
        assert_eq!(drafts[0].start_date, records[0].start_date);
    }

    #[test]
    fn template_parses() {
        let text = template().unwrap();
        assert!(text.starts_with("name,startDate,endDate"));
        let drafts = parse_sprints(text.as_bytes()).unwrap();
        assert_eq!(drafts[0].name, "Sprint 1");
        assert_eq!(drafts[0].notes, "Good sprint, one story moved to next sprint");
    }
}
