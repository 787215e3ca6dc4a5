// src/services/export.rs

//! CSV export of the filtered submission view.
//!
//! Every field is quoted; quotes inside a field are doubled (RFC 4180).

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use csv::{QuoteStyle, WriterBuilder};

use crate::error::Result;
use crate::models::Submission;

/// Column headers, in order.
pub const HEADER: [&str; 7] = [
    "Country",
    "Slug",
    "Submitted By",
    "Status",
    "Created At",
    "Reviewed At",
    "Rejection Note",
];

/// Placeholder for submissions without a review timestamp.
pub const NOT_REVIEWED: &str = "Not reviewed";

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_local(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(DATE_TIME_FORMAT).to_string()
}

/// File name for an export made on `date`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("country-submissions-{}.csv", date.format("%Y-%m-%d"))
}

/// One CSV row for a submission.
fn row(submission: &Submission) -> [String; 7] {
    [
        submission.name.clone(),
        submission.slug.clone(),
        submission.submitted_by().to_string(),
        submission.status().to_string(),
        format_local(&submission.created_at),
        submission
            .reviewed_at()
            .map(|at| format_local(&at))
            .unwrap_or_else(|| NOT_REVIEWED.to_string()),
        submission.rejection_note().unwrap_or_default().to_string(),
    ]
}

/// Write the header and one row per submission.
pub fn write_csv<W: Write>(writer: W, submissions: &[Submission]) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv.write_record(HEADER)?;
    for submission in submissions {
        csv.write_record(row(submission))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `submissions` into `dir` under the dated export name.
pub fn export_to_dir(dir: &Path, submissions: &[Submission], date: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(date));
    let file = std::fs::File::create(&path)?;
    write_csv(std::io::BufWriter::new(file), submissions)?;

    log::info!("Exported {} submissions to {}", submissions.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewStatus;
    use chrono::TimeZone;

    fn sample() -> Vec<Submission> {
        let created = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let mut rejected = Submission::new("2", "Côte d'Ivoire", "ci", created)
            .with_submitter("Bob \"B\" Smith", "bob@example.com");
        rejected.reject(created, "Says \"fast\", no data").unwrap();

        vec![
            Submission::new("1", "Ghana", "gh", created).with_submitter("Alice", "a@example.com"),
            rejected,
            Submission::new("3", "Peru, Republic of", "pe", created),
        ]
    }

    #[test]
    fn test_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(export_filename(date), "country-submissions-2026-03-09.csv");
    }

    #[test]
    fn test_every_field_quoted() {
        let mut out = Vec::new();
        write_csv(&mut out, &sample()[..1]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            r#""Country","Slug","Submitted By","Status","Created At","Reviewed At","Rejection Note""#
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with(r#""Ghana","gh","Alice","pending","#));
        assert!(row.ends_with(r#","Not reviewed","""#));
    }

    #[test]
    fn test_round_trip_recovers_fields() {
        let submissions = sample();
        let mut out = Vec::new();
        write_csv(&mut out, &submissions).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), submissions.len());
        for (record, submission) in rows.iter().zip(&submissions) {
            assert_eq!(&record[0], submission.name);
            assert_eq!(&record[1], submission.slug);
            assert_eq!(record[3].parse::<ReviewStatus>().unwrap(), submission.status());
        }

        assert_eq!(&rows[1][2], "Bob \"B\" Smith");
        assert_eq!(&rows[1][6], "Says \"fast\", no data");
        assert_ne!(&rows[1][5], NOT_REVIEWED);
        assert_eq!(&rows[2][2], "Unknown");
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let path = export_to_dir(&dir.path().join("out"), &sample(), date).unwrap();

        assert!(path.ends_with("country-submissions-2026-10-16.csv"));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
