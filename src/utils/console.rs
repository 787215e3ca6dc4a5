// src/utils/console.rs

//! Console reports for the CLI.
//!
//! Report text is built by `render_*` functions and printed by the thin
//! wrappers, so layout can be checked without capturing stdout.

use chrono::Local;

use crate::models::{StatsSnapshot, StatsSource, Submission};

const WIDTH: usize = 72;

/// Truncate to `max` characters, marking the cut with `…`.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(WIDTH);
    println!("{border}");
    println!("  {title}");
    println!("{border}");
}

/// Log a separator line
pub fn separator() {
    println!("{}", "─".repeat(WIDTH));
}

/// Render a summary section
pub fn render_summary(title: &str, items: &[(&str, String)]) -> String {
    let mut out = format!("[SUMMARY] {title}\n");
    for (key, value) in items {
        out.push_str(&format!("    {key}: {value}\n"));
    }
    out
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    print!("{}", render_summary(title, items));
}

/// Render stats with their origin and age.
pub fn render_stats(snapshot: &StatsSnapshot) -> String {
    let stats = &snapshot.stats;
    let source = match snapshot.source {
        StatsSource::Remote => "server",
        StatsSource::Derived => "derived from loaded submissions",
    };

    let mut items = vec![
        ("Total", stats.total_submissions.to_string()),
        ("Pending", stats.pending_submissions.to_string()),
        ("Approved", stats.approved_submissions.to_string()),
        ("Rejected", stats.rejected_submissions.to_string()),
        ("New today", stats.new_submissions_today.to_string()),
        ("Approval rate", format!("{}%", stats.approval_rate)),
        ("Users", stats.total_users.to_string()),
    ];
    if let Some(avg) = stats.average_review_time {
        items.push(("Avg review time", format!("{avg:.1}")));
    }
    items.push(("Source", source.to_string()));
    items.push((
        "Last updated",
        snapshot
            .updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    ));

    render_summary("Submission stats", &items)
}

/// Render a fixed-width table of submissions.
pub fn render_table(submissions: &[Submission], in_flight: Option<&str>) -> String {
    let mut out = format!(
        "{:<12} {:<22} {:<14} {:<16} {:<9} {}\n",
        "ID", "COUNTRY", "SLUG", "SUBMITTED BY", "STATUS", "CREATED"
    );
    for s in submissions {
        let marker = if in_flight == Some(s.id.as_str()) { " *" } else { "" };
        out.push_str(&format!(
            "{:<12} {:<22} {:<14} {:<16} {:<9} {}{}\n",
            clip(&s.id, 12),
            clip(&s.name, 22),
            clip(&s.slug, 14),
            clip(s.submitted_by(), 16),
            s.status(),
            s.created_at.with_timezone(&Local).format("%Y-%m-%d"),
            marker,
        ));
    }
    out
}

/// Render one submission in detail.
pub fn render_detail(submission: &Submission) -> String {
    let mut items = vec![
        ("ID", submission.id.clone()),
        ("Slug", submission.slug.clone()),
        ("Status", submission.status().to_string()),
        ("Submitted by", submission.submitted_by().to_string()),
    ];
    if let Some(user) = &submission.created_by {
        if !user.email.is_empty() {
            items.push(("Email", user.email.clone()));
        }
    }
    items.push((
        "Created",
        submission.created_at.with_timezone(&Local).to_rfc2822(),
    ));
    if let Some(at) = submission.reviewed_at() {
        items.push(("Reviewed", at.with_timezone(&Local).to_rfc2822()));
    }
    if let Some(note) = submission.rejection_note() {
        items.push(("Rejection note", note.to_string()));
    }
    render_summary(&submission.name, &items)
}
