use crate::types::{JobRecord, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

const MAX_TITLE_CHARS: usize = 50;
const MAX_LOCATION_CHARS: usize = 30;

/// "Today", "3d ago", "2w ago"... relative to `today`
pub fn relative_posted_label(posted: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(posted) = posted else {
        return "Unknown".to_string();
    };

    let days = (today - posted).num_days();
    match days {
        d if d < 0 => "Just posted".to_string(),
        0 => "Today".to_string(),
        1..=6 => format!("{}d ago", days),
        7..=29 => format!("{}w ago", days / 7),
        30..=364 => format!("{}mo ago", days / 30),
        _ => format!("{}y ago", days / 365),
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Keep user text from breaking out of a table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Markdown listing of the current batch, newest postings first
pub fn render_markdown(jobs: &[JobRecord], today: NaiveDate, generated_at: DateTime<Utc>) -> String {
    let mut companies: BTreeMap<&str, usize> = BTreeMap::new();
    for job in jobs {
        *companies.entry(job.company.as_str()).or_insert(0) += 1;
    }
    let remote = jobs
        .iter()
        .filter(|job| job.location.to_lowercase().contains("remote"))
        .count();
    let new_this_week = jobs
        .iter()
        .filter_map(|job| job.posted_date)
        .filter(|posted| (today - *posted).num_days() <= 7)
        .count();

    let mut md = String::new();
    let _ = writeln!(md, "# UI/UX Design Internships\n");
    let _ = writeln!(md, "> Curated list of UI/UX design internships, updated daily.\n");
    let _ = writeln!(md, "**Last Updated:** {}\n", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(md, "## Quick Stats\n");
    let _ = writeln!(md, "| Metric | Count |");
    let _ = writeln!(md, "|--------|-------|");
    let _ = writeln!(md, "| Total Internships | {} |", jobs.len());
    let _ = writeln!(md, "| New This Week | {} |", new_this_week);
    let _ = writeln!(md, "| Companies Hiring | {} |", companies.len());
    let _ = writeln!(md, "| Remote Opportunities | {} |", remote);
    let _ = writeln!(md, "\n---\n\n## All Internships\n");
    let _ = writeln!(md, "| Company | Role | Location | Salary | Posted | Source | Apply |");
    let _ = writeln!(md, "|---------|------|----------|--------|--------|--------|-------|");

    let mut newest_first: Vec<&JobRecord> = jobs.iter().collect();
    newest_first.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));

    for job in newest_first {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | [Apply]({}) |",
            cell(&job.company),
            cell(&shorten(&job.title, MAX_TITLE_CHARS)),
            cell(&shorten(&job.location, MAX_LOCATION_CHARS)),
            cell(job.salary.as_deref().unwrap_or("-")),
            relative_posted_label(job.posted_date, today),
            job.source,
            job.url
        );
    }

    let _ = writeln!(md, "\n---\n\n## Companies Currently Hiring\n");
    for (company, count) in &companies {
        let noun = if *count == 1 { "position" } else { "positions" };
        let _ = writeln!(md, "- **{}** ({} {})", company, count, noun);
    }

    md
}

pub async fn write_markdown(path: &Path, jobs: &[JobRecord], today: NaiveDate) -> Result<()> {
    let markdown = render_markdown(jobs, today, Utc::now());
    tokio::fs::write(path, markdown).await?;
    info!("Wrote {} jobs to {}", jobs.len(), path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct JobCache<'a> {
    last_updated: DateTime<Utc>,
    total_jobs: usize,
    jobs: &'a [JobRecord],
}

/// Snapshot of the batch for static site consumers
pub async fn write_json_cache(path: &Path, jobs: &[JobRecord], generated_at: DateTime<Utc>) -> Result<()> {
    let cache = JobCache {
        last_updated: generated_at,
        total_jobs: jobs.len(),
        jobs,
    };
    let body = serde_json::to_string_pretty(&cache)?;
    tokio::fs::write(path, body).await?;
    info!("Cached {} jobs to {}", jobs.len(), path.display());
    Ok(())
}
