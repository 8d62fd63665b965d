//! CSV export of retained listings.

use crate::aggregator::JobListing;
use crate::error::ScrapeResult;
use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const HEADER: [&str; 9] = [
    "title",
    "company",
    "summary",
    "salary_text",
    "salary_value",
    "rating",
    "source",
    "url",
    "created_at",
];

/// `job_results_YYYY-MM-DD.csv`
pub fn file_name(date: NaiveDate) -> String {
    format!("job_results_{}.csv", date.format("%Y-%m-%d"))
}

fn record(listing: &JobListing) -> [String; 9] {
    [
        listing.title.clone(),
        listing.company.clone(),
        listing.summary.clone(),
        listing.salary_text.clone(),
        listing
            .salary_value
            .map(|v| format!("{v:.2}"))
            .unwrap_or_default(),
        listing
            .rating
            .tier()
            .map(|t| t.number().to_string())
            .unwrap_or_default(),
        listing.source.name().to_string(),
        listing.url.clone(),
        listing.created_at.to_rfc3339(),
    ]
}

/// Write a header row followed by one row per listing.
pub fn write_csv<W: Write>(out: W, listings: &[JobListing]) -> ScrapeResult<()> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(HEADER)?;
    for listing in listings {
        writer.write_record(record(listing))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `listings` to the dated results file inside `dir`, creating the
/// directory if needed. Returns the path written.
pub fn export_listings(
    dir: &Path,
    listings: &[JobListing],
    date: NaiveDate,
) -> ScrapeResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name(date));
    let file = std::fs::File::create(&path)?;
    write_csv(file, listings)?;
    info!("saved {} jobs to {}", listings.len(), path.display());
    Ok(path)
}
