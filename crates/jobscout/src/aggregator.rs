//! Result accumulation across sources.
//!
//! The aggregator is the only state shared between concurrently running
//! sources. Listings are appended under a mutex and never modified afterwards.

use crate::rating::{Rating, Tier};
use crate::sources::SourceKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Salary text stored when a detail page shows no pay.
pub const SALARY_NOT_SPECIFIED: &str = "Not specified";

/// Label of the bucket holding listings kept without a salary.
pub const UNRATED_LABEL: &str = "Unrated";

/// One scraped listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub summary: String,
    pub salary_text: String,
    pub salary_value: Option<f64>,
    pub rating: Rating,
    pub source: SourceKind,
    /// Canonical detail URL.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl JobListing {
    /// Whether the listing survives the export filter.
    pub fn is_exported(&self, include_no_salary: bool) -> bool {
        !self.rating.is_excluded() && (self.salary_value.is_some() || include_no_salary)
    }
}

/// Listing counts per rating bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unrated: usize,
}

impl TierSummary {
    pub fn count(&self, tier: Tier) -> usize {
        match tier {
            Tier::High => self.high,
            Tier::Medium => self.medium,
            Tier::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low + self.unrated
    }

    /// `(label, count)` rows in tier order, unrated last.
    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        let mut rows: Vec<_> = Tier::ALL.iter().map(|t| (t.label(), self.count(*t))).collect();
        rows.push((UNRATED_LABEL, self.unrated));
        rows
    }
}

/// Append-only store of listings for one run.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    listings: Mutex<Vec<JobListing>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JobListing>> {
        self.listings.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, listing: JobListing) {
        self.lock().push(listing);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every listing stored so far, excluded ones included.
    pub fn snapshot(&self) -> Vec<JobListing> {
        self.lock().clone()
    }

    /// Listings that pass the export filter, in insertion order.
    pub fn export(&self, include_no_salary: bool) -> Vec<JobListing> {
        self.lock()
            .iter()
            .filter(|l| l.is_exported(include_no_salary))
            .cloned()
            .collect()
    }

    /// Bucket counts over the exported listings.
    pub fn summary(&self, include_no_salary: bool) -> TierSummary {
        let mut summary = TierSummary::default();
        for listing in self.export(include_no_salary) {
            match listing.rating {
                Rating::Rated(Tier::High) => summary.high += 1,
                Rating::Rated(Tier::Medium) => summary.medium += 1,
                Rating::Rated(Tier::Low) => summary.low += 1,
                Rating::Unrated => summary.unrated += 1,
                Rating::Excluded => {}
            }
        }
        summary
    }
}
