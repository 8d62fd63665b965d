//! Pagination controller: drives one source through its results pages.
//!
//! Each page is loaded, its cards enumerated, and every card not seen before
//! in this run is visited once. The run stops at the first of: a page with no
//! cards, a page with no new cards, a missing results container, or the page
//! cap. Only a failure to launch the browser ends the run with an error.

use crate::aggregator::{JobListing, ResultAggregator, SALARY_NOT_SPECIFIED};
use crate::criteria::SearchCriteria;
use crate::error::{ScrapeError, ScrapeResult};
use crate::rating::RatingClassifier;
use crate::salary;
use crate::session::ScrapeSession;
use crate::sources::detail::summarize;
use crate::sources::{CardRef, SourceAdapter, SourceKind};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Default number of results pages visited per source.
pub const DEFAULT_MAX_PAGES: u32 = 3;

/// Why a source run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A results page had no cards at all.
    NoCards,
    /// Every card on a results page had already been processed.
    NoNewCards,
    /// The results list was missing from a page.
    ContainerNotFound,
    PageCap,
}

/// Counters for one source run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub pages_loaded: u32,
    /// Pages whose load failed after every retry and were skipped.
    pub pages_skipped: u32,
    pub cards_seen: usize,
    pub duplicates_skipped: usize,
    pub listings_stored: usize,
    pub card_failures: usize,
    pub stop_reason: StopReason,
}

impl SourceReport {
    fn new(source: SourceKind) -> Self {
        Self {
            source,
            pages_loaded: 0,
            pages_skipped: 0,
            cards_seen: 0,
            duplicates_skipped: 0,
            listings_stored: 0,
            card_failures: 0,
            stop_reason: StopReason::PageCap,
        }
    }
}

/// Everything one source run reads from, borrowed for the run's length.
pub struct PaginationController<'a> {
    adapter: &'a dyn SourceAdapter,
    session: &'a ScrapeSession,
    criteria: &'a SearchCriteria,
    classifier: &'a RatingClassifier,
    aggregator: &'a ResultAggregator,
    max_pages: u32,
    max_retries: u32,
}

impl<'a> PaginationController<'a> {
    pub fn new(
        adapter: &'a dyn SourceAdapter,
        session: &'a ScrapeSession,
        criteria: &'a SearchCriteria,
        classifier: &'a RatingClassifier,
        aggregator: &'a ResultAggregator,
    ) -> Self {
        Self {
            adapter,
            session,
            criteria,
            classifier,
            aggregator,
            max_pages: DEFAULT_MAX_PAGES,
            max_retries: crate::session::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Scrape every page of the source.
    pub async fn run(&self) -> ScrapeResult<SourceReport> {
        let source = self.adapter.source();
        let mut report = SourceReport::new(source);
        let mut processed: HashSet<String> = HashSet::new();

        info!("searching {source} (up to {} pages)", self.max_pages);

        for page in 0..self.max_pages {
            let url = self.adapter.build_url(self.criteria, page)?;
            debug!("{source} page {}: {url}", page + 1);

            let Some(html) = self.load_page(&url).await? else {
                warn!("skipping {source} page {}: could not be loaded", page + 1);
                report.pages_skipped += 1;
                continue;
            };
            report.pages_loaded += 1;

            let cards = match self.adapter.enumerate_cards(&html, page) {
                Ok(cards) => cards,
                Err(ScrapeError::ContainerNotFound { .. }) => {
                    warn!("no results list on {source} page {}", page + 1);
                    report.stop_reason = StopReason::ContainerNotFound;
                    break;
                }
                Err(e) => return Err(e),
            };
            if cards.is_empty() {
                info!("no job cards on {source} page {}", page + 1);
                report.stop_reason = StopReason::NoCards;
                break;
            }
            info!("found {} job cards on {source} page {}", cards.len(), page + 1);
            report.cards_seen += cards.len();

            let mut new_cards = 0;
            for card in &cards {
                let Some(identity) = self.adapter.card_identity(card) else {
                    debug!("card without a detail link, skipping");
                    continue;
                };
                if !processed.insert(identity.clone()) {
                    debug!("skipping duplicate {identity}");
                    report.duplicates_skipped += 1;
                    continue;
                }
                new_cards += 1;

                match self.process_card(card, identity).await {
                    Ok(()) => report.listings_stored += 1,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("error processing job: {e}");
                        report.card_failures += 1;
                    }
                }
            }

            if new_cards == 0 {
                info!("no new jobs on {source} page {}", page + 1);
                report.stop_reason = StopReason::NoNewCards;
                break;
            }
        }

        info!(
            "processed {} jobs from {source} ({} pages, {} duplicates, {} failures)",
            report.listings_stored,
            report.pages_loaded,
            report.duplicates_skipped,
            report.card_failures
        );
        Ok(report)
    }

    /// HTML of a results page, or `None` when it could not be loaded.
    async fn load_page(&self, url: &str) -> ScrapeResult<Option<String>> {
        if !self.session.navigate(url, self.max_retries).await? {
            return Ok(None);
        }
        match self.session.page_source().await {
            Ok(html) => Ok(Some(html)),
            Err(e) => {
                warn!("could not read {url}: {e}");
                Ok(None)
            }
        }
    }

    async fn process_card(&self, card: &CardRef, url: String) -> ScrapeResult<()> {
        let (title, company) = self.adapter.card_summary(card);
        info!("processing: {title} at {company}");

        let html = self
            .adapter
            .fetch_detail(self.session, card, self.max_retries)
            .await?;
        let detail = self.adapter.extract_detail(&html)?;

        let estimate = detail.salary_text.as_deref().and_then(salary::parse_salary);
        if let Some(text) = &detail.salary_text {
            debug!("found salary: {text}");
        }
        if let Some(estimate) = &estimate {
            debug!("{:?} pay, {} per year", estimate.period, estimate.yearly);
        }
        let salary_value = estimate.map(|e| e.yearly);
        let rating = self.classifier.classify(salary_value, &detail.description);

        self.aggregator.push(JobListing {
            title,
            company,
            summary: summarize(&detail.description),
            salary_text: detail
                .salary_text
                .unwrap_or_else(|| SALARY_NOT_SPECIFIED.to_string()),
            salary_value,
            rating,
            source: self.adapter.source(),
            url,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{RatingPolicy, SalaryRange};
    use crate::process::UnavailableInspector;
    use crate::rating::{Rating, Tier};
    use crate::renderer::memory::MemoryRenderer;
    use crate::renderer::LaunchOptions;
    use crate::session::{Ownership, Pacing};
    use crate::sources::indeed::IndeedAdapter;
    use crate::sources::linkedin::LinkedInAdapter;
    use std::sync::Arc;

    fn criteria() -> SearchCriteria {
        let mut c = SearchCriteria::new(SalaryRange::new(90000.0, 120000.0));
        c.keywords = vec!["analyst".into()];
        c.remote_only = true;
        c
    }

    fn classifier(c: &SearchCriteria) -> RatingClassifier {
        RatingClassifier::new(c.salary_range, RatingPolicy::default(), &c.experience_levels)
    }

    fn session(renderer: &MemoryRenderer) -> ScrapeSession {
        ScrapeSession::new(
            Arc::new(renderer.clone()),
            Arc::new(UnavailableInspector),
            LaunchOptions::default(),
        )
        .with_pacing(Pacing::none())
    }

    fn results_page(jobs: &[&str]) -> String {
        let cards: String = jobs
            .iter()
            .map(|jk| {
                format!(
                    r#"<div class="job_seen_beacon"><a class="jcs-JobTitle" href="/viewjob?jk={jk}">Job {jk}</a>
                       <span data-testid="company-name">Co {jk}</span></div>"#
                )
            })
            .collect();
        format!("<html><body>{cards}</body></html>")
    }

    fn detail_page(pay: Option<&str>) -> String {
        let pay = pay
            .map(|p| format!("<h3>Pay</h3><div>{p}</div>"))
            .unwrap_or_default();
        format!(r#"<html><body>{pay}<div id="jobDescriptionText">Build reports.</div></body></html>"#)
    }

    fn detail_url(jk: &str) -> String {
        format!("https://www.indeed.com/viewjob?jk={jk}")
    }

    #[tokio::test]
    async fn test_zero_cards_on_first_page_stops() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        let first = IndeedAdapter.build_url(&c, 0).unwrap();
        renderer.page(first.clone(), results_page(&[]));

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let report = PaginationController::new(&IndeedAdapter, &s, &c, &cls, &agg)
            .run()
            .await
            .unwrap();
        s.release(Ownership::Owned).await;

        assert_eq!(report.stop_reason, StopReason::NoCards);
        assert_eq!(report.listings_stored, 0);
        assert!(agg.is_empty());
        assert_eq!(renderer.log().navigations, vec![first]);
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_visited_once() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        renderer
            .page(IndeedAdapter.build_url(&c, 0).unwrap(), results_page(&["a", "b"]))
            .page(IndeedAdapter.build_url(&c, 1).unwrap(), results_page(&["b", "c"]))
            .page(IndeedAdapter.build_url(&c, 2).unwrap(), results_page(&["a", "c"]));
        for jk in ["a", "b", "c"] {
            renderer.page(detail_url(jk), detail_page(Some("$130,000 a year")));
        }

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let report = PaginationController::new(&IndeedAdapter, &s, &c, &cls, &agg)
            .run()
            .await
            .unwrap();
        s.release(Ownership::Owned).await;

        assert_eq!(report.listings_stored, 3);
        assert_eq!(report.duplicates_skipped, 3);
        assert_eq!(report.stop_reason, StopReason::NoNewCards);
        let mut urls: Vec<String> = agg.snapshot().into_iter().map(|l| l.url).collect();
        urls.sort();
        assert_eq!(urls, vec![detail_url("a"), detail_url("b"), detail_url("c")]);
        let visits = renderer
            .log()
            .navigations
            .iter()
            .filter(|u| u.contains("viewjob"))
            .count();
        assert_eq!(visits, 3);
    }

    #[tokio::test]
    async fn test_failed_detail_is_not_retried_on_later_pages() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        renderer
            .page(IndeedAdapter.build_url(&c, 0).unwrap(), results_page(&["a", "bad"]))
            .page(IndeedAdapter.build_url(&c, 1).unwrap(), results_page(&["bad", "b"]))
            .page(IndeedAdapter.build_url(&c, 2).unwrap(), results_page(&[]))
            .page(detail_url("a"), detail_page(None))
            .page(detail_url("b"), detail_page(Some("$45/hour")));

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let report = PaginationController::new(&IndeedAdapter, &s, &c, &cls, &agg)
            .with_max_retries(2)
            .run()
            .await
            .unwrap();
        s.release(Ownership::Owned).await;

        assert_eq!(report.card_failures, 1);
        assert_eq!(report.listings_stored, 2);
        assert_eq!(report.stop_reason, StopReason::NoCards);
        let bad_visits = renderer
            .log()
            .navigations
            .iter()
            .filter(|u| **u == detail_url("bad"))
            .count();
        assert_eq!(bad_visits, 2);

        let listings = agg.snapshot();
        assert_eq!(listings[0].salary_text, SALARY_NOT_SPECIFIED);
        assert_eq!(listings[0].rating, Rating::Excluded);
        assert_eq!(listings[0].company, "Co a");
        assert_eq!(listings[1].salary_value, Some(93600.0));
        assert_eq!(listings[1].rating, Rating::Rated(Tier::Low));
    }

    #[tokio::test]
    async fn test_unloadable_page_is_skipped() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        renderer
            .page(IndeedAdapter.build_url(&c, 1).unwrap(), results_page(&["a"]))
            .page(detail_url("a"), detail_page(Some("$100,000 a year")));

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let report = PaginationController::new(&IndeedAdapter, &s, &c, &cls, &agg)
            .with_max_pages(2)
            .with_max_retries(1)
            .run()
            .await
            .unwrap();
        s.release(Ownership::Owned).await;

        assert_eq!(report.pages_skipped, 1);
        assert_eq!(report.pages_loaded, 1);
        assert_eq!(report.listings_stored, 1);
        assert_eq!(report.stop_reason, StopReason::PageCap);
    }

    #[tokio::test]
    async fn test_missing_container_ends_source() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        renderer.page(
            LinkedInAdapter.build_url(&c, 0).unwrap(),
            "<html><body><p>Sign in to continue</p></body></html>",
        );

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let report = PaginationController::new(&LinkedInAdapter, &s, &c, &cls, &agg)
            .run()
            .await
            .unwrap();
        s.release(Ownership::Owned).await;

        assert_eq!(report.stop_reason, StopReason::ContainerNotFound);
        assert_eq!(renderer.log().navigations.len(), 1);
    }

    #[tokio::test]
    async fn test_detail_without_description_is_dropped() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        let cards: String = ["11", "12", "13"]
            .iter()
            .map(|id| {
                format!(
                    r#"<li><div class="job-card-container" data-job-id="{id}">
                         <a class="job-card-list__title" href="/jobs/view/{id}/">Role {id}</a>
                         <div class="artdeco-entity-lockup__caption">Co {id}</div>
                       </div></li>"#
                )
            })
            .collect();
        renderer
            .page(
                LinkedInAdapter.build_url(&c, 0).unwrap(),
                format!(r#"<html><body><ul class="jobs-search__results-list">{cards}</ul></body></html>"#),
            )
            .page(
                "https://www.linkedin.com/jobs/view/11/",
                r#"<html><body><div class="jobs-description__content">Model data.</div>
                   <span class="salary-range">$100K/yr - $110K/yr</span></body></html>"#,
            )
            .page(
                "https://www.linkedin.com/jobs/view/12/",
                "<html><body><p>This job is no longer accepting applications</p></body></html>",
            )
            .page(
                "https://www.linkedin.com/jobs/view/13/",
                r#"<html><body><div class="jobs-description__content">Ship pipelines.</div></body></html>"#,
            );

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let report = PaginationController::new(&LinkedInAdapter, &s, &c, &cls, &agg)
            .with_max_pages(1)
            .run()
            .await
            .unwrap();
        s.release(Ownership::Owned).await;

        assert_eq!(report.cards_seen, 3);
        assert_eq!(report.card_failures, 1);
        assert_eq!(report.listings_stored, 2);
        assert_eq!(report.stop_reason, StopReason::PageCap);

        let listings = agg.snapshot();
        let urls: Vec<&str> = listings.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.linkedin.com/jobs/view/11/",
                "https://www.linkedin.com/jobs/view/13/",
            ]
        );
        assert_eq!(listings[0].salary_value, Some(105_000.0));
        assert_eq!(listings[1].company, "Co 13");
    }

    #[tokio::test]
    async fn test_launch_failure_propagates() {
        let c = criteria();
        let renderer = MemoryRenderer::new();
        renderer.fail_launch();

        let s = session(&renderer);
        let agg = ResultAggregator::new();
        let cls = classifier(&c);
        let err = PaginationController::new(&IndeedAdapter, &s, &c, &cls, &agg)
            .run()
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
