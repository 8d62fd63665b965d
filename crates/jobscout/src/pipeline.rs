//! Multi-source run orchestration.
//!
//! Sources run one after another by default, each with its own browser. With
//! `share_browser` a single browser is handed from source to source; with
//! `parallel_sources` every source runs on its own task with its own browser.
//! A source whose browser cannot be launched is recorded as failed and the
//! run carries on with the next one.

use crate::aggregator::ResultAggregator;
use crate::config::ScrapeConfig;
use crate::error::ScrapeResult;
use crate::export;
use crate::pagination::{PaginationController, SourceReport};
use crate::process::ProcessInspector;
use crate::rating::RatingClassifier;
use crate::renderer::{BrowserHandle, Renderer};
use crate::session::{Ownership, ScrapeSession};
use crate::sources::SourceKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// How one source's run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Completed(SourceReport),
    Failed { source: SourceKind, error: String },
}

impl SourceOutcome {
    pub fn source(&self) -> SourceKind {
        match self {
            SourceOutcome::Completed(report) => report.source,
            SourceOutcome::Failed { source, .. } => *source,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }

    fn from_result(source: SourceKind, result: ScrapeResult<SourceReport>) -> Self {
        match result {
            Ok(report) => SourceOutcome::Completed(report),
            Err(e) => {
                error!("{source} scrape failed: {e}");
                SourceOutcome::Failed {
                    source,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceOutcome>,
}

impl RunReport {
    /// True when no source completed.
    pub fn all_failed(&self) -> bool {
        self.sources.iter().all(SourceOutcome::is_failed)
    }

    pub fn listings_stored(&self) -> usize {
        self.sources
            .iter()
            .map(|o| match o {
                SourceOutcome::Completed(r) => r.listings_stored,
                SourceOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Runs the configured sources into one shared [`ResultAggregator`].
pub struct Pipeline {
    config: Arc<ScrapeConfig>,
    renderer: Arc<dyn Renderer>,
    inspector: Arc<dyn ProcessInspector>,
    classifier: Arc<RatingClassifier>,
    aggregator: Arc<ResultAggregator>,
}

impl Pipeline {
    /// Validates `config` before anything is launched.
    pub fn new(
        config: ScrapeConfig,
        renderer: Arc<dyn Renderer>,
        inspector: Arc<dyn ProcessInspector>,
    ) -> ScrapeResult<Self> {
        config.validate()?;
        let classifier = Arc::new(config.classifier());
        Ok(Self {
            config: Arc::new(config),
            renderer,
            inspector,
            classifier,
            aggregator: Arc::new(ResultAggregator::new()),
        })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let names: Vec<&str> = self.config.sources.iter().map(SourceKind::name).collect();
        info!("run {run_id}: scraping {}", names.join(", "));

        let sources = if self.config.parallel_sources {
            self.run_parallel().await
        } else if self.config.share_browser {
            self.run_shared().await
        } else {
            self.run_sequential().await
        };

        let finished_at = Utc::now();
        info!(
            "run {run_id} finished in {}s, {} listings stored",
            (finished_at - started_at).num_seconds(),
            self.aggregator.len()
        );
        RunReport {
            run_id,
            started_at,
            finished_at,
            sources,
        }
    }

    /// Write the exported listings to the dated CSV file in the output
    /// directory.
    pub fn export(&self) -> ScrapeResult<PathBuf> {
        let listings = self.aggregator.export(self.config.policy.include_no_salary);
        export::export_listings(
            &self.config.output_dir,
            &listings,
            Utc::now().date_naive(),
        )
    }

    async fn run_sequential(&self) -> Vec<SourceOutcome> {
        let mut outcomes = Vec::with_capacity(self.config.sources.len());
        for &source in &self.config.sources {
            let session = new_session(&self.config, &self.renderer, &self.inspector);
            let result = scrape_source(
                source,
                &session,
                &self.config,
                &self.classifier,
                &self.aggregator,
            )
            .await;
            session.release(Ownership::Owned).await;
            outcomes.push(SourceOutcome::from_result(source, result));
        }
        outcomes
    }

    async fn run_shared(&self) -> Vec<SourceOutcome> {
        let count = self.config.sources.len();
        let mut outcomes = Vec::with_capacity(count);
        let mut carried: Option<Box<dyn BrowserHandle>> = None;

        for (i, &source) in self.config.sources.iter().enumerate() {
            let session = match carried.take() {
                Some(handle) => ScrapeSession::adopt(
                    Arc::clone(&self.renderer),
                    Arc::clone(&self.inspector),
                    self.config.browser.clone(),
                    handle,
                )
                .with_pacing(self.config.pacing)
                .with_page_load_timeout(self.config.page_load_timeout()),
                None => new_session(&self.config, &self.renderer, &self.inspector),
            };
            let result = scrape_source(
                source,
                &session,
                &self.config,
                &self.classifier,
                &self.aggregator,
            )
            .await;

            if i + 1 < count {
                carried = session.release(Ownership::Shared).await;
            } else {
                session.release(Ownership::Owned).await;
            }
            outcomes.push(SourceOutcome::from_result(source, result));
        }
        outcomes
    }

    async fn run_parallel(&self) -> Vec<SourceOutcome> {
        let tasks: Vec<_> = self
            .config
            .sources
            .iter()
            .map(|&source| {
                let config = Arc::clone(&self.config);
                let renderer = Arc::clone(&self.renderer);
                let inspector = Arc::clone(&self.inspector);
                let classifier = Arc::clone(&self.classifier);
                let aggregator = Arc::clone(&self.aggregator);
                tokio::spawn(async move {
                    let session = new_session(&config, &renderer, &inspector);
                    let result =
                        scrape_source(source, &session, &config, &classifier, &aggregator).await;
                    session.release(Ownership::Owned).await;
                    result
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        self.config
            .sources
            .iter()
            .zip(results)
            .map(|(&source, joined)| match joined {
                Ok(result) => SourceOutcome::from_result(source, result),
                Err(e) => {
                    error!("{source} task failed: {e}");
                    SourceOutcome::Failed {
                        source,
                        error: format!("task failed: {e}"),
                    }
                }
            })
            .collect()
    }
}

fn new_session(
    config: &ScrapeConfig,
    renderer: &Arc<dyn Renderer>,
    inspector: &Arc<dyn ProcessInspector>,
) -> ScrapeSession {
    ScrapeSession::new(
        Arc::clone(renderer),
        Arc::clone(inspector),
        config.browser.clone(),
    )
    .with_pacing(config.pacing)
    .with_page_load_timeout(config.page_load_timeout())
}

async fn scrape_source(
    source: SourceKind,
    session: &ScrapeSession,
    config: &ScrapeConfig,
    classifier: &RatingClassifier,
    aggregator: &ResultAggregator,
) -> ScrapeResult<SourceReport> {
    let adapter = source.adapter();
    PaginationController::new(
        adapter.as_ref(),
        session,
        &config.criteria,
        classifier,
        aggregator,
    )
    .with_max_pages(config.max_pages)
    .with_max_retries(config.max_retries)
    .run()
    .await
}
