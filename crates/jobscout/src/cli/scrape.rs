//! `jobscout scrape` runs a full scrape and exports the rated listings.

use anyhow::{bail, Context, Result};
use clap::Args;
use jobscout::aggregator::TierSummary;
use jobscout::config::{ConfigOverrides, ScrapeConfig};
use jobscout::pipeline::{Pipeline, RunReport, SourceOutcome};
use jobscout::process::SystemProcessInspector;
use jobscout::renderer::chromium::ChromiumRenderer;
use jobscout::sources::SourceKind;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// JSON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Search keywords (repeat or comma-separate)
    #[arg(long = "keyword", short, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Job title to search for
    #[arg(long)]
    title: Option<String>,

    /// Lower bound of the desired yearly salary
    #[arg(long)]
    salary_min: Option<f64>,

    /// Upper bound of the desired yearly salary
    #[arg(long)]
    salary_max: Option<f64>,

    /// Remote jobs only
    #[arg(long, conflicts_with = "location")]
    remote: bool,

    /// Search near this location
    #[arg(long)]
    location: Option<String>,

    /// Maximum distance from the location, in miles
    #[arg(long, requires = "location")]
    distance: Option<u32>,

    /// Sources to scrape (indeed, linkedin)
    #[arg(long = "source", short, value_delimiter = ',')]
    sources: Vec<SourceKind>,

    /// Results pages per source
    #[arg(long)]
    max_pages: Option<u32>,

    /// Keep listings without a salary as unrated
    #[arg(long)]
    include_no_salary: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Directory for the results file
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl ScrapeArgs {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            keywords: (!self.keywords.is_empty()).then_some(self.keywords),
            job_title: self.title,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            remote: self.remote,
            location: self.location,
            distance: self.distance,
            sources: (!self.sources.is_empty()).then_some(self.sources),
            max_pages: self.max_pages,
            include_no_salary: self.include_no_salary,
            headful: self.headful,
            output_dir: self.output,
        }
    }

    fn into_config(mut self) -> Result<ScrapeConfig> {
        match self.config.take() {
            Some(path) => {
                let mut config = ScrapeConfig::load(&path)
                    .with_context(|| format!("failed to read settings from {}", path.display()))?;
                self.overrides().apply(&mut config);
                Ok(config)
            }
            None => Ok(self.overrides().into_config()?),
        }
    }
}

/// Run the scrape command.
pub async fn run(args: ScrapeArgs, json: bool) -> Result<()> {
    let config = args.into_config()?;
    let pipeline = Pipeline::new(
        config,
        Arc::new(ChromiumRenderer::new()),
        Arc::new(SystemProcessInspector),
    )?;

    let report = pipeline.run().await;
    if report.all_failed() {
        print_report(&report, None, json)?;
        bail!("every source failed");
    }

    let path = pipeline.export().context("failed to save results")?;
    let summary = pipeline
        .aggregator()
        .summary(pipeline.config().policy.include_no_salary);
    print_report(&report, Some((&summary, &path)), json)
}

fn print_report(
    report: &RunReport,
    saved: Option<(&TierSummary, &PathBuf)>,
    json: bool,
) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "report": report,
            "summary": saved.map(|(s, _)| s),
            "file": saved.map(|(_, p)| p),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Run {}", report.run_id);
    for outcome in &report.sources {
        match outcome {
            SourceOutcome::Completed(r) => println!(
                "  {:<9} {} jobs ({} pages, {} duplicates, {} failures, stopped: {:?})",
                r.source.name(),
                r.listings_stored,
                r.pages_loaded,
                r.duplicates_skipped,
                r.card_failures,
                r.stop_reason
            ),
            SourceOutcome::Failed { source, error } => {
                println!("  {:<9} failed: {error}", source.name())
            }
        }
    }

    if let Some((summary, path)) = saved {
        println!();
        println!("Job Rating Summary:");
        for (label, count) in summary.rows() {
            println!("  {label}: {count} jobs");
        }
        println!();
        println!("Saved {} jobs to {}", summary.total(), path.display());
    }
    Ok(())
}
