//! Run configuration.
//!
//! One [`ScrapeConfig`] value describes a whole run. It is read from a JSON
//! settings file, patched with command-line overrides, and validated before
//! any browser is launched.

use crate::criteria::{RatingPolicy, SalaryRange, SearchCriteria};
use crate::error::{ScrapeError, ScrapeResult};
use crate::pagination::DEFAULT_MAX_PAGES;
use crate::rating::RatingClassifier;
use crate::renderer::LaunchOptions;
use crate::session::{Pacing, DEFAULT_MAX_RETRIES};
use crate::sources::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub criteria: SearchCriteria,
    #[serde(default)]
    pub policy: RatingPolicy,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceKind>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Attempts per page load.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub browser: LaunchOptions,
    /// Hand one browser from source to source instead of launching one each.
    #[serde(default)]
    pub share_browser: bool,
    /// Run sources concurrently, each with its own browser.
    #[serde(default)]
    pub parallel_sources: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_sources() -> Vec<SourceKind> {
    vec![SourceKind::Indeed]
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ScrapeConfig {
    pub fn new(criteria: SearchCriteria) -> Self {
        Self {
            criteria,
            policy: RatingPolicy::default(),
            sources: default_sources(),
            max_pages: default_max_pages(),
            max_retries: default_max_retries(),
            page_load_timeout_secs: default_page_load_timeout(),
            pacing: Pacing::default(),
            browser: LaunchOptions::default(),
            share_browser: false,
            parallel_sources: false,
            output_dir: default_output_dir(),
        }
    }

    /// Read a JSON settings file. The result is not validated, so overrides
    /// can still be applied.
    pub fn load(path: &Path) -> ScrapeResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn validate(&self) -> ScrapeResult<()> {
        self.criteria.validate()?;
        self.policy.validate()?;
        if self.sources.is_empty() {
            return Err(ScrapeError::Config("at least one source is required".into()));
        }
        if self.max_pages == 0 {
            return Err(ScrapeError::Config("max_pages must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(ScrapeError::Config("max_retries must be at least 1".into()));
        }
        if self.share_browser && self.parallel_sources {
            return Err(ScrapeError::Config(
                "share_browser cannot be combined with parallel_sources".into(),
            ));
        }
        Ok(())
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn classifier(&self) -> RatingClassifier {
        RatingClassifier::new(
            self.criteria.salary_range,
            self.policy,
            &self.criteria.experience_levels,
        )
    }
}

/// Command-line values that replace settings-file fields.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub keywords: Option<Vec<String>>,
    pub job_title: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub remote: bool,
    pub location: Option<String>,
    pub distance: Option<u32>,
    pub sources: Option<Vec<SourceKind>>,
    pub max_pages: Option<u32>,
    pub include_no_salary: bool,
    pub headful: bool,
    pub output_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Build a config from overrides alone. Salary bounds are required.
    pub fn into_config(self) -> ScrapeResult<ScrapeConfig> {
        let (Some(min), Some(max)) = (self.salary_min, self.salary_max) else {
            return Err(ScrapeError::Config(
                "--salary-min and --salary-max are required without --config".into(),
            ));
        };
        let mut config = ScrapeConfig::new(SearchCriteria::new(SalaryRange::new(min, max)));
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(self, config: &mut ScrapeConfig) {
        let criteria = &mut config.criteria;
        if let Some(keywords) = self.keywords {
            criteria.keywords = keywords;
        }
        if let Some(title) = self.job_title {
            criteria.job_title = Some(title);
        }
        if let Some(min) = self.salary_min {
            criteria.salary_range.min = min;
        }
        if let Some(max) = self.salary_max {
            criteria.salary_range.max = max;
        }
        if self.remote {
            criteria.remote_only = true;
            criteria.location = None;
            criteria.distance = None;
        }
        if let Some(location) = self.location {
            criteria.remote_only = false;
            criteria.location = Some(location);
        }
        if let Some(distance) = self.distance {
            criteria.distance = Some(distance);
        }

        if let Some(sources) = self.sources {
            config.sources = sources;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if self.include_no_salary {
            config.policy.include_no_salary = true;
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
    }
}
