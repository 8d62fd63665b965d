//! Search criteria and rating policy for one scrape run.
//!
//! Both values are built once at run start and never change while a run is in
//! flight; every component borrows them immutably.

use crate::error::{ScrapeError, ScrapeResult};
use serde::{Deserialize, Serialize};

/// Desired yearly salary range, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

impl SalaryRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Seniority filter, shared by URL construction and the experience check in
/// the rating classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    #[serde(alias = "Entry Level", alias = "Entry level", alias = "entry_level")]
    Entry,
    #[serde(alias = "Mid Level", alias = "Mid level", alias = "mid_level")]
    Mid,
    #[serde(alias = "Senior Level", alias = "Senior level", alias = "senior_level")]
    Senior,
}

impl ExperienceLevel {
    /// Human label; also the keyword searched for in listing descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "Entry Level",
            ExperienceLevel::Mid => "Mid Level",
            ExperienceLevel::Senior => "Senior Level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    #[serde(alias = "Bachelor's Degree", alias = "Bachelor's")]
    Bachelors,
    #[serde(alias = "Master's Degree", alias = "Master's")]
    Masters,
    #[serde(alias = "Doctorate Degree", alias = "Doctorate")]
    Doctorate,
}

/// Where the listing must be located.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationFilter<'a> {
    /// Remote jobs only.
    Remote,
    /// On-site jobs near a location, optionally within a distance in miles.
    Near {
        location: &'a str,
        distance: Option<u32>,
    },
    /// No location constraint.
    Anywhere,
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    pub salary_range: SalaryRange,
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default)]
    pub location: Option<String>,
    /// Maximum distance from `location`, in miles.
    #[serde(default)]
    pub distance: Option<u32>,
    #[serde(default)]
    pub experience_levels: Vec<ExperienceLevel>,
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
}

impl SearchCriteria {
    pub fn new(salary_range: SalaryRange) -> Self {
        Self {
            keywords: Vec::new(),
            job_title: None,
            salary_range,
            remote_only: false,
            location: None,
            distance: None,
            experience_levels: Vec::new(),
            education_level: None,
        }
    }

    pub fn location_filter(&self) -> LocationFilter<'_> {
        if self.remote_only {
            return LocationFilter::Remote;
        }
        match self.location.as_deref().map(str::trim) {
            Some(location) if !location.is_empty() => LocationFilter::Near {
                location,
                distance: self.distance,
            },
            _ => LocationFilter::Anywhere,
        }
    }

    /// Keywords joined into a single query string.
    pub fn keyword_query(&self) -> String {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn validate(&self) -> ScrapeResult<()> {
        let range = self.salary_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min < 0.0 {
            return Err(ScrapeError::Config(format!(
                "salary range must be non-negative numbers, got {}..{}",
                range.min, range.max
            )));
        }
        if range.min > range.max {
            return Err(ScrapeError::Config(format!(
                "salary min {} exceeds max {}",
                range.min, range.max
            )));
        }
        let has_location = self
            .location
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
        if self.remote_only && has_location {
            return Err(ScrapeError::Config(
                "remote_only and location are mutually exclusive".into(),
            ));
        }
        if self.distance.is_some() && !has_location {
            return Err(ScrapeError::Config(
                "distance requires a location".into(),
            ));
        }
        if self.job_title.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.keyword_query().is_empty()
        {
            return Err(ScrapeError::Config(
                "either a job title or at least one keyword is required".into(),
            ));
        }
        Ok(())
    }
}

/// Thresholds the rating classifier applies to a normalized salary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingPolicy {
    #[serde(default = "default_percent")]
    pub top_percent: f64,
    #[serde(default = "default_percent")]
    pub bottom_percent: f64,
    #[serde(default)]
    pub include_no_salary: bool,
    #[serde(default)]
    pub require_experience: bool,
}

fn default_percent() -> f64 {
    10.0
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            top_percent: default_percent(),
            bottom_percent: default_percent(),
            include_no_salary: false,
            require_experience: false,
        }
    }
}

impl RatingPolicy {
    pub fn validate(&self) -> ScrapeResult<()> {
        for (name, value) in [
            ("top_percent", self.top_percent),
            ("bottom_percent", self.bottom_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ScrapeError::Config(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        let mut c = SearchCriteria::new(SalaryRange::new(90_000.0, 120_000.0));
        c.keywords = vec!["tableau".into(), " sql ".into(), "".into()];
        c
    }

    #[test]
    fn test_keyword_query_skips_blanks() {
        assert_eq!(criteria().keyword_query(), "tableau sql");
    }

    #[test]
    fn test_location_filter() {
        let mut c = criteria();
        assert_eq!(c.location_filter(), LocationFilter::Anywhere);

        c.location = Some("Denver, CO".into());
        c.distance = Some(25);
        assert_eq!(
            c.location_filter(),
            LocationFilter::Near {
                location: "Denver, CO",
                distance: Some(25)
            }
        );

        c.location = None;
        c.distance = None;
        c.remote_only = true;
        assert_eq!(c.location_filter(), LocationFilter::Remote);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut c = criteria();
        c.salary_range = SalaryRange::new(120_000.0, 90_000.0);
        assert!(matches!(c.validate(), Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_validate_remote_xor_location() {
        let mut c = criteria();
        c.remote_only = true;
        c.location = Some("Austin".into());
        assert!(c.validate().is_err());

        c.location = None;
        assert!(c.validate().is_ok());

        c.remote_only = false;
        c.distance = Some(10);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_requires_query() {
        let mut c = criteria();
        c.keywords.clear();
        assert!(c.validate().is_err());
        c.job_title = Some("Data Analyst".into());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_policy_percent_bounds() {
        let mut policy = RatingPolicy::default();
        assert!(policy.validate().is_ok());
        policy.bottom_percent = 101.0;
        assert!(policy.validate().is_err());
        policy.bottom_percent = -1.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_experience_level_aliases() {
        let levels: Vec<ExperienceLevel> =
            serde_json::from_str(r#"["Entry Level", "mid", "Senior level"]"#).unwrap();
        assert_eq!(
            levels,
            vec![
                ExperienceLevel::Entry,
                ExperienceLevel::Mid,
                ExperienceLevel::Senior
            ]
        );
        let edu: EducationLevel = serde_json::from_str(r#""Master's Degree""#).unwrap();
        assert_eq!(edu, EducationLevel::Masters);
    }
}
