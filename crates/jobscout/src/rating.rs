//! Tiered salary rating.
//!
//! A yearly salary is placed against the desired range using three cut
//! points derived from the [`RatingPolicy`]:
//!
//! ```text
//! top        = max - span * top_percent / 100
//! bottom     = min + span * bottom_percent / 100
//! buffer     = bottom * bottom_percent / 100
//! window     = (bottom - buffer, bottom + buffer]
//! ```
//!
//! The buffer re-applies `bottom_percent` to the bottom threshold itself, so
//! for large percentages the window can reach past `top`. The tier-1 check
//! runs first, so the top tier wins any overlap.

use crate::criteria::{ExperienceLevel, RatingPolicy, SalaryRange};
use serde::{Deserialize, Serialize};

/// One of the three rating buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    /// Numeric tier, 1 being best.
    pub fn number(&self) -> u8 {
        match self {
            Tier::High => 1,
            Tier::Medium => 2,
            Tier::Low => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::High => "High Match",
            Tier::Medium => "Medium Match",
            Tier::Low => "Low Match",
        }
    }
}

/// Outcome of rating one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Rated(Tier),
    /// No salary was found and the policy keeps such listings. Never given a tier.
    Unrated,
    /// Dropped from the export.
    Excluded,
}

impl Rating {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Rating::Rated(tier) => Some(*tier),
            _ => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, Rating::Excluded)
    }
}

/// Cut points for one (range, policy) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub top: f64,
    pub bottom: f64,
    pub buffer_low: f64,
    pub buffer_high: f64,
}

impl Thresholds {
    pub fn compute(range: SalaryRange, policy: &RatingPolicy) -> Self {
        let span = range.span();
        let top = range.max - span * (policy.top_percent / 100.0);
        let bottom = range.min + span * (policy.bottom_percent / 100.0);
        let buffer = bottom * (policy.bottom_percent / 100.0);
        Self {
            top,
            bottom,
            buffer_low: bottom - buffer,
            buffer_high: bottom + buffer,
        }
    }
}

/// Rates listings of one run. Built once from the run's criteria.
#[derive(Debug, Clone)]
pub struct RatingClassifier {
    policy: RatingPolicy,
    thresholds: Thresholds,
    experience_keywords: Vec<String>,
}

impl RatingClassifier {
    pub fn new(range: SalaryRange, policy: RatingPolicy, levels: &[ExperienceLevel]) -> Self {
        Self {
            policy,
            thresholds: Thresholds::compute(range, &policy),
            experience_keywords: levels.iter().map(|l| l.label().to_lowercase()).collect(),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Rate a listing from its yearly salary and description text.
    pub fn classify(&self, salary: Option<f64>, description: &str) -> Rating {
        let Some(salary) = salary else {
            return if self.policy.include_no_salary {
                Rating::Unrated
            } else {
                Rating::Excluded
            };
        };

        let t = &self.thresholds;
        if salary <= t.buffer_low {
            return Rating::Excluded;
        }
        let tier = if salary >= t.top {
            Tier::High
        } else if salary <= t.buffer_high {
            Tier::Low
        } else {
            Tier::Medium
        };

        if tier == Tier::High
            && self.policy.require_experience
            && !self.mentions_experience(description)
        {
            return Rating::Rated(Tier::Medium);
        }
        Rating::Rated(tier)
    }

    /// Whether the description names one of the requested experience levels.
    /// With no levels requested there is nothing to check against.
    fn mentions_experience(&self, description: &str) -> bool {
        if self.experience_keywords.is_empty() {
            return true;
        }
        let description = description.to_lowercase();
        self.experience_keywords
            .iter()
            .any(|keyword| description.contains(keyword.as_str()))
    }
}
