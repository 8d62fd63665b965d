//! Listing sources.
//!
//! Everything that knows about a site's markup lives behind [`SourceAdapter`].
//! The pagination controller only ever sees owned [`CardRef`] and
//! [`DetailExtract`] values, so parsed documents never cross an await point.

pub mod detail;
pub mod indeed;
pub mod linkedin;

use crate::criteria::SearchCriteria;
use crate::error::{ScrapeError, ScrapeResult};
use crate::session::ScrapeSession;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Company name used when a card does not show one.
pub const COMPANY_NOT_FOUND: &str = "Company not found";

/// The listing sites this crate can scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(alias = "Indeed")]
    Indeed,
    #[serde(alias = "LinkedIn", alias = "Linkedin")]
    LinkedIn,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Indeed, SourceKind::LinkedIn];

    /// Display name, also written to the `source` column of exports.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Indeed => "Indeed",
            SourceKind::LinkedIn => "LinkedIn",
        }
    }

    pub fn adapter(&self) -> Box<dyn SourceAdapter> {
        match self {
            SourceKind::Indeed => Box::new(indeed::IndeedAdapter),
            SourceKind::LinkedIn => Box::new(linkedin::LinkedInAdapter),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indeed" => Ok(SourceKind::Indeed),
            "linkedin" => Ok(SourceKind::LinkedIn),
            other => Err(ScrapeError::Config(format!("unknown source: {other}"))),
        }
    }
}

/// One listing card on a results page, copied out of the parsed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardRef {
    /// Link target as written in the markup, possibly relative.
    pub href: Option<String>,
    /// Site-specific job id, when the card carries one.
    pub job_id: Option<String>,
    pub title: String,
    pub company: Option<String>,
}

/// Text pulled from a detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailExtract {
    /// Sanitized description, at most [`detail::DESCRIPTION_LIMIT`] chars.
    pub description: String,
    /// Verbatim compensation text, when the page shows any.
    pub salary_text: Option<String>,
}

/// Per-site URL construction and page parsing.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceKind;

    /// Listings per results page.
    fn page_size(&self) -> u32;

    /// Results-page URL for a zero-based page index.
    fn build_url(&self, criteria: &SearchCriteria, page: u32) -> ScrapeResult<String>;

    /// Cards on a results page, in document order.
    ///
    /// An empty list means the page has no listings. A missing results
    /// container is reported as [`ScrapeError::ContainerNotFound`] by sources
    /// that can tell the difference.
    fn enumerate_cards(&self, html: &str, page: u32) -> ScrapeResult<Vec<CardRef>>;

    /// Canonical detail URL of a card. `None` when the card links nowhere.
    fn card_identity(&self, card: &CardRef) -> Option<String>;

    /// Title and company, with [`COMPANY_NOT_FOUND`] standing in for a
    /// missing company.
    fn card_summary(&self, card: &CardRef) -> (String, String) {
        let company = card
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(COMPANY_NOT_FOUND);
        (card.title.trim().to_string(), company.to_string())
    }

    /// Load the card's detail page and return its HTML.
    async fn fetch_detail(
        &self,
        session: &ScrapeSession,
        card: &CardRef,
        max_retries: u32,
    ) -> ScrapeResult<String> {
        let url = self
            .card_identity(card)
            .ok_or_else(|| ScrapeError::Extraction("card has no detail link".into()))?;
        if !session.navigate(&url, max_retries).await? {
            return Err(ScrapeError::Navigation {
                url,
                attempts: max_retries.max(1),
            });
        }
        session.page_source().await
    }

    /// Description and salary text from a detail page.
    fn extract_detail(&self, html: &str) -> ScrapeResult<DetailExtract>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!("Indeed".parse::<SourceKind>().unwrap(), SourceKind::Indeed);
        assert_eq!(" linkedin ".parse::<SourceKind>().unwrap(), SourceKind::LinkedIn);
        assert!("monster".parse::<SourceKind>().is_err());

        let kinds: Vec<SourceKind> = serde_json::from_str(r#"["indeed", "LinkedIn"]"#).unwrap();
        assert_eq!(kinds, SourceKind::ALL.to_vec());
    }

    #[test]
    fn test_adapter_matches_kind() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.adapter().source(), kind);
        }
    }

    #[test]
    fn test_card_summary_uses_sentinel() {
        let adapter = SourceKind::Indeed.adapter();
        let card = CardRef {
            title: "  Data Analyst ".into(),
            company: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(
            adapter.card_summary(&card),
            ("Data Analyst".to_string(), COMPANY_NOT_FOUND.to_string())
        );
    }
}
