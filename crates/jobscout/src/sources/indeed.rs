//! Indeed adapter.

use super::detail::{
    clean_description, element_text, following_element, sanitize_ascii, section_fallback,
};
use super::{CardRef, DetailExtract, SourceAdapter, SourceKind};
use crate::criteria::{EducationLevel, ExperienceLevel, LocationFilter, SearchCriteria};
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

const BASE_URL: &str = "https://www.indeed.com";
const SEARCH_URL: &str = "https://www.indeed.com/jobs";
const PAGE_SIZE: u32 = 10;
const REMOTE_FILTER: &str = "0kf:attr(DSQF7)";

struct Selectors {
    card: Selector,
    link: Selector,
    company: Selector,
    heading: Selector,
    description: Selector,
}

fn selectors() -> &'static Selectors {
    static SEL: OnceLock<Selectors> = OnceLock::new();
    SEL.get_or_init(|| Selectors {
        card: Selector::parse("div.job_seen_beacon, div.jobsearch-ResultsList, div.tapItem")
            .expect("card selector is valid"),
        link: Selector::parse("a.jcs-JobTitle[href], a.jobTitle[href]")
            .expect("link selector is valid"),
        company: Selector::parse(r#"span[data-testid="company-name"]"#)
            .expect("company selector is valid"),
        heading: Selector::parse("h3").expect("heading selector is valid"),
        description: Selector::parse("div#jobDescriptionText")
            .expect("description selector is valid"),
    })
}

fn experience_filter(level: ExperienceLevel) -> &'static str {
    match level {
        ExperienceLevel::Entry => "explvl(ENTRY_LEVEL)",
        ExperienceLevel::Mid => "explvl(MID_LEVEL)",
        ExperienceLevel::Senior => "explvl(SENIOR_LEVEL)",
    }
}

fn education_filter(level: EducationLevel) -> Option<&'static str> {
    match level {
        EducationLevel::Bachelors => Some("attr(FCGTU)|attr(HFDVW)"),
        EducationLevel::Masters => Some("attr(FCGTU)|attr(HFDVW)|attr(QXQQS)"),
        EducationLevel::Doctorate => None,
    }
}

/// Builds the `sc` filter expression: remote flag, then experience, then
/// education, comma-separated.
fn filter_expression(criteria: &SearchCriteria) -> String {
    let mut sc = if criteria.remote_only {
        REMOTE_FILTER.to_string()
    } else {
        String::new()
    };
    if !criteria.experience_levels.is_empty() {
        let levels: String = criteria
            .experience_levels
            .iter()
            .map(|l| experience_filter(*l))
            .collect();
        sc = format!("{sc},{levels}");
    }
    if let Some(edu) = criteria.education_level.and_then(education_filter) {
        sc = format!("{sc},{edu}");
    }
    sc
}

pub struct IndeedAdapter;

#[async_trait]
impl SourceAdapter for IndeedAdapter {
    fn source(&self) -> SourceKind {
        SourceKind::Indeed
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn build_url(&self, criteria: &SearchCriteria, page: u32) -> ScrapeResult<String> {
        let query = match criteria.job_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => criteria.keyword_query(),
        };
        let (location, radius) = match criteria.location_filter() {
            LocationFilter::Remote => ("Remote".to_string(), String::new()),
            LocationFilter::Near { location, distance } => (
                location.to_string(),
                distance.map(|d| d.to_string()).unwrap_or_default(),
            ),
            LocationFilter::Anywhere => (String::new(), String::new()),
        };
        let start = (page * PAGE_SIZE).to_string();
        let sc = filter_expression(criteria);

        let url = Url::parse_with_params(
            SEARCH_URL,
            &[
                ("q", query.as_str()),
                ("l", location.as_str()),
                ("sc", sc.as_str()),
                ("radius", radius.as_str()),
                ("start", start.as_str()),
                ("vjk", "all"),
            ],
        )
        .map_err(|e| ScrapeError::Config(format!("bad search URL: {e}")))?;
        Ok(url.into())
    }

    fn enumerate_cards(&self, html: &str, _page: u32) -> ScrapeResult<Vec<CardRef>> {
        let sel = selectors();
        let document = Html::parse_document(html);
        let cards = document
            .select(&sel.card)
            .map(|card| {
                let link = card.select(&sel.link).next();
                let company = card.select(&sel.company).next().map(|el| {
                    let text = element_text(&el);
                    let first = text.split(',').next().unwrap_or_default().trim();
                    sanitize_ascii(first)
                });
                CardRef {
                    href: link.and_then(|a| a.value().attr("href")).map(str::to_string),
                    job_id: None,
                    title: link.map(|a| element_text(&a)).unwrap_or_default(),
                    company,
                }
            })
            .collect();
        Ok(cards)
    }

    fn card_identity(&self, card: &CardRef) -> Option<String> {
        let href = card.href.as_deref()?.trim();
        if href.is_empty() {
            return None;
        }
        let base = Url::parse(BASE_URL).ok()?;
        base.join(href).ok().map(String::from)
    }

    fn extract_detail(&self, html: &str) -> ScrapeResult<DetailExtract> {
        let sel = selectors();
        let document = Html::parse_document(html);

        let salary_text = document
            .select(&sel.heading)
            .find(|h| element_text(h) == "Pay")
            .and_then(|h| following_element(&document, &h, "div"))
            .map(|div| element_text(&div))
            .filter(|text| !text.is_empty());

        let raw = match document.select(&sel.description).next() {
            Some(desc) => element_text(&desc),
            None => section_fallback(&document),
        };

        Ok(DetailExtract {
            description: clean_description(&raw),
            salary_text,
        })
    }
}
