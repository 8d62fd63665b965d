//! LinkedIn adapter.
//!
//! Works on the public job-search pages. Results pages carry an explicit list
//! container, so a page without one is reported as
//! [`ScrapeError::ContainerNotFound`] rather than as an empty page.

use super::detail::{clean_description, element_text};
use super::{CardRef, DetailExtract, SourceAdapter, SourceKind};
use crate::criteria::{EducationLevel, ExperienceLevel, LocationFilter, SearchCriteria};
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

const BASE_URL: &str = "https://www.linkedin.com";
const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search";
const PAGE_SIZE: u32 = 25;
/// Geo id for the United States, used with the remote filter.
const REMOTE_GEO_ID: &str = "103644278";
/// Salary filters below this are ignored by the site.
const MIN_SALARY_FILTER: f64 = 40000.0;
const PREFERENCES_SUFFIX: &str = "Matches your job preferences";

struct Selectors {
    container: Selector,
    card: Selector,
    job_id: Selector,
    link: Selector,
    title: Selector,
    company: Selector,
    description: Vec<Selector>,
    salary: Vec<Selector>,
    pill: Selector,
    paragraph: Selector,
}

fn parse(css: &str) -> Selector {
    Selector::parse(css).expect("LinkedIn selector is valid")
}

fn selectors() -> &'static Selectors {
    static SEL: OnceLock<Selectors> = OnceLock::new();
    SEL.get_or_init(|| Selectors {
        container: parse(
            ".jobs-search-results-list, .jobs-search-results__list, \
             .jobs-search__results-list, .scaffold-layout__list",
        ),
        card: parse(
            ".job-card-container, .jobs-search-results__list-item, \
             .job-card-container--clickable",
        ),
        job_id: parse("[data-job-id]"),
        link: parse("a[href]"),
        title: parse(
            ".job-card-list__title, .jobs-search-results__list-item-title, \
             .job-card-list__title--link",
        ),
        company: parse(
            ".job-card-container__company-name, .job-card-container__primary-description, \
             .artdeco-entity-lockup__caption",
        ),
        description: [
            ".jobs-description__content",
            ".jobs-description",
            ".jobs-details__main-content",
        ]
        .into_iter()
        .map(parse)
        .collect(),
        salary: [
            ".salary-range",
            ".compensation",
            ".job-details-jobs-unified-top-card__job-insight",
            "div[class*='job-details-preferences-and-skills__pill'][role*='presentation']",
        ]
        .into_iter()
        .map(parse)
        .collect(),
        pill: parse("div[class*='job-details-preferences-and-skills__pill']"),
        paragraph: parse("p"),
    })
}

fn experience_codes(level: ExperienceLevel) -> [&'static str; 2] {
    match level {
        ExperienceLevel::Entry => ["1", "2"],
        ExperienceLevel::Mid => ["3", "4"],
        ExperienceLevel::Senior => ["5", "6"],
    }
}

fn education_code(level: EducationLevel) -> &'static str {
    match level {
        EducationLevel::Bachelors => "4",
        EducationLevel::Masters => "5",
        EducationLevel::Doctorate => "6",
    }
}

/// First salary-looking text on a detail page.
fn find_salary(document: &Html) -> Option<String> {
    let sel = selectors();
    for selector in &sel.salary {
        let Some(el) = document.select(selector).next() else {
            continue;
        };
        let text = element_text(&el);
        if text.chars().any(|c| c.is_ascii_digit()) {
            let text = text
                .split(PREFERENCES_SUFFIX)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            return Some(text);
        }
    }

    let pill = document
        .select(&sel.pill)
        .map(|el| element_text(&el))
        .find(|t| t.contains("yr") || t.contains("hr"));
    if pill.is_some() {
        return pill;
    }

    document
        .select(&sel.paragraph)
        .map(|el| element_text(&el))
        .find(|t| {
            ["Compensation Range", "/yr", "/hr", "per year"]
                .iter()
                .any(|marker| t.contains(marker))
        })
}

pub struct LinkedInAdapter;

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn source(&self) -> SourceKind {
        SourceKind::LinkedIn
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn build_url(&self, criteria: &SearchCriteria, page: u32) -> ScrapeResult<String> {
        let mut terms = Vec::new();
        if let Some(title) = criteria.job_title.as_deref().map(str::trim) {
            if !title.is_empty() {
                terms.push(title.to_string());
            }
        }
        let keywords = criteria.keyword_query();
        if !keywords.is_empty() {
            terms.push(keywords);
        }

        let mut params: Vec<(&str, String)> = vec![
            ("keywords", terms.join(" ")),
            ("position", "1".into()),
            ("pageNum", "0".into()),
            ("sortBy", "R".into()),
            ("f_AL", "false".into()),
        ];

        match criteria.location_filter() {
            LocationFilter::Remote => {
                params.push(("f_WT", "2".into()));
                params.push(("geoId", REMOTE_GEO_ID.into()));
            }
            LocationFilter::Near { location, distance } => {
                params.push(("location", location.to_string()));
                if let Some(d) = distance.filter(|d| *d > 0) {
                    params.push(("distance", d.to_string()));
                }
            }
            LocationFilter::Anywhere => {}
        }

        let codes: BTreeSet<&str> = criteria
            .experience_levels
            .iter()
            .flat_map(|l| experience_codes(*l))
            .collect();
        if !codes.is_empty() {
            params.push(("f_E", codes.into_iter().collect::<Vec<_>>().join(",")));
        }
        if let Some(edu) = criteria.education_level {
            params.push(("f_ED", education_code(edu).into()));
        }

        let range = criteria.salary_range;
        if range.min > 0.0 {
            if range.min >= MIN_SALARY_FILTER {
                params.push(("f_SB2", format!("{:.0}", range.min)));
            }
            if range.max > range.min {
                params.push(("f_SB3", format!("{:.0}", range.max)));
            }
        }
        params.push(("start", (page * PAGE_SIZE).to_string()));

        let url = Url::parse_with_params(SEARCH_URL, params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| ScrapeError::Config(format!("bad search URL: {e}")))?;
        Ok(url.into())
    }

    fn enumerate_cards(&self, html: &str, page: u32) -> ScrapeResult<Vec<CardRef>> {
        let sel = selectors();
        let document = Html::parse_document(html);
        if document.select(&sel.container).next().is_none() {
            return Err(ScrapeError::ContainerNotFound { page });
        }

        let cards = document
            .select(&sel.card)
            .map(|card| {
                let job_id = card
                    .value()
                    .attr("data-job-id")
                    .or_else(|| {
                        card.select(&sel.job_id)
                            .next()
                            .and_then(|el| el.value().attr("data-job-id"))
                    })
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string);
                CardRef {
                    href: card
                        .select(&sel.link)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(str::to_string),
                    job_id,
                    title: card
                        .select(&sel.title)
                        .next()
                        .map(|el| element_text(&el))
                        .unwrap_or_default(),
                    company: card.select(&sel.company).next().map(|el| element_text(&el)),
                }
            })
            .collect();
        Ok(cards)
    }

    fn card_identity(&self, card: &CardRef) -> Option<String> {
        if let Some(id) = &card.job_id {
            return Some(format!("{BASE_URL}/jobs/view/{id}/"));
        }
        let href = card.href.as_deref()?.trim();
        if href.is_empty() {
            return None;
        }
        let mut url = Url::parse(BASE_URL).ok()?.join(href).ok()?;
        url.set_query(None);
        url.set_fragment(None);
        Some(url.into())
    }

    fn extract_detail(&self, html: &str) -> ScrapeResult<DetailExtract> {
        let sel = selectors();
        let document = Html::parse_document(html);

        let description = sel
            .description
            .iter()
            .find_map(|s| document.select(s).next())
            .ok_or_else(|| ScrapeError::Extraction("job description not found".into()))?;

        Ok(DetailExtract {
            description: clean_description(&element_text(&description)),
            salary_text: find_salary(&document),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::SalaryRange;

    fn query(url: &str) -> Vec<(String, String)> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    #[test]
    fn test_build_url_remote_with_filters() {
        let mut c = SearchCriteria::new(SalaryRange::new(90000.0, 120000.0));
        c.job_title = Some("BI Developer".into());
        c.keywords = vec!["Tableau".into(), "SQL".into()];
        c.remote_only = true;
        c.experience_levels = vec![ExperienceLevel::Mid, ExperienceLevel::Entry, ExperienceLevel::Mid];
        c.education_level = Some(EducationLevel::Masters);

        let params = query(&LinkedInAdapter.build_url(&c, 1).unwrap());
        let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("keywords", "BI Developer Tableau SQL"),
                ("position", "1"),
                ("pageNum", "0"),
                ("sortBy", "R"),
                ("f_AL", "false"),
                ("f_WT", "2"),
                ("geoId", REMOTE_GEO_ID),
                ("f_E", "1,2,3,4"),
                ("f_ED", "5"),
                ("f_SB2", "90000"),
                ("f_SB3", "120000"),
                ("start", "25"),
            ]
        );
    }

    #[test]
    fn test_build_url_low_salary_and_location() {
        let mut c = SearchCriteria::new(SalaryRange::new(30000.0, 30000.0));
        c.keywords = vec!["analyst".into()];
        c.location = Some("Denver".into());
        c.distance = Some(10);

        let params = query(&LinkedInAdapter.build_url(&c, 0).unwrap());
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"location"));
        assert!(keys.contains(&"distance"));
        assert!(!keys.contains(&"f_SB2"));
        assert!(!keys.contains(&"f_SB3"));
        assert!(!keys.contains(&"f_WT"));
    }

    #[test]
    fn test_missing_container_is_an_error() {
        let err = LinkedInAdapter
            .enumerate_cards("<div class='job-card-container'></div>", 2)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::ContainerNotFound { page: 2 }));
    }

    #[test]
    fn test_enumerate_cards_and_identity() {
        let html = r#"
            <ul class="scaffold-layout__list">
              <li class="jobs-search-results__list-item">
                <div class="job-card-container" data-job-id="3901">
                  <a class="job-card-list__title" href="/jobs/view/3901/?refId=x">Data Engineer</a>
                  <span class="job-card-container__company-name">Globex</span>
                </div>
              </li>
              <div class="job-card-container">
                <a class="job-card-list__title" href="/jobs/view/4000/?trk=abc#top">Analyst</a>
              </div>
            </ul>
        "#;
        let cards = LinkedInAdapter.enumerate_cards(html, 0).unwrap();
        let ids: Vec<String> = cards
            .iter()
            .filter_map(|c| LinkedInAdapter.card_identity(c))
            .collect();
        // The list item and its inner card resolve to the same listing.
        assert_eq!(
            ids,
            vec![
                "https://www.linkedin.com/jobs/view/3901/",
                "https://www.linkedin.com/jobs/view/3901/",
                "https://www.linkedin.com/jobs/view/4000/",
            ]
        );
        assert_eq!(cards[1].title, "Data Engineer");
        assert_eq!(cards[1].company.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_extract_detail_salary_selectors() {
        let html = r#"
            <div class="jobs-description__content">  Lead   the BI team.  </div>
            <div class="salary-range">Competitive</div>
            <div class="job-details-preferences-and-skills__pill" role="presentation">
              $120K/yr - $150K/yr Matches your job preferences, minimum pay preference is 90000.
            </div>
        "#;
        let detail = LinkedInAdapter.extract_detail(html).unwrap();
        assert_eq!(detail.description, "Lead the BI team.");
        assert_eq!(detail.salary_text.as_deref(), Some("$120K/yr - $150K/yr"));
    }

    #[test]
    fn test_extract_detail_paragraph_fallback() {
        let html = r#"
            <div class="jobs-description"><p>Compensation Range: $60/hr - $70/hr</p></div>
        "#;
        let detail = LinkedInAdapter.extract_detail(html).unwrap();
        assert_eq!(detail.salary_text.as_deref(), Some("Compensation Range: $60/hr - $70/hr"));
    }

    #[test]
    fn test_extract_detail_requires_description() {
        let err = LinkedInAdapter.extract_detail("<div class='salary-range'>$1</div>").unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction(_)));
    }
}
