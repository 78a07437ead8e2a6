use crate::error::PipelineError;
use crate::models::{RegionPage, SchoolRegions};
use regex::Regex;
use scraper::{Html, Selector};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const SCHOOL_BUTTON_SELECTOR: &str = "button.btn-school span.span-search";

/// Extracts school names from the regional school listing pages.
pub struct SchoolRegionScraper {
    client: reqwest::blocking::Client,
    school_name: Regex,
}

impl SchoolRegionScraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            // "004-國立成功大學" -> "國立成功大學"
            school_name: Regex::new(r"^\d+-(.+)$").expect("school name pattern is valid"),
        }
    }

    pub fn scrape_file(
        &self,
        file_path: impl AsRef<Path>,
        region: &str,
    ) -> Result<SchoolRegions, PipelineError> {
        let path = file_path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PipelineError::io(path, source))?;
        self.parse_html_content(&content, region)
    }

    pub fn scrape_url(&self, url: &str, region: &str) -> Result<SchoolRegions, PipelineError> {
        info!(%url, "fetching school listing");
        let http_error = |source| PipelineError::Http {
            url: url.to_string(),
            source,
        };

        let content = self
            .client
            .get(url)
            .timeout(Duration::from_secs(30))
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(http_error)?;

        self.parse_html_content(&content, region)
    }

    /// Scrape every configured page; a school listed under several regions
    /// keeps the last one. Unreadable pages are logged and skipped.
    pub fn scrape_pages(&self, pages: &[RegionPage]) -> SchoolRegions {
        let mut all_schools = SchoolRegions::new();

        for page in pages {
            let result = match (&page.file, &page.url) {
                (Some(file), _) => self.scrape_file(file, &page.region),
                (None, Some(url)) => self.scrape_url(url, &page.region),
                (None, None) => {
                    warn!(region = %page.region, "region page has neither file nor url");
                    continue;
                }
            };

            match result {
                Ok(schools) => {
                    info!(
                        region = %page.region,
                        found = schools.len(),
                        "extracted schools for region"
                    );
                    all_schools.extend(schools);
                }
                Err(err) => warn!(region = %page.region, error = %err, "skipping region page"),
            }
        }

        all_schools
    }

    pub fn parse_html_content(&self, content: &str, region: &str) -> Result<SchoolRegions, PipelineError> {
        let document = Html::parse_document(content);
        let selector =
            Selector::parse(SCHOOL_BUTTON_SELECTOR).map_err(|err| PipelineError::Selector {
                selector: SCHOOL_BUTTON_SELECTOR.to_string(),
                message: err.to_string(),
            })?;

        let mut schools = SchoolRegions::new();
        for element in document.select(&selector) {
            let full_text = element.text().collect::<String>().trim().to_string();
            if full_text.is_empty() {
                continue;
            }
            let school = self
                .school_name
                .captures(&full_text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or(full_text);
            schools.insert(school, region.to_string());
        }

        if schools.is_empty() {
            warn!(%region, "no schools found in listing page");
        }
        Ok(schools)
    }
}

impl Default for SchoolRegionScraper {
    fn default() -> Self {
        Self::new()
    }
}
