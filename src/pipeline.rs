//! Stage sequencing for one end-to-end run
//!
//! Stages run strictly one after another and the first failure ends the run.
//! Nothing is written unless every stage succeeded.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::crawl::crawl;
use crate::details::{details_for, fetch_table, Fetcher, SchemaError};
use crate::extract::{extract_nominations, extract_regional};
use crate::integrate::integrate;
use crate::output::{csv_artifact, json_artifact, write_all};
use crate::render::{LoadStrategy, RenderError, Renderer};
use crate::types::{CanonicalDataset, CeremonyDetail, CeremonyLink, NominationRecord, Program, RegionalRecord};

/// The stage that stopped a run, and why
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("crawling {url} failed: {source}")]
    Crawl {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("scraping {title} ({url}) failed: {source}")]
    Ceremony {
        title: String,
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("scraping Latin Grammy winners from {url} failed: {source}")]
    Regional {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("fetching {program} ceremony details from {url} failed: {source:#}")]
    Details {
        program: &'static str,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unexpected table layout: {0}")]
    Schema(#[from] SchemaError),

    #[error("writing {path} failed: {source:#}")]
    Output {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// One run over the configured seeds with the given collaborators
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    renderer: &'a dyn Renderer,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        renderer: &'a dyn Renderer,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            config,
            renderer,
            fetcher,
        }
    }

    /// Run every stage and return the integrated dataset. The failing stage is
    /// logged before its error is returned.
    pub fn run(&self) -> Result<CanonicalDataset, PipelineError> {
        self.execute().map_err(|e| {
            error!("Run halted: {}", e);
            e
        })
    }

    /// Run, then write the JSON (and CSV when configured) output. Both are
    /// encoded before either is written; a failed write leaves neither file.
    pub fn run_to_files(&self) -> Result<CanonicalDataset, PipelineError> {
        let dataset = self.run()?;
        let output = &self.config.output;

        info!("Saving the data...");
        let json = json_artifact(&output.json, &dataset)
            .map_err(|source| self.output_error(&output.json, source))?;
        let mut artifacts = vec![json];
        if let Some(csv) = &output.csv {
            let csv = csv_artifact(csv, &dataset).map_err(|source| self.output_error(csv, source))?;
            artifacts.push(csv);
        }
        write_all(&artifacts).map_err(|(path, source)| self.output_error(&path, source))?;
        info!("Wrote {} records to {}", dataset.len(), output.json.display());
        Ok(dataset)
    }

    fn output_error(&self, path: &std::path::Path, source: anyhow::Error) -> PipelineError {
        let e = PipelineError::Output {
            path: path.to_path_buf(),
            source,
        };
        error!("Run halted: {}", e);
        e
    }

    fn execute(&self) -> Result<CanonicalDataset, PipelineError> {
        let seeds = &self.config.seeds;

        info!("Starting to crawl {}", seeds.awards_listing);
        let links = self.crawl_links()?;
        info!("Crawl successful");

        let grammy_records = self.scrape_ceremonies(&links)?;
        info!("Grammy scrape successful: {} records", grammy_records.len());

        info!("Scraping Grammy details...");
        let grammy_details = self.fetch_details(Program::Grammy, &seeds.awards_locations)?;

        info!("Scraping Latin Grammy awards...");
        let latin_records = self.scrape_regional()?;
        info!("Latin Grammy scrape successful: {} records", latin_records.len());

        info!("Scraping Latin Grammy details...");
        let latin_details = self.fetch_details(Program::Latin, &seeds.latin_locations)?;

        info!("Cleaning and combining the data collected...");
        Ok(integrate(
            grammy_records,
            &grammy_details,
            latin_records,
            &latin_details,
        ))
    }

    pub fn crawl_links(&self) -> Result<Vec<CeremonyLink>, PipelineError> {
        let url = &self.config.seeds.awards_listing;
        crawl(self.renderer, url, &self.config.show_more_xpath).map_err(|source| {
            PipelineError::Crawl {
                url: url.clone(),
                source,
            }
        })
    }

    fn scrape_ceremonies(&self, links: &[CeremonyLink]) -> Result<Vec<NominationRecord>, PipelineError> {
        info!("Starting to scrape {} Grammy ceremonies...", links.len());
        let mut records = Vec::new();
        for link in links {
            info!("Fetching {}: {}", link.title, link.url);
            let strategy = LoadStrategy::for_url(&link.url, &self.config.show_more_xpath);
            let page = self
                .renderer
                .render(&link.url, &strategy)
                .map_err(|source| PipelineError::Ceremony {
                    title: link.title.clone(),
                    url: link.url.clone(),
                    source,
                })?;
            let ceremony = extract_nominations(&page.html, &link.title);
            info!("{} records for {}", ceremony.len(), link.title);
            records.extend(ceremony);
        }
        Ok(records)
    }

    fn scrape_regional(&self) -> Result<Vec<RegionalRecord>, PipelineError> {
        let url = &self.config.seeds.latin_listing;
        let strategy = LoadStrategy::for_url(url, &self.config.show_more_xpath);
        let page = self
            .renderer
            .render(url, &strategy)
            .map_err(|source| PipelineError::Regional {
                url: url.clone(),
                source,
            })?;
        Ok(extract_regional(&page.html)?)
    }

    fn fetch_details(&self, program: Program, url: &str) -> Result<Vec<CeremonyDetail>, PipelineError> {
        let table = fetch_table(self.fetcher, url).map_err(|source| PipelineError::Details {
            program: program.as_str(),
            url: url.to_string(),
            source,
        })?;
        Ok(details_for(program, &table)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputSettings, SeedUrls};
    use crate::extract::fixtures::CEREMONY_PAGE;
    use crate::render::RenderedPage;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const LISTING: &str = r#"<main>
      <div class="max-w-610px w-full md-xl:pt-25px md-xl:pr-20px md-xl:pl-5px relative">
        <div class="mb-20px md-xl:mb-30px text-center md-xl:text-left leading-7">
          <a href="/awards/66th-annual-grammy-awards">66th Annual GRAMMY Awards..</a>
        </div>
      </div>
    </main>"#;

    const LATIN_PAGE: &str = r#"<table>
        <tr><th>Year</th><th>Category</th><th>Title</th><th>Winners</th></tr>
        <tr><td>2023</td><td>Record Of The Year</td><td>"Tu Corazón"</td><td>Shakira, artist</td></tr>
    </table>"#;

    const GRAMMY_LOCATIONS: &str = r#"<table>
        <tr><th>Ceremony</th><th>Date</th><th>Venue</th><th>Venue City</th><th>Host</th><th>Network</th><th>Viewers (in millions)</th></tr>
        <tr><td>66th Annual Grammy Awards</td><td>February 4, 2024</td><td>Crypto.com Arena[1]</td><td>Los Angeles</td><td>Trevor Noah</td><td>CBS</td><td>16.9</td></tr>
    </table>"#;

    const LATIN_LOCATIONS: &str = r#"<table>
        <tr><th>Year</th><th>Date</th><th>Venue</th><th>Host City</th><th>Host(s)</th><th>Viewers (in millions)</th><th>Person of the Year</th></tr>
        <tr><td>2023</td><td>November 16, 2023</td><td>FIBES</td><td>Seville</td><td>Sebastián Yatra</td><td>TBA</td><td>Laura Pausini</td></tr>
    </table>"#;

    struct StubRenderer {
        pages: HashMap<String, &'static str>,
        calls: RefCell<Vec<(String, &'static str)>>,
    }

    impl Renderer for StubRenderer {
        fn render(&self, url: &str, strategy: &LoadStrategy) -> Result<RenderedPage, RenderError> {
            self.calls.borrow_mut().push((url.to_string(), strategy.name()));
            match self.pages.get(url) {
                Some(html) => Ok(RenderedPage {
                    url: url.to_string(),
                    html: html.to_string(),
                }),
                None => Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: "timed out waiting for element".to_string(),
                }),
            }
        }
    }

    struct StubFetcher {
        pages: HashMap<String, &'static str>,
    }

    impl Fetcher for StubFetcher {
        fn fetch(&self, url: &str) -> anyhow::Result<String> {
            self.pages
                .get(url)
                .map(|html| html.to_string())
                .ok_or_else(|| anyhow::anyhow!("404 Not Found"))
        }
    }

    fn temp_output(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("grammy-pipeline-{}-{}", std::process::id(), name))
    }

    fn config(name: &str) -> PipelineConfig {
        PipelineConfig {
            seeds: SeedUrls {
                awards_listing: "https://www.grammy.com/awards".to_string(),
                awards_locations: "https://en.wikipedia.org/grammy".to_string(),
                latin_listing: "https://www.latingrammy.com/en/nominees/search?page=1".to_string(),
                latin_locations: "https://en.wikipedia.org/latin".to_string(),
            },
            output: OutputSettings {
                json: temp_output(name),
                csv: None,
            },
            ..PipelineConfig::default()
        }
    }

    fn renderer() -> StubRenderer {
        let mut pages = HashMap::new();
        pages.insert("https://www.grammy.com/awards".to_string(), LISTING);
        pages.insert(
            "https://www.grammy.com/awards/66th-annual-grammy-awards".to_string(),
            CEREMONY_PAGE,
        );
        pages.insert(
            "https://www.latingrammy.com/en/nominees/search?page=1".to_string(),
            LATIN_PAGE,
        );
        StubRenderer {
            pages,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn fetcher() -> StubFetcher {
        let mut pages = HashMap::new();
        pages.insert("https://en.wikipedia.org/grammy".to_string(), GRAMMY_LOCATIONS);
        pages.insert("https://en.wikipedia.org/latin".to_string(), LATIN_LOCATIONS);
        StubFetcher { pages }
    }

    #[test]
    fn test_full_run() {
        let config = config("full.json");
        let renderer = renderer();
        let fetcher = fetcher();
        let dataset = Pipeline::new(&config, &renderer, &fetcher).run().unwrap();

        assert_eq!(dataset.len(), 4);
        let grammy: Vec<_> = dataset.iter().filter(|r| !r.is_latin).collect();
        assert_eq!(grammy.len(), 3);
        for row in &grammy {
            assert_eq!(row.title, "66Th Annual Grammy Awards");
            assert_eq!(row.year, "2024");
            assert_eq!(row.venue.as_deref(), Some("Crypto.com Arena"));
            assert_eq!(row.network.as_deref(), Some("CBS"));
        }
        let winners: Vec<bool> = grammy.iter().map(|r| r.is_winner).collect();
        assert_eq!(winners, vec![true, false, true]);

        let latin = &dataset[3];
        assert!(latin.is_latin && latin.is_winner);
        assert_eq!(latin.title, "24Th Annual Latin Grammy Awards");
        assert_eq!(latin.nominee, "Tu Corazón");
        assert_eq!(latin.artist, "Shakira");
        assert_eq!(latin.venue_city.as_deref(), Some("Seville"));
        assert_eq!(latin.network.as_deref(), Some(""));
        assert_eq!(latin.viewers_millions, Some(0.0));

        let calls = renderer.calls.borrow();
        let strategies: Vec<&str> = calls.iter().map(|(_, s)| *s).collect();
        assert_eq!(strategies, vec!["click-expand", "simple-load", "scroll-to-end"]);
    }

    #[test]
    fn test_run_to_files_writes_json() {
        let config = config("written.json");
        let renderer = renderer();
        let fetcher = fetcher();
        let dataset = Pipeline::new(&config, &renderer, &fetcher)
            .run_to_files()
            .unwrap();
        let written = std::fs::read(&config.output.json).unwrap();
        let text = std::str::from_utf8(&written[3..]).unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_str(text).unwrap();
        assert_eq!(rows.len(), dataset.len());
        std::fs::remove_file(&config.output.json).ok();
    }

    #[test]
    fn test_ceremony_failure_halts_without_output() {
        let config = config("halted.json");
        let mut renderer = renderer();
        renderer
            .pages
            .remove("https://www.grammy.com/awards/66th-annual-grammy-awards");
        let fetcher = fetcher();
        let err = Pipeline::new(&config, &renderer, &fetcher)
            .run_to_files()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ceremony { .. }));
        assert!(err.to_string().contains("66th Annual GRAMMY Awards"));
        assert!(!config.output.json.exists());
        // Nothing after the failing ceremony was rendered
        assert_eq!(renderer.calls.borrow().len(), 2);
    }

    #[test]
    fn test_csv_failure_leaves_no_json() {
        let mut config = config("with-csv.json");
        let blocked = temp_output("csv-is-a-dir");
        std::fs::create_dir_all(&blocked).unwrap();
        config.output.csv = Some(blocked.clone());
        let err = Pipeline::new(&config, &renderer(), &fetcher())
            .run_to_files()
            .unwrap_err();
        match &err {
            PipelineError::Output { path, .. } => assert_eq!(path, &blocked),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!config.output.json.exists());
        std::fs::remove_dir_all(&blocked).ok();
    }

    #[test]
    fn test_crawl_failure() {
        let config = config("crawl.json");
        let mut renderer = renderer();
        renderer.pages.remove("https://www.grammy.com/awards");
        let err = Pipeline::new(&config, &renderer, &fetcher()).run().unwrap_err();
        assert!(matches!(err, PipelineError::Crawl { .. }));
    }

    #[test]
    fn test_details_failure() {
        let config = config("details.json");
        let mut fetcher = fetcher();
        fetcher.pages.remove("https://en.wikipedia.org/latin");
        let err = Pipeline::new(&config, &renderer(), &fetcher).run().unwrap_err();
        match err {
            PipelineError::Details { program, .. } => assert_eq!(program, "latin"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_regional_schema_mismatch() {
        let config = config("schema.json");
        let mut renderer = renderer();
        renderer.pages.insert(
            "https://www.latingrammy.com/en/nominees/search?page=1".to_string(),
            "<table><tr><th>Año</th></tr><tr><td>2023</td></tr></table>",
        );
        let err = Pipeline::new(&config, &renderer, &fetcher()).run().unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
