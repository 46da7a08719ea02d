//! Run configuration: seed URLs, browser and output locations
//!
//! Defaults are compiled in. A CONL file can override any of them:
//!
//! ```text
//! seeds
//!   awards_listing = https://www.grammy.com/awards
//!   latin_listing = "https://www.latingrammy.com/en/nominees/search?page=1"
//! output = data/grammy.json
//! csv = data/grammy.csv
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::render::BrowserSettings;

pub const GRAMMY_AWARDS_URL: &str = "https://www.grammy.com/awards";
pub const GRAMMY_LOCATIONS_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_Grammy_Award_ceremony_locations";
pub const LATIN_NOMINEES_URL: &str = "https://www.latingrammy.com/en/nominees/search?page=1";
pub const LATIN_LOCATIONS_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_Latin_Grammy_Award_ceremony_locations";

/// "Show more" button of the awards listing
pub const SHOW_MORE_XPATH: &str = "/html/body/div[2]/div/main/section[3]/section[4]/div/button";

pub const DEFAULT_OUTPUT: &str = "dcpp_final_grammy.json";
pub const DEFAULT_LOG: &str = "grammy_run.log";

/// The four pages a run starts from
#[derive(Debug, Clone, PartialEq)]
pub struct SeedUrls {
    pub awards_listing: String,
    pub awards_locations: String,
    pub latin_listing: String,
    pub latin_locations: String,
}

impl Default for SeedUrls {
    fn default() -> Self {
        Self {
            awards_listing: GRAMMY_AWARDS_URL.to_string(),
            awards_locations: GRAMMY_LOCATIONS_URL.to_string(),
            latin_listing: LATIN_NOMINEES_URL.to_string(),
            latin_locations: LATIN_LOCATIONS_URL.to_string(),
        }
    }
}

/// Where the dataset is written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub json: PathBuf,
    pub csv: Option<PathBuf>,
}

/// Everything the pipeline driver needs to know about a run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub seeds: SeedUrls,
    pub show_more_xpath: String,
    pub browser: BrowserSettings,
    pub output: OutputSettings,
    pub log: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seeds: SeedUrls::default(),
            show_more_xpath: SHOW_MORE_XPATH.to_string(),
            browser: BrowserSettings::default(),
            output: OutputSettings {
                json: PathBuf::from(DEFAULT_OUTPUT),
                csv: None,
            },
            log: PathBuf::from(DEFAULT_LOG),
        }
    }
}

/// Optional overrides read from a CONL file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    seeds: SeedOverrides,
    show_more_xpath: Option<String>,
    chrome: Option<String>,
    output: Option<String>,
    csv: Option<String>,
    log: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SeedOverrides {
    awards_listing: Option<String>,
    awards_locations: Option<String>,
    latin_listing: Option<String>,
    latin_locations: Option<String>,
}

impl PipelineConfig {
    /// Defaults, overridden by the CONL file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            config.apply_conl(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        }
        Ok(config)
    }

    fn apply_conl(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = serde_conl::from_str(content)?;

        let seeds = file.seeds;
        if let Some(url) = seeds.awards_listing {
            self.seeds.awards_listing = url;
        }
        if let Some(url) = seeds.awards_locations {
            self.seeds.awards_locations = url;
        }
        if let Some(url) = seeds.latin_listing {
            self.seeds.latin_listing = url;
        }
        if let Some(url) = seeds.latin_locations {
            self.seeds.latin_locations = url;
        }
        if let Some(xpath) = file.show_more_xpath {
            self.show_more_xpath = xpath;
        }
        if let Some(chrome) = file.chrome {
            self.browser.chrome = Some(PathBuf::from(chrome));
        }
        if let Some(output) = file.output {
            self.output.json = PathBuf::from(output);
        }
        if let Some(csv) = file.csv {
            self.output.csv = Some(PathBuf::from(csv));
        }
        if let Some(log) = file.log {
            self.log = PathBuf::from(log);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config.seeds.awards_listing, GRAMMY_AWARDS_URL);
        assert_eq!(config.seeds.latin_locations, LATIN_LOCATIONS_URL);
        assert_eq!(config.output.json, PathBuf::from(DEFAULT_OUTPUT));
        assert!(config.output.csv.is_none());
        assert!(config.browser.chrome.is_none());
    }

    #[test]
    fn test_conl_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_conl(
                "seeds\n  latin_listing = \"https://example.org/search?page=2\"\noutput = out/grammy.json\nchrome = /usr/bin/chromium\n",
            )
            .unwrap();
        assert_eq!(config.seeds.latin_listing, "https://example.org/search?page=2");
        assert_eq!(config.seeds.awards_listing, GRAMMY_AWARDS_URL);
        assert_eq!(config.output.json, PathBuf::from("out/grammy.json"));
        assert_eq!(config.browser.chrome, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_conl("seed_urls = nope\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(PipelineConfig::load(Some(Path::new("/nonexistent/grammy.conl"))).is_err());
    }
}
