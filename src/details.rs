//! Ceremony metadata from the static reference pages of both programs

use anyhow::{Context, Result};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::normalize::{strip_brackets, title_case, try_parse_viewers};
use crate::table::{parse_first_table, Table};
use crate::types::{CeremonyDetail, Program};

const USER_AGENT: &str =
    "Mozilla/5.0 (platform; rv:geckoversion) Gecko/geckotrail Firefox/firefoxversion";

const VIEWERS_COLUMN: &str = "Viewers (in millions)";

/// A table lacks a column the integration depends on
#[derive(Debug, Error)]
#[error("{page} table has no {column:?} column (found {found:?})")]
pub struct SchemaError {
    pub page: String,
    pub column: String,
    pub found: Vec<String>,
}

impl SchemaError {
    pub fn missing(page: &str, column: &str, table: &Table) -> Self {
        Self {
            page: page.to_string(),
            column: column.to_string(),
            found: table.headers.clone(),
        }
    }
}

/// Plain HTTP retrieval of pages that need no script execution
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from: {}", url))?;
        response
            .text()
            .with_context(|| format!("Failed to read response: {}", url))
    }
}

/// Fetch a reference page and decode its first table
pub fn fetch_table(fetcher: &dyn Fetcher, url: &str) -> Result<Table> {
    let html = fetcher.fetch(url)?;
    let table = parse_first_table(&html).with_context(|| format!("No table found at {}", url))?;
    info!(
        "Read {} rows x {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        url
    );
    Ok(table)
}

/// Clean a detail table of either program
pub fn details_for(program: Program, table: &Table) -> Result<Vec<CeremonyDetail>, SchemaError> {
    match program {
        Program::Grammy => primary_details(table),
        Program::Latin => regional_details(table),
    }
}

/// Primary program ceremonies, keyed by title-cased ceremony name
pub fn primary_details(table: &Table) -> Result<Vec<CeremonyDetail>, SchemaError> {
    let key = table
        .column_any(&["Ceremony", "Title"])
        .ok_or_else(|| SchemaError::missing("Grammy ceremony", "Ceremony", table))?;
    let columns = DetailColumns {
        date: table.column("Date"),
        venue: table.column("Venue"),
        venue_city: table.column_any(&["Venue City", "Host City", "City"]),
        host: table.column_any(&["Host", "Host(s)", "Hosts"]),
        network: table.column("Network"),
        viewers: table.column(VIEWERS_COLUMN),
    };
    warn_missing("Grammy ceremony", &columns, true);

    Ok(table
        .rows
        .iter()
        .map(|row| {
            let mut detail = columns.read(table, row, "Grammy ceremony");
            detail.key = title_case(&strip_brackets(table.cell(row, Some(key))));
            detail
        })
        .collect())
}

/// Regional ceremonies, keyed by year, reshaped to the primary detail schema
/// with an empty network
pub fn regional_details(table: &Table) -> Result<Vec<CeremonyDetail>, SchemaError> {
    let key = table
        .column("Year")
        .ok_or_else(|| SchemaError::missing("Latin Grammy ceremony", "Year", table))?;
    let columns = DetailColumns {
        date: table.column("Date"),
        venue: table.column("Venue"),
        venue_city: table.column_any(&["Host City", "Venue City", "City"]),
        host: table.column_any(&["Host(s)", "Host", "Hosts"]),
        network: None,
        viewers: table.column(VIEWERS_COLUMN),
    };
    warn_missing("Latin Grammy ceremony", &columns, false);

    Ok(table
        .rows
        .iter()
        .map(|row| {
            let mut detail = columns.read(table, row, "Latin Grammy ceremony");
            detail.key = strip_brackets(table.cell(row, Some(key))).trim().to_string();
            detail
        })
        .collect())
}

struct DetailColumns {
    date: Option<usize>,
    venue: Option<usize>,
    venue_city: Option<usize>,
    host: Option<usize>,
    network: Option<usize>,
    viewers: Option<usize>,
}

impl DetailColumns {
    fn read(&self, table: &Table, row: &[String], page: &str) -> CeremonyDetail {
        let text = |col: Option<usize>| strip_brackets(table.cell(row, col)).trim().to_string();
        let raw_viewers = table.cell(row, self.viewers);
        let viewers_millions = try_parse_viewers(raw_viewers).unwrap_or_else(|| {
            warn!("{}: unreadable viewer figure {:?}, using 0", page, raw_viewers);
            0.0
        });
        CeremonyDetail {
            key: String::new(),
            date: text(self.date),
            venue: text(self.venue),
            venue_city: text(self.venue_city),
            host: text(self.host),
            network: text(self.network),
            viewers_millions,
        }
    }
}

fn warn_missing(page: &str, columns: &DetailColumns, expects_network: bool) {
    let mut missing = Vec::new();
    if columns.date.is_none() {
        missing.push("Date");
    }
    if columns.venue.is_none() {
        missing.push("Venue");
    }
    if columns.venue_city.is_none() {
        missing.push("Venue City");
    }
    if columns.host.is_none() {
        missing.push("Host");
    }
    if expects_network && columns.network.is_none() {
        missing.push("Network");
    }
    if columns.viewers.is_none() {
        missing.push(VIEWERS_COLUMN);
    }
    if !missing.is_empty() {
        warn!("{} table missing columns: {}", page, missing.join(", "));
    }
}

/// Keys that appear on more than one detail row; the first row wins on join
pub fn duplicate_keys(details: &[CeremonyDetail]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for detail in details {
        if !seen.insert(detail.key.as_str()) && !dupes.contains(&detail.key) {
            dupes.push(detail.key.clone());
        }
    }
    dupes
}
