//! Award record types shared by the extractors, the integrator and the output writers

use serde::{Serialize, Serializer};
use std::str::FromStr;

/// Sentinel for a field whose source element was absent or empty
pub const NA: &str = "NA";

/// Column order of the integrated dataset. Both programs populate exactly these
/// fields; the CSV header and the JSON key order follow it.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "title",
    "year",
    "category",
    "nominee",
    "artist",
    "worker",
    "is_winner",
    "is_latin",
    "date",
    "venue",
    "venue_city",
    "host",
    "network",
    "viewers_millions",
];

/// Award program a row was harvested from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Grammy,
    Latin,
}

impl Program {
    pub fn as_str(&self) -> &'static str {
        match self {
            Program::Grammy => "grammy",
            Program::Latin => "latin",
        }
    }

    pub fn is_latin(&self) -> bool {
        matches!(self, Program::Latin)
    }
}

impl FromStr for Program {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grammy" | "primary" => Ok(Program::Grammy),
            "latin" | "regional" => Ok(Program::Latin),
            _ => Err(format!("unknown program {:?}, expected grammy or latin", s)),
        }
    }
}

/// One nominee or winner entry within one category of one ceremony
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NominationRecord {
    pub title: String,
    pub year: String,
    pub category: String,
    pub nominee: String,
    pub artist: String,
    pub worker: String,
    #[serde(serialize_with = "as_flag")]
    pub is_winner: bool,
}

/// One row of the regional program's winners table, before integration
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalRecord {
    pub year: String,
    pub category: String,
    /// Nominee-equivalent column ("Title" on the source page)
    pub title: String,
    /// Free-text credit line ("Winners" on the source page)
    pub winners: String,
}

/// Metadata for one ceremony, keyed by title (primary) or year (regional)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CeremonyDetail {
    pub key: String,
    pub date: String,
    pub venue: String,
    pub venue_city: String,
    pub host: String,
    pub network: String,
    pub viewers_millions: f64,
}

/// One row of the integrated dataset. Detail fields are `None` when the
/// nomination had no matching ceremony row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub title: String,
    pub year: String,
    pub category: String,
    pub nominee: String,
    pub artist: String,
    pub worker: String,
    #[serde(serialize_with = "as_flag")]
    pub is_winner: bool,
    #[serde(serialize_with = "as_flag")]
    pub is_latin: bool,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub venue_city: Option<String>,
    pub host: Option<String>,
    pub network: Option<String>,
    pub viewers_millions: Option<f64>,
}

impl CanonicalRecord {
    /// Build a row from its nomination fields and an optional detail match
    pub fn joined(
        nomination: NominationRecord,
        is_latin: bool,
        detail: Option<&CeremonyDetail>,
    ) -> Self {
        Self {
            title: nomination.title,
            year: nomination.year,
            category: nomination.category,
            nominee: nomination.nominee,
            artist: nomination.artist,
            worker: nomination.worker,
            is_winner: nomination.is_winner,
            is_latin,
            date: detail.map(|d| d.date.clone()),
            venue: detail.map(|d| d.venue.clone()),
            venue_city: detail.map(|d| d.venue_city.clone()),
            host: detail.map(|d| d.host.clone()),
            network: detail.map(|d| d.network.clone()),
            viewers_millions: detail.map(|d| d.viewers_millions),
        }
    }

    /// Field values in `CANONICAL_COLUMNS` order, nulls rendered empty
    pub fn to_row(&self) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            self.title.clone(),
            self.year.clone(),
            self.category.clone(),
            self.nominee.clone(),
            self.artist.clone(),
            self.worker.clone(),
            flag(self.is_winner).to_string(),
            flag(self.is_latin).to_string(),
            opt(&self.date),
            opt(&self.venue),
            opt(&self.venue_city),
            opt(&self.host),
            opt(&self.network),
            self.viewers_millions
                .map(|v| v.to_string())
                .unwrap_or_default(),
        ]
    }
}

/// The integrated, sanitized output of one run
pub type CanonicalDataset = Vec<CanonicalRecord>;

/// Ceremony page discovered on the listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyLink {
    pub title: String,
    pub url: String,
}

/// Boolean rendered the way the published dataset spells it
pub fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn as_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(flag(*value))
}
