//! Nomination records from rendered ceremony pages
//!
//! Primary program pages carry no semantic markup, so sections are found by
//! their exact `class` attribute. Missing or empty elements become "NA".

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::details::SchemaError;
use crate::table::{parse_first_table, Table};
use crate::types::{NominationRecord, RegionalRecord, NA};

const HEADING: &str = r#"h1[class="text-grammy-gold font-polaris uppercase text-30 md-xl:text-42 font-thin leading-tight mb-25px"]"#;
const CATEGORY_SECTION: &str =
    r#"section[class="h-full w-full flex flex-col items-center mt-6 md-xl:mt-8"]"#;
const CATEGORY_LABEL: &str = r#"div[class="w-full text-left md-xl:text-right mb-1 md-xl:mb-20px text-14 md-xl:text-22 font-polaris uppercase"]"#;
const WINNER: &str = r#"div[class="w-full text-center md-xl:text-left text-17 md-xl:text-22 mr-10px md-xl:mr-30px font-polaris font-bold md-xl:leading-8 tracking-wider"]"#;
const WINNER_ARTIST: &str = "div.awards-category-link";
const WINNER_WORKER: &str = r#"div[class="mb-15px mt-30px text-left flex"]"#;
const NOMINEE_BLOCK: &str = r#"div[class="pt-15px flex flex-row md-xl:w-710px flex flex-row"]"#;
const NOMINEE: &str = r#"div[class="w-full text-left md-xl:text-22 text-17 mr-10px md-xl:mr-30px font-polaris font-bold md-xl:leading-8 tracking-wider flex flex-row justify-between"]"#;
const NOMINEE_ARTIST: &str = "div.awards-nominees-link";
const NOMINEE_WORKER: &str = "div.accordion__content";

struct CeremonySelectors {
    heading: Selector,
    section: Selector,
    category: Selector,
    winner: Selector,
    winner_artist: Selector,
    winner_worker: Selector,
    nominee_block: Selector,
    nominee: Selector,
    nominee_artist: Selector,
    nominee_worker: Selector,
}

impl CeremonySelectors {
    fn new() -> Self {
        let parse = |s: &str| Selector::parse(s).expect("valid ceremony selector");
        Self {
            heading: parse(HEADING),
            section: parse(CATEGORY_SECTION),
            category: parse(CATEGORY_LABEL),
            winner: parse(WINNER),
            winner_artist: parse(WINNER_ARTIST),
            winner_worker: parse(WINNER_WORKER),
            nominee_block: parse(NOMINEE_BLOCK),
            nominee: parse(NOMINEE),
            nominee_artist: parse(NOMINEE_ARTIST),
            nominee_worker: parse(NOMINEE_WORKER),
        }
    }
}

/// Text of the first element matching `selector` under `scope`, or "NA"
fn text_or_na(scope: ElementRef, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NA.to_string())
}

/// Records of one primary program ceremony page: per category the winner
/// first, then every nominee, in document order
pub fn extract_nominations(html: &str, ceremony_title: &str) -> Vec<NominationRecord> {
    let document = Html::parse_document(html);
    let sel = CeremonySelectors::new();
    let root = document.root_element();

    let heading = text_or_na(root, &sel.heading);
    let year = heading
        .split_whitespace()
        .next()
        .unwrap_or(NA)
        .to_string();

    let mut records = Vec::new();
    for section in document.select(&sel.section) {
        let category = text_or_na(section, &sel.category);

        records.push(NominationRecord {
            title: ceremony_title.to_string(),
            year: year.clone(),
            category: category.clone(),
            nominee: text_or_na(section, &sel.winner),
            artist: text_or_na(section, &sel.winner_artist),
            worker: text_or_na(section, &sel.winner_worker),
            is_winner: true,
        });

        for block in section.select(&sel.nominee_block) {
            records.push(NominationRecord {
                title: ceremony_title.to_string(),
                year: year.clone(),
                category: category.clone(),
                nominee: text_or_na(block, &sel.nominee),
                artist: text_or_na(block, &sel.nominee_artist),
                worker: text_or_na(block, &sel.nominee_worker),
                is_winner: false,
            });
        }
    }

    if records.is_empty() {
        warn!("No category sections found for {}", ceremony_title);
    }
    records
}

/// Number of category sections on a ceremony page
pub fn count_sections(html: &str) -> usize {
    let document = Html::parse_document(html);
    let sel = CeremonySelectors::new();
    document.select(&sel.section).count()
}

/// Rows of the regional program's winners table
pub fn extract_regional(html: &str) -> Result<Vec<RegionalRecord>, SchemaError> {
    const PAGE: &str = "Latin Grammy winners";
    let table = parse_first_table(html).ok_or_else(|| SchemaError {
        page: PAGE.to_string(),
        column: "<table>".to_string(),
        found: Vec::new(),
    })?;
    regional_records(&table, PAGE)
}

fn regional_records(table: &Table, page: &str) -> Result<Vec<RegionalRecord>, SchemaError> {
    let require = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| SchemaError::missing(page, name, table))
    };
    let year = require("Year")?;
    let title = require("Title")?;
    let winners = require("Winners")?;
    let category = table.column("Category");
    if category.is_none() {
        warn!("{} table has no Category column", page);
    }

    let or_na = |text: &str| {
        let text = text.trim();
        if text.is_empty() {
            NA.to_string()
        } else {
            text.to_string()
        }
    };

    Ok(table
        .rows
        .iter()
        .map(|row| RegionalRecord {
            year: or_na(table.cell(row, Some(year))),
            category: or_na(table.cell(row, category)),
            title: or_na(table.cell(row, Some(title))),
            winners: or_na(table.cell(row, Some(winners))),
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Ceremony page with two categories: winner + one nominee, winner alone
    pub const CEREMONY_PAGE: &str = r#"<html><body>
      <h1 class="text-grammy-gold font-polaris uppercase text-30 md-xl:text-42 font-thin leading-tight mb-25px">2024 GRAMMY Awards</h1>
      <section class="h-full w-full flex flex-col items-center mt-6 md-xl:mt-8">
        <div class="w-full text-left md-xl:text-right mb-1 md-xl:mb-20px text-14 md-xl:text-22 font-polaris uppercase">Album Of The Year</div>
        <div class="w-full text-center md-xl:text-left text-17 md-xl:text-22 mr-10px md-xl:mr-30px font-polaris font-bold md-xl:leading-8 tracking-wider">Midnights</div>
        <div class="awards-category-link">Taylor Swift</div>
        <div class="mb-15px mt-30px text-left flex">Jack Antonoff, producer</div>
        <div class="pt-15px flex flex-row md-xl:w-710px flex flex-row">
          <div class="w-full text-left md-xl:text-22 text-17 mr-10px md-xl:mr-30px font-polaris font-bold md-xl:leading-8 tracking-wider flex flex-row justify-between">"World Music Radio"</div>
          <div class="awards-nominees-link">Jon Batiste</div>
          <div class="accordion__content">
            Jon Batiste, producer
          </div>
        </div>
      </section>
      <section class="h-full w-full flex flex-col items-center mt-6 md-xl:mt-8">
        <div class="w-full text-left md-xl:text-right mb-1 md-xl:mb-20px text-14 md-xl:text-22 font-polaris uppercase">Best New Artist</div>
        <div class="w-full text-center md-xl:text-left text-17 md-xl:text-22 mr-10px md-xl:mr-30px font-polaris font-bold md-xl:leading-8 tracking-wider">Victoria Monét</div>
        <div class="awards-category-link"></div>
      </section>
    </body></html>"#;
}
