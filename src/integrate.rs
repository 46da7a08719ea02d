//! Joining nomination records with ceremony metadata and stacking both programs

use std::collections::HashMap;
use tracing::{info, warn};

use crate::details::duplicate_keys;
use crate::normalize::{
    collapse_whitespace, derive_artist, derive_title, sanitize_artist, sanitize_text, title_case,
};
use crate::types::{
    CanonicalDataset, CanonicalRecord, CeremonyDetail, NominationRecord, Program, RegionalRecord,
};

/// Detail rows by join key; the first row of a repeated key wins
fn index_details<'a>(
    details: &'a [CeremonyDetail],
    key: impl Fn(&CeremonyDetail) -> String,
) -> HashMap<String, &'a CeremonyDetail> {
    let mut index = HashMap::new();
    for detail in details {
        index.entry(key(detail)).or_insert(detail);
    }
    index
}

/// Left join: every record is kept exactly once, unmatched ones with null
/// detail fields
fn left_join(
    records: Vec<NominationRecord>,
    is_latin: bool,
    index: &HashMap<String, &CeremonyDetail>,
    key: impl Fn(&NominationRecord) -> String,
) -> (Vec<CanonicalRecord>, usize) {
    let mut unmatched = 0;
    let joined = records
        .into_iter()
        .map(|record| {
            let detail = index.get(&key(&record)).copied();
            if detail.is_none() {
                unmatched += 1;
            }
            CanonicalRecord::joined(record, is_latin, detail)
        })
        .collect();
    (joined, unmatched)
}

/// Join key of the primary program: title-cased with whitespace collapsed
fn title_key(title: &str) -> String {
    title_case(&collapse_whitespace(title))
}

/// Primary program rows joined on the title-cased ceremony title
pub fn join_primary(
    records: Vec<NominationRecord>,
    details: &[CeremonyDetail],
) -> Vec<CanonicalRecord> {
    let dupes = duplicate_keys(details);
    if !dupes.is_empty() {
        warn!("Repeated Grammy ceremony titles, first row used: {}", dupes.join(", "));
    }
    let index = index_details(details, |d| title_key(&d.key));
    let records: Vec<NominationRecord> = records
        .into_iter()
        .map(|mut r| {
            r.title = title_key(&r.title);
            r
        })
        .collect();
    let total = records.len();
    let (joined, unmatched) = left_join(records, Program::Grammy.is_latin(), &index, |r| r.title.clone());
    if unmatched > 0 {
        warn!("{} of {} Grammy records have no ceremony details", unmatched, total);
    }
    joined
}

/// Regional rows with derived title and artist, joined on year
pub fn join_regional(
    records: Vec<RegionalRecord>,
    details: &[CeremonyDetail],
) -> Vec<CanonicalRecord> {
    let dupes = duplicate_keys(details);
    if !dupes.is_empty() {
        warn!("Repeated Latin Grammy ceremony years, first row used: {}", dupes.join(", "));
    }
    let index = index_details(details, |d| d.key.trim().to_string());
    let nominations: Vec<NominationRecord> = records.into_iter().map(regional_nomination).collect();
    let total = nominations.len();
    let (joined, unmatched) = left_join(nominations, Program::Latin.is_latin(), &index, |r| r.year.trim().to_string());
    if unmatched > 0 {
        warn!("{} of {} Latin Grammy records have no ceremony details", unmatched, total);
    }
    joined
}

/// Regional winners-table row in the nomination shape: every row is a winner
fn regional_nomination(record: RegionalRecord) -> NominationRecord {
    NominationRecord {
        title: derive_title(&record.year),
        artist: derive_artist(&record.winners),
        year: record.year,
        category: record.category,
        nominee: record.title,
        worker: record.winners,
        is_winner: true,
    }
}

/// Strip unwanted characters from the free-text columns
pub fn sanitize(record: &mut CanonicalRecord) {
    record.nominee = sanitize_text(&record.nominee);
    record.artist = sanitize_artist(&record.artist);
    record.worker = sanitize_text(&record.worker);
}

/// Build the canonical dataset: primary rows first, then regional rows
pub fn integrate(
    primary_records: Vec<NominationRecord>,
    primary_details: &[CeremonyDetail],
    regional_records: Vec<RegionalRecord>,
    regional_details: &[CeremonyDetail],
) -> CanonicalDataset {
    let primary = join_primary(primary_records, primary_details);
    let regional = join_regional(regional_records, regional_details);
    info!(
        "Integrated {} Grammy and {} Latin Grammy rows",
        primary.len(),
        regional.len()
    );

    let mut dataset: CanonicalDataset = primary;
    dataset.extend(regional);
    for record in &mut dataset {
        sanitize(record);
    }
    dataset
}
