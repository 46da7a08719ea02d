//! Dataset files and terminal links

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::types::{CanonicalRecord, CANONICAL_COLUMNS};

/// UTF-8 byte-order mark; spreadsheet tools need it to detect the encoding
const BOM: &[u8] = "\u{FEFF}".as_bytes();

/// An encoded output file, held in memory until every output of a run has
/// encoded successfully
#[derive(Debug)]
pub struct Artifact {
    pub path: PathBuf,
    bytes: Vec<u8>,
}

impl Artifact {
    /// Write the BOM and the encoded bytes, creating parent directories
    pub fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(BOM)?;
        writer.write_all(&self.bytes)?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// The dataset as one JSON array of records
pub fn json_artifact(path: &Path, records: &[CanonicalRecord]) -> Result<Artifact> {
    let bytes = serde_json::to_vec(records)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    Ok(Artifact {
        path: path.to_path_buf(),
        bytes,
    })
}

/// The dataset as CSV with the canonical header
pub fn csv_artifact(path: &Path, records: &[CanonicalRecord]) -> Result<Artifact> {
    let mut csv = csv::Writer::from_writer(Vec::new());
    csv.write_record(CANONICAL_COLUMNS)?;
    for record in records {
        csv.write_record(record.to_row())?;
    }
    let bytes = csv
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to encode {}: {}", path.display(), e))?;
    Ok(Artifact {
        path: path.to_path_buf(),
        bytes,
    })
}

/// Write every artifact, or none: when one fails, the ones already written are
/// removed again. Returns the failing path with the error.
pub fn write_all(artifacts: &[Artifact]) -> std::result::Result<(), (PathBuf, anyhow::Error)> {
    for (done, artifact) in artifacts.iter().enumerate() {
        if let Err(e) = artifact.write() {
            for written in &artifacts[..done] {
                if let Err(remove) = fs::remove_file(&written.path) {
                    warn!("Failed to remove {}: {}", written.path.display(), remove);
                }
            }
            return Err((artifact.path.clone(), e));
        }
    }
    Ok(())
}

/// Create an OSC8 hyperlink for terminal output
pub fn osc8_link(url: &str, text: &str) -> String {
    format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
}

/// Create an OSC8 file:// hyperlink for terminal output
pub fn osc8_file_link(path: &Path) -> String {
    let abs_path = fs::canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.display().to_string());
    format!(
        "\x1b]8;;file://{}\x1b\\{}\x1b]8;;\x1b\\",
        abs_path,
        path.display()
    )
}
