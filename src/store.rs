//! Dual-format metadata persistence.
//!
//! Every appended [`PaperRecord`] lands in two places: an append-only CSV
//! (header written once, when the file is created) and a JSON array that is
//! rewritten in full on each append. The JSON store is the source of truth
//! for deduplication; the CSV exists for spreadsheet consumers.
//!
//! The JSON rewrite goes through a `.tmp` file in the same directory and an
//! atomic rename, so a crash mid-write leaves either the old store or the
//! new one, never a truncated file.
//!
//! A structured store that exists but does not parse is treated as empty for
//! dedup purposes (logged, never fatal): a rerun re-harvests rather than
//! aborting. The layer itself never deduplicates; callers guard appends with
//! [`MetadataStore::known_titles`].

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::models::PaperRecord;

pub struct MetadataStore {
    csv_path: PathBuf,
    json_path: PathBuf,
}

impl MetadataStore {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            csv_path: config.csv_file.clone(),
            json_path: config.json_file.clone(),
        }
    }

    /// All titles currently recorded in the JSON store.
    ///
    /// A missing store is an empty set; an unreadable or malformed store is
    /// logged and also treated as empty.
    #[instrument(level = "debug", skip(self))]
    pub async fn known_titles(&self) -> HashSet<String> {
        match tokio::fs::read_to_string(&self.json_path).await {
            Ok(raw) => match serde_json::from_str::<Vec<PaperRecord>>(&raw) {
                Ok(records) => records.into_iter().map(|r| r.title).collect(),
                Err(e) => {
                    warn!(
                        path = %self.json_path.display(),
                        error = %e,
                        "metadata store is not valid JSON; treating as empty"
                    );
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                warn!(
                    path = %self.json_path.display(),
                    error = %e,
                    "could not read metadata store; treating as empty"
                );
                HashSet::new()
            }
        }
    }

    /// Append one record to both stores.
    ///
    /// Callers are expected to have checked [`Self::known_titles`] first.
    /// I/O failures here are fatal to the run.
    #[instrument(level = "debug", skip_all, fields(title = %record.title))]
    pub async fn append(&self, record: &PaperRecord) -> Result<()> {
        self.append_csv(record)?;
        self.append_json(record).await?;
        debug!("record appended to both stores");
        Ok(())
    }

    /// Read the full JSON store for the annotation pass.
    pub async fn load_all(&self) -> Result<Vec<PaperRecord>> {
        let raw = tokio::fs::read_to_string(&self.json_path)
            .await
            .map_err(|e| HarvestError::io(&self.json_path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            HarvestError::Store(format!(
                "malformed metadata store {}: {e}",
                self.json_path.display()
            ))
        })
    }

    fn append_csv(&self, record: &PaperRecord) -> Result<()> {
        ensure_parent(&self.csv_path)?;
        let write_header = !self.csv_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| HarvestError::io(&self.csv_path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer
            .serialize(record)
            .map_err(|e| HarvestError::Store(format!("CSV append failed: {e}")))?;
        writer
            .flush()
            .map_err(|e| HarvestError::io(&self.csv_path, e))?;
        Ok(())
    }

    async fn append_json(&self, record: &PaperRecord) -> Result<()> {
        ensure_parent(&self.json_path)?;
        let mut records = match tokio::fs::read_to_string(&self.json_path).await {
            Ok(raw) => serde_json::from_str::<Vec<PaperRecord>>(&raw).unwrap_or_else(|e| {
                warn!(
                    path = %self.json_path.display(),
                    error = %e,
                    "existing store unreadable; starting a fresh array"
                );
                Vec::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(HarvestError::io(&self.json_path, e)),
        };
        records.push(record.clone());

        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| HarvestError::Store(format!("JSON encode failed: {e}")))?;

        let tmp = self.json_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| HarvestError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.json_path)
            .await
            .map_err(|e| HarvestError::io(&self.json_path, e))?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
    }
    Ok(())
}
