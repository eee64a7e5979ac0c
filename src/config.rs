//! Runtime configuration for the harvest pipeline.
//!
//! Every component receives an explicit [`HarvestConfig`] at construction;
//! there is no process-wide state. The config can be loaded from a YAML file
//! or fall back to defaults that target the NeurIPS proceedings site.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Configuration for the scrape pipeline and the annotation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Base URL of the proceedings site.
    pub base_url: String,
    /// Directory PDFs are downloaded into.
    pub download_dir: PathBuf,
    /// Tabular metadata store (append-only CSV).
    pub csv_file: PathBuf,
    /// Structured metadata store (JSON array, rewritten on append).
    pub json_file: PathBuf,
    /// Output of the annotation pass.
    pub annotated_csv_file: PathBuf,
    /// Total attempts per HTTP request, including the first.
    pub fetch_retries: usize,
    /// Fixed delay between retry attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Pause between processed years, in seconds.
    pub year_pause_secs: u64,
    /// OpenAI-compatible API base, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    /// API key for the classifier endpoint.
    pub api_key: String,
    /// Model name sent with each classification request.
    pub model: String,
    /// Closed label set the classifier chooses from.
    pub categories: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://papers.nips.cc".into(),
            download_dir: PathBuf::from("papers"),
            csv_file: PathBuf::from("papers/metadata.csv"),
            json_file: PathBuf::from("papers/metadata.json"),
            annotated_csv_file: PathBuf::from("papers/annotated_metadata.csv"),
            fetch_retries: 3,
            retry_delay_secs: 5,
            request_timeout_secs: 300,
            year_pause_secs: 5,
            api_base: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".into(),
            categories: vec![
                "Deep Learning".into(),
                "Computer Vision".into(),
                "Reinforcement Learning".into(),
                "Natural Language Processing".into(),
                "Optimization".into(),
            ],
        }
    }
}

impl HarvestConfig {
    /// Load the config from a YAML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| HarvestError::io(p, e))?;
                serde_yaml::from_str(&raw)
                    .map_err(|e| HarvestError::Config(format!("{}: {e}", p.display())))
            }
            None => Ok(Self::default()),
        }
    }

    /// Index page for one year of the proceedings.
    pub fn index_url(&self, year: u16) -> String {
        format!(
            "{}/paper_files/paper/{year}",
            self.base_url.trim_end_matches('/')
        )
    }
}
