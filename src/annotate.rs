//! Category annotation pass.
//!
//! Runs independently of the scrape pipeline: reads the full JSON store,
//! asks the model for a category per paper, and writes a parallel CSV with
//! one extra `category` column. The source store is never touched.
//!
//! Classification failures map to the `"Uncategorized"` sentinel — a bad
//! batch entry must never abort the pass.

use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::api::{AskAsync, ChatClient, RetryAsk};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::models::{AnnotatedPaperRecord, UNCATEGORIZED};
use crate::store::MetadataStore;
use crate::utils::truncate_for_log;

/// Assigns one label from a closed set to a (title, abstract) pair.
pub struct Classifier<A> {
    api: A,
    categories: Vec<String>,
}

impl<A> Classifier<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(api: A, categories: Vec<String>) -> Self {
        Self { api, categories }
    }

    fn prompt(&self, title: &str, abstract_text: &str) -> String {
        format!(
            "The following research paper has a title and an abstract. \
             Classify the paper into one of these categories: {}.\n\n\
             Title: {title}\nAbstract: {abstract_text}\n\nCategory:",
            self.categories.join(", ")
        )
    }

    /// Classify one paper. Never fails: any call-level problem, or an empty
    /// answer, yields [`UNCATEGORIZED`].
    pub async fn classify(&self, title: &str, abstract_text: &str) -> String {
        let prompt = self.prompt(title, abstract_text);
        match self.api.ask(&prompt).await {
            Ok(answer) => {
                let label = answer.trim();
                if label.is_empty() {
                    warn!(title, "model returned an empty label");
                    UNCATEGORIZED.to_string()
                } else {
                    label.to_string()
                }
            }
            Err(e) => {
                warn!(title, error = %e, "classification failed");
                UNCATEGORIZED.to_string()
            }
        }
    }
}

/// Annotate every record in `input` (a JSON metadata store) and write the
/// result to `output` as CSV. Entries are processed sequentially.
#[instrument(level = "info", skip(config), fields(input = %input.display(), output = %output.display()))]
pub async fn run_annotation(config: &HarvestConfig, input: &Path, output: &Path) -> Result<()> {
    let store = MetadataStore::new(&HarvestConfig {
        json_file: input.to_path_buf(),
        ..config.clone()
    });
    let records = store.load_all().await?;
    info!(count = records.len(), "annotating records");

    let chat = ChatClient::new(config)?;
    let api = RetryAsk::new(chat, 2, Duration::from_secs(1));
    let classifier = Classifier::new(api, config.categories.clone());

    let annotated: Vec<AnnotatedPaperRecord> = stream::iter(records)
        .then(|record| {
            let classifier = &classifier;
            async move {
                let category = classifier
                    .classify(&record.title, &record.abstract_text)
                    .await;
                info!(
                    title = %truncate_for_log(&record.title, 80),
                    category = %category,
                    "annotated"
                );
                AnnotatedPaperRecord::new(record, category)
            }
        })
        .collect()
        .await;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
    }
    let mut writer = csv::Writer::from_path(output).map_err(|e| {
        HarvestError::Store(format!("cannot open {} for writing: {e}", output.display()))
    })?;
    for row in &annotated {
        writer
            .serialize(row)
            .map_err(|e| HarvestError::Store(format!("CSV write failed: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| HarvestError::io(output, e))?;

    info!(count = annotated.len(), path = %output.display(), "annotated metadata written");
    Ok(())
}
