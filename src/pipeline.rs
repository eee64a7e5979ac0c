//! Pipeline orchestration: index → fetch → extract → store, year by year.
//!
//! Strictly sequential by design; the target site and the fixed-delay retry
//! policy assume low concurrency. Per-document failures are logged and the
//! run continues; store and filesystem errors abort.
//!
//! Per reference the lifecycle is
//! `Discovered → Fetching → {Extracted → Stored} | Skipped | Failed`,
//! and no reference ever transitions back.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::HarvestConfig;
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::index::index_papers;
use crate::store::MetadataStore;
use crate::utils::clean_filename;

pub struct Pipeline {
    config: HarvestConfig,
    fetcher: Fetcher,
    extractor: Extractor,
    store: MetadataStore,
    year_pause: Duration,
}

impl Pipeline {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let fetcher = Fetcher::new(config)?;
        let extractor = Extractor::new(config, fetcher.clone())?;
        let store = MetadataStore::new(config);
        Ok(Self {
            config: config.clone(),
            fetcher,
            extractor,
            store,
            year_pause: Duration::from_secs(config.year_pause_secs),
        })
    }

    /// Process the given years in order, pausing between them to bound the
    /// request rate.
    pub async fn run(&self, years: impl IntoIterator<Item = u16>) -> Result<()> {
        let mut first = true;
        for year in years {
            if !first {
                debug!(pause_secs = self.year_pause.as_secs(), "pausing between years");
                sleep(self.year_pause).await;
            }
            first = false;
            self.run_year(year).await?;
        }
        info!("harvest complete");
        Ok(())
    }

    #[instrument(level = "info", skip(self))]
    async fn run_year(&self, year: u16) -> Result<()> {
        let references = index_papers(&self.fetcher, &self.config, year).await;

        // Refreshed per year so a rerun picks up everything persisted so far.
        let mut known = self.store.known_titles().await;

        let (mut stored, mut skipped, mut failed) = (0usize, 0usize, 0usize);
        for reference in references {
            let key = clean_filename(&reference.title);
            if known.contains(&key) {
                debug!(title = %reference.title, "already recorded, skipping");
                skipped += 1;
                continue;
            }

            let Some(html) = self.fetcher.fetch_text(&reference.source_url).await else {
                warn!(
                    url = %reference.source_url,
                    title = %reference.title,
                    "paper page unreachable; continuing with next reference"
                );
                failed += 1;
                continue;
            };

            let record = match self.extractor.extract(&html, reference.year).await {
                Ok(record) => record,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(url = %reference.source_url, error = %e, "skipping document");
                    failed += 1;
                    continue;
                }
            };

            // The page title is the stored key; it can differ from the index
            // link text, so it gets its own dedup check.
            if known.contains(&record.title) {
                debug!(title = %record.title, "duplicate title within run, skipping");
                skipped += 1;
                continue;
            }

            self.store.append(&record).await?;
            known.insert(key);
            known.insert(record.title.clone());
            stored += 1;
        }

        info!(year, stored, skipped, failed, "year complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paper_page(title: &str, abstract_text: &str) -> String {
        format!(
            "<html><head><title>{title}</title></head><body>\
             <h4>Authors</h4><p>A. Tester</p>\
             <h4>Abstract</h4><p>{abstract_text}</p></body></html>"
        )
    }

    async fn mock_site(server: &MockServer) {
        let index = r#"
            <ul class="paper-list">
                <li><a href="/paper_files/paper/2021/a-Abstract.html">Alpha Paper</a></li>
                <li><a href="/paper_files/paper/2021/b-Abstract.html">Beta Paper</a></li>
                <li><a href="/paper_files/paper/2021/c-Abstract.html">Alpha Paper</a></li>
            </ul>"#;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021/a-Abstract.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(paper_page("Alpha Paper", "aa")))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021/b-Abstract.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(paper_page("Beta Paper", "bb")))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021/c-Abstract.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(paper_page("Alpha Paper", "aa")))
            .mount(server)
            .await;
    }

    fn test_config(server: &MockServer, dir: &std::path::Path) -> HarvestConfig {
        HarvestConfig {
            base_url: server.uri(),
            download_dir: dir.join("pdfs"),
            csv_file: dir.join("metadata.csv"),
            json_file: dir.join("metadata.json"),
            fetch_retries: 1,
            retry_delay_secs: 0,
            request_timeout_secs: 5,
            year_pause_secs: 0,
            ..HarvestConfig::default()
        }
    }

    #[tokio::test]
    async fn duplicate_titles_within_a_run_are_stored_once() {
        let server = MockServer::start().await;
        mock_site(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, dir.path());

        let pipeline = Pipeline::new(&config).unwrap();
        pipeline.run([2021]).await.unwrap();

        let records = MetadataStore::new(&config).load_all().await.unwrap();
        let mut titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Alpha Paper", "Beta Paper"]);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let server = MockServer::start().await;
        mock_site(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, dir.path());

        let pipeline = Pipeline::new(&config).unwrap();
        pipeline.run([2021]).await.unwrap();
        pipeline.run([2021]).await.unwrap();

        let records = MetadataStore::new(&config).load_all().await.unwrap();
        assert_eq!(records.len(), 2, "rerun must not duplicate records");

        // CSV grew by exactly the same two rows as well
        let csv = std::fs::read_to_string(dir.path().join("metadata.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn unreachable_paper_page_does_not_stop_the_year() {
        let server = MockServer::start().await;
        let index = r#"
            <ul class="paper-list">
                <li><a href="/paper_files/paper/2021/dead-Abstract.html">Dead Paper</a></li>
                <li><a href="/paper_files/paper/2021/live-Abstract.html">Live Paper</a></li>
            </ul>"#;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021/dead-Abstract.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021/live-Abstract.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(paper_page("Live Paper", "x")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, dir.path());
        Pipeline::new(&config).unwrap().run([2021]).await.unwrap();

        let records = MetadataStore::new(&config).load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Live Paper");
    }

    #[tokio::test]
    async fn titleless_page_is_skipped_entirely() {
        let server = MockServer::start().await;
        let index = r#"
            <ul class="paper-list">
                <li><a href="/paper_files/paper/2021/bare-Abstract.html">Bare Paper</a></li>
            </ul>"#;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021/bare-Abstract.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>nothing</body></html>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, dir.path());
        Pipeline::new(&config).unwrap().run([2021]).await.unwrap();

        // no partial record was emitted
        assert!(MetadataStore::new(&config).known_titles().await.is_empty());
    }
}
