//! Yearly index walker.
//!
//! One proceedings year lives at `<base_url>/paper_files/paper/<year>`; its
//! paper links follow the `-Abstract` convention. An unreachable index page
//! fails soft: the year is skipped with an error log and the run continues.

use scraper::{Html, Selector};
use tracing::{error, info, instrument};
use url::Url;

use crate::config::HarvestConfig;
use crate::fetch::Fetcher;
use crate::models::DocumentReference;

/// List the paper references on a year's index page, in page order.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn index_papers(
    fetcher: &Fetcher,
    config: &HarvestConfig,
    year: u16,
) -> Vec<DocumentReference> {
    let index_url = config.index_url(year);
    let base = match Url::parse(&config.base_url) {
        Ok(base) => base,
        Err(e) => {
            error!(base_url = %config.base_url, error = %e, "invalid base URL");
            return Vec::new();
        }
    };

    let Some(html) = fetcher.fetch_text(&index_url).await else {
        error!(%index_url, year, "failed to load index page, skipping year");
        return Vec::new();
    };

    let references = parse_index(&html, &base, year);
    info!(count = references.len(), year, "indexed paper references");
    references
}

fn parse_index(html: &str, base: &Url, year: u16) -> Vec<DocumentReference> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse(r#"ul.paper-list li a[href*="-Abstract"]"#).unwrap();

    doc.select(&link_sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let url = base.join(href).ok()?;
            let title = el.text().collect::<String>().trim().to_string();
            (!title.is_empty()).then(|| DocumentReference {
                title,
                source_url: url.to_string(),
                year,
            })
        })
        .collect()
}
