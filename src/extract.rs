//! Paper page extraction.
//!
//! [`parse_paper`] is a pure HTML → fields function; [`Extractor`] wraps it
//! with title cleaning and the PDF download side effect. A page without a
//! title yields no record at all. A failed PDF download is logged and does
//! not fail extraction; the record still carries the remote URL.

use std::path::PathBuf;

use scraper::{ElementRef, Html, Selector};
use tracing::{instrument, warn};
use url::Url;

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::fetch::Fetcher;
use crate::models::{ABSTRACT_UNAVAILABLE, AUTHORS_UNAVAILABLE, PDF_UNAVAILABLE, PaperRecord};
use crate::utils::clean_filename;

/// PDF link patterns, tried in order; first match wins.
const PDF_LINK_SELECTORS: [&str; 2] = [
    r#"a.btn[href*="Paper.pdf"]"#,
    r#"a.btn[href*="Paper-Conference.pdf"]"#,
];

/// Raw fields parsed out of one paper page.
#[derive(Debug)]
pub struct ParsedPaper {
    pub title: Option<String>,
    pub pdf_href: Option<String>,
    pub authors: String,
    pub abstract_text: String,
}

/// Parse a paper page into its metadata fields.
///
/// Authors and abstract come from the text block immediately following the
/// matching `<h4>` heading, falling back to their sentinels when the section
/// is absent.
pub fn parse_paper(html: &str) -> ParsedPaper {
    let doc = Html::parse_document(html);

    let title_sel = Selector::parse("title").unwrap();
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let pdf_href = PDF_LINK_SELECTORS.iter().find_map(|css| {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string)
    });

    let authors = section_after_heading(&doc, "Authors")
        .unwrap_or_else(|| AUTHORS_UNAVAILABLE.to_string());
    let abstract_text = section_after_heading(&doc, "Abstract")
        .unwrap_or_else(|| ABSTRACT_UNAVAILABLE.to_string());

    ParsedPaper {
        title,
        pdf_href,
        authors,
        abstract_text,
    }
}

/// Text of the first `<p>` sibling after the `<h4>` with the given text.
fn section_after_heading(doc: &Html, heading: &str) -> Option<String> {
    let h4 = Selector::parse("h4").unwrap();
    doc.select(&h4)
        .find(|el| el.text().collect::<String>().trim() == heading)
        .and_then(|el| {
            el.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "p")
        })
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Turns fetched paper pages into [`PaperRecord`]s, downloading the PDF
/// under the cleaned title as it goes.
pub struct Extractor {
    fetcher: Fetcher,
    base_url: Url,
    download_dir: PathBuf,
}

impl Extractor {
    pub fn new(config: &HarvestConfig, fetcher: Fetcher) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| HarvestError::Config(format!("invalid base_url: {e}")))?;
        Ok(Self {
            fetcher,
            base_url,
            download_dir: config.download_dir.clone(),
        })
    }

    /// Extract one paper's record from its page HTML.
    ///
    /// Errors with [`HarvestError::MissingData`] when the page has no title;
    /// the caller skips the document. Filesystem errors from the download
    /// propagate, everything else degrades to a logged warning.
    #[instrument(level = "debug", skip(self, html))]
    pub async fn extract(&self, html: &str, year: u16) -> Result<PaperRecord> {
        let parsed = parse_paper(html);

        let title = parsed
            .title
            .as_deref()
            .map(clean_filename)
            .filter(|t| !t.is_empty())
            .ok_or(HarvestError::MissingData("page title"))?;

        let pdf_url = parsed
            .pdf_href
            .as_deref()
            .and_then(|href| self.base_url.join(href).ok())
            .map(String::from);

        match &pdf_url {
            Some(url) => {
                let dest = self.download_dir.join(format!("{title}.pdf"));
                match self.fetcher.fetch_pdf(url, &dest).await {
                    Ok(()) => {}
                    Err(e @ HarvestError::Io { .. }) => return Err(e),
                    Err(e) => {
                        warn!(%url, title = %title, error = %e, "PDF download failed; keeping metadata")
                    }
                }
            }
            None => warn!(title = %title, "no PDF link on page"),
        }

        Ok(PaperRecord {
            year,
            title,
            authors: parsed.authors,
            abstract_text: parsed.abstract_text,
            pdf_url: pdf_url.unwrap_or_else(|| PDF_UNAVAILABLE.to_string()),
        })
    }
}
