//! Small helpers shared across the pipeline: filename cleaning, log
//! truncation, and output-directory validation.

use std::error::Error;
use std::fs as stdfs;

use regex::Regex;
use tokio::fs;
use tracing::{info, instrument};

/// Characters that break filenames on at least one supported platform.
const ILLEGAL_FILENAME_CHARS: &str = r#"[/\\:*?"<>|]"#;

/// Maximum length of a cleaned title, in characters.
const MAX_TITLE_LEN: usize = 200;

/// Strip path-breaking characters from a title and bound its length.
///
/// The result is the stable storage key shared between a paper's metadata
/// record and its downloaded PDF's filename, so the same cleaning must be
/// applied everywhere a title is compared or written.
pub fn clean_filename(name: &str) -> String {
    let re = Regex::new(ILLEGAL_FILENAME_CHARS).unwrap();
    let cleaned = re.replace_all(name.trim(), "");
    cleaned.chars().take(MAX_TITLE_LEN).collect()
}

/// Truncate a string for logging, appending the elided byte count.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}…(+{} bytes)", cut, s.len() - cut.len())
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then probes it with a throwaway file.
/// Called once at startup so permission problems abort before any network
/// traffic happens.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &std::path::Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn clean_filename_strips_illegal_characters() {
        let cleaned = clean_filename("A/B:C?\"D");
        for c in ['/', '\\', ':', '*', '?', '"', '<', '>', '|'] {
            assert!(!cleaned.contains(c), "found illegal {c:?} in {cleaned:?}");
        }
        assert_eq!(cleaned, "ABCD");
    }

    #[test]
    fn clean_filename_bounds_length() {
        let long = "x".repeat(500);
        assert_eq!(clean_filename(&long).chars().count(), 200);
    }

    #[test]
    fn clean_filename_truncates_on_char_boundary() {
        let multibyte = "ß".repeat(300);
        let cleaned = clean_filename(&multibyte);
        assert_eq!(cleaned.chars().count(), 200);
        assert!(cleaned.chars().all(|c| c == 'ß'));
    }

    #[test]
    fn clean_filename_trims_whitespace() {
        assert_eq!(clean_filename("  Deep Nets  "), "Deep Nets");
    }

    #[test]
    fn truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[tokio::test]
    async fn ensure_writable_dir_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn ensure_writable_dir_rejects_unwritable_path() {
        // A file where a directory is expected fails create_dir_all.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(ensure_writable_dir(Path::new(&blocker)).await.is_err());
    }
}
