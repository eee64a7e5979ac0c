//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for the paper harvest tool.
///
/// # Examples
///
/// ```sh
/// # Scrape six years of proceedings
/// paper_harvest scrape --from-year 2018 --to-year 2023
///
/// # Annotate the harvested metadata
/// paper_harvest annotate
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API key for the classifier endpoint
    #[arg(long, env = "OPENAI_API_KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape paper metadata and PDFs for an inclusive range of years
    Scrape {
        /// First proceedings year to harvest
        #[arg(long)]
        from_year: u16,

        /// Last proceedings year to harvest
        #[arg(long)]
        to_year: u16,
    },
    /// Assign a category to every harvested paper via the configured model
    Annotate {
        /// JSON metadata store to read (defaults to the configured path)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Annotated CSV to write (defaults to the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scrape_years() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "scrape",
            "--from-year",
            "2018",
            "--to-year",
            "2023",
        ]);
        match cli.command {
            Command::Scrape { from_year, to_year } => {
                assert_eq!(from_year, 2018);
                assert_eq!(to_year, 2023);
            }
            _ => panic!("expected scrape subcommand"),
        }
    }

    #[test]
    fn parses_annotate_with_paths() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "annotate",
            "-i",
            "/tmp/in.json",
            "-o",
            "/tmp/out.csv",
        ]);
        match cli.command {
            Command::Annotate { input, output } => {
                assert_eq!(input.unwrap(), PathBuf::from("/tmp/in.json"));
                assert_eq!(output.unwrap(), PathBuf::from("/tmp/out.csv"));
            }
            _ => panic!("expected annotate subcommand"),
        }
    }

    #[test]
    fn annotate_paths_are_optional() {
        let cli = Cli::parse_from(["paper_harvest", "annotate"]);
        match cli.command {
            Command::Annotate { input, output } => {
                assert!(input.is_none());
                assert!(output.is_none());
            }
            _ => panic!("expected annotate subcommand"),
        }
    }
}
