//! Command-line interface parsing for LeafWise
//!
//! This module defines the clap command tree: `scan` to classify a leaf
//! image and record it, `history` to list past scans, and `clear` to wipe
//! the history.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LeafWise - Classify maize leaf diseases and keep a scan history
#[derive(Parser, Debug)]
#[command(name = "leafwise")]
#[command(about = "Maize leaf disease scanner with a durable scan history")]
#[command(version)]
pub struct Cli {
    /// Base URL of the analysis backend
    #[arg(long, value_name = "URL", default_value = "http://localhost:5001")]
    pub backend: String,

    /// Store the scan history under this directory instead of the default
    /// data directory
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the LeafWise CLI
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a leaf image and record the result in the scan history
    Scan {
        /// Path to the leaf image (jpg, png, gif, webp, bmp)
        image: PathBuf,
    },
    /// List the recorded scans, most recent first
    History,
    /// Delete all recorded scans
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_scan_with_image() {
        let cli = Cli::parse_from(["leafwise", "scan", "leaf.jpg"]);
        match cli.command {
            Command::Scan { image } => assert_eq!(image, PathBuf::from("leaf.jpg")),
            other => panic!("Expected Scan command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_scan_requires_image() {
        let result = Cli::try_parse_from(["leafwise", "scan"]);
        assert!(result.is_err(), "scan without an image should fail to parse");
    }

    #[test]
    fn test_cli_parse_history() {
        let cli = Cli::parse_from(["leafwise", "history"]);
        assert!(matches!(cli.command, Command::History));
    }

    #[test]
    fn test_cli_parse_clear() {
        let cli = Cli::parse_from(["leafwise", "clear"]);
        assert!(matches!(cli.command, Command::Clear));
    }

    #[test]
    fn test_cli_default_backend() {
        let cli = Cli::parse_from(["leafwise", "history"]);
        assert_eq!(cli.backend, "http://localhost:5001");
        assert!(cli.data_dir.is_none());
    }

    #[test]
    fn test_cli_backend_override() {
        let cli = Cli::parse_from(["leafwise", "--backend", "http://10.0.0.2:8080", "history"]);
        assert_eq!(cli.backend, "http://10.0.0.2:8080");
    }

    #[test]
    fn test_cli_data_dir_override() {
        let cli = Cli::parse_from(["leafwise", "--data-dir", "/tmp/scans", "clear"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/scans")));
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        let result = Cli::try_parse_from(["leafwise", "bogus"]);
        assert!(result.is_err());
    }
}
