//! Import subcommand for gtd-triage CLI
//!
//! Loads a JSON array of task records into the database.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to a JSON file containing an array of tasks
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Validate import without modifying database
    ///
    /// Parses the file and reports what would be inserted, replaced or
    /// skipped without making any changes.
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    /// Describe the import mode for logging
    pub fn import_mode(&self) -> &'static str {
        if self.dry_run { "dry-run" } else { "upsert" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_mode() {
        let args = ImportArgs {
            file: PathBuf::from("tasks.json"),
            dry_run: true,
        };
        assert_eq!(args.import_mode(), "dry-run");

        let args = ImportArgs {
            file: PathBuf::from("tasks.json"),
            dry_run: false,
        };
        assert_eq!(args.import_mode(), "upsert");
    }
}
