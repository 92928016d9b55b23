//! Import and export command handlers

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use quoth_core::QuoteRepository;

use super::notify;
use crate::output::Output;

/// Append quotes from a JSON file
///
/// The file must hold a JSON array of quotes. One malformed record rejects
/// the whole file and nothing is appended.
pub fn import(repo: &mut QuoteRepository, file: &Path, output: &Output) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file {}", file.display()))?;

    let count = repo.import_json(&content).map_err(notify)?;

    output.success(&format!(
        "Imported {} quote(s) from {}",
        count,
        file.display()
    ));
    Ok(())
}

/// Export all quotes as pretty-printed JSON, to a file or stdout
pub fn export(repo: &QuoteRepository, file: Option<&Path>, output: &Output) -> Result<()> {
    let json = repo.export_json().map_err(notify)?;

    match file {
        Some(path) => {
            fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write export file {}", path.display()))?;
            output.success(&format!(
                "Exported {} quote(s) to {}",
                repo.len(),
                path.display()
            ));
        }
        None => println!("{}", json),
    }

    Ok(())
}
