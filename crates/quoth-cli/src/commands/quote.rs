//! Quote command handlers

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tokio::sync::mpsc;

use quoth_core::{
    Config, HttpRemote, Outbox, Quote, QuoteError, QuoteId, QuoteRepository, SessionSlot,
    SyncEvent,
};

use super::notify;
use crate::output::Output;

/// Add a new quote, pushing it to the remote source when sync is enabled
pub async fn add(
    repo: &mut QuoteRepository,
    config: &Config,
    text: &str,
    category: &str,
    output: &Output,
) -> Result<()> {
    let quote = repo.add(text, category).map_err(notify)?;

    output.success(&format!("Added quote {}", quote.id));
    output.print_quote(&quote);

    if config.sync_enabled {
        push(quote, config, output).await;
    }

    Ok(())
}

/// Push one quote through the outbox and report how it went
///
/// The quote is already saved locally, so a failed push only warns.
async fn push(quote: Quote, config: &Config, output: &Output) {
    let remote = match HttpRemote::from_config(config) {
        Ok(remote) => Arc::new(remote),
        Err(e) => {
            output.warn(&e.notification());
            return;
        }
    };

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let outbox = Outbox::spawn(remote, events_tx);
    outbox.enqueue(quote);
    outbox.shutdown().await;

    while let Ok(event) = events_rx.try_recv() {
        match event {
            SyncEvent::Pushed(id) => {
                output.message(&format!("Pushed quote {} to {}", id, config.remote_url))
            }
            SyncEvent::PushFailed { id, error } => output.warn(&format!(
                "Quote {} was saved locally but could not be pushed: {}",
                id, error
            )),
            _ => {}
        }
    }
}

/// List quotes under a category filter
///
/// An explicit filter is remembered; without one the remembered filter is used.
pub fn list(repo: &QuoteRepository, category: Option<String>, output: &Output) -> Result<()> {
    let filter = match category {
        Some(filter) => {
            match repo.set_category_filter(&filter) {
                Ok(()) => {}
                Err(QuoteError::Validation { .. }) => bail!(
                    "Unknown category: {}\nRun `quoth categories` to see the available ones.",
                    filter
                ),
                // Listing still works if the preference can't be saved
                Err(e) => output.warn(&e.notification()),
            }
            filter
        }
        None => repo.category_filter(),
    };

    output.print_quotes(&repo.by_category(&filter), &filter);
    Ok(())
}

/// List all categories with their quote counts
pub fn categories(repo: &QuoteRepository, output: &Output) -> Result<()> {
    output.print_categories(&category_counts(repo));
    Ok(())
}

fn category_counts(repo: &QuoteRepository) -> Vec<(String, usize)> {
    repo.categories()
        .into_iter()
        .map(|name| {
            let count = repo.all().iter().filter(|q| q.category == name).count();
            (name, count)
        })
        .collect()
}

/// Show a single quote and record it as the last viewed one
pub fn show(repo: &QuoteRepository, config: &Config, id: u64, output: &Output) -> Result<()> {
    let quote = repo
        .get(QuoteId(id))
        .ok_or_else(|| anyhow!("Quote not found: {}", id))?;

    if let Err(e) = SessionSlot::new(config).store(quote) {
        output.warn(&format!("Could not remember the last viewed quote: {}", e));
    }

    output.print_quote(quote);
    Ok(())
}

/// Show or clear the last viewed quote of this session
pub fn last(config: &Config, clear: bool, output: &Output) -> Result<()> {
    let slot = SessionSlot::new(config);

    if clear {
        slot.clear()?;
        output.success("Cleared last viewed quote");
        return Ok(());
    }

    match slot.load() {
        Some(quote) => output.print_quote(&quote),
        None => output.message("No quote viewed in this session."),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().join("data"),
            session_dir: temp_dir.path().join("session"),
            ..Config::default()
        }
    }

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_category_counts() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.add("Knowledge is power.", "Education").unwrap();
        repo.add("Stay hungry.", "Motivation").unwrap();
        repo.add("Learn by doing.", "Education").unwrap();

        assert_eq!(
            category_counts(&repo),
            vec![("Education".to_string(), 2), ("Motivation".to_string(), 1)]
        );
    }

    #[test]
    fn test_list_remembers_filter() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.add("Knowledge is power.", "Education").unwrap();

        list(&repo, Some("Education".to_string()), &quiet()).unwrap();
        assert_eq!(repo.category_filter(), "Education");
    }

    #[test]
    fn test_list_unknown_category_fails() {
        let temp_dir = TempDir::new().unwrap();
        let repo = QuoteRepository::open_with_config(&test_config(&temp_dir));

        let err = list(&repo, Some("Nope".to_string()), &quiet()).unwrap_err();
        assert!(err.to_string().contains("Unknown category"));
    }

    #[test]
    fn test_show_records_last_viewed() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut repo = QuoteRepository::open_with_config(&config);
        let quote = repo.add("Knowledge is power.", "Education").unwrap();

        show(&repo, &config, quote.id.value(), &quiet()).unwrap();
        assert_eq!(SessionSlot::new(&config).load(), Some(quote));

        last(&config, true, &quiet()).unwrap();
        assert_eq!(SessionSlot::new(&config).load(), None);
    }

    #[test]
    fn test_show_missing_quote() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let repo = QuoteRepository::open_with_config(&config);

        assert!(show(&repo, &config, 42, &quiet()).is_err());
    }

    #[tokio::test]
    async fn test_add_rejects_blank_category() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut repo = QuoteRepository::open_with_config(&config);

        let err = add(&mut repo, &config, "Knowledge is power.", "  ", &quiet())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter both quote and category.");
        assert!(repo.is_empty());
    }
}
