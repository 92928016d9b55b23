//! Status command handler

use anyhow::Result;

use quoth_core::{Config, Origin, QuoteRepository, SessionSlot};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(repo: &QuoteRepository, config: &Config, output: &Output) -> Result<()> {
    let remote_count = repo
        .all()
        .iter()
        .filter(|q| q.origin == Origin::Remote)
        .count();
    let local_count = repo.len() - remote_count;
    let category_count = repo.categories().len();
    let category_filter = repo.category_filter();
    let last_viewed = SessionSlot::new(config).load().map(|q| q.id);
    let quotes_path = repo.store().quotes_path();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage": {
                        "data_dir": config.data_dir,
                        "quotes_file": quotes_path,
                        "quotes_file_exists": repo.store().exists(),
                        "unsaved_changes": repo.is_dirty()
                    },
                    "sync": {
                        "enabled": config.sync_enabled,
                        "remote_url": config.remote_url,
                        "interval_secs": config.sync_interval_secs,
                        "fetch_limit": config.fetch_limit
                    },
                    "counts": {
                        "quotes": repo.len(),
                        "local": local_count,
                        "remote": remote_count,
                        "categories": category_count
                    },
                    "category_filter": category_filter,
                    "last_viewed": last_viewed
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", repo.len());
        }
        OutputFormat::Human => {
            println!("Quoth Status");
            println!("============");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  File:     {}", quotes_path.display());
            if repo.is_dirty() {
                println!("  ⚠ Unsaved changes in memory");
            }
            println!();
            println!("Sync:");
            println!(
                "  Status:   {}",
                if config.sync_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("  Server:   {}", config.remote_url);
            println!("  Interval: {}s", config.sync_interval_secs);
            println!();
            println!("Contents:");
            println!(
                "  Quotes:     {} ({} local, {} from server)",
                repo.len(),
                local_count,
                remote_count
            );
            println!("  Categories: {}", category_count);
            println!("  Filter:     {}", category_filter);
            if let Some(id) = last_viewed {
                println!("  Last viewed: {}", id);
            }
        }
    }

    Ok(())
}
