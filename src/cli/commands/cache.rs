//! Cache command - manage the dependency cache

use crate::cache::{
    compute_key, detect_manifests, format_bytes, CacheEntry, CacheState, CacheStore,
    LocalCacheStore,
};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::cli::commands::run::resolve_workspace;
use crate::config::{Config, ConfigManager};
use crate::error::NightshiftResult;
use crate::platform::Platform;
use crate::ui::{self, UiContext};
use chrono::Utc;
use console::style;
use std::path::PathBuf;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> NightshiftResult<()> {
    let store = local_store(config);

    match args.action {
        CacheAction::List { format } => list_entries(&store, format).await,
        CacheAction::Info { workspace } => show_workspace_info(&store, workspace, config).await,
        CacheAction::Gc { days, dry_run } => gc_entries(&store, config, days, dry_run).await,
        CacheAction::Clear { yes } => clear_entries(&store, yes).await,
    }
}

/// Store at the configured directory, or the platform cache dir
pub(crate) fn local_store(config: &Config) -> LocalCacheStore {
    LocalCacheStore::new(
        config
            .cache
            .dir
            .clone()
            .unwrap_or_else(ConfigManager::cache_dir),
    )
}

async fn list_entries(store: &LocalCacheStore, format: OutputFormat) -> NightshiftResult<()> {
    let entries = store.list().await?;

    if entries.is_empty() {
        println!("No cache entries in {}.", store.root().display());
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_entry_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_entry_table(entries: &[CacheEntry]) {
    println!(
        "{:<48} {:<10} {:<10} {:<20}",
        "KEY", "STATE", "SIZE", "CREATED"
    );
    println!("{}", "-".repeat(90));

    for entry in entries {
        let state = match entry.state {
            CacheState::Complete => style("complete").green().to_string(),
            CacheState::Building => style("building").yellow().to_string(),
            CacheState::Miss => style("miss").dim().to_string(),
        };

        println!(
            "{:<48} {:<10} {:<10} {:<20}",
            entry.key,
            state,
            format_bytes(entry.size_bytes),
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!();
    println!("Total: {} entr(ies), {}", entries.len(), format_bytes(total));
}

/// Show the key this workspace would use and whether it is cached
async fn show_workspace_info(
    store: &LocalCacheStore,
    workspace: Option<PathBuf>,
    config: &Config,
) -> NightshiftResult<()> {
    let ctx = UiContext::detect();
    let workspace = resolve_workspace(workspace)?;
    let platform = Platform::detect()?;

    ui::key_value(&ctx, "Workspace", &workspace.display().to_string());
    ui::key_value(&ctx, "Store", &store.root().display().to_string());
    if !config.cache.enabled {
        ui::step_warn(&ctx, "Caching is disabled (cache.enabled = false)");
    }

    let manifests = detect_manifests(&workspace, &config.cache.manifests)?;
    if manifests.is_empty() {
        ui::step_info(
            &ctx,
            &format!(
                "No manifests found (looked for {})",
                config.cache.manifests.join(", ")
            ),
        );
        return Ok(());
    }

    ui::section(&ctx, "Manifests");
    for info in &manifests {
        ui::key_value(&ctx, &info.name, &info.hash);
    }

    let key = compute_key(
        &workspace,
        &config.cache.manifests,
        &config.cache.prefix,
        platform,
        &config.provision.channel,
    )?;
    let Some(key) = key else {
        return Ok(());
    };

    ui::section(&ctx, "Entry");
    let key = key.as_string();
    match store.read_entry(&key) {
        Some(entry) => ui::key_value_status(
            &ctx,
            &key,
            &format!("{} ({})", entry.state, format_bytes(entry.size_bytes)),
            entry.state == CacheState::Complete,
        ),
        None => ui::key_value_status(&ctx, &key, "miss (next run saves it)", false),
    }

    Ok(())
}

/// Remove entries past the configured age
async fn gc_entries(
    store: &LocalCacheStore,
    config: &Config,
    days_override: Option<u32>,
    dry_run: bool,
) -> NightshiftResult<()> {
    let gc_days = days_override.unwrap_or(config.cache.gc_days);

    if gc_days == 0 {
        println!("Cache GC is disabled (gc_days = 0)");
        return Ok(());
    }

    let entries = store.list().await?;
    let to_remove = stale_entries(&entries, gc_days);

    if to_remove.is_empty() {
        println!("No cache entries older than {} days.", gc_days);
        return Ok(());
    }

    println!(
        "Found {} entr(ies) older than {} days:",
        to_remove.len(),
        gc_days
    );
    for entry in &to_remove {
        let age_days = (Utc::now() - entry.created_at).num_days();
        println!(
            "  {} {} ({} days old, {})",
            style("•").red(),
            entry.key,
            age_days,
            format_bytes(entry.size_bytes)
        );
    }

    if dry_run {
        println!();
        println!("Dry run - no entries removed.");
        return Ok(());
    }

    let mut freed = 0;
    for entry in &to_remove {
        debug!("Removing cache entry: {}", entry.key);
        store.remove(&entry.key).await?;
        freed += entry.size_bytes;
    }

    println!(
        "{} removed {} entr(ies), freed {}",
        style("✓").green(),
        to_remove.len(),
        format_bytes(freed)
    );

    Ok(())
}

fn stale_entries(entries: &[CacheEntry], days: u32) -> Vec<&CacheEntry> {
    entries
        .iter()
        .filter(|e| e.is_older_than_days(days))
        .collect()
}

/// Remove every entry after confirmation
async fn clear_entries(store: &LocalCacheStore, yes: bool) -> NightshiftResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let entries = store.list().await?;

    if entries.is_empty() {
        println!("No cache entries to clear.");
        return Ok(());
    }

    if !ui::confirm_removal(&ctx, &entries).await? {
        println!("Aborted.");
        return Ok(());
    }

    for entry in &entries {
        store.remove(&entry.key).await?;
    }

    ui::step_ok(&ctx, &format!("Cleared {} cache entr(ies)", entries.len()));
    Ok(())
}
