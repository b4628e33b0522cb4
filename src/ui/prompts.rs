//! Confirmation before removing cache entries

use super::context::UiContext;
use super::theme::NightshiftTheme;
use crate::cache::{format_bytes, CacheEntry};
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::StepStatus;

/// List the entries about to be removed and ask before removing them.
///
/// Without a terminal the answer is no unless auto-yes is set.
pub async fn confirm_removal(ctx: &UiContext, entries: &[CacheEntry]) -> NightshiftResult<bool> {
    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let bullet = NightshiftTheme::status_style(StepStatus::Failed).apply_to("•");

    println!(
        "This will remove {} cache entr(ies), {}:",
        entries.len(),
        format_bytes(total)
    );
    for entry in entries {
        println!(
            "  {} {} ({}, {})",
            bullet,
            entry.key,
            entry.state,
            format_bytes(entry.size_bytes)
        );
    }
    println!();

    if ctx.auto_yes() {
        println!("  Removing (auto-approved)");
        return Ok(true);
    }
    if !ctx.is_interactive() {
        println!("  No terminal to confirm on; pass --yes to remove");
        return Ok(false);
    }

    let message = format!("Remove {} entr(ies)?", entries.len());
    // cliclack blocks on the terminal
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(false).interact()
    })
    .await
    .map_err(|e| NightshiftError::User(format!("Prompt task failed: {}", e)))?;

    answer.map_err(|e| NightshiftError::User(format!("Prompt failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheState;
    use chrono::Utc;

    fn entries() -> Vec<CacheEntry> {
        vec![CacheEntry {
            key: "nightshift-linux-stable-abc123def456".to_string(),
            state: CacheState::Complete,
            created_at: Utc::now(),
            paths: vec!["target".into()],
            size_bytes: 4096,
        }]
    }

    #[tokio::test]
    async fn auto_yes_removes() {
        let ctx = UiContext::non_interactive().with_auto_yes(true);
        assert!(confirm_removal(&ctx, &entries()).await.unwrap());
    }

    #[tokio::test]
    async fn unattended_run_keeps_entries() {
        let ctx = UiContext::non_interactive();
        assert!(!confirm_removal(&ctx, &entries()).await.unwrap());
    }
}
