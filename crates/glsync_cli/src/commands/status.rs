use console::style;
use glsync::SyncService;
use uuid::Uuid;

pub(crate) async fn handle_status(
    service: &SyncService,
    user: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = service.connection_status(user).await?;

    if !status.connected {
        println!("{} {} is not connected", style("✗").red().bold(), user);
        if status.gitlab_username.is_some() {
            println!("  a previous integration exists; reconnect with `glsync connect`");
        }
        return Ok(());
    }

    println!("{} {} is connected", style("✓").green().bold(), user);
    if let Some(username) = &status.gitlab_username {
        println!("  GitLab user:     {username}");
    }
    println!(
        "  token:           {}",
        if status.token_expired {
            style("expired (will refresh on next sync)").yellow().to_string()
        } else {
            style("valid").green().to_string()
        }
    );
    println!(
        "  last sync:       {}",
        status
            .last_sync_at
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
    );
    println!(
        "  last successful: {}",
        status
            .last_successful_sync_at
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
    );
    println!("  tracked repos:   {}", status.tracked_repo_count);

    if !status.recent_errors.is_empty() {
        println!("  recent errors:");
        for entry in &status.recent_errors {
            println!(
                "    {} {}",
                style(entry.timestamp.to_rfc3339()).dim(),
                entry.error
            );
        }
    }

    Ok(())
}
