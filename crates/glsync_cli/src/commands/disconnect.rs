use console::style;
use glsync::SyncService;
use uuid::Uuid;

pub(crate) async fn handle_disconnect(
    service: &SyncService,
    user: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    service.disconnect(user).await?;
    println!(
        "{} Disconnected {}. Stored activity and history are kept; reconnect anytime.",
        style("✓").green().bold(),
        style(user).cyan(),
    );
    Ok(())
}
