use console::style;
use glsync::SyncService;
use uuid::Uuid;

use crate::config::Config;

pub(crate) async fn handle_connect(
    service: &SyncService,
    config: &Config,
    user: Uuid,
    code: &str,
    redirect_uri: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let redirect_uri = redirect_uri
        .or_else(|| config.gitlab.redirect_uri.clone())
        .ok_or(
            "Redirect URI not configured. Pass --redirect-uri or set [gitlab].redirect_uri.",
        )?;

    let integration = service.connect(user, code, &redirect_uri).await?;

    println!(
        "{} Connected {} as {}",
        style("✓").green().bold(),
        style(user).cyan(),
        style(&integration.gitlab_username).bold(),
    );
    if let Some(email) = &integration.gitlab_email {
        println!("  email: {email}");
    }
    println!("  run `glsync sync --user {user}` to pull activity");

    Ok(())
}
