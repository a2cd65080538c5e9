use chrono::{Duration, Utc};
use console::style;
use glsync::store::CommitFilter;
use glsync::SyncService;
use uuid::Uuid;

pub(crate) async fn handle_commits(
    service: &SyncService,
    user: Uuid,
    project: Option<i64>,
    since_days: Option<i64>,
    limit: u64,
    refresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = CommitFilter {
        project_id: project,
        since: since_days.map(|d| Utc::now() - Duration::days(d)),
        until: None,
        limit: Some(limit),
    };

    let commits = service.list_commits(user, &filter, refresh).await?;
    if commits.is_empty() {
        println!("No stored commits match. Try `glsync sync --user {user}` first.");
        return Ok(());
    }

    for commit in &commits {
        let (additions, deletions) = commit.line_churn();
        println!(
            "{} {} {} {}",
            style(commit.occurred_at.format("%Y-%m-%d %H:%M")).dim(),
            style(&commit.external_id[..commit.external_id.len().min(8)]).yellow(),
            commit.title,
            style(format!("+{additions} -{deletions}")).dim(),
        );
        println!("         {}", style(&commit.project_name).cyan());
    }
    println!("{} commits", commits.len());

    Ok(())
}
