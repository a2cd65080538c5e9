use console::style;
use glsync::{SyncReport, SyncService};
use uuid::Uuid;

pub(crate) async fn handle_sync(
    service: &SyncService,
    user: Option<Uuid>,
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match (user, all) {
        (Some(user), false) => {
            println!("Syncing {user}...");
            let report = service.sync_now(user).await?;
            print_report(&report);
            Ok(())
        }
        (None, true) => {
            println!("Syncing all active integrations...");
            let run = service.run_scheduled_sync().await?;
            println!(
                "{} {} attempted, {} completed, {} failed",
                style("✓").green().bold(),
                run.attempted,
                run.completed(),
                run.failed(),
            );
            for (user_id, result) in &run.results {
                match result {
                    Ok(report) if report.is_clean() => {
                        println!("  {} {user_id}: {} records", style("✓").green(), report.total());
                    }
                    Ok(report) => {
                        println!(
                            "  {} {user_id}: {} records, {} errors",
                            style("!").yellow(),
                            report.total(),
                            report.errors.len(),
                        );
                    }
                    Err(err) => {
                        println!("  {} {user_id}: {err}", style("✗").red());
                    }
                }
            }
            Ok(())
        }
        _ => Err("Specify either --user <id> or --all.".into()),
    }
}

fn print_report(report: &SyncReport) {
    let marker = if report.is_clean() {
        style("✓").green().bold()
    } else {
        style("!").yellow().bold()
    };
    println!(
        "{marker} synced window {} .. {}",
        report.window.since.to_rfc3339(),
        report.window.until.to_rfc3339()
    );
    println!(
        "  commits:        {} created, {} updated",
        report.commits.created, report.commits.updated
    );
    println!(
        "  issues:         {} created, {} updated",
        report.issues.created, report.issues.updated
    );
    println!(
        "  merge requests: {} created, {} updated",
        report.merge_requests.created, report.merge_requests.updated
    );

    for warning in &report.warnings {
        println!("  {} {warning}", style("warning:").yellow());
    }
    for error in &report.errors {
        println!("  {} {error}", style("error:").red());
    }
}
