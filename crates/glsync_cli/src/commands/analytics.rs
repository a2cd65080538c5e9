use console::style;
use glsync::store::DateRange;
use glsync::SyncService;
use uuid::Uuid;

pub(crate) async fn handle_analytics(
    service: &SyncService,
    user: Uuid,
    days: i64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = service.get_analytics(user, DateRange::last_days(days)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Activity over the last {days} days: {} records",
        style(report.total_activities).bold()
    );

    if report.stats.is_empty() {
        println!("Nothing recorded in this window.");
        return Ok(());
    }

    println!("\nBy kind:");
    for stats in &report.stats {
        println!(
            "  {:<14} {:>5}  (+{} -{}, {} projects)",
            stats.kind.to_string(),
            stats.count,
            stats.total_additions,
            stats.total_deletions,
            stats.project_count,
        );
    }

    println!("\nBy project:");
    for rollup in &report.project_rollup {
        println!(
            "  {:<40} {:>4} commits, {:>3} issues, {:>3} MRs  (+{} -{})",
            rollup.project_name,
            rollup.commits,
            rollup.issues,
            rollup.merge_requests,
            rollup.additions,
            rollup.deletions,
        );
    }

    println!("\nDaily trend:");
    for bucket in &report.daily_trend {
        println!("  {} {:<14} {}", bucket.date, bucket.kind.to_string(), bucket.count);
    }

    Ok(())
}
