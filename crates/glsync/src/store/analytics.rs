//! Read-side aggregations over the activity store.
//!
//! All three views (per-kind stats, daily trend, per-project rollup) are
//! pure aggregations over the stored records; the upsert invariant makes
//! them correct under overlapping sync windows.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::entity::activity_kind::ActivityKind;
use crate::entity::activity_record::Model as ActivityModel;

use super::errors::Result;
use super::query::list_activities_in_range;

/// Default analytics window in days.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Half-open time window [start, end) for analytics reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// The last `days` days, ending now.
    #[must_use]
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::last_days(DEFAULT_RANGE_DAYS)
    }
}

/// Per-kind statistics within the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStats {
    pub kind: ActivityKind,
    pub count: u64,
    pub total_additions: i64,
    pub total_deletions: i64,
    /// Distinct projects touched.
    pub project_count: usize,
    /// Most recent activity timestamp.
    pub last_activity: Option<DateTime<Utc>>,
}

/// One (day, kind) bucket of the daily trend, ascending by day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub kind: ActivityKind,
    pub count: u64,
}

/// Per-project rollup, sorted by commit volume descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRollup {
    pub project_id: i64,
    pub project_name: String,
    pub commits: u64,
    pub issues: u64,
    pub merge_requests: u64,
    pub additions: i64,
    pub deletions: i64,
}

/// The full analytics report served to the dashboard layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub range: DateRange,
    pub total_activities: u64,
    pub stats: Vec<TypeStats>,
    pub daily_trend: Vec<DailyBucket>,
    pub project_rollup: Vec<ProjectRollup>,
}

/// Compute the analytics report for one user over a window.
pub async fn get_analytics(
    db: &DatabaseConnection,
    user_id: Uuid,
    range: DateRange,
) -> Result<AnalyticsReport> {
    let rows = list_activities_in_range(db, user_id, range.start, range.end).await?;
    Ok(compute_report(&rows, range))
}

/// Pure aggregation over fetched rows; separated for direct testing.
#[must_use]
pub fn compute_report(rows: &[ActivityModel], range: DateRange) -> AnalyticsReport {
    AnalyticsReport {
        range,
        total_activities: rows.len() as u64,
        stats: stats_by_type(rows),
        daily_trend: daily_trend(rows),
        project_rollup: project_rollup(rows),
    }
}

fn stats_by_type(rows: &[ActivityModel]) -> Vec<TypeStats> {
    struct Accum {
        count: u64,
        additions: i64,
        deletions: i64,
        projects: HashSet<i64>,
        last: Option<DateTime<Utc>>,
    }

    let mut by_kind: BTreeMap<ActivityKind, Accum> = BTreeMap::new();
    for row in rows {
        let entry = by_kind.entry(row.kind).or_insert(Accum {
            count: 0,
            additions: 0,
            deletions: 0,
            projects: HashSet::new(),
            last: None,
        });
        entry.count += 1;
        let (additions, deletions) = row.line_churn();
        entry.additions += additions;
        entry.deletions += deletions;
        entry.projects.insert(row.project_id);
        let occurred = row.occurred_at.with_timezone(&Utc);
        if entry.last.map_or(true, |last| occurred > last) {
            entry.last = Some(occurred);
        }
    }

    by_kind
        .into_iter()
        .map(|(kind, accum)| TypeStats {
            kind,
            count: accum.count,
            total_additions: accum.additions,
            total_deletions: accum.deletions,
            project_count: accum.projects.len(),
            last_activity: accum.last,
        })
        .collect()
}

fn daily_trend(rows: &[ActivityModel]) -> Vec<DailyBucket> {
    let mut buckets: BTreeMap<(NaiveDate, ActivityKind), u64> = BTreeMap::new();
    for row in rows {
        let date = row.occurred_at.with_timezone(&Utc).date_naive();
        *buckets.entry((date, row.kind)).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|((date, kind), count)| DailyBucket { date, kind, count })
        .collect()
}

fn project_rollup(rows: &[ActivityModel]) -> Vec<ProjectRollup> {
    let mut by_project: HashMap<i64, ProjectRollup> = HashMap::new();
    for row in rows {
        let entry = by_project
            .entry(row.project_id)
            .or_insert_with(|| ProjectRollup {
                project_id: row.project_id,
                project_name: row.project_name.clone(),
                commits: 0,
                issues: 0,
                merge_requests: 0,
                additions: 0,
                deletions: 0,
            });
        match row.kind {
            ActivityKind::Commit => entry.commits += 1,
            ActivityKind::Issue => entry.issues += 1,
            ActivityKind::MergeRequest => entry.merge_requests += 1,
            ActivityKind::Review | ActivityKind::Comment | ActivityKind::Push => {}
        }
        let (additions, deletions) = row.line_churn();
        entry.additions += additions;
        entry.deletions += deletions;
    }

    let mut rollup: Vec<ProjectRollup> = by_project.into_values().collect();
    rollup.sort_by(|a, b| b.commits.cmp(&a.commits).then(a.project_id.cmp(&b.project_id)));
    rollup
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn record(
        external_id: &str,
        kind: ActivityKind,
        project_id: i64,
        occurred_at: DateTime<Utc>,
        additions: i64,
        deletions: i64,
    ) -> ActivityModel {
        let now = Utc::now();
        let metadata = match kind {
            ActivityKind::Commit => json!({
                "sha": external_id,
                "additions": additions,
                "deletions": deletions
            }),
            _ => json!({}),
        };
        ActivityModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            kind,
            project_id,
            project_name: format!("project-{project_id}"),
            project_path: None,
            project_url: None,
            title: format!("{kind} {external_id}"),
            description: None,
            url: None,
            occurred_at: occurred_at.fixed_offset(),
            activity_updated_at: None,
            metadata,
            impact: Default::default(),
            complexity: 5,
            last_synced_at: now.fixed_offset(),
            created_at: now.fixed_offset(),
            updated_at: now.fixed_offset(),
        }
    }

    fn range_2024_january() -> DateRange {
        DateRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn daily_trend_buckets_are_ascending_with_no_empty_days() {
        let t = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap();
        let rows = vec![
            record("c1", ActivityKind::Commit, 42, t(1, 9), 1, 0),
            record("c2", ActivityKind::Commit, 42, t(1, 17), 2, 1),
            record("c3", ActivityKind::Commit, 42, t(3, 12), 3, 0),
        ];

        let trend = daily_trend(&rows);
        assert_eq!(trend.len(), 2);
        assert_eq!(
            trend[0],
            DailyBucket {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                kind: ActivityKind::Commit,
                count: 2,
            }
        );
        assert_eq!(
            trend[1],
            DailyBucket {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                kind: ActivityKind::Commit,
                count: 1,
            }
        );
        // No bucket for the empty day in between.
        assert!(trend
            .iter()
            .all(|b| b.date != NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }

    #[test]
    fn stats_by_type_aggregates_churn_projects_and_recency() {
        let t = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap();
        let rows = vec![
            record("c1", ActivityKind::Commit, 42, t(1), 10, 3),
            record("c2", ActivityKind::Commit, 43, t(5), 7, 2),
            record("i1", ActivityKind::Issue, 42, t(2), 0, 0),
        ];

        let stats = stats_by_type(&rows);
        assert_eq!(stats.len(), 2);

        let commits = stats
            .iter()
            .find(|s| s.kind == ActivityKind::Commit)
            .expect("commit stats");
        assert_eq!(commits.count, 2);
        assert_eq!(commits.total_additions, 17);
        assert_eq!(commits.total_deletions, 5);
        assert_eq!(commits.project_count, 2);
        assert_eq!(commits.last_activity, Some(t(5)));

        let issues = stats
            .iter()
            .find(|s| s.kind == ActivityKind::Issue)
            .expect("issue stats");
        assert_eq!(issues.count, 1);
        assert_eq!(issues.total_additions, 0);
    }

    #[test]
    fn project_rollup_sorts_by_commit_volume() {
        let t = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let rows = vec![
            record("c1", ActivityKind::Commit, 42, t, 5, 1),
            record("c2", ActivityKind::Commit, 43, t, 2, 0),
            record("c3", ActivityKind::Commit, 43, t, 1, 1),
            record("m1", ActivityKind::MergeRequest, 42, t, 0, 0),
        ];

        let rollup = project_rollup(&rows);
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].project_id, 43);
        assert_eq!(rollup[0].commits, 2);
        assert_eq!(rollup[0].additions, 3);
        assert_eq!(rollup[1].project_id, 42);
        assert_eq!(rollup[1].merge_requests, 1);
        assert_eq!(rollup[1].additions, 5);
    }

    #[test]
    fn report_totals_and_range() {
        let range = range_2024_january();
        let t = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let rows = vec![
            record("c1", ActivityKind::Commit, 42, t, 1, 1),
            record("i1", ActivityKind::Issue, 42, t, 0, 0),
        ];

        let report = compute_report(&rows, range);
        assert_eq!(report.total_activities, 2);
        assert_eq!(report.range, range);
        assert_eq!(report.stats.len(), 2);
    }

    #[test]
    fn default_range_is_thirty_days() {
        let range = DateRange::default();
        let days = (range.end - range.start).num_days();
        assert_eq!(days, DEFAULT_RANGE_DAYS);
        assert!(range.contains(range.start));
        assert!(!range.contains(range.end));
    }
}
