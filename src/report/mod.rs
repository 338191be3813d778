pub mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::period::ReportMonth;
use crate::storage::repository::{self, DailyModeratorCount, ModeratorActionCount};
use crate::storage::Database;

/// Build the activity report for one month.
///
/// The raw aggregations are independent and run concurrently, each on its own
/// reader connection. Staff filtering happens after they all complete, against
/// the roster as it is now. Any failed query fails the whole build.
pub async fn build_report(db: &Database, month: ReportMonth) -> Result<ActivityReport> {
    let started = Instant::now();
    let (start, end) = month.sql_bounds();

    let (action_counts, created, resolved, daily_actions, active_months) = tokio::try_join!(
        run_query(db, 0, "moderator totals", {
            let (start, end) = (start.clone(), end.clone());
            move |conn| repository::count_actions_by_moderator(conn, &start, &end)
        }),
        run_query(db, 1, "incoming reports", {
            let (start, end) = (start.clone(), end.clone());
            move |conn| repository::count_reports_created_by_day(conn, &start, &end)
        }),
        run_query(db, 2, "handled reports", {
            let (start, end) = (start.clone(), end.clone());
            move |conn| repository::count_reports_resolved_by_day(conn, &start, &end)
        }),
        run_query(db, 3, "moderator daily flow", {
            let (start, end) = (start.clone(), end.clone());
            move |conn| repository::count_actions_by_day(conn, &start, &end)
        }),
        run_query(db, 4, "available months", |conn| {
            repository::list_active_months(conn)
        }),
    )?;
    log::debug!(
        "{month}: {} moderator/type groups, {} moderator/day groups, {} active months",
        action_counts.len(),
        daily_actions.len(),
        active_months.len()
    );

    let candidates = summarize_moderators(action_counts);
    let candidate_ids: Vec<String> = candidates.iter().map(|m| m.account_id.clone()).collect();
    let staff = if candidate_ids.is_empty() {
        BTreeSet::new()
    } else {
        run_query(db, 0, "staff roster", move |conn| {
            repository::staff_ids_among(conn, &candidate_ids)
        })
        .await?
    };

    let candidate_count = candidates.len();
    let moderators = retain_staff(candidates, &staff);
    if moderators.len() < candidate_count {
        log::debug!(
            "{month}: dropped {} moderators not currently on staff",
            candidate_count - moderators.len()
        );
    }
    let (totals, grand_total) = accumulate_totals(&moderators);
    let eligible: BTreeSet<&str> = moderators.iter().map(|m| m.account_id.as_str()).collect();
    let days = month.days_in_month();

    let report = ActivityReport {
        daily_reports: daily_flow(&created, &resolved, days),
        daily_by_moderator: daily_by_moderator(daily_actions, &eligible, days),
        moderators,
        totals,
        grand_total,
        month: month.month(),
        year: month.year(),
        available_months: active_months
            .into_iter()
            .map(|(year, month)| AvailableMonth { year, month })
            .collect(),
    };

    log::info!(
        "Built {month} report: {} moderators, {} actions in {:?}",
        report.moderators.len(),
        report.grand_total,
        started.elapsed()
    );
    Ok(report)
}

/// List every month with reportable activity, newest first.
pub async fn available_months(db: &Database) -> Result<Vec<AvailableMonth>> {
    let months = run_query(db, 0, "available months", |conn| {
        repository::list_active_months(conn)
    })
    .await?;
    Ok(months
        .into_iter()
        .map(|(year, month)| AvailableMonth { year, month })
        .collect())
}

async fn run_query<T, F>(db: &Database, slot: usize, stage: &'static str, query: F) -> Result<T>
where
    F: FnOnce(&mut rusqlite::Connection) -> std::result::Result<T, rusqlite::Error>
        + Send
        + 'static,
    T: Send + 'static,
{
    db.reader_for(slot)
        .call(query)
        .await
        .map_err(|e| Error::aggregation(stage, e))
}

/// Fold (moderator, action type) counts into one summary per moderator,
/// ordered by total descending then account id ascending.
fn summarize_moderators(rows: Vec<ModeratorActionCount>) -> Vec<ModeratorSummary> {
    let mut by_moderator: BTreeMap<String, (ModeratorSummary, String)> = BTreeMap::new();
    for row in rows {
        let (summary, last_seen) = by_moderator
            .entry(row.moderator_id.clone())
            .or_insert_with(|| {
                (
                    ModeratorSummary {
                        account_id: row.moderator_id.clone(),
                        display_name: row.display_name.clone(),
                        actions: BTreeMap::new(),
                        total_actions: 0,
                    },
                    row.last_seen.clone(),
                )
            });
        if row.last_seen >= *last_seen {
            summary.display_name = row.display_name;
            *last_seen = row.last_seen;
        }
        *summary.actions.entry(row.action_type).or_insert(0) += row.count;
        summary.total_actions += row.count;
    }

    let mut summaries: Vec<ModeratorSummary> =
        by_moderator.into_values().map(|(s, _)| s).collect();
    summaries.sort_by(|a, b| {
        b.total_actions
            .cmp(&a.total_actions)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    summaries
}

/// Keep only moderators currently on the staff roster. Order is preserved.
fn retain_staff(
    summaries: Vec<ModeratorSummary>,
    staff: &BTreeSet<String>,
) -> Vec<ModeratorSummary> {
    summaries
        .into_iter()
        .filter(|m| staff.contains(&m.account_id))
        .collect()
}

fn accumulate_totals(moderators: &[ModeratorSummary]) -> (BTreeMap<String, u64>, u64) {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut grand_total = 0;
    for m in moderators {
        for (action_type, count) in &m.actions {
            *totals.entry(action_type.clone()).or_insert(0) += count;
        }
        grand_total += m.total_actions;
    }
    (totals, grand_total)
}

/// Expand a sparse day -> count map to one entry per day `1..=days`,
/// with 0 for days that have no entry.
pub fn densify(sparse: &BTreeMap<u32, u64>, days: u32) -> Vec<u64> {
    (1..=days)
        .map(|day| sparse.get(&day).copied().unwrap_or(0))
        .collect()
}

fn daily_flow(
    created: &BTreeMap<u32, u64>,
    resolved: &BTreeMap<u32, u64>,
    days: u32,
) -> Vec<DailyReportCount> {
    let incoming = densify(created, days);
    let handled = densify(resolved, days);
    incoming
        .into_iter()
        .zip(handled)
        .zip(1..=days)
        .map(|((incoming, handled), day)| DailyReportCount {
            day,
            incoming,
            handled,
        })
        .collect()
}

fn daily_by_moderator(
    rows: Vec<DailyModeratorCount>,
    eligible: &BTreeSet<&str>,
    days: u32,
) -> BTreeMap<String, Vec<u64>> {
    let mut sparse: BTreeMap<String, BTreeMap<u32, u64>> = BTreeMap::new();
    for row in rows {
        if !eligible.contains(row.moderator_id.as_str()) {
            continue;
        }
        *sparse
            .entry(row.moderator_id)
            .or_default()
            .entry(row.day)
            .or_insert(0) += row.count;
    }
    sparse
        .into_iter()
        .map(|(moderator_id, by_day)| (moderator_id, densify(&by_day, days)))
        .collect()
}
