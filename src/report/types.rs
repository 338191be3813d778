use std::collections::BTreeMap;

use serde::Serialize;

/// Per-moderator action counts for the report month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratorSummary {
    pub account_id: String,
    pub display_name: String,
    /// Count per action type.
    pub actions: BTreeMap<String, u64>,
    pub total_actions: u64,
}

/// Incoming and handled report counts for one day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyReportCount {
    pub day: u32,
    pub incoming: u64,
    pub handled: u64,
}

/// A month with at least one reportable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AvailableMonth {
    pub year: i32,
    pub month: u32,
}

/// The full moderation activity report for one month.
///
/// Maps are ordered so two reports over unchanged data serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    /// Staff moderators, busiest first, ties by account id.
    pub moderators: Vec<ModeratorSummary>,
    /// Count per action type across `moderators`.
    pub totals: BTreeMap<String, u64>,
    pub grand_total: u64,
    /// One entry per calendar day, day 1 first.
    pub daily_reports: Vec<DailyReportCount>,
    /// Per-moderator daily action counts; index 0 is day 1.
    pub daily_by_moderator: BTreeMap<String, Vec<u64>>,
    pub month: u32,
    pub year: i32,
    /// Every month with activity, newest first. Not limited to `year`/`month`.
    pub available_months: Vec<AvailableMonth>,
}
