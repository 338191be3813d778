use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::date_util::to_sql_timestamp;
use crate::events::{ActionEvent, ReportEvent, StaffMember, EXCLUDED_ACTION_TYPE, STATUS_PENDING};

/// Upper bound on ids bound into a single `IN (...)` list.
const MAX_IN_PARAMS: usize = 500;

// ── Action log ─────────────────────────────────────────────────────

pub fn insert_action_event(conn: &Connection, event: &ActionEvent) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO action_events (moderator_id, moderator_display_name, action_type, occurred_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            event.moderator_id,
            event.moderator_display_name,
            event.action_type,
            to_sql_timestamp(&event.occurred_at),
        ],
    )?;
    Ok(())
}

/// Action count for one (moderator, action type) pair inside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorActionCount {
    pub moderator_id: String,
    pub action_type: String,
    pub count: u64,
    /// Display name on the most recent event of this pair.
    pub display_name: String,
    pub last_seen: String,
}

/// Count reportable actions per (moderator, action type) in `[start, end)`.
pub fn count_actions_by_moderator(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<ModeratorActionCount>, rusqlite::Error> {
    // SQLite fills the bare display-name column from the row that holds MAX().
    let mut stmt = conn.prepare(
        "SELECT moderator_id, action_type, COUNT(*), moderator_display_name, MAX(occurred_at)
         FROM action_events
         WHERE occurred_at >= ?1 AND occurred_at < ?2 AND action_type != ?3
         GROUP BY moderator_id, action_type
         ORDER BY moderator_id, action_type",
    )?;
    let rows = stmt.query_map(params![start, end, EXCLUDED_ACTION_TYPE], |row| {
        Ok(ModeratorActionCount {
            moderator_id: row.get(0)?,
            action_type: row.get(1)?,
            count: row.get::<_, i64>(2)? as u64,
            display_name: row.get(3)?,
            last_seen: row.get(4)?,
        })
    })?;
    rows.collect()
}

/// Action count for one moderator on one day of the month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyModeratorCount {
    pub day: u32,
    pub moderator_id: String,
    pub count: u64,
}

/// Count reportable actions per (day of month, moderator) in `[start, end)`.
pub fn count_actions_by_day(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<DailyModeratorCount>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%d', occurred_at) AS INTEGER) AS day, moderator_id, COUNT(*)
         FROM action_events
         WHERE occurred_at >= ?1 AND occurred_at < ?2 AND action_type != ?3
         GROUP BY day, moderator_id
         ORDER BY day, moderator_id",
    )?;
    let rows = stmt.query_map(params![start, end, EXCLUDED_ACTION_TYPE], |row| {
        Ok(DailyModeratorCount {
            day: row.get(0)?,
            moderator_id: row.get(1)?,
            count: row.get::<_, i64>(2)? as u64,
        })
    })?;
    rows.collect()
}

/// Every (year, month) with at least one reportable action, newest first.
pub fn list_active_months(conn: &Connection) -> Result<Vec<(i32, u32)>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%Y', occurred_at) AS INTEGER) AS year,
                CAST(strftime('%m', occurred_at) AS INTEGER) AS month
         FROM action_events
         WHERE action_type != ?1
         GROUP BY year, month
         ORDER BY year DESC, month DESC",
    )?;
    let rows = stmt.query_map(params![EXCLUDED_ACTION_TYPE], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?;
    rows.collect()
}

// ── Report log ─────────────────────────────────────────────────────

/// Insert a report, or fold a later record for the same report into it.
/// A stored resolution is never reverted to pending.
pub fn upsert_report_event(conn: &Connection, report: &ReportEvent) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO report_events (report_id, created_at, reviewed_at, status)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(report_id) DO UPDATE SET
           reviewed_at = CASE WHEN report_events.status = ?5
                              THEN excluded.reviewed_at ELSE report_events.reviewed_at END,
           status = CASE WHEN report_events.status = ?5
                         THEN excluded.status ELSE report_events.status END",
        params![
            report.report_id,
            to_sql_timestamp(&report.created_at),
            report.reviewed_at.as_ref().map(to_sql_timestamp),
            report.status,
            STATUS_PENDING,
        ],
    )?;
    Ok(())
}

pub fn get_report_status(
    conn: &Connection,
    report_id: &str,
) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT status FROM report_events WHERE report_id = ?1",
        params![report_id],
        |row| row.get(0),
    )
    .optional()
}

/// Move a pending report to a terminal status. Returns false when the report
/// is missing or already resolved.
pub fn resolve_report(
    conn: &Connection,
    report_id: &str,
    status: &str,
    reviewed_at: &str,
) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE report_events SET status = ?2, reviewed_at = ?3
         WHERE report_id = ?1 AND status = ?4",
        params![report_id, status, reviewed_at, STATUS_PENDING],
    )?;
    Ok(changed > 0)
}

/// Reports created per day of month in `[start, end)`, any status.
pub fn count_reports_created_by_day(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<BTreeMap<u32, u64>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%d', created_at) AS INTEGER) AS day, COUNT(*)
         FROM report_events
         WHERE created_at >= ?1 AND created_at < ?2
         GROUP BY day",
    )?;
    let rows = stmt.query_map(params![start, end], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    rows.collect()
}

/// Reports resolved per day of month in `[start, end)`, keyed on `reviewed_at`.
pub fn count_reports_resolved_by_day(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<BTreeMap<u32, u64>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%d', reviewed_at) AS INTEGER) AS day, COUNT(*)
         FROM report_events
         WHERE status != ?3 AND reviewed_at IS NOT NULL
           AND reviewed_at >= ?1 AND reviewed_at < ?2
         GROUP BY day",
    )?;
    let rows = stmt.query_map(params![start, end, STATUS_PENDING], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    rows.collect()
}

// ── Staff roster ───────────────────────────────────────────────────

pub fn upsert_staff_member(conn: &Connection, member: &StaffMember) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO staff_members (account_id, display_name, is_staff, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(account_id) DO UPDATE SET
           display_name = COALESCE(excluded.display_name, staff_members.display_name),
           is_staff = excluded.is_staff,
           updated_at = excluded.updated_at",
        params![member.account_id, member.display_name, member.is_staff as i32],
    )?;
    Ok(())
}

pub fn is_staff(conn: &Connection, account_id: &str) -> Result<bool, rusqlite::Error> {
    let flag: Option<i64> = conn
        .query_row(
            "SELECT is_staff FROM staff_members WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(flag == Some(1))
}

/// The subset of `account_ids` currently flagged staff.
pub fn staff_ids_among(
    conn: &Connection,
    account_ids: &[String],
) -> Result<BTreeSet<String>, rusqlite::Error> {
    let mut staff = BTreeSet::new();
    for chunk in account_ids.chunks(MAX_IN_PARAMS) {
        let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT account_id FROM staff_members
             WHERE is_staff = 1 AND account_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        for (i, id) in chunk.iter().enumerate() {
            stmt.raw_bind_parameter(i + 1, id)?;
        }
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            staff.insert(row.get::<_, String>(0)?);
        }
    }
    Ok(staff)
}

pub fn list_staff_members(conn: &Connection) -> Result<Vec<StaffMember>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT account_id, display_name, is_staff FROM staff_members ORDER BY account_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(StaffMember {
            account_id: row.get(0)?,
            display_name: row.get(1)?,
            is_staff: row.get::<_, i64>(2)? == 1,
        })
    })?;
    rows.collect()
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Status ─────────────────────────────────────────────────────────

/// Row counts and time span of the stored logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStatus {
    pub action_events: u64,
    pub report_events: u64,
    pub pending_reports: u64,
    pub staff_members: u64,
    pub first_action_at: Option<String>,
    pub last_action_at: Option<String>,
}

pub fn store_status(conn: &Connection) -> Result<StoreStatus, rusqlite::Error> {
    let (action_events, first_action_at, last_action_at): (i64, Option<String>, Option<String>) =
        conn.query_row(
            "SELECT COUNT(*), MIN(occurred_at), MAX(occurred_at) FROM action_events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
    let (report_events, pending_reports): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END) FROM report_events",
        params![STATUS_PENDING],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let staff_members: i64 = conn.query_row(
        "SELECT COUNT(*) FROM staff_members WHERE is_staff = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(StoreStatus {
        action_events: action_events as u64,
        report_events: report_events as u64,
        pending_reports: pending_reports.unwrap_or(0) as u64,
        staff_members: staff_members as u64,
        first_action_at,
        last_action_at,
    })
}
