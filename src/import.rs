//! JSON Lines import for the action log, report log and staff roster.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::{ActionEvent, ReportEvent, StaffMember};
use crate::storage::repository;
use crate::storage::Database;

/// What an import file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Actions,
    Reports,
    Staff,
}

/// Outcome of one import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub kind: ImportKind,
    pub records: usize,
}

/// Parse JSON Lines input. Blank lines are skipped.
pub fn parse_lines<T: DeserializeOwned>(input: &str) -> Result<Vec<T>> {
    Ok(parse_numbered(input)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

/// Parse JSON Lines input, keeping each record's 1-based line number.
fn parse_numbered<T: DeserializeOwned>(input: &str) -> Result<Vec<(usize, T)>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map(|record| (i + 1, record))
                .map_err(|e| Error::Import {
                    line: i + 1,
                    message: e.to_string(),
                })
        })
        .collect()
}

fn validate_actions(actions: &[(usize, ActionEvent)]) -> Result<()> {
    for (line, action) in actions {
        action.validate().map_err(|message| Error::Import {
            line: *line,
            message,
        })?;
    }
    Ok(())
}

fn validate_reports(reports: &[(usize, ReportEvent)]) -> Result<()> {
    for (line, report) in reports {
        report.validate().map_err(|message| Error::Import {
            line: *line,
            message: format!("{}: {message}", report.report_id),
        })?;
        let problem = match (report.is_pending(), report.reviewed_at) {
            (false, None) => Some("resolved report has no reviewed_at"),
            (true, Some(_)) => Some("pending report has reviewed_at"),
            (false, Some(reviewed_at)) if reviewed_at < report.created_at => {
                Some("reviewed_at is before created_at")
            }
            _ => None,
        };
        if let Some(problem) = problem {
            return Err(Error::Import {
                line: *line,
                message: format!("{}: {problem}", report.report_id),
            });
        }
    }
    Ok(())
}

/// Import a JSON Lines file of the given kind inside one write transaction.
pub async fn import_file(db: &Database, kind: ImportKind, path: &Path) -> Result<ImportSummary> {
    let input = std::fs::read_to_string(path)
        .map_err(|e| Error::Other(format!("cannot read {}: {e}", path.display())))?;
    import_str(db, kind, &input).await
}

/// Import JSON Lines text of the given kind inside one write transaction.
pub async fn import_str(db: &Database, kind: ImportKind, input: &str) -> Result<ImportSummary> {
    let records = match kind {
        ImportKind::Actions => {
            let numbered: Vec<(usize, ActionEvent)> = parse_numbered(input)?;
            validate_actions(&numbered)?;
            let actions: Vec<ActionEvent> = numbered.into_iter().map(|(_, a)| a).collect();
            let excluded = actions.iter().filter(|a| !a.is_reportable()).count();
            if excluded > 0 {
                log::debug!("{excluded} imported actions are excluded from reports");
            }
            let n = actions.len();
            db.writer()
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    for action in &actions {
                        repository::insert_action_event(&tx, action)?;
                    }
                    tx.commit()
                })
                .await?;
            n
        }
        ImportKind::Reports => {
            let numbered: Vec<(usize, ReportEvent)> = parse_numbered(input)?;
            validate_reports(&numbered)?;
            let reports: Vec<ReportEvent> = numbered.into_iter().map(|(_, r)| r).collect();
            let n = reports.len();
            db.writer()
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    for report in &reports {
                        repository::upsert_report_event(&tx, report)?;
                    }
                    tx.commit()
                })
                .await?;
            n
        }
        ImportKind::Staff => {
            let members: Vec<StaffMember> = parse_lines(input)?;
            let n = members.len();
            db.writer()
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    for member in &members {
                        repository::upsert_staff_member(&tx, member)?;
                    }
                    tx.commit()
                })
                .await?;
            n
        }
    };

    log::info!("Imported {records} {kind:?} records");
    Ok(ImportSummary { kind, records })
}
