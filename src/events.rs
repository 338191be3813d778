use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::period::{MAX_YEAR, MIN_YEAR};

/// Action type recorded for manual display-name changes. Never reported.
pub const EXCLUDED_ACTION_TYPE: &str = "name_change_manual";

/// Report status for reports that have not been reviewed yet.
pub const STATUS_PENDING: &str = "pending";

/// One moderation action as written to the action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub moderator_id: String,
    pub moderator_display_name: String,
    pub action_type: String,
    pub occurred_at: DateTime<Utc>,
}

impl ActionEvent {
    pub fn is_reportable(&self) -> bool {
        self.action_type != EXCLUDED_ACTION_TYPE
    }

    /// Check that the event can be stored and later reported on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_reportable_year("occurred_at", &self.occurred_at)
    }
}

/// One user-submitted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub report_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: String,
}

impl ReportEvent {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }

    /// Check that the event can be stored and later reported on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_reportable_year("created_at", &self.created_at)?;
        if let Some(reviewed_at) = &self.reviewed_at {
            check_reportable_year("reviewed_at", reviewed_at)?;
        }
        Ok(())
    }
}

/// Timestamps outside the reportable years cannot be selected as a report
/// month, and years past 9999 break the month index.
pub(crate) fn check_reportable_year(
    field: &str,
    ts: &DateTime<Utc>,
) -> std::result::Result<(), String> {
    if (MIN_YEAR..=MAX_YEAR).contains(&ts.year()) {
        Ok(())
    } else {
        Err(format!(
            "{field} {} is outside years {MIN_YEAR}..={MAX_YEAR}",
            ts.to_rfc3339()
        ))
    }
}

fn default_status() -> String {
    STATUS_PENDING.to_string()
}

/// A roster entry. Only `is_staff` at query time decides report eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub account_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub is_staff: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_event_defaults_to_pending() {
        let r: ReportEvent =
            serde_json::from_str(r#"{"report_id":"r1","created_at":"2025-01-10T08:00:00Z"}"#)
                .unwrap();
        assert!(r.is_pending());
        assert_eq!(r.reviewed_at, None);
    }

    #[test]
    fn test_excluded_action_type() {
        let mut e: ActionEvent = serde_json::from_str(
            r#"{"moderator_id":"m1","moderator_display_name":"Mia",
                "action_type":"warn","occurred_at":"2025-01-10T08:00:00+02:00"}"#,
        )
        .unwrap();
        assert!(e.is_reportable());
        assert_eq!(e.occurred_at.to_rfc3339(), "2025-01-10T06:00:00+00:00");

        e.action_type = EXCLUDED_ACTION_TYPE.to_string();
        assert!(!e.is_reportable());
    }

    #[test]
    fn test_validate_rejects_years_outside_report_range() {
        use chrono::TimeZone;

        let mut e = ActionEvent {
            moderator_id: "m1".into(),
            moderator_display_name: "Mia".into(),
            action_type: "warn".into(),
            occurred_at: Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap(),
        };
        assert!(e.validate().is_ok());
        e.occurred_at = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        assert!(e.validate().unwrap_err().contains("occurred_at"));
        e.occurred_at = Utc.with_ymd_and_hms(1965, 6, 1, 0, 0, 0).unwrap();
        assert!(e.validate().is_err());

        let mut r = ReportEvent {
            report_id: "r1".into(),
            created_at: Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap(),
            reviewed_at: None,
            status: STATUS_PENDING.into(),
        };
        assert!(r.validate().is_ok());
        r.reviewed_at = Some(Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap());
        assert!(r.validate().unwrap_err().contains("reviewed_at"));
    }
}
