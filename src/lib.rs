pub mod date_util;
pub mod error;
pub mod events;
pub mod import;
pub mod period;
pub mod report;
pub mod storage;

pub use error::{Error, Result};
pub use events::{ActionEvent, ReportEvent, StaffMember, EXCLUDED_ACTION_TYPE, STATUS_PENDING};
pub use import::{ImportKind, ImportSummary};
pub use period::ReportMonth;
pub use report::{ActivityReport, AvailableMonth, DailyReportCount, ModeratorSummary};
pub use storage::repository::StoreStatus;
pub use storage::Database;

use chrono::{DateTime, Utc};

use date_util::to_sql_timestamp;
use storage::repository;

/// Config key holding the default caller identity for report access.
pub const CALLER_ID_KEY: &str = "caller_id";

/// Main entry point for moderation activity reporting.
pub struct ModActivity {
    db: Database,
}

impl ModActivity {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Reports ────────────────────────────────────────────────────

    /// Build the report for a year/month, defaulting missing parts to the
    /// current UTC month.
    pub async fn report(&self, year: Option<i32>, month: Option<u32>) -> Result<ActivityReport> {
        let month = ReportMonth::resolve(year, month)?;
        report::build_report(&self.db, month).await
    }

    /// Build the report for an already resolved month.
    pub async fn report_for(&self, month: ReportMonth) -> Result<ActivityReport> {
        report::build_report(&self.db, month).await
    }

    pub async fn available_months(&self) -> Result<Vec<AvailableMonth>> {
        report::available_months(&self.db).await
    }

    /// Reject callers that are not currently flagged staff.
    pub async fn authorize(&self, caller_id: &str) -> Result<()> {
        let allowed = self
            .db
            .reader()
            .call({
                let caller_id = caller_id.to_string();
                move |conn| repository::is_staff(conn, &caller_id)
            })
            .await?;
        if allowed {
            Ok(())
        } else {
            log::warn!("Rejected report access for {caller_id}");
            Err(Error::Unauthorized(format!(
                "{caller_id} is not a current staff member"
            )))
        }
    }

    // ── Event logs ─────────────────────────────────────────────────

    pub async fn import(&self, kind: ImportKind, path: &std::path::Path) -> Result<ImportSummary> {
        import::import_file(&self.db, kind, path).await
    }

    pub async fn record_action(&self, event: ActionEvent) -> Result<()> {
        event.validate().map_err(Error::InvalidEvent)?;
        self.db
            .writer()
            .call(move |conn| repository::insert_action_event(conn, &event))
            .await?;
        Ok(())
    }

    pub async fn record_report(&self, event: ReportEvent) -> Result<()> {
        event.validate().map_err(Error::InvalidEvent)?;
        self.db
            .writer()
            .call(move |conn| repository::upsert_report_event(conn, &event))
            .await?;
        Ok(())
    }

    /// Move a pending report to a terminal status.
    pub async fn resolve_report(
        &self,
        report_id: &str,
        status: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        if status == STATUS_PENDING || status.trim().is_empty() {
            return Err(Error::Other(format!(
                "cannot resolve a report to status '{status}'"
            )));
        }
        events::check_reportable_year("reviewed_at", &reviewed_at)
            .map_err(Error::InvalidEvent)?;
        let report_id = report_id.to_string();
        let (changed, current) = self
            .db
            .writer()
            .call({
                let report_id = report_id.clone();
                let status = status.to_string();
                let reviewed_at = to_sql_timestamp(&reviewed_at);
                move |conn| {
                    let changed = repository::resolve_report(conn, &report_id, &status, &reviewed_at)?;
                    let current = repository::get_report_status(conn, &report_id)?;
                    Ok::<_, rusqlite::Error>((changed, current))
                }
            })
            .await?;
        match (changed, current) {
            (true, _) => {
                log::info!("Report {report_id} resolved as {status}");
                Ok(())
            }
            (false, None) => Err(Error::NotFound(format!("report {report_id}"))),
            (false, Some(current)) => Err(Error::Other(format!(
                "report {report_id} is already {current}"
            ))),
        }
    }

    // ── Staff roster ───────────────────────────────────────────────

    pub async fn set_staff(
        &self,
        account_id: &str,
        is_staff: bool,
        display_name: Option<&str>,
    ) -> Result<()> {
        let member = StaffMember {
            account_id: account_id.to_string(),
            display_name: display_name.map(|s| s.to_string()),
            is_staff,
        };
        self.db
            .writer()
            .call(move |conn| repository::upsert_staff_member(conn, &member))
            .await?;
        Ok(())
    }

    pub async fn list_staff(&self) -> Result<Vec<StaffMember>> {
        self.db
            .reader()
            .call(|conn| repository::list_staff_members(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn status(&self) -> Result<StoreStatus> {
        self.db
            .reader()
            .call(|conn| repository::store_status(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn app() -> ModActivity {
        ModActivity::new(Database::open_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_authorize_requires_current_staff() {
        let app = app().await;
        app.set_staff("m1", true, Some("Mia")).await.unwrap();
        app.set_staff("m2", false, None).await.unwrap();

        assert!(app.authorize("m1").await.is_ok());
        assert!(matches!(app.authorize("m2").await, Err(Error::Unauthorized(_))));
        assert!(matches!(app.authorize("nobody").await, Err(Error::Unauthorized(_))));

        app.set_staff("m1", false, None).await.unwrap();
        assert!(matches!(app.authorize("m1").await, Err(Error::Unauthorized(_))));
        // Display name survives a flag change.
        let staff = app.list_staff().await.unwrap();
        assert_eq!(staff[0].display_name.as_deref(), Some("Mia"));
    }

    #[tokio::test]
    async fn test_report_rejects_invalid_month() {
        let app = app().await;
        assert!(matches!(
            app.report(Some(2025), Some(13)).await,
            Err(Error::InvalidPeriod(_))
        ));
        assert!(matches!(
            app.report(Some(1800), Some(1)).await,
            Err(Error::InvalidPeriod(_))
        ));
    }

    #[tokio::test]
    async fn test_report_via_facade() {
        let app = app().await;
        app.set_staff("m1", true, None).await.unwrap();
        app.record_action(ActionEvent {
            moderator_id: "m1".into(),
            moderator_display_name: "Mia".into(),
            action_type: "warn".into(),
            occurred_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
        })
        .await
        .unwrap();

        let r = app.report(Some(2025), Some(3)).await.unwrap();
        assert_eq!(r.grand_total, 1);
        assert_eq!(r, app.report_for(ReportMonth::new(2025, 3).unwrap()).await.unwrap());
        assert_eq!(
            app.available_months().await.unwrap(),
            vec![AvailableMonth { year: 2025, month: 3 }]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_events_are_rejected() {
        let app = app().await;
        app.set_staff("m1", true, None).await.unwrap();
        let mut event = ActionEvent {
            moderator_id: "m1".into(),
            moderator_display_name: "Mia".into(),
            action_type: "warn".into(),
            occurred_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
        };
        app.record_action(event.clone()).await.unwrap();

        event.occurred_at = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            app.record_action(event.clone()).await,
            Err(Error::InvalidEvent(_))
        ));
        event.occurred_at = Utc.with_ymd_and_hms(1965, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            app.record_action(event).await,
            Err(Error::InvalidEvent(_))
        ));
        assert!(matches!(
            app.record_report(ReportEvent {
                report_id: "r1".into(),
                created_at: Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap(),
                reviewed_at: None,
                status: STATUS_PENDING.into(),
            })
            .await,
            Err(Error::InvalidEvent(_))
        ));

        // Nothing was stored, so every month still builds and the index only
        // offers requestable months.
        assert_eq!(app.status().await.unwrap().action_events, 1);
        assert_eq!(app.report(Some(2025), Some(3)).await.unwrap().grand_total, 1);
        assert_eq!(
            app.available_months().await.unwrap(),
            vec![AvailableMonth { year: 2025, month: 3 }]
        );
    }

    #[tokio::test]
    async fn test_resolve_report_lifecycle() {
        let app = app().await;
        let created_at = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        app.record_report(ReportEvent {
            report_id: "r1".into(),
            created_at,
            reviewed_at: None,
            status: STATUS_PENDING.into(),
        })
        .await
        .unwrap();

        assert!(app.resolve_report("r1", STATUS_PENDING, created_at).await.is_err());
        app.resolve_report("r1", "resolved", Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap())
            .await
            .unwrap();
        assert!(matches!(
            app.resolve_report("missing", "resolved", created_at).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            app.resolve_report("r1", "dismissed", created_at).await,
            Err(Error::Other(_))
        ));

        let r = app.report(Some(2025), Some(3)).await.unwrap();
        assert_eq!(r.daily_reports[8].incoming, 1);
        assert_eq!(r.daily_reports[10].handled, 1);
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let app = app().await;
        assert_eq!(app.config_get(CALLER_ID_KEY).await.unwrap(), None);
        app.config_set(CALLER_ID_KEY, "m1").await.unwrap();
        assert_eq!(app.config_get(CALLER_ID_KEY).await.unwrap(), Some("m1".into()));
        assert_eq!(
            app.config_list().await.unwrap(),
            vec![(CALLER_ID_KEY.to_string(), "m1".to_string())]
        );
    }
}
