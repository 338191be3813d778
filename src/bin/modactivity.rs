use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "modactivity", about = "Moderation activity reports")]
struct Cli {
    /// Database path (default: ~/.modactivity/modactivity.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the monthly activity report
    Report {
        /// Report year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Report month, 1-12 (default: current month)
        #[arg(long)]
        month: Option<u32>,
        /// Report month as YYYY-MM (overrides --year/--month)
        #[arg(long, conflicts_with_all = ["year", "month"])]
        period: Option<String>,
        /// Caller account id; must be current staff (default: config caller_id)
        #[arg(long)]
        caller: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List months with recorded moderation activity
    Months {
        #[arg(long)]
        json: bool,
    },
    /// Import events from a JSON Lines file
    Import {
        #[command(subcommand)]
        target: ImportTarget,
    },
    /// Manage the staff roster
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
    /// Resolve a pending report
    Resolve {
        report_id: String,
        /// Terminal status, e.g. resolved or dismissed
        #[arg(long)]
        status: String,
        /// Review time as RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show store status
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportTarget {
    /// Moderator actions
    Actions { file: PathBuf },
    /// User reports (later records for a report id carry its resolution)
    Reports { file: PathBuf },
    /// Staff roster entries
    Staff { file: PathBuf },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Grant (or with --revoke, remove) staff status
    Set {
        account_id: String,
        #[arg(long)]
        revoke: bool,
        #[arg(long)]
        name: Option<String>,
    },
    /// List roster entries
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => modactivity::Database::open_at(path).await?,
        None => modactivity::Database::open().await?,
    };
    let app = modactivity::ModActivity::new(db);

    match cli.command {
        Commands::Report {
            year,
            month,
            period,
            caller,
            json,
        } => {
            let caller = match caller {
                Some(c) => Some(c),
                None => app.config_get(modactivity::CALLER_ID_KEY).await?,
            };
            if let Some(caller) = caller {
                app.authorize(&caller).await?;
            }
            let report = match period {
                Some(p) => app.report_for(modactivity::ReportMonth::parse(&p)?).await?,
                None => app.report(year, month).await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Months { json } => {
            let months = app.available_months().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&months)?);
            } else if months.is_empty() {
                println!("No moderation activity recorded.");
            } else {
                for m in months {
                    println!("{}-{:02}", m.year, m.month);
                }
            }
        }
        Commands::Import { target } => {
            let (kind, file) = match target {
                ImportTarget::Actions { file } => (modactivity::ImportKind::Actions, file),
                ImportTarget::Reports { file } => (modactivity::ImportKind::Reports, file),
                ImportTarget::Staff { file } => (modactivity::ImportKind::Staff, file),
            };
            let summary = app.import(kind, &file).await?;
            println!("Imported {} records from {}", summary.records, file.display());
        }
        Commands::Staff { action } => handle_staff(&app, action).await?,
        Commands::Resolve {
            report_id,
            status,
            at,
        } => {
            let reviewed_at = match at {
                Some(ts) => chrono::DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| anyhow::anyhow!("invalid --at '{ts}': {e}"))?
                    .with_timezone(&chrono::Utc),
                None => chrono::Utc::now(),
            };
            app.resolve_report(&report_id, &status, reviewed_at).await?;
            println!("Report {report_id} marked {status}.");
        }
        Commands::Config { action } => handle_config(&app, action).await?,
        Commands::Status { json } => print_status(&app, json).await?,
    }

    Ok(())
}

async fn handle_staff(app: &modactivity::ModActivity, action: StaffAction) -> anyhow::Result<()> {
    match action {
        StaffAction::Set {
            account_id,
            revoke,
            name,
        } => {
            app.set_staff(&account_id, !revoke, name.as_deref()).await?;
            if revoke {
                println!("{account_id} is no longer staff.");
            } else {
                println!("{account_id} is staff.");
            }
        }
        StaffAction::List { json } => {
            let staff = app.list_staff().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&staff)?);
            } else if staff.is_empty() {
                println!("Roster is empty.");
            } else {
                for m in staff {
                    println!(
                        "{:<24} {:<24} {}",
                        m.account_id,
                        m.display_name.as_deref().unwrap_or("-"),
                        if m.is_staff { "staff" } else { "former staff" }
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_config(app: &modactivity::ModActivity, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match app.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            app.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = app.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn print_status(app: &modactivity::ModActivity, json: bool) -> anyhow::Result<()> {
    let status = app.status().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Store Status");
    println!("  Actions:         {}", status.action_events);
    println!("  Reports:         {}", status.report_events);
    println!("  Pending reports: {}", status.pending_reports);
    println!("  Staff:           {}", status.staff_members);
    println!(
        "  Action span:     {} .. {}",
        status.first_action_at.as_deref().unwrap_or("never"),
        status.last_action_at.as_deref().unwrap_or("never")
    );
    Ok(())
}

fn print_report(report: &modactivity::ActivityReport) {
    println!("Moderation Activity: {}-{:02}", report.year, report.month);

    println!("\nModerators");
    if report.moderators.is_empty() {
        println!("  (no staff activity)");
    }
    for m in &report.moderators {
        let breakdown = m
            .actions
            .iter()
            .map(|(action, count)| format!("{action}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:<24} {:>6}  {}",
            m.display_name, m.total_actions, breakdown
        );
    }

    println!("\nTotals");
    for (action, count) in &report.totals {
        println!("  {action:<24} {count:>6}");
    }
    println!("  {:<24} {:>6}", "all", report.grand_total);

    println!("\nReports by day (incoming / handled)");
    for d in &report.daily_reports {
        if d.incoming > 0 || d.handled > 0 {
            println!("  {:>2}  {:>5} / {:<5}", d.day, d.incoming, d.handled);
        }
    }

    if !report.available_months.is_empty() {
        let months = report
            .available_months
            .iter()
            .map(|m| format!("{}-{:02}", m.year, m.month))
            .collect::<Vec<_>>()
            .join(", ");
        println!("\nMonths with activity: {months}");
    }
}
