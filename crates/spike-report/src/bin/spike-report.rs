//! Spike report CLI - export Spike incidents and teams as CSV.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spike_report::{
    collect, report_file_name, write_csv, write_teams_csv, ColumnSet, DateWindow,
    FlattenOptions, NoteDayAnchor, ReportConfig, ReportOptions, SpikeClient, TEAMS_FILE_NAME,
};

/// Spike report CLI - flatten Spike incidents into spreadsheet-friendly CSV.
#[derive(Parser)]
#[command(name = "spike-report")]
#[command(about = "Export Spike incidents per team as CSV reports")]
struct Cli {
    /// Spike API key (or set `SPIKE_API_KEY` env var).
    #[arg(long, env = "SPIKE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Spike API base URL (or set `SPIKE_API_URL` env var).
    #[arg(long, env = "SPIKE_API_URL")]
    api_url: Option<String>,

    /// Display time zone, IANA name or +HH:MM (or set `SPIKE_TIMEZONE` env var).
    #[arg(long, env = "SPIKE_TIMEZONE")]
    timezone: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export incidents for every `TEAM_*` team.
    Incidents {
        /// First created date to include (YYYY-MM-DD, display zone).
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last created date to include (YYYY-MM-DD, display zone).
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Only keep notes written on the anchor date.
        #[arg(long, default_value = "false")]
        same_day_notes: bool,

        /// Anchor for --same-day-notes: acknowledged or created.
        #[arg(long, default_value = "acknowledged")]
        anchor: NoteDayAnchor,

        /// Leave comments out of the report.
        #[arg(long, default_value = "false")]
        no_comments: bool,

        /// Column preset: full, dashboard or summary.
        #[arg(long, default_value = "full")]
        columns: ColumnSet,

        /// Sort rows newest first.
        #[arg(long, default_value = "false")]
        sort: bool,

        /// Output file (defaults to a dated file name).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Export all teams visible to the API key.
    Teams {
        /// Output file.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before parsing so clap env fallbacks see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Incidents {
            from,
            to,
            same_day_notes,
            anchor,
            no_comments,
            columns,
            sort,
            ref output,
        } => {
            let config =
                ReportConfig::from_vars(env_with_overrides(&cli)).context("Invalid configuration")?;
            let client =
                SpikeClient::from_config(&config).context("Failed to create Spike client")?;

            let window = match (from, to) {
                (Some(from), Some(to)) => Some(DateWindow::new(from, to)?),
                _ => None,
            };

            let options = ReportOptions {
                flatten: FlattenOptions {
                    zone: config.zone,
                    include_comments: !no_comments,
                    same_day_notes_only: same_day_notes,
                    note_day_anchor: anchor,
                },
                column_set: columns,
                window,
                newest_first: sort,
            };

            info!(
                teams = config.teams.len(),
                zone = %config.zone,
                columns = %columns,
                "Building incident report"
            );

            let report = collect(&client, &config.teams, &options, config.lookup_pause).await;

            let path = output.clone().unwrap_or_else(|| {
                let today = config.zone.local_date(Utc::now());
                PathBuf::from(report_file_name(window.as_ref(), today))
            });
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(
                BufWriter::new(file),
                &report.rows,
                &options.columns(),
                &config.zone,
            )
            .context("Failed to write report")?;

            println!("\n{:<24} {:>8} {:>9}  {}", "TEAM", "FETCHED", "REPORTED", "STATUS");
            println!("{}", "-".repeat(60));
            for outcome in &report.teams {
                let status = outcome
                    .error
                    .as_deref()
                    .map_or_else(|| "ok".to_string(), |e| format!("failed: {e}"));
                println!(
                    "{:<24} {:>8} {:>9}  {}",
                    outcome.team, outcome.fetched, outcome.reported, status
                );
            }
            println!(
                "\n✅ Report generated: {} ({} rows, {} user lookups)",
                path.display(),
                report.rows.len(),
                report.user_lookups
            );
        }

        Commands::Teams { ref output } => {
            let config = ReportConfig::account_from_vars(env_with_overrides(&cli))
                .context("Invalid configuration")?;
            let client =
                SpikeClient::from_config(&config).context("Failed to create Spike client")?;

            let teams = client.list_teams().await.context("Failed to list teams")?;
            if teams.is_empty() {
                println!("⚠️  No teams found in API response");
                return Ok(());
            }

            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(TEAMS_FILE_NAME));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_teams_csv(BufWriter::new(file), &teams).context("Failed to write teams")?;

            println!(
                "✅ Exported {} teams to {}",
                teams.len(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Process environment with command-line flags appended, so flags win.
fn env_with_overrides(cli: &Cli) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = std::env::vars().collect();
    let overrides = [
        ("SPIKE_API_KEY", &cli.api_key),
        ("SPIKE_API_URL", &cli.api_url),
        ("SPIKE_TIMEZONE", &cli.timezone),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            vars.push((key.to_string(), value.clone()));
        }
    }
    vars
}
