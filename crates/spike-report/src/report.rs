//! Report collection and CSV output.
//!
//! Teams are processed one after another with a single shared
//! [`UserResolver`], so each user id is looked up at most once per run.

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::client::{IncidentFeed, UserDirectory};
use crate::columns::{Column, ColumnSet};
use crate::config::TeamContext;
use crate::error::{Result, SpikeError};
use crate::flatten::{flatten, FlattenOptions, Row};
use crate::models::{Incident, TeamSummary};
use crate::resolver::UserResolver;
use crate::time::{parse_utc, DisplayZone};

/// Inclusive range of calendar dates in the display zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// Create a window.
    ///
    /// # Errors
    /// Returns [`SpikeError::Config`] when `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(SpikeError::Config(format!(
                "date window starts after it ends ({from} > {to})"
            )));
        }
        Ok(Self { from, to })
    }

    /// Whether `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Everything that shapes a report run.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Per-row rendering switches.
    pub flatten: FlattenOptions,
    /// Columns written to the output.
    pub column_set: ColumnSet,
    /// Keep only incidents created inside this window.
    pub window: Option<DateWindow>,
    /// Order rows newest first by created time.
    pub newest_first: bool,
}

impl ReportOptions {
    /// Output columns for these options.
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        self.column_set.columns(self.flatten.include_comments)
    }
}

/// What happened for one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamOutcome {
    /// Team label.
    pub team: String,
    /// Incidents returned by the API.
    pub fetched: usize,
    /// Incidents that made it into the report.
    pub reported: usize,
    /// Why the team was skipped, if it was.
    pub error: Option<String>,
}

/// Rows of a finished run plus per-team bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Flattened rows in output order.
    pub rows: Vec<Row>,
    /// One entry per team, in processing order.
    pub teams: Vec<TeamOutcome>,
    /// Live user lookups performed.
    pub user_lookups: usize,
}

/// Created time of `incident` when it parses.
fn created_instant(incident: &Incident) -> Option<DateTime<Utc>> {
    incident.created_raw().and_then(parse_utc)
}

/// Fetch and flatten incidents for every team.
///
/// A team whose incident list cannot be fetched is logged and skipped; the
/// run carries on with the remaining teams.
pub async fn collect<A>(
    api: &A,
    teams: &[TeamContext],
    options: &ReportOptions,
    lookup_pause: std::time::Duration,
) -> Report
where
    A: IncidentFeed + UserDirectory,
{
    let zone = options.flatten.zone;
    let mut resolver = UserResolver::new(api, lookup_pause);
    let mut keyed: Vec<(Option<DateTime<Utc>>, Row)> = Vec::new();
    let mut outcomes = Vec::with_capacity(teams.len());

    for team in teams {
        info!(team = %team.name, "Fetching incidents");

        let incidents = match api.list_incidents(team).await {
            Ok(incidents) => incidents,
            Err(e) => {
                warn!(
                    team = %team.name,
                    error = %e,
                    "Failed to fetch incidents, skipping team"
                );
                outcomes.push(TeamOutcome {
                    team: team.name.clone(),
                    fetched: 0,
                    reported: 0,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let mut reported = 0;
        for incident in &incidents {
            let created = created_instant(incident);
            if let Some(window) = &options.window {
                match created {
                    Some(at) if window.contains(zone.local_date(at)) => {}
                    _ => continue,
                }
            }

            let row = flatten(incident, team, &options.flatten, &mut resolver).await;
            keyed.push((created, row));
            reported += 1;
        }

        info!(
            team = %team.name,
            fetched = incidents.len(),
            reported,
            "Team processed"
        );
        outcomes.push(TeamOutcome {
            team: team.name.clone(),
            fetched: incidents.len(),
            reported,
            error: None,
        });
    }

    if options.newest_first {
        // None sorts before Some, so reverse puts unparsable times last
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
    }

    Report {
        rows: keyed.into_iter().map(|(_, row)| row).collect(),
        teams: outcomes,
        user_lookups: resolver.lookups(),
    }
}

/// Write `rows` as CSV with a header line.
///
/// # Errors
/// Returns error if writing fails.
pub fn write_csv<W: Write>(
    writer: W,
    rows: &[Row],
    columns: &[Column],
    zone: &DisplayZone,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(columns.iter().map(|c| c.header(zone)))?;
    for row in rows {
        wtr.write_record(columns.iter().map(|c| c.value(row)))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the team list as `Team Name,Team ID`.
///
/// # Errors
/// Returns error if writing fails.
pub fn write_teams_csv<W: Write>(writer: W, teams: &[TeamSummary]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(["Team Name", "Team ID"])?;
    for team in teams {
        wtr.write_record([
            team.name.as_deref().unwrap_or_default(),
            team.id.as_deref().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Default output file name for an incident report.
#[must_use]
pub fn report_file_name(window: Option<&DateWindow>, today: NaiveDate) -> String {
    match window {
        Some(w) => format!("spike_incidents_{}_to_{}.csv", w.from, w.to),
        None => format!("spike_incidents_report_{today}.csv"),
    }
}

/// Default output file name for the team list.
pub const TEAMS_FILE_NAME: &str = "spike_teams.csv";
