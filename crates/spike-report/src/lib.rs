//! Spike incident reporting.
//!
//! Pulls incidents for each configured team from the Spike REST API,
//! flattens them into rows of display strings and writes CSV reports.
//!
//! ## Pipeline
//!
//! ```text
//! ReportConfig ──► SpikeClient ──► Incident ──► flatten() ──► Row ──► write_csv()
//!                      ▲                           │
//!                      └──── UserResolver ◄────────┘
//!                           (id → name cache)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use spike_report::{collect, ReportConfig, ReportOptions, SpikeClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ReportConfig::from_env()?;
//! let client = SpikeClient::from_config(&config)?;
//!
//! let mut options = ReportOptions::default();
//! options.flatten.zone = config.zone;
//!
//! let report = collect(&client, &config.teams, &options, config.lookup_pause).await;
//! spike_report::write_csv(std::io::stdout(), &report.rows, &options.columns(), &config.zone)?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod columns;
pub mod config;
pub mod error;
pub mod flatten;
pub mod models;
pub mod report;
pub mod resolver;
pub mod time;

pub use client::{IncidentFeed, SpikeClient, UserDirectory};
pub use columns::{Column, ColumnSet};
pub use config::{ReportConfig, TeamContext};
pub use error::SpikeError;
pub use flatten::{flatten, FlattenOptions, NoteDayAnchor, Row};
pub use models::{Entry, EntryRecord, Incident, InlineUser, TeamSummary, User, UserRef};
pub use report::{
    collect, report_file_name, write_csv, write_teams_csv, DateWindow, Report, ReportOptions,
    TeamOutcome, TEAMS_FILE_NAME,
};
pub use resolver::{UserCache, UserResolver};
pub use time::DisplayZone;
