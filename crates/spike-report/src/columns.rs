//! Report columns and the presets that select them.

use std::fmt;
use std::str::FromStr;

use crate::error::SpikeError;
use crate::flatten::Row;
use crate::time::DisplayZone;

/// One report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Team,
    CounterId,
    Message,
    Assignees,
    Priority,
    Status,
    Source,
    Created,
    Acknowledged,
    Resolved,
    Notes,
    Comments,
}

impl Column {
    /// Every column in row order.
    pub const ALL: [Self; 12] = [
        Self::Team,
        Self::CounterId,
        Self::Message,
        Self::Assignees,
        Self::Priority,
        Self::Status,
        Self::Source,
        Self::Created,
        Self::Acknowledged,
        Self::Resolved,
        Self::Notes,
        Self::Comments,
    ];

    /// Header text. Timestamp headers name the display zone.
    #[must_use]
    pub fn header(self, zone: &DisplayZone) -> String {
        match self {
            Self::Team => "Team Name".to_string(),
            Self::CounterId => "Counter ID".to_string(),
            Self::Message => "Message".to_string(),
            Self::Assignees => "Assignee Email".to_string(),
            Self::Priority => "Priority".to_string(),
            Self::Status => "Status".to_string(),
            Self::Source => "Source".to_string(),
            Self::Created => format!("Created ({zone})"),
            Self::Acknowledged => format!("ACK At ({zone})"),
            Self::Resolved => format!("Resolved At ({zone})"),
            Self::Notes => "Notes".to_string(),
            Self::Comments => "Comments".to_string(),
        }
    }

    /// Cell for this column in `row`.
    #[must_use]
    pub fn value(self, row: &Row) -> &str {
        match self {
            Self::Team => &row.team,
            Self::CounterId => &row.counter_id,
            Self::Message => &row.message,
            Self::Assignees => &row.assignees,
            Self::Priority => &row.priority,
            Self::Status => &row.status,
            Self::Source => &row.source,
            Self::Created => &row.created,
            Self::Acknowledged => &row.acknowledged,
            Self::Resolved => &row.resolved,
            Self::Notes => &row.notes,
            Self::Comments => &row.comments,
        }
    }
}

/// Column presets matching the report variants in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnSet {
    /// All twelve columns.
    #[default]
    Full,
    /// Everything except resolution time and comments.
    Dashboard,
    /// Team, counter, message, priority, status, created, resolved, notes.
    Summary,
}

impl ColumnSet {
    /// Columns of this preset, optionally without comments.
    #[must_use]
    pub fn columns(self, include_comments: bool) -> Vec<Column> {
        let preset: &[Column] = match self {
            Self::Full => &Column::ALL,
            Self::Dashboard => &[
                Column::Team,
                Column::CounterId,
                Column::Message,
                Column::Assignees,
                Column::Priority,
                Column::Status,
                Column::Source,
                Column::Created,
                Column::Acknowledged,
                Column::Notes,
            ],
            Self::Summary => &[
                Column::Team,
                Column::CounterId,
                Column::Message,
                Column::Priority,
                Column::Status,
                Column::Created,
                Column::Resolved,
                Column::Notes,
            ],
        };

        preset
            .iter()
            .copied()
            .filter(|c| include_comments || *c != Column::Comments)
            .collect()
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Dashboard => write!(f, "dashboard"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

impl FromStr for ColumnSet {
    type Err = SpikeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "dashboard" => Ok(Self::Dashboard),
            "summary" => Ok(Self::Summary),
            other => Err(SpikeError::Config(format!(
                "unknown column set '{other}' (expected full, dashboard or summary)"
            ))),
        }
    }
}
