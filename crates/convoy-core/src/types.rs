//! Domain records shared by the store and the device agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog application as the store advertises it to robots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub app_id: String,
    pub name: String,
    pub version: String,
    /// Download source consumed by the installer.
    pub url: String,
}

/// An (app, version) pair a robot currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledAppRef {
    pub app_id: String,
    pub version: String,
}

/// Installation lifecycle of one application on one robot.
///
/// Serialized names match the wire contract (`SCHEDULED`, `PICKEDUP`, ...).
/// There is no persisted terminal state for an exhausted retry budget; the
/// last `Error` transition in the log trail marks the abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationState {
    Scheduled,
    PickedUp,
    Completed,
    Error,
}

impl ApplicationState {
    /// Wire/storage name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::PickedUp => "PICKEDUP",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for ApplicationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "PICKEDUP" => Ok(Self::PickedUp),
            "COMPLETED" => Ok(Self::Completed),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown application state '{other}'")),
        }
    }
}

/// Canonical, store-owned installation record.
///
/// Exactly one exists per (app_id, robot_id); `state_id` is allocated on the
/// first transition and never changes afterwards. `installed_version` only
/// advances on a `Completed` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateRecord {
    pub state_id: String,
    pub app_id: String,
    pub robot_id: String,
    pub state: ApplicationState,
    pub version: String,
    pub installed_version: String,
    pub retries: u32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub op_performed_at: DateTime<Utc>,
}

/// Immutable snapshot of one state transition, appended per report.
///
/// The append is best-effort on the store side, so consumers must tolerate
/// duplicate or missing entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub log_id: String,
    pub state_id: String,
    pub app_id: String,
    pub robot_id: String,
    pub state: ApplicationState,
    pub message: Option<String>,
    pub version: String,
    pub retries: u32,
    pub entered_at: DateTime<Utc>,
    pub op_performed_at: DateTime<Utc>,
}

/// Alert handed to the notifier once repeated failure crosses the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationAlert {
    pub robot_id: String,
    pub app_id: String,
    pub version: String,
    pub reason: String,
}
