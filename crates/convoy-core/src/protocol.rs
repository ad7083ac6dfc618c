//! Request and response payloads for the store's HTTP surface.
//!
//! Field names are camelCase on the wire; timestamps ride as RFC 3339
//! strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Application, ApplicationState, InstalledAppRef};

/// `POST /api/apps` request: a robot reporting what it currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAppsRequest {
    pub robot_id: String,
    #[serde(default)]
    pub installed_apps: Vec<InstalledAppRef>,
}

/// `POST /api/apps` response: everything the robot still needs to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAppsResponse {
    pub robot_id: String,
    #[serde(default)]
    pub applications: Vec<Application>,
}

/// `POST /api/state-update` request: one installation-state transition.
///
/// `retry_count` is the count at the moment of the report; the agent
/// increments only after a failed attempt has been reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub app_id: String,
    pub robot_id: String,
    pub version: String,
    pub retry_count: u32,
    pub state: ApplicationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StateUpdate {
    /// A SCHEDULED transition as the store records it when handing an app
    /// to a robot.
    pub fn scheduled(app: &Application, robot_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            app_id: app.app_id.clone(),
            robot_id: robot_id.to_string(),
            version: app.version.clone(),
            retry_count: 0,
            state: ApplicationState::Scheduled,
            message: None,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn fetch_apps_request_round_trips() {
        let raw = r#"{"robotId":"robot-7","installedApps":[{"appId":"x","version":"1.0"}]}"#;
        let request: FetchAppsRequest = serde_json::from_str(raw).unwrap();

        assert_eq!(request.robot_id, "robot-7");
        assert_eq!(request.installed_apps.len(), 1);
        assert_eq!(request.installed_apps[0].app_id, "x");

        let encoded = serde_json::to_string(&request).unwrap();
        assert!(encoded.contains("\"robotId\":\"robot-7\""));
    }

    #[test]
    fn missing_installed_apps_defaults_to_empty() {
        let request: FetchAppsRequest = serde_json::from_str(r#"{"robotId":"r"}"#).unwrap();
        assert!(request.installed_apps.is_empty());
    }

    #[test]
    fn state_update_serializes_wire_fields() {
        let update = StateUpdate {
            app_id: "app-1".to_string(),
            robot_id: "robot-7".to_string(),
            version: "2.0".to_string(),
            retry_count: 1,
            state: ApplicationState::Error,
            message: Some("installation failed: disk full".to_string()),
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["appId"], "app-1");
        assert_eq!(value["retryCount"], 1);
        assert_eq!(value["state"], "ERROR");
    }
}
