//! Generation event log.
//!
//! When `event_log` is configured, every generation appends one event to an
//! NDJSON file (one JSON object per line) so runs can be audited later.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: `generate_succeeded` or `generate_failed`
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `template`: Path of the template that was generated
//! - `details`: Freeform object (extension, diagnostic counts, duration)
//!
//! # Usage
//!
//! ```no_run
//! use t4gen::events::{Event, EventAction, append_event};
//! use serde_json::json;
//! use std::path::Path;
//!
//! let event = Event::new(EventAction::GenerateSucceeded)
//!     .with_template("Model.tt")
//!     .with_details(json!({"extension": ".cs"}));
//! append_event(Path::new(".t4gen/events.ndjson"), &event)?;
//! # Ok::<(), t4gen::error::GenerationError>(())
//! ```

use crate::error::{GenerationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Output was generated.
    GenerateSucceeded,
    /// The template produced errors or the processor failed.
    GenerateFailed,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::GenerateSucceeded => write!(f, "generate_succeeded"),
            EventAction::GenerateFailed => write!(f, "generate_failed"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Template the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            template: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            GenerationError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the log at `path`.
///
/// The file and its parent directory are created if missing. Each append
/// writes exactly one line.
pub fn append_event(path: &Path, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| GenerationError::io("failed to create events directory", dir, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| GenerationError::io("failed to open events file", path, e))?;

    writeln!(file, "{}", json_line)
        .map_err(|e| GenerationError::io("failed to write event to", path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::GenerateSucceeded);

        assert_eq!(event.action, EventAction::GenerateSucceeded);
        assert!(!event.actor.is_empty());
        assert!(event.template.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(EventAction::GenerateFailed)
            .with_template("Model.tt")
            .with_details(json!({"errors": 2}));

        let json_line = event.to_ndjson_line().unwrap();

        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.action, EventAction::GenerateFailed);
        assert_eq!(parsed.template, Some("Model.tt".to_string()));
        assert_eq!(parsed.details["errors"], 2);
        assert!(!json_line.contains('\n'));
        assert!(json_line.contains("\"generate_failed\""));
    }

    #[test]
    fn test_event_without_template_omits_field() {
        let json_line = Event::new(EventAction::GenerateSucceeded)
            .to_ndjson_line()
            .unwrap();
        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("template").is_none());
    }

    #[test]
    fn test_append_event_creates_file_and_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("events.ndjson");

        append_event(&path, &Event::new(EventAction::GenerateSucceeded)).unwrap();
        append_event(
            &path,
            &Event::new(EventAction::GenerateFailed).with_template("B.tt"),
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, EventAction::GenerateFailed);
        assert_eq!(second.template.as_deref(), Some("B.tt"));
    }

    #[test]
    fn test_action_display_matches_serialization() {
        for action in [EventAction::GenerateSucceeded, EventAction::GenerateFailed] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action));
        }
    }
}
