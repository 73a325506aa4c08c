// Host protocol - messages between the host and its presentation layer
// Newline-delimited JSON: UiEvents out on stdout, HostCommands in on stdin

use serde::{Deserialize, Serialize};

/// Source tag for an archive opened from a file
pub const SOURCE_WARC: &str = "warc";

/// Source tag for content acquired through the swarm
pub const SOURCE_DAT: &str = "dat";

// ============================================================================
// Host -> presentation events
// ============================================================================

/// One-way notification to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum UiEvent {
    /// Navigate the app view to a path
    #[serde(rename = "change-location")]
    ChangeLocation { path: String },
    /// A load has started; `src` is `warc` or `dat`
    #[serde(rename = "initializing")]
    Initializing { src: String },
    /// Content download progress, 0-100
    #[serde(rename = "indexProgress")]
    IndexProgress { perct: u8 },
    /// Player worker is reachable and indexing `source`
    #[serde(rename = "indexing")]
    Indexing {
        host: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Desktop worker is reachable and the proxy routes to it
    #[serde(rename = "worker-ready")]
    WorkerReady { host: String, port: u16 },
    /// Answer to a status query
    #[serde(rename = "status")]
    Status(StatusSnapshot),
    /// A content sync ended before its launch
    #[serde(rename = "sync-failed")]
    SyncFailed { key: String, message: String },
}

/// Configuration half of the status snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfigSnapshot {
    /// Base URL of the current worker, when one is reachable
    pub host: Option<String>,
    /// Version lines reported by the worker binary
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub config: HostConfigSnapshot,
    /// Diagnostic log, newline-joined
    pub stdout: String,
}

// ============================================================================
// Presentation -> host commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
pub enum HostCommand {
    /// OS file-open event; queued until the UI is ready
    OpenFile { path: String },
    /// Open an archive immediately
    OpenArchive { path: String },
    /// The presentation layer can receive events
    UiReady,
    /// Acquire content for a swarm key, then open it
    Sync { key: String },
    /// Request a status snapshot
    Status,
    /// Persist state and exit
    Quit,
}

// ============================================================================
// Helpers for message framing
// ============================================================================

/// Serialize a message to JSON bytes with newline delimiter
pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Deserialize a message from JSON bytes (strips trailing newline)
pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, serde_json::Error> {
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let trimmed = trimmed.strip_suffix(b"\r").unwrap_or(trimmed);
    serde_json::from_slice(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_names() {
        let event = UiEvent::IndexProgress { perct: 42 };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "indexProgress", "data": {"perct": 42}})
        );

        let event = UiEvent::ChangeLocation { path: "/".into() };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "change-location", "data": {"path": "/"}})
        );
    }

    #[test]
    fn test_status_snapshot_shape() {
        let event = UiEvent::Status(StatusSnapshot {
            config: HostConfigSnapshot {
                host: Some("http://localhost:54231/".into()),
                version: "webrecorder 1.0".into(),
            },
            stdout: "a\nb".into(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["config"]["host"], "http://localhost:54231/");
        assert_eq!(value["data"]["stdout"], "a\nb");
    }

    #[test]
    fn test_commands_parse_from_lines() {
        let cmd: HostCommand =
            deserialize_message(b"{\"cmd\":\"open-file\",\"path\":\"/tmp/a.warc\"}\n").unwrap();
        assert_eq!(cmd, HostCommand::OpenFile { path: "/tmp/a.warc".into() });

        let cmd: HostCommand = deserialize_message(b"{\"cmd\":\"ui-ready\"}\r\n").unwrap();
        assert_eq!(cmd, HostCommand::UiReady);

        assert!(deserialize_message::<HostCommand>(b"{\"cmd\":\"reboot\"}").is_err());
    }

    #[test]
    fn test_serialized_messages_are_single_lines() {
        let bytes = serialize_message(&UiEvent::SyncFailed {
            key: "abc".into(),
            message: "line one\nline two".into(),
        })
        .unwrap();
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(bytes.last(), Some(&b'\n'));
    }
}
