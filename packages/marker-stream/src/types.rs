// Common types for marker stream ingestion
//
// Stream descriptors as reported by discovery, the immutable log entries
// produced by the poller, and the error taxonomy shared by every component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur during streaming operations
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream lost: {0}")]
    StreamLost(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StreamError {
    /// Classify an error raised while refreshing stream metadata
    pub fn kind(&self) -> FaultKind {
        match self {
            StreamError::StreamLost(_) => FaultKind::StreamLost,
            StreamError::Timeout(_) => FaultKind::Timeout,
            _ => FaultKind::Other,
        }
    }
}

/// Classification of a transient per-connection fault
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FaultKind {
    StreamLost,
    Timeout,
    Other,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FaultKind::StreamLost => "stream lost",
            FaultKind::Timeout => "timeout",
            FaultKind::Other => "transport error",
        };
        f.write_str(label)
    }
}

/// Value type carried by every channel of a stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChannelFormat {
    Float32,
    Double64,
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Undefined,
}

impl fmt::Display for ChannelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelFormat::Float32 => "float32",
            ChannelFormat::Double64 => "double64",
            ChannelFormat::String => "string",
            ChannelFormat::Int8 => "int8",
            ChannelFormat::Int16 => "int16",
            ChannelFormat::Int32 => "int32",
            ChannelFormat::Int64 => "int64",
            ChannelFormat::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// Identity and shape of a discoverable stream
///
/// Immutable snapshot returned by discovery. `name` is the unique key used by
/// the connection manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamDescriptor {
    pub name: String,
    pub channel_count: usize,
    pub channel_format: ChannelFormat,
    /// Nominal sampling rate in Hz, 0 for irregular-rate streams
    pub nominal_rate: f64,
}

impl StreamDescriptor {
    pub fn new(
        name: impl Into<String>,
        channel_count: usize,
        channel_format: ChannelFormat,
        nominal_rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            channel_count,
            channel_format,
            nominal_rate,
        }
    }

    /// A single-channel, irregular-rate string stream
    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(name, 1, ChannelFormat::String, 0.0)
    }

    pub fn is_irregular(&self) -> bool {
        self.nominal_rate <= 0.0
    }

    /// Nominal rate formatted the way the stream list shows it
    pub fn rate_label(&self) -> String {
        format!("{:.3}", self.nominal_rate)
    }
}

/// One decoded marker
///
/// Created by the sample poller and never mutated afterwards. `seq` is assigned
/// by the log store on append and identifies the entry across both views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(default)]
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub stream_name: String,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        content: impl Into<String>,
        stream_name: impl Into<String>,
    ) -> Self {
        Self {
            seq: 0,
            timestamp,
            content: content.into(),
            stream_name: stream_name.into(),
        }
    }

    /// Wall-clock time as `HH:MM:SS.fff`
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }
}

/// Connection status of a stream as seen by the display layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl From<bool> for ConnectionState {
    fn from(connected: bool) -> Self {
        if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

/// Events emitted by the marker console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsoleEvent {
    /// A new entry passed the active filter
    EntryAppended,
    /// The filtered view was recomputed after a filter change
    ViewRebuilt,
    Connected {
        stream: String,
    },
    Disconnected {
        stream: String,
    },
    StreamFault {
        stream: String,
        kind: FaultKind,
        message: String,
    },
    Cleared,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fault_classification() {
        assert_eq!(
            StreamError::StreamLost("gone".into()).kind(),
            FaultKind::StreamLost
        );
        assert_eq!(StreamError::Timeout("slow".into()).kind(), FaultKind::Timeout);
        assert_eq!(
            StreamError::Transport("socket".into()).kind(),
            FaultKind::Other
        );
    }

    #[test]
    fn test_time_label_millisecond_precision() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let entry = LogEntry::new(ts, "Start", "Markers");
        assert_eq!(entry.time_label(), "22:13:20.123");
    }

    #[test]
    fn test_rate_label() {
        let desc = StreamDescriptor::new("EEG", 8, ChannelFormat::Float32, 250.0);
        assert_eq!(desc.rate_label(), "250.000");
        assert!(!desc.is_irregular());
        assert!(StreamDescriptor::marker("Markers").is_irregular());
    }

    #[test]
    fn test_console_event_tagged_json() {
        let event = ConsoleEvent::StreamFault {
            stream: "Markers".into(),
            kind: FaultKind::Timeout,
            message: "Timeout: slow".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StreamFault");
        assert_eq!(json["stream"], "Markers");
        assert_eq!(json["kind"], "Timeout");

        let cleared = serde_json::to_string(&ConsoleEvent::Cleared).unwrap();
        assert_eq!(cleared, r#"{"type":"Cleared"}"#);
        let back: ConsoleEvent = serde_json::from_str(&cleared).unwrap();
        assert_eq!(back, ConsoleEvent::Cleared);
    }

    #[test]
    fn test_connection_state_from_bool() {
        assert_eq!(ConnectionState::from(true), ConnectionState::Connected);
        assert_eq!(ConnectionState::from(false), ConnectionState::Disconnected);
    }
}
