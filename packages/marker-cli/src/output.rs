use marker_stream::{LogEntry, StreamDescriptor};
use std::io::Write;

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    if compact {
        serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {}", e))
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))
    }
}

/// Write lines to stdout, one per item.
pub fn write_lines<I>(lines: I) -> Result<(), String>
where
    I: IntoIterator<Item = String>,
{
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for line in lines {
        handle
            .write_all(line.as_bytes())
            .and_then(|_| handle.write_all(b"\n"))
            .map_err(|e| format!("Failed to write to stdout: {}", e))?;
    }
    handle
        .flush()
        .map_err(|e| format!("Failed to write to stdout: {}", e))
}

/// One log row: time, marker content, stream name.
pub fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{}  {}  [{}]",
        entry.time_label(),
        entry.content,
        entry.stream_name
    )
}

/// One stream-list row: name, channel count, format, nominal rate.
pub fn format_stream(stream: &StreamDescriptor) -> String {
    format!(
        "{:<32} {:>4} ch  {:<9} {:>10} Hz",
        stream.name,
        stream.channel_count,
        stream.channel_format.to_string(),
        stream.rate_label()
    )
}
