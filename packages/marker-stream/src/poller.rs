// Per-tick sample polling
//
// Each tick visits every open connection once:
// 1. Metadata refresh with a short timeout; a failure skips the connection
//    for this tick only
// 2. One-sample probe so the transport refreshes its backlog counter
// 3. Backlog discard down to `max_batch` samples, favouring fresh data
// 4. Batch pull and decode into log entries, oldest first
//
// A failing stream never stops the others from being polled.

use crate::client::{Sample, StreamClient, StreamConnection};
use crate::connection::ConnectionManager;
use crate::log_store::LogStore;
use crate::types::{FaultKind, LogEntry, StreamError, StreamResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maps transport timestamps onto wall-clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockMapping {
    offset_secs: f64,
}

impl ClockMapping {
    /// Source timestamps that are already Unix seconds
    pub fn unix() -> Self {
        Self { offset_secs: 0.0 }
    }

    pub fn with_offset(offset_secs: f64) -> Self {
        Self { offset_secs }
    }

    /// Offset between the wall clock and the client's clock, taken now
    pub fn capture(client: &dyn StreamClient) -> Self {
        let wall = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        Self::with_offset(wall - client.local_clock())
    }

    pub fn to_wall(&self, source_timestamp: f64) -> DateTime<Utc> {
        let micros = ((source_timestamp + self.offset_secs) * 1_000_000.0).round() as i64;
        DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// A transient fault observed on one connection during a tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamFault {
    pub stream: String,
    pub kind: FaultKind,
    pub message: String,
}

/// Outcome of one polling pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PollReport {
    /// Entries appended to the log store
    pub entries: usize,
    /// Entries that also passed the active filter
    pub visible: usize,
    /// Backlog samples dropped without decoding
    pub discarded: usize,
    pub faults: Vec<StreamFault>,
}

/// Cumulative polling statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PollStats {
    pub ticks: u64,
    pub entries_emitted: u64,
    pub samples_discarded: u64,
    pub invalid_samples: u64,
    pub faults: u64,
}

pub struct SamplePoller {
    max_batch: usize,
    liveness_timeout: f64,
    stats: PollStats,
}

impl SamplePoller {
    pub fn new(max_batch: usize, liveness_timeout: f64) -> Self {
        Self {
            max_batch: max_batch.max(1),
            liveness_timeout,
            stats: PollStats::default(),
        }
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Poll every open connection once and append decoded entries to `store`
    pub fn poll(
        &mut self,
        connections: &ConnectionManager,
        store: &mut LogStore,
        clock: ClockMapping,
    ) -> PollReport {
        let mut report = PollReport::default();

        for (name, connection) in connections.connections() {
            if let Err(e) = self.poll_connection(name, connection, store, clock, &mut report) {
                report_fault(name, &e);
                report.faults.push(StreamFault {
                    stream: name.to_string(),
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }

        self.stats.ticks += 1;
        self.stats.entries_emitted += report.entries as u64;
        self.stats.samples_discarded += report.discarded as u64;
        self.stats.faults += report.faults.len() as u64;
        report
    }

    fn poll_connection(
        &mut self,
        name: &str,
        connection: &dyn StreamConnection,
        store: &mut LogStore,
        clock: ClockMapping,
        report: &mut PollReport,
    ) -> StreamResult<()> {
        let info = connection.metadata(self.liveness_timeout)?;

        // The backlog counter only refreshes on pull
        self.pull_batch(name, info.channel_count, connection, 1, store, clock, report)?;

        let available = connection.samples_available().min(self.max_batch);
        let discarded = self.discard_backlog(connection)?;
        if discarded > 0 {
            log::debug!("Discarded {} stale samples from '{}'", discarded, name);
            report.discarded += discarded;
        }

        self.pull_batch(
            name,
            info.channel_count,
            connection,
            available,
            store,
            clock,
            report,
        )
    }

    /// Drop the oldest buffered samples until at most `max_batch` remain
    fn discard_backlog(&self, connection: &dyn StreamConnection) -> StreamResult<usize> {
        let mut discarded = 0;
        while connection.samples_available() > self.max_batch {
            let sample = connection.pull_sample(0.0)?;
            if sample == Sample::none() {
                break;
            }
            discarded += 1;
        }
        Ok(discarded)
    }

    #[allow(clippy::too_many_arguments)]
    fn pull_batch(
        &mut self,
        name: &str,
        channel_count: usize,
        connection: &dyn StreamConnection,
        count: usize,
        store: &mut LogStore,
        clock: ClockMapping,
        report: &mut PollReport,
    ) -> StreamResult<()> {
        for _ in 0..count {
            let pending = connection.samples_available() > 0;
            let sample = connection.pull_sample(0.0)?;
            if !sample.is_valid() {
                // An empty pull is "nothing new", not a bad sample
                if pending {
                    self.stats.invalid_samples += 1;
                }
                continue;
            }

            let entry = decode(name, channel_count, &sample, clock);
            report.entries += 1;
            if store.append(entry) {
                report.visible += 1;
            }
        }
        Ok(())
    }
}

/// Decode one sample into a log entry with comma-joined channel values
pub fn decode(
    stream_name: &str,
    channel_count: usize,
    sample: &Sample,
    clock: ClockMapping,
) -> LogEntry {
    let values = if channel_count > 0 && sample.values.len() > channel_count {
        &sample.values[..channel_count]
    } else {
        &sample.values[..]
    };
    LogEntry::new(clock.to_wall(sample.timestamp), values.join(", "), stream_name)
}

fn report_fault(name: &str, error: &StreamError) {
    log::info!("{}", fault_message(name, error));
}

fn fault_message(name: &str, error: &StreamError) -> String {
    match error.kind() {
        FaultKind::StreamLost | FaultKind::Timeout => format!("{} ({})", error, name),
        FaultKind::Other => format!("Exception ({}): {}", name, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SimulatedNetwork, SimulatedOutlet};
    use crate::types::{ChannelFormat, StreamDescriptor};
    use std::sync::Arc;

    struct Harness {
        network: SimulatedNetwork,
        connections: ConnectionManager,
        store: LogStore,
        poller: SamplePoller,
    }

    impl Harness {
        fn new(buffer_capacity: usize) -> Self {
            let network = SimulatedNetwork::new();
            Self {
                connections: ConnectionManager::new(Arc::new(network.clone()), buffer_capacity),
                network,
                store: LogStore::new(1000),
                poller: SamplePoller::new(100, 0.1),
            }
        }

        fn connect(&mut self, descriptor: StreamDescriptor) -> SimulatedOutlet {
            let outlet = self.network.announce(descriptor.clone());
            assert!(self.connections.toggle(&descriptor));
            outlet
        }

        fn tick(&mut self) -> PollReport {
            self.poller
                .poll(&self.connections, &mut self.store, ClockMapping::unix())
        }

        fn contents(&self) -> Vec<String> {
            self.store.history().map(|e| e.content.clone()).collect()
        }
    }

    #[test]
    fn test_decodes_in_pull_order() {
        let mut h = Harness::new(100);
        let outlet = h.connect(StreamDescriptor::marker("Markers"));

        outlet.push_sample_at(&["start"], 1_700_000_000.5);
        outlet.push_sample_at(&["stop"], 1_700_000_001.0);

        let report = h.tick();
        assert_eq!(report.entries, 2);
        assert!(report.faults.is_empty());
        assert_eq!(h.contents(), vec!["start", "stop"]);

        let first = h.store.history().next().unwrap();
        assert_eq!(first.stream_name, "Markers");
        assert_eq!(first.time_label(), "22:13:20.500");
    }

    #[test]
    fn test_multichannel_comma_joined() {
        let mut h = Harness::new(100);
        let outlet = h.connect(StreamDescriptor::new("Pair", 2, ChannelFormat::String, 0.0));
        outlet.push_sample(&["left", "right"]);
        h.tick();
        assert_eq!(h.contents(), vec!["left, right"]);
    }

    #[test]
    fn test_empty_backlog_emits_nothing() {
        let mut h = Harness::new(100);
        h.connect(StreamDescriptor::marker("Markers"));

        let report = h.tick();
        assert_eq!(report.entries, 0);
        assert!(h.store.is_empty());
        assert_eq!(h.poller.stats().invalid_samples, 0);
    }

    #[test]
    fn test_fault_messages_name_the_stream_once() {
        assert_eq!(
            fault_message("A", &StreamError::StreamLost("outlet gone".into())),
            "Stream lost: outlet gone (A)"
        );
        assert_eq!(
            fault_message("A", &StreamError::Timeout("no metadata".into())),
            "Timeout: no metadata (A)"
        );
        assert_eq!(
            fault_message("A", &StreamError::Transport("boom".into())),
            "Exception (A): Transport error: boom"
        );
    }

    #[test]
    fn test_idle_ticks_are_not_invalid_samples() {
        let mut h = Harness::new(100);
        h.connect(StreamDescriptor::marker("Markers"));

        for _ in 0..50 {
            h.tick();
        }
        let stats = h.poller.stats();
        assert_eq!(stats.ticks, 50);
        assert_eq!(stats.invalid_samples, 0);
        assert_eq!(stats.entries_emitted, 0);
    }

    #[test]
    fn test_invalid_timestamps_skipped() {
        let mut h = Harness::new(100);
        let outlet = h.connect(StreamDescriptor::marker("Markers"));
        outlet.push_sample_at(&["bad"], 0.0);
        outlet.push_sample_at(&["good"], 5.0);
        outlet.push_sample_at(&["worse"], -3.0);

        let report = h.tick();
        assert_eq!(report.entries, 1);
        assert_eq!(h.contents(), vec!["good"]);
        assert_eq!(h.poller.stats().invalid_samples, 2);
    }

    #[test]
    fn test_backlog_discard_keeps_newest() {
        let mut h = Harness::new(100);
        let outlet = h.connect(StreamDescriptor::marker("Markers"));
        for i in 0..250 {
            outlet.push_sample(&[format!("m{}", i)]);
        }

        let report = h.tick();
        // Probe emits m0, backlog of 249 is cut to 100
        assert_eq!(report.discarded, 149);
        assert_eq!(report.entries, 101);

        let contents = h.contents();
        assert_eq!(contents[0], "m0");
        assert_eq!(contents[1], "m150");
        assert_eq!(contents.last().unwrap(), "m249");
        assert_eq!(h.poller.stats().samples_discarded, 149);
    }

    #[test]
    fn test_backlog_reduced_to_exactly_max_batch() {
        let network = SimulatedNetwork::new();
        let outlet = network.announce(StreamDescriptor::marker("Markers"));
        let conn = network
            .open(&StreamDescriptor::marker("Markers"), 100)
            .unwrap();
        for i in 0..5000 {
            outlet.push_sample(&[i.to_string()]);
        }

        let poller = SamplePoller::new(100, 0.1);
        let discarded = poller.discard_backlog(conn.as_ref()).unwrap();
        assert_eq!(discarded, 4900);
        assert_eq!(conn.samples_available(), 100);
    }

    #[test]
    fn test_timeout_then_recovery() {
        let mut h = Harness::new(100);
        let outlet = h.connect(StreamDescriptor::marker("Markers"));

        outlet.push_sample(&["during fault"]);
        h.network
            .fail_next_metadata("Markers", FaultKind::Timeout);

        let report = h.tick();
        assert_eq!(report.entries, 0);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].kind, FaultKind::Timeout);
        assert!(h.connections.is_connected("Markers"));

        outlet.push_sample(&["after fault"]);
        let report = h.tick();
        assert!(report.faults.is_empty());
        assert_eq!(h.contents(), vec!["during fault", "after fault"]);
        assert!(h.connections.is_connected("Markers"));
    }

    #[test]
    fn test_lost_stream_does_not_block_others() {
        let mut h = Harness::new(100);
        let a = h.connect(StreamDescriptor::marker("A"));
        let b = h.connect(StreamDescriptor::marker("B"));

        a.push_sample(&["from a"]);
        b.push_sample(&["from b"]);
        h.network.set_lost("A", true);

        let report = h.tick();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].stream, "A");
        assert_eq!(report.faults[0].kind, FaultKind::StreamLost);
        assert_eq!(h.contents(), vec!["from b"]);
        assert_eq!(h.poller.stats().faults, 1);
    }

    #[test]
    fn test_generic_fault_classified_other() {
        let mut h = Harness::new(100);
        h.connect(StreamDescriptor::marker("Markers"));
        h.network.fail_next_metadata("Markers", FaultKind::Other);
        let report = h.tick();
        assert_eq!(report.faults[0].kind, FaultKind::Other);
    }

    #[test]
    fn test_visible_counts_filter_passes() {
        let mut h = Harness::new(100);
        let outlet = h.connect(StreamDescriptor::marker("Markers"));
        h.store
            .set_filter(crate::log_store::FilterPredicate::new("keep", ""));
        outlet.push_sample(&["keep 1"]);
        outlet.push_sample(&["drop"]);
        let report = h.tick();
        assert_eq!(report.entries, 2);
        assert_eq!(report.visible, 1);
    }

    #[test]
    fn test_clock_mapping_offset() {
        let clock = ClockMapping::with_offset(1_700_000_000.0);
        let wall = clock.to_wall(0.25);
        assert_eq!(wall.timestamp_millis(), 1_700_000_000_250);
    }

    #[test]
    fn test_clock_capture_tracks_wall_time() {
        let network = SimulatedNetwork::new();
        let clock = ClockMapping::capture(&network);
        let now = Utc::now();
        let mapped = clock.to_wall(network.local_clock());
        assert!((mapped - now).num_milliseconds().abs() < 1000);
    }
}
