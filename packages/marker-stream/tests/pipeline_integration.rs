use marker_stream::{
    ChannelFormat, ConsoleConfig, FaultKind, MarkerConsole, SimulatedNetwork, StreamDescriptor,
};
use std::sync::Arc;

// =============================================================================
// HELPERS
// =============================================================================

fn console_with(config: ConsoleConfig) -> (SimulatedNetwork, MarkerConsole) {
    let network = SimulatedNetwork::new();
    let console = MarkerConsole::new(Arc::new(network.clone()), config).unwrap();
    (network, console)
}

fn view(console: &MarkerConsole) -> Vec<String> {
    console.filtered_view().map(|e| e.content.clone()).collect()
}

// =============================================================================
// DISCOVERY AND CONNECTIONS
// =============================================================================

#[test]
fn test_discover_then_connect_selected_streams() {
    let (network, mut console) = console_with(ConsoleConfig::default());
    assert!(console.refresh_streams().unwrap().is_empty());

    let markers = network.announce(StreamDescriptor::marker("Markers"));
    let eeg = network.announce(StreamDescriptor::new("EEG", 8, ChannelFormat::Float32, 250.0));

    let found = console.refresh_streams().unwrap().to_vec();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1].channel_count, 8);
    assert_eq!(found[1].rate_label(), "250.000");

    let desc = console.find_stream("Markers").unwrap().clone();
    assert!(console.toggle(&desc));

    markers.push_sample(&["stimulus"]);
    eeg.push_sample(&["0.1", "0.2", "0.3", "0.4", "0.5", "0.6", "0.7", "0.8"]);
    console.tick();

    assert_eq!(view(&console), vec!["stimulus"]);
    assert_eq!(network.subscriber_count("EEG"), 0);
}

#[test]
fn test_disconnect_stops_polling_immediately() {
    let (network, mut console) = console_with(ConsoleConfig::default());
    let outlet = network.announce(StreamDescriptor::marker("Markers"));
    let desc = StreamDescriptor::marker("Markers");

    console.toggle(&desc);
    outlet.push_sample(&["before"]);
    console.tick();

    assert!(!console.toggle(&desc));
    outlet.push_sample(&["after"]);
    console.tick();

    assert_eq!(view(&console), vec!["before"]);
    assert_eq!(network.subscriber_count("Markers"), 0);
}

// =============================================================================
// FAULTS
// =============================================================================

#[test]
fn test_timeout_on_one_tick_recovers_on_next() {
    let (network, mut console) = console_with(ConsoleConfig::default());
    let outlet = network.announce(StreamDescriptor::marker("Markers"));
    console.toggle(&StreamDescriptor::marker("Markers"));

    network.fail_next_metadata("Markers", FaultKind::Timeout);
    outlet.push_sample(&["n"]);
    let report = console.tick();
    assert_eq!(report.entries, 0);
    assert_eq!(report.faults[0].kind, FaultKind::Timeout);
    assert!(console.is_connected("Markers"));

    outlet.push_sample(&["n+1"]);
    let report = console.tick();
    assert_eq!(report.entries, 2);
    assert_eq!(view(&console), vec!["n", "n+1"]);
    assert!(console.is_connected("Markers"));
}

#[test]
fn test_withdrawn_stream_stays_registered() {
    let (network, mut console) = console_with(ConsoleConfig::default());
    let outlet = network.announce(StreamDescriptor::marker("Markers"));
    console.toggle(&StreamDescriptor::marker("Markers"));

    network.withdraw("Markers");
    for _ in 0..3 {
        let report = console.tick();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].kind, FaultKind::StreamLost);
    }
    assert!(console.is_connected("Markers"));
    assert_eq!(console.stats().faults, 3);

    // Re-announced under the same name, the existing connection resumes
    network.announce(StreamDescriptor::marker("Markers"));
    outlet.push_sample(&["back"]);
    let report = console.tick();
    assert!(report.faults.is_empty());
    assert_eq!(view(&console), vec!["back"]);
}

// =============================================================================
// BOUNDS
// =============================================================================

#[test]
fn test_backlog_and_capacity_bounds_together() {
    let config = ConsoleConfig {
        log_capacity: 50,
        max_batch: 20,
        ..Default::default()
    };
    let (network, mut console) = console_with(config);
    let outlet = network.announce(StreamDescriptor::marker("Markers"));
    console.toggle(&StreamDescriptor::marker("Markers"));

    for i in 0..500 {
        outlet.push_sample(&[format!("m{}", i)]);
    }
    let report = console.tick();
    assert_eq!(report.entries, 21);
    assert_eq!(report.discarded, 479);

    for round in 0..5 {
        for i in 0..20 {
            outlet.push_sample(&[format!("r{}-{}", round, i)]);
        }
        console.tick();
        assert!(console.history().len() <= 50);
    }

    let history: Vec<String> = console.history().map(|e| e.content.clone()).collect();
    assert_eq!(history.len(), 50);
    assert_eq!(history.last().unwrap(), "r4-19");
    assert_eq!(history.first().unwrap(), "r2-10");
}

#[test]
fn test_entries_keep_per_stream_order() {
    let (network, mut console) = console_with(ConsoleConfig::default());
    let a = network.announce(StreamDescriptor::marker("A"));
    let b = network.announce(StreamDescriptor::marker("B"));
    console.toggle(&StreamDescriptor::marker("A"));
    console.toggle(&StreamDescriptor::marker("B"));

    for i in 0..10 {
        a.push_sample(&[format!("a{}", i)]);
        b.push_sample(&[format!("b{}", i)]);
    }
    console.tick();

    for stream in ["A", "B"] {
        let times: Vec<_> = console
            .history()
            .filter(|e| e.stream_name == stream)
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(times.len(), 10);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}
