// Marker console - the surface a display layer drives
//
// Wires discovery, connections, polling and the log store together. The host
// calls `tick()` once per scheduling interval and `take_refresh()` once per
// display refresh; everything runs on the caller's thread. Connect and
// disconnect intents route through the connection manager's toggle.

use crate::client::StreamClient;
use crate::config::ConsoleConfig;
use crate::connection::ConnectionManager;
use crate::log_store::{FilterPredicate, LogStore};
use crate::poller::{ClockMapping, PollReport, PollStats, SamplePoller};
use crate::registry::StreamRegistry;
use crate::types::{ConnectionState, ConsoleEvent, LogEntry, StreamDescriptor, StreamResult};
use std::sync::Arc;

type EventCallback = Box<dyn Fn(ConsoleEvent) + Send + Sync>;

/// Redraw instruction for the display layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRefresh {
    /// Scroll the log view to its last row
    pub scroll_to_end: bool,
}

pub struct MarkerConsole {
    config: ConsoleConfig,
    client: Arc<dyn StreamClient>,
    registry: StreamRegistry,
    connections: ConnectionManager,
    poller: SamplePoller,
    store: LogStore,
    auto_scroll: bool,
    event_callback: Option<EventCallback>,
}

impl MarkerConsole {
    /// Build a console over `client` after validating `config`
    pub fn new(client: Arc<dyn StreamClient>, config: ConsoleConfig) -> StreamResult<Self> {
        config.validate()?;

        Ok(Self {
            registry: StreamRegistry::new(Arc::clone(&client)),
            connections: ConnectionManager::new(
                Arc::clone(&client),
                config.inlet_buffer_capacity,
            ),
            poller: SamplePoller::new(config.max_batch, config.liveness_timeout_secs),
            store: LogStore::new(config.log_capacity),
            auto_scroll: false,
            event_callback: None,
            client,
            config,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Set event callback function
    pub fn set_event_callback<F>(&mut self, callback: F)
    where
        F: Fn(ConsoleEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
    }

    fn emit_event(&self, event: ConsoleEvent) {
        if let Some(callback) = self.event_callback.as_ref() {
            callback(event);
        }
    }

    // Streams

    /// Rescan the network with the configured discovery timeout
    pub fn refresh_streams(&mut self) -> StreamResult<&[StreamDescriptor]> {
        self.registry.discover(self.config.discovery_timeout_secs)
    }

    /// Streams found by the last refresh
    pub fn streams(&self) -> &[StreamDescriptor] {
        self.registry.streams()
    }

    pub fn find_stream(&self, name: &str) -> Option<&StreamDescriptor> {
        self.registry.find(name)
    }

    pub fn connection_state(&self, name: &str) -> ConnectionState {
        self.connections.is_connected(name).into()
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.connections.is_connected(name)
    }

    pub fn connected_streams(&self) -> Vec<String> {
        self.connections.connected_names().map(str::to_string).collect()
    }

    /// Flip the connection for `descriptor`, returning true if now connected
    pub fn toggle(&mut self, descriptor: &StreamDescriptor) -> bool {
        let connected = self.connections.toggle(descriptor);
        let stream = descriptor.name.clone();
        self.emit_event(if connected {
            ConsoleEvent::Connected { stream }
        } else {
            ConsoleEvent::Disconnected { stream }
        });
        connected
    }

    /// Connect unless already connected; returns the resulting state
    pub fn connect(&mut self, descriptor: &StreamDescriptor) -> bool {
        if self.connections.is_connected(&descriptor.name) {
            return true;
        }
        self.toggle(descriptor)
    }

    /// Disconnect if connected; returns the resulting state
    pub fn disconnect(&mut self, descriptor: &StreamDescriptor) -> bool {
        if !self.connections.is_connected(&descriptor.name) {
            return false;
        }
        self.toggle(descriptor)
    }

    // Polling

    /// Run one polling pass over every connection
    pub fn tick(&mut self) -> PollReport {
        let clock = ClockMapping::capture(self.client.as_ref());
        let report = self
            .poller
            .poll(&self.connections, &mut self.store, clock);

        for fault in &report.faults {
            self.emit_event(ConsoleEvent::StreamFault {
                stream: fault.stream.clone(),
                kind: fault.kind,
                message: fault.message.clone(),
            });
        }
        if report.visible > 0 {
            self.emit_event(ConsoleEvent::EntryAppended);
        }
        report
    }

    pub fn stats(&self) -> &PollStats {
        self.poller.stats()
    }

    /// Append an entry from outside the polling loop
    pub fn append(&mut self, entry: LogEntry) {
        if self.store.append(entry) {
            self.emit_event(ConsoleEvent::EntryAppended);
        }
    }

    // Log view

    pub fn set_filter(&mut self, content: impl Into<String>, stream: impl Into<String>) {
        self.store.set_filter(FilterPredicate::new(content, stream));
        self.emit_event(ConsoleEvent::ViewRebuilt);
    }

    pub fn filter(&self) -> &FilterPredicate {
        self.store.filter()
    }

    /// Empty the log; connections are left untouched
    pub fn clear_log(&mut self) {
        self.store.clear();
        self.emit_event(ConsoleEvent::Cleared);
    }

    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Redraw instruction if the view changed since the last call
    ///
    /// Scroll commands are only produced while auto-scroll is enabled.
    pub fn take_refresh(&mut self) -> Option<ViewRefresh> {
        self.store.take_dirty().then_some(ViewRefresh {
            scroll_to_end: self.auto_scroll,
        })
    }

    pub fn filtered_view(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.store.filtered_view()
    }

    pub fn filtered_since(&self, seq: u64) -> impl Iterator<Item = &LogEntry> + '_ {
        self.store.filtered_since(seq)
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.store.history()
    }

    pub fn log_store(&self) -> &LogStore {
        &self.store
    }
}
