// Real-time marker stream ingestion
//
// Discovers labeled-event streams on the local network, keeps at most one
// connection per stream, polls connected streams once per tick and collects
// decoded markers into a bounded, filterable log.
//
// Architecture:
// - `client`: Transport abstraction (simulated, LSL)
// - `registry`: Stream discovery
// - `connection`: Connection lifecycle, one per stream name
// - `poller`: Per-tick pull, backlog discard and decode
// - `log_store`: Bounded history and filtered view
// - `console`: Facade driven by a display layer

pub mod buffer;
pub mod client;
pub mod config;
pub mod connection;
pub mod console;
pub mod log_store;
pub mod poller;
pub mod registry;
pub mod types;

pub use client::{Sample, SimulatedNetwork, SimulatedOutlet, StreamClient, StreamConnection};
pub use config::ConsoleConfig;
pub use connection::ConnectionManager;
pub use console::{MarkerConsole, ViewRefresh};
pub use log_store::{FilterPredicate, LogStore};
pub use poller::{ClockMapping, PollReport, PollStats, SamplePoller, StreamFault};
pub use registry::StreamRegistry;
pub use types::{
    ChannelFormat, ConnectionState, ConsoleEvent, FaultKind, LogEntry, StreamDescriptor,
    StreamError, StreamResult,
};

#[cfg(feature = "lsl-support")]
pub use client::LslClient;
