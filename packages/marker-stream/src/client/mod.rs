// Streaming-data client abstraction
//
// The transport that discovers streams and pulls samples lives behind the
// `StreamClient` and `StreamConnection` traits so the ingestion core never
// depends on a particular network library.
//
// Current implementations:
// - Simulated: in-memory streams for tests, demos and offline development
// - LSL: Lab Streaming Layer (behind the `lsl-support` feature)

#[cfg(feature = "lsl-support")]
pub mod lsl;
pub mod simulated;

use crate::types::{StreamDescriptor, StreamResult};

#[cfg(feature = "lsl-support")]
pub use self::lsl::LslClient;
pub use simulated::{SimulatedNetwork, SimulatedOutlet};

/// One pulled sample
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Channel values rendered as strings, one per channel
    pub values: Vec<String>,

    /// Source timestamp in the transport clock; <= 0 means "no sample"
    pub timestamp: f64,
}

impl Sample {
    pub fn new(values: Vec<String>, timestamp: f64) -> Self {
        Self { values, timestamp }
    }

    /// The value a pull returns when nothing is buffered
    pub fn none() -> Self {
        Self {
            values: Vec::new(),
            timestamp: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timestamp > 0.0
    }
}

/// Discovery and connection factory for a streaming transport
pub trait StreamClient: Send + Sync {
    /// Time-bounded scan for advertised streams
    ///
    /// An empty result means nothing was found before the timeout.
    fn discover(&self, timeout: f64) -> StreamResult<Vec<StreamDescriptor>>;

    /// Open an inbound connection buffering at most `buffer_capacity` units
    fn open(
        &self,
        descriptor: &StreamDescriptor,
        buffer_capacity: usize,
    ) -> StreamResult<Box<dyn StreamConnection>>;

    /// Current time in the clock domain of source timestamps (seconds)
    fn local_clock(&self) -> f64;
}

/// An open inbound connection to one stream
///
/// Dropping a connection releases its transport resources; `close` does the
/// same eagerly.
pub trait StreamConnection: Send {
    fn descriptor(&self) -> &StreamDescriptor;

    /// Refresh stream metadata, failing with `StreamLost` or `Timeout`
    fn metadata(&self, timeout: f64) -> StreamResult<StreamDescriptor>;

    /// Samples buffered by the transport and not yet pulled
    fn samples_available(&self) -> usize;

    /// Pull the oldest buffered sample, or `Sample::none()` if there is none
    fn pull_sample(&self, timeout: f64) -> StreamResult<Sample>;

    fn close(&mut self);
}
