// Stream discovery
//
// Wraps the client's time-bounded scan and keeps the last result so the
// display layer can render connect/disconnect controls between refreshes.

use crate::client::StreamClient;
use crate::types::{StreamDescriptor, StreamResult};
use std::sync::Arc;

pub struct StreamRegistry {
    client: Arc<dyn StreamClient>,
    streams: Vec<StreamDescriptor>,
}

impl StreamRegistry {
    pub fn new(client: Arc<dyn StreamClient>) -> Self {
        Self {
            client,
            streams: Vec::new(),
        }
    }

    /// Scan for advertised streams, replacing the cached list
    ///
    /// An empty result is not an error; it means nothing was found yet.
    pub fn discover(&mut self, timeout: f64) -> StreamResult<&[StreamDescriptor]> {
        let streams = self.client.discover(timeout)?;

        if streams.is_empty() {
            log::info!("No streams resolved within {}s", timeout);
        } else {
            let listing = streams
                .iter()
                .fold(format!("Resolved Streams: {}", streams.len()), |acc, s| {
                    acc + &format!("\n - {}", s.name)
                });
            log::info!("{}", listing);
        }

        self.streams = streams;
        Ok(&self.streams)
    }

    /// Streams found by the most recent scan
    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn find(&self, name: &str) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| s.name == name)
    }
}
