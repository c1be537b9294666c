// Connection lifecycle
//
// Owns the set of open stream connections keyed by stream name. `toggle` is
// the only mutator: it opens a connection when none exists for the name and
// closes it otherwise, so a name is never connected twice.

use crate::client::{Sample, StreamClient, StreamConnection};
use crate::types::{StreamDescriptor, StreamError, StreamResult};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ConnectionManager {
    client: Arc<dyn StreamClient>,
    buffer_capacity: usize,
    connections: BTreeMap<String, Box<dyn StreamConnection>>,
}

impl ConnectionManager {
    pub fn new(client: Arc<dyn StreamClient>, buffer_capacity: usize) -> Self {
        Self {
            client,
            buffer_capacity,
            connections: BTreeMap::new(),
        }
    }

    /// Flip the connection state of `descriptor.name`, returning true if now connected
    pub fn toggle(&mut self, descriptor: &StreamDescriptor) -> bool {
        if let Some(mut connection) = self.connections.remove(&descriptor.name) {
            connection.close();
            log::info!("Disconnected from stream '{}'", descriptor.name);
            return false;
        }

        let opened = self.client.open(descriptor, self.buffer_capacity);
        let connection: Box<dyn StreamConnection> = match opened {
            Ok(connection) => connection,
            Err(e) => {
                // Faults on a dead connection surface during polling
                log::warn!("Failed to open stream '{}': {}", descriptor.name, e);
                Box::new(UnavailableConnection {
                    descriptor: descriptor.clone(),
                    reason: e.to_string(),
                })
            }
        };

        self.connections.insert(descriptor.name.clone(), connection);
        log::info!("Connected to stream '{}'", descriptor.name);
        true
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Names of connected streams in polling order
    pub fn connected_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.connections.keys().map(String::as_str)
    }

    /// Enumerate open connections without changing the set
    pub fn connections(&self) -> impl Iterator<Item = (&str, &dyn StreamConnection)> + '_ {
        self.connections
            .iter()
            .map(|(name, conn)| (name.as_str(), &**conn))
    }

    /// Close every connection
    pub fn close_all(&mut self) {
        for (name, mut connection) in std::mem::take(&mut self.connections) {
            connection.close();
            log::debug!("Closed stream '{}'", name);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Placeholder for a connection the transport refused to open
struct UnavailableConnection {
    descriptor: StreamDescriptor,
    reason: String,
}

impl StreamConnection for UnavailableConnection {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn metadata(&self, _timeout: f64) -> StreamResult<StreamDescriptor> {
        Err(StreamError::Transport(self.reason.clone()))
    }

    fn samples_available(&self) -> usize {
        0
    }

    fn pull_sample(&self, _timeout: f64) -> StreamResult<Sample> {
        Ok(Sample::none())
    }

    fn close(&mut self) {}
}
