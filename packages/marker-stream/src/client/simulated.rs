// In-memory streaming transport
//
// Simulates a network of advertised streams without sockets, useful for:
// - Testing the ingestion pipeline without external hardware
// - Injecting stream loss and metadata timeouts on demand
// - Demo and development
//
// Each open connection gets its own bounded drop-oldest queue. Capacity is
// interpreted the way the transport convention does: hundreds of samples for
// irregular-rate streams, seconds of data for regular-rate streams.

use super::{Sample, StreamClient, StreamConnection};
use crate::buffer::CircularBuffer;
use crate::types::{FaultKind, StreamDescriptor, StreamError, StreamResult};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Transport clock value at network creation, keeps every timestamp positive
const CLOCK_BASE_SECS: f64 = 1000.0;

type SampleQueue = Arc<CircularBuffer<Sample>>;

struct SimStream {
    descriptor: StreamDescriptor,
    advertised: bool,
    lost: bool,
    pending_faults: VecDeque<FaultKind>,
    subscribers: Vec<SampleQueue>,
}

#[derive(Default)]
struct NetworkState {
    streams: HashMap<String, SimStream>,
    // Preserves announcement order for discovery results
    order: Vec<String>,
}

/// Shared handle to a simulated network
///
/// Clones share the same set of streams; hand one clone to the console as its
/// `StreamClient` and keep another to publish samples and inject faults.
#[derive(Clone)]
pub struct SimulatedNetwork {
    state: Arc<Mutex<NetworkState>>,
    started: Instant,
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState::default())),
            started: Instant::now(),
        }
    }

    /// Advertise a stream and return its outlet
    ///
    /// Announcing a name that already exists re-advertises it with the new
    /// descriptor and clears any loss flag.
    pub fn announce(&self, descriptor: StreamDescriptor) -> SimulatedOutlet {
        let name = descriptor.name.clone();
        let mut state = self.state.lock();
        match state.streams.get_mut(&name) {
            Some(stream) => {
                stream.descriptor = descriptor;
                stream.advertised = true;
                stream.lost = false;
            }
            None => {
                state.streams.insert(
                    name.clone(),
                    SimStream {
                        descriptor,
                        advertised: true,
                        lost: false,
                        pending_faults: VecDeque::new(),
                        subscribers: Vec::new(),
                    },
                );
                state.order.push(name.clone());
            }
        }
        log::debug!("Simulated stream announced: {}", name);

        SimulatedOutlet {
            name,
            network: self.clone(),
        }
    }

    /// Stop advertising a stream; open connections see it as lost
    pub fn withdraw(&self, name: &str) {
        let mut state = self.state.lock();
        if let Some(stream) = state.streams.get_mut(name) {
            stream.advertised = false;
            stream.lost = true;
        }
    }

    /// Mark a stream lost (or recovered) without withdrawing it
    pub fn set_lost(&self, name: &str, lost: bool) {
        if let Some(stream) = self.state.lock().streams.get_mut(name) {
            stream.lost = lost;
        }
    }

    /// Make the next metadata refresh on `name` fail with `fault`
    pub fn fail_next_metadata(&self, name: &str, fault: FaultKind) {
        if let Some(stream) = self.state.lock().streams.get_mut(name) {
            stream.pending_faults.push_back(fault);
        }
    }

    /// Samples overwritten in the inlet buffers of open connections to `name`
    pub fn overwritten_samples(&self, name: &str) -> u64 {
        self.state
            .lock()
            .streams
            .get(name)
            .map(|s| s.subscribers.iter().map(|q| q.overwritten()).sum())
            .unwrap_or(0)
    }

    /// Number of open connections subscribed to `name`
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .streams
            .get(name)
            .map(|s| s.subscribers.len())
            .unwrap_or(0)
    }

    fn now(&self) -> f64 {
        CLOCK_BASE_SECS + self.started.elapsed().as_secs_f64()
    }

    fn deliver(&self, name: &str, sample: Sample) -> usize {
        let state = self.state.lock();
        match state.streams.get(name) {
            Some(stream) if !stream.lost => {
                for queue in &stream.subscribers {
                    queue.push(sample.clone());
                }
                stream.subscribers.len()
            }
            _ => 0,
        }
    }

    fn unsubscribe(&self, name: &str, queue: &SampleQueue) {
        if let Some(stream) = self.state.lock().streams.get_mut(name) {
            stream.subscribers.retain(|q| !Arc::ptr_eq(q, queue));
        }
    }
}

/// Convert an open capacity into a sample count
fn queue_capacity(descriptor: &StreamDescriptor, buffer_capacity: usize) -> usize {
    let samples = if descriptor.is_irregular() {
        buffer_capacity.saturating_mul(100)
    } else {
        (buffer_capacity as f64 * descriptor.nominal_rate).ceil() as usize
    };
    samples.max(1)
}

impl StreamClient for SimulatedNetwork {
    fn discover(&self, _timeout: f64) -> StreamResult<Vec<StreamDescriptor>> {
        let state = self.state.lock();
        Ok(state
            .order
            .iter()
            .filter_map(|name| state.streams.get(name))
            .filter(|s| s.advertised)
            .map(|s| s.descriptor.clone())
            .collect())
    }

    fn open(
        &self,
        descriptor: &StreamDescriptor,
        buffer_capacity: usize,
    ) -> StreamResult<Box<dyn StreamConnection>> {
        let mut state = self.state.lock();
        let stream = state
            .streams
            .get_mut(&descriptor.name)
            .ok_or_else(|| StreamError::StreamNotFound(descriptor.name.clone()))?;

        let queue: SampleQueue = Arc::new(CircularBuffer::new(queue_capacity(
            &stream.descriptor,
            buffer_capacity,
        )));
        stream.subscribers.push(Arc::clone(&queue));

        Ok(Box::new(SimulatedConnection {
            descriptor: stream.descriptor.clone(),
            queue,
            network: self.clone(),
            closed: false,
        }))
    }

    fn local_clock(&self) -> f64 {
        self.now()
    }
}

/// Publisher side of a simulated stream
#[derive(Clone)]
pub struct SimulatedOutlet {
    name: String,
    network: SimulatedNetwork,
}

impl SimulatedOutlet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish a sample stamped with the current transport time
    ///
    /// Returns the number of connections it was delivered to.
    pub fn push_sample<S: AsRef<str>>(&self, values: &[S]) -> usize {
        let timestamp = self.network.now();
        self.push_sample_at(values, timestamp)
    }

    /// Publish a sample with an explicit source timestamp
    pub fn push_sample_at<S: AsRef<str>>(&self, values: &[S], timestamp: f64) -> usize {
        let values = values.iter().map(|v| v.as_ref().to_string()).collect();
        self.network.deliver(&self.name, Sample::new(values, timestamp))
    }
}

struct SimulatedConnection {
    descriptor: StreamDescriptor,
    queue: SampleQueue,
    network: SimulatedNetwork,
    closed: bool,
}

impl SimulatedConnection {
    fn is_lost(&self) -> bool {
        self.network
            .state
            .lock()
            .streams
            .get(&self.descriptor.name)
            .map(|s| s.lost)
            .unwrap_or(true)
    }
}

impl StreamConnection for SimulatedConnection {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn metadata(&self, timeout: f64) -> StreamResult<StreamDescriptor> {
        let mut state = self.network.state.lock();
        let stream = state
            .streams
            .get_mut(&self.descriptor.name)
            .ok_or_else(|| StreamError::StreamLost(self.descriptor.name.clone()))?;

        if stream.lost {
            return Err(StreamError::StreamLost(format!(
                "{} is no longer available",
                self.descriptor.name
            )));
        }

        match stream.pending_faults.pop_front() {
            Some(FaultKind::StreamLost) => Err(StreamError::StreamLost(format!(
                "{} is no longer available",
                self.descriptor.name
            ))),
            Some(FaultKind::Timeout) => Err(StreamError::Timeout(format!(
                "metadata for {} not received within {}s",
                self.descriptor.name, timeout
            ))),
            Some(FaultKind::Other) => Err(StreamError::Transport(format!(
                "simulated failure on {}",
                self.descriptor.name
            ))),
            None => Ok(stream.descriptor.clone()),
        }
    }

    fn samples_available(&self) -> usize {
        self.queue.len()
    }

    fn pull_sample(&self, _timeout: f64) -> StreamResult<Sample> {
        if self.closed {
            return Ok(Sample::none());
        }
        if self.queue.is_empty() && self.is_lost() {
            return Err(StreamError::StreamLost(self.descriptor.name.clone()));
        }
        Ok(self.queue.pop().unwrap_or_else(Sample::none))
    }

    fn close(&mut self) {
        if !self.closed {
            self.network.unsubscribe(&self.descriptor.name, &self.queue);
            let overwritten = self.queue.overwritten();
            if overwritten > 0 {
                log::debug!(
                    "Simulated inlet on '{}' overwrote {} samples",
                    self.descriptor.name,
                    overwritten
                );
            }
            self.queue.clear();
            self.closed = true;
        }
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        self.close();
    }
}
