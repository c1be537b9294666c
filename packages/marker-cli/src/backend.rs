use crate::cli::{Backend, ConfigArgs};
use marker_stream::{
    ConsoleConfig, SimulatedNetwork, SimulatedOutlet, StreamClient, StreamDescriptor,
};
use std::sync::Arc;

pub const FAKE_STREAM_NAME: &str = "Fake Marker Stream";

/// Publishes numbered fake markers on the simulated backend
pub struct MarkerGenerator {
    outlet: SimulatedOutlet,
    per_tick: usize,
    next_id: u64,
}

impl MarkerGenerator {
    pub fn new(outlet: SimulatedOutlet, per_tick: usize) -> Self {
        Self {
            outlet,
            per_tick,
            next_id: 0,
        }
    }

    pub fn emit(&mut self) {
        for _ in 0..self.per_tick {
            self.outlet
                .push_sample(&[format!("Fake Marker: {}", self.next_id)]);
            self.next_id += 1;
        }
    }
}

/// A streaming client plus the generator feeding it, if simulated
pub struct ClientSetup {
    pub client: Arc<dyn StreamClient>,
    pub generator: Option<MarkerGenerator>,
}

pub fn create_client(args: &ConfigArgs) -> Result<ClientSetup, String> {
    match args.backend {
        Backend::Simulated => {
            let network = SimulatedNetwork::new();
            let outlet = network.announce(StreamDescriptor::marker(FAKE_STREAM_NAME));
            Ok(ClientSetup {
                client: Arc::new(network),
                generator: Some(MarkerGenerator::new(outlet, args.markers_per_tick)),
            })
        }
        Backend::Lsl => lsl_client(),
    }
}

#[cfg(feature = "lsl-support")]
fn lsl_client() -> Result<ClientSetup, String> {
    Ok(ClientSetup {
        client: Arc::new(marker_stream::LslClient::new()),
        generator: None,
    })
}

#[cfg(not(feature = "lsl-support"))]
fn lsl_client() -> Result<ClientSetup, String> {
    Err("LSL support is not compiled in. Rebuild with --features lsl-support.".into())
}

pub fn available_backends() -> Vec<&'static str> {
    let mut backends = vec!["simulated"];
    if cfg!(feature = "lsl-support") {
        backends.push("lsl");
    }
    backends
}

/// Load the configuration file, if any, and apply flag overrides
pub fn resolve_config(args: &ConfigArgs) -> Result<ConsoleConfig, String> {
    let mut config = match &args.config {
        Some(path) => ConsoleConfig::from_json_file(path)
            .map_err(|e| format!("Failed to load config '{}': {}", path, e))?,
        None => ConsoleConfig::default(),
    };

    if let Some(timeout) = args.timeout {
        config.discovery_timeout_secs = timeout;
    }
    if let Some(capacity) = args.log_capacity {
        config.log_capacity = capacity;
    }
    if let Some(max_batch) = args.max_batch {
        config.max_batch = max_batch;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
