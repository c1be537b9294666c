// Lab Streaming Layer (LSL) client
//
// Discovers LSL streams on the local network and opens inlets on them.
// Inlets are created with recovery enabled: after an outlet restarts, the
// metadata refresh that reported `StreamLost` succeeds again on a later tick.
// Stream infos from the last discovery are cached by name so opening an inlet
// never runs a second resolve.

use super::{Sample, StreamClient, StreamConnection};
use crate::types::{ChannelFormat, StreamDescriptor, StreamError, StreamResult};
use ::lsl::{Pullable, StreamInfo, StreamInlet};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Streaming client backed by liblsl
#[derive(Default)]
pub struct LslClient {
    resolved: Mutex<HashMap<String, StreamInfo>>,
}

impl LslClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn map_error(err: ::lsl::Error, context: &str) -> StreamError {
    match err {
        ::lsl::Error::Timeout => StreamError::Timeout(context.to_string()),
        ::lsl::Error::StreamLost => StreamError::StreamLost(context.to_string()),
        other => StreamError::Transport(format!("{}: {:?}", context, other)),
    }
}

fn map_format(format: ::lsl::ChannelFormat) -> ChannelFormat {
    match format {
        ::lsl::ChannelFormat::Float32 => ChannelFormat::Float32,
        ::lsl::ChannelFormat::Double64 => ChannelFormat::Double64,
        ::lsl::ChannelFormat::String => ChannelFormat::String,
        ::lsl::ChannelFormat::Int8 => ChannelFormat::Int8,
        ::lsl::ChannelFormat::Int16 => ChannelFormat::Int16,
        ::lsl::ChannelFormat::Int32 => ChannelFormat::Int32,
        ::lsl::ChannelFormat::Int64 => ChannelFormat::Int64,
        _ => ChannelFormat::Undefined,
    }
}

fn describe(info: &StreamInfo) -> StreamDescriptor {
    StreamDescriptor {
        name: info.stream_name(),
        channel_count: info.channel_count().max(0) as usize,
        channel_format: map_format(info.channel_format()),
        nominal_rate: info.nominal_srate(),
    }
}

impl StreamClient for LslClient {
    fn discover(&self, timeout: f64) -> StreamResult<Vec<StreamDescriptor>> {
        let streams =
            ::lsl::resolve_streams(timeout).map_err(|e| map_error(e, "stream resolution"))?;
        let descriptors = streams.iter().map(describe).collect();

        let mut resolved = self.resolved.lock();
        resolved.clear();
        for info in streams {
            resolved.insert(info.stream_name(), info);
        }
        Ok(descriptors)
    }

    fn open(
        &self,
        descriptor: &StreamDescriptor,
        buffer_capacity: usize,
    ) -> StreamResult<Box<dyn StreamConnection>> {
        let resolved = self.resolved.lock();
        let info = resolved
            .get(&descriptor.name)
            .ok_or_else(|| StreamError::StreamNotFound(descriptor.name.clone()))?;

        let inlet = StreamInlet::new(info, buffer_capacity as i32, 0, true)
            .map_err(|e| map_error(e, &descriptor.name))?;

        log::debug!(
            "LSL inlet opened on '{}' ({} channels, {})",
            descriptor.name,
            descriptor.channel_count,
            descriptor.channel_format
        );

        Ok(Box::new(LslConnection {
            descriptor: describe(info),
            inlet: Some(inlet),
        }))
    }

    fn local_clock(&self) -> f64 {
        ::lsl::local_clock()
    }
}

struct LslConnection {
    descriptor: StreamDescriptor,
    inlet: Option<StreamInlet>,
}

impl LslConnection {
    fn inlet(&self) -> StreamResult<&StreamInlet> {
        self.inlet
            .as_ref()
            .ok_or_else(|| StreamError::StreamLost(format!("{} is closed", self.descriptor.name)))
    }
}

impl StreamConnection for LslConnection {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn metadata(&self, timeout: f64) -> StreamResult<StreamDescriptor> {
        let info = self
            .inlet()?
            .info(timeout)
            .map_err(|e| map_error(e, &self.descriptor.name))?;
        Ok(describe(&info))
    }

    fn samples_available(&self) -> usize {
        self.inlet
            .as_ref()
            .map(|inlet| inlet.samples_available() as usize)
            .unwrap_or(0)
    }

    fn pull_sample(&self, timeout: f64) -> StreamResult<Sample> {
        let (values, timestamp): (Vec<String>, f64) = self
            .inlet()?
            .pull_sample(timeout)
            .map_err(|e| map_error(e, &self.descriptor.name))?;
        Ok(Sample::new(values, timestamp))
    }

    fn close(&mut self) {
        if self.inlet.take().is_some() {
            log::debug!("LSL inlet closed on '{}'", self.descriptor.name);
        }
    }
}
