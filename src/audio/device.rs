//! Audio device enumeration and stream configuration
//!
//! Input devices are addressed by their index in the default host's
//! enumeration order, which is what `list_devices` reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};

use crate::error::{AudioError, AudioResult};

/// Information about an audio input device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Position in the host's input device list
    pub index: usize,
    /// Human-readable device name
    pub name: String,
    /// Maximum input channels
    pub channels: u16,
    /// Native (default) sample rate
    pub sample_rate: u32,
}

/// List devices on the default host that can capture audio
pub fn list_devices() -> AudioResult<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    let mut infos = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = match device.name() {
            Ok(n) => n,
            Err(_) => continue,
        };

        let config = match device.default_input_config() {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Skipping input device {}: {}", name, e);
                continue;
            }
        };

        infos.push(DeviceInfo {
            index,
            name,
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
        });
    }

    Ok(infos)
}

/// Resolve an input device by index, or the host default when `None`
pub fn input_device(index: Option<usize>) -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    match index {
        None => host.default_input_device().ok_or(AudioError::NoDevice("input")),
        Some(index) => host
            .input_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .nth(index)
            .ok_or(AudioError::DeviceNotFound(index)),
    }
}

/// Default output device of the default host
pub fn output_device() -> AudioResult<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoDevice("output"))
}

/// Build a stream config for `device` at our sample rate and block size.
///
/// The block size is fixed when the device advertises support for it,
/// otherwise the backend default is used and sources re-chunk.
pub fn stream_config(
    device: &cpal::Device,
    input: bool,
    sample_rate_hz: u32,
    block_size: usize,
) -> AudioResult<StreamConfig> {
    let supported = if input {
        device.default_input_config()
    } else {
        device.default_output_config()
    }
    .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    if supported.sample_format() != SampleFormat::F32 {
        return Err(AudioError::UnsupportedFormat(format!(
            "{:?}",
            supported.sample_format()
        )));
    }

    let buffer_size = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max }
            if (*min as usize..=*max as usize).contains(&block_size) =>
        {
            BufferSize::Fixed(block_size as u32)
        }
        _ => {
            log::debug!(
                "Device does not advertise {}-frame blocks, using backend default",
                block_size
            );
            BufferSize::Default
        }
    };

    Ok(StreamConfig {
        channels: supported.channels(),
        sample_rate: SampleRate(sample_rate_hz),
        buffer_size,
    })
}

/// Error callback for a stream: log the transient fault and count it.
///
/// Faults never stop the stream; the affected block is simply lost.
pub fn fault_handler(
    label: &'static str,
    faults: Arc<AtomicU64>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        faults.fetch_add(1, Ordering::Relaxed);
        log::warn!("{} stream fault: {}", label, err);
    }
}

/// Average interleaved multi-channel frames down to mono, one sample per frame
pub fn downmix_frame(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}
