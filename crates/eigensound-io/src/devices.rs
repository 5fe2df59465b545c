//! Device enumeration on the platform's default cpal host.

use crate::Result;
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

const FALLBACK_SAMPLE_RATE: u32 = 48000;

/// Device name via `description()`.
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// One audio endpoint as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Device can capture.
    pub is_input: bool,
    /// Device can play.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Lists every named input and output device, each once.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDevice> = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            let Ok(name) = device_name(&device) else {
                continue;
            };
            let default_sample_rate = device
                .default_input_config()
                .map(|c| c.sample_rate())
                .unwrap_or(FALLBACK_SAMPLE_RATE);
            devices.push(AudioDevice {
                name,
                is_input: true,
                is_output: device.default_output_config().is_ok(),
                default_sample_rate,
            });
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            let Ok(name) = device_name(&device) else {
                continue;
            };
            if let Some(existing) = devices.iter_mut().find(|d| d.name == name) {
                existing.is_output = true;
                continue;
            }
            let default_sample_rate = device
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(FALLBACK_SAMPLE_RATE);
            devices.push(AudioDevice {
                name,
                is_input: false,
                is_output: true,
                default_sample_rate,
            });
        }
    }

    tracing::debug!(count = devices.len(), "enumerated audio devices");
    Ok(devices)
}

/// The host's default `(input, output)` devices.
pub fn default_device() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host.default_input_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            is_input: true,
            is_output: false,
            default_sample_rate: d
                .default_input_config()
                .map(|c| c.sample_rate())
                .unwrap_or(FALLBACK_SAMPLE_RATE),
        })
    });

    let output = host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            is_input: false,
            is_output: true,
            default_sample_rate: d
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(FALLBACK_SAMPLE_RATE),
        })
    });

    Ok((input, output))
}
