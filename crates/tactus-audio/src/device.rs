//! Audio device selection

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use crate::{AudioError, AudioResult};

/// Get the audio host (platform-specific backend)
pub fn get_host() -> Host {
    // On Linux, prefer JACK when available; everywhere else the default
    // host (CoreAudio on macOS, WASAPI on Windows) is the right choice.

    #[cfg(target_os = "linux")]
    {
        if let Some(host) = cpal::available_hosts()
            .into_iter()
            .find(|h| *h == cpal::HostId::Jack)
        {
            if let Ok(host) = cpal::host_from_id(host) {
                return host;
            }
        }
        cpal::default_host()
    }

    #[cfg(not(target_os = "linux"))]
    {
        cpal::default_host()
    }
}

/// Get the default output device
pub fn get_default_output_device() -> AudioResult<Device> {
    let host = get_host();
    let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

    if let Ok(name) = device.name() {
        log::debug!("Using output device: {}", name);
    }

    Ok(device)
}
