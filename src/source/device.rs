//! CPAL input device source.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};

use super::{AudioSource, SourceConnection};
use crate::block::AudioBlock;
use crate::format::{downmix_into, RENDER_QUANTUM};
use crate::processor::ProcessorHandle;
use crate::VolumeMeterError;

/// Microphone or other input device opened through CPAL.
///
/// The stream runs in the device's default input configuration. Samples
/// are downmixed to mono and fed to the node in blocks of
/// [`RENDER_QUANTUM`] frames.
#[must_use]
pub struct DeviceSource {
    device: Device,
    name: String,
}

impl DeviceSource {
    /// Opens the default input device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultDevice` if no default input device is configured.
    pub fn open_default() -> Result<Self, VolumeMeterError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(VolumeMeterError::NoDefaultDevice)?;
        let name = device.name().unwrap_or_else(|_| "default".to_string());

        Ok(Self { device, name })
    }

    /// Opens a specific input device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, VolumeMeterError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| VolumeMeterError::BackendError(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(Self {
                        device,
                        name: device_name,
                    });
                }
            }
        }

        Err(VolumeMeterError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        node: ProcessorHandle,
    ) -> Result<Stream, VolumeMeterError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let channels = usize::from(config.channels).max(1);
        let mut block = vec![0.0f32; RENDER_QUANTUM];

        self.device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    // Skip the callback rather than wait for the controller
                    let Some(mut node) = node.try_lock() else {
                        return;
                    };
                    for chunk in data.chunks(channels * RENDER_QUANTUM) {
                        let frames = downmix_into(chunk, channels, &mut block);
                        node.process(AudioBlock::mono(&block[..frames]));
                    }
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| VolumeMeterError::BackendError(e.to_string()))
    }
}

impl AudioSource for DeviceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> Result<u32, VolumeMeterError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|e| VolumeMeterError::BackendError(e.to_string()))?;
        Ok(config.sample_rate().0)
    }

    fn connect(&self, node: ProcessorHandle) -> Result<SourceConnection, VolumeMeterError> {
        let supported_config = self
            .device
            .default_input_config()
            .map_err(|e| VolumeMeterError::BackendError(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&config, node)?,
            SampleFormat::I16 => self.build_stream::<i16>(&config, node)?,
            SampleFormat::U16 => self.build_stream::<u16>(&config, node)?,
            format => {
                return Err(VolumeMeterError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream
            .play()
            .map_err(|e| VolumeMeterError::BackendError(e.to_string()))?;

        tracing::info!(
            device = %self.name,
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "Input stream started"
        );

        let name = self.name.clone();
        Ok(SourceConnection::new(move || {
            drop(stream);
            tracing::info!(device = %name, "Input stream stopped");
        }))
    }
}

impl std::fmt::Debug for DeviceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSource")
            .field("name", &self.name)
            .finish()
    }
}
