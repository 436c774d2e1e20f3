// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fmt, thread, time::Duration};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, span, Level};

use super::mixer::{Command, Mixer};
use super::thread_priority::raise_callback_priority;
use super::{Buffer, Device as AudioDevice, MixSettings, StemPair, Voice};
use crate::config;

/// Output channels used by the mixer. Extra device channels are left silent.
const OUTPUT_CHANNELS: u16 = 2;

/// A cpal output device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host the device belongs to.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The maximum number of output channels the device supports.
    max_channels: u16,
    /// The output sample rate.
    sample_rate: u32,
    /// Priority of the output callback thread.
    priority: u8,
    /// Whether to request realtime scheduling for the callback thread.
    realtime: bool,
    /// Commands for the mixer living on the output thread. Unset for listed devices.
    commands: Option<Sender<Command>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Output callback: drain pending commands, then mix straight into the cpal buffer.
fn create_callback(
    mut mixer: Mixer,
    commands: Receiver<Command>,
    device_channels: usize,
    priority: u8,
    realtime: bool,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut scratch: Vec<f32> = Vec::new();
    let mut priority_set = false;
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        // The callback runs on a thread owned by cpal.
        if !priority_set {
            raise_callback_priority(priority, realtime);
            priority_set = true;
        }

        while let Ok(command) = commands.try_recv() {
            mixer.apply(command);
        }

        let frames = data.len() / device_channels;
        scratch.resize(frames * OUTPUT_CHANNELS as usize, 0.0);
        mixer.process(&mut scratch);

        for (out, mixed) in data
            .chunks_mut(device_channels)
            .zip(scratch.chunks(OUTPUT_CHANNELS as usize))
        {
            out.fill(0.0);
            for (dst, src) in out.iter_mut().zip(mixed.iter()) {
                *dst = *src;
            }
        }
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let output_configs = match device.supported_output_configs() {
                    Ok(output_configs) => output_configs,
                    Err(_) => continue,
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        host_id,
                        device,
                        max_channels,
                        sample_rate: config::DEFAULT_SAMPLE_RATE,
                        priority: config::DEFAULT_THREAD_PRIORITY,
                        realtime: false,
                        commands: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(mut device) => {
                device.sample_rate = config.sample_rate();
                device.priority = config.thread_priority();
                device.realtime = config.realtime();
                let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
                device.start_output_thread(commands_rx)?;
                device.commands = Some(commands_tx);
                Ok(device)
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    /// Starts the thread that owns the cpal stream. Streams aren't Send, so the
    /// stream is created on, and never leaves, this thread.
    fn start_output_thread(&self, commands: Receiver<Command>) -> Result<(), Box<dyn Error>> {
        let device = self.device.clone();
        let device_channels = self.max_channels.max(OUTPUT_CHANNELS);
        let sample_rate = self.sample_rate;
        let name = self.name.clone();
        let (priority, realtime) = (self.priority, self.realtime);

        thread::Builder::new()
            .name("riyaz-output".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "output (cpal)");
                let _enter = span.enter();

                let config = cpal::StreamConfig {
                    channels: device_channels,
                    sample_rate,
                    buffer_size: cpal::BufferSize::Default,
                };
                let mixer = Mixer::new(OUTPUT_CHANNELS, sample_rate);
                let callback = create_callback(
                    mixer,
                    commands,
                    device_channels as usize,
                    priority,
                    realtime,
                );

                let stream = match device.build_output_stream(
                    &config,
                    callback,
                    |err| error!("CPAL output stream error: {}", err),
                    None,
                ) {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!("Failed to create CPAL stream: {}", e);
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    error!("Failed to start CPAL stream: {}", e);
                    return;
                }
                info!(device = name, sample_rate, "CPAL output stream started");

                // Keep the stream alive.
                loop {
                    thread::sleep(Duration::from_millis(100));
                }
            })?;

        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), Box<dyn Error>> {
        match &self.commands {
            Some(commands) => Ok(commands.send(command)?),
            None => Err(format!("device {} has no output stream", self.name).into()),
        }
    }
}

impl AudioDevice for Device {
    fn start_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>> {
        self.send(Command::StartStems { stems, rate })
    }

    fn queue_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>> {
        self.send(Command::QueueStems { stems, rate })
    }

    fn replace_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>> {
        self.send(Command::ReplaceStems { stems, rate })
    }

    fn stop_stems(&self) {
        if let Err(e) = self.send(Command::StopStems) {
            error!(err = e.as_ref(), "Unable to stop stems");
        }
    }

    fn trigger_note(
        &self,
        voice: Voice,
        note: Buffer,
        delay: Duration,
        velocity: f32,
    ) -> Result<(), Box<dyn Error>> {
        self.send(Command::Note {
            voice,
            note,
            delay,
            velocity,
        })
    }

    fn set_mix(&self, mix: MixSettings) -> Result<(), Box<dyn Error>> {
        self.send(Command::Mix(mix))
    }
}
