//! Real-time audio output using cpal
//! Works with JACK, ALSA, CoreAudio, WASAPI, etc.
//!
//! Producers (text triggers, the silence ticker) render events on their own
//! thread and only take the ring lock for the final blend. The device
//! callback takes the same lock just long enough to copy one block out.
//! The cpal stream lives on a dedicated thread so `stop()` can be called
//! from anywhere.

use crate::error::{MurmurError, Result};
use crate::hum::{HumGenerator, HumPhase};
use crate::materials::Material;
use crate::monitor::SoundSink;
use crate::ring::GrainRing;
use crate::synth::{render, GrainRequest};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rand::Rng;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

/// Output sample rate (Hz)
pub const SAMPLE_RATE: u32 = 44100;
/// Preferred frames per device callback
pub const FRAMES_PER_BUFFER: u32 = 1024;
/// Length of the mix ring (seconds)
pub const RING_SECONDS: f32 = 2.0;
/// Running sums in the ring are clamped to this
pub const MIX_CEILING: f32 = 1.0;
/// Output is linear below this level and saturates smoothly above it
const SOFT_KNEE: f32 = 0.6;

/// Device parameters for `SoundEngine::start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Requested callback size; `None` lets the device choose
    pub frames_per_buffer: Option<u32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frames_per_buffer: Some(FRAMES_PER_BUFFER),
        }
    }
}

fn lock_ring(ring: &Mutex<GrainRing>) -> MutexGuard<'_, GrainRing> {
    ring.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Smooth limiter: identity below the knee, tanh shoulder up to 1.0
pub fn soft_clip(x: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude <= SOFT_KNEE {
        return x;
    }
    let headroom = 1.0 - SOFT_KNEE;
    let shaped = SOFT_KNEE + headroom * ((magnitude - SOFT_KNEE) / headroom).tanh();
    shaped.copysign(x)
}

/// Output stage: ring contents plus live hum, scaled by volume.
/// Owned by whoever pulls audio (the device callback or an offline render).
#[derive(Clone)]
pub struct Mixer {
    ring: Arc<Mutex<GrainRing>>,
    hum: HumGenerator,
    hum_phase: HumPhase,
    volume: f32,
    scratch: Vec<f32>,
}

impl Mixer {
    pub fn new(ring: Arc<Mutex<GrainRing>>, sample_rate: f32, volume: f32) -> Self {
        Self {
            ring,
            hum: HumGenerator::new(sample_rate),
            hum_phase: HumPhase::default(),
            volume: volume.clamp(0.0, 1.0),
            scratch: vec![0.0; FRAMES_PER_BUFFER as usize],
        }
    }

    /// Fill a mono block. Always produces `out.len()` samples.
    pub fn process(&mut self, out: &mut [f32]) {
        lock_ring(&self.ring).read_into(out);
        self.hum.add_to(out, &mut self.hum_phase);
        for sample in out.iter_mut() {
            *sample = soft_clip(*sample * self.volume);
        }
    }

    /// Fill an interleaved device buffer, copying mono to every channel
    fn process_interleaved<T>(&mut self, output: &mut [T], channels: usize)
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = channels.max(1);
        let frames = output.len() / channels;
        if self.scratch.len() < frames {
            self.scratch.resize(frames, 0.0);
        }

        let mut block = std::mem::take(&mut self.scratch);
        self.process(&mut block[..frames]);
        for (frame, &sample) in output.chunks_mut(channels).zip(block.iter()) {
            for channel in frame.iter_mut() {
                *channel = T::from_sample(sample);
            }
        }
        self.scratch = block;
    }
}

/// Thread that owns the cpal stream
struct DeviceThread {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Mixing engine: owns the ring, synthesises events and drives the device
pub struct SoundEngine {
    material: &'static Material,
    volume: f32,
    sample_rate: f32,
    ring: Arc<Mutex<GrainRing>>,
    device: Mutex<Option<DeviceThread>>,
}

impl SoundEngine {
    pub fn new(material: &'static Material, volume: f32) -> Self {
        Self::with_sample_rate(material, volume, SAMPLE_RATE)
    }

    pub fn with_sample_rate(material: &'static Material, volume: f32, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        Self {
            material,
            volume: volume.clamp(0.0, 1.0),
            sample_rate,
            ring: Arc::new(Mutex::new(GrainRing::with_duration(
                RING_SECONDS,
                sample_rate,
                MIX_CEILING,
            ))),
            device: Mutex::new(None),
        }
    }

    /// Character used by the `SoundSink` triggers
    pub fn material(&self) -> &'static Material {
        self.material
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Shared handle to the mix ring
    pub fn ring(&self) -> Arc<Mutex<GrainRing>> {
        Arc::clone(&self.ring)
    }

    /// A fresh output stage reading from this engine's ring
    pub fn mixer(&self) -> Mixer {
        Mixer::new(self.ring(), self.sample_rate, self.volume)
    }

    pub fn is_running(&self) -> bool {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Claim the default output device and start pulling audio.
    /// Calling `start` on a running engine is a no-op.
    pub fn start(&self, output: &OutputConfig) -> Result<()> {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        if device.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let mixer = self.mixer();
        let sample_rate = self.sample_rate as u32;
        let output = output.clone();

        let handle = thread::Builder::new()
            .name("murmur-audio".to_string())
            .spawn(move || match open_stream(mixer, sample_rate, &output) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until stop() or the engine is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                    info!("Audio stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| MurmurError::DeviceUnavailable(format!("cannot spawn audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *device = Some(DeviceThread { stop_tx, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(MurmurError::DeviceUnavailable(
                    "audio thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Release the output device. Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        let thread = self
            .device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            let _ = thread.stop_tx.send(());
            if thread.handle.join().is_err() {
                warn!("Audio thread panicked during shutdown");
            }
        }
    }

    /// Render `request` and blend it into the ring. Returns the rendered length.
    pub fn play<R: Rng + ?Sized>(&self, request: &GrainRequest, rng: &mut R) -> usize {
        let samples = render(request, self.sample_rate, rng);
        if samples.is_empty() {
            return 0;
        }
        lock_ring(&self.ring).blend(&samples);
        samples.len()
    }

    pub fn play_grain(&self, material: &Material, velocity: f32, octave_shift: i32) {
        let request = GrainRequest::grain(material, velocity, octave_shift);
        self.play(&request, &mut rand::thread_rng());
    }

    pub fn play_chime(&self, material: &Material) {
        debug!("Chime ({})", material.name);
        self.play(&GrainRequest::chime(material), &mut rand::thread_rng());
    }

    pub fn play_attention(&self, material: &Material) {
        debug!("Attention ({})", material.name);
        self.play(&GrainRequest::attention(material), &mut rand::thread_rng());
    }
}

impl SoundSink for SoundEngine {
    fn grain(&self, velocity: f32, octave_shift: i32) {
        self.play_grain(self.material, velocity, octave_shift);
    }

    fn chime(&self) {
        self.play_chime(self.material);
    }

    fn attention(&self) {
        self.play_attention(self.material);
    }
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(mixer: Mixer, sample_rate: u32, output: &OutputConfig) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    info!("Audio host: {:?}", host.id());

    let device = host
        .default_output_device()
        .ok_or_else(|| MurmurError::DeviceUnavailable("no default output device".to_string()))?;
    info!(
        "Audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = device
        .default_output_config()
        .map_err(|e| MurmurError::DeviceUnavailable(format!("no output config: {}", e)))?;
    let channels = supported.channels();
    let sample_format = supported.sample_format();

    let mut config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: output
            .frames_per_buffer
            .map(cpal::BufferSize::Fixed)
            .unwrap_or(cpal::BufferSize::Default),
    };

    let stream = match build_for_format(&device, &config, sample_format, mixer.clone()) {
        Ok(stream) => stream,
        Err(e) if config.buffer_size != cpal::BufferSize::Default => {
            warn!("Fixed buffer size rejected ({}), using device default", e);
            config.buffer_size = cpal::BufferSize::Default;
            build_for_format(&device, &config, sample_format, mixer)?
        }
        Err(e) => return Err(e),
    };

    stream
        .play()
        .map_err(|e| MurmurError::DeviceUnavailable(format!("failed to start stream: {}", e)))?;
    info!(
        "Audio stream started at {} Hz, {} channel(s), {:?}",
        sample_rate, channels, config.buffer_size
    );

    Ok(stream)
}

fn build_for_format(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: Mixer,
) -> Result<cpal::Stream> {
    let channels = config.channels as usize;
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, mixer, channels),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, mixer, channels),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, mixer, channels),
        other => {
            return Err(MurmurError::DeviceUnavailable(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };
    stream.map_err(|e| MurmurError::DeviceUnavailable(format!("failed to build stream: {}", e)))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
    channels: usize,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            mixer.process_interleaved(data, channels);
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )
}
