//! Background hum: a few detuned low sines, summed.
//!
//! The oscillators sit within a fraction of a hertz of each other so the
//! sum beats slowly. Phase is carried across calls, so successive blocks
//! join without discontinuities.

use std::f64::consts::TAU;

/// One hum oscillator
#[derive(Debug, Clone, Copy)]
pub struct HumVoice {
    pub freq_hz: f64,
    pub amplitude: f32,
}

/// Default voices around low A (55 Hz)
pub const DEFAULT_VOICES: [HumVoice; 3] = [
    HumVoice {
        freq_hz: 55.0,
        amplitude: 0.008,
    },
    HumVoice {
        freq_hz: 55.3,
        amplitude: 0.008,
    },
    HumVoice {
        freq_hz: 54.85,
        amplitude: 0.005,
    },
];

/// Oscillator phases (radians) carried between blocks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HumPhase {
    phases: [f64; DEFAULT_VOICES.len()],
}

/// Continuous low-amplitude background texture
#[derive(Debug, Clone)]
pub struct HumGenerator {
    voices: [HumVoice; DEFAULT_VOICES.len()],
    increments: [f64; DEFAULT_VOICES.len()],
}

impl HumGenerator {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_voices(DEFAULT_VOICES, sample_rate)
    }

    pub fn with_voices(voices: [HumVoice; DEFAULT_VOICES.len()], sample_rate: f32) -> Self {
        let mut increments = [0.0; DEFAULT_VOICES.len()];
        if sample_rate > 0.0 {
            for (inc, voice) in increments.iter_mut().zip(voices.iter()) {
                *inc = TAU * voice.freq_hz / sample_rate as f64;
            }
        }
        Self { voices, increments }
    }

    /// Upper bound of the summed amplitude
    pub fn max_amplitude(&self) -> f32 {
        self.voices.iter().map(|v| v.amplitude.abs()).sum()
    }

    /// Add `out.len()` hum samples into `out`, advancing `phase`
    pub fn add_to(&self, out: &mut [f32], phase: &mut HumPhase) {
        for sample in out.iter_mut() {
            let mut sum = 0.0f32;
            for (i, voice) in self.voices.iter().enumerate() {
                sum += voice.amplitude * phase.phases[i].sin() as f32;
                phase.phases[i] = (phase.phases[i] + self.increments[i]) % TAU;
            }
            *sample += sum;
        }
    }

    /// The next `frame_count` hum samples and the phase to continue from
    pub fn sample(&self, frame_count: usize, phase: HumPhase) -> (Vec<f32>, HumPhase) {
        let mut next = phase;
        let mut out = vec![0.0; frame_count];
        self.add_to(&mut out, &mut next);
        (out, next)
    }
}
