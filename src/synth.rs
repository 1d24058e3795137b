//! Grain synthesis
//!
//! One additive routine renders every sound event. A grain is the
//! material's partials, each with its own micro-detune, random start phase
//! and exponential decay, plus a filtered-noise strike and a short diffuse
//! tail. Chimes and attention tones are the same routine with a lower
//! register, slower decay, more reverb and a longer duration.
//!
//! Randomness comes from the caller's `Rng` so rendering is reproducible
//! under a fixed seed.

use crate::envelope::{DecayEnvelope, FadeWindow};
use crate::materials::Material;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use rand::Rng;
use std::f32::consts::TAU;

/// Kind of sound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrainKind {
    /// Short sparkle for a burst of output
    Grain,
    /// Softer, longer tone when a task completes
    Chime,
    /// Two-note rising call after a long silence
    Attention,
}

/// Per-kind shaping of the shared routine
struct Voicing {
    /// Multiplier on the material's base frequency
    register: f32,
    /// Multiplier on every partial decay rate
    decay_scale: f32,
    /// Added to the material's reverb amount
    reverb_boost: f32,
    /// Comb tap spacing
    reverb_delay_ms: f32,
    /// Comb tap gains
    reverb_taps: &'static [f32],
    /// Pitch of each successive note, sharing the duration equally
    notes: &'static [f32],
    /// Peak level after normalisation
    peak: f32,
}

const GRAIN: Voicing = Voicing {
    register: 1.0,
    decay_scale: 1.0,
    reverb_boost: 0.0,
    reverb_delay_ms: 30.0,
    reverb_taps: &[0.4, 0.25, 0.15],
    notes: &[1.0],
    peak: 0.4,
};

const CHIME: Voicing = Voicing {
    register: 0.5,
    decay_scale: 0.3,
    reverb_boost: 0.5,
    reverb_delay_ms: 50.0,
    reverb_taps: &[0.5, 0.35, 0.2, 0.1],
    notes: &[1.0],
    peak: 0.35,
};

// Root then major third
const ATTENTION: Voicing = Voicing {
    register: 0.4,
    decay_scale: 0.15,
    reverb_boost: 0.4,
    reverb_delay_ms: 80.0,
    reverb_taps: &[0.4, 0.25, 0.15],
    notes: &[1.0, 1.25],
    peak: 0.3,
};

/// Attack ramp of the output window
const FADE_IN_MS: f32 = 2.0;
/// Release ramp of the output window
const FADE_OUT_MS: f32 = 5.0;
/// Decay rate of the noise strike (1/s)
const NOISE_DECAY: f32 = 80.0;
/// Length of the noise strike
const NOISE_MS: f32 = 40.0;
/// Strike high-pass corner
const NOISE_CUTOFF_HZ: f32 = 4000.0;
/// Partials at or above this fraction of the sample rate are dropped
const NYQUIST_GUARD: f32 = 0.45;

impl GrainKind {
    fn voicing(&self) -> &'static Voicing {
        match self {
            GrainKind::Grain => &GRAIN,
            GrainKind::Chime => &CHIME,
            GrainKind::Attention => &ATTENTION,
        }
    }

    /// Duration range (min, max) in milliseconds for this kind
    pub fn duration_range_ms(&self, material: &Material) -> (f32, f32) {
        match self {
            GrainKind::Grain => material.grain_duration_ms,
            GrainKind::Chime => (260.0, 340.0),
            GrainKind::Attention => (760.0, 840.0),
        }
    }

    /// Duration range (min, max) in samples for this kind
    pub fn duration_range_samples(&self, material: &Material, sample_rate: f32) -> (usize, usize) {
        if !(sample_rate > 0.0 && sample_rate.is_finite()) {
            return (0, 0);
        }
        let (min_ms, max_ms) = self.duration_range_ms(material);
        let min = (min_ms.max(0.0) * 0.001 * sample_rate) as usize;
        let max = (max_ms.max(0.0) * 0.001 * sample_rate) as usize;
        (min.min(max), max.max(min))
    }

    /// Peak level of a rendered event at velocity 1.0
    pub fn peak(&self) -> f32 {
        self.voicing().peak
    }
}

/// One trigger's worth of synthesis parameters
#[derive(Debug, Clone, Copy)]
pub struct GrainRequest<'a> {
    pub material: &'a Material,
    pub kind: GrainKind,
    /// Loudness scalar (0-1)
    pub velocity: f32,
    /// Register shift in octaves
    pub octave_shift: i32,
}

impl<'a> GrainRequest<'a> {
    pub fn grain(material: &'a Material, velocity: f32, octave_shift: i32) -> Self {
        Self {
            material,
            kind: GrainKind::Grain,
            velocity,
            octave_shift,
        }
    }

    pub fn chime(material: &'a Material) -> Self {
        Self {
            material,
            kind: GrainKind::Chime,
            velocity: 1.0,
            octave_shift: 0,
        }
    }

    pub fn attention(material: &'a Material) -> Self {
        Self {
            material,
            kind: GrainKind::Attention,
            velocity: 1.0,
            octave_shift: 0,
        }
    }
}

/// Render one sound event into a finite buffer.
///
/// Returns an empty buffer for a non-positive sample rate or a zero-length
/// duration; callers treat that as a no-op.
pub fn render<R: Rng + ?Sized>(request: &GrainRequest, sample_rate: f32, rng: &mut R) -> Vec<f32> {
    let material = request.material;
    let voicing = request.kind.voicing();

    let (min_len, max_len) = request.kind.duration_range_samples(material, sample_rate);
    if max_len == 0 {
        return Vec::new();
    }
    let len = if min_len == max_len {
        max_len
    } else {
        rng.gen_range(min_len..=max_len)
    };
    if len == 0 {
        return Vec::new();
    }

    let mut out = vec![0.0f32; len];

    let register = voicing.register * 2f32.powi(request.octave_shift.clamp(-4, 4));
    let fundamental = material.base_frequency_hz * register;
    let note_len = len / voicing.notes.len();
    for (n, &pitch) in voicing.notes.iter().enumerate() {
        let start = n * note_len;
        let end = if n + 1 == voicing.notes.len() {
            len
        } else {
            start + note_len
        };
        add_partials(
            material,
            fundamental * pitch,
            voicing.decay_scale,
            sample_rate,
            &mut out[start..end],
            rng,
        );
    }

    add_strike(material.attack_noise_amount, sample_rate, &mut out, rng);

    let reverb = (material.reverb_amount + voicing.reverb_boost).clamp(0.0, 1.0);
    diffuse(&mut out, reverb, voicing, sample_rate);

    let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 && peak.is_finite() {
        let gain = voicing.peak / peak;
        for sample in out.iter_mut() {
            *sample *= gain;
        }
    } else {
        out.iter_mut().for_each(|s| *s = 0.0);
    }

    FadeWindow::from_ms(FADE_IN_MS, FADE_OUT_MS, sample_rate).apply(&mut out);

    let velocity = if request.velocity.is_finite() {
        request.velocity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    for sample in out.iter_mut() {
        *sample *= velocity;
    }

    out
}

/// Sum the material's partials into `out`
fn add_partials<R: Rng + ?Sized>(
    material: &Material,
    fundamental: f32,
    decay_scale: f32,
    sample_rate: f32,
    out: &mut [f32],
    rng: &mut R,
) {
    let len = out.len();
    if len == 0 {
        return;
    }
    let ceiling = sample_rate * NYQUIST_GUARD;
    let bend = material.pitch_bend_semitones;

    for (i, &ratio) in material.partial_ratios.iter().enumerate() {
        let amplitude = material.partial_amplitudes.get(i).copied().unwrap_or(0.0);
        let rate = material
            .partial_decay_rates
            .get(i)
            .or_else(|| material.partial_decay_rates.last())
            .copied()
            .unwrap_or(0.0);

        let detune = if material.detune_cents > 0.0 {
            rng.gen_range(-material.detune_cents..=material.detune_cents)
        } else {
            0.0
        };
        let mut phase = rng.gen_range(0.0..TAU);

        let freq = fundamental * ratio * 2f32.powf(detune / 1200.0);
        if amplitude == 0.0 || !(freq > 0.0) || freq >= ceiling {
            continue;
        }

        let mut envelope = DecayEnvelope::new(rate * decay_scale, sample_rate);
        for (n, sample) in out.iter_mut().enumerate() {
            let glide = if bend != 0.0 {
                2f32.powf(bend * (n as f32 / len as f32) / 12.0)
            } else {
                1.0
            };
            *sample += amplitude * phase.sin() * envelope.process();
            phase = (phase + TAU * freq * glide / sample_rate) % TAU;
        }
    }
}

/// High-passed noise burst at the onset, like a mallet strike
fn add_strike<R: Rng + ?Sized>(amount: f32, sample_rate: f32, out: &mut [f32], rng: &mut R) {
    if amount <= 0.0 || out.is_empty() {
        return;
    }
    let burst = ((NOISE_MS * 0.001 * sample_rate) as usize).min(out.len());

    let cutoff = NOISE_CUTOFF_HZ.min(sample_rate * 0.4);
    let mut filter = Coefficients::<f32>::from_params(
        Type::HighPass,
        sample_rate.hz(),
        cutoff.hz(),
        Q_BUTTERWORTH_F32,
    )
    .ok()
    .map(DirectForm2Transposed::<f32>::new);

    let mut envelope = DecayEnvelope::new(NOISE_DECAY, sample_rate);
    let mut previous = 0.0f32;
    for sample in out.iter_mut().take(burst) {
        let white: f32 = rng.gen_range(-1.0..1.0);
        let bright = match filter.as_mut() {
            Some(f) => f.run(white),
            // Differencing is a crude high-pass
            None => {
                let d = white - previous;
                previous = white;
                d
            }
        };
        *sample += amount * 0.3 * bright * envelope.process();
    }
}

/// Sparse FIR smear: delayed, attenuated copies of the dry signal.
/// The tail is truncated to the buffer so the event length is unchanged.
fn diffuse(out: &mut [f32], amount: f32, voicing: &Voicing, sample_rate: f32) {
    if amount <= 0.0 {
        return;
    }
    let delay = (voicing.reverb_delay_ms * 0.001 * sample_rate) as usize;
    if delay == 0 || delay >= out.len() {
        return;
    }
    let dry = out.to_vec();
    for (tap, &gain) in voicing.reverb_taps.iter().enumerate() {
        let offset = delay * (tap + 1);
        if offset >= out.len() {
            break;
        }
        for (wet, &d) in out[offset..].iter_mut().zip(dry.iter()) {
            *wet += d * gain * amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{lookup, SoundSet};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SR: f32 = 44100.0;

    fn bell() -> &'static Material {
        lookup(SoundSet::Material, "bell").unwrap()
    }

    #[test]
    fn test_grain_length_within_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let material = bell();
        for kind in [GrainKind::Grain, GrainKind::Chime, GrainKind::Attention] {
            let (min, max) = kind.duration_range_samples(material, SR);
            for _ in 0..10 {
                let request = GrainRequest {
                    material,
                    kind,
                    velocity: 0.8,
                    octave_shift: 0,
                };
                let samples = render(&request, SR, &mut rng);
                assert!(
                    samples.len() >= min && samples.len() <= max,
                    "{:?}: {} not in [{}, {}]",
                    kind,
                    samples.len(),
                    min,
                    max
                );
            }
        }
    }

    #[test]
    fn test_invalid_sample_rate_renders_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let request = GrainRequest::grain(bell(), 1.0, 0);
        assert!(render(&request, 0.0, &mut rng).is_empty());
        assert!(render(&request, -44100.0, &mut rng).is_empty());
        assert!(render(&request, f32::NAN, &mut rng).is_empty());
    }

    #[test]
    fn test_peak_respects_velocity() {
        let mut rng = StdRng::seed_from_u64(3);
        let request = GrainRequest::grain(bell(), 0.5, 0);
        let samples = render(&request, SR, &mut rng);
        let peak = samples.iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(peak > 0.0);
        assert!(peak <= 0.5 * GrainKind::Grain.peak() + 1e-6, "peak {}", peak);
    }

    #[test]
    fn test_same_seed_same_grain() {
        let request = GrainRequest::grain(bell(), 1.0, 0);
        let a = render(&request, SR, &mut StdRng::seed_from_u64(42));
        let b = render(&request, SR, &mut StdRng::seed_from_u64(42));
        let c = render(&request, SR, &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_window_starts_and_ends_silent() {
        let mut rng = StdRng::seed_from_u64(9);
        let request = GrainRequest::chime(bell());
        let samples = render(&request, SR, &mut rng);
        assert_eq!(samples[0], 0.0);
        assert_eq!(*samples.last().unwrap(), 0.0);
    }

    #[test]
    fn test_octave_shift_above_nyquist_is_dropped() {
        // ice's top partial at +1 octave sits far above the guard
        let ice = lookup(SoundSet::Material, "ice").unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let request = GrainRequest::grain(ice, 1.0, 1);
        let samples = render(&request, SR, &mut rng);
        assert!(samples.iter().all(|s| s.is_finite()));
        assert!(samples.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_zero_velocity_is_silent() {
        let mut rng = StdRng::seed_from_u64(5);
        let request = GrainRequest::grain(bell(), 0.0, 0);
        let samples = render(&request, SR, &mut rng);
        assert!(samples.iter().all(|s| *s == 0.0));
    }
}
