//! Character listing and demo playback
//!
//! The demo plays every character of a set in turn: a burst of eight
//! grains, a short pause, then a chime. It runs either live through the
//! audio device or offline through the same mixer into a WAV file.

use crate::audio::{OutputConfig, SoundEngine, SAMPLE_RATE};
use crate::error::Result;
use crate::materials::{Material, SoundSet};
use crate::monitor::octave_shift_for;
use crate::synth::GrainRequest;
use rand::Rng;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::info;

const BURST_GRAINS: usize = 8;
const BURST_SPACING_MS: u64 = 60;
const CHIME_PAUSE_MS: u64 = 150;
const TAIL_MS: u64 = 600;
const DEMO_VELOCITY: f32 = 0.7;

/// One step of a character's demo: play `request`, then wait `wait_ms`
pub struct DemoStep<'a> {
    pub request: GrainRequest<'a>,
    pub wait_ms: u64,
}

/// Demo timeline for one character
pub fn demo_steps(material: &Material) -> Vec<DemoStep<'_>> {
    let mut steps: Vec<DemoStep> = (0..BURST_GRAINS)
        .map(|i| {
            let c = (b'a' + i as u8) as char;
            DemoStep {
                request: GrainRequest::grain(material, DEMO_VELOCITY, octave_shift_for(c)),
                wait_ms: BURST_SPACING_MS,
            }
        })
        .collect();
    if let Some(last) = steps.last_mut() {
        last.wait_ms += CHIME_PAUSE_MS;
    }
    steps.push(DemoStep {
        request: GrainRequest::chime(material),
        wait_ms: TAIL_MS,
    });
    steps
}

/// Write every set and its characters, marking the default set
pub fn write_listing<W: Write>(out: &mut W) -> std::io::Result<()> {
    for set in SoundSet::ALL {
        let tag = if set == SoundSet::default() {
            " (default)"
        } else {
            ""
        };
        writeln!(out, "\n  [{}]{}\n", set, tag)?;
        for material in set.materials() {
            writeln!(out, "    {:10} - {}", material.name, material.description)?;
        }
    }
    writeln!(out)
}

/// Play the demo through the default output device
pub fn play_live(set: SoundSet, volume: f32) -> Result<()> {
    eprintln!("Murmur character demo [{}]\n", set);
    let mut rng = rand::thread_rng();
    for material in set.materials() {
        eprintln!("  {:10} - {}", material.name, material.description);
        let engine = SoundEngine::new(material, volume);
        engine.start(&OutputConfig::default())?;
        for step in demo_steps(material) {
            engine.play(&step.request, &mut rng);
            thread::sleep(Duration::from_millis(step.wait_ms));
        }
        engine.stop();
    }
    eprintln!("\nDone.");
    Ok(())
}

/// Render the demo offline: events are blended into the engine's ring and
/// pulled through the output stage exactly as the device would.
pub fn render_offline<R: Rng + ?Sized>(
    set: SoundSet,
    volume: f32,
    sample_rate: u32,
    rng: &mut R,
) -> Vec<f32> {
    let mut rendered = Vec::new();
    for material in set.materials() {
        let engine = SoundEngine::with_sample_rate(material, volume, sample_rate);
        let mut mixer = engine.mixer();
        for step in demo_steps(material) {
            engine.play(&step.request, rng);
            let frames = (step.wait_ms * sample_rate as u64 / 1000) as usize;
            let start = rendered.len();
            rendered.resize(start + frames, 0.0);
            mixer.process(&mut rendered[start..]);
        }
    }
    rendered
}

/// Write mono samples as 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Statistics about rendered audio
#[derive(Debug, Clone)]
pub struct RenderStats {
    pub duration: f32,
    pub sample_count: usize,
    pub rms: f32,
    pub peak: f32,
}

impl RenderStats {
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
        let rms = if samples.is_empty() {
            0.0
        } else {
            (sum_squares / samples.len() as f32).sqrt()
        };
        Self {
            duration: samples.len() as f32 / sample_rate.max(1) as f32,
            sample_count: samples.len(),
            rms,
            peak: samples.iter().fold(0.0f32, |a, s| a.max(s.abs())),
        }
    }
}

/// Render the demo of a set to `path`
pub fn export<R: Rng + ?Sized>(
    set: SoundSet,
    volume: f32,
    path: &Path,
    rng: &mut R,
) -> Result<RenderStats> {
    let samples = render_offline(set, volume, SAMPLE_RATE, rng);
    write_wav(path, &samples, SAMPLE_RATE)?;
    let stats = RenderStats::from_samples(&samples, SAMPLE_RATE);
    info!(
        "Exported {} demo to {} ({:.1}s, peak {:.3})",
        set,
        path.display(),
        stats.duration,
        stats.peak
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::lookup;
    use crate::synth::GrainKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_demo_timeline() {
        let bell = lookup(SoundSet::Material, "bell").unwrap();
        let steps = demo_steps(bell);
        assert_eq!(steps.len(), BURST_GRAINS + 1);
        assert!(steps[..BURST_GRAINS]
            .iter()
            .all(|s| s.request.kind == GrainKind::Grain));
        assert_eq!(steps[BURST_GRAINS].request.kind, GrainKind::Chime);
        let total: u64 = steps.iter().map(|s| s.wait_ms).sum();
        assert_eq!(total, 8 * 60 + 150 + 600);
    }

    #[test]
    fn test_listing_names_every_character() {
        let mut out = Vec::new();
        write_listing(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[ambient] (default)"));
        assert!(text.contains("[material]"));
        for set in SoundSet::ALL {
            for material in set.materials() {
                assert!(text.contains(material.name));
            }
        }
    }

    #[test]
    fn test_offline_render_length_and_level() {
        let mut rng = StdRng::seed_from_u64(5);
        let samples = render_offline(SoundSet::Ambient, 0.5, 44100, &mut rng);
        let per_character = (8 * 60 + 150 + 600) * 44100 / 1000;
        assert_eq!(samples.len(), per_character * SoundSet::Ambient.materials().len());

        let stats = RenderStats::from_samples(&samples, 44100);
        assert!(stats.peak > 0.05);
        assert!(stats.peak <= 1.0);
    }

    #[test]
    fn test_wav_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.wav");
        let mut rng = StdRng::seed_from_u64(9);
        let stats = export(SoundSet::Material, 0.5, &path, &mut rng).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len() as usize, stats.sample_count);
    }
}
