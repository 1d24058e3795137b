//! Material catalog
//!
//! Each sound character is a fixed timbral recipe: a set of (possibly
//! inharmonic) partials with per-partial decay, an attack transient and a
//! reverb amount. Catalogs are static tables, shared read-only by every
//! synthesis call.

use crate::error::{MurmurError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timbral recipe for one sound character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub name: &'static str,
    pub description: &'static str,
    /// Fundamental frequency (Hz) before octave shifts
    pub base_frequency_hz: f32,
    /// Frequency multipliers relative to the base, not necessarily integer
    pub partial_ratios: &'static [f32],
    /// Relative amplitude of each partial
    pub partial_amplitudes: &'static [f32],
    /// Exponential decay rate (1/s) of each partial, higher partials decay faster
    pub partial_decay_rates: &'static [f32],
    /// High-frequency noise on the attack (0-1)
    pub attack_noise_amount: f32,
    /// Diffuse tail amount (0-1)
    pub reverb_amount: f32,
    /// Random detune range per partial (cents, +/-)
    pub detune_cents: f32,
    /// Pitch glide over the grain (semitones, negative = down)
    pub pitch_bend_semitones: f32,
    /// Grain duration range (min, max) in milliseconds
    pub grain_duration_ms: (f32, f32),
}

impl Material {
    /// Number of partials in the recipe
    pub fn partial_count(&self) -> usize {
        self.partial_ratios.len()
    }
}

/// Named catalog of sound characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SoundSet {
    /// Soft, low, long-tailed tones
    Ambient,
    /// Physical materials: glass, ice, bells and friends
    Material,
}

impl SoundSet {
    pub const ALL: [SoundSet; 2] = [SoundSet::Ambient, SoundSet::Material];

    pub fn name(&self) -> &'static str {
        match self {
            SoundSet::Ambient => "ambient",
            SoundSet::Material => "material",
        }
    }

    /// All characters in this set, in listing order
    pub fn materials(&self) -> &'static [Material] {
        match self {
            SoundSet::Ambient => AMBIENT,
            SoundSet::Material => MATERIALS,
        }
    }
}

impl Default for SoundSet {
    fn default() -> Self {
        SoundSet::Ambient
    }
}

impl fmt::Display for SoundSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundSet {
    type Err = MurmurError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ambient" => Ok(SoundSet::Ambient),
            "material" => Ok(SoundSet::Material),
            other => Err(MurmurError::UnknownSoundSet(other.to_string())),
        }
    }
}

/// Look up a character by name within a set
pub fn lookup(set: SoundSet, name: &str) -> Result<&'static Material> {
    set.materials()
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| MurmurError::UnknownCharacter {
            set: set.name().to_string(),
            name: name.to_string(),
            available: list_characters(set),
        })
}

/// Character names of a set, in catalog order
pub fn list_characters(set: SoundSet) -> Vec<&'static str> {
    set.materials().iter().map(|m| m.name).collect()
}

/// Uniformly random character from a set
pub fn random_character<R: Rng + ?Sized>(set: SoundSet, rng: &mut R) -> &'static Material {
    let materials = set.materials();
    &materials[rng.gen_range(0..materials.len())]
}

static MATERIALS: &[Material] = &[
    Material {
        name: "ice",
        description: "Brittle, very high, fast decay",
        base_frequency_hz: 2800.0,
        partial_ratios: &[1.0, 2.3, 4.1, 7.2],
        partial_amplitudes: &[1.0, 0.6, 0.3, 0.15],
        partial_decay_rates: &[12.0, 18.0, 25.0, 35.0],
        attack_noise_amount: 0.4,
        reverb_amount: 0.3,
        detune_cents: 8.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (30.0, 40.0),
    },
    Material {
        name: "glass",
        description: "Classic wine glass ping",
        base_frequency_hz: 1200.0,
        partial_ratios: &[1.0, 2.4, 4.2, 6.8],
        partial_amplitudes: &[1.0, 0.7, 0.4, 0.2],
        partial_decay_rates: &[8.0, 12.0, 18.0, 25.0],
        attack_noise_amount: 0.25,
        reverb_amount: 0.4,
        detune_cents: 5.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (38.0, 52.0),
    },
    Material {
        name: "crystal",
        description: "Pure with beating from close partial pairs",
        base_frequency_hz: 1800.0,
        partial_ratios: &[1.0, 2.01, 4.0, 4.03, 6.5],
        partial_amplitudes: &[1.0, 0.8, 0.5, 0.45, 0.2],
        partial_decay_rates: &[6.0, 7.0, 10.0, 11.0, 16.0],
        attack_noise_amount: 0.15,
        reverb_amount: 0.5,
        detune_cents: 3.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (42.0, 58.0),
    },
    Material {
        name: "ceramic",
        description: "Duller, muted",
        base_frequency_hz: 600.0,
        partial_ratios: &[1.0, 2.8, 5.1],
        partial_amplitudes: &[1.0, 0.4, 0.15],
        partial_decay_rates: &[15.0, 22.0, 30.0],
        attack_noise_amount: 0.35,
        reverb_amount: 0.25,
        detune_cents: 12.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (34.0, 46.0),
    },
    Material {
        name: "bell",
        description: "Metallic, longer ring",
        base_frequency_hz: 900.0,
        partial_ratios: &[1.0, 2.0, 3.6, 5.4, 8.2],
        partial_amplitudes: &[1.0, 0.8, 0.6, 0.4, 0.2],
        partial_decay_rates: &[4.0, 5.0, 7.0, 10.0, 14.0],
        attack_noise_amount: 0.3,
        reverb_amount: 0.6,
        detune_cents: 6.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (48.0, 64.0),
    },
    Material {
        name: "droplet",
        description: "Pitch bend down, liquid",
        base_frequency_hz: 1400.0,
        partial_ratios: &[1.0, 2.2, 3.8],
        partial_amplitudes: &[1.0, 0.5, 0.2],
        partial_decay_rates: &[10.0, 15.0, 22.0],
        attack_noise_amount: 0.5,
        reverb_amount: 0.45,
        detune_cents: 4.0,
        pitch_bend_semitones: -4.0,
        grain_duration_ms: (38.0, 52.0),
    },
    Material {
        name: "click",
        description: "Sharp mechanical click, keyboard-like",
        base_frequency_hz: 3500.0,
        partial_ratios: &[1.0, 2.5],
        partial_amplitudes: &[1.0, 0.3],
        partial_decay_rates: &[40.0, 60.0],
        attack_noise_amount: 0.7,
        reverb_amount: 0.1,
        detune_cents: 15.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (16.0, 24.0),
    },
    Material {
        name: "wood",
        description: "Hollow knock, marimba-like",
        base_frequency_hz: 420.0,
        partial_ratios: &[1.0, 2.7, 5.6],
        partial_amplitudes: &[1.0, 0.35, 0.1],
        partial_decay_rates: &[28.0, 40.0, 60.0],
        attack_noise_amount: 0.45,
        reverb_amount: 0.15,
        detune_cents: 10.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (26.0, 36.0),
    },
    Material {
        name: "steel",
        description: "Struck steel bar, long shimmer",
        base_frequency_hz: 1600.0,
        partial_ratios: &[1.0, 2.76, 5.4, 8.93],
        partial_amplitudes: &[1.0, 0.6, 0.35, 0.2],
        partial_decay_rates: &[5.0, 7.0, 10.0, 14.0],
        attack_noise_amount: 0.2,
        reverb_amount: 0.5,
        detune_cents: 4.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (52.0, 70.0),
    },
    Material {
        name: "pebble",
        description: "Small stones clicking together",
        base_frequency_hz: 2200.0,
        partial_ratios: &[1.0, 1.9, 3.3],
        partial_amplitudes: &[1.0, 0.5, 0.25],
        partial_decay_rates: &[30.0, 42.0, 55.0],
        attack_noise_amount: 0.6,
        reverb_amount: 0.2,
        detune_cents: 14.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (20.0, 30.0),
    },
    Material {
        name: "porcelain",
        description: "Thin cup tap, bright and delicate",
        base_frequency_hz: 2000.0,
        partial_ratios: &[1.0, 2.32, 4.25, 6.63],
        partial_amplitudes: &[1.0, 0.55, 0.3, 0.12],
        partial_decay_rates: &[10.0, 15.0, 21.0, 29.0],
        attack_noise_amount: 0.3,
        reverb_amount: 0.35,
        detune_cents: 6.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (34.0, 46.0),
    },
];

static AMBIENT: &[Material] = &[
    Material {
        name: "mist",
        description: "Soft breathy sine, barely there",
        base_frequency_hz: 520.0,
        partial_ratios: &[1.0, 2.0, 3.01],
        partial_amplitudes: &[1.0, 0.3, 0.1],
        partial_decay_rates: &[6.0, 9.0, 13.0],
        attack_noise_amount: 0.05,
        reverb_amount: 0.7,
        detune_cents: 4.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (70.0, 95.0),
    },
    Material {
        name: "tide",
        description: "Low rolling fifths",
        base_frequency_hz: 330.0,
        partial_ratios: &[1.0, 1.5, 2.0],
        partial_amplitudes: &[1.0, 0.4, 0.25],
        partial_decay_rates: &[4.0, 6.0, 9.0],
        attack_noise_amount: 0.03,
        reverb_amount: 0.75,
        detune_cents: 6.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (90.0, 120.0),
    },
    Material {
        name: "ember",
        description: "Warm glow with a gentle crackle",
        base_frequency_hz: 440.0,
        partial_ratios: &[1.0, 2.01, 2.99, 4.02],
        partial_amplitudes: &[1.0, 0.45, 0.2, 0.08],
        partial_decay_rates: &[7.0, 10.0, 14.0, 19.0],
        attack_noise_amount: 0.1,
        reverb_amount: 0.6,
        detune_cents: 5.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (60.0, 85.0),
    },
    Material {
        name: "moss",
        description: "Deep, muffled, velvety",
        base_frequency_hz: 280.0,
        partial_ratios: &[1.0, 2.0],
        partial_amplitudes: &[1.0, 0.2],
        partial_decay_rates: &[5.0, 8.0],
        attack_noise_amount: 0.02,
        reverb_amount: 0.65,
        detune_cents: 3.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (80.0, 110.0),
    },
    Material {
        name: "rain",
        description: "Light drops on a window",
        base_frequency_hz: 1100.0,
        partial_ratios: &[1.0, 2.4, 3.9],
        partial_amplitudes: &[1.0, 0.35, 0.12],
        partial_decay_rates: &[14.0, 20.0, 28.0],
        attack_noise_amount: 0.35,
        reverb_amount: 0.55,
        detune_cents: 9.0,
        pitch_bend_semitones: -2.0,
        grain_duration_ms: (35.0, 50.0),
    },
    Material {
        name: "windchime",
        description: "Distant wind chimes",
        base_frequency_hz: 1320.0,
        partial_ratios: &[1.0, 2.76, 5.4],
        partial_amplitudes: &[1.0, 0.4, 0.15],
        partial_decay_rates: &[3.0, 5.0, 8.0],
        attack_noise_amount: 0.08,
        reverb_amount: 0.8,
        detune_cents: 7.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (90.0, 130.0),
    },
    Material {
        name: "hearth",
        description: "Wood fire murmur",
        base_frequency_hz: 200.0,
        partial_ratios: &[1.0, 3.0, 5.0],
        partial_amplitudes: &[1.0, 0.25, 0.1],
        partial_decay_rates: &[8.0, 12.0, 17.0],
        attack_noise_amount: 0.25,
        reverb_amount: 0.4,
        detune_cents: 8.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (60.0, 90.0),
    },
    Material {
        name: "breeze",
        description: "Airy rising swell",
        base_frequency_hz: 760.0,
        partial_ratios: &[1.0, 1.5, 2.25],
        partial_amplitudes: &[1.0, 0.3, 0.15],
        partial_decay_rates: &[3.5, 5.0, 7.0],
        attack_noise_amount: 0.15,
        reverb_amount: 0.85,
        detune_cents: 10.0,
        pitch_bend_semitones: 1.0,
        grain_duration_ms: (100.0, 140.0),
    },
    Material {
        name: "dune",
        description: "Shifting sand, grainy and low",
        base_frequency_hz: 360.0,
        partial_ratios: &[1.0, 2.0, 4.0],
        partial_amplitudes: &[1.0, 0.3, 0.1],
        partial_decay_rates: &[6.0, 8.5, 12.0],
        attack_noise_amount: 0.2,
        reverb_amount: 0.5,
        detune_cents: 12.0,
        pitch_bend_semitones: -1.0,
        grain_duration_ms: (75.0, 100.0),
    },
    Material {
        name: "lantern",
        description: "Soft harmonic glow",
        base_frequency_hz: 620.0,
        partial_ratios: &[1.0, 2.0, 3.0, 4.0],
        partial_amplitudes: &[1.0, 0.5, 0.25, 0.12],
        partial_decay_rates: &[4.5, 6.5, 9.0, 12.0],
        attack_noise_amount: 0.06,
        reverb_amount: 0.7,
        detune_cents: 3.0,
        pitch_bend_semitones: 0.0,
        grain_duration_ms: (70.0, 100.0),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lookup_known_character() {
        let bell = lookup(SoundSet::Material, "bell").expect("bell should exist");
        assert_eq!(bell.name, "bell");
        assert_eq!(bell.partial_count(), 5);
    }

    #[test]
    fn test_lookup_unknown_character() {
        let err = lookup(SoundSet::Ambient, "bell").unwrap_err();
        match err {
            MurmurError::UnknownCharacter { set, name, available } => {
                assert_eq!(set, "ambient");
                assert_eq!(name, "bell");
                assert_eq!(available, list_characters(SoundSet::Ambient));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_list_characters_in_catalog_order() {
        let names = list_characters(SoundSet::Material);
        assert_eq!(&names[..3], &["ice", "glass", "crystal"]);
    }

    #[test]
    fn test_random_character_is_member() {
        let mut rng = StdRng::seed_from_u64(7);
        for set in SoundSet::ALL {
            for _ in 0..50 {
                let m = random_character(set, &mut rng);
                assert!(lookup(set, m.name).is_ok());
            }
        }
    }

    #[test]
    fn test_sound_set_from_str() {
        assert_eq!("Ambient".parse::<SoundSet>().unwrap(), SoundSet::Ambient);
        assert_eq!(" material ".parse::<SoundSet>().unwrap(), SoundSet::Material);
        assert!(matches!(
            "jazz".parse::<SoundSet>(),
            Err(MurmurError::UnknownSoundSet(_))
        ));
    }
}
