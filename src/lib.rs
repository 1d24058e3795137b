//! # Murmur - ambient audio feedback for terminal output
//!
//! Murmur listens to a terminal stream and answers it with sound: a soft
//! grain for each burst of output, a chime when a blank-line run marks a
//! completion, and an attention alert once the stream has been silent for
//! too long. A quiet detuned hum sits underneath everything.
//!
//! ## Pieces
//!
//! - [`materials`]: static catalogs of sound characters
//! - [`synth`]: additive rendering of grains, chimes and alerts
//! - [`hum`]: the continuous background drone
//! - [`ring`] and [`audio`]: the shared mix buffer and the output device
//! - [`monitor`] and [`throttle`]: stream classification and rate limiting
//! - [`config`], [`session`], [`demo`]: settings and the command-line front end
//!
//! ## Example
//!
//! ```rust
//! use murmur::materials::{lookup, SoundSet};
//! use murmur::synth::{render, GrainRequest};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let glass = lookup(SoundSet::Material, "glass").unwrap();
//! let mut rng = StdRng::seed_from_u64(7);
//! let grain = render(&GrainRequest::grain(glass, 0.8, 0), 44100.0, &mut rng);
//! assert!(!grain.is_empty());
//! ```
//!
//! Driving an engine from a monitor:
//!
//! ```rust,no_run
//! use murmur::audio::{OutputConfig, SoundEngine};
//! use murmur::materials::{lookup, SoundSet};
//! use murmur::monitor::{ActivityMonitor, MonitorConfig};
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let moss = lookup(SoundSet::Ambient, "moss").unwrap();
//! let engine = Arc::new(SoundEngine::new(moss, 0.5));
//! engine.start(&OutputConfig::default()).unwrap();
//!
//! let monitor = ActivityMonitor::new(engine.clone(), MonitorConfig::default(), Instant::now());
//! monitor.process_chunk(b"compiling...\n", Instant::now());
//! engine.stop();
//! ```

pub mod audio;
pub mod config;
pub mod demo;
pub mod envelope;
pub mod error;
pub mod hum;
pub mod materials;
pub mod monitor;
pub mod ring;
pub mod session;
pub mod synth;
pub mod throttle;

pub use audio::{Mixer, OutputConfig, SoundEngine};
pub use config::Settings;
pub use error::{MurmurError, Result};
pub use materials::{Material, SoundSet};
pub use monitor::{ActivityMonitor, MonitorConfig, SoundSink};
pub use synth::{GrainKind, GrainRequest};
