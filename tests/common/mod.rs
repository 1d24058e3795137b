//! Shared helpers for integration tests

#![allow(dead_code)]

use murmur::monitor::{SoundSink, Trigger};
use std::sync::Mutex;

/// Sound sink that records every trigger in order
#[derive(Default)]
pub struct RecordingSink {
    triggers: Mutex<Vec<Trigger>>,
}

impl RecordingSink {
    pub fn triggers(&self) -> Vec<Trigger> {
        self.triggers.lock().unwrap().clone()
    }

    pub fn grains(&self) -> usize {
        self.count(|t| matches!(t, Trigger::Grain { .. }))
    }

    pub fn chimes(&self) -> usize {
        self.count(|t| *t == Trigger::Chime)
    }

    pub fn attentions(&self) -> usize {
        self.count(|t| *t == Trigger::Attention)
    }

    fn count(&self, pred: impl Fn(&Trigger) -> bool) -> usize {
        self.triggers.lock().unwrap().iter().filter(|t| pred(t)).count()
    }
}

impl SoundSink for RecordingSink {
    fn grain(&self, velocity: f32, octave_shift: i32) {
        self.triggers.lock().unwrap().push(Trigger::Grain {
            velocity,
            octave_shift,
        });
    }

    fn chime(&self) {
        self.triggers.lock().unwrap().push(Trigger::Chime);
    }

    fn attention(&self) {
        self.triggers.lock().unwrap().push(Trigger::Attention);
    }
}

/// Largest absolute sample
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |a, s| a.max(s.abs()))
}
