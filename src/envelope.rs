//! Envelope generators for grains
//!
//! Every partial of a grain rings down on its own exponential decay, and the
//! finished buffer is windowed at both ends so splices into the mix are
//! click-free.

/// Exponential decay envelope, starting at 1.0
#[derive(Debug, Clone)]
pub struct DecayEnvelope {
    level: f32,
    factor: f32,
}

impl DecayEnvelope {
    /// `rate` is in 1/s: the level after `t` seconds is `exp(-rate * t)`
    pub fn new(rate: f32, sample_rate: f32) -> Self {
        let factor = if sample_rate > 0.0 {
            (-rate.max(0.0) / sample_rate).exp()
        } else {
            0.0
        };
        Self { level: 1.0, factor }
    }

    /// Current level, then advance one sample
    pub fn process(&mut self) -> f32 {
        let current = self.level;
        self.level *= self.factor;
        current
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

/// Linear fade-in / fade-out applied to a finished buffer
#[derive(Debug, Clone, Copy)]
pub struct FadeWindow {
    fade_in: usize,
    fade_out: usize,
}

impl FadeWindow {
    pub fn from_ms(fade_in_ms: f32, fade_out_ms: f32, sample_rate: f32) -> Self {
        Self {
            fade_in: (fade_in_ms * 0.001 * sample_rate).max(0.0) as usize,
            fade_out: (fade_out_ms * 0.001 * sample_rate).max(0.0) as usize,
        }
    }

    pub fn apply(&self, samples: &mut [f32]) {
        let len = samples.len();
        if len == 0 {
            return;
        }

        // Short buffers share their length between the two ramps
        let (fade_in, fade_out) = if self.fade_in + self.fade_out > len {
            let total = (self.fade_in + self.fade_out).max(1);
            let fade_in = len * self.fade_in / total;
            (fade_in, len - fade_in)
        } else {
            (self.fade_in, self.fade_out)
        };

        for (i, sample) in samples.iter_mut().take(fade_in).enumerate() {
            *sample *= i as f32 / fade_in as f32;
        }

        let start = len - fade_out;
        for (i, sample) in samples[start..].iter_mut().enumerate() {
            *sample *= 1.0 - (i + 1) as f32 / fade_out as f32;
        }
    }
}
