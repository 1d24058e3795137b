//! Circular mix buffer
//!
//! Rendered events are blended additively starting at the read cursor, so
//! they start sounding on the next callback and overlapping triggers layer
//! instead of replacing each other. The consumer zeroes what it reads.
//! Anything written more than one revolution ahead wraps onto itself and
//! simply fades into older material.

/// Ring of mono samples with a read cursor (consumer) and a write
/// frontier (furthest sample any producer has touched).
#[derive(Debug, Clone)]
pub struct GrainRing {
    samples: Vec<f32>,
    read_pos: usize,
    write_pos: usize,
    /// Samples between the read cursor and the write frontier
    pending: usize,
    ceiling: f32,
}

impl GrainRing {
    pub fn new(capacity: usize, ceiling: f32) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            read_pos: 0,
            write_pos: 0,
            pending: 0,
            ceiling: ceiling.abs(),
        }
    }

    /// Ring sized to `seconds` of audio
    pub fn with_duration(seconds: f32, sample_rate: f32, ceiling: f32) -> Self {
        Self::new((seconds.max(0.0) * sample_rate.max(0.0)) as usize, ceiling)
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Samples queued ahead of the read cursor
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Add `samples` into the ring starting at the read cursor, clamping
    /// the running sum to the ceiling.
    pub fn blend(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let capacity = self.samples.len();
        let ceiling = self.ceiling;
        for (i, &s) in samples.iter().enumerate() {
            let pos = (self.read_pos + i) % capacity;
            self.samples[pos] = (self.samples[pos] + s).clamp(-ceiling, ceiling);
        }

        let span = samples.len().min(capacity);
        if span > self.pending {
            self.pending = span;
            self.write_pos = (self.read_pos + span) % capacity;
        }
    }

    /// Fill `out` from the read cursor, zeroing consumed samples.
    /// Underrun is silence, not an error.
    pub fn read_into(&mut self, out: &mut [f32]) {
        let capacity = self.samples.len();
        for sample in out.iter_mut() {
            *sample = std::mem::take(&mut self.samples[self.read_pos]);
            self.read_pos = (self.read_pos + 1) % capacity;
        }
        self.pending = self.pending.saturating_sub(out.len());
        if self.pending == 0 {
            self.write_pos = self.read_pos;
        }
    }

    /// Samples at offset `0..len` from the read cursor, without consuming
    pub fn peek(&self, len: usize) -> Vec<f32> {
        let capacity = self.samples.len();
        (0..len)
            .map(|i| self.samples[(self.read_pos + i) % capacity])
            .collect()
    }

    /// Silence everything and rewind both cursors
    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.read_pos = 0;
        self.write_pos = 0;
        self.pending = 0;
    }
}
