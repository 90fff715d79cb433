//! Bounded-memory uniform sampling (Algorithm R).

use rand::Rng;

/// Fixed-capacity uniform sample of a value stream.
///
/// The first `capacity` values are kept; the n-th value after that replaces
/// a uniformly chosen slot with probability `capacity / n`. The RNG is passed
/// to [`add`](Self::add) so one seeded generator drives a whole build.
#[derive(Clone, Debug)]
pub struct ReservoirSampler {
    capacity: usize,
    seen: u64,
    samples: Vec<f64>,
}

impl ReservoirSampler {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            samples: Vec::with_capacity(capacity.min(4096)),
        }
    }

    pub fn add<R: Rng + ?Sized>(&mut self, value: f64, rng: &mut R) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(value);
            return;
        }
        let slot = rng.gen_range(0..self.seen);
        if (slot as usize) < self.capacity {
            self.samples[slot as usize] = value;
        }
    }

    /// Number of values offered so far.
    #[inline]
    pub fn seen(&self) -> u64 {
        self.seen
    }

    #[inline]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}
