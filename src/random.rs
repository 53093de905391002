use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_SEED: u64 = 3819201;

/// Source of every random decision the search makes.
///
/// Swap in `SeededRandomGenerator` or `ScriptedRandomGenerator` to make a
/// search reproducible.
pub trait RandomGenerator: Default {
    /// Returns a uniformly distributed value in `from..to`, or `from` when the
    /// range is empty.
    fn next_range(&mut self, from: usize, to: usize) -> usize;

    fn choose<'a, K>(&mut self, items: &'a [K]) -> Option<&'a K> {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_range(0, items.len()))
    }

    /// Fisher-Yates shuffle driven by `next_range`.
    fn shuffle<K>(&mut self, items: &mut [K]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(0, i + 1);
            items.swap(i, j);
        }
    }
}

/// Draws from the thread-local generator of `rand`.
#[derive(Debug, Default)]
pub struct StandardRandomGenerator;

impl RandomGenerator for StandardRandomGenerator {
    fn next_range(&mut self, from: usize, to: usize) -> usize {
        if to <= from {
            return from;
        }
        rand::rng().random_range(from..to)
    }
}

/// A reproducible generator seeded from a `u64`.
#[derive(Debug)]
pub struct SeededRandomGenerator {
    rng: StdRng,
}

impl SeededRandomGenerator {
    /// A generator whose sequence is fixed by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandomGenerator {
    fn default() -> Self {
        SeededRandomGenerator::new(DEFAULT_SEED)
    }
}

impl RandomGenerator for SeededRandomGenerator {
    fn next_range(&mut self, from: usize, to: usize) -> usize {
        if to <= from {
            return from;
        }
        self.rng.random_range(from..to)
    }
}

/// Replays a fixed list of values, wrapping around when it runs out.
///
/// Each value is reduced modulo the requested range, so a script of zeros
/// always picks the first option.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandomGenerator {
    script: Vec<usize>,
    cursor: usize,
}

impl ScriptedRandomGenerator {
    /// Replays `script` from its start.
    pub fn new(script: Vec<usize>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl RandomGenerator for ScriptedRandomGenerator {
    fn next_range(&mut self, from: usize, to: usize) -> usize {
        if to <= from || self.script.is_empty() {
            return from;
        }
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        from + value % (to - from)
    }
}
