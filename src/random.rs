//! Injected uniform random source.
//!
//! Mirrors [`time::Clock`](crate::time::Clock): the RED core never reaches
//! for a process-wide RNG. `drop_early` asks its [`UniformSource`] for one
//! sample per candidate packet; everything upstream of that call is
//! deterministic given the same sequence of samples.

/// A source of uniform samples in `[0, 1)`.
pub trait UniformSource {
    /// Returns the next sample, uniformly distributed in `[0, 1)`.
    fn sample(&mut self) -> f64;
}

/// The production [`UniformSource`], backed by `rand`'s thread-local RNG
/// machinery through an owned [`rand::rngs::StdRng`].
pub struct RandUniform {
    rng: rand::rngs::StdRng,
}

impl RandUniform {
    /// Seed a new generator from the OS entropy source.
    pub fn new() -> Self {
        use rand::SeedableRng;
        RandUniform {
            rng: rand::rngs::StdRng::from_os_rng(),
        }
    }

    /// Seed a new generator deterministically, for reproducible simulation
    /// runs that still want "real" pseudo-random drop behavior.
    pub fn from_seed(seed: u64) -> Self {
        use rand::SeedableRng;
        RandUniform {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformSource for RandUniform {
    fn sample(&mut self) -> f64 {
        use rand::Rng;
        self.rng.random::<f64>()
    }
}

/// Deterministic sources for tests.
pub mod testing {
    use super::UniformSource;

    /// Always returns the same sample. Matches scenario 6 in the spec
    /// ("a test RNG that returns 0.0") for forcing an unforced drop.
    #[derive(Debug, Clone, Copy)]
    pub struct Fixed(pub f64);

    impl UniformSource for Fixed {
        fn sample(&mut self) -> f64 {
            self.0
        }
    }

    /// Replays a fixed sequence of samples, repeating the last one once
    /// exhausted, for tests that need a handful of distinct draws.
    #[derive(Debug, Clone)]
    pub struct Sequence {
        samples: Vec<f64>,
        next: usize,
    }

    impl Sequence {
        pub fn new(samples: Vec<f64>) -> Self {
            assert!(!samples.is_empty(), "Sequence needs at least one sample");
            Sequence { samples, next: 0 }
        }
    }

    impl UniformSource for Sequence {
        fn sample(&mut self) -> f64 {
            let v = self.samples[self.next.min(self.samples.len() - 1)];
            if self.next < self.samples.len() - 1 {
                self.next += 1;
            }
            v
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::{Fixed, Sequence};

    #[test]
    fn fixed_always_returns_same_value() {
        let mut src = Fixed(0.25);
        assert_eq!(src.sample(), 0.25);
        assert_eq!(src.sample(), 0.25);
    }

    #[test]
    fn sequence_replays_then_sticks_on_last() {
        let mut src = Sequence::new(vec![0.1, 0.5, 0.9]);
        assert_eq!(src.sample(), 0.1);
        assert_eq!(src.sample(), 0.5);
        assert_eq!(src.sample(), 0.9);
        assert_eq!(src.sample(), 0.9);
    }

    #[test]
    fn rand_uniform_is_in_unit_interval() {
        let mut src = RandUniform::from_seed(42);
        for _ in 0..1000 {
            let v = src.sample();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
