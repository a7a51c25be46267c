// Time-accumulating probabilistic loot source.
//
// Spawning is demand-bounded: the generator never produces more items than
// the current shortage (looters without a matching world item).

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type RandomSource = Box<dyn FnMut() -> f64 + Send>;

pub struct LootGenerator {
    base_interval: Duration,
    probability: f64,
    unconsumed: Duration,
    random: RandomSource,
}

impl LootGenerator {
    /// Production generator with an entropy-seeded uniform source in [0, 1).
    pub fn new(base_interval: Duration, probability: f64) -> Self {
        let mut rng = StdRng::from_entropy();
        Self::with_random(base_interval, probability, move || rng.gen::<f64>())
    }

    /// Generator with an injected random source; tests seed determinism here.
    pub fn with_random(
        base_interval: Duration,
        probability: f64,
        random: impl FnMut() -> f64 + Send + 'static,
    ) -> Self {
        Self {
            base_interval,
            probability,
            unconsumed: Duration::ZERO,
            random: Box::new(random),
        }
    }

    /// Returns how many items to spawn after `time_delta` has elapsed, given
    /// the current world item count and the number of players able to carry.
    pub fn generate(
        &mut self,
        time_delta: Duration,
        loot_count: usize,
        looter_count: usize,
    ) -> usize {
        self.unconsumed += time_delta;

        let shortage = looter_count.saturating_sub(loot_count);
        if shortage == 0 {
            self.unconsumed = Duration::ZERO;
            return 0;
        }

        let ratio = if self.base_interval.is_zero() {
            1.0
        } else {
            (self.unconsumed.as_secs_f64() / self.base_interval.as_secs_f64()).min(1.0)
        };
        let probability = 1.0 - (1.0 - self.probability).powf(ratio);
        let roll = (self.random)();

        let generated = ((shortage as f64) * probability * roll + 0.5).floor() as usize;
        let generated = generated.min(shortage);
        if generated > 0 {
            self.unconsumed = Duration::ZERO;
        }
        generated
    }
}
