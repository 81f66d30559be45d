use rand::rngs::StdRng;
use rand::SeedableRng;

/// Explicit source of randomness for weight initialization, data synthesis,
/// shuffling and sampling.
///
/// Every component that needs random numbers borrows the context mutably;
/// there is no process-wide RNG. Two contexts built from the same seed drive
/// identical runs.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    seed: u64,
    rng: StdRng,
}

impl ExecutionContext {
    pub fn seeded(seed: u64) -> ExecutionContext {
        ExecutionContext {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        ExecutionContext::seeded(42)
    }
}
