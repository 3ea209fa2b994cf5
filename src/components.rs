use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// The one random source for gameplay: spawn sampling, death bursts,
/// screenshake jitter.
#[derive(Resource)]
pub struct GameRng(pub SmallRng);

impl GameRng {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(SmallRng::seed_from_u64(seed)),
            None => Self(SmallRng::from_entropy()),
        }
    }
}

/// Optional cap on simulated frames; the app exits once it is reached.
#[derive(Resource, Clone, Copy, Default)]
pub struct FrameBudget {
    pub max_frames: Option<u64>,
}

impl FrameBudget {
    pub fn exhausted(&self, frame: u64) -> bool {
        self.max_frames.is_some_and(|max| frame >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = GameRng::new(Some(77));
        let mut b = GameRng::new(Some(77));
        let xs: Vec<u32> = (0..4).map(|_| a.0.gen()).collect();
        let ys: Vec<u32> = (0..4).map(|_| b.0.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn budget_without_cap_never_runs_out() {
        assert!(!FrameBudget::default().exhausted(u64::MAX));
        let budget = FrameBudget {
            max_frames: Some(10),
        };
        assert!(!budget.exhausted(9));
        assert!(budget.exhausted(10));
    }
}
