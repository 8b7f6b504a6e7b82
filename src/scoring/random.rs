use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ScoringCriterion;

///Returns a uniform random score, used to scatter seams around a loop.
///Construct with a seed for reproducible runs.
pub struct RandomScoringCriterion {
    rng: RefCell<StdRng>,
}

impl RandomScoringCriterion {
    pub fn new() -> Self {
        Self {
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomScoringCriterion {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringCriterion for RandomScoringCriterion {
    fn score(&self, _candidate_index: usize) -> f64 {
        self.rng.borrow_mut().gen_range(0.0..1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_criterion_is_reproducible() {
        let first = RandomScoringCriterion::from_seed(42);
        let second = RandomScoringCriterion::from_seed(42);
        for index in 0..16 {
            assert_eq!(first.score(index), second.score(index));
        }
    }

    #[test]
    fn scores_stay_in_range() {
        let criterion = RandomScoringCriterion::from_seed(7);
        for index in 0..100 {
            let score = criterion.score(index);
            assert!((0.0..1.0).contains(&score));
        }
    }
}
