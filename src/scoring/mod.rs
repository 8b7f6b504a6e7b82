mod corner;
mod distance;
mod exclusion;
mod random;
mod texture;

pub use corner::CornerScoringCriterion;
pub use distance::{DistanceScoringCriterion, DistanceType};
pub use exclusion::ExclusionAreaScoringCriterion;
pub use random::RandomScoringCriterion;
pub use texture::TextureScoringCriterion;

///Scores a candidate, identified by its index in the candidate list, in
///`[0, 1]`. A criterion only discriminates usefully when its scores are
///well distributed over that range.
pub trait ScoringCriterion {
    fn score(&self, candidate_index: usize) -> f64;
}

///A criterion together with its influence on the pass score. A criterion
///contributing "normally" has weight 1.0.
pub struct WeighedCriterion<'a> {
    pub criterion: Box<dyn ScoringCriterion + 'a>,
    pub weight: f64,
}

impl<'a> WeighedCriterion<'a> {
    pub fn new(criterion: impl ScoringCriterion + 'a) -> Self {
        Self {
            criterion: Box::new(criterion),
            weight: 1.0,
        }
    }

    pub fn weighted(criterion: impl ScoringCriterion + 'a, weight: f64) -> Self {
        Self {
            criterion: Box::new(criterion),
            weight,
        }
    }
}

///Criteria evaluated together over the surviving candidates. After a pass,
///candidates scoring further than `outsider_delta_threshold` below the
///best are dropped; the threshold is ignored for the last pass.
pub struct CriteriaPass<'a> {
    pub criteria: Vec<WeighedCriterion<'a>>,
    pub outsider_delta_threshold: f64,
}

impl<'a> CriteriaPass<'a> {
    pub fn new(outsider_delta_threshold: f64) -> Self {
        Self {
            criteria: Vec::new(),
            outsider_delta_threshold,
        }
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    score: f64,
}

///Finds the best element of a list under one or more passes of weighted
///scoring criteria. When a pass leaves multiple candidates whose scores
///are too close to call, the next pass decides between the survivors.
#[derive(Default)]
pub struct BestElementFinder<'a> {
    passes: Vec<CriteriaPass<'a>>,
}

impl<'a> BestElementFinder<'a> {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn append_pass(&mut self, pass: CriteriaPass<'a>) {
        self.passes.push(pass);
    }

    pub fn append_single_criterion_pass(
        &mut self,
        criterion: impl ScoringCriterion + 'a,
        outsider_delta_threshold: f64,
    ) {
        let mut pass = CriteriaPass::new(outsider_delta_threshold);
        pass.criteria.push(WeighedCriterion::new(criterion));
        self.passes.push(pass);
    }

    fn score_pass(&self, pass: &CriteriaPass<'a>, candidates: &mut [Candidate]) -> Option<f64> {
        let mut best_score = None;
        for candidate in candidates.iter_mut() {
            candidate.score = 0.0;
            for weighed in &pass.criteria {
                candidate.score += weighed.criterion.score(candidate.index) * weighed.weight;
            }
            if best_score.map_or(true, |best| candidate.score > best) {
                best_score = Some(candidate.score);
            }
        }
        best_score
    }

    ///The single best candidate among `candidates_count`, or `None` when
    ///there are no candidates.
    pub fn find_best(&self, candidates_count: usize) -> Option<usize> {
        let mut candidates: Vec<Candidate> = (0..candidates_count)
            .map(|index| Candidate { index, score: 0.0 })
            .collect();

        for (pass_index, pass) in self.passes.iter().enumerate() {
            let best_score = match self.score_pass(pass, &mut candidates) {
                Some(score) => score,
                None => return None,
            };

            if pass_index == self.passes.len() - 1 {
                // First of the equally-best candidates wins.
                let mut best: Option<&Candidate> = None;
                for candidate in &candidates {
                    if best.map_or(true, |current| candidate.score > current.score) {
                        best = Some(candidate);
                    }
                }
                return best.map(|candidate| candidate.index);
            }

            let delta_threshold = pass.outsider_delta_threshold + f64::EPSILON;
            candidates.retain(|candidate| best_score - candidate.score <= delta_threshold);

            if candidates.len() == 1 {
                return Some(candidates[0].index);
            }
        }

        candidates.first().map(|candidate| candidate.index)
    }

    ///All candidates still tied within the final pass's threshold. With no
    ///passes configured, every candidate is equally optimal.
    pub fn find_best_all(&self, candidates_count: usize) -> Vec<usize> {
        let mut candidates: Vec<Candidate> = (0..candidates_count)
            .map(|index| Candidate { index, score: 0.0 })
            .collect();

        for pass in &self.passes {
            let best_score = match self.score_pass(pass, &mut candidates) {
                Some(score) => score,
                None => return Vec::new(),
            };

            let delta_threshold = pass.outsider_delta_threshold + f64::EPSILON;
            candidates.retain(|candidate| best_score - candidate.score <= delta_threshold);

            if candidates.len() == 1 {
                break;
            }
        }

        candidates
            .into_iter()
            .map(|candidate| candidate.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScores(Vec<f64>);

    impl ScoringCriterion for FixedScores {
        fn score(&self, candidate_index: usize) -> f64 {
            self.0[candidate_index]
        }
    }

    #[test]
    fn single_pass_picks_argmax() {
        let mut finder = BestElementFinder::new();
        finder.append_single_criterion_pass(FixedScores(vec![0.1, 0.9, 0.4]), 0.0);
        assert_eq!(finder.find_best(3), Some(1));
    }

    #[test]
    fn fallback_pass_breaks_ties() {
        let mut finder = BestElementFinder::new();
        finder.append_single_criterion_pass(FixedScores(vec![0.9, 0.89, 0.2]), 0.05);
        finder.append_single_criterion_pass(FixedScores(vec![0.1, 0.8, 0.9]), 0.0);
        // Candidate 2 is dropped in the first pass, candidate 1 wins the second.
        assert_eq!(finder.find_best(3), Some(1));
    }

    #[test]
    fn early_out_on_single_survivor() {
        let mut finder = BestElementFinder::new();
        finder.append_single_criterion_pass(FixedScores(vec![0.9, 0.2, 0.2]), 0.05);
        // Second pass would pick candidate 1, but it never runs.
        finder.append_single_criterion_pass(FixedScores(vec![0.0, 1.0, 0.0]), 0.0);
        assert_eq!(finder.find_best(3), Some(0));
    }

    #[test]
    fn no_candidates_yields_none() {
        let mut finder = BestElementFinder::new();
        finder.append_single_criterion_pass(FixedScores(vec![]), 0.0);
        assert_eq!(finder.find_best(0), None);
    }

    #[test]
    fn find_best_is_idempotent() {
        let mut finder = BestElementFinder::new();
        finder.append_single_criterion_pass(FixedScores(vec![0.3, 0.7, 0.7, 0.1]), 0.05);
        finder.append_single_criterion_pass(FixedScores(vec![0.5, 0.2, 0.6, 0.5]), 0.0);
        let first = finder.find_best(4);
        let second = finder.find_best(4);
        assert_eq!(first, second);
        assert_eq!(first, Some(2));
    }

    #[test]
    fn find_best_all_returns_near_optimal_set() {
        let mut finder = BestElementFinder::new();
        finder.append_single_criterion_pass(FixedScores(vec![0.9, 0.88, 0.1, 0.9]), 0.05);
        assert_eq!(finder.find_best_all(4), vec![0, 1, 3]);
    }

    #[test]
    fn no_passes_keeps_all_candidates() {
        let finder = BestElementFinder::new();
        assert_eq!(finder.find_best_all(3), vec![0, 1, 2]);
        assert_eq!(finder.find_best(3), Some(0));
    }
}
