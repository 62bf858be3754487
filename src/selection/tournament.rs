use crate::error::{Result, SolverError};
use crate::rng::RandomNumberGenerator;

/// Picks crossover parents by tournament among the elite.
///
/// Two contestants are drawn uniformly and ordered so the first is the
/// better one. Each further draw up to the tournament size replaces the
/// first parent if it beats it, otherwise the second parent if it beats
/// that. Lower fitness wins. Both parents may be the same individual.
///
/// # Examples
///
/// ```
/// use tablix_core::selection::TournamentSelection;
/// use tablix_core::rng::RandomNumberGenerator;
///
/// let ranks = [1, 5, 3, 9];
/// let selection = TournamentSelection::new(4).unwrap();
/// let mut rng = RandomNumberGenerator::from_seed(42);
/// let (a, b) = selection.select_parents(&ranks, &mut rng).unwrap();
/// assert!(ranks[a] <= ranks[b]);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentSelection {
    tournament_size: usize,
}

impl TournamentSelection {
    /// Creates a tournament of `tournament_size` contestants. Sizes 1 and
    /// 2 both draw exactly two contestants.
    ///
    /// # Errors
    ///
    /// Returns an error if `tournament_size` is 0.
    pub fn new(tournament_size: usize) -> Result<Self> {
        if tournament_size < 1 {
            return Err(SolverError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        Ok(Self { tournament_size })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Returns the indices of two parents in `ranks`, better one first.
    pub fn select_parents(
        &self,
        ranks: &[u64],
        rng: &mut RandomNumberGenerator,
    ) -> Result<(usize, usize)> {
        if ranks.is_empty() {
            return Err(SolverError::EmptyPopulation);
        }

        let mut first = rng.gen_index(ranks.len());
        let mut second = rng.gen_index(ranks.len());
        if ranks[first] > ranks[second] {
            std::mem::swap(&mut first, &mut second);
        }

        for _ in 2..self.tournament_size {
            let contestant = rng.gen_index(ranks.len());
            if ranks[contestant] < ranks[first] {
                first = contestant;
            } else if ranks[contestant] < ranks[second] {
                second = contestant;
            }
        }

        Ok((first, second))
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self { tournament_size: 3 }
    }
}
