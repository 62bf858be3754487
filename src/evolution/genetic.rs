//! One generation of the genetic engine.
//!
//! The population is sorted ascending by fitness on entry. The top half is
//! kept, the bottom half is overwritten by children of tournament winners,
//! a fraction of the top half is mutated or randomized, and finally every
//! dirty table is evaluated and the population re-sorted.

use tracing::debug;

use crate::chromosome::{Population, Table};
use crate::error::{Result, SolverError};
use crate::fitness::Evaluator;
use crate::model::Problem;
use crate::rng::RandomNumberGenerator;
use crate::selection::TournamentSelection;

use super::migration::MigrationChannel;
use super::options::GeneticParams;

/// Forces the fitness of every table beyond the first `max_equal` of a run
/// of equal fitness to [`FITNESS_WORST`](crate::chromosome::FITNESS_WORST).
/// Expects the tables sorted. Returns the number of demoted tables.
pub fn demote_equal_runs(tables: &mut [Table], max_equal: usize) -> usize {
    let Some(first) = tables.first() else {
        return 0;
    };
    let mut current = first.rank();
    let mut equal = 1;
    let mut demoted = 0;

    for table in tables.iter_mut().skip(1) {
        if table.rank() == current {
            equal += 1;
        } else {
            current = table.rank();
            equal = 1;
        }
        if equal > max_equal {
            table.demote();
            demoted += 1;
        }
    }
    demoted
}

/// Single-point crossover per variable type. Genes before the cut come from
/// the other parent, genes from the cut on from the own parent.
pub fn table_mate(
    problem: &Problem,
    s1: &Table,
    s2: &Table,
    d1: &mut Table,
    d2: &mut Table,
    rng: &mut RandomNumberGenerator,
) {
    let tuples = problem.tuple_count();
    for &type_id in problem.variable_types() {
        let cut = rng.gen_index(tuples);
        let p1 = s1.chromosome(type_id).genes();
        let p2 = s2.chromosome(type_id).genes();

        let c1 = d1.chromosome_mut(type_id).genes_mut();
        c1[..cut].copy_from_slice(&p2[..cut]);
        c1[cut..].copy_from_slice(&p1[cut..]);

        let c2 = d2.chromosome_mut(type_id).genes_mut();
        c2[..cut].copy_from_slice(&p1[..cut]);
        c2[cut..].copy_from_slice(&p2[cut..]);
    }
    d1.mark_dirty();
    d2.mark_dirty();
}

/// For every variable type, swaps the gene of a random tuple with the gene
/// of a random tuple sharing its domain.
pub fn table_mutate(problem: &Problem, table: &mut Table, rng: &mut RandomNumberGenerator) {
    let tuples = problem.tuple_count();
    for &type_id in problem.variable_types() {
        let a = rng.gen_index(tuples);
        let sharing = problem.tuple_domain(a, type_id).tuples();
        let b = sharing[rng.gen_index(sharing.len())];

        table.chromosome_mut(type_id).genes_mut().swap(a, b);
    }
    table.mark_dirty();
}

/// For every variable type, gives a random tuple a fresh value from its
/// domain.
pub fn table_rand(problem: &Problem, table: &mut Table, rng: &mut RandomNumberGenerator) {
    let tuples = problem.tuple_count();
    for &type_id in problem.variable_types() {
        let tuple = rng.gen_index(tuples);
        if let Some(value) = problem.tuple_domain(tuple, type_id).rand(rng) {
            table.set_gene(type_id, tuple, value);
        }
    }
    table.mark_dirty();
}

/// Runs the updater chain and a cache-aware evaluation on every dirty table.
/// Returns the number of tables evaluated.
pub fn evaluate_dirty(evaluator: &mut Evaluator<'_>, tables: &mut [Table]) -> usize {
    let problem = evaluator.problem();
    let mut evaluated = 0;
    for table in tables.iter_mut().filter(|t| !t.is_evaluated()) {
        problem.updater_call_all(table);
        evaluator.cache_table_fitness(table);
        evaluated += 1;
    }
    evaluated
}

/// Produces generations of one population.
#[derive(Debug, Clone)]
pub struct GeneticEngine {
    params: GeneticParams,
    selection: TournamentSelection,
}

impl GeneticEngine {
    pub fn new(params: GeneticParams) -> Result<Self> {
        params.validate()?;
        let selection = TournamentSelection::new(params.get_tournament_size())?;
        Ok(Self { params, selection })
    }

    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    /// Replaces `population` by its next generation.
    pub fn new_generation(
        &self,
        population: &mut Population,
        evaluator: &mut Evaluator<'_>,
        rng: &mut RandomNumberGenerator,
        migration: Option<&mut (dyn MigrationChannel + '_)>,
    ) -> Result<()> {
        let problem = evaluator.problem();
        let size = population.len();
        if size < 2 {
            return Err(SolverError::Configuration(format!(
                "population of {} can not breed",
                size
            )));
        }
        let half = size / 2;
        let migration_size = self.params.migration_size();
        let generation = population.generation();

        let mut migration = migration;
        if let Some(channel) = migration.as_deref_mut() {
            if generation % self.params.get_migration_time() as u64 == 0 && migration_size > 0 {
                debug!(generation, count = migration_size, "sending migration");
                channel.send(population.emigrants(migration_size))?;
            }
        }

        let tables = population.tables_mut();

        let demoted = demote_equal_runs(tables, self.params.get_max_equal());
        if demoted > 0 {
            debug!(generation, demoted, "demoted equal fitness runs");
        }

        let ranks: Vec<u64> = tables[..half].iter().map(Table::rank).collect();
        let (elite, rest) = tables.split_at_mut(half);
        for pair in rest.chunks_exact_mut(2) {
            let (first, second) = self.selection.select_parents(&ranks, rng)?;
            let (d1, d2) = pair.split_at_mut(1);
            table_mate(problem, &elite[first], &elite[second], &mut d1[0], &mut d2[0], rng);
        }

        for _ in 0..half / self.params.get_mutate_part() {
            let n = rng.gen_index(half);
            table_mutate(problem, &mut elite[n], rng);
        }
        for _ in 0..half / self.params.get_rand_part() {
            let n = rng.gen_index(half);
            table_rand(problem, &mut elite[n], rng);
        }

        if let Some(channel) = migration {
            if let Some(mut batch) = channel.try_recv() {
                batch.truncate(migration_size);
                let accepted = population.immigrate(problem, batch);
                debug!(generation, accepted, "received migration");
            }
        }

        evaluate_dirty(evaluator, population.tables_mut());
        population.sort();
        population.advance_generation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::FitnessContext;
    use crate::model::{ProblemBuilder, ResourceKind};

    fn problem() -> Problem {
        let mut b = ProblemBuilder::new();
        let room = b.restype_new("room", ResourceKind::Variable).unwrap();
        let time = b.restype_new("time", ResourceKind::Variable).unwrap();
        b.res_new_matrix(room, 1, 3).unwrap();
        b.res_new_matrix(time, 2, 4).unwrap();
        for n in 0..6 {
            b.tuple_new(&format!("e{}", n)).unwrap();
        }
        b.domain_and(0, time, &[0, 1]).unwrap();
        b.domain_and(1, time, &[0, 1]).unwrap();
        b.domain_and(2, time, &[5, 6, 7]).unwrap();
        b.domain_and(3, room, &[2]).unwrap();
        b.build().unwrap()
    }

    fn sum_of_genes(ctx: &FitnessContext<'_>) -> u32 {
        ctx.chromosome(0).genes().iter().sum::<usize>() as u32
    }

    fn assert_legal(p: &Problem, table: &Table) {
        for &type_id in p.variable_types() {
            for tuple in 0..p.tuple_count() {
                assert!(
                    p.tuple_domain(tuple, type_id).contains(table.gene(type_id, tuple)),
                    "tuple {} type {} has illegal gene {}",
                    tuple,
                    type_id,
                    table.gene(type_id, tuple)
                );
            }
        }
    }

    fn random_tables(p: &Problem, n: usize, rng: &mut RandomNumberGenerator) -> Vec<Table> {
        let mut pop = Population::init(p, n).unwrap();
        pop.rand(p, rng).unwrap();
        pop.tables().to_vec()
    }

    #[test]
    fn test_demote_equal_runs() {
        let p = problem();
        let mut tables = random_tables(&p, 7, &mut RandomNumberGenerator::from_seed(1));
        for (t, f) in tables.iter_mut().zip([1, 2, 2, 2, 2, 3, 3]) {
            t.set_evaluation(f, true, &[]);
        }
        assert_eq!(demote_equal_runs(&mut tables, 2), 2);
        let ranks: Vec<u64> = tables.iter().map(Table::rank).collect();
        let worst = crate::chromosome::FITNESS_WORST;
        assert_eq!(ranks, vec![1, 2, 2, worst, worst, 3, 3]);
        assert_eq!(demote_equal_runs(&mut [], 2), 0);
    }

    #[test]
    fn test_mate_swaps_around_cut() {
        let p = problem();
        let mut rng = RandomNumberGenerator::from_seed(4);
        let mut tables = random_tables(&p, 4, &mut rng);
        let (parents, children) = tables.split_at_mut(2);
        let (d1, d2) = children.split_at_mut(1);
        table_mate(&p, &parents[0], &parents[1], &mut d1[0], &mut d2[0], &mut rng);

        for &type_id in p.variable_types() {
            for tuple in 0..p.tuple_count() {
                let a = parents[0].gene(type_id, tuple);
                let b = parents[1].gene(type_id, tuple);
                let c = d1[0].gene(type_id, tuple);
                let d = d2[0].gene(type_id, tuple);
                // Children split each position between the two parents.
                assert!((c == a && d == b) || (c == b && d == a));
            }
        }
        assert!(!d1[0].is_evaluated());
        assert_legal(&p, &d1[0]);
        assert_legal(&p, &d2[0]);
    }

    #[test]
    fn test_operators_preserve_legality() {
        let p = problem();
        let mut rng = RandomNumberGenerator::from_seed(8);
        let mut tables = random_tables(&p, 2, &mut rng);
        for _ in 0..500 {
            table_mutate(&p, &mut tables[0], &mut rng);
            table_rand(&p, &mut tables[1], &mut rng);
            assert_legal(&p, &tables[0]);
            assert_legal(&p, &tables[1]);
        }
    }

    #[test]
    fn test_new_generation() {
        let p = problem();
        let params = GeneticParams::builder()
            .population_size(20)
            .cache_size(4)
            .build();
        let engine = GeneticEngine::new(params).unwrap();
        let mut ev = Evaluator::new(&p, 4);
        let id = ev.fitness_new("rooms", 1, false, sum_of_genes).unwrap();
        ev.request_chromosome(id, 0).unwrap();

        let mut rng = RandomNumberGenerator::from_seed(12);
        let mut pop = Population::init(&p, 20).unwrap();
        pop.rand(&p, &mut rng).unwrap();
        evaluate_dirty(&mut ev, pop.tables_mut());
        pop.sort();

        for _ in 0..30 {
            engine.new_generation(&mut pop, &mut ev, &mut rng, None).unwrap();
            assert!(pop.tables().iter().all(Table::is_evaluated));
            for t in pop.tables() {
                assert_legal(&p, t);
            }
            let ranks: Vec<u64> = pop.tables().iter().map(Table::rank).collect();
            assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        }
        assert_eq!(pop.generation(), 30);
    }

    #[test]
    fn test_tiny_population_rejected() {
        let p = problem();
        let engine = GeneticEngine::new(GeneticParams::builder().population_size(2).build()).unwrap();
        let mut ev = Evaluator::new(&p, 0);
        let mut pop = Population::init(&p, 1).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(0);
        assert!(engine.new_generation(&mut pop, &mut ev, &mut rng, None).is_err());
    }
}
