use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tablix_core::{
    chromosome::{Population, Table},
    evolution::{GeneticParams, RunOutcome, Solver},
    fitness::{Evaluator, FitnessContext},
    model::{Problem, ProblemBuilder, ResourceKind},
    plugin::{PluginRegistry, RestrictionOutcome},
    rng::RandomNumberGenerator,
    SolverError,
};

// One class, four time slots, three lessons of that class.
fn school(registry: &PluginRegistry, fixed: Option<&str>) -> Problem {
    let mut b = ProblemBuilder::new();
    let class = b.restype_new("class", ResourceKind::Constant).unwrap();
    let time = b.restype_new("time", ResourceKind::Variable).unwrap();
    b.res_new(class, "1a").unwrap();
    b.res_new_matrix(time, 1, 4).unwrap();

    for name in ["math", "art", "music"] {
        let tuple = b.tuple_new(name).unwrap();
        b.tuple_set(tuple, class, 0).unwrap();
    }
    if let Some(slot) = fixed {
        let outcome = registry.handler_tup_call(&mut b, "fixed-time", slot, 0).unwrap();
        assert_eq!(outcome, RestrictionOutcome::Handled);
    }
    registry.build_problem(b).unwrap()
}

fn fixed_time_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.handler_tup_new("fixed-time", |b: &mut ProblemBuilder, _: &str, content: &str, tuple| {
        let time = b
            .find_type("time")
            .ok_or_else(|| SolverError::Plugin("no time type".to_string()))?;
        let slot = content
            .trim()
            .parse::<usize>()
            .map_err(|_| SolverError::Plugin(format!("bad slot '{}'", content)))?;
        b.domain_and(tuple, time, &[slot])
    });
    registry
}

// Counts the extra events in every time slot.
fn clash_evaluator(problem: &Problem) -> Evaluator<'_> {
    let time = problem.find_type("time").unwrap();
    let mut ev = Evaluator::new(problem, 16);
    let id = ev
        .fitness_new("timeslot clash", 100, true, |ctx: &FitnessContext<'_>| {
            let lookup = ctx.lookup(0);
            (0..lookup.resource_count())
                .map(|slot| lookup.tuples(slot).len().saturating_sub(1) as u32)
                .sum()
        })
        .unwrap();
    ev.request_lookup(id, time).unwrap();
    ev
}

fn small_params() -> GeneticParams {
    GeneticParams::builder()
        .population_size(16)
        .tournament_size(3)
        .cache_size(16)
        .max_generations(300)
        .build()
}

#[test]
fn test_solves_clash_free_timetable() {
    let registry = fixed_time_registry();
    let problem = school(&registry, Some("2"));
    let time = problem.find_type("time").unwrap();

    let mut solver = Solver::new(
        clash_evaluator(&problem),
        small_params(),
        RandomNumberGenerator::from_seed(42),
    )
    .unwrap();
    assert_eq!(solver.run(None, None).unwrap(), RunOutcome::Solved);

    let best = solver.best().unwrap();
    assert_eq!(best.fitness(), Some(0));
    assert!(best.is_feasible());
    assert_eq!(best.subtotals(), &[0]);

    let mut slots: Vec<usize> = best.chromosome(time).genes().to_vec();
    assert_eq!(slots[0], 2);
    slots.sort_unstable();
    slots.dedup();
    assert_eq!(slots.len(), 3);
}

#[test]
fn test_failing_restriction_names_event() {
    let registry = fixed_time_registry();
    let mut b = ProblemBuilder::new();
    b.restype_new("time", ResourceKind::Variable).unwrap();
    let tuple = b.tuple_new("math").unwrap();

    let err = registry
        .handler_tup_call(&mut b, "fixed-time", "soon", tuple)
        .unwrap_err();
    assert!(matches!(err, SolverError::Plugin(ref msg) if msg.contains("math")));
}

#[test]
fn test_updater_keeps_lab_after_lecture() {
    let mut b = ProblemBuilder::new();
    let time = b.restype_new("time", ResourceKind::Variable).unwrap();
    b.res_new_matrix(time, 1, 4).unwrap();
    let lecture = b.tuple_new("lecture").unwrap();
    let lab = b.tuple_new("lab").unwrap();
    b.updater_new(lecture, lab, time, |_, _, _, slot| slot + 1).unwrap();
    let problem = b.build().unwrap();

    assert_eq!(problem.tuple_domain(lecture, time).values(), &[0, 1, 2]);
    assert!(problem.tuple(lab).is_dependent(time));

    let mut ev = Evaluator::new(&problem, 0);
    // Prefers the lecture late in the week, which pushes it against the limit.
    ev.fitness_new("late", 1, false, move |ctx: &FitnessContext<'_>| {
        3 - ctx.table().gene(time, lecture) as u32
    })
    .unwrap();
    let params = GeneticParams::builder()
        .population_size(10)
        .rand_part(1)
        .finish(20)
        .max_generations(200)
        .build();
    let mut solver = Solver::new(ev, params, RandomNumberGenerator::from_seed(7)).unwrap();
    solver.run(None, None).unwrap();

    for table in solver.population().tables() {
        assert_eq!(table.gene(time, lab), table.gene(time, lecture) + 1);
    }
    assert_eq!(solver.best().unwrap().gene(time, lecture), 2);
}

#[test]
fn test_checkpoint_restores_population() {
    let registry = PluginRegistry::new();
    let problem = school(&registry, None);
    let params = GeneticParams::builder()
        .population_size(8)
        .max_generations(3)
        .finish(1000)
        .build();

    let mut solver = Solver::new(
        clash_evaluator(&problem),
        params.clone(),
        RandomNumberGenerator::from_seed(11),
    )
    .unwrap();
    let outcome = solver.run(None, None).unwrap();
    assert!(matches!(outcome, RunOutcome::Solved | RunOutcome::GenerationLimit));
    let population = solver.into_population();

    let mut bytes = Vec::new();
    population.save(&mut bytes).unwrap();
    let restored = Population::load(&problem, bytes.as_slice()).unwrap();

    assert_eq!(restored.generation(), population.generation());
    assert_eq!(restored.len(), population.len());
    for (a, b) in restored.tables().iter().zip(population.tables()) {
        for (ca, cb) in a.chromosomes().iter().zip(b.chromosomes()) {
            assert_eq!(ca.genes(), cb.genes());
        }
    }

    let resumed = Solver::resume(
        clash_evaluator(&problem),
        params,
        restored,
        RandomNumberGenerator::from_seed(12),
    )
    .unwrap();
    assert_eq!(resumed.population().generation(), population.generation());
}

#[test]
fn test_cache_answers_repeated_pattern() {
    let registry = PluginRegistry::new();
    let problem = school(&registry, None);
    let time = problem.find_type("time").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut ev = Evaluator::new(&problem, 2);
    let counter = Arc::clone(&calls);
    let id = ev
        .fitness_new("counted", 1, false, move |ctx: &FitnessContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.chromosome(0).genes()[0] as u32
        })
        .unwrap();
    ev.request_chromosome(id, time).unwrap();

    let mut population = Population::init(&problem, 3).unwrap();
    for table in population.tables_mut() {
        table.set_gene(time, 0, 3);
        table.set_gene(time, 1, 1);
        ev.cache_table_fitness(table);
    }

    let stats = ev.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(population.tables().iter().all(|t: &Table| t.fitness() == Some(3)));
}
