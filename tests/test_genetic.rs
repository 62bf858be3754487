use tablix_core::{
    chromosome::{Population, Table},
    evolution::{
        genetic::{evaluate_dirty, table_mate, table_mutate, table_rand},
        ChannelMigration, GeneticEngine, GeneticParams, MigrationChannel,
    },
    fitness::{Evaluator, FitnessContext},
    model::{Problem, ProblemBuilder, ResourceKind},
    rng::RandomNumberGenerator,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

// Teachers are constant, rooms and times are searched for. Every event has
// a narrowed time domain and the third event follows the first one.
fn problem() -> Problem {
    let mut b = ProblemBuilder::new();
    let teacher = b.restype_new("teacher", ResourceKind::Constant).unwrap();
    let room = b.restype_new("room", ResourceKind::Variable).unwrap();
    let time = b.restype_new("time", ResourceKind::Variable).unwrap();
    b.res_new(teacher, "smith").unwrap();
    b.res_new(teacher, "jones").unwrap();
    b.res_new_matrix(room, 1, 3).unwrap();
    b.res_new_matrix(time, 5, 4).unwrap();

    for n in 0..8 {
        let tuple = b.tuple_new(&format!("event{}", n)).unwrap();
        b.tuple_set(tuple, teacher, n % 2).unwrap();
        let slots: Vec<usize> = (0..20).filter(|s| s % (n % 3 + 1) == 0).collect();
        b.domain_and(tuple, time, &slots).unwrap();
    }
    b.updater_new(0, 2, time, |_, _, _, t| t + 1).unwrap();
    b.build().unwrap()
}

fn assert_legal(problem: &Problem, table: &Table) {
    for &type_id in problem.variable_types() {
        for tuple in problem.tuples() {
            let gene = table.gene(type_id, tuple.id());
            assert!(
                problem.tuple_domain(tuple.id(), type_id).contains(gene),
                "event {} has illegal resource {} of type {}",
                tuple.name(),
                gene,
                type_id
            );
        }
    }
}

fn teacher_clash(ctx: &FitnessContext<'_>) -> u32 {
    let ext = ctx.extension(0);
    let table = ctx.table();
    // A tuple that does not own its cell shares it with a later one.
    (0..table.tuple_count())
        .filter(|&tuple| {
            let v = table.gene(ext.var_type(), tuple);
            let c = table.gene(ext.con_type(), tuple);
            ext.get(v, c) != Some(tuple)
        })
        .count() as u32
}

fn evaluator(problem: &Problem) -> Evaluator<'_> {
    let teacher = problem.find_type("teacher").unwrap();
    let time = problem.find_type("time").unwrap();
    let mut ev = Evaluator::new(problem, 32);
    let id = ev.fitness_new("teacher clash", 10, true, teacher_clash).unwrap();
    ev.request_extension(id, teacher, time).unwrap();
    ev
}

#[test]
fn test_operators_keep_genes_legal() {
    init_tracing();
    let problem = problem();
    let mut rng = RandomNumberGenerator::from_seed(99);
    let mut population = Population::init(&problem, 4).unwrap();
    population.rand(&problem, &mut rng).unwrap();
    let tables = population.tables_mut();
    for table in tables.iter_mut() {
        problem.updater_call_all(table);
        assert_legal(&problem, table);
    }

    for _ in 0..200 {
        let (parents, children) = tables.split_at_mut(2);
        let (d1, d2) = children.split_at_mut(1);
        table_mate(&problem, &parents[0], &parents[1], &mut d1[0], &mut d2[0], &mut rng);
        table_mutate(&problem, &mut parents[0], &mut rng);
        table_rand(&problem, &mut parents[1], &mut rng);
        for table in tables.iter_mut() {
            problem.updater_call_all(table);
            assert_legal(&problem, table);
        }
    }
}

#[test]
fn test_generations_with_migration() {
    init_tracing();
    let problem = problem();
    let params = GeneticParams::builder()
        .population_size(20)
        .migration_time(2)
        .migration_part(4)
        .build();
    let engine = GeneticEngine::new(params).unwrap();
    let mut ring = ChannelMigration::ring(2);
    let mut ev = evaluator(&problem);
    let mut rng = RandomNumberGenerator::from_seed(5);

    let mut population = Population::init(&problem, 20).unwrap();
    population.rand(&problem, &mut rng).unwrap();
    evaluate_dirty(&mut ev, population.tables_mut());
    population.sort();

    for _ in 0..6 {
        let (node, peer) = ring.split_at_mut(1);
        engine
            .new_generation(&mut population, &mut ev, &mut rng, Some(&mut node[0]))
            .unwrap();
        // The peer echoes whatever it got back to this node.
        if let Some(batch) = peer[0].try_recv() {
            assert_eq!(batch.len(), 5);
            peer[0].send(batch).unwrap();
        }
        for table in population.tables() {
            assert!(table.is_evaluated());
            assert_legal(&problem, table);
        }
    }
    assert_eq!(population.generation(), 6);
    assert!(ev.cache_stats().misses > 0);
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_round_trip() {
    use tablix_core::evolution::GenerationReport;

    let params: GeneticParams = "popsize=64,toursize=4,maxgen=10".parse().unwrap();
    let json = serde_json::to_string(&params).unwrap();
    let back: GeneticParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back.get_population_size(), 64);
    assert_eq!(back.get_tournament_size(), 4);
    assert_eq!(back.get_max_generations(), 10);

    let report = GenerationReport {
        generation: 3,
        fitness: 20,
        feasible: false,
        subtotals: vec![20],
    };
    let json = serde_json::to_string(&report).unwrap();
    assert_eq!(serde_json::from_str::<GenerationReport>(&json).unwrap(), report);
}
