use tablix_core::{
    chromosome::Population,
    model::{ProblemBuilder, ResourceKind},
    rng::RandomNumberGenerator,
    SolverError,
};

fn builder() -> (ProblemBuilder, usize) {
    let mut b = ProblemBuilder::new();
    let time = b.restype_new("time", ResourceKind::Variable).unwrap();
    b.res_new_matrix(time, 1, 10).unwrap();
    for name in ["a", "b", "c", "d"] {
        b.tuple_new(name).unwrap();
    }
    (b, time)
}

#[test]
fn test_cycle_rejected() {
    let (mut b, time) = builder();
    b.updater_new(0, 1, time, |_, _, _, r| r).unwrap();
    b.updater_new(1, 2, time, |_, _, _, r| r).unwrap();
    b.updater_new(2, 0, time, |_, _, _, r| r).unwrap();

    match b.build() {
        Err(SolverError::Dependency(msg)) => {
            assert!(msg.contains("circular"));
            assert!(msg.contains("'a' depends on 'c'"));
        }
        other => panic!("expected dependency error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_chain_applied_in_dependency_order() {
    let (mut b, time) = builder();
    // Registered back to front: d <- c <- b <- a.
    b.updater_new(2, 3, time, |_, _, _, r| r + 1).unwrap();
    b.updater_new(1, 2, time, |_, _, _, r| r + 1).unwrap();
    b.updater_new(0, 1, time, |_, _, _, r| r + 1).unwrap();
    let problem = b.build().unwrap();

    let order: Vec<(usize, usize)> = problem.updaters().iter().map(|u| (u.src(), u.dst())).collect();
    assert_eq!(order, vec![(0, 1), (1, 2), (2, 3)]);

    // d = a + 3 must stay below 10.
    assert_eq!(problem.tuple_domain(0, time).values(), &[0, 1, 2, 3, 4, 5, 6]);

    let mut rng = RandomNumberGenerator::from_seed(21);
    let mut population = Population::init(&problem, 20).unwrap();
    population.rand(&problem, &mut rng).unwrap();
    for table in population.tables_mut() {
        problem.updater_call_all(table);
        let a = table.gene(time, 0);
        assert_eq!(table.gene(time, 1), a + 1);
        assert_eq!(table.gene(time, 2), a + 2);
        assert_eq!(table.gene(time, 3), a + 3);
    }
}

#[test]
fn test_independent_types_do_not_form_cycle() {
    let mut b = ProblemBuilder::new();
    let time = b.restype_new("time", ResourceKind::Variable).unwrap();
    let room = b.restype_new("room", ResourceKind::Variable).unwrap();
    b.res_new_matrix(time, 1, 3).unwrap();
    b.res_new_matrix(room, 1, 3).unwrap();
    let x = b.tuple_new("x").unwrap();
    let y = b.tuple_new("y").unwrap();
    b.updater_new(x, y, time, |_, _, _, r| r).unwrap();
    b.updater_new(y, x, room, |_, _, _, r| r).unwrap();

    let problem = b.build().unwrap();
    assert_eq!(problem.updaters().len(), 2);
}

#[test]
fn test_invalid_updaters_rejected() {
    let (mut b, time) = builder();
    assert!(matches!(
        b.updater_new(0, 0, time, |_, _, _, r| r),
        Err(SolverError::Dependency(_))
    ));
    b.updater_new(0, 1, time, |_, _, _, r| r).unwrap();
    assert!(b.updater_check(1, time));
    assert!(matches!(
        b.updater_new(2, 1, time, |_, _, _, r| r),
        Err(SolverError::Dependency(_))
    ));
    assert!(b.updater_new(0, 9, time, |_, _, _, r| r).is_err());
    assert!(b.updater_new(0, 2, time + 5, |_, _, _, r| r).is_err());
}

#[test]
fn test_constant_type_updater_rejected() {
    let mut b = ProblemBuilder::new();
    let class = b.restype_new("class", ResourceKind::Constant).unwrap();
    b.res_new(class, "1a").unwrap();
    let x = b.tuple_new("x").unwrap();
    let y = b.tuple_new("y").unwrap();
    assert!(matches!(
        b.updater_new(x, y, class, |_, _, _, r| r),
        Err(SolverError::Dependency(_))
    ));
}
