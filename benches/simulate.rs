use criterion::Criterion;
use palm_fit::{
    ChildDist, Dispersion, Domain, Param, Params, ProcessFamily, SimulationEdges,
    simulate_process,
};
use rand::prelude::*;
use std::hint::black_box;

pub fn bench_simulate(c: &mut Criterion) {
    let domain = Domain::unit(2).unwrap();

    let child = ChildDist::binomial(10).unwrap();
    let matern = ProcessFamily::neyman_scott(child, Dispersion::uniform()).unwrap();
    let matern_params = Params::new()
        .with(Param::D, 100.0)
        .with(Param::P, 0.5)
        .with(Param::Tau, 0.02);
    let void_params = Params::new()
        .with(Param::Dc, 1000.0)
        .with(Param::Dp, 50.0)
        .with(Param::Tau, 0.05);

    let cases = [
        (
            "Matern 2-D simulation: periodic",
            &matern,
            &matern_params,
            SimulationEdges::Periodic,
        ),
        (
            "Matern 2-D simulation: buffer",
            &matern,
            &matern_params,
            SimulationEdges::Buffer { width: None },
        ),
    ];
    for (name, family, params, edges) in cases {
        let mut rng = StdRng::seed_from_u64(0);
        c.bench_function(name, |b| {
            b.iter(|| simulate_process(black_box(params), &domain, family, edges, &mut rng));
        });
    }

    let void = ProcessFamily::void();
    let mut rng = StdRng::seed_from_u64(0);
    c.bench_function("Void 2-D simulation", |b| {
        b.iter(|| {
            simulate_process(
                black_box(&void_params),
                &domain,
                &void,
                SimulationEdges::Periodic,
                &mut rng,
            )
        });
    });
}
