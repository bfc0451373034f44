//! Benchmarks the production optimizer flow (`reduce -> single_resub
//! -> multi_resub`) over a small synthetic layered AIG: each internal
//! node ANDs together two earlier nodes (PI or internal), picked
//! pseudo-randomly but deterministically, giving the optimizer real
//! redundancy/resubstitution work without depending on an external
//! circuit fixture.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rrr::analyzer::combinator::Combinator;
use rrr::analyzer::simulator::Simulator;
use rrr::config::OptimizerFlow;
use rrr::network::Network;
use rrr::optimizer::Optimizer;
use rrr::pattern::Pattern;
use rrr::sat_solver::SimpleSatSolver;

fn build_layered_aig(num_pis: usize, num_internal: usize, num_pos: usize) -> Network {
    let mut net = Network::new();
    let pis: Vec<usize> = (0..num_pis).map(|_| net.add_pi()).collect();

    let mut pool = pis.clone();
    let mut state = 0x243f_6a88_85a3_08d3u64;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        state
    };

    for _ in 0..num_internal {
        let i = (next() as usize) % pool.len();
        let mut j = (next() as usize) % pool.len();
        if j == i {
            j = (j + 1) % pool.len();
        }
        let fanins = vec![(pool[i], next() % 2 == 0), (pool[j], next() % 2 == 0)];
        let id = net.add_and(fanins);
        pool.push(id);
    }

    for k in 0..num_pos {
        let id = pool[pool.len() - 1 - (k % pool.len())];
        net.add_po(id, next() % 2 == 0);
    }
    net
}

fn bench_optimizer(c: &mut Criterion) {
    c.bench_function("optimizer_run_layered_aig", |b| {
        b.iter(|| {
            let mut net = build_layered_aig(12, 40, 4);
            let pattern = Pattern::random(net.num_pis(), 4, 42);
            let sim = Simulator::new(pattern);
            let analyzer = Box::new(Combinator::<SimpleSatSolver>::new(sim, 200));
            let mut opt = Optimizer::new(analyzer);
            opt.assign_network(&mut net, false);
            opt.run(&mut net, OptimizerFlow::ReduceThenResub, None);
            black_box(Optimizer::cost(&net));
        })
    });
}

criterion_group!(benches, bench_optimizer);
criterion_main!(benches);
