use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use salient::core::EngineConfig;
use salient::turn::run_turn;
use salient::world::generate::{generate_world, synthetic_turn_inputs, ScenarioParams};

fn bench_run_turn(c: &mut Criterion) {
    let config = EngineConfig::default();
    let params = ScenarioParams {
        factions: 3,
        municipalities: 24,
        settlements_per_municipality: 6,
        formations_per_faction: 12,
    };
    let mut world = generate_world(&params, 42);
    world.turn = 1;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let inputs = synthetic_turn_inputs(&world, &mut rng);

    c.bench_function("run_turn", |b| {
        b.iter(|| {
            let mut world = world.clone();
            run_turn(&mut world, &config, &inputs)
        })
    });
}

criterion_group!(benches, bench_run_turn);
criterion_main!(benches);
