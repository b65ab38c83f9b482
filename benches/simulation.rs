//! Performance benchmarks for COEVA

use coeva::agents::Species;
use coeva::evolution::{EvolutionEngine, Individual};
use coeva::fitness::genome_camouflage_fitness;
use coeva::ranking::RankingCache;
use coeva::{Config, Genome, Rgb, World};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for bacteria in [50, 100, 200].iter() {
        let mut config = Config::default();
        config.population.initial_bacteria = *bacteria;
        config.population.initial_phagocytes = bacteria / 2;

        let mut world = World::new_with_seed(config, 42);

        // Warm up
        world.run(10);

        group.bench_with_input(BenchmarkId::new("bacteria", bacteria), bacteria, |b, _| {
            b.iter(|| {
                world.step();
            });
        });
    }

    group.finish();
}

fn benchmark_ranking_refresh(c: &mut Criterion) {
    let mut config = Config::default();
    config.population.initial_bacteria = 200;
    let world = World::new_with_seed(config.clone(), 42);
    let mut cache = RankingCache::new(1);
    let mut generation = 0;

    c.bench_function("ranking_refresh_200", |b| {
        b.iter(|| {
            generation += 1;
            cache.refresh(generation, black_box(&world.bacteria), Rgb::default(), &config);
        });
    });
}

fn benchmark_epoch(c: &mut Criterion) {
    let config = Config::default();
    let engine = EvolutionEngine::from_config(&config);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let population: Vec<Individual> = (0..100)
        .map(|_| Individual::new(Genome::random(Species::Bacteria, &mut rng)))
        .collect();

    c.bench_function("evolve_bacteria_100", |b| {
        b.iter(|| {
            engine
                .evolve(
                    Species::Bacteria,
                    black_box(population.clone()),
                    |g| genome_camouflage_fitness(g, 100.0, Rgb::default()),
                    &mut rng,
                )
                .unwrap()
        });
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let mut config = Config::default();
    config.population.initial_bacteria = 300;
    config.population.max_population = 400;
    let mut world = World::new_with_seed(config, 42);
    world.run(20);

    c.bench_function("snapshot_json", |b| {
        b.iter(|| world.get_state().to_json().unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_world_step,
    benchmark_ranking_refresh,
    benchmark_epoch,
    benchmark_snapshot,
);

criterion_main!(benches);
