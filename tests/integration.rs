//! Integration tests for COEVA

use coeva::agents::{Agent, Bacteria, Phagocyte};
use coeva::{Config, Genome, Rgb, SimState, SimulationHandle, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

fn quiet_config() -> Config {
    let mut config = Config::default();
    config.glucose.initial_count = 0;
    config.glucose.spawn_probability = 0.0;
    config
}

#[test]
fn test_full_simulation_cycle() {
    let mut config = Config::default();
    config.population.initial_bacteria = 60;
    config.population.initial_phagocytes = 20;
    config.evolution.generations_per_epoch = 25;

    let mut world = World::new_with_seed(config, 12345);
    world.run(200);

    assert_eq!(world.generation, 200);
    assert_eq!(world.stats.counters.epochs, 8);

    let (w, h) = (
        world.config().world.canvas_width as f32,
        world.config().world.canvas_height as f32,
    );
    for b in &world.bacteria {
        assert!(b.body.x >= 0.0 && b.body.x <= w);
        assert!(b.body.y >= 0.0 && b.body.y <= h);
        assert!(b.body.genome.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
    }
    assert!(world.bacteria.len() <= world.config().population.max_population);
    assert!(world.phagocytes.len() <= world.config().max_phagocytes());
}

#[test]
fn test_single_capture_scenario() {
    let mut config = quiet_config();
    config.world.background_color = Rgb::WHITE;
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    // Ten grey bacteria on a white canvas, spread far apart
    let mut bacteria = Vec::new();
    for i in 0..10 {
        let x = 40.0 + 80.0 * i as f32;
        let genome = Genome::from_genes([("color_gene", 0.0)]);
        bacteria.push(Bacteria::new(format!("bacteria_{}", i), x, 300.0, genome, 100.0, &config, &mut rng));
    }

    let hunter = Genome::from_genes([("sensitivity_gene", 1.0), ("aggression_gene", 1.0)]);
    let mut phagocyte = Phagocyte::new("phagocyte_10".into(), 440.0, 305.0, hunter, 100.0, &config, &mut rng);
    // Facing the bacterium at (440, 300)
    phagocyte.body.vx = 0.0;
    phagocyte.body.vy = -1.0;

    let mut world = World::from_populations(config, 1, bacteria, vec![phagocyte], Vec::new());
    world.step();

    let report = world.last_report();
    assert_eq!(report.captures, 1);
    assert_eq!(world.bacteria.len(), 9);
    assert!(world.bacteria.iter().all(|b| b.id() != "bacteria_5"));
    assert!(world.phagocytes[0].body.energy > 100.0);
    assert_eq!(world.phagocytes[0].captures, 1);
}

#[test]
fn test_epoch_replaces_populations() {
    let mut config = quiet_config();
    config.population.initial_bacteria = 30;
    config.population.initial_phagocytes = 8;
    config.evolution.generations_per_epoch = 5;

    let mut world = World::new_with_seed(config, 2);
    world.run(4);
    let before: HashSet<String> = world
        .bacteria
        .iter()
        .map(|b| b.body.id.clone())
        .chain(world.phagocytes.iter().map(|p| p.body.id.clone()))
        .collect();
    assert!(world.last_report().epoch.is_none());
    for b in &mut world.bacteria {
        b.body.fitness = 0.0;
    }

    world.step();
    assert!(world.last_report().epoch.is_some());
    let min_population = world.config().evolution.min_population;
    let (w, h) = (
        world.config().world.canvas_width as f32,
        world.config().world.canvas_height as f32,
    );
    assert!(world.bacteria.len() >= min_population);
    assert!(world.phagocytes.len() >= min_population);
    for b in &world.bacteria {
        assert!(!before.contains(&b.body.id));
        assert_eq!(b.body.energy, 100.0);
        assert_eq!(b.body.age, 0);
        assert!(b.body.x >= 0.0 && b.body.x <= w && b.body.y >= 0.0 && b.body.y <= h);
        assert!(b.body.genome.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
    }
    for p in &world.phagocytes {
        assert!(!before.contains(&p.body.id));
        assert_eq!(p.body.energy, 100.0);
        assert_eq!(p.body.age, 0);
        assert!(p.body.x >= 0.0 && p.body.x <= w && p.body.y >= 0.0 && p.body.y <= h);
        assert!(p.body.genome.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
    }
    assert!(world.ranking().computed_at().is_none());
}

#[test]
fn test_reproducibility() {
    let mut config = Config::default();
    config.population.initial_bacteria = 40;
    config.population.initial_phagocytes = 12;
    config.evolution.generations_per_epoch = 20;

    let mut world1 = World::new_with_seed(config.clone(), 99999);
    let mut world2 = World::new_with_seed(config, 99999);

    for _ in 0..60 {
        world1.step();
        world2.step();
        let (a, b) = (&world1.stats.current, &world2.stats.current);
        assert_eq!(a.bacteria, b.bacteria);
        assert_eq!(a.phagocytes, b.phagocytes);
        assert_eq!(a.glucose, b.glucose);
        assert_eq!(a.bacteria_fitness, b.bacteria_fitness);
        assert_eq!(a.phagocyte_fitness, b.phagocyte_fitness);
        assert_eq!(a.captures, b.captures);
    }

    let ids1: Vec<&str> = world1.bacteria.iter().map(|b| b.id()).collect();
    let ids2: Vec<&str> = world2.bacteria.iter().map(|b| b.id()).collect();
    assert_eq!(ids1, ids2);
}

#[test]
fn test_extinct_species_stays_extinct() {
    let mut config = quiet_config();
    config.population.initial_phagocytes = 0;
    config.population.initial_bacteria = 20;
    config.evolution.generations_per_epoch = 3;

    let mut world = World::new_with_seed(config, 3);
    world.run(9);
    assert!(world.phagocytes.is_empty());
    assert!(!world.bacteria.is_empty());
    assert_eq!(world.stats.counters.epochs, 3);
}

#[test]
fn test_handle_json_round() {
    let mut config = Config::default();
    config.population.initial_bacteria = 30;
    config.population.initial_phagocytes = 10;
    let handle = SimulationHandle::with_seed(config, 4);

    for _ in 0..10 {
        handle.step();
    }
    handle
        .update_parameters_json(&serde_json::json!({
            "background_color": [10, 20, 30],
            "mutation_strength": 5.0,
            "not_a_parameter": true,
        }))
        .unwrap();

    let state = serde_json::to_value(handle.get_state()).unwrap();
    assert_eq!(state["generation"], 10);
    assert_eq!(state["environment"]["background_color"], serde_json::json!([10, 20, 30]));
    assert_eq!(state["parameters"]["mutation_strength"], 1.0);

    let stats = serde_json::to_value(handle.get_statistics()).unwrap();
    assert_eq!(stats["summary"]["generation"], 10);
    assert_eq!(stats["history"]["population_bacteria"].as_array().unwrap().len(), 10);

    handle.stop();
    handle.step();
    assert_eq!(handle.generation(), 10);
    assert_eq!(handle.state(), SimState::Stopped);
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coeva.yaml");

    let mut config = Config::default();
    config.ranking.update_frequency = 9;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    let world = World::new_with_seed(loaded, 5);
    assert_eq!(world.ranking().update_frequency(), 9);
}
