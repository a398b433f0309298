use circuit_islands::{
    GeneFunction, GenomePerf, Island, IslandAlgorithm, SoloWorld, ThreadWorld, TruthTable,
};

// --- Shared fixtures ---

fn xor_table() -> TruthTable {
    TruthTable::parse("iCount 2; oCount 1; radix 2; pattern 00:0, 01:1, 10:1, 11:0;")
        .expect("xor table parses")
}

fn bit_error_fitness(perf: &GenomePerf) -> u32 {
    perf.bit_errors
}

fn constant_fitness(_perf: &GenomePerf) -> u32 {
    7
}

fn local_island(genome_count: u32, genome_length: u32, seed: u64) -> (Island, TruthTable) {
    let table = xor_table();
    let mut algorithm = IslandAlgorithm::new(genome_count, genome_length);
    algorithm.set_seed(seed);
    let mut island = Island::new(algorithm);
    island.initialise(&table, bit_error_fitness, 0, &SoloWorld);
    (island, table)
}

#[test]
fn rank_map_orders_by_fitness_then_slot() {
    let (mut island, table) = local_island(8, 16, 2);
    island.iterate_n(&table, bit_error_fitness, 5);

    let rank_map = island.rank_map();
    for pair in rank_map.windows(2) {
        let key = |e: &circuit_islands::GenomeRank| ((e.fitness as u64) << 32) | e.index as u64;
        assert!(key(&pair[0]) <= key(&pair[1]));
    }
    assert_eq!(
        island.perf_data().best_genome_fitness,
        rank_map[0].fitness
    );
}

#[test]
fn tied_fitness_ranks_by_slot_index() {
    let table = xor_table();
    let mut algorithm = IslandAlgorithm::new(4, 16);
    algorithm.set_seed(4);
    let mut island = Island::new(algorithm);
    island.initialise(&table, constant_fitness, 0, &SoloWorld);

    let indices: Vec<u32> = island.rank_map().iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn xor_target_is_solved_within_a_hundred_generations() {
    let table = xor_table();
    let mut algorithm = IslandAlgorithm::new(4, 16);
    algorithm.set_seed(1);
    algorithm.set_allowable_functions(vec![GeneFunction::Xor]);
    let mut island = Island::new(algorithm);
    island.initialise(&table, bit_error_fitness, 0, &SoloWorld);

    let mut solved = island.perf_data().best_genome_fitness == 0;
    for _ in 0..100 {
        if solved {
            break;
        }
        island.iterate(&table, bit_error_fitness);
        solved = island.perf_data().best_genome_fitness == 0;
    }
    assert!(solved, "no zero-error circuit after 100 generations");
}

#[test]
fn generations_age_the_untouched_genomes() {
    let (mut island, table) = local_island(4, 16, 6);
    island.iterate_n(&table, bit_error_fitness, 3);

    // Tournament writes reset ages, so the oldest genome bounds the
    // generation count and at least one survivor must have aged.
    let ages: Vec<u32> = (0..4)
        .map(|slot| island.genome_mut(slot).perf_data(&table).genome_age)
        .collect();
    assert!(ages.iter().all(|&age| age <= 3));
    assert!(ages.iter().any(|&age| age > 0));
}

#[test]
fn biased_selection_stays_in_each_half() {
    let mut algorithm = IslandAlgorithm::new(8, 16);
    algorithm.set_seed(12);
    for _ in 0..500 {
        let high = algorithm.random_high_genome();
        let low = algorithm.random_low_genome();
        assert!(high < 4, "high draw {high} left the fit half");
        assert!((4..8).contains(&low), "low draw {low} left the unfit half");
    }
}

#[test]
fn feed_forward_clamp_spans_the_full_prefix() {
    // With the window reaching past gene 0, draws cover [0, i - 1].
    let mut algorithm = IslandAlgorithm::new(4, 16);
    algorithm.set_seed(13);
    assert_eq!(algorithm.max_feed_forward(), 16);

    let i = 5;
    let mut seen = [false; 5];
    for _ in 0..500 {
        let index = algorithm.random_gene_input_index(i) as usize;
        assert!(index < i, "draw {index} not strictly backward");
        seen[index] = true;
    }
    assert!(seen.iter().all(|&hit| hit), "draws missed part of [0, 4]");
}

#[test]
fn feed_forward_window_honours_both_bounds() {
    let mut algorithm = IslandAlgorithm::new(4, 64);
    algorithm.set_seed(14);
    algorithm.set_min_feed_forward(2);
    algorithm.set_max_feed_forward(8);

    let i = 32;
    for _ in 0..500 {
        let index = algorithm.random_gene_input_index(i) as usize;
        assert!((i - 8..=i - 2).contains(&index), "draw {index} outside window");
    }
}

#[test]
fn shell_islands_carry_metadata_only() {
    let table = xor_table();
    // Rank 1's view of an island owned by rank 0.
    let mut endpoints = ThreadWorld::create(2);
    let remote = endpoints.remove(1);

    let mut algorithm = IslandAlgorithm::new(4, 16);
    algorithm.set_seed(15);
    let mut island = Island::new(algorithm);
    island.initialise(&table, bit_error_fitness, 0, &remote);

    assert!(!island.is_local());
    assert_eq!(island.owner(), 0);
    assert_eq!(island.domain_index(), 0);
    assert!(island.rank_map().is_empty());
    // Re-ranking an empty shell is a no-op, not an error.
    island.update_rank_map(&table, bit_error_fitness);
}
