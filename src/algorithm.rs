//! Evolution hyperparameters and selection distributions.
//!
//! Two levels mirror the two population tiers. An [`IslandAlgorithm`]
//! drives one island: its geometry, mutation load, feed-forward
//! bounds, and the biased genome-selection draws, all fed by a private
//! seeded generator. A [`PopulationAlgorithm`] drives the world: the
//! crossover schedule and the equivalent biased island-selection
//! draws. Independent per-island generators keep island evolution
//! reproducible under any thread schedule; the population seeds each
//! island's generator from its own during initialisation.

use crate::gene::GeneFunction;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Per-island hyperparameters and selection distributions.
#[derive(Clone, Serialize, Deserialize)]
pub struct IslandAlgorithm {
    genome_count: u32,
    genome_length: u32,
    select_count: u32,
    low_select_range: u32,
    high_select_range: u32,
    mutate_count: u32,
    min_feed_forward: u32,
    max_feed_forward: u32,
    allowable_functions: Vec<GeneFunction>,
    rng: Pcg64,
}

impl IslandAlgorithm {
    pub fn new(genome_count: u32, genome_length: u32) -> Self {
        assert!(genome_count >= 2, "island needs at least two genomes");
        assert!(
            (1..=(u16::MAX as u32 + 1)).contains(&genome_length),
            "genome length must fit 16-bit gene indices"
        );
        Self {
            genome_count,
            genome_length,
            select_count: 1,
            low_select_range: genome_count / 2,
            high_select_range: genome_count / 2,
            mutate_count: 1,
            min_feed_forward: 1,
            max_feed_forward: genome_length,
            allowable_functions: vec![
                GeneFunction::And,
                GeneFunction::Or,
                GeneFunction::Xor,
                GeneFunction::Not,
            ],
            rng: Pcg64::seed_from_u64(0),
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Pcg64::seed_from_u64(seed);
    }

    pub fn genome_count(&self) -> u32 {
        self.genome_count
    }

    pub fn genome_length(&self) -> u32 {
        self.genome_length
    }

    pub fn select_count(&self) -> u32 {
        self.select_count
    }

    pub fn set_select_count(&mut self, count: u32) {
        self.select_count = count;
    }

    pub fn mutate_count(&self) -> u32 {
        self.mutate_count
    }

    pub fn set_mutate_count(&mut self, count: u32) {
        self.mutate_count = count;
    }

    pub fn min_feed_forward(&self) -> u32 {
        self.min_feed_forward
    }

    pub fn set_min_feed_forward(&mut self, feed_forward: u32) {
        self.min_feed_forward = feed_forward;
    }

    pub fn max_feed_forward(&self) -> u32 {
        self.max_feed_forward
    }

    pub fn set_max_feed_forward(&mut self, feed_forward: u32) {
        self.max_feed_forward = feed_forward;
    }

    /// Bound the evaluation depth from below by capping how far any
    /// edge may reach back. Zero lifts the cap.
    pub fn set_min_gate_delays(&mut self, gate_delays: u32) {
        self.max_feed_forward = if gate_delays == 0 {
            self.genome_length
        } else {
            self.genome_length / gate_delays
        };
    }

    /// Bound the evaluation depth from above by forcing every edge to
    /// reach back at least `genome_length / gate_delays`.
    pub fn set_max_gate_delays(&mut self, gate_delays: u32) {
        self.min_feed_forward = self.genome_length / gate_delays;
    }

    pub fn allowable_functions(&self) -> &[GeneFunction] {
        &self.allowable_functions
    }

    pub fn set_allowable_functions(&mut self, functions: Vec<GeneFunction>) {
        assert!(!functions.is_empty(), "at least one gene function required");
        self.allowable_functions = functions;
    }

    /// Uniform draw in `[min, max]` from the island's generator.
    pub fn draw(&mut self, min: u32, max: u32) -> u32 {
        self.rng.random_range(min..=max)
    }

    /// Rank-map position biased toward 0, the fittest end: a uniform
    /// draw in `[0, high_select_range)` re-drawn twice in `[0, r]`.
    pub fn random_high_genome(&mut self) -> u32 {
        let mut r = self.draw(0, self.high_select_range - 1);
        for _ in 0..2 {
            r = self.draw(0, r);
        }
        r
    }

    /// Rank-map position biased toward the unfit end, mirroring
    /// [`random_high_genome`](Self::random_high_genome) onto the top of
    /// the rank map.
    pub fn random_low_genome(&mut self) -> u32 {
        let mut r = self.draw(0, self.low_select_range - 1);
        for _ in 0..2 {
            r = self.draw(0, r);
        }
        (self.genome_count - 1) - r
    }

    /// Predecessor index for the gene at position `i`, drawn uniformly
    /// from the feed-forward window `[i - max, i - min]` clamped into
    /// `[0, i - 1]`. The upper clamp keeps the graph acyclic.
    pub fn random_gene_input_index(&mut self, i: usize) -> u16 {
        let i = i as i64;
        let mut range_start = i - self.max_feed_forward as i64;
        let mut range_end = i - self.min_feed_forward as i64;
        if range_start < 0 {
            range_end -= range_start;
            range_start = 0;
        }
        if range_end >= i {
            range_end = i - 1;
        }
        self.draw(range_start as u32, range_end as u32) as u16
    }

    /// Uniform draw from the allowable function set.
    pub fn random_gene_function(&mut self) -> GeneFunction {
        let index = self.draw(0, self.allowable_functions.len() as u32 - 1);
        self.allowable_functions[index as usize]
    }
}

/// World-level hyperparameters and island-selection distributions.
#[derive(Clone, Serialize, Deserialize)]
pub struct PopulationAlgorithm {
    select_count: u32,
    crossover_count: u32,
    low_select_range: u32,
    high_select_range: u32,
    generations_per_cycle: u32,
    island_count: u32,
    island_algorithm: IslandAlgorithm,
    rng: Pcg64,
}

impl PopulationAlgorithm {
    pub fn new(island_count: u32, genome_count: u32, genome_length: u32) -> Self {
        assert!(island_count > 0, "population must hold at least one island");
        Self {
            select_count: 1,
            crossover_count: 4,
            low_select_range: island_count / 2,
            high_select_range: island_count / 2,
            generations_per_cycle: 65536,
            island_count,
            island_algorithm: IslandAlgorithm::new(genome_count, genome_length),
            rng: Pcg64::seed_from_u64(1),
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Pcg64::seed_from_u64(seed);
    }

    pub fn island_count(&self) -> u32 {
        self.island_count
    }

    pub fn island_algorithm(&self) -> &IslandAlgorithm {
        &self.island_algorithm
    }

    pub fn island_algorithm_mut(&mut self) -> &mut IslandAlgorithm {
        &mut self.island_algorithm
    }

    pub fn generations_per_cycle(&self) -> u32 {
        self.generations_per_cycle
    }

    pub fn set_generations_per_cycle(&mut self, generations: u32) {
        self.generations_per_cycle = generations;
    }

    pub fn select_count(&self) -> u32 {
        self.select_count
    }

    pub fn set_select_count(&mut self, count: u32) {
        self.select_count = count;
    }

    pub fn crossover_count(&self) -> u32 {
        self.crossover_count
    }

    pub fn set_crossover_count(&mut self, count: u32) {
        self.crossover_count = count;
    }

    /// Uniform draw in `[min, max]` from the population generator.
    pub fn draw(&mut self, min: u32, max: u32) -> u32 {
        self.rng.random_range(min..=max)
    }

    /// Global rank-map position biased toward the fittest island.
    pub fn random_high_subpopulation(&mut self) -> u32 {
        let mut r = self.draw(0, self.high_select_range - 1);
        for _ in 0..2 {
            r = self.draw(0, r);
        }
        r
    }

    /// Global rank-map position biased toward the least fit island.
    pub fn random_low_subpopulation(&mut self) -> u32 {
        let mut r = self.draw(0, self.low_select_range - 1);
        for _ in 0..2 {
            r = self.draw(0, r);
        }
        (self.island_count - 1) - r
    }

    /// Candidate crossover points handed through the migration
    /// protocol, `crossover_count` uniform draws.
    pub fn random_crossover_points(&mut self) -> Vec<u32> {
        (0..self.crossover_count)
            .map(|_| self.draw(0, self.island_count - 1))
            .collect()
    }
}
