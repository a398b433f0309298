//! The whole domain: every island across every rank.
//!
//! A population is an SPMD object; each rank constructs the same
//! island set from the same seeds and holds genomes only for the
//! islands it owns. One cycle is: a run of inter-island crossover
//! events (world-serialised by a barrier apiece), a burst of
//! independent within-island generations across all local islands, and
//! a collective resynchronisation of the global rank map.

use crate::algorithm::PopulationAlgorithm;
use crate::comm::{Communicator, FrameBuffer};
use crate::error::fatal;
use crate::genome::{FitnessFn, Genome};
use crate::island::Island;
use crate::table::TruthTable;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One global rank-map entry: an island's position in the island vec
/// and its owner-reported best fitness. The global order ascends by
/// `(fitness << 32) | domain_index`, keyed on the stable domain index
/// rather than the slot, so ties resolve identically on every rank.
#[derive(Clone, Copy, Debug)]
pub struct IslandRank {
    pub island: u32,
    pub fitness: u32,
}

pub struct Population<C: Communicator> {
    algorithm: PopulationAlgorithm,
    comm: C,
    initialised: bool,
    islands: Vec<Island>,
    rank_map: Vec<IslandRank>,
    islands_per_process: Vec<u32>,
}

impl<C: Communicator> Population<C> {
    pub fn new(island_count: u32, genome_count: u32, genome_length: u32, comm: C) -> Self {
        Self {
            algorithm: PopulationAlgorithm::new(island_count, genome_count, genome_length),
            comm,
            initialised: false,
            islands: Vec::new(),
            rank_map: Vec::new(),
            islands_per_process: Vec::new(),
        }
    }

    pub fn algorithm(&self) -> &PopulationAlgorithm {
        &self.algorithm
    }

    pub fn algorithm_mut(&mut self) -> &mut PopulationAlgorithm {
        &mut self.algorithm
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    pub fn island(&self, domain_index: u32) -> &Island {
        &self.islands[domain_index as usize]
    }

    pub fn rank_map(&self) -> &[IslandRank] {
        &self.rank_map
    }

    /// Build and score every island. Each island's generator is seeded
    /// from the population generator, so the whole world derives from
    /// one seed; ownership falls out of the domain decomposition.
    pub fn initialise(&mut self, target: &TruthTable, fitness: FitnessFn) {
        let island_count = self.algorithm.island_count();
        self.islands = Vec::with_capacity(island_count as usize);
        for domain_index in 0..island_count {
            let mut island_algorithm = self.algorithm.island_algorithm().clone();
            let seed = self.algorithm.draw(0, (1 << 30) - 1);
            island_algorithm.set_seed(seed as u64);
            let mut island = Island::new(island_algorithm);
            island.initialise(target, fitness, domain_index, &self.comm);
            self.islands.push(island);
        }

        self.islands_per_process = (0..self.comm.world_size())
            .map(|rank| {
                self.islands
                    .iter()
                    .filter(|island| island.owner() == rank)
                    .count() as u32
            })
            .collect();

        self.rank_map = (0..island_count)
            .map(|island| IslandRank { island, fitness: 0 })
            .collect();
        self.initialised = true;
        self.update_rank_map();
    }

    /// One cycle: crossover events, local generations, global rank
    /// sync.
    pub fn iterate(&mut self, target: &TruthTable, fitness: FitnessFn) {
        self.assert_initialised("iteration of uninitialised population");
        self.crossover_events(target, fitness);
        self.iterate_islands(target, fitness, self.algorithm.generations_per_cycle());
        self.update_rank_map();
    }

    /// Run `cycles` cycles, dumping the best island's rank map after
    /// each.
    pub fn iterate_n(&mut self, target: &TruthTable, fitness: FitnessFn, cycles: u32) {
        for _ in 0..cycles {
            self.iterate(target, fitness);
            let best = self.rank_map[0].island as usize;
            self.islands[best].print_rank_map(target);
        }
    }

    /// Draw two high-ranked source islands and one low-ranked
    /// destination from the global rank map and rebuild the
    /// destination from the sources, `select_count` times over. Every
    /// rank makes the same draws; a world barrier closes each event.
    fn crossover_events(&mut self, target: &TruthTable, fitness: FitnessFn) {
        if self.islands.len() < 2 {
            return;
        }
        for _ in 0..self.algorithm.select_count() {
            let high1 = self.algorithm.random_high_subpopulation() as usize;
            let high2 = self.algorithm.random_high_subpopulation() as usize;
            let low = self.algorithm.random_low_subpopulation() as usize;

            let src1 = self.rank_map[high1].island as usize;
            let src2 = self.rank_map[high2].island as usize;
            let destination = self.rank_map[low].island as usize;
            let points = self.algorithm.random_crossover_points();

            Island::crossover(
                &mut self.islands,
                destination,
                src1,
                src2,
                &points,
                &self.comm,
            );
            self.islands[destination].update_rank_map(target, fitness);
            self.comm.barrier();
        }
    }

    /// The embarrassingly parallel phase: every local island runs
    /// `generations` independent generations. Islands are disjoint, so
    /// one worker per island needs no coordination.
    fn iterate_islands(&mut self, target: &TruthTable, fitness: FitnessFn, generations: u32) {
        #[cfg(feature = "parallel")]
        self.islands
            .par_iter_mut()
            .filter(|island| island.is_local())
            .for_each(|island| island.iterate_n(target, fitness, generations));

        #[cfg(not(feature = "parallel"))]
        for island in self.islands.iter_mut().filter(|island| island.is_local()) {
            island.iterate_n(target, fitness, generations);
        }
    }

    /// Pack `(domain_index, best_fitness)` pairs for every local
    /// island, in island order.
    fn rank_map_tx_buffer(&self) -> Vec<u32> {
        let mut buffer = Vec::with_capacity(self.local_island_count() as usize * 2);
        for island in self.islands.iter().filter(|island| island.is_local()) {
            buffer.push(island.domain_index());
            buffer.push(island.perf_data().best_genome_fitness);
        }
        buffer
    }

    /// Rebuild the global rank map from gathered pairs.
    fn parse_rank_map_rx_buffer(&mut self, gathered: &[u32]) {
        for (entry, pair) in self.rank_map.iter_mut().zip(gathered.chunks_exact(2)) {
            *entry = IslandRank {
                island: pair[0],
                fitness: pair[1],
            };
        }
    }

    /// Collective rank-map exchange: every rank contributes its local
    /// pairs and receives the full set.
    fn synchronise_rank_map(&mut self) {
        let tx_buffer = self.rank_map_tx_buffer();
        let gathered = self.comm.all_gather_v(&tx_buffer);
        if gathered.len() != self.islands.len() * 2 {
            fatal(
                self.comm.rank(),
                format!(
                    "rank-map sync produced {} pairs for {} islands",
                    gathered.len() / 2,
                    self.islands.len()
                ),
            );
        }
        self.parse_rank_map_rx_buffer(&gathered);
    }

    fn update_rank_map(&mut self) {
        self.synchronise_rank_map();
        let islands = &self.islands;
        self.rank_map.sort_unstable_by_key(|entry| {
            ((entry.fitness as u64) << 32) | islands[entry.island as usize].domain_index() as u64
        });
    }

    fn local_island_count(&self) -> u32 {
        self.islands_per_process[self.comm.rank() as usize]
    }

    fn assert_initialised(&self, message: &str) {
        if !self.initialised {
            fatal(self.comm.rank(), message);
        }
    }

    /// Serialised rank-map print across the world, one rank at a time.
    pub fn print_rank_map(&self) {
        for rank in 0..self.comm.world_size() {
            if rank == self.comm.rank() {
                println!("[proc:{rank}]");
                for (position, entry) in self.rank_map.iter().enumerate() {
                    println!(
                        "Ranking: {position} Index: {} Fitness: {}",
                        self.islands[entry.island as usize].domain_index(),
                        entry.fitness
                    );
                }
                println!();
            }
            self.comm.barrier();
        }
    }

    /// Write the globally best genome to `path` on rank 0. The best
    /// island's owner ships the genome's wire frames over; on a
    /// single-process world this is a local write.
    pub fn write_best_genome(&mut self, path: &Path) -> std::io::Result<()> {
        self.assert_initialised("best-genome write on uninitialised population");
        let best = self.rank_map[0].island as usize;
        let owner = self.islands[best].owner();
        let domain = self.islands[best].domain_index();
        let genome_length = self.islands[best].algorithm().genome_length() as usize;

        if owner == 0 {
            if self.comm.rank() == 0 {
                self.islands[best].best_genome().write_to_file(path)?;
            }
        } else if self.comm.rank() == owner {
            let mut buffer = FrameBuffer::new(genome_length);
            buffer.append_genome(self.islands[best].best_genome());
            buffer.transmit(&self.comm, 0, domain);
        } else if self.comm.rank() == 0 {
            let mut buffer = FrameBuffer::new(genome_length);
            buffer.receive(&self.comm, owner, domain);
            let genome = Genome::from_frames(buffer.frames());
            genome.write_to_file(path)?;
        }
        Ok(())
    }
}
