//! Islands: bounded genome sets evolving on a single process.
//!
//! Each island exists on every rank, but only its owner holds genomes;
//! everyone else carries a shell with the metadata needed to route
//! migration traffic. The owner is fixed by the domain decomposition
//! `domain_index % world_size`.

use crate::algorithm::IslandAlgorithm;
use crate::comm::{Communicator, FrameBuffer};
use crate::error::fatal;
use crate::genome::{FitnessFn, Genome};
use crate::table::TruthTable;
use serde::{Deserialize, Serialize};

/// One rank-map entry: a genome slot and its last computed fitness.
/// Entries order ascending by `(fitness << 32) | index`, so position 0
/// is the island's best and ties break toward lower slots.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GenomeRank {
    pub index: u32,
    pub fitness: u32,
}

/// Island-level performance summary.
#[derive(Clone, Copy, Debug)]
pub struct IslandPerf {
    pub best_genome_fitness: u32,
}

pub struct Island {
    domain_index: u32,
    owner: u32,
    process_rank: u32,
    initialised: bool,
    local: bool,
    algorithm: IslandAlgorithm,
    genomes: Vec<Genome>,
    rank_map: Vec<GenomeRank>,
}

impl Island {
    pub fn new(algorithm: IslandAlgorithm) -> Self {
        Self {
            domain_index: 0,
            owner: 0,
            process_rank: 0,
            initialised: false,
            local: false,
            algorithm,
            genomes: Vec::new(),
            rank_map: Vec::new(),
        }
    }

    /// Place the island in the world and, on its owning rank, allocate
    /// and score the initial random genomes.
    pub fn initialise<C: Communicator>(
        &mut self,
        target: &TruthTable,
        fitness: FitnessFn,
        domain_index: u32,
        comm: &C,
    ) {
        self.domain_index = domain_index;
        self.owner = domain_index % comm.world_size();
        self.process_rank = comm.rank();

        if self.owner == comm.rank() {
            let genome_length = self.algorithm.genome_length();
            self.genomes = (0..self.algorithm.genome_count())
                .map(|_| Genome::random(genome_length, &mut self.algorithm))
                .collect();
            self.rank_map = (0..self.genomes.len() as u32)
                .map(|index| GenomeRank { index, fitness: 0 })
                .collect();
            self.local = true;
            self.initialised = true;
            self.update_rank_map(target, fitness);
        } else {
            self.local = false;
            self.initialised = true;
        }
    }

    pub fn domain_index(&self) -> u32 {
        self.domain_index
    }

    /// The rank this island's genomes live on.
    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn is_local(&self) -> bool {
        self.assert_initialised("locality query on uninitialised island");
        self.local
    }

    pub fn algorithm(&self) -> &IslandAlgorithm {
        &self.algorithm
    }

    pub fn algorithm_mut(&mut self) -> &mut IslandAlgorithm {
        &mut self.algorithm
    }

    pub fn rank_map(&self) -> &[GenomeRank] {
        &self.rank_map
    }

    pub fn genomes(&self) -> &[Genome] {
        self.assert_initialised("genome access on uninitialised island");
        self.assert_local("genome access on nonlocal island");
        &self.genomes
    }

    pub fn genome_mut(&mut self, slot: usize) -> &mut Genome {
        self.assert_initialised("genome access on uninitialised island");
        self.assert_local("genome access on nonlocal island");
        &mut self.genomes[slot]
    }

    /// The genome currently ranked best.
    pub fn best_genome(&self) -> &Genome {
        self.assert_initialised("best-genome query on uninitialised island");
        self.assert_local("best-genome query on nonlocal island");
        &self.genomes[self.rank_map[0].index as usize]
    }

    /// Island summary for the global rank map. Only the owner can
    /// answer this.
    pub fn perf_data(&self) -> IslandPerf {
        self.assert_initialised("performance query on uninitialised island");
        self.assert_local("performance query on nonlocal island");
        IslandPerf {
            best_genome_fitness: self.rank_map[0].fitness,
        }
    }

    /// One generation: `select_count` tournaments, each overwriting a
    /// low-ranked genome with a mutated copy of a high-ranked one, then
    /// aging and re-ranking.
    pub fn iterate(&mut self, target: &TruthTable, fitness: FitnessFn) {
        self.assert_initialised("iteration of uninitialised island");
        for _ in 0..self.algorithm.select_count() {
            let fit_position = self.algorithm.random_high_genome() as usize;
            let unfit_position = self.algorithm.random_low_genome() as usize;
            if fit_position == unfit_position {
                continue;
            }
            let fit_slot = self.rank_map[fit_position].index as usize;
            let unfit_slot = self.rank_map[unfit_position].index as usize;
            let (source, destination) = pair_mut(&mut self.genomes, fit_slot, unfit_slot);
            destination.copy_from(source);
            destination.mutate(&mut self.algorithm);
        }
        for genome in &mut self.genomes {
            genome.increment_age();
        }
        self.update_rank_map(target, fitness);
    }

    pub fn iterate_n(&mut self, target: &TruthTable, fitness: FitnessFn, generations: u32) {
        for _ in 0..generations {
            self.iterate(target, fitness);
        }
    }

    /// Recompute every entry's fitness and restore the rank order.
    pub fn update_rank_map(&mut self, target: &TruthTable, fitness: FitnessFn) {
        for entry in &mut self.rank_map {
            let perf = self.genomes[entry.index as usize].perf_data(target);
            entry.fitness = fitness(&perf);
        }
        self.rank_map
            .sort_unstable_by_key(|e| ((e.fitness as u64) << 32) | e.index as u64);
    }

    /// Dump the rank map to stdout, one performance line per genome.
    pub fn print_rank_map(&mut self, target: &TruthTable) {
        if !self.is_local() {
            return;
        }
        println!(
            "Domain index: {} on [proc:{}]",
            self.domain_index, self.process_rank
        );
        for position in 0..self.rank_map.len() {
            let slot = self.rank_map[position].index as usize;
            let perf = self.genomes[slot].perf_data(target);
            println!("{perf}");
        }
    }

    /// Rebuild this island's genomes from a striped choice over two
    /// source islands: even slots come from `src2`, odd slots from
    /// `src1`. Runs correctly for any combination of local and remote
    /// islands; ranks not party to a given stream do nothing for it.
    ///
    /// `points` travels with the protocol but the current stripe is
    /// purely positional.
    pub fn crossover<C: Communicator>(
        islands: &mut [Island],
        destination: usize,
        src1: usize,
        src2: usize,
        points: &[u32],
        comm: &C,
    ) {
        islands[destination].assert_initialised("crossover into uninitialised island");
        let _ = points;

        let genome_count = islands[destination].algorithm.genome_count();
        let mut src1_slots = Vec::with_capacity(genome_count as usize / 2 + 1);
        let mut src2_slots = Vec::with_capacity(genome_count as usize / 2 + 1);
        for slot in 0..genome_count {
            if slot % 2 == 1 {
                src1_slots.push(slot);
            } else {
                src2_slots.push(slot);
            }
        }

        for (source, slots) in [(src1, &src1_slots), (src2, &src2_slots)] {
            if slots.is_empty() {
                continue;
            }
            if islands[source].is_local() {
                if islands[destination].is_local() {
                    if source != destination {
                        let (source_island, destination_island) =
                            pair_mut(islands, source, destination);
                        destination_island.copy_genomes(slots, source_island);
                    }
                } else {
                    let destination_owner = islands[destination].owner;
                    islands[source].export_genomes(slots, destination_owner, comm);
                }
            } else if islands[destination].is_local() {
                let source_owner = islands[source].owner;
                let source_domain = islands[source].domain_index;
                let source_length = islands[source].algorithm.genome_length();
                islands[destination].import_genomes(
                    slots,
                    source_owner,
                    source_domain,
                    source_length,
                    comm,
                );
            }
        }
    }

    /// Same-process migration: overwrite the listed slots from the
    /// matching slots of `source`.
    fn copy_genomes(&mut self, slots: &[u32], source: &Island) {
        for &slot in slots {
            self.genomes[slot as usize].copy_from(&source.genomes[slot as usize]);
        }
    }

    /// Pack the listed genomes into wire frames and send them to the
    /// destination island's owner, tagged with this island's domain
    /// index.
    fn export_genomes<C: Communicator>(&self, slots: &[u32], destination_rank: u32, comm: &C) {
        self.assert_local("genome export from nonlocal island");
        let genome_length = self.algorithm.genome_length() as usize;
        let mut buffer = FrameBuffer::new(slots.len() * genome_length);
        for &slot in slots {
            buffer.append_genome(&self.genomes[slot as usize]);
        }
        buffer.transmit(comm, destination_rank, self.domain_index);
    }

    /// Receive a matching export and parse it gene-by-gene into the
    /// listed slots.
    fn import_genomes<C: Communicator>(
        &mut self,
        slots: &[u32],
        source_rank: u32,
        source_domain: u32,
        source_length: u32,
        comm: &C,
    ) {
        self.assert_local("genome import into nonlocal island");
        let genome_length = source_length as usize;
        let mut buffer = FrameBuffer::new(slots.len() * genome_length);
        buffer.receive(comm, source_rank, source_domain);
        for (i, &slot) in slots.iter().enumerate() {
            let frames = &buffer.frames()[i * genome_length..(i + 1) * genome_length];
            self.genomes[slot as usize].load_frames(frames);
        }
    }

    fn assert_initialised(&self, message: &str) {
        if !self.initialised {
            fatal(self.process_rank, message);
        }
    }

    fn assert_local(&self, message: &str) {
        if !self.local {
            fatal(self.process_rank, message);
        }
    }
}

/// Disjoint shared/mutable borrows of two slots of one slice.
fn pair_mut<T>(slice: &mut [T], source: usize, destination: usize) -> (&T, &mut T) {
    assert_ne!(source, destination, "slot pair must be disjoint");
    if source < destination {
        let (left, right) = slice.split_at_mut(destination);
        (&left[source], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(source);
        (&right[0], &mut left[destination])
    }
}
