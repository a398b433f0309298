//! Island-model Cartesian Genetic Programming for boolean circuits.
//!
//! A population of fixed-length feed-forward logic circuits is
//! partitioned into islands distributed across process ranks. Each
//! island evolves semi-independently under tournament
//! mutation/selection; islands periodically exchange genomes through a
//! striped crossover protocol, and a global fitness ranking is kept
//! consistent everywhere by a collective all-gather.
//!
//! Circuits are scored against a [`TruthTable`] with a bit-parallel
//! evaluator: one `u64` lane carries a gene's output for 64 input
//! patterns at once, and lazy recursive evaluation touches only the
//! genes actually reached from the output taps.
//!
//! ```
//! use circuit_islands::{GenomePerf, Population, SoloWorld, TruthTable};
//!
//! fn fitness(perf: &GenomePerf) -> u32 {
//!     perf.bit_errors
//! }
//!
//! let table = TruthTable::parse(
//!     "iCount 2; oCount 1; radix 2; pattern 00:0, 01:1, 10:1, 11:0;",
//! )
//! .unwrap();
//!
//! // Two islands of four 16-gene circuits, all on this process.
//! let mut population = Population::new(2, 4, 16, SoloWorld);
//! population.algorithm_mut().set_generations_per_cycle(8);
//! population.initialise(&table, fitness);
//! population.iterate(&table, fitness);
//!
//! let best = population.rank_map()[0];
//! assert!(best.fitness <= table.pattern_count());
//! ```
//!
//! Multi-rank deployments implement the same loop SPMD-style: every
//! rank builds the population from the same seed and the
//! [`Communicator`] carries migration and synchronisation traffic.
//! [`comm::ThreadWorld`] provides an in-process world with identical
//! semantics.

pub mod algorithm;
pub mod bits;
pub mod comm;
pub mod error;
pub mod gene;
pub mod genome;
pub mod island;
pub mod population;
pub mod table;

pub use algorithm::{IslandAlgorithm, PopulationAlgorithm};
pub use bits::BitVector;
pub use comm::{Communicator, FrameBuffer, SoloWorld, ThreadWorld};
pub use gene::{Gene, GeneFrame, GeneFunction};
pub use genome::{FitnessFn, Genome, GenomePerf};
pub use island::{GenomeRank, Island, IslandPerf};
pub use population::{IslandRank, Population};
pub use table::{TableError, TruthTable};
