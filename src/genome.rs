//! The evolvable unit: a fixed-length sequence of genes.
//!
//! The first `input_count` genes of a genome are input sinks: during
//! evaluation their buffers are overwritten with truth-table input
//! lanes and they are never treated as operations. The last
//! `output_count` genes are the output taps read during scoring. The
//! genes in between are the compute region.

use crate::algorithm::IslandAlgorithm;
use crate::bits::count_bits;
use crate::gene::{self, Gene, GeneFrame, GeneFunction};
use crate::table::TruthTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Fitness function over genome performance data. Lower is fitter.
pub type FitnessFn = fn(&GenomePerf) -> u32;

/// Performance record for one genome against one truth table.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct GenomePerf {
    /// Generations survived since the genome was last written to.
    pub genome_age: u32,
    /// Differing bits between output taps and the target, over all
    /// patterns and all outputs.
    pub bit_errors: u32,
    /// Non-input genes reached from at least one output tap.
    pub active_genes: u16,
    /// Maximum logic depth along active edges.
    pub max_gate_delays: u32,
    /// Gene count per logic function, indexed by function byte.
    pub function_counts: [u16; GeneFunction::COUNT],
}

impl GenomePerf {
    pub fn function_count(&self, function: GeneFunction) -> u16 {
        self.function_counts[function.as_byte() as usize]
    }
}

impl fmt::Display for GenomePerf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \t{} \t{} \t{}",
            self.bit_errors, self.active_genes, self.max_gate_delays, self.genome_age
        )
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<Gene>,
    perf: GenomePerf,
    perf_valid: bool,
}

impl Genome {
    /// Build a random genome of `gene_count` genes, drawing functions
    /// and feed-forward edges from the algorithm. Gene 0 keeps its
    /// default indices; it is either an input sink or an isolated seed.
    pub fn random(gene_count: u32, algorithm: &mut IslandAlgorithm) -> Self {
        let mut genes = vec![Gene::default(); gene_count as usize];
        for (i, gene) in genes.iter_mut().enumerate() {
            gene.set_function(algorithm.random_gene_function());
            if i > 0 {
                gene.set_a_index(algorithm.random_gene_input_index(i));
                gene.set_b_index(algorithm.random_gene_input_index(i));
            }
        }
        Self {
            genes,
            perf: GenomePerf::default(),
            perf_valid: false,
        }
    }

    /// Rebuild gene state from wire frames. Frame count must equal the
    /// genome length.
    pub fn from_frames(frames: &[GeneFrame]) -> Self {
        Self {
            genes: frames.iter().map(|&f| Gene::from_frame(f)).collect(),
            perf: GenomePerf::default(),
            perf_valid: false,
        }
    }

    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn frames(&self) -> Vec<GeneFrame> {
        self.genes.iter().map(|g| g.frame()).collect()
    }

    /// Overwrite all genes from received wire frames. Ages and cached
    /// performance data are reset.
    pub fn load_frames(&mut self, frames: &[GeneFrame]) {
        assert_eq!(
            frames.len(),
            self.genes.len(),
            "frame count does not match genome length"
        );
        for (gene, &frame) in self.genes.iter_mut().zip(frames) {
            *gene = Gene::from_frame(frame);
        }
        self.perf.genome_age = 0;
        self.perf_valid = false;
    }

    /// Performance data against `target`, recomputing only when the
    /// cached record has been invalidated by mutation or overwrite.
    pub fn perf_data(&mut self, target: &TruthTable) -> GenomePerf {
        if !self.perf_valid {
            self.update_perf_data(target);
        }
        self.perf
    }

    /// Score the genome: for every 64-pattern lane, clear all buffers,
    /// shadow the input sinks with the target's input lanes, evaluate
    /// each output tap, and accumulate masked bit errors. Active-gene
    /// count and gate delays are derived from the final lane's reach.
    fn update_perf_data(&mut self, target: &TruthTable) {
        target.assert_valid();
        let input_count = target.input_count() as usize;
        let output_count = target.output_count() as usize;
        assert!(
            self.genes.len() >= input_count + output_count,
            "genome of {} genes cannot host {input_count} inputs and {output_count} outputs",
            self.genes.len()
        );

        self.perf.bit_errors = 0;
        let first_tap = self.genes.len() - output_count;
        for lane in 0..target.lane_count() {
            for gene in &mut self.genes {
                gene.clear_buffer();
            }
            for j in 0..input_count {
                self.genes[j].override_buffer(target.input_lane(j as u32, lane));
            }
            let mask = target.lane_mask(lane);
            for j in 0..output_count {
                let value = gene::output(&mut self.genes, first_tap + j);
                let difference = (value ^ target.output_lane(j as u32, lane)) & mask;
                self.perf.bit_errors += count_bits(difference);
            }
        }

        self.perf.active_genes = self.genes[input_count..]
            .iter()
            .filter(|g| g.is_active())
            .count() as u16;

        self.perf.function_counts = [0; GeneFunction::COUNT];
        for gene in &self.genes {
            self.perf.function_counts[gene.function().as_byte() as usize] += 1;
        }

        self.perf.max_gate_delays = self.max_gate_delays(input_count);
        self.perf_valid = true;
    }

    /// Maximum logic depth over genes reached in the last evaluation.
    /// Input sinks sit at depth 0; every active gene is one deeper than
    /// its deepest consulted predecessor.
    fn max_gate_delays(&self, input_count: usize) -> u32 {
        let mut depths = vec![0u32; self.genes.len()];
        let mut max_depth = 0;
        for (i, gene) in self.genes.iter().enumerate() {
            if i < input_count || !gene.is_active() {
                continue;
            }
            let a_depth = depths[gene.a_index() as usize];
            let b_depth = if gene.function().uses_b() {
                depths[gene.b_index() as usize]
            } else {
                0
            };
            depths[i] = 1 + a_depth.max(b_depth);
            max_depth = max_depth.max(depths[i]);
        }
        max_depth
    }

    /// Apply the algorithm's per-generation mutation load: pick a gene
    /// in `[1, gene_count)` uniformly and alter it, `mutate_count`
    /// times over. The cached score survives unless a previously
    /// active gene was hit.
    pub fn mutate(&mut self, algorithm: &mut IslandAlgorithm) {
        for _ in 0..algorithm.mutate_count() {
            let index = algorithm.draw(1, self.genes.len() as u32 - 1) as usize;
            if self.genes[index].mutate(index, algorithm) {
                self.perf_valid = false;
            }
        }
        self.perf.genome_age = 0;
    }

    /// Bump the age counter without touching the cached score.
    pub fn increment_age(&mut self) {
        self.perf.genome_age += 1;
    }

    /// Overwrite this genome's genes from `source`. Age restarts and
    /// the cached score is dropped.
    pub fn copy_from(&mut self, source: &Genome) {
        assert_eq!(
            self.genes.len(),
            source.genes.len(),
            "cannot copy between genomes of different lengths"
        );
        self.genes.copy_from_slice(&source.genes);
        self.perf.genome_age = 0;
        self.perf_valid = false;
    }

    /// Text dump of the circuit, one gene per line.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for (i, gene) in self.genes.iter().enumerate() {
            writeln!(
                out,
                "{i}: {} {} {}",
                gene.function(),
                gene.a_index(),
                gene.b_index()
            )?;
        }
        Ok(())
    }
}
