//! Evolution driver: load a pattern file, evolve circuits toward it,
//! write the best solution out.

use circuit_islands::{GeneFunction, GenomePerf, Population, SoloWorld, TruthTable};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "evolve", about = "Evolve boolean circuits toward a truth table")]
struct Args {
    /// Number of islands in the population.
    #[arg(long = "subpopcount", default_value_t = 8)]
    subpop_count: u32,

    /// Genomes per island.
    #[arg(long = "subpopsize", default_value_t = 4)]
    subpop_size: u32,

    /// Genes per genome.
    #[arg(long = "genomesize", default_value_t = 1024)]
    genome_size: u32,

    /// Total generation budget across the whole population.
    #[arg(long = "totalgenerations", default_value_t = 262_144)]
    total_generations: u32,

    /// Within-island generations per synchronisation cycle.
    #[arg(long = "generationspercycle", default_value_t = 1024)]
    generations_per_cycle: u32,

    /// Truth-table pattern file.
    #[arg(long = "patternfile", default_value = "target.pat")]
    pattern_file: PathBuf,

    /// Worker threads for the island-iteration phase.
    #[arg(long = "threadcount", default_value_t = 2)]
    thread_count: usize,
}

/// Composite fitness: bit errors dominate, then circuit size, then
/// age. Size only differentiates genomes that already match the
/// target; everything else pays a flat penalty.
fn circuit_fitness(perf: &GenomePerf) -> u32 {
    let effective_active_genes = if perf.bit_errors > 0 {
        1024
    } else {
        perf.active_genes as u32
    };
    (perf.bit_errors << 6) + (effective_active_genes << 3) + perf.genome_age
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    #[cfg(feature = "parallel")]
    if let Err(error) = rayon::ThreadPoolBuilder::new()
        .num_threads(args.thread_count)
        .build_global()
    {
        tracing::warn!("could not size the worker pool: {error}");
    }

    let target = match TruthTable::from_file(&args.pattern_file) {
        Ok(table) => table,
        Err(error) => {
            eprintln!("{}: {error}", args.pattern_file.display());
            return ExitCode::FAILURE;
        }
    };

    let generations_per_island = args.total_generations / args.subpop_count;
    let cycle_count = generations_per_island / args.generations_per_cycle;

    println!("[GENERATION CONFIG]");
    println!("Total generations: {}", args.total_generations);
    println!("Generations per island: {generations_per_island}");
    println!("Generations per cycle: {}", args.generations_per_cycle);
    println!("Cycle count: {cycle_count}");
    println!();
    println!("[POPULATION LAYOUT]");
    println!("Island count: {}", args.subpop_count);
    println!("Genomes per island: {}", args.subpop_size);
    println!("Genome length: {}", args.genome_size);
    println!();

    let mut population = Population::new(
        args.subpop_count,
        args.subpop_size,
        args.genome_size,
        SoloWorld,
    );
    population
        .algorithm_mut()
        .set_generations_per_cycle(args.generations_per_cycle);
    population.algorithm_mut().set_seed(1);
    population.algorithm_mut().set_crossover_count(3);
    population.algorithm_mut().set_select_count(1);

    let island_algorithm = population.algorithm_mut().island_algorithm_mut();
    island_algorithm.set_mutate_count(1);
    island_algorithm.set_allowable_functions(vec![
        GeneFunction::And,
        GeneFunction::Or,
        GeneFunction::Xor,
    ]);

    population.initialise(&target, circuit_fitness);

    let start = Instant::now();
    population.iterate_n(&target, circuit_fitness, cycle_count);
    let elapsed = start.elapsed();

    println!();
    println!("Total execution time: {:.3}s", elapsed.as_secs_f64());
    info!(cycles = cycle_count, ?elapsed, "evolution complete");

    let output_path = PathBuf::from("outputGenome.op");
    if let Err(error) = population.write_best_genome(&output_path) {
        eprintln!("{}: {error}", output_path.display());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
