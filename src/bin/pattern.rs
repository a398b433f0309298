//! Pattern generator: emit adder and multiplier truth tables in the
//! pattern-file format.

use circuit_islands::TruthTable;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pattern", about = "Generate truth-table pattern files")]
struct Args {
    /// Output pattern file.
    file: PathBuf,

    #[command(subcommand)]
    kind: PatternKind,
}

#[derive(Subcommand)]
enum PatternKind {
    /// Adder over two WIDTH-bit operands.
    Add {
        width: u32,
        /// Include a carry input and output.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        carry: bool,
    },
    /// Multiplier over two WIDTH-bit operands.
    Mul { width: u32 },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let table = match args.kind {
        PatternKind::Add { width, carry } => TruthTable::adder(width, carry),
        PatternKind::Mul { width } => TruthTable::multiplier(width),
    };

    let table = match table {
        Ok(table) => table,
        Err(error) => {
            eprintln!("pattern generation failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = table.write_to_file(&args.file) {
        eprintln!("{}: {error}", args.file.display());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
