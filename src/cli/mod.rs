// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. This is
// the only layer that prints.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, MaskArgs, PositionsArgs, RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-transformer",
    version = "0.1.0",
    about = "Sinusoidal positional encoding and an encoder/decoder Transformer on Burn."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args)       => run_model(args),
            Commands::Mask(args)      => print_mask(args),
            Commands::Positions(args) => print_positions(args),
        }
    }
}

fn run_model(args: RunArgs) -> Result<()> {
    use crate::application::run_use_case::RunUseCase;

    let report = RunUseCase::new(args.into()).execute()?;

    println!("Output shape: {:?}", report.output_dims);
    println!("Parameters:   {}", report.num_params);
    if let Some(diff) = report.restore_diff {
        println!("Checkpoint round trip max |diff|: {:e}", diff);
    }
    Ok(())
}

fn print_mask(args: MaskArgs) -> Result<()> {
    use crate::application::inspect_use_case::mask_rows;

    for row in mask_rows(args.size)? {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>5}")).collect();
        println!("{}", cells.join(" "));
    }
    Ok(())
}

fn print_positions(args: PositionsArgs) -> Result<()> {
    use crate::application::inspect_use_case::positional_rows;

    let rows = positional_rows(args.d_model, args.max_seq_len, args.rows)?;
    for (pos, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>8.4}")).collect();
        println!("{pos:>4}: {}", cells.join(" "));
    }
    Ok(())
}
