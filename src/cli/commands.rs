// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Three subcommands: `run`, `mask` and `positions`.
//
// Reference: Rust Book section 12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::run_use_case::RunConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a Transformer and run one forward pass on random tokens
    Run(RunArgs),

    /// Print the causal target mask
    Mask(MaskArgs),

    /// Print the first rows of the sinusoidal positional table
    Positions(PositionsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of stacked encoder layers (the decoder gets the same count)
    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Width of every token vector (d_model)
    #[arg(long, default_value_t = 512)]
    pub d_model: usize,

    /// Attention heads; must divide d_model
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 2048)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 32000)]
    pub vocab_size: usize,

    /// Longest sequence the positional table covers
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 2)]
    pub batch_size: usize,

    /// Source sequence length
    #[arg(long, default_value_t = 32)]
    pub src_len: usize,

    /// Target sequence length
    #[arg(long, default_value_t = 16)]
    pub tgt_len: usize,

    /// Run on the NdArray CPU backend instead of WGPU
    #[arg(long)]
    pub cpu: bool,

    /// Save the model here, reload it and compare outputs
    #[arg(long)]
    pub checkpoint_dir: Option<String>,
}

/// The application layer never sees clap types.
impl From<RunArgs> for RunConfig {
    fn from(a: RunArgs) -> Self {
        RunConfig {
            num_layers:     a.num_layers,
            d_model:        a.d_model,
            num_heads:      a.num_heads,
            d_ff:           a.d_ff,
            vocab_size:     a.vocab_size,
            max_seq_len:    a.max_seq_len,
            dropout:        a.dropout,
            batch_size:     a.batch_size,
            src_len:        a.src_len,
            tgt_len:        a.tgt_len,
            cpu:            a.cpu,
            checkpoint_dir: a.checkpoint_dir,
        }
    }
}

#[derive(Args, Debug)]
pub struct MaskArgs {
    /// Target sequence length
    #[arg(long, default_value_t = 4)]
    pub size: usize,
}

#[derive(Args, Debug)]
pub struct PositionsArgs {
    #[arg(long, default_value_t = 8)]
    pub d_model: usize,

    #[arg(long, default_value_t = 64)]
    pub max_seq_len: usize,

    /// How many positions to print
    #[arg(long, default_value_t = 4)]
    pub rows: usize,
}
