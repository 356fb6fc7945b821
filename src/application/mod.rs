// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the model layer for the CLI. No tensor math
// here and no printing (that's Layer 1).
//
// Reference: Clean Architecture pattern

/// Build, run and optionally checkpoint a Transformer
pub mod run_use_case;

/// Causal mask and positional table views
pub mod inspect_use_case;
