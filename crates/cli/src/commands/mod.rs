//! CLI command implementations

pub mod collect;
pub mod costs;
pub mod synth;
