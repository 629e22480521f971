//! Compilation passes.

mod optimize_1q;
mod swap_mapper;

pub use optimize_1q::Optimize1qGates;
pub use swap_mapper::SwapMapper;
