//! Demodulation: from acquired frames back to coordinates.
//!
//! The orchestrator in [`decoder`] undoes colorization and multiplexing,
//! hands the base frames to a [`DecoderKernel`] and resolves what the kernel
//! leaves ambiguous. Kernel and spatial unwrapper are traits so that callers
//! can swap in their own numerics.

pub mod decoder;
pub mod filters;
pub mod kernel;
pub mod source;
pub mod surface;
pub mod types;
pub mod uncertainty;
pub mod unwrap;

#[cfg(test)]
mod tests;

pub use decoder::{decode, gamma_auto_correct};
pub use source::{brightfield, darkfield, source};
pub use surface::{curvature, height};
pub use kernel::{DecoderKernel, KernelInput, KernelOutput, PhaseShiftKernel};
pub use types::{DecodeOptions, DecodedField};
pub use unwrap::{QualityGuided, SpatialUnwrapper};
