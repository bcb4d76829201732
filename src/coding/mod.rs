//! Pattern encoding: coordinates, spatio-temporal modulation, multiplexing and colorization.
//!
//! Frames are computed in `f64` and converted to the configured element type
//! exactly once, in [`FramePattern::from_f64`].

pub mod color;
pub mod encoder;
pub mod grid;
pub mod multiplex;
pub mod simulate;
pub mod types;

#[cfg(test)]
mod tests;

pub use encoder::encode;
pub use types::{EncodeOptions, FramePattern};
