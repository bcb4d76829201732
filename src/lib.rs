//! Phase shifting fringe pattern coding for structured light measurement.
//!
//! [`Fringes`] encodes sequences of sinusoidal fringe patterns and decodes
//! recordings of them back into per pixel coordinates. The lower level stages
//! are available on their own in [`params`], [`coding`] and [`decoding`].

#[macro_use]
mod macros;

pub mod coding;
pub mod decoding;
pub mod diagnostics;
pub mod error;
pub mod params;

mod fringes;

#[cfg(feature = "python")]
mod bindings;

pub use crate::fringes::{Fringes, Frames};
pub use coding::{EncodeOptions, FramePattern};
pub use decoding::{DecodeOptions, DecodedField, DecoderKernel, PhaseShiftKernel, QualityGuided, SpatialUnwrapper};
pub use diagnostics::{CallbackSink, DiagnosticsSink, Event, EventLog, LogSink};
pub use error::{FringesError, Result};
pub use params::{Criterion, Dtype, Grid, HueInput, Indexing, Params, PeriodsInput, Rejection, Strategy, Update, Values};
