//! The [`Fringes`] facade: one configuration plus the collaborators it runs with.

use crate::coding::{self, grid, EncodeOptions, FramePattern};
use crate::decoding::{self, DecodeOptions, DecodedField, DecoderKernel, PhaseShiftKernel, QualityGuided, SpatialUnwrapper};
use crate::diagnostics::{DiagnosticsSink, LogSink};
use crate::error::Result;
use crate::params::{Criterion, Dtype, Grid, HueInput, Indexing, Params, PeriodsInput, Rejection, Update, Values};
use ndarray::{Array3, Array4};
use std::path::Path;

#[cfg(test)]
mod tests;

/// Encoder and decoder of phase shifted fringe pattern sequences.
///
/// ```no_run
/// use fringes::{DecodeOptions, EncodeOptions, Fringes};
///
/// let mut f = Fringes::new();
/// f.set_y(100).set_x(100);
/// let frames = f.encode(&EncodeOptions::default())?;
/// let field = f.decode(&frames, DecodeOptions::default())?;
/// assert_eq!(field.registration.dim(), (2, 100, 100, 1));
/// # Ok::<(), fringes::FringesError>(())
/// ```
pub struct Fringes<'s> {
    params: Params,
    sink: Box<dyn DiagnosticsSink + 's>,
    kernel: Box<dyn DecoderKernel + 's>,
    unwrapper: Box<dyn SpatialUnwrapper + 's>,
}

impl Default for Fringes<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Fringes<'static> {
    /// Default parameters, diagnostics go to the `log` facade.
    pub fn new() -> Self {
        Self::with_sink(LogSink)
    }
}

impl<'s> Fringes<'s> {
    pub fn with_sink(sink: impl DiagnosticsSink + 's) -> Self {
        Self {
            params: Params::default(),
            sink: Box::new(sink),
            kernel: Box::new(PhaseShiftKernel),
            unwrapper: Box::new(QualityGuided),
        }
    }

    /// Replaces the demodulation kernel.
    pub fn with_kernel<'k>(self, kernel: impl DecoderKernel + 'k) -> Fringes<'k>
    where
        's: 'k,
    {
        Fringes { params: self.params, sink: self.sink, kernel: Box::new(kernel), unwrapper: self.unwrapper }
    }

    /// Replaces the spatial unwrapper used for ambiguous codings.
    pub fn with_unwrapper<'k>(self, unwrapper: impl SpatialUnwrapper + 'k) -> Fringes<'k>
    where
        's: 'k,
    {
        Fringes { params: self.params, sink: self.sink, kernel: self.kernel, unwrapper: Box::new(unwrapper) }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Applies `update` and keeps every field that could be applied.
    ///
    /// Returns the rejected fields; each was also reported to the sink.
    pub fn update(&mut self, update: &Update) -> Vec<Rejection> {
        match self.params.apply_with(update, &mut *self.sink) {
            Ok(p) => {
                self.params = p;
                Vec::new()
            }
            Err(e) => {
                self.params = e.params;
                e.rejected
            }
        }
    }

    setters!(
        set_y => y: usize,
        set_x => x: usize,
        set_d => d: usize,
        set_k => k: usize,
        set_n => n: Values<i64>,
        set_v => v: impl Into<PeriodsInput>,
        set_l => l: impl Into<PeriodsInput>,
        set_f => f: Values<f64>,
        set_h => h: impl Into<HueInput>,
        set_t => t: usize,
        set_p0 => p0: f64,
        set_gamma => gamma: f64,
        set_a => a: f64,
        set_b => b: f64,
        set_beta => beta: f64,
        set_visibility => visibility: f64,
        set_vmin => vmin: f64,
        set_umax => umax: f64,
        set_alpha => alpha: f64,
        set_lmin => lmin: f64,
        set_angle => angle: f64,
        set_axis => axis: usize,
        set_grid => grid: Grid,
        set_indexing => indexing: Indexing,
        set_dtype => dtype: Dtype,
        set_sdm => sdm: bool,
        set_wdm => wdm: bool,
        set_fdm => fdm: bool,
        set_static => static_: bool,
        set_reverse => reverse: bool,
        set_verbose => verbose: bool,
        set_criterion => criterion: Criterion,
        set_psf => psf: f64,
        set_dark => dark: f64,
        set_gain => gain: f64,
        set_y0 => y0: f64,
    );

    /// Back to the default parameters.
    pub fn reset(&mut self) {
        self.params = Params::default();
        self.sink.info("params", "reset to defaults".into());
    }

    /// Number of frames of the sequence.
    pub fn t(&self) -> usize {
        self.params.t()
    }

    pub fn len(&self) -> usize {
        self.t()
    }

    pub fn is_empty(&self) -> bool {
        self.t() == 0
    }

    /// Coordinates `(D, Y, X)` of the configured grid.
    pub fn coordinates(&self) -> Array3<f64> {
        grid::coordinates(&self.params)
    }

    pub fn encode(&mut self, opts: &EncodeOptions) -> Result<FramePattern> {
        coding::encode(&self.params, opts, &mut *self.sink)
    }

    /// Encodes the single frame `t`, taken modulo `T`.
    pub fn frame(&mut self, t: i64) -> Result<FramePattern> {
        let opts = EncodeOptions { frames: Some(vec![t]), ..EncodeOptions::default() };
        self.encode(&opts)
    }

    /// Encodes the sequence lazily, one frame per step.
    pub fn frames(&mut self) -> Frames<'_, 's> {
        let end = self.t();
        Frames { fringes: self, next: 0, end }
    }

    /// Decodes acquired frames, see [`decoding::decode`].
    pub fn decode(&mut self, frames: &FramePattern, opts: DecodeOptions) -> Result<DecodedField> {
        let opts = DecodeOptions { verbose: opts.verbose || self.params.verbose(), ..opts };
        decoding::decode(&self.params, frames, opts, &*self.kernel, &*self.unwrapper, &mut *self.sink)
    }

    /// Reorders a line scan acquisition into frames of this sequence.
    pub fn deinterlace(&self, frames: &FramePattern) -> Result<FramePattern> {
        frames.deinterlace(self.params.t())
    }

    /// Adds the camera noise of the configuration to `frames`.
    pub fn simulate(&self, frames: &FramePattern, seed: u64) -> FramePattern {
        coding::simulate::simulate(frames, &self.params, seed)
    }

    /// Source activation heatmap `(Y, X, C)` of a decoded registration.
    ///
    /// `modulation` weights every hit; `dx` is the camera pixel size on the screen.
    pub fn source(&mut self, registration: &Array4<f64>, modulation: Option<&Array4<f64>>, dx: f64) -> Result<Array3<f64>> {
        let src = decoding::source(&self.params, registration, modulation, dx)?;
        self.sink.debug("source", format!("heatmap {:?}", src.dim()));
        Ok(src)
    }

    pub fn brightfield(&self, src: &Array3<f64>, threshold: f64, k: usize) -> FramePattern {
        decoding::brightfield(&self.params, src, threshold, k)
    }

    pub fn darkfield(&self, src: &Array3<f64>, threshold: f64, k: usize) -> FramePattern {
        decoding::darkfield(&self.params, src, threshold, k)
    }

    /// Local curvature of a decoded registration, see [`decoding::curvature`].
    pub fn curvature(&self, registration: &Array4<f64>) -> Result<Array3<f64>> {
        decoding::curvature(&self.params, registration)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.params.save(path)
    }

    /// Loads the `fringes` section of a config file; rejected values keep their current setting.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.params = self.params.load(path, &mut *self.sink)?;
        Ok(())
    }

    /// Optimizes the coding for a frame budget `t` or an uncertainty target `umax`.
    pub fn optimize(&mut self, t: Option<usize>, umax: Option<f64>) -> Vec<Rejection> {
        match self.params.optimized(t, umax, &mut *self.sink) {
            Ok(p) => {
                self.params = p;
                Vec::new()
            }
            Err(e) => {
                self.params = e.params;
                e.rejected
            }
        }
    }
}

/// Lazy iterator over the frames of a sequence.
pub struct Frames<'f, 's> {
    fringes: &'f mut Fringes<'s>,
    next: usize,
    end: usize,
}

impl Iterator for Frames<'_, '_> {
    type Item = Result<FramePattern>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let t = self.next as i64;
        self.next += 1;
        Some(self.fringes.frame(t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.end - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Frames<'_, '_> {}
