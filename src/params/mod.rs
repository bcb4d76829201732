//! Coding parameters.
//!
//! [`Params`] is one aggregate value. It is only changed through
//! [`Params::apply`], which takes a partial [`Update`], runs every field through
//! its clamp/cascade rules in a fixed order and checks the invariants once at
//! the end. Derived quantities (`T`, `L`, `UMR`, ...) are computed on access.

pub mod frames;
pub mod hues;
pub mod limits;
pub mod noise;
pub mod optimize;
pub mod periods;
pub mod persist;
pub mod types;
pub mod umr;
pub mod update;

#[cfg(test)]
mod tests;

pub use types::{Criterion, Dtype, Grid, HueInput, Indexing, Periods, PeriodsInput, Strategy, Values};
pub use update::{Rejection, RejectedFields, Update};

use ndarray::{arr2, Array1, Array2, ArrayView2};
use std::f64::consts::PI;
use umr::{Memo, UmrKey};

#[derive(Debug, Clone)]
pub struct Params {
    pub(crate) y: usize,
    pub(crate) x: usize,
    pub(crate) n: Array2<usize>,
    pub(crate) periods: Periods,
    pub(crate) f: Array2<f64>,
    pub(crate) h: Array2<u8>,
    pub(crate) p0: f64,
    pub(crate) gamma: f64,
    pub(crate) beta: f64,
    pub(crate) visibility: f64,
    pub(crate) vmin: f64,
    pub(crate) umax: f64,
    pub(crate) alpha: f64,
    pub(crate) lmin: f64,
    pub(crate) angle: f64,
    pub(crate) axis: usize,
    pub(crate) grid: Grid,
    pub(crate) indexing: Indexing,
    pub(crate) dtype: Dtype,
    pub(crate) sdm: bool,
    pub(crate) wdm: bool,
    pub(crate) fdm: bool,
    pub(crate) static_: bool,
    pub(crate) reverse: bool,
    pub(crate) verbose: bool,
    pub(crate) criterion: Criterion,
    pub(crate) psf: f64,
    pub(crate) dark: f64,
    pub(crate) gain: f64,
    pub(crate) y0: f64,
    umr_memo: Memo<UmrKey, Array1<f64>>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            y: 1200,
            x: 1920,
            n: Array2::from_elem((2, 3), 4),
            periods: Periods::Frequencies(arr2(&[[13.0, 7.0, 89.0], [13.0, 7.0, 89.0]])),
            f: Array2::ones((2, 3)),
            h: arr2(&[[255, 255, 255]]),
            p0: PI,
            gamma: 1.0,
            beta: 0.5,
            visibility: 1.0,
            vmin: 0.0,
            umax: 0.5,
            alpha: 1.0,
            lmin: 8.0,
            angle: 0.0,
            axis: 0,
            grid: Grid::Image,
            indexing: Indexing::Xy,
            dtype: Dtype::U8,
            sdm: false,
            wdm: false,
            fdm: false,
            static_: false,
            reverse: false,
            verbose: false,
            criterion: Criterion::InverseVariance,
            psf: 0.0,
            dark: 0.0,
            gain: 0.0,
            y0: 0.0,
            umr_memo: Memo::default(),
        }
    }
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn x(&self) -> usize {
        self.x
    }

    /// Number of directions.
    pub fn d(&self) -> usize {
        self.n.nrows()
    }

    /// Number of sets per direction.
    pub fn k(&self) -> usize {
        self.n.ncols()
    }

    pub fn n(&self) -> ArrayView2<'_, usize> {
        self.n.view()
    }

    /// Spatial frequencies, i.e. number of periods across the coding length.
    pub fn v(&self) -> Array2<f64> {
        self.periods.frequencies(self.length())
    }

    /// Wavelengths in px.
    pub fn l(&self) -> Array2<f64> {
        self.periods.wavelengths(self.length())
    }

    pub fn periods(&self) -> &Periods {
        &self.periods
    }

    /// Temporal frequencies.
    pub fn f(&self) -> ArrayView2<'_, f64> {
        self.f.view()
    }

    /// Temporal frequencies with the shift direction applied.
    pub fn f_signed(&self) -> Array2<f64> {
        if self.reverse {
            -&self.f
        } else {
            self.f.clone()
        }
    }

    pub fn hues(&self) -> ArrayView2<'_, u8> {
        self.h.view()
    }

    /// Number of hues.
    pub fn h(&self) -> usize {
        self.h.nrows()
    }

    /// Averaging factor.
    pub fn m(&self) -> f64 {
        hues::averaging(self.h.view())
    }

    pub fn is_monochrome(&self) -> bool {
        hues::is_monochrome(self.h.view())
    }

    /// Number of color channels.
    pub fn c(&self) -> usize {
        if self.wdm || !self.is_monochrome() {
            3
        } else {
            1
        }
    }

    /// Number of frames.
    pub fn t(&self) -> usize {
        frames::frame_count(self.h(), self.n.view(), self.sdm, self.wdm, self.fdm)
    }

    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (self.t(), self.y, self.x, self.c())
    }

    pub fn size(&self) -> usize {
        let (t, y, x, c) = self.shape();
        t * y * x * c
    }

    pub fn nbytes(&self) -> usize {
        self.size() * self.dtype.nbytes()
    }

    /// Pattern extent along each coded direction.
    pub fn r(&self) -> Vec<usize> {
        let r = match self.indexing {
            Indexing::Xy => [self.x, self.y],
            Indexing::Ij => [self.y, self.x],
        };
        if self.d() == 1 {
            vec![r[self.axis.min(1)]]
        } else {
            r.to_vec()
        }
    }

    fn r_max(&self) -> f64 {
        self.r().into_iter().max().unwrap_or(1) as f64
    }

    /// Coding length.
    pub fn length(&self) -> f64 {
        self.r_max() * self.alpha
    }

    /// Coordinate offset extending the coding range beyond the pattern border.
    pub fn x0(&self) -> f64 {
        self.r_max() * (self.alpha - 1.0) / 2.0
    }

    pub fn imax(&self) -> f64 {
        self.dtype.imax()
    }

    /// Bias.
    pub fn a(&self) -> f64 {
        self.imax() * self.beta
    }

    /// Amplitude.
    pub fn b(&self) -> f64 {
        self.a() * self.visibility
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn visibility(&self) -> f64 {
        self.visibility
    }

    /// Largest visibility the active multiplexing leaves room for.
    pub fn visibility_max(&self) -> f64 {
        if self.fdm {
            1.0 / (self.d() * self.k()) as f64
        } else if self.sdm {
            1.0 / self.d() as f64
        } else {
            1.0
        }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn p0(&self) -> f64 {
        self.p0
    }

    pub fn vmin(&self) -> f64 {
        self.vmin
    }

    pub fn umax(&self) -> f64 {
        self.umax
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn lmin(&self) -> f64 {
        self.lmin
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn indexing(&self) -> Indexing {
        self.indexing
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn sdm(&self) -> bool {
        self.sdm
    }

    pub fn wdm(&self) -> bool {
        self.wdm
    }

    pub fn fdm(&self) -> bool {
        self.fdm
    }

    pub fn is_static(&self) -> bool {
        self.static_
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn psf(&self) -> f64 {
        self.psf
    }

    pub fn dark(&self) -> f64 {
        self.dark
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    /// Smallest admissible number of shifts per set.
    pub fn n_min(&self) -> usize {
        if self.fdm {
            let fmax = self.f.iter().fold(0.0f64, |m, f| m.max(f.abs()));
            (2.0 * fmax + 1.0).ceil() as usize
        } else {
            limits::N_MIN
        }
    }

    /// Largest temporal frequency.
    pub fn f_max(&self) -> f64 {
        if self.fdm {
            let fmax = (limits::N_MAX - 1) as f64 / 2.0;
            if self.static_ {
                fmax.min(self.vmax())
            } else {
                fmax
            }
        } else {
            (limits::N_MIN - 1) as f64 / 2.0
        }
    }

    /// Largest resolvable spatial frequency.
    pub fn vmax(&self) -> f64 {
        self.length() / self.lmin
    }

    /// Spatial frequency with minimal decoding uncertainty.
    pub fn vopt(&self) -> f64 {
        if self.psf > 0.0 {
            self.vmax() / 2.0
        } else {
            self.vmax().floor()
        }
    }

    pub fn lopt(&self) -> f64 {
        self.length() / self.vopt()
    }

    /// Relative modulation left at spatial frequency `v`.
    pub fn mtf(&self, v: f64) -> f64 {
        if self.psf > 0.0 {
            (1.0 - v / (self.length() / (self.lmin - 1.0))).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn umr_key(&self) -> UmrKey {
        let (wavelengths, values) = match &self.periods {
            Periods::Frequencies(v) => (false, v),
            Periods::Wavelengths(l) => (true, l),
        };
        UmrKey {
            wavelengths,
            periods: values.iter().map(|x| x.to_bits()).collect(),
            shape: values.dim(),
            n: self.n.iter().copied().collect(),
            length: self.length().to_bits(),
        }
    }

    /// Unambiguous measurement range per direction.
    pub fn umr(&self) -> Array1<f64> {
        self.umr_memo.get_or_compute(self.umr_key(), || {
            umr::umr(self.l().view(), self.v().view(), self.n.view(), self.length())
        })
    }

    pub(crate) fn umr_is_cached(&self) -> bool {
        self.umr_memo.is_cached(&self.umr_key())
    }

    /// Per direction: the coded range exceeds the unambiguous range.
    pub fn ambiguous_directions(&self) -> Vec<bool> {
        let umr = self.umr();
        self.r()
            .iter()
            .zip(umr.iter())
            .map(|(&r, &u)| u < r as f64 * self.alpha)
            .collect()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous_directions().into_iter().any(|a| a)
    }

    /// Coding efficiency.
    pub fn eta(&self) -> Array1<f64> {
        let umr = self.umr();
        Array1::from_iter(self.r().iter().zip(umr.iter()).map(|(&r, &u)| {
            let r = r as f64;
            if u < r {
                0.0
            } else {
                r / u
            }
        }))
    }
}
