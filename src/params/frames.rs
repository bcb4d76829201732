//! Frame count and its inverse.

use super::hues;
use super::limits::{N_MIN, T_MAX};
use super::types::{HueInput, PeriodsInput, Values};
use super::Params;
use crate::diagnostics::DiagnosticsSink;
use ndarray::{Array2, ArrayView2};

/// `T = H·ΣN`, folded by the active multiplexing.
pub fn frame_count(h: usize, n: ArrayView2<usize>, sdm: bool, wdm: bool, fdm: bool) -> usize {
    let mut t = h * n.sum();
    if fdm {
        t /= n.len().max(1);
    }
    if sdm {
        t /= n.nrows().max(1);
    }
    if wdm && n.iter().all(|&x| x == 3) {
        t /= 3;
    }
    t
}

/// Shifts for `t` frames spread as evenly as possible over `(d, k)` sets.
///
/// The remainder goes to the leading sets, one frame per direction at a time.
pub fn distribute(t: usize, d: usize, k: usize) -> Array2<usize> {
    let sets = d * k;
    let avg = t / sets;
    let mut n = Array2::from_elem((d, k), avg);
    let rest = t - sets * avg;
    let full = rest / d;
    for j in 0..full {
        n.column_mut(j).mapv_inplace(|x| x + 1);
    }
    for i in 0..rest % d {
        n[[i, full]] += 1;
    }
    n
}

impl Params {
    /// Chooses `D`, `H`, `K` and `N` such that exactly `t` frames are coded.
    ///
    /// One frame is realized by combining WDM and SDM, two frames by WDM alone;
    /// all other counts switch multiplexing off.
    pub(super) fn put_t(&mut self, t: usize, sink: &mut dyn DiagnosticsSink) -> Result<(), String> {
        let t = t.clamp(1, T_MAX);
        if t <= 2 {
            if !self.grid.is_rectilinear() {
                return Err("one or two frames need a rectilinear grid".into());
            }
            self.put_fdm(false, sink)?;
            self.put_sdm(false)?;
            self.h = white();
            if t == 2 {
                self.put_d(2, sink);
            }
            self.put_k(1, sink);
            self.put_n(&Values::Scalar(3), sink)?;
            self.put_wdm(true)?;
            if t == 1 && self.d() == 2 {
                self.put_sdm(true)?;
            }
            return Ok(());
        }

        self.put_fdm(false, sink)?;
        self.put_sdm(false)?;
        self.put_wdm(false)?;
        self.put_d(if t < 6 { 1 } else { 2 }, sink);
        let d = self.d();

        let mut h = self.h();
        if t < h * d * N_MIN {
            h = (t / (d * N_MIN)).max(1);
        }
        while t % h != 0 {
            h -= 1;
        }
        self.put_hue_count(h);
        let t = t / h;

        let k = (t / (d * N_MIN)).clamp(1, self.k().max(1));
        self.put_k(k, sink);

        // keep the coding unambiguous by giving each ambiguous direction one full period
        let ambiguous = self.ambiguous_directions();
        if ambiguous.iter().any(|&a| a) {
            let mut v = self.v();
            for (mut row, _) in v.outer_iter_mut().zip(&ambiguous).filter(|(_, &a)| a) {
                let j = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::INFINITY), |(bj, bv), (j, &x)| if x < bv { (j, x) } else { (bj, bv) })
                    .0;
                row[j] = 1.0;
            }
            let rows = v.outer_iter().map(|r| r.to_vec()).collect();
            self.put_v(&PeriodsInput::Values(Values::Matrix(rows)), sink)?;
        }

        let n = distribute(t, d, self.k());
        let rows = n.outer_iter().map(|r| r.iter().map(|&x| x as i64).collect()).collect();
        self.put_n(&Values::Matrix(rows), sink)
    }
}

fn white() -> Array2<u8> {
    hues::parse_hues(&HueInput::Named("w".into())).unwrap_or_else(|_| Array2::from_elem((1, 3), 255))
}
