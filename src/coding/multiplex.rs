//! Folding base frames into fewer frames and unfolding them again.
//!
//! A base frame is one shift of one set. WDM packs three consecutive base
//! frames into the color channels of one frame, SDM sums the frames of both
//! directions and FDM sums the same shift of every set. Sums remove the bias
//! of each summand and add it back once.

use crate::coding::grid;
use crate::diagnostics::DiagnosticsSink;
use crate::params::Params;
use ndarray::{Array2, Array4, ArrayView2, ArrayViewMut2, Axis, Zip};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::HashMap;

/// Position of a base frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub d: usize,
    pub k: usize,
    pub n: usize,
}

/// Base frames in coding order: directions, then sets, then shifts.
pub fn shifts(n: ArrayView2<usize>) -> Vec<Shift> {
    let mut out = Vec::with_capacity(n.sum());
    for ((d, k), &count) in n.indexed_iter() {
        out.extend((0..count).map(|i| Shift { d, k, n: i }));
    }
    out
}

/// Base frames making up one transmitted frame, per color channel.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGroup {
    pub channels: Vec<Vec<usize>>,
}

/// Groups of all transmitted frames of a single hue.
pub fn groups(p: &Params) -> Vec<FrameGroup> {
    let n = p.n();
    let total = n.sum();
    if p.fdm() {
        let shifts = n[[0, 0]];
        let sets = n.len();
        return (0..shifts)
            .map(|t| FrameGroup { channels: vec![(0..sets).map(|j| j * shifts + t).collect()] })
            .collect();
    }

    let mut units: Vec<Vec<Vec<usize>>> = if p.wdm() {
        (0..total / 3).map(|g| (0..3).map(|c| vec![3 * g + c]).collect()).collect()
    } else {
        (0..total).map(|i| vec![vec![i]]).collect()
    };
    if p.sdm() {
        let half = units.len() / 2;
        units = (0..half)
            .map(|t| {
                units[t]
                    .iter()
                    .zip(&units[half + t])
                    .map(|(a, b)| a.iter().chain(b).copied().collect())
                    .collect()
            })
            .collect();
    }
    units.into_iter().map(|channels| FrameGroup { channels }).collect()
}

/// Writes the multiplexed value of `members`, scaled by `scale`, into `out`.
pub fn stack(members: &[usize], base: &HashMap<usize, Array2<f64>>, bias: f64, scale: f64, mut out: ArrayViewMut2<f64>) {
    match members {
        [single] => {
            if let Some(frame) = base.get(single) {
                Zip::from(&mut out).and(frame).for_each(|o, &i| *o = i * scale);
            }
        }
        _ => {
            out.fill(bias);
            for m in members {
                if let Some(frame) = base.get(m) {
                    Zip::from(&mut out).and(frame).for_each(|o, &i| *o += i - bias);
                }
            }
            out.mapv_inplace(|v| v * scale);
        }
    }
}

/// Warns if FDM cannot separate the temporal frequencies with the given shifts.
pub fn check_nyquist(p: &Params, sink: &mut dyn DiagnosticsSink) {
    if !p.fdm() {
        return;
    }
    let fmax = p.f().iter().fold(0.0f64, |m, f| m.max(f.abs()));
    let n = p.n().iter().copied().min().unwrap_or(0);
    if (n as f64) < 2.0 * fmax + 1.0 {
        sink.warn("multiplex", format!("N = {n} shifts can't resolve temporal frequency {fmax}, need {}", 2.0 * fmax + 1.0));
    }
}

/// Restores the base frames `(sum(N), Y, X, C)` from transmitted frames of a single hue.
pub fn demultiplex(p: &Params, frames: Array4<f64>, sink: &mut dyn DiagnosticsSink) -> Array4<f64> {
    let mut frames = frames;
    if p.wdm() {
        frames = unpack_channels(frames);
    }
    if p.sdm() {
        if p.n().iter().any(|&n| n == 1) {
            sink.warn("multiplex", "single shot SDM can't be separated spatially".into());
        } else {
            let axes = grid::axes(p);
            frames = split_directions(&frames, axes[0] == 0);
        }
    }
    if p.fdm() {
        frames = tile(&frames, p.d() * p.k());
    }
    frames
}

/// `(T, Y, X, 3)` to `(3T, Y, X, 1)`: channel `c` of frame `t` becomes frame `3t + c`.
fn unpack_channels(frames: Array4<f64>) -> Array4<f64> {
    let (t, y, x, c) = frames.dim();
    let mut out = Array4::zeros((t * c, y, x, 1));
    for i in 0..t {
        for ch in 0..c {
            out.index_axis_mut(Axis(0), i * c + ch)
                .index_axis_mut(Axis(2), 0)
                .assign(&frames.index_axis(Axis(0), i).index_axis(Axis(2), ch));
        }
    }
    out
}

/// Repeats the frames `copies` times.
fn tile(frames: &Array4<f64>, copies: usize) -> Array4<f64> {
    let views: Vec<_> = (0..copies).map(|_| frames.view()).collect();
    ndarray::concatenate(Axis(0), &views).unwrap_or_else(|_| frames.clone())
}

/// Separates summed directions by masking the spectrum of every frame.
///
/// Output holds the frames of the first direction, then those of the second.
pub(crate) fn split_directions(frames: &Array4<f64>, first_is_x: bool) -> Array4<f64> {
    let (t, y, x, c) = frames.dim();
    let planes: Vec<(Array2<f64>, Array2<f64>)> = (0..t * c)
        .into_par_iter()
        .map(|i| {
            let plane = frames.index_axis(Axis(0), i / c).index_axis(Axis(2), i % c).to_owned();
            let (along_x, along_y) = split_plane(plane.view());
            if first_is_x {
                (along_x, along_y)
            } else {
                (along_y, along_x)
            }
        })
        .collect();

    let mut out = Array4::zeros((2 * t, y, x, c));
    for (i, (a, b)) in planes.into_iter().enumerate() {
        let (frame, ch) = (i / c, i % c);
        out.index_axis_mut(Axis(0), frame).index_axis_mut(Axis(2), ch).assign(&a);
        out.index_axis_mut(Axis(0), t + frame).index_axis_mut(Axis(2), ch).assign(&b);
    }
    out
}

fn signed(k: usize, n: usize) -> usize {
    if k <= n / 2 {
        k
    } else {
        n - k
    }
}

/// Weight of bin `(ky, kx)` for fringes varying along x.
///
/// Bins closer to the x axis go to x, ties are shared and DC belongs to both.
fn x_weight(ky: usize, kx: usize, rows: usize, cols: usize) -> f64 {
    if ky == 0 && kx == 0 {
        return 1.0;
    }
    // |fx| vs |fy| on normalized frequencies, compared without division
    let fx = signed(kx, cols) * rows;
    let fy = signed(ky, rows) * cols;
    match fx.cmp(&fy) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Equal => 0.5,
        std::cmp::Ordering::Less => 0.0,
    }
}

fn split_plane(plane: ArrayView2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (rows, cols) = plane.dim();
    let mut spectrum = plane.mapv(|v| Complex::new(v, 0.0));
    fft2(&mut spectrum, false);

    let mut along_x = spectrum.clone();
    let mut along_y = spectrum;
    for ((ky, kx), bin) in along_x.indexed_iter_mut() {
        *bin *= x_weight(ky, kx, rows, cols);
    }
    for ((ky, kx), bin) in along_y.indexed_iter_mut() {
        let w = if ky == 0 && kx == 0 { 1.0 } else { 1.0 - x_weight(ky, kx, rows, cols) };
        *bin *= w;
    }
    fft2(&mut along_x, true);
    fft2(&mut along_y, true);
    let norm = (rows * cols) as f64;
    (along_x.mapv(|z| z.re / norm), along_y.mapv(|z| z.re / norm))
}

/// In place 2D transform, rows first, then columns. The inverse is unnormalized.
pub(crate) fn fft2(data: &mut Array2<Complex<f64>>, inverse: bool) {
    let (rows, cols) = data.dim();
    let mut planner = FftPlanner::new();
    let (row_fft, col_fft) = if inverse {
        (planner.plan_fft_inverse(cols), planner.plan_fft_inverse(rows))
    } else {
        (planner.plan_fft_forward(cols), planner.plan_fft_forward(rows))
    };
    let mut buf = Vec::with_capacity(rows.max(cols));
    for mut row in data.rows_mut() {
        buf.clear();
        buf.extend(row.iter().copied());
        row_fft.process(&mut buf);
        row.iter_mut().zip(&buf).for_each(|(o, &v)| *o = v);
    }
    for mut col in data.columns_mut() {
        buf.clear();
        buf.extend(col.iter().copied());
        col_fft.process(&mut buf);
        col.iter_mut().zip(&buf).for_each(|(o, &v)| *o = v);
    }
}
