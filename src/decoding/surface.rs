//! Surface curvature and height from a registration map.
//!
//! A specular surface deflects the observed screen coordinate in proportion to
//! its slope, so the divergence of the registration measures curvature and
//! integrating it once more gives height.

use crate::coding::grid::axes;
use crate::coding::multiplex::fft2;
use crate::error::{FringesError, Result};
use crate::params::Params;
use ndarray::{Array2, Array3, Array4, ArrayView1, Axis};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Local curvature `(Y, X, C)`: divergence of the registration, minus its median.
///
/// A flat surface maps the screen with a constant scale, which the median
/// removes. NaN coordinates give NaN curvature.
pub fn curvature(p: &Params, registration: &Array4<f64>) -> Result<Array3<f64>> {
    let (d, y, x, c) = registration.dim();
    if d != p.d() {
        return Err(FringesError::Shape(format!("registration has {d} directions, expected {}", p.d())));
    }
    let mut div = Array3::<f64>::zeros((y, x, c));
    for (di, &a) in axes(p).iter().enumerate() {
        // base coordinate 0 runs along the image columns
        let along = if a == 0 { Axis(1) } else { Axis(0) };
        let plane = registration.index_axis(Axis(0), di);
        for (mut out, lane) in div.lanes_mut(along).into_iter().zip(plane.lanes(along)) {
            let g = gradient(lane);
            out.iter_mut().zip(g).for_each(|(o, g)| *o += g);
        }
    }

    for ci in 0..c {
        let mut channel = div.index_axis_mut(Axis(2), ci);
        let mut finite: Vec<f64> = channel.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            continue;
        }
        finite.sort_by(f64::total_cmp);
        let mid = finite.len() / 2;
        let median = if finite.len() % 2 == 1 { finite[mid] } else { (finite[mid - 1] + finite[mid]) / 2.0 };
        channel -= median;
    }
    Ok(div)
}

/// Central differences inside, one sided at both ends.
fn gradient(lane: ArrayView1<f64>) -> Vec<f64> {
    let n = lane.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => lane[1] - lane[0],
            i if i == n - 1 => lane[n - 1] - lane[n - 2],
            i => (lane[i + 1] - lane[i - 1]) / 2.0,
        })
        .collect()
}

/// Height `(Y, X, C)` whose Laplacian is `curvature`, with zero mean.
///
/// Solves the Poisson equation per channel with reflecting borders, by
/// mirroring the map and dividing its spectrum by the Laplacian eigenvalues.
/// NaN curvature counts as flat.
pub fn height(curvature: &Array3<f64>) -> Array3<f64> {
    let (y, x, c) = curvature.dim();
    let mut out = Array3::zeros((y, x, c));
    if y == 0 || x == 0 {
        return out;
    }
    let (rows, cols) = (2 * y, 2 * x);
    let eigen = |k: usize, n: usize| 2.0 * (2.0 * PI * k as f64 / n as f64).cos() - 2.0;

    for ci in 0..c {
        let plane = curvature.index_axis(Axis(2), ci);
        let mut spectrum = Array2::from_shape_fn((rows, cols), |(i, j)| {
            let v = plane[[i.min(rows - 1 - i), j.min(cols - 1 - j)]];
            Complex::new(if v.is_finite() { v } else { 0.0 }, 0.0)
        });
        fft2(&mut spectrum, false);
        for ((ky, kx), bin) in spectrum.indexed_iter_mut() {
            let lambda = eigen(ky, rows) + eigen(kx, cols);
            *bin = if ky == 0 && kx == 0 { Complex::new(0.0, 0.0) } else { *bin / lambda };
        }
        fft2(&mut spectrum, true);
        let norm = (rows * cols) as f64;
        let mut h = out.index_axis_mut(Axis(2), ci);
        for ((i, j), v) in h.indexed_iter_mut() {
            *v = spectrum[[i, j]].re / norm;
        }
    }
    out
}
