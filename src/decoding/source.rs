//! Source activation heatmap and the bright and dark field masks taken from it.
//!
//! Decoded coordinates land on integer screen pixels, weighted by modulation.
//! The result is blurred by the positional uncertainty and the point spread
//! function, then scaled to a maximum of one.

use crate::coding::grid::axes;
use crate::coding::FramePattern;
use crate::error::{FringesError, Result};
use crate::params::Params;
use ndarray::{Array3, Array4, Axis, Zip};

/// Heatmap `(Y, X, C)` over the screen, in `[0, 1]`.
///
/// `registration` is `(D, Y, X, C)` in screen pixels. `modulation` is averaged
/// over its sets and used as weights; without it every hit counts once. `dx`
/// is the footprint of one camera pixel on the screen, in screen pixels.
pub fn source(p: &Params, registration: &Array4<f64>, modulation: Option<&Array4<f64>>, dx: f64) -> Result<Array3<f64>> {
    let (d, y, x, c) = registration.dim();
    if d != p.d() {
        return Err(FringesError::Shape(format!("registration has {d} directions, expected {}", p.d())));
    }
    let weights = match modulation {
        Some(b) => {
            let (_, by, bx, bc) = b.dim();
            if (by, bx, bc) != (y, x, c) {
                return Err(FringesError::Shape(format!(
                    "modulation is ({by}, {bx}, {bc}), registration is ({y}, {x}, {c})"
                )));
            }
            b.mean_axis(Axis(0))
                .ok_or_else(|| FringesError::Shape("modulation has no sets".into()))?
        }
        None => Array3::ones((y, x, c)),
    };

    // which direction carries the screen x and y coordinate
    let mut carrier = [None; 2];
    for (di, &a) in axes(p).iter().enumerate() {
        carrier[a] = Some(di);
    }

    let (sy, sx) = (p.y(), p.x());
    let mut src = Array3::<f64>::zeros((sy, sx, c));
    for ((yi, xi, ci), &w) in weights.indexed_iter() {
        let coord = |axis: usize| carrier[axis].map_or(0.0, |di| registration[[di, yi, xi, ci]]);
        let (u, v) = (coord(0).round(), coord(1).round());
        if !(u >= 0.0 && v >= 0.0 && u < sx as f64 && v < sy as f64) || !w.is_finite() {
            continue;
        }
        src[[v as usize, u as usize, ci]] += w;
    }

    let u = p.u();
    let psf = p.psf();
    for (axis, array_axis) in [(0, 1), (1, 0)] {
        let spread = carrier[axis].map_or(0.0, |di| u[di]);
        let sigma = spread.hypot(psf);
        if let Some(kernel) = gaussian_kernel(sigma) {
            src = convolve(&src, Axis(array_axis), &kernel);
        }
    }
    let size = dx.round() as usize;
    if size > 1 {
        let kernel = vec![1.0 / size as f64; size];
        src = convolve(&src, Axis(0), &kernel);
        src = convolve(&src, Axis(1), &kernel);
    }

    let max = src.iter().copied().fold(0.0, f64::max);
    if max > 0.0 && max != 1.0 {
        src /= max;
    }
    Ok(src)
}

/// Screen pixels whose activation exceeds `threshold`, dilated by a disk of diameter `k`.
pub fn brightfield(p: &Params, src: &Array3<f64>, threshold: f64, k: usize) -> FramePattern {
    let t = threshold.clamp(0.0, 1.0);
    field(p, src.mapv(|s| s > t), k)
}

/// Screen pixels at or below `threshold`, dilated by a disk of diameter `k`.
pub fn darkfield(p: &Params, src: &Array3<f64>, threshold: f64, k: usize) -> FramePattern {
    let t = threshold.clamp(0.0, 1.0);
    field(p, src.mapv(|s| s <= t), k)
}

fn field(p: &Params, mask: Array3<bool>, k: usize) -> FramePattern {
    let mask = if k > 1 { dilate(&mask, k) } else { mask };
    let imax = p.imax();
    let data = mask.mapv(|m| if m { imax } else { 0.0 }).insert_axis(Axis(0));
    FramePattern::from_f64(data, p.dtype(), true)
}

fn dilate(mask: &Array3<bool>, k: usize) -> Array3<bool> {
    let r = (k as isize - 1) / 2;
    let offsets: Vec<(isize, isize)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dy, dx)))
        .filter(|&(dy, dx)| dy * dy + dx * dx <= r * r)
        .collect();
    let (rows, cols, _) = mask.dim();
    Array3::from_shape_fn(mask.dim(), |(i, j, c)| {
        offsets.iter().any(|&(dy, dx)| {
            let (y, x) = (i as isize + dy, j as isize + dx);
            y >= 0 && x >= 0 && (y as usize) < rows && (x as usize) < cols && mask[[y as usize, x as usize, c]]
        })
    })
}

/// Normalized Gaussian truncated at four standard deviations, `None` if it is a single tap.
fn gaussian_kernel(sigma: f64) -> Option<Vec<f64>> {
    let radius = (4.0 * sigma + 0.5) as isize;
    if radius < 1 {
        return None;
    }
    let taps: Vec<f64> = (-radius..=radius).map(|i| (-(i * i) as f64 / (2.0 * sigma * sigma)).exp()).collect();
    let sum: f64 = taps.iter().sum();
    Some(taps.into_iter().map(|t| t / sum).collect())
}

/// 1D convolution along `axis` with the border repeated.
fn convolve(a: &Array3<f64>, axis: Axis, kernel: &[f64]) -> Array3<f64> {
    let mut out = Array3::zeros(a.dim());
    let half = (kernel.len() / 2) as isize;
    Zip::from(out.lanes_mut(axis)).and(a.lanes(axis)).par_for_each(|mut o, lane| {
        let last = lane.len() as isize - 1;
        for i in 0..lane.len() {
            o[i] = kernel
                .iter()
                .enumerate()
                .map(|(t, w)| w * lane[(i as isize + t as isize - half).clamp(0, last) as usize])
                .sum();
        }
    });
    out
}
