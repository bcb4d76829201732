//! Post-filters for registration maps.

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

/// Spatial standard deviation of the bilateral filter, px.
const SIGMA_SPACE: f64 = 1.0;
/// Range standard deviation of the bilateral filter, px of registration.
const SIGMA_RANGE: f64 = 1.0;

/// 3×3 neighbourhood with the border repeated.
fn window(a: ArrayView2<f64>, i: usize, j: usize) -> impl Iterator<Item = (isize, isize, f64)> + '_ {
    let (rows, cols) = a.dim();
    (-1isize..=1).flat_map(move |di| {
        (-1isize..=1).map(move |dj| {
            let r = (i as isize + di).clamp(0, rows as isize - 1) as usize;
            let c = (j as isize + dj).clamp(0, cols as isize - 1) as usize;
            (di, dj, a[[r, c]])
        })
    })
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

fn filter_rows<F>(a: &Array2<f64>, f: F) -> Array2<f64>
where
    F: Fn(ArrayView2<f64>, usize, usize) -> f64 + Sync,
{
    let mut out = Array2::zeros(a.dim());
    let view = a.view();
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for j in 0..row.len() {
                row[j] = if view[[i, j]].is_nan() { f64::NAN } else { f(view, i, j) };
            }
        });
    out
}

/// Replaces every pixel by the median of its 3×3 neighbourhood.
///
/// NaN neighbours are ignored and NaN pixels stay NaN.
pub fn despike(a: &Array2<f64>) -> Array2<f64> {
    filter_rows(a, |view, i, j| {
        let mut values: Vec<f64> = window(view, i, j).map(|(_, _, v)| v).filter(|v| !v.is_nan()).collect();
        median(&mut values)
    })
}

/// 3×3 bilateral filter, smoothing without blurring across edges.
pub fn denoise(a: &Array2<f64>) -> Array2<f64> {
    filter_rows(a, |view, i, j| {
        let center = view[[i, j]];
        let (mut sum, mut norm) = (0.0, 0.0);
        for (di, dj, v) in window(view, i, j) {
            if v.is_nan() {
                continue;
            }
            let space = ((di * di + dj * dj) as f64) / (2.0 * SIGMA_SPACE * SIGMA_SPACE);
            let range = (v - center).powi(2) / (2.0 * SIGMA_RANGE * SIGMA_RANGE);
            let w = (-space - range).exp();
            sum += w * v;
            norm += w;
        }
        sum / norm
    })
}
