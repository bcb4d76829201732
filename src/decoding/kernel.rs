//! Phase shifting demodulation and temporal phase unwrapping.

use ndarray::{Array2, Array3, Array4, ArrayView1, ArrayView2, ArrayView4, Axis};
use rayon::prelude::*;
use std::f64::consts::PI;

const SINGULAR: f64 = 1e-9;

/// Everything a kernel needs besides the frames themselves.
pub struct KernelInput<'a> {
    /// Base frames `(sum(N), Y, X, C)` in coding order.
    pub frames: ArrayView4<'a, f64>,
    pub n: ArrayView2<'a, usize>,
    pub v: ArrayView2<'a, f64>,
    /// Temporal frequencies, negative when the sequence runs in reverse.
    pub f: ArrayView2<'a, f64>,
    pub length: f64,
    pub umr: ArrayView1<'a, f64>,
    pub x0: f64,
    pub p0: f64,
    /// Bias assumed for sets with two shifts when no other set measures it.
    pub bias: f64,
    pub vmin: f64,
    /// Middle of the coded coordinates per direction, `x0` included.
    pub centers: &'a [f64],
}

/// Raw kernel result, every field shaped `(·, Y, X, C)`.
#[derive(Debug, Clone)]
pub struct KernelOutput {
    /// Per direction.
    pub brightness: Array4<f64>,
    /// Per set.
    pub modulation: Array4<f64>,
    /// Per set, in `[0, 2π)`.
    pub phase: Array4<f64>,
    /// Per direction, without `x0`.
    pub registration: Array4<f64>,
    /// Per direction.
    pub residuals: Array4<f64>,
}

/// Fits the shifted samples of every pixel and fuses the sets of each
/// direction into one coordinate.
pub trait DecoderKernel: Send + Sync {
    fn demodulate(&self, input: &KernelInput<'_>) -> KernelOutput;
}

/// Least squares phase shifting with a hierarchical fringe order search.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseShiftKernel;

enum Fit {
    /// Pseudo-inverse `(3, N)` of the design matrix `[1, cos w, sin w]`.
    LeastSquares(Array2<f64>),
    /// Inverse of the 2×2 design `[cos w, sin w]`, bias known.
    KnownBias([[f64; 2]; 2]),
    Unsolvable,
}

struct SetPlan {
    offset: usize,
    count: usize,
    /// Wavelength; infinite for a set without spatial modulation.
    l: f64,
    cos: Vec<f64>,
    sin: Vec<f64>,
    fit: Fit,
}

impl SetPlan {
    fn new(offset: usize, count: usize, v: f64, f: f64, length: f64) -> Self {
        let angles: Vec<f64> = (0..count)
            .map(|n| {
                let t = if count == 2 { n as f64 / 4.0 } else { n as f64 / count as f64 };
                2.0 * PI * f * t
            })
            .collect();
        let cos: Vec<f64> = angles.iter().map(|w| w.cos()).collect();
        let sin: Vec<f64> = angles.iter().map(|w| w.sin()).collect();
        let fit = match count {
            0 | 1 => Fit::Unsolvable,
            2 => {
                let det = cos[0] * sin[1] - sin[0] * cos[1];
                if det.abs() < SINGULAR {
                    Fit::Unsolvable
                } else {
                    Fit::KnownBias([[sin[1] / det, -sin[0] / det], [-cos[1] / det, cos[0] / det]])
                }
            }
            _ => pseudo_inverse(&cos, &sin).map_or(Fit::Unsolvable, Fit::LeastSquares),
        };
        let l = if v > 0.0 { length / v } else { f64::INFINITY };
        Self { offset, count, l, cos, sin, fit }
    }

    fn residual(&self, samples: &[f64], a: f64, bc: f64, bs: f64) -> f64 {
        samples
            .iter()
            .enumerate()
            .map(|(n, &i)| (i - a - bc * self.cos[n] - bs * self.sin[n]).powi(2))
            .sum()
    }
}

fn pseudo_inverse(cos: &[f64], sin: &[f64]) -> Option<Array2<f64>> {
    let n = cos.len();
    let design = Array2::from_shape_fn((n, 3), |(i, j)| match j {
        0 => 1.0,
        1 => cos[i],
        _ => sin[i],
    });
    let normal = design.t().dot(&design);
    let inverse = invert3(&normal, n as f64)?;
    Some(inverse.dot(&design.t()))
}

/// Adjugate inverse; `None` if the determinant vanishes relative to `scale³`.
fn invert3(m: &Array2<f64>, scale: f64) -> Option<Array2<f64>> {
    let minor = |r0: usize, r1: usize, c0: usize, c1: usize| m[[r0, c0]] * m[[r1, c1]] - m[[r0, c1]] * m[[r1, c0]];
    let cof = [
        [minor(1, 2, 1, 2), -minor(1, 2, 0, 2), minor(1, 2, 0, 1)],
        [-minor(0, 2, 1, 2), minor(0, 2, 0, 2), -minor(0, 2, 0, 1)],
        [minor(0, 1, 1, 2), -minor(0, 1, 0, 2), minor(0, 1, 0, 1)],
    ];
    let det = m[[0, 0]] * cof[0][0] + m[[0, 1]] * cof[0][1] + m[[0, 2]] * cof[0][2];
    if det.abs() < SINGULAR * scale.powi(3) {
        return None;
    }
    Some(Array2::from_shape_fn((3, 3), |(i, j)| cof[j][i] / det))
}

/// Wrapped measurement of one set.
#[derive(Debug, Clone, Copy)]
struct Wrapped {
    /// Phase as a fraction of a period.
    frac: f64,
    l: f64,
    weight: f64,
}

/// Absolute coordinate from the wrapped phases of several wavelengths.
///
/// The coarsest set proposes every fringe order within `span` around
/// `center`; finer sets follow by rounding against the running estimate.
/// The candidate with the smallest weighted spread wins and is brought into
/// the unambiguous range centred on `center`.
fn temporal_unwrap(sets: &mut [Wrapped], span: f64, umr: f64, center: f64) -> f64 {
    sets.sort_by(|a, b| b.l.total_cmp(&a.l));
    let Some(coarse) = sets.first().copied() else {
        return f64::NAN;
    };
    let lo = center - span / 2.0;
    let hi = center + span / 2.0;
    let first = (lo / coarse.l - coarse.frac).floor() as i64;
    let last = (hi / coarse.l - coarse.frac).ceil() as i64;

    let mut xs = vec![0.0; sets.len()];
    let mut best = (f64::INFINITY, f64::NAN);
    for m0 in first..=last {
        xs[0] = (coarse.frac + m0 as f64) * coarse.l;
        let mut sw = coarse.weight;
        let mut sx = coarse.weight * xs[0];
        for (i, s) in sets.iter().enumerate().skip(1) {
            let est = sx / sw;
            let m = (est / s.l - s.frac).round();
            xs[i] = (s.frac + m) * s.l;
            sw += s.weight;
            sx += s.weight * xs[i];
        }
        let est = sx / sw;
        let spread: f64 = sets.iter().zip(&xs).map(|(s, x)| s.weight * (x - est).powi(2)).sum();
        if spread < best.0 {
            best = (spread, est);
        }
    }

    let est = best.1;
    if umr.is_finite() && umr > 0.0 {
        est - umr * ((est - center) / umr).round()
    } else {
        est
    }
}

/// Per row outputs, shaped `(·, X, C)`.
struct Rows {
    brightness: Array3<f64>,
    modulation: Array3<f64>,
    phase: Array3<f64>,
    registration: Array3<f64>,
    residuals: Array3<f64>,
}

impl PhaseShiftKernel {
    fn pixel(&self, plans: &[Vec<SetPlan>], samples: &[f64], input: &KernelInput<'_>, out: &mut Rows, j: usize, ch: usize) {
        let mut dk = 0;
        for (d, sets) in plans.iter().enumerate() {
            // bias first: sets with two shifts rely on it
            let mut fits = vec![(f64::NAN, f64::NAN, f64::NAN); sets.len()];
            let (mut sa, mut sn, mut sq, mut used) = (0.0, 0.0, 0.0, 0usize);
            for (k, s) in sets.iter().enumerate() {
                if let Fit::LeastSquares(pinv) = &s.fit {
                    let i = &samples[s.offset..s.offset + s.count];
                    let coef = |row: usize| pinv.row(row).iter().zip(i).map(|(w, x)| w * x).sum::<f64>();
                    let (a, bc, bs) = (coef(0), coef(1), coef(2));
                    sq += s.residual(i, a, bc, bs);
                    used += s.count;
                    sa += s.count as f64 * a;
                    sn += s.count as f64;
                    fits[k] = (a, bc, bs);
                }
            }
            let bias = if sn > 0.0 { sa / sn } else { input.bias };
            for (k, s) in sets.iter().enumerate() {
                if let Fit::KnownBias(inv) = &s.fit {
                    let i = &samples[s.offset..s.offset + s.count];
                    let (r0, r1) = (i[0] - bias, i[1] - bias);
                    let bc = inv[0][0] * r0 + inv[0][1] * r1;
                    let bs = inv[1][0] * r0 + inv[1][1] * r1;
                    used += s.count;
                    fits[k] = (bias, bc, bs);
                }
            }

            let mut wrapped = Vec::with_capacity(sets.len());
            let mut valid = true;
            for (k, (s, &(_, bc, bs))) in sets.iter().zip(&fits).enumerate() {
                let b = bc.hypot(bs);
                let psi = (bs.atan2(bc) + input.p0).rem_euclid(2.0 * PI);
                out.modulation[[dk + k, j, ch]] = b;
                out.phase[[dk + k, j, ch]] = psi;
                if !s.l.is_finite() || !b.is_finite() {
                    continue;
                }
                let visibility = b / bias;
                if input.vmin > 0.0 && (visibility.is_nan() || visibility < input.vmin) {
                    valid = false;
                }
                wrapped.push(Wrapped { frac: psi / (2.0 * PI), l: s.l, weight: s.count as f64 * b * b / (s.l * s.l) });
            }
            let total: f64 = wrapped.iter().map(|w| w.weight).sum();

            out.brightness[[d, j, ch]] = bias;
            out.residuals[[d, j, ch]] = if used > 0 { (sq / used as f64).sqrt() } else { f64::NAN };
            out.registration[[d, j, ch]] = if valid && total > 0.0 && wrapped.iter().all(|w| w.weight > 0.0) {
                let umr = input.umr[d];
                let span = umr.min(input.length);
                temporal_unwrap(&mut wrapped, span, umr, input.centers[d]) - input.x0
            } else {
                f64::NAN
            };
            dk += sets.len();
        }
    }
}

impl DecoderKernel for PhaseShiftKernel {
    fn demodulate(&self, input: &KernelInput<'_>) -> KernelOutput {
        let (_, y, x, c) = input.frames.dim();
        let (d, k) = input.n.dim();

        let mut offset = 0;
        let plans: Vec<Vec<SetPlan>> = (0..d)
            .map(|i| {
                (0..k)
                    .map(|j| {
                        let count = input.n[[i, j]];
                        let plan = SetPlan::new(offset, count, input.v[[i, j]], input.f[[i, j]], input.length);
                        offset += count;
                        plan
                    })
                    .collect()
            })
            .collect();
        let total = offset;

        let rows: Vec<Rows> = (0..y)
            .into_par_iter()
            .map(|i| {
                let mut out = Rows {
                    brightness: Array3::from_elem((d, x, c), f64::NAN),
                    modulation: Array3::from_elem((d * k, x, c), f64::NAN),
                    phase: Array3::from_elem((d * k, x, c), f64::NAN),
                    registration: Array3::from_elem((d, x, c), f64::NAN),
                    residuals: Array3::from_elem((d, x, c), f64::NAN),
                };
                let mut samples = vec![0.0; total];
                for j in 0..x {
                    for ch in 0..c {
                        for (t, s) in samples.iter_mut().enumerate() {
                            *s = input.frames[[t, i, j, ch]];
                        }
                        self.pixel(&plans, &samples, input, &mut out, j, ch);
                    }
                }
                out
            })
            .collect();

        let mut output = KernelOutput {
            brightness: Array4::zeros((d, y, x, c)),
            modulation: Array4::zeros((d * k, y, x, c)),
            phase: Array4::zeros((d * k, y, x, c)),
            registration: Array4::zeros((d, y, x, c)),
            residuals: Array4::zeros((d, y, x, c)),
        };
        for (i, row) in rows.iter().enumerate() {
            output.brightness.index_axis_mut(Axis(1), i).assign(&row.brightness);
            output.modulation.index_axis_mut(Axis(1), i).assign(&row.modulation);
            output.phase.index_axis_mut(Axis(1), i).assign(&row.phase);
            output.registration.index_axis_mut(Axis(1), i).assign(&row.registration);
            output.residuals.index_axis_mut(Axis(1), i).assign(&row.residuals);
        }
        output
    }
}
