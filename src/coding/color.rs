//! Hue stamping and fusion.

use ndarray::{Array2, Array4, ArrayView2, Axis, Zip};

/// Factor applied to a base frame shown in `hue` on channel `c`.
pub fn hue_scale(h: ArrayView2<u8>, hue: usize, c: usize) -> f64 {
    f64::from(h[[hue, c.min(h.ncols() - 1)]]) / 255.0
}

/// Channels no hue lights up.
pub fn black_channels(h: ArrayView2<u8>) -> Vec<bool> {
    h.axis_iter(Axis(1)).map(|col| col.iter().all(|&v| v == 0)).collect()
}

/// How the hue blocks of a sequence are fused into one.
#[derive(Debug, Clone, PartialEq)]
pub enum Fusion {
    /// Each channel is taken from the single hue lighting it.
    Select(Vec<Option<usize>>),
    /// Weighted average over hues with weights `h / sum(h)` per channel.
    Weighted(Array2<f64>),
}

/// Picks the fusion for the hues `h` and `channels` color channels.
///
/// Three hues (or two) that each light exactly one distinct channel at full
/// intensity are fused by selection; everything else is averaged.
pub fn fusion(h: ArrayView2<u8>, channels: usize) -> Fusion {
    let hues = h.nrows();
    let pure = h.outer_iter().all(|row| row.iter().filter(|&&v| v != 0).count() == 1 && row.iter().all(|&v| v == 0 || v == 255));
    let lit: Vec<usize> = h.axis_iter(Axis(1)).map(|col| col.iter().filter(|&&v| v != 0).count()).collect();
    let distinct = lit.iter().all(|&n| n <= 1);
    if channels == 3 && (hues == 3 || hues == 2) && pure && distinct {
        let select = (0..3).map(|c| (0..hues).find(|&i| h[[i, c]] != 0)).collect();
        return Fusion::Select(select);
    }

    let weights = Array2::from_shape_fn((hues, channels), |(i, c)| {
        let c = c.min(h.ncols() - 1);
        let sum: f64 = h.column(c).iter().map(|&v| f64::from(v)).sum();
        if sum == 0.0 {
            0.0
        } else {
            f64::from(h[[i, c]]) / sum
        }
    });
    Fusion::Weighted(weights)
}

/// Fuses `(H·T, Y, X, C)` frames into `(T, Y, X, C)`.
pub fn decolorize(frames: &Array4<f64>, h: ArrayView2<u8>) -> Array4<f64> {
    let (total, y, x, c) = frames.dim();
    let hues = h.nrows().max(1);
    let t = total / hues;
    let mut out = Array4::zeros((t, y, x, c));
    match fusion(h, c) {
        Fusion::Select(select) => {
            for (ch, hue) in select.into_iter().enumerate() {
                let Some(hue) = hue else { continue };
                for i in 0..t {
                    out.index_axis_mut(Axis(0), i)
                        .index_axis_mut(Axis(2), ch)
                        .assign(&frames.index_axis(Axis(0), hue * t + i).index_axis(Axis(2), ch));
                }
            }
        }
        Fusion::Weighted(w) => {
            for hue in 0..hues {
                for ch in 0..c {
                    let weight = w[[hue, ch]];
                    if weight == 0.0 {
                        continue;
                    }
                    for i in 0..t {
                        let src = frames.index_axis(Axis(0), hue * t + i);
                        let mut dst = out.index_axis_mut(Axis(0), i);
                        Zip::from(dst.index_axis_mut(Axis(2), ch))
                            .and(src.index_axis(Axis(2), ch))
                            .for_each(|o, &v| *o += weight * v);
                    }
                }
            }
        }
    }
    out
}
