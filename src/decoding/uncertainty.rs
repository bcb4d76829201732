//! Per pixel quality measures of a decoded field.

use crate::params::Params;
use ndarray::{Array3, Array4, Axis, Zip};
use std::f64::consts::PI;

/// Positional standard deviation `(D, Y, X, C)` from measured brightness and modulation.
///
/// Camera noise at the measured brightness gives the phase uncertainty of each
/// set, which is scaled to its wavelength and fused by inverse variance.
pub fn uncertainty(p: &Params, brightness: &Array4<f64>, modulation: &Array4<f64>) -> Array4<f64> {
    let (d, y, x, c) = brightness.dim();
    let k = p.k();
    let n = p.n();
    let l = p.l();
    let m = p.m();
    let dark = p.gain() * p.dark();
    let quant = p.quant();
    let gain = p.gain();

    let mut out = Array4::zeros((d, y, x, c));
    for di in 0..d {
        let bri = brightness.index_axis(Axis(0), di);
        let mut plane = Array3::<f64>::zeros((y, x, c));
        for ki in 0..k {
            let amp = modulation.index_axis(Axis(0), di * k + ki);
            let (count, wavelength) = (n[[di, ki]] as f64, l[[di, ki]]);
            if !wavelength.is_finite() {
                continue;
            }
            Zip::from(&mut plane).and(&bri).and(&amp).for_each(|w, &a, &b| {
                let ui = (dark * dark + quant * quant + gain * a.max(0.0)).sqrt();
                let upi = 2f64.sqrt() / (m * count).sqrt() * ui / b;
                let ux = upi / (2.0 * PI) * wavelength;
                if ux.is_finite() && ux > 0.0 {
                    *w += 1.0 / (ux * ux);
                }
            });
        }
        out.index_axis_mut(Axis(0), di).assign(&plane.mapv(|w| if w > 0.0 { (1.0 / w).sqrt() } else { f64::NAN }));
    }
    out
}

/// Modulation over brightness, per set.
pub fn visibility(brightness: &Array4<f64>, modulation: &Array4<f64>, k: usize) -> Array4<f64> {
    let mut out = modulation.clone();
    for (i, mut set) in out.outer_iter_mut().enumerate() {
        let bri = brightness.index_axis(Axis(0), i / k.max(1));
        Zip::from(&mut set).and(&bri).for_each(|v, &a| *v /= a.max(f64::EPSILON));
    }
    out
}

/// Brightness relative to the largest gray value of the input.
pub fn exposure(brightness: &Array4<f64>, imax: f64) -> Array4<f64> {
    brightness.mapv(|a| a / imax)
}

/// Fringe order of every set at the decoded coordinate.
pub fn orders(p: &Params, registration: &Array4<f64>) -> Array4<f64> {
    let (d, y, x, c) = registration.dim();
    let k = p.k();
    let l = p.l();
    let x0 = p.x0();
    Array4::from_shape_fn((d * k, y, x, c), |(i, yi, xi, ci)| {
        ((registration[[i / k, yi, xi, ci]] + x0) / l[[i / k, i % k]]).floor()
    })
}
