//! Camera noise propagated through phase measurement and wavelength fusion.

use super::Params;
use ndarray::{Array1, Array2, Axis};
use std::f64::consts::PI;

impl Params {
    /// Quantization noise, standard deviation in DN.
    pub fn quant(&self) -> f64 {
        self.dtype.step() / 12f64.sqrt()
    }

    /// Shot noise at the bias level, standard deviation in DN.
    pub fn shot(&self) -> f64 {
        if self.gain == 0.0 {
            return 0.0;
        }
        let a = self.a() * self.mtf(0.0);
        (self.gain * (a - self.y0).max(0.0)).sqrt()
    }

    /// Intensity noise.
    pub fn ui(&self) -> f64 {
        let dark = self.gain * self.dark;
        let quant = self.quant();
        let shot = self.shot();
        (dark * dark + quant * quant + shot * shot).sqrt()
    }

    /// Phase uncertainty of every set, in rad.
    pub fn upi(&self) -> Array2<f64> {
        let ui = self.ui();
        let m = self.m();
        let b = self.b();
        let v = self.v();
        Array2::from_shape_fn(self.n.dim(), |(i, j)| {
            let snr = b * self.mtf(v[[i, j]]) / ui;
            2f64.sqrt() / (m * self.n[[i, j]] as f64).sqrt() / snr
        })
    }

    /// Positional uncertainty per direction after inverse variance fusion, in px.
    pub fn u(&self) -> Array1<f64> {
        let l = self.l();
        let ux = self.upi() / (2.0 * PI) * &l;
        ux.map_axis(Axis(1), |row| {
            let w: f64 = row.iter().filter(|u| u.is_finite()).map(|u| 1.0 / (u * u)).sum();
            (1.0 / w).sqrt()
        })
    }

    /// Signal-to-noise ratio: distinguishable points within the pattern extent.
    pub fn snr(&self) -> Array1<f64> {
        let r = Array1::from_iter(self.r().into_iter().map(|r| r as f64));
        r / self.u()
    }

    pub fn snr_db(&self) -> Array1<f64> {
        self.snr().mapv(|x| 20.0 * x.log10())
    }

    /// Dynamic range: distinguishable points within the unambiguous range.
    pub fn dr(&self) -> Array1<f64> {
        self.umr() / self.u()
    }

    pub fn dr_db(&self) -> Array1<f64> {
        self.dr().mapv(|x| 20.0 * x.log10())
    }

    /// SNR per frame.
    pub fn efficiency(&self) -> Array1<f64> {
        self.snr() / self.t() as f64
    }
}
