//! Partial updates and the single entry point that applies them.

use super::hues::{self, parse_hues};
use super::limits::*;
use super::periods::{self, coprime_frequencies};
use super::types::*;
use super::Params;
use crate::diagnostics::{DiagnosticsSink, LogSink};
use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Any subset of the settable parameters.
///
/// Field names on the wire follow the conventional symbols (`N`, `v`, `SDM`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Update {
    #[serde(rename = "Y", skip_serializing_if = "Option::is_none")]
    pub y: Option<usize>,
    #[serde(rename = "X", skip_serializing_if = "Option::is_none")]
    pub x: Option<usize>,
    #[serde(rename = "D", skip_serializing_if = "Option::is_none")]
    pub d: Option<usize>,
    #[serde(rename = "K", skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(rename = "N", skip_serializing_if = "Option::is_none")]
    pub n: Option<Values<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<PeriodsInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l: Option<PeriodsInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<Values<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<HueInput>,
    #[serde(rename = "T", skip_serializing_if = "Option::is_none")]
    pub t: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(rename = "A", skip_serializing_if = "Option::is_none")]
    pub a: Option<f64>,
    #[serde(rename = "B", skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(rename = "V", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
    #[serde(rename = "Vmin", skip_serializing_if = "Option::is_none")]
    pub vmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub umax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing: Option<Indexing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<Dtype>,
    #[serde(rename = "SDM", skip_serializing_if = "Option::is_none")]
    pub sdm: Option<bool>,
    #[serde(rename = "WDM", skip_serializing_if = "Option::is_none")]
    pub wdm: Option<bool>,
    #[serde(rename = "FDM", skip_serializing_if = "Option::is_none")]
    pub fdm: Option<bool>,
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criterion: Option<Criterion>,
    #[serde(rename = "PSF", skip_serializing_if = "Option::is_none")]
    pub psf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y0: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub field: &'static str,
    pub reason: String,
}

/// Some fields of an update could not be applied.
///
/// `params` holds the configuration with every acceptable field applied and the
/// rejected ones left at their previous values.
#[derive(Debug, Clone)]
pub struct RejectedFields {
    pub params: Params,
    pub rejected: Vec<Rejection>,
}

impl std::fmt::Display for RejectedFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<_> = self.rejected.iter().map(|r| format!("{}: {}", r.field, r.reason)).collect();
        write!(f, "rejected {}", fields.join("; "))
    }
}

impl std::error::Error for RejectedFields {}

type Step = Result<(), String>;

impl Params {
    /// Applies `update` and logs through the `log` facade.
    pub fn apply(&self, update: &Update) -> Result<Params, RejectedFields> {
        self.apply_with(update, &mut LogSink)
    }

    /// Applies `update` in dependency order and validates the result once.
    ///
    /// Geometry goes first since it defines `L`, then multiplex flags that are
    /// switched off, the shape `(D, K)`, shifts, periods and temporal
    /// frequencies, flags that are switched on, the frame count and finally the
    /// intensity and camera scalars.
    pub fn apply_with(&self, update: &Update, sink: &mut dyn DiagnosticsSink) -> Result<Params, RejectedFields> {
        let mut p = self.clone();
        let mut rejected = Vec::new();
        let mut run = |field: &'static str, step: Step, sink: &mut dyn DiagnosticsSink| {
            if let Err(reason) = step {
                sink.warn("params", format!("couldn't set '{field}': {reason}"));
                rejected.push(Rejection { field, reason });
            }
        };

        if let Some(y) = update.y {
            p.put_y(y, sink);
        }
        if let Some(x) = update.x {
            p.put_x(x, sink);
        }
        if let Some(alpha) = update.alpha {
            p.put_alpha(alpha);
        }
        if let Some(indexing) = update.indexing {
            p.freezing_length(|p| p.indexing = indexing);
        }
        if let Some(axis) = update.axis {
            p.freezing_length(|p| p.axis = axis.min(1));
        }
        if let Some(angle) = update.angle {
            p.angle = angle.rem_euclid(360.0);
        }
        if let Some(grid) = update.grid {
            run("grid", p.put_grid(grid), sink);
        }
        if let Some(dtype) = update.dtype {
            p.put_dtype(dtype);
        }
        if let Some(lmin) = update.lmin {
            p.put_lmin(lmin);
        }
        if let Some(c) = update.criterion {
            p.criterion = c;
        }

        for (field, flag) in [("FDM", update.fdm), ("WDM", update.wdm), ("SDM", update.sdm)] {
            if flag == Some(false) {
                let step = match field {
                    "FDM" => p.put_fdm(false, sink),
                    "WDM" => p.put_wdm(false),
                    _ => p.put_sdm(false),
                };
                run(field, step, sink);
            }
        }

        if let Some(h) = &update.h {
            run("h", p.put_h(h), sink);
        }
        if let Some(d) = update.d {
            p.put_d(d, sink);
        }
        if let Some(k) = update.k {
            p.put_k(k, sink);
        }
        if let Some(n) = &update.n {
            run("N", p.put_n(n, sink), sink);
        }
        if let Some(s) = update.static_ {
            p.put_static(s, sink);
        }
        if let Some(l) = &update.l {
            run("l", p.put_l(l, sink), sink);
        }
        if let Some(v) = &update.v {
            run("v", p.put_v(v, sink), sink);
        }
        if let Some(f) = &update.f {
            run("f", p.put_f(f, sink), sink);
        }

        for (field, flag) in [("WDM", update.wdm), ("SDM", update.sdm), ("FDM", update.fdm)] {
            if flag == Some(true) {
                let step = match field {
                    "WDM" => p.put_wdm(true),
                    "SDM" => p.put_sdm(true),
                    _ => p.put_fdm(true, sink),
                };
                run(field, step, sink);
            }
        }

        if let Some(t) = update.t {
            run("T", p.put_t(t, sink), sink);
        }

        if let Some(reverse) = update.reverse {
            p.reverse = reverse;
        }
        if let Some(verbose) = update.verbose {
            p.verbose = verbose;
        }
        if let Some(p0) = update.p0 {
            p.p0 = p0.signum() * (p0.abs() % (2.0 * PI));
        }
        if let Some(gamma) = update.gamma {
            run("gamma", p.put_gamma(gamma), sink);
        }
        if let Some(v) = update.visibility {
            p.visibility = v.clamp(0.0, p.visibility_max());
        }
        if let Some(beta) = update.beta {
            p.beta = beta.clamp(0.0, 1.0 / (1.0 + p.visibility));
        }
        if let Some(a) = update.a {
            p.put_a(a);
        }
        if let Some(b) = update.b {
            p.put_b(b);
        }
        if let Some(vmin) = update.vmin {
            p.vmin = vmin.clamp(0.0, 1.0);
        }
        if let Some(umax) = update.umax {
            p.umax = umax.clamp(0.0, p.length());
        }
        if let Some(psf) = update.psf {
            p.psf = psf.max(0.0);
        }
        if let Some(gain) = update.gain {
            p.gain = gain.clamp(0.0, 1.0);
        }
        if let Some(dark) = update.dark {
            p.put_dark(dark);
        }
        if let Some(y0) = update.y0 {
            p.y0 = y0.clamp(0.0, p.imax());
        }

        p.reconcile(sink);

        if let Err(reason) = p.check_invariants() {
            sink.warn("params", format!("update discarded: {reason}"));
            rejected.push(Rejection { field: "update", reason });
            return Err(RejectedFields { params: self.clone(), rejected });
        }
        if p.is_ambiguous() && !self.is_ambiguous() {
            sink.warn("params", format!("coding is ambiguous: UMR {} < R·alpha", p.umr()));
        }

        if rejected.is_empty() {
            Ok(p)
        } else {
            Err(RejectedFields { params: p, rejected })
        }
    }

    pub(crate) fn check_invariants(&self) -> Step {
        let (d, k) = self.n.dim();
        if !(1..=D_MAX).contains(&d) || !(1..=K_MAX).contains(&k) {
            return Err(format!("shape ({d}, {k}) out of bounds"));
        }
        if self.periods.dim() != (d, k) || self.f.dim() != (d, k) {
            return Err("N, v and f differ in shape".into());
        }
        let ftm = k == 1 && self.n.iter().all(|&n| n == 1);
        if !ftm && self.n.outer_iter().any(|row| !row.iter().any(|&n| n >= N_MIN)) {
            return Err("every direction needs a set with at least 3 shifts".into());
        }
        if self.wdm && (self.n.iter().any(|&n| n != 3) || !self.is_monochrome()) {
            return Err("WDM needs N = 3 and monochrome hues".into());
        }
        if self.fdm && (self.sdm || self.wdm || self.n.iter().any(|&n| n != self.n[[0, 0]])) {
            return Err("FDM excludes SDM, WDM and needs uniform N".into());
        }
        if self.sdm && (d != 2 || !self.grid.is_rectilinear()) {
            return Err("SDM needs two directions on a rectilinear grid".into());
        }
        if self.visibility > self.visibility_max() + 1e-12 {
            return Err("visibility exceeds its maximum".into());
        }
        Ok(())
    }

    /// Runs `change` and keeps `v` constant if it alters the coding length.
    fn freezing_length(&mut self, change: impl FnOnce(&mut Params)) {
        let before = self.length();
        change(self);
        if self.length() != before {
            if let Periods::Wavelengths(l) = &self.periods {
                self.periods = Periods::Frequencies(l.mapv(|l| before / l));
            }
        }
    }

    fn force_single_direction(&mut self, sink: &mut dyn DiagnosticsSink) {
        if self.x == 1 || self.y == 1 {
            let axis = if self.x == 1 && self.y != 1 { 1 } else { 0 };
            self.put_d(1, sink);
            self.freezing_length(|p| p.axis = axis);
        }
    }

    fn put_y(&mut self, y: usize, sink: &mut dyn DiagnosticsSink) {
        let y = y.clamp(1, Y_MAX.min(P_MAX / self.x.max(1)));
        self.freezing_length(|p| p.y = y);
        self.force_single_direction(sink);
    }

    fn put_x(&mut self, x: usize, sink: &mut dyn DiagnosticsSink) {
        let x = x.clamp(1, X_MAX.min(P_MAX / self.y.max(1)));
        self.freezing_length(|p| p.x = x);
        self.force_single_direction(sink);
    }

    fn put_alpha(&mut self, alpha: f64) {
        let alpha = alpha.clamp(1.0, ALPHA_MAX);
        self.freezing_length(|p| p.alpha = alpha);
    }

    fn put_grid(&mut self, grid: Grid) -> Step {
        if self.sdm && !grid.is_rectilinear() {
            return Err("SDM needs a rectilinear grid".into());
        }
        self.grid = grid;
        Ok(())
    }

    fn put_dtype(&mut self, dtype: Dtype) {
        self.dtype = dtype;
        self.dark = self.dark.min(self.imax().sqrt());
        self.y0 = self.y0.min(self.imax());
    }

    fn put_lmin(&mut self, lmin: f64) {
        self.lmin = lmin.max(L_MIN_MIN);
        let vmax = self.vmax();
        let length = self.length();
        self.periods = match &self.periods {
            Periods::Frequencies(v) => Periods::Frequencies(v.mapv(|v| v.min(vmax))),
            Periods::Wavelengths(l) => Periods::Wavelengths(l.mapv(|l| if length / l > vmax { length / vmax } else { l })),
        };
    }

    fn put_gamma(&mut self, gamma: f64) -> Step {
        if !(gamma > 0.0) {
            return Err(format!("gamma must be positive, got {gamma}"));
        }
        self.gamma = gamma.min(GAMMA_MAX);
        Ok(())
    }

    fn put_a(&mut self, a: f64) {
        let amin = self.b() / self.visibility_max();
        let amax = self.imax() - amin;
        let a = a.max(amin).min(amax);
        self.beta = (a / self.imax()).clamp(0.0, 1.0 / (1.0 + self.visibility));
    }

    fn put_b(&mut self, b: f64) {
        let a = self.a();
        let bmax = a.min(self.imax() - a) * self.visibility_max();
        let b = b.clamp(0.0, bmax);
        if a > 0.0 {
            self.visibility = b / a;
        }
    }

    fn put_dark(&mut self, dark: f64) {
        let dark = dark.clamp(0.0, self.imax().sqrt());
        self.dark = (dark - self.quant()).max(0.0);
    }

    fn put_h(&mut self, input: &HueInput) -> Step {
        let h = parse_hues(input)?;
        if self.wdm && !hues::is_monochrome(h.view()) {
            return Err("WDM needs monochrome hues".into());
        }
        self.h = h;
        Ok(())
    }

    pub(super) fn put_hue_count(&mut self, count: usize) {
        if count != self.h() {
            let names = hues::default_hues(count.clamp(1, H_MAX), self.wdm);
            if let Ok(h) = parse_hues(&HueInput::Named(names)) {
                self.h = h;
            }
        }
    }

    /// Resizes `N`, the periods and `f` to `(d, k)`.
    ///
    /// New directions copy the last one; new sets get `N[0, 0]` shifts, the
    /// frequency `L^(1/k)` and `f = 1`.
    fn resize(&mut self, d: usize, k: usize) {
        let (d0, k0) = self.n.dim();
        if (d, k) == (d0, k0) {
            return;
        }
        let length = self.length();
        let grow_k = |a: &Array2<f64>, fill: &dyn Fn(usize) -> f64| {
            Array2::from_shape_fn((a.nrows(), k), |(i, j)| if j < k0 { a[[i, j]] } else { fill(j + 1) })
        };
        let grow_d = |a: Array2<f64>| {
            let last = a.nrows() - 1;
            Array2::from_shape_fn((d, a.ncols()), |(i, j)| a[[i.min(last), j]])
        };

        let n00 = self.n[[0, 0]];
        let n = Array2::from_shape_fn((d0, k), |(i, j)| if j < k0 { self.n[[i, j]] } else { n00 });
        let n = {
            let last = n.nrows() - 1;
            Array2::from_shape_fn((d, k), |(i, j)| n[[i.min(last), j]])
        };

        let v_new = |j: usize| length.powf(1.0 / j as f64);
        self.periods = match &self.periods {
            Periods::Frequencies(v) => {
                let v = if k > k0 { grow_k(v, &v_new) } else { v.slice(s![.., ..k]).to_owned() };
                Periods::Frequencies(if d > d0 { grow_d(v) } else { v.slice(s![..d, ..]).to_owned() })
            }
            Periods::Wavelengths(l) => {
                let l_new = |j: usize| length / v_new(j);
                let l = if k > k0 { grow_k(l, &l_new) } else { l.slice(s![.., ..k]).to_owned() };
                Periods::Wavelengths(if d > d0 { grow_d(l) } else { l.slice(s![..d, ..]).to_owned() })
            }
        };
        let f = if k > k0 { grow_k(&self.f, &|_| 1.0) } else { self.f.slice(s![.., ..k]).to_owned() };
        self.f = if d > d0 { grow_d(f) } else { f.slice(s![..d, ..]).to_owned() };
        self.n = n;
    }

    pub(super) fn put_d(&mut self, d: usize, sink: &mut dyn DiagnosticsSink) {
        let dmax = if self.x == 1 || self.y == 1 { 1 } else { D_MAX };
        let d = d.clamp(1, dmax);
        let d0 = self.d();
        if d == d0 {
            return;
        }
        if d == 1 && self.k() == 1 && self.fdm {
            let _ = self.put_fdm(false, sink);
        }
        self.freezing_length(|p| p.resize(d, p.k()));
        if d < d0 && self.sdm {
            self.sdm = false;
            self.visibility = (self.visibility * d0 as f64).min(self.visibility_max());
        }
        self.reconcile(sink);
    }

    pub(super) fn put_k(&mut self, k: usize, sink: &mut dyn DiagnosticsSink) {
        let kmax = if self.fdm { ((N_MAX - 1) / 2 / self.d()).clamp(1, K_MAX) } else { K_MAX };
        let k = k.clamp(1, kmax);
        if k == self.k() {
            return;
        }
        if self.d() == 1 && k == 1 && self.fdm {
            let _ = self.put_fdm(false, sink);
        }
        self.resize(self.d(), k);
        self.reconcile(sink);
    }

    pub(super) fn put_n(&mut self, values: &Values<i64>, sink: &mut dyn DiagnosticsSink) -> Step {
        let n = values
            .to_matrix(self.d(), self.k(), D_MAX, K_MAX)
            .ok_or_else(|| "malformed value".to_string())?;
        let n = n.mapv(|x| x.clamp(1, N_MAX as i64) as usize);
        self.check_rows(n.nrows())?;
        let n = normalize_shifts(n, self.fdm, self.n_min());
        if self.wdm && n.iter().any(|&x| x != 3) {
            return Err("WDM needs exactly 3 shifts per set".into());
        }
        if self.sdm && !equal_direction_counts(&n) {
            return Err("SDM needs the same number of frames in both directions".into());
        }
        let (d, k) = n.dim();
        self.resize(d, k);
        self.n = n;
        self.reconcile(sink);
        Ok(())
    }

    pub(super) fn put_v(&mut self, input: &PeriodsInput, sink: &mut dyn DiagnosticsSink) -> Step {
        let v = match input {
            PeriodsInput::Strategy(s) => {
                let row = periods::frequencies(*s, self, self.k())?;
                Array2::from_shape_fn((self.d(), row.len()), |(_, j)| row[j])
            }
            PeriodsInput::Values(values) => values
                .to_matrix(self.d(), self.k(), D_MAX, K_MAX)
                .ok_or_else(|| "malformed value".to_string())?,
        };
        self.check_rows(v.nrows())?;
        let vmax = self.vmax();
        let v = v.mapv(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, vmax) });
        let (d, k) = v.dim();
        self.resize(d, k);
        self.periods = Periods::Frequencies(v);
        self.enforce_coprime(sink);
        self.reconcile(sink);
        Ok(())
    }

    pub(super) fn put_l(&mut self, input: &PeriodsInput, sink: &mut dyn DiagnosticsSink) -> Step {
        let l = match input {
            PeriodsInput::Strategy(s) => {
                let row = match periods::wavelengths(*s, self, self.k()) {
                    Ok(row) => row,
                    Err(reason) => {
                        sink.warn("params", format!("{reason}, falling back to close wavelengths"));
                        periods::wavelengths(Strategy::Close, self, self.k())?
                    }
                };
                Array2::from_shape_fn((self.d(), row.len()), |(_, j)| row[j])
            }
            PeriodsInput::Values(values) => values
                .to_matrix(self.d(), self.k(), D_MAX, K_MAX)
                .ok_or_else(|| "malformed value".to_string())?,
        };
        self.check_rows(l.nrows())?;
        let length = self.length();
        let lmin = self.lmin;
        let l = l.mapv(|l| if l.is_nan() || l <= 0.0 { f64::INFINITY } else { l.max(lmin) });
        let (d, k) = l.dim();
        self.resize(d, k);
        self.periods = if l.iter().all(|l| l.is_finite()) {
            Periods::Wavelengths(l)
        } else {
            Periods::Frequencies(l.mapv(|l| length / l))
        };
        self.enforce_coprime(sink);
        self.reconcile(sink);
        Ok(())
    }

    pub(super) fn put_f(&mut self, values: &Values<f64>, sink: &mut dyn DiagnosticsSink) -> Step {
        let f = values
            .to_matrix(self.d(), self.k(), D_MAX, K_MAX)
            .ok_or_else(|| "malformed value".to_string())?;
        self.check_rows(f.nrows())?;
        let (d, k) = f.dim();
        self.resize(d, k);
        self.f = f;
        self.reconcile(sink);
        Ok(())
    }

    fn check_rows(&self, d: usize) -> Step {
        if self.sdm && d != 2 {
            return Err("SDM needs two directions".into());
        }
        Ok(())
    }

    fn put_static(&mut self, on: bool, sink: &mut dyn DiagnosticsSink) {
        self.static_ = on;
        if self.fdm {
            self.enforce_coprime(sink);
            self.reconcile(sink);
        }
    }

    pub(super) fn put_sdm(&mut self, on: bool) -> Step {
        if on == self.sdm {
            return Ok(());
        }
        if on {
            if self.d() != 2 {
                return Err("SDM needs two directions".into());
            }
            if !self.grid.is_rectilinear() {
                return Err("SDM needs a rectilinear grid".into());
            }
            if self.fdm {
                return Err("SDM and FDM exclude each other".into());
            }
            if !equal_direction_counts(&self.n) {
                return Err("SDM needs the same number of frames in both directions".into());
            }
            self.sdm = true;
            self.visibility = (self.visibility / self.d() as f64).min(self.visibility_max());
        } else {
            self.sdm = false;
            self.visibility = (self.visibility * self.d() as f64).min(self.visibility_max());
        }
        Ok(())
    }

    pub(super) fn put_wdm(&mut self, on: bool) -> Step {
        if on && !self.wdm {
            if self.n.iter().any(|&n| n != 3) {
                return Err("WDM needs exactly 3 shifts per set".into());
            }
            if !self.is_monochrome() {
                return Err("WDM needs monochrome hues".into());
            }
            if self.fdm {
                return Err("WDM and FDM exclude each other".into());
            }
        }
        self.wdm = on;
        Ok(())
    }

    pub(super) fn put_fdm(&mut self, on: bool, sink: &mut dyn DiagnosticsSink) -> Step {
        if on == self.fdm {
            return Ok(());
        }
        let factor = (self.d() * self.k()) as f64;
        if on {
            if self.d() * self.k() < 2 {
                return Err("FDM needs more than one set".into());
            }
            if self.sdm || self.wdm {
                return Err("FDM excludes SDM and WDM".into());
            }
            self.fdm = true;
            self.n = Array2::from_elem(self.n.dim(), self.n[[0, 0]]);
            // forces the temporal frequencies to be re-derived
            self.f = Array2::zeros(self.f.dim());
            self.visibility /= factor;
            self.enforce_coprime(sink);
            self.reconcile(sink);
        } else {
            self.fdm = false;
            self.f = Array2::ones(self.f.dim());
            self.visibility = (self.visibility * factor).min(self.visibility_max());
            self.reconcile(sink);
        }
        Ok(())
    }

    /// Static FDM shifts every set by its own period, which needs pairwise coprime integer frequencies.
    fn enforce_coprime(&mut self, sink: &mut dyn DiagnosticsSink) {
        if !(self.fdm && self.static_) {
            return;
        }
        let v = self.v();
        let ints = v.iter().all(|&x| x > 0.0 && x.fract() == 0.0);
        let coprime = ints && {
            let values: Vec<u64> = v.iter().map(|&x| x as u64).collect();
            values.iter().enumerate().all(|(i, &a)| {
                values[i + 1..].iter().all(|&b| num_integer::Integer::gcd(&a, &b) == 1)
            })
        };
        if coprime {
            return;
        }
        let lower = 10u64.min((self.vmax() / 2.0).floor() as u64);
        let primes = coprime_frequencies(lower, self.d() * self.k());
        let mut v = Array2::from_shape_vec(self.n.dim(), primes).unwrap_or_else(|_| v.clone());
        for mut row in v.axis_iter_mut(Axis(0)) {
            let mut sorted = row.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            row.assign(&ndarray::Array1::from(sorted));
        }
        sink.warn("params", format!("periods were not coprime, changed to {v}"));
        self.periods = Periods::Frequencies(v);
    }

    /// Restores the rules tying `f` and `N` to the multiplex mode and clamps intensities.
    pub(super) fn reconcile(&mut self, sink: &mut dyn DiagnosticsSink) {
        if self.fdm && self.d() * self.k() < 2 {
            sink.info("params", "FDM switched off, a single set cannot be multiplexed".into());
            self.fdm = false;
            self.f = Array2::ones(self.f.dim());
        }
        let fmax = self.f_max();
        let mut f = self.f.mapv(|f| f.clamp(-fmax, fmax));
        for (fi, &ni) in f.iter_mut().zip(self.n.iter()) {
            if *fi % ni as f64 == 0.0 {
                *fi = 1.0;
            }
        }
        if self.fdm {
            if self.static_ {
                f = self.v();
            } else {
                let ints = f.iter().all(|x| x.fract() == 0.0);
                let mut abs: Vec<u64> = f.iter().map(|x| x.abs() as u64).collect();
                abs.sort_unstable();
                abs.dedup();
                if !ints || abs.len() < f.len() {
                    let k = self.k();
                    f = Array2::from_shape_fn(self.n.dim(), |(i, j)| (i * k + j + 1) as f64);
                }
            }
        }
        if f != self.f {
            sink.debug("params", format!("f = {f}"));
            self.f = f;
        }

        let n = normalize_shifts(self.n.clone(), self.fdm, self.n_min());
        if n != self.n {
            sink.debug("params", format!("N = {n}"));
            self.n = n;
        }

        self.visibility = self.visibility.clamp(0.0, self.visibility_max());
        self.beta = self.beta.clamp(0.0, 1.0 / (1.0 + self.visibility));
    }
}

/// Clips shift counts and makes sure every direction has a set with at least 3 shifts.
fn normalize_shifts(mut n: Array2<usize>, fdm: bool, n_min: usize) -> Array2<usize> {
    let ftm = n.ncols() == 1 && n.iter().all(|&x| x == 1);
    if ftm && !fdm {
        return n;
    }
    let lower = if fdm { n_min.clamp(N_MIN, N_MAX) } else { 2 };
    n.mapv_inplace(|x| x.clamp(lower, N_MAX));
    for mut row in n.axis_iter_mut(Axis(0)) {
        if !row.iter().any(|&x| x >= N_MIN) {
            let (i, _) = row
                .iter()
                .enumerate()
                .fold((0, 0), |(bi, bx), (i, &x)| if x > bx { (i, x) } else { (bi, bx) });
            row[i] = N_MIN;
        }
    }
    if fdm {
        let n00 = n[[0, 0]];
        n.fill(n00);
    }
    n
}

fn equal_direction_counts(n: &Array2<usize>) -> bool {
    let sums: Vec<usize> = n.axis_iter(Axis(0)).map(|row| row.sum()).collect();
    sums.windows(2).all(|w| w[0] == w[1])
}
