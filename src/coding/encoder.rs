use super::color::hue_scale;
use super::multiplex::{self, Shift};
use super::types::{EncodeOptions, FramePattern};
use super::{grid, simulate};
use crate::diagnostics::{DiagnosticsSink, StageTimer};
use crate::error::Result;
use crate::params::hues::is_plain;
use crate::params::Params;
use ndarray::{Array2, Array3, Array4, Axis};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::f64::consts::PI;

/// Frame indices taken modulo `t`, first occurrence kept.
pub fn select(frames: Option<&[i64]>, t: usize) -> Vec<usize> {
    match frames {
        None => (0..t).collect(),
        Some(frames) => {
            let mut seen = HashSet::new();
            frames
                .iter()
                .map(|&i| i.rem_euclid(t.max(1) as i64) as usize)
                .filter(|i| seen.insert(*i))
                .collect()
        }
    }
}

/// Everything needed to modulate a single base frame.
struct Modulator {
    v: Array2<f64>,
    f: Array2<f64>,
    n: Array2<usize>,
    length: f64,
    x0: f64,
    p0: f64,
    imax: f64,
    beta: f64,
    visibility: f64,
    gamma: f64,
}

impl Modulator {
    fn new(p: &Params) -> Self {
        Self {
            v: p.v(),
            f: p.f_signed(),
            n: p.n().to_owned(),
            length: p.length(),
            x0: p.x0(),
            p0: p.p0(),
            imax: p.imax(),
            beta: p.beta(),
            visibility: p.visibility(),
            gamma: p.gamma(),
        }
    }

    /// `I = Imax·(beta·(1 + V·cos(2π·v·x/L − 2π·f·t − p0)))^gamma`
    fn frame(&self, xi: &Array3<f64>, s: Shift) -> Array2<f64> {
        let (_, y, x) = xi.dim();
        let count = self.n[[s.d, s.k]];
        // two shifts are a quarter period apart
        let t = if count == 2 { s.n as f64 / 4.0 } else { s.n as f64 / count as f64 };
        let k = 2.0 * PI * self.v[[s.d, s.k]] / self.length;
        let w = 2.0 * PI * self.f[[s.d, s.k]] * t + self.p0;
        let coords = xi.index_axis(Axis(0), s.d);

        let mut out = Array2::zeros((y, x));
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                for j in 0..x {
                    let c = coords[[i, j]];
                    let value = self.beta * (1.0 + self.visibility * (k * (c + self.x0) - w).cos());
                    row[j] = self.imax * value.powf(self.gamma);
                }
            });
        out
    }
}

/// Encodes the selected frames `(T, Y, X, C)` of the configured sequence.
///
/// Only the base frames the selection depends on are modulated.
pub fn encode(p: &Params, opts: &EncodeOptions, sink: &mut dyn DiagnosticsSink) -> Result<FramePattern> {
    let timer = StageTimer::start("encode");
    let xi = match &opts.coordinates {
        Some(xi) => {
            grid::check(p, xi)?;
            xi.clone()
        }
        None => grid::coordinates(p),
    };
    multiplex::check_nyquist(p, sink);

    let selection = select(opts.frames.as_deref(), p.t());
    let groups = multiplex::groups(p);
    let per_hue = groups.len().max(1);
    let shifts = multiplex::shifts(p.n());

    let needed: BTreeSet<usize> = selection
        .iter()
        .flat_map(|&t| groups[t % per_hue].channels.iter().flatten().copied())
        .collect();
    let modulator = Modulator::new(p);
    let base: HashMap<usize, Array2<f64>> = needed
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|i| (i, modulator.frame(&xi, shifts[i])))
        .collect();

    let (_, y, x) = xi.dim();
    let c = p.c();
    let bias = p.a();
    let hues = p.hues();
    let plain = is_plain(hues);
    let mut out = Array4::zeros((selection.len(), y, x, c));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut frame)| {
            let t = selection[i];
            let group = &groups[t % per_hue];
            let hue = t / per_hue;
            for ch in 0..c {
                let members = &group.channels[if group.channels.len() == c { ch } else { 0 }];
                let scale = if plain { 1.0 } else { hue_scale(hues, hue, ch) };
                multiplex::stack(members, &base, bias, scale, frame.index_axis_mut(Axis(2), ch));
            }
        });

    let mut pattern = FramePattern::from_f64(out, p.dtype(), opts.rint);
    if let Some(seed) = opts.simulate {
        pattern = simulate::simulate(&pattern, p, seed);
    }
    sink.debug("encode", format!("{} of {} frames, shape {:?}", selection.len(), p.t(), pattern.dim()));
    timer.finish(sink);
    Ok(pattern)
}
