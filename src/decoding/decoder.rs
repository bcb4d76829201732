use super::kernel::{DecoderKernel, KernelInput};
use super::types::{DecodeOptions, DecodedField};
use super::unwrap::SpatialUnwrapper;
use super::{filters, uncertainty};
use crate::coding::{color, grid, multiplex, FramePattern};
use crate::diagnostics::{DiagnosticsSink, StageTimer};
use crate::error::{FringesError, Result};
use crate::params::Params;
use ndarray::{s, Array2, Array4, Axis};
use std::f64::consts::PI;

/// Averages repeated recordings of the sequence.
fn average(data: Array4<f64>, t: usize) -> Array4<f64> {
    let reps = data.len_of(Axis(0)) / t;
    if reps <= 1 {
        return data;
    }
    let (_, y, x, c) = data.dim();
    let mut sum = Array4::zeros((t, y, x, c));
    for r in 0..reps {
        sum += &data.slice(s![r * t..(r + 1) * t, .., .., ..]);
    }
    sum / reps as f64
}

fn check_channels(p: &Params, channels: usize) -> Result<()> {
    if p.wdm() && channels != 3 {
        return Err(FringesError::Shape(format!("WDM needs 3 color channels, got {channels}")));
    }
    if channels != 1 && channels != 3 {
        return Err(FringesError::Shape(format!("expected 1 or 3 color channels, got {channels}")));
    }
    Ok(())
}

/// Decodes acquired frames `(T, Y, X, C)` into coordinates.
///
/// The frame count must be a multiple of `T`; repeated sequences are averaged.
/// The camera image size is independent of the pattern size.
pub fn decode(
    p: &Params,
    frames: &FramePattern,
    opts: DecodeOptions,
    kernel: &dyn DecoderKernel,
    unwrapper: &dyn SpatialUnwrapper,
    sink: &mut dyn DiagnosticsSink,
) -> Result<DecodedField> {
    let timer = StageTimer::start("decode");
    let (count, _, _, channels) = frames.dim();
    let t = p.t();
    if count == 0 || count % t != 0 {
        return Err(FringesError::FrameCount { frames: count, expected: t });
    }
    check_channels(p, channels)?;

    let mut data = average(frames.to_f64(), t);
    if count > t {
        sink.info("decode", format!("averaged {} sequences", count / t));
    }
    let y0 = p.y0();
    if y0 > 0.0 {
        data.mapv_inplace(|v| (v - y0).max(0.0));
    }

    let colored = p.h() > 1 || !p.is_monochrome();
    if colored {
        data = color::decolorize(&data, p.hues());
    }
    if p.sdm() || p.wdm() || p.fdm() {
        data = multiplex::demultiplex(p, data, sink);
    }
    let expected = p.n().sum();
    if data.len_of(Axis(0)) != expected {
        return Err(FringesError::Shape(format!("{} base frames, expected {expected}", data.len_of(Axis(0)))));
    }
    if p.n().iter().any(|&n| n == 1) {
        sink.warn("decode", "sets with a single shift can't be demodulated by phase shifting".into());
    }

    let umr = p.umr();
    let x0 = p.x0();
    let centers: Vec<f64> = grid::ranges(&grid::coordinates(p))
        .into_iter()
        .map(|(lo, hi)| x0 + (lo + hi) / 2.0)
        .collect();
    let v = p.v();
    let f = p.f_signed();
    let input = KernelInput {
        frames: data.view(),
        n: p.n(),
        v: v.view(),
        f: f.view(),
        length: p.length(),
        umr: umr.view(),
        x0,
        p0: p.p0(),
        bias: (p.a() - y0).max(0.0),
        vmin: p.vmin(),
        centers: &centers,
    };
    let kernel_timer = StageTimer::start("demodulate");
    let mut out = kernel.demodulate(&input);
    kernel_timer.finish(sink);

    if colored && out.brightness.len_of(Axis(3)) == 3 {
        for (ch, black) in color::black_channels(p.hues()).into_iter().enumerate() {
            if black {
                out.brightness.index_axis_mut(Axis(3), ch).fill(0.0);
                out.modulation.index_axis_mut(Axis(3), ch).fill(0.0);
                out.registration.index_axis_mut(Axis(3), ch).fill(f64::NAN);
            }
        }
    }

    let mut reg = out.registration;
    let ambiguous = p.ambiguous_directions();
    if ambiguous.iter().any(|&a| a) {
        sink.warn("decode", format!("coding is ambiguous (UMR {umr} < R·alpha), unwrapping spatially"));
        for (d, _) in ambiguous.iter().enumerate().filter(|(_, &a)| a) {
            unwrap_direction(p, d, umr[d], &mut reg, &out.modulation, unwrapper);
        }
    } else {
        grid::to_pixels(p, &mut reg);
    }

    if opts.despike {
        filter_planes(&mut reg, filters::despike);
    }
    if opts.denoise {
        filter_planes(&mut reg, filters::denoise);
    }

    let mut field = DecodedField {
        brightness: out.brightness,
        modulation: out.modulation,
        registration: reg,
        residuals: None,
        phase: None,
        orders: None,
        uncertainty: None,
        visibility: None,
        exposure: None,
    };
    if opts.verbose {
        field.uncertainty = Some(uncertainty::uncertainty(p, &field.brightness, &field.modulation));
        field.visibility = Some(uncertainty::visibility(&field.brightness, &field.modulation, p.k()));
        field.exposure = Some(uncertainty::exposure(&field.brightness, frames.dtype().imax()));
        field.orders = Some(uncertainty::orders(p, &field.registration));
        field.residuals = Some(out.residuals);
        field.phase = Some(out.phase);
    }
    timer.finish(sink);
    Ok(field)
}

/// Unwraps direction `d` in space, in units of its unambiguous range.
fn unwrap_direction(
    p: &Params,
    d: usize,
    umr: f64,
    reg: &mut Array4<f64>,
    modulation: &Array4<f64>,
    unwrapper: &dyn SpatialUnwrapper,
) {
    let k = p.k();
    let x0 = p.x0();
    let (_, y, x, c) = reg.dim();
    for ch in 0..c {
        let mut phase = reg
            .index_axis(Axis(0), d)
            .index_axis(Axis(2), ch)
            .mapv(|r| 2.0 * PI * (r + x0).rem_euclid(umr) / umr);
        let quality = Array2::from_shape_fn((y, x), |(i, j)| {
            (0..k).map(|ki| modulation[[d * k + ki, i, j, ch]]).filter(|b| b.is_finite()).sum::<f64>()
        });
        unwrapper.unwrap(&mut phase, quality.view());

        let mut unwrapped = phase.mapv(|ph| ph * umr / (2.0 * PI));
        let min = unwrapped.iter().filter(|v| v.is_finite()).fold(f64::INFINITY, |m, &v| m.min(v));
        if min.is_finite() && min < 0.0 {
            unwrapped.mapv_inplace(|v| v - min);
        }
        reg.index_axis_mut(Axis(0), d).index_axis_mut(Axis(2), ch).assign(&unwrapped);
    }
}

fn filter_planes(reg: &mut Array4<f64>, filter: fn(&Array2<f64>) -> Array2<f64>) {
    let (d, _, _, c) = reg.dim();
    for di in 0..d {
        for ch in 0..c {
            let plane = reg.index_axis(Axis(0), di).index_axis(Axis(2), ch).to_owned();
            let filtered = filter(&plane);
            reg.index_axis_mut(Axis(0), di).index_axis_mut(Axis(2), ch).assign(&filtered);
        }
    }
}

/// Linearizes recorded frames with a gamma estimated from their median.
///
/// A linear response puts the median of a fringe sequence at half the range,
/// so `gamma = ln(median) / ln(0.5)` and every value is raised to `1 / gamma`.
/// Frames whose median is 0, 1 or undefined come back unchanged.
pub fn gamma_auto_correct(frames: &FramePattern) -> Array4<f64> {
    let imax = frames.dtype().imax();
    let mut data = frames.to_f64();
    let mut values: Vec<f64> = data.iter().map(|v| v / imax).filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return data;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 1 { values[mid] } else { (values[mid - 1] + values[mid]) / 2.0 };
    if !(median > 0.0 && median < 1.0) {
        return data;
    }
    let inv = 0.5f64.ln() / median.ln();
    data.mapv_inplace(|v| if v.is_nan() { v } else { (v / imax).max(0.0).powf(inv) * imax });
    data
}
