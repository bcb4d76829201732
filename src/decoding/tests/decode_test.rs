use crate::coding::grid::coordinates;
use crate::coding::{encode, EncodeOptions, FramePattern};
use crate::decoding::{decode, DecodeOptions, DecodedField, PhaseShiftKernel, QualityGuided};
use crate::diagnostics::EventLog;
use crate::error::FringesError;
use crate::params::{Grid, Params, PeriodsInput, Update, Values};
use approx::assert_abs_diff_eq;
use ndarray::{concatenate, s, Array3, Axis};
use std::f64::consts::PI;

fn small(update: Update) -> Params {
    let base = Update { y: Some(48), x: Some(64), v: Some(PeriodsInput::from(vec![1.0, 5.0, 8.0])), ..Update::default() };
    let p = Params::default().apply(&base).unwrap();
    p.apply(&update).unwrap_or_else(|e| e.params)
}

fn run(p: &Params, frames: &FramePattern, opts: DecodeOptions, log: &mut EventLog) -> DecodedField {
    decode(p, frames, opts, &PhaseShiftKernel, &QualityGuided, log).unwrap()
}

fn roundtrip(p: &Params, opts: DecodeOptions) -> (DecodedField, Array3<f64>) {
    let mut log = EventLog::new();
    let frames = encode(p, &EncodeOptions::default(), &mut log).unwrap();
    (run(p, &frames, opts, &mut log), coordinates(p))
}

/// Largest deviation of channel `ch` from the expected coordinates.
fn max_error(field: &DecodedField, xi: &Array3<f64>, ch: usize) -> f64 {
    let reg = field.registration.index_axis(Axis(3), ch);
    reg.iter().zip(xi.iter()).map(|(r, x)| (r - x).abs()).fold(0.0, f64::max)
}

#[test]
fn test_default_roundtrip() {
    println!("\n--- Test: Decode Round Trip ---");
    let p = small(Update::default());
    assert!(!p.is_ambiguous());
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    assert_eq!(field.registration.dim(), (2, 48, 64, 1));
    assert_eq!(field.modulation.dim(), (6, 48, 64, 1));
    assert!(field.residuals.is_none());
    let err = max_error(&field, &xi, 0);
    assert!(err < 0.1, "max error {err}");
    println!("  [PASSED] max error {err:.4} px");
}

#[test]
fn test_one_direction() {
    let p = small(Update { d: Some(1), ..Update::default() });
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    assert_eq!(field.registration.dim(), (1, 48, 64, 1));
    assert!(max_error(&field, &xi, 0) < 0.1);
}

#[test]
fn test_extended_coding_range() {
    println!("\n--- Test: alpha > 1 ---");
    let p = small(Update { alpha: Some(1.2), v: Some(PeriodsInput::from(vec![1.0, 5.0, 8.0])), ..Update::default() });
    assert!(p.x0() > 0.0);
    assert!(!p.is_ambiguous());
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    let err = max_error(&field, &xi, 0);
    assert!(err < 0.1, "max error {err}");
    println!("  [PASSED] x0 = {}, max error {err:.4} px", p.x0());
}

#[test]
fn test_hues_match_monochrome() {
    println!("\n--- Test: Hue Fusion ---");
    let mono = small(Update::default());
    let (plain, xi) = roundtrip(&mono, DecodeOptions::default());
    let p = small(Update { h: Some("rggb".into()), ..Update::default() });
    let (field, _) = roundtrip(&p, DecodeOptions::default());
    assert_eq!(field.registration.dim(), (2, 48, 64, 3));
    for ch in 0..3 {
        assert!(max_error(&field, &xi, ch) < 0.1);
        let diff = field
            .registration
            .index_axis(Axis(3), ch)
            .iter()
            .zip(plain.registration.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(diff < 0.1);
    }
    println!("  [PASSED] every channel within 0.1 px");
}

#[test]
fn test_black_channels_are_invalid() {
    let p = small(Update { h: Some("r".into()), ..Update::default() });
    assert_eq!(p.c(), 3);
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    assert!(max_error(&field, &xi, 0) < 0.1);
    assert!(field.registration.index_axis(Axis(3), 1).iter().all(|v| v.is_nan()));
    assert!(field.brightness.index_axis(Axis(3), 2).iter().all(|&v| v == 0.0));
}

#[test]
fn test_wdm_roundtrip() {
    println!("\n--- Test: WDM Round Trip ---");
    let p = small(Update { n: Some(Values::Scalar(3)), wdm: Some(true), ..Update::default() });
    assert!(p.wdm());
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    let err = max_error(&field, &xi, 0);
    assert!(err < 0.1, "max error {err}");
    println!("  [PASSED] T = {}, max error {err:.4} px", p.t());
}

#[test]
fn test_fdm_roundtrip() {
    println!("\n--- Test: FDM Round Trip ---");
    let p = small(Update { fdm: Some(true), ..Update::default() });
    assert!(p.fdm());
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    let err = max_error(&field, &xi, 0);
    assert!(err < 0.5, "max error {err}");
    println!("  [PASSED] T = {}, max error {err:.4} px", p.t());
}

#[test]
fn test_sdm_roundtrip() {
    println!("\n--- Test: SDM Round Trip ---");
    let p = small(Update { sdm: Some(true), ..Update::default() });
    assert!(p.sdm());
    assert_eq!(p.t(), 12);
    let (field, xi) = roundtrip(&p, DecodeOptions::default());
    assert_eq!(field.registration.dim(), (2, 48, 64, 1));
    let err = max_error(&field, &xi, 0);
    assert!(err < 0.1, "max error {err}");
    println!("  [PASSED] T = {}, max error {err:.4} px", p.t());
}

#[test]
fn test_cartesian_back_to_pixels() {
    let p = small(Update { grid: Some(Grid::Cartesian), ..Update::default() });
    let (field, _) = roundtrip(&p, DecodeOptions::default());
    for ((d, i, j, _), &r) in field.registration.indexed_iter() {
        let expected = if d == 0 { j as f64 } else { i as f64 };
        assert_abs_diff_eq!(r, expected, epsilon = 0.1);
    }
}

#[test]
fn test_ambiguous_coding_unwraps_spatially() {
    println!("\n--- Test: Spatial Unwrapping ---");
    let p = small(Update { y: Some(8), d: Some(1), k: Some(1), v: Some(PeriodsInput::from(4.0)), ..Update::default() });
    assert!(p.is_ambiguous());
    let mut log = EventLog::new();
    let frames = encode(&p, &EncodeOptions::default(), &mut log).unwrap();
    log.clear();
    let field = run(&p, &frames, DecodeOptions::default(), &mut log);
    assert!(log.warnings().any(|e| e.message.contains("ambiguous")));
    for ((_, _, j, _), &r) in field.registration.indexed_iter() {
        assert_abs_diff_eq!(r, j as f64, epsilon = 0.1);
    }
    println!("  [PASSED] continuous registration beyond one period");
}

#[test]
fn test_verbose_outputs() {
    println!("\n--- Test: Verbose Decode ---");
    let p = small(Update::default());
    let opts = DecodeOptions { verbose: true, ..DecodeOptions::default() };
    let (field, _) = roundtrip(&p, opts);

    let visibility = field.visibility.as_ref().unwrap();
    assert_eq!(visibility.dim(), (6, 48, 64, 1));
    assert!(visibility.iter().all(|&v| (v - 1.0).abs() < 0.02));
    let exposure = field.exposure.as_ref().unwrap();
    assert!(exposure.iter().all(|&e| (e - 0.5).abs() < 0.01));
    let u = field.uncertainty.as_ref().unwrap();
    assert_eq!(u.dim(), (2, 48, 64, 1));
    assert!(u.iter().all(|&u| u > 0.0 && u < 0.1));
    let phase = field.phase.as_ref().unwrap();
    assert!(phase.iter().all(|&ph| (0.0..=2.0 * PI).contains(&ph)));
    let orders = field.orders.as_ref().unwrap();
    // the first set spans the whole pattern with a single period
    assert_eq!(orders[[0, 10, 30, 0]], 0.0);
    assert_eq!(orders[[2, 0, 63, 0]], 7.0);
    assert!(field.residuals.as_ref().unwrap().iter().all(|&r| r < 1.0));
    println!("  [PASSED] residuals, phase, orders, uncertainty, visibility, exposure");
}

#[test]
fn test_minimum_visibility() {
    let low = small(Update { visibility: Some(0.3), vmin: Some(0.5), ..Update::default() });
    let (field, _) = roundtrip(&low, DecodeOptions::default());
    assert!(field.registration.iter().all(|v| v.is_nan()));

    let ok = small(Update { visibility: Some(0.3), vmin: Some(0.2), ..Update::default() });
    let (field, xi) = roundtrip(&ok, DecodeOptions::default());
    assert!(max_error(&field, &xi, 0) < 0.1);
}

#[test]
fn test_frame_count() {
    println!("\n--- Test: Frame Count ---");
    let p = small(Update::default());
    let mut log = EventLog::new();
    let frames = encode(&p, &EncodeOptions::default(), &mut log).unwrap();
    let FramePattern::U8(data) = &frames else { panic!("expected u8 frames") };

    let short = FramePattern::U8(data.slice(s![1.., .., .., ..]).to_owned());
    let err = decode(&p, &short, DecodeOptions::default(), &PhaseShiftKernel, &QualityGuided, &mut log).unwrap_err();
    assert!(matches!(err, FringesError::FrameCount { frames: 23, expected: 24 }));

    let twice = FramePattern::U8(concatenate(Axis(0), &[data.view(), data.view()]).unwrap());
    log.clear();
    let averaged = run(&p, &twice, DecodeOptions::default(), &mut log);
    let single = run(&p, &frames, DecodeOptions::default(), &mut log);
    assert_eq!(averaged.registration, single.registration);
    assert!(log.events.iter().any(|e| e.message.contains("averaged 2 sequences")));
    println!("  [PASSED] mismatch rejected, repeats averaged");
}

#[test]
fn test_despike_keeps_clean_maps() {
    let p = small(Update::default());
    let opts = DecodeOptions { despike: true, ..DecodeOptions::default() };
    let (field, xi) = roundtrip(&p, opts);
    assert!(max_error(&field, &xi, 0) < 0.1);
}

#[test]
fn test_dark_signal_is_removed() {
    let p = small(Update { y0: Some(10.0), beta: Some(0.4), ..Update::default() });
    let mut log = EventLog::new();
    let frames = encode(&p, &EncodeOptions::default(), &mut log).unwrap();
    let lifted = FramePattern::from_f64(frames.to_f64().mapv(|v| v + 10.0), p.dtype(), true);
    let field = run(&p, &lifted, DecodeOptions::default(), &mut log);
    assert!(max_error(&field, &coordinates(&p), 0) < 0.1);
    assert!(field.brightness.iter().all(|&a| (a - 102.0).abs() < 1.0));
}
