use crate::decoding::{DecoderKernel, KernelInput, KernelOutput, PhaseShiftKernel};
use crate::diagnostics::EventLog;
use crate::fringes::Fringes;
use crate::params::{Params, Update, Values};
use crate::{DecodeOptions, EncodeOptions};
use approx::assert_abs_diff_eq;
use ndarray::{s, Axis};
use std::sync::atomic::{AtomicUsize, Ordering};

fn small(f: &mut Fringes<'_>) {
    f.set_y(48).set_x(64).set_v(vec![1.0, 5.0, 8.0]);
}

#[test]
fn test_setters_chain() {
    println!("\n--- Test: Setters ---");
    let mut f = Fringes::new();
    small(&mut f);
    f.set_n(Values::Scalar(5)).set_gamma(2.2);
    assert_eq!((f.params().y(), f.params().x()), (48, 64));
    assert_eq!(f.params().v()[[1, 2]], 8.0);
    assert_eq!(f.t(), 30);
    assert_eq!(f.len(), 30);
    assert!(!f.is_empty());
    assert_abs_diff_eq!(f.params().gamma(), 2.2);
    println!("  [PASSED] T = {}", f.t());
}

#[test]
fn test_rejections_are_reported() {
    println!("\n--- Test: Rejected Update ---");
    let mut log = EventLog::new();
    {
        let mut f = Fringes::with_sink(&mut log);
        f.set_y(64);
        let rejected = f.update(&Update { wdm: Some(true), x: Some(100), ..Update::default() });
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].field, "WDM");
        assert!(!f.params().wdm());
        assert_eq!(f.params().x(), 100);
    }
    assert!(log.warnings().count() >= 1);
    println!("  [PASSED] {} events", log.events.len());
}

#[test]
fn test_frames_iterate_the_sequence() {
    let mut f = Fringes::new();
    small(&mut f);
    f.set_t(6);
    let all = f.encode(&EncodeOptions::default()).unwrap().to_f64();
    let frames = f.frames();
    assert_eq!(frames.len(), 6);
    for (i, frame) in frames.enumerate() {
        let frame = frame.unwrap().to_f64();
        assert_eq!(frame.dim(), (1, 48, 64, 1));
        assert_eq!(frame.index_axis(Axis(0), 0), all.index_axis(Axis(0), i));
    }
    let last = f.frame(-1).unwrap().to_f64();
    assert_eq!(last.slice(s![0, .., .., ..]), all.slice(s![5, .., .., ..]));
}

#[test]
fn test_encode_decode_round_trip() {
    println!("\n--- Test: Facade Round Trip ---");
    let mut f = Fringes::new();
    small(&mut f);
    let frames = f.encode(&EncodeOptions::default()).unwrap();
    let field = f.decode(&frames, DecodeOptions::default()).unwrap();
    let xi = f.coordinates();
    let err = field
        .registration
        .index_axis(Axis(3), 0)
        .iter()
        .zip(xi.iter())
        .map(|(r, x)| (r - x).abs())
        .fold(0.0, f64::max);
    assert!(err < 0.1, "max error {err}");
    assert!(field.uncertainty.is_none());

    f.set_verbose(true);
    let field = f.decode(&frames, DecodeOptions::default()).unwrap();
    assert!(field.uncertainty.is_some());
    println!("  [PASSED] max error {err:.4} px");
}

#[test]
fn test_source_and_surface() {
    let mut f = Fringes::new();
    small(&mut f);
    let frames = f.encode(&EncodeOptions::default()).unwrap();
    let field = f.decode(&frames, DecodeOptions::default()).unwrap();

    let src = f.source(&field.registration, None, 1.0).unwrap();
    assert!(src.iter().all(|&s| s == 1.0));
    let bright = f.brightfield(&src, 0.1, 3);
    assert_eq!(bright.dim(), (1, 48, 64, 1));
    assert!(bright.to_f64().iter().all(|&v| v == 255.0));
    assert!(f.darkfield(&src, 0.1, 3).to_f64().iter().all(|&v| v == 0.0));

    let c = f.curvature(&field.registration).unwrap();
    assert!(c.iter().skip(65).all(|v| v.abs() < 0.1));
}

#[test]
fn test_deinterlace_and_simulate() {
    let mut f = Fringes::new();
    small(&mut f);
    f.set_t(4);
    let frames = f.encode(&EncodeOptions::default()).unwrap();
    assert!(f.deinterlace(&frames).is_ok());

    f.set_gain(0.5);
    let a = f.simulate(&frames, 7).to_f64();
    let b = f.simulate(&frames, 7).to_f64();
    assert_eq!(a, b);
    assert_ne!(a, frames.to_f64());
}

#[test]
fn test_reset() {
    let mut log = EventLog::new();
    {
        let mut f = Fringes::with_sink(&mut log);
        small(&mut f);
        f.reset();
        assert_eq!(f.params().to_update(), Params::default().to_update());
    }
    assert!(log.contains("params"));
}

#[test]
fn test_save_load() {
    println!("\n--- Test: Facade Save / Load ---");
    let path = std::env::temp_dir().join(format!("fringes_{}_facade.json", std::process::id()));
    let mut f = Fringes::new();
    small(&mut f);
    f.set_p0(0.5).set_reverse(true);
    f.save(&path).unwrap();

    let mut g = Fringes::new();
    g.load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(g.params().to_update(), f.params().to_update());
    assert!(g.load("/nonexistent/fringes.json").is_err());
    println!("  [PASSED] loaded T = {}", g.t());
}

#[test]
fn test_optimize() {
    let mut f = Fringes::new();
    let rejected = f.optimize(Some(24), None);
    assert!(rejected.is_empty());
    assert_eq!(f.params().k(), 4);
    assert_eq!(f.t(), 24);
}

struct Counting<'a>(&'a AtomicUsize);

impl DecoderKernel for Counting<'_> {
    fn demodulate(&self, input: &KernelInput<'_>) -> KernelOutput {
        self.0.fetch_add(1, Ordering::SeqCst);
        PhaseShiftKernel.demodulate(input)
    }
}

#[test]
fn test_custom_kernel() {
    println!("\n--- Test: Injected Kernel ---");
    let calls = AtomicUsize::new(0);
    let mut f = Fringes::new().with_kernel(Counting(&calls));
    small(&mut f);
    let frames = f.encode(&EncodeOptions::default()).unwrap();
    f.decode(&frames, DecodeOptions::default()).unwrap();
    f.decode(&frames, DecodeOptions::default()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    println!("  [PASSED] kernel called {} times", calls.load(Ordering::SeqCst));
}
