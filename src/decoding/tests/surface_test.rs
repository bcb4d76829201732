use crate::coding::{encode, EncodeOptions, FramePattern};
use crate::decoding::{curvature, decode, gamma_auto_correct, height, DecodeOptions, PhaseShiftKernel, QualityGuided};
use crate::diagnostics::EventLog;
use crate::params::{Params, PeriodsInput, Update};
use approx::assert_abs_diff_eq;
use ndarray::{s, Array1, Array4};

#[test]
fn test_curvature_height() {
    println!("\n--- Test: Curvature and Height ---");
    let update = Update { y: Some(48), x: Some(64), v: Some(PeriodsInput::from(vec![1.0, 5.0, 8.0])), ..Update::default() };
    let p = Params::default().apply(&update).unwrap();
    let mut log = EventLog::new();
    let frames = encode(&p, &EncodeOptions::default(), &mut log).unwrap();
    let field = decode(&p, &frames, DecodeOptions::default(), &PhaseShiftKernel, &QualityGuided, &mut log).unwrap();

    let c = curvature(&p, &field.registration).unwrap();
    assert_eq!(c.dim(), (48, 64, 1));
    assert!(c.slice(s![1.., 1.., ..]).iter().all(|v| v.abs() < 0.1));

    let h = height(&c);
    assert!(h.slice(s![.., 1.., ..]).iter().all(|v| v.abs() < 0.1));
    println!("  [PASSED] flat surface");
}

#[test]
fn test_bump_is_recovered() {
    println!("\n--- Test: Height of a Bump ---");
    let p = Params::default()
        .apply(&Update { y: Some(33), x: Some(33), ..Update::default() })
        .unwrap_or_else(|e| e.params);
    let bump = |x: f64, y: f64| (-((x - 16.0).powi(2) + (y - 16.0).powi(2)) / 32.0).exp();
    // deflection proportional to the surface slope
    let reg = Array4::from_shape_fn((2, 33, 33, 1), |(d, i, j, _)| {
        let (x, y) = (j as f64, i as f64);
        let slope = (if d == 0 { -(x - 16.0) / 16.0 } else { -(y - 16.0) / 16.0 }) * bump(x, y);
        if d == 0 { x + slope } else { y + slope }
    });

    let c = curvature(&p, &reg).unwrap();
    assert!(c[[16, 16, 0]] < 0.0);
    let h = height(&c);
    let (mut best, mut at) = (f64::NEG_INFINITY, (0, 0));
    for ((i, j, _), &v) in h.indexed_iter() {
        if v > best {
            best = v;
            at = (i, j);
        }
    }
    assert!(at.0.abs_diff(16) <= 1 && at.1.abs_diff(16) <= 1, "peak at {at:?}");
    assert!(h[[16, 16, 0]] - h[[0, 0, 0]] > 0.5);
    println!("  [PASSED] peak at {at:?}");
}

#[test]
fn test_gamma_auto_correct() {
    let v: Array1<f64> = Array1::linspace(0.0, 1.0, 101);
    let frames = FramePattern::F64(Array4::from_shape_fn((1, 1, 101, 1), |(_, _, j, _)| v[j].powf(2.2)));
    let linear = gamma_auto_correct(&frames);
    for (a, b) in linear.iter().zip(v.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}
