use crate::coding::{encode, EncodeOptions, FramePattern};
use crate::decoding::{brightfield, darkfield, decode, source, DecodeOptions, DecodedField, PhaseShiftKernel, QualityGuided};
use crate::diagnostics::EventLog;
use crate::params::{Params, PeriodsInput, Update};
use ndarray::{Array3, Axis};

fn decoded() -> (Params, DecodedField) {
    let update = Update { y: Some(48), x: Some(64), v: Some(PeriodsInput::from(vec![1.0, 5.0, 8.0])), ..Update::default() };
    let p = Params::default().apply(&update).unwrap();
    let mut log = EventLog::new();
    let frames = encode(&p, &EncodeOptions::default(), &mut log).unwrap();
    let field = decode(&p, &frames, DecodeOptions::default(), &PhaseShiftKernel, &QualityGuided, &mut log).unwrap();
    (p, field)
}

#[test]
fn test_remapping() {
    println!("\n--- Test: Source Activation ---");
    let (p, field) = decoded();

    let src = source(&p, &field.registration, None, 1.0).unwrap();
    assert_eq!(src.dim(), (48, 64, 1));
    assert!(src.iter().all(|&s| s == 1.0), "every screen pixel is hit once");

    let src = source(&p, &field.registration, Some(&field.modulation), 1.0).unwrap();
    assert!(src.iter().all(|&s| (s - 1.0).abs() < 0.1));

    let src = source(&p, &field.registration, None, 3.0).unwrap();
    assert!(src.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    println!("  [PASSED] uniform heatmap of shape {:?}", src.dim());
}

#[test]
fn test_remapping_skips_invalid_coordinates() {
    let (p, mut field) = decoded();
    field.registration.index_axis_mut(Axis(0), 0).fill(f64::NAN);
    let src = source(&p, &field.registration, None, 1.0).unwrap();
    assert!(src.iter().all(|&s| s == 0.0));

    let wrong = field.registration.slice_axis(Axis(0), (0..1).into()).to_owned();
    assert!(source(&p, &wrong, None, 1.0).is_err());
}

#[test]
fn test_bright_and_dark_field() {
    println!("\n--- Test: Bright / Dark Field ---");
    let p = Params::default()
        .apply(&Update { y: Some(9), x: Some(9), ..Update::default() })
        .unwrap_or_else(|e| e.params);
    let mut src = Array3::<f64>::zeros((9, 9, 1));
    src[[4, 4, 0]] = 1.0;

    let FramePattern::U8(bf) = brightfield(&p, &src, 0.5, 3) else { panic!("expected u8 frames") };
    assert_eq!(bf.dim(), (1, 9, 9, 1));
    let lit: Vec<(usize, usize)> = bf.indexed_iter().filter(|(_, &v)| v == 255).map(|((_, i, j, _), _)| (i, j)).collect();
    assert_eq!(lit, vec![(3, 4), (4, 3), (4, 4), (4, 5), (5, 4)]);

    let FramePattern::U8(df) = darkfield(&p, &src, 0.5, 0) else { panic!("expected u8 frames") };
    assert_eq!(df[[0, 4, 4, 0]], 0);
    assert_eq!(df.iter().filter(|&&v| v == 255).count(), 80);
    println!("  [PASSED] {} bright pixels after dilation", lit.len());
}
