use crate::decoding::filters::{denoise, despike};
use approx::assert_abs_diff_eq;
use ndarray::Array2;

#[test]
fn test_despike_removes_outliers() {
    println!("\n--- Test: Despike ---");
    let mut a = Array2::from_shape_fn((6, 7), |(_, j)| j as f64);
    a[[3, 3]] = 500.0;
    a[[0, 0]] = -80.0;
    let clean = despike(&a);
    assert_eq!(clean[[3, 3]], 3.0);
    assert_eq!(clean[[0, 0]], 0.0);
    assert_eq!(clean[[2, 5]], 5.0);
    println!("  [PASSED] spikes replaced by the local median");
}

#[test]
fn test_despike_ignores_nan() {
    let mut a = Array2::from_elem((4, 4), 2.0);
    a[[1, 1]] = f64::NAN;
    a[[1, 2]] = 9.0;
    let clean = despike(&a);
    assert!(clean[[1, 1]].is_nan());
    assert_eq!(clean[[1, 2]], 2.0);
    assert_eq!(clean[[2, 2]], 2.0);
}

#[test]
fn test_denoise_preserves_edges() {
    println!("\n--- Test: Bilateral Denoise ---");
    let a = Array2::from_shape_fn((5, 8), |(i, j)| if j < 4 { 10.0 } else { 50.0 } + if (i + j) % 2 == 0 { 0.1 } else { -0.1 });
    let smooth = denoise(&a);
    for i in 0..5 {
        for j in 0..8 {
            let level = if j < 4 { 10.0 } else { 50.0 };
            assert_abs_diff_eq!(smooth[[i, j]], level, epsilon = 0.1);
        }
    }
    let noise_before: f64 = a.iter().map(|v| (v - v.round()).abs()).sum();
    let noise_after: f64 = smooth.iter().map(|v| (v - v.round()).abs()).sum();
    assert!(noise_after < noise_before);
    println!("  [PASSED] noise reduced, step kept");
}
