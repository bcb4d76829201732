use crate::decoding::{QualityGuided, SpatialUnwrapper};
use approx::assert_abs_diff_eq;
use ndarray::Array2;
use std::f64::consts::PI;

fn wrap(x: f64) -> f64 {
    x.rem_euclid(2.0 * PI)
}

#[test]
fn test_unwraps_tilted_plane() {
    println!("\n--- Test: Quality Guided Unwrapping ---");
    let truth = Array2::from_shape_fn((20, 30), |(i, j)| 0.9 * j as f64 + 0.4 * i as f64);
    let mut phase = truth.mapv(wrap);
    let quality = Array2::from_shape_fn((20, 30), |(i, j)| 1.0 + ((i * 7 + j * 3) % 5) as f64);
    QualityGuided.unwrap(&mut phase, quality.view());

    let offset = phase[[0, 0]] - truth[[0, 0]];
    assert_abs_diff_eq!(offset / (2.0 * PI), (offset / (2.0 * PI)).round(), epsilon = 1e-9);
    for (u, t) in phase.iter().zip(truth.iter()) {
        assert_abs_diff_eq!(u - t, offset, epsilon = 1e-9);
    }
    println!("  [PASSED] plane restored up to a multiple of 2π");
}

#[test]
fn test_separate_regions_are_unwrapped() {
    let truth = Array2::from_shape_fn((6, 24), |(_, j)| 0.8 * j as f64);
    let mut phase = truth.mapv(wrap);
    phase.column_mut(12).fill(f64::NAN);
    let quality = Array2::ones((6, 24));
    QualityGuided.unwrap(&mut phase, quality.view());

    assert!(phase.column(12).iter().all(|v| v.is_nan()));
    for side in [0..12, 13..24] {
        let j0 = side.start;
        let offset = phase[[0, j0]] - truth[[0, j0]];
        for j in side {
            for i in 0..6 {
                assert_abs_diff_eq!(phase[[i, j]] - truth[[i, j]], offset, epsilon = 1e-9);
            }
        }
    }
}
