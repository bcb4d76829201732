use crate::coding::color::{decolorize, fusion, Fusion};
use crate::coding::multiplex::{groups, shifts, split_directions, FrameGroup, Shift};
use crate::params::{HueInput, Params, Update, Values};
use approx::assert_abs_diff_eq;
use ndarray::{arr2, Array4};
use std::f64::consts::PI;

#[test]
fn test_shift_order() {
    let s = shifts(arr2(&[[3, 2], [4, 3]]).view());
    assert_eq!(s.len(), 12);
    assert_eq!(s[3], Shift { d: 0, k: 1, n: 0 });
    assert_eq!(s[11], Shift { d: 1, k: 1, n: 2 });
}

#[test]
fn test_groups_per_mode() {
    println!("\n--- Test: Frame Groups ---");
    let p = Params::default();
    assert_eq!(groups(&p).len(), 24);

    let wdm = p
        .apply(&Update { n: Some(Values::Scalar(3)), wdm: Some(true), ..Update::default() })
        .unwrap();
    let g = groups(&wdm);
    assert_eq!(g.len(), wdm.t());
    assert_eq!(g[1], FrameGroup { channels: vec![vec![3], vec![4], vec![5]] });

    let sdm = p.apply(&Update { sdm: Some(true), ..Update::default() }).unwrap();
    let g = groups(&sdm);
    assert_eq!(g.len(), 12);
    assert_eq!(g[0].channels, vec![vec![0, 12]]);

    let fdm = p.apply(&Update { fdm: Some(true), ..Update::default() }).unwrap();
    let g = groups(&fdm);
    let n = fdm.n()[[0, 0]];
    assert_eq!(g.len(), n);
    assert_eq!(g[1].channels[0], (0..6).map(|j| j * n + 1).collect::<Vec<_>>());

    let both = Params::default().apply(&Update { t: Some(1), ..Update::default() }).unwrap();
    let g = groups(&both);
    assert_eq!(g.len(), 1);
    assert_eq!(g[0].channels, vec![vec![0, 3], vec![1, 4], vec![2, 5]]);
    println!("  [PASSED] none, WDM, SDM, FDM, SDM + WDM");
}

#[test]
fn test_split_periodic_directions() {
    println!("\n--- Test: Spectral Direction Split ---");
    let (y, x) = (16, 32);
    let (a, b) = (100.0, 40.0);
    let along_x = |j: usize| a + b * (2.0 * PI * 4.0 * j as f64 / x as f64 + 0.3).cos();
    let along_y = |i: usize| a + b * (2.0 * PI * 3.0 * i as f64 / y as f64).cos();
    let sum = Array4::from_shape_fn((1, y, x, 1), |(_, i, j, _)| a + (along_x(j) - a) + (along_y(i) - a));

    let split = split_directions(&sum, true);
    assert_eq!(split.dim(), (2, y, x, 1));
    for i in 0..y {
        for j in 0..x {
            assert_abs_diff_eq!(split[[0, i, j, 0]], along_x(j), epsilon = 1e-9);
            assert_abs_diff_eq!(split[[1, i, j, 0]], along_y(i), epsilon = 1e-9);
        }
    }
    println!("  [PASSED] both directions recovered");
}

#[test]
fn test_fusion_choice() {
    let rgb = crate::params::hues::parse_hues(&HueInput::from("rgb")).unwrap();
    assert_eq!(fusion(rgb.view(), 3), Fusion::Select(vec![Some(0), Some(1), Some(2)]));
    let rb = crate::params::hues::parse_hues(&HueInput::from("rb")).unwrap();
    assert_eq!(fusion(rb.view(), 3), Fusion::Select(vec![Some(0), None, Some(1)]));
    let rggb = crate::params::hues::parse_hues(&HueInput::from("rggb")).unwrap();
    match fusion(rggb.view(), 3) {
        Fusion::Weighted(w) => {
            assert_eq!(w[[1, 1]], 0.5);
            assert_eq!(w[[0, 0]], 1.0);
            assert_eq!(w[[0, 1]], 0.0);
        }
        other => panic!("expected weighted fusion, got {other:?}"),
    }
}

#[test]
fn test_decolorize_averages_hues() {
    let h = crate::params::hues::parse_hues(&HueInput::from("ww")).unwrap();
    let frames = Array4::from_shape_fn((4, 1, 2, 1), |(t, _, _, _)| t as f64);
    let fused = decolorize(&frames, h.view());
    assert_eq!(fused.dim(), (2, 1, 2, 1));
    assert_eq!(fused[[0, 0, 0, 0]], 1.0);
    assert_eq!(fused[[1, 0, 1, 0]], 2.0);
}
