//! Frame count derivation and its inverse.

use crate::params::frames::{distribute, frame_count};
use crate::params::{HueInput, Params, Update};
use ndarray::arr2;

#[test]
fn test_frame_count_folding() {
    let n = arr2(&[[4, 4, 4], [4, 4, 4]]);
    assert_eq!(frame_count(1, n.view(), false, false, false), 24);
    assert_eq!(frame_count(2, n.view(), false, false, false), 48);
    assert_eq!(frame_count(1, n.view(), true, false, false), 12);
    assert_eq!(frame_count(1, n.view(), false, false, true), 4);
    let n = arr2(&[[3, 3], [3, 3]]);
    assert_eq!(frame_count(1, n.view(), false, true, false), 4);
    assert_eq!(frame_count(1, n.view(), true, true, false), 2);
}

#[test]
fn test_distribute_spreads_remainder() {
    assert_eq!(distribute(24, 2, 3), arr2(&[[4, 4, 4], [4, 4, 4]]));
    assert_eq!(distribute(7, 2, 1), arr2(&[[4], [3]]));
    assert_eq!(distribute(15, 2, 2), arr2(&[[4, 4], [4, 3]]));
    assert_eq!(distribute(10, 1, 3), arr2(&[[4, 3, 3]]));
}

#[test]
fn test_set_t_reads_back() {
    println!("\n--- Test: T Round Trip ---");
    let mut p = Params::default();
    for t in 1..=1001 {
        p = match p.apply(&Update { t: Some(t), ..Update::default() }) {
            Ok(p) => p,
            Err(rejected) => panic!("T = {t}: {rejected}"),
        };
        assert_eq!(p.t(), t, "T = {t}, N = {}", p.n());
        assert!(p.check_invariants().is_ok());
    }
    println!("  [PASSED] T = 1..=1001");
}

#[test]
fn test_set_t_fast_paths() {
    let p = Params::default().apply(&Update { t: Some(1), ..Update::default() }).unwrap();
    assert!(p.wdm() && p.sdm());
    assert_eq!((p.d(), p.k()), (2, 1));
    assert_eq!(p.t(), 1);

    let p = Params::default().apply(&Update { t: Some(2), ..Update::default() }).unwrap();
    assert!(p.wdm() && !p.sdm());
    assert_eq!(p.t(), 2);
}

#[test]
fn test_set_t_keeps_hues_when_possible() {
    let p = Params::default()
        .apply(&Update { h: Some(HueInput::from("rggb")), ..Update::default() })
        .unwrap();
    assert_eq!(p.t(), 96);

    let q = p.apply(&Update { t: Some(48), ..Update::default() }).unwrap();
    assert_eq!(q.h(), 4);
    assert_eq!(q.t(), 48);

    let q = p.apply(&Update { t: Some(12), ..Update::default() }).unwrap();
    assert_eq!(q.h(), 2);
    assert_eq!(q.t(), 12);
}

#[test]
fn test_optimize_for_frame_budget() {
    println!("\n--- Test: Optimize ---");
    let mut log = crate::diagnostics::EventLog::new();
    let p = Params::default().optimized(Some(24), None, &mut log).unwrap();
    assert_eq!(p.k(), 4);
    assert_eq!(p.t(), 24);
    assert!(!p.is_ambiguous());
    assert!(p.u().iter().all(|&u| u < Params::default().u()[0]));
    println!("  [PASSED] u = {}", p.u());
}
