use crate::params::{Params, Update};
use approx::assert_relative_eq;
use std::f64::consts::PI;

#[test]
fn test_quantization_only() {
    println!("\n--- Test: Config Uncertainty ---");
    let p = Params::default();
    let quant = 1.0 / 12f64.sqrt();
    assert_relative_eq!(p.quant(), quant);
    assert_eq!(p.shot(), 0.0);
    assert_relative_eq!(p.ui(), quant);

    let upi = 2f64.sqrt() / 4f64.sqrt() / (127.5 / quant);
    assert_relative_eq!(p.upi()[[0, 0]], upi, epsilon = 1e-15);

    let w: f64 = [13.0, 7.0, 89.0]
        .iter()
        .map(|v| {
            let ux = upi / (2.0 * PI) * 1920.0 / v;
            1.0 / (ux * ux)
        })
        .sum();
    let u = (1.0 / w).sqrt();
    assert_relative_eq!(p.u()[0], u, max_relative = 1e-12);
    assert_relative_eq!(p.snr()[0], 1920.0 / u, max_relative = 1e-12);
    assert_relative_eq!(p.snr()[1], 1200.0 / u, max_relative = 1e-12);
    assert_relative_eq!(p.dr_db()[0], 20.0 * (1920.0 / u).log10(), max_relative = 1e-12);
    assert_relative_eq!(p.efficiency()[0], p.snr()[0] / 24.0);
    println!("  [PASSED] u = {}", p.u());
}

#[test]
fn test_shot_and_dark_noise() {
    let p = Params::default()
        .apply(&Update { gain: Some(0.5), dark: Some(2.0), y0: Some(10.0), ..Update::default() })
        .unwrap();
    let dark = 2.0 - p.quant();
    assert_relative_eq!(p.dark(), dark);
    assert_relative_eq!(p.shot(), (0.5 * (127.5 - 10.0f64)).sqrt());
    let ui = ((0.5 * dark).powi(2) + p.quant().powi(2) + p.shot().powi(2)).sqrt();
    assert_relative_eq!(p.ui(), ui);
}

#[test]
fn test_mtf_lowers_modulation() {
    let p = Params::default().apply(&Update { psf: Some(1.0), ..Update::default() }).unwrap();
    assert_eq!(p.mtf(0.0), 1.0);
    assert!(p.mtf(89.0) < 1.0);
    assert_eq!(p.vopt(), p.vmax() / 2.0);
    assert!(p.u()[0] > Params::default().u()[0]);
}
