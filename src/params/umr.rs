//! Unambiguous measurement range.
//!
//! The coordinate coded by a direction repeats with the least common multiple of
//! its wavelengths. For integer wavelengths (or integer frequencies) this is
//! exact; decimal wavelengths are lifted to rationals, and anything beyond
//! [`DECIMAL_PRECISION`] digits falls back to the product of the wavelengths.

use super::limits::{DECIMAL_PRECISION, INT_TOL};
use ndarray::{Array1, ArrayView2};
use num_integer::Integer;
use num_rational::Ratio;
use std::sync::Mutex;

const MULTIPLE_TOL: f64 = 1e-12;

pub fn umr(l: ArrayView2<f64>, v: ArrayView2<f64>, n: ArrayView2<usize>, length: f64) -> Array1<f64> {
    let (d, k) = v.dim();
    let mut out = Array1::zeros(d);
    for i in 0..d {
        let mut ls = Vec::with_capacity(k);
        let mut vs = Vec::with_capacity(k);
        for j in 0..k {
            if v[[i, j]] <= 0.0 || !l[[i, j]].is_finite() {
                continue;
            }
            // a single shift only resolves the phase up to its sign
            let half = if n[[i, j]] == 1 { 2.0 } else { 1.0 };
            ls.push(l[[i, j]] / half);
            vs.push(v[[i, j]] * half);
        }
        out[i] = direction_umr(&ls, &vs, length);
    }
    out
}

fn direction_umr(l: &[f64], v: &[f64], length: f64) -> f64 {
    if l.is_empty() {
        return 1.0;
    }
    if l.iter().all(|&x| is_integral(x)) {
        if let Some(m) = lcm_all(l.iter().map(|x| x.round() as u128)) {
            return m as f64;
        }
    }
    if v.iter().all(|&x| is_integral(x)) {
        let g = v.iter().map(|x| x.round() as u128).fold(0u128, |a, b| a.gcd(&b));
        if g > 0 {
            return length / g as f64;
        }
    }

    let (l, v) = drop_multiples(l, v);
    if l.len() == 1 {
        return l[0];
    }

    let dl = l.iter().map(|&x| decimals(x)).max().unwrap_or(0);
    let dv = v.iter().map(|&x| decimals(x)).max().unwrap_or(0);
    if dl.min(dv) < DECIMAL_PRECISION {
        let exact = if dl <= dv {
            rational_lcm(&l, dl)
        } else {
            rational_gcd(&v, dv).map(|g| length / g)
        };
        if let Some(u) = exact {
            return u;
        }
    }
    l.iter().product()
}

fn is_integral(x: f64) -> bool {
    (x - x.round()).abs() < INT_TOL && x.round() >= 1.0
}

/// Drops every wavelength that divides another one, it adds no range.
fn drop_multiples(l: &[f64], v: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut keep = vec![true; l.len()];
    for i in 0..l.len() {
        for j in i + 1..l.len() {
            if !keep[i] || !keep[j] {
                continue;
            }
            if is_multiple(l[i], l[j]) {
                keep[j] = false;
            } else if is_multiple(l[j], l[i]) {
                keep[i] = false;
            }
        }
    }
    let l = l.iter().zip(&keep).filter(|(_, &k)| k).map(|(&x, _)| x).collect();
    let v = v.iter().zip(&keep).filter(|(_, &k)| k).map(|(&x, _)| x).collect();
    (l, v)
}

fn is_multiple(a: f64, b: f64) -> bool {
    let q = a / b;
    q.round() >= 1.0 && (q - q.round()).abs() < MULTIPLE_TOL * q.max(1.0)
}

/// Number of digits after the decimal point in the shortest representation.
fn decimals(x: f64) -> usize {
    let s = format!("{x}");
    s.find('.').map_or(0, |p| s.len() - p - 1)
}

fn to_ratio(x: f64, digits: usize) -> Option<Ratio<i128>> {
    let scale = 10i128.checked_pow(digits as u32)?;
    let scaled = (x * scale as f64).round();
    if !scaled.is_finite() || scaled.abs() >= i128::MAX as f64 || scaled <= 0.0 {
        return None;
    }
    Some(Ratio::new(scaled as i128, scale))
}

fn rational_lcm(l: &[f64], digits: usize) -> Option<f64> {
    let ratios = l.iter().map(|&x| to_ratio(x, digits)).collect::<Option<Vec<_>>>()?;
    let num = lcm_all(ratios.iter().map(|r| *r.numer() as u128))?;
    let den = ratios.iter().fold(0i128, |a, r| a.gcd(r.denom()));
    Some(num as f64 / den as f64)
}

fn rational_gcd(v: &[f64], digits: usize) -> Option<f64> {
    let ratios = v.iter().map(|&x| to_ratio(x, digits)).collect::<Option<Vec<_>>>()?;
    let num = ratios.iter().fold(0i128, |a, r| a.gcd(r.numer()));
    let den = lcm_all(ratios.iter().map(|r| *r.denom() as u128))?;
    Some(num as f64 / den as f64)
}

fn lcm_all(values: impl Iterator<Item = u128>) -> Option<u128> {
    let mut acc = 1u128;
    for x in values {
        if x == 0 {
            return None;
        }
        acc = (acc / acc.gcd(&x)).checked_mul(x)?;
    }
    Some(acc)
}

/// Single slot cache, recomputed whenever the key differs from the stored one.
#[derive(Debug)]
pub struct Memo<K, V> {
    slot: Mutex<Option<(K, V)>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { slot: Mutex::new(None) }
    }
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some((k, v)) if *k == key => v.clone(),
            _ => {
                let v = compute();
                *slot = Some((key, v.clone()));
                v
            }
        }
    }

    pub fn is_cached(&self, key: &K) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        matches!(slot.as_ref(), Some((k, _)) if k == key)
    }
}

impl<K: Clone, V: Clone> Clone for Memo<K, V> {
    fn clone(&self) -> Self {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Self { slot: Mutex::new(slot.clone()) }
    }
}

/// Everything the range depends on: which field defines the periods, their
/// values, the shift counts and the coding length.
#[derive(Debug, Clone, PartialEq)]
pub struct UmrKey {
    pub wavelengths: bool,
    pub periods: Vec<u64>,
    pub shape: (usize, usize),
    pub n: Vec<usize>,
    pub length: u64,
}
