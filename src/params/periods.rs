//! Automatic selection of spatial frequencies and wavelengths.
//!
//! Every strategy is a pure function of the current parameters. The
//! combinatorial searches ("optimal", "small") look for integer wavelengths
//! whose least common multiple covers the coding length and score every
//! candidate with the configured [`Criterion`].

use super::types::{Criterion, Strategy};
use super::Params;
use num_integer::Integer;

/// Upper bound on the number of candidate combinations a search may visit.
const SEARCH_LIMIT: f64 = 5e7;

/// Selects `k` spatial frequencies.
pub fn frequencies(strategy: Strategy, p: &Params, k: usize) -> Result<Vec<f64>, String> {
    let k = k.max(1);
    let v = match strategy {
        Strategy::Optimal => {
            let vmax = (p.vopt().floor()).max(if k == 1 { 1.0 } else { 2.0 });
            let mut v = vec![vmax; k - 1];
            // consecutive integers are coprime
            v.push(vmax - 1.0);
            v
        }
        Strategy::Exponential => {
            let mut v = vec![0.0];
            v.extend(geomspace(1.0, p.vmax(), k - 1));
            v
        }
        Strategy::Linear => {
            let mut v = vec![0.0];
            v.extend(linspace(1.0, p.vmax(), k - 1));
            v
        }
        Strategy::Close | Strategy::Small => {
            let length = p.length();
            wavelengths(strategy, p, k)?.into_iter().map(|l| length / l).collect()
        }
    };
    Ok(v)
}

/// Selects `k` wavelengths; `f64::INFINITY` stands for a constant set.
pub fn wavelengths(strategy: Strategy, p: &Params, k: usize) -> Result<Vec<f64>, String> {
    let k = k.max(1);
    let length = p.length();
    match strategy {
        Strategy::Optimal => optimal(p, k),
        Strategy::Close => Ok(close(p.lmin(), length, k)),
        Strategy::Small => small(p.lmin(), length, k),
        Strategy::Exponential => {
            let mut l = vec![f64::INFINITY];
            l.extend(geomspace(length, p.lmin(), k - 1));
            Ok(l)
        }
        Strategy::Linear => {
            let mut l = vec![f64::INFINITY];
            l.extend(linspace(length, p.lmin(), k - 1));
            Ok(l)
        }
    }
}

fn optimal(p: &Params, k: usize) -> Result<Vec<f64>, String> {
    let length = p.length();
    let lmin = p.lmin().ceil() as u64;
    let mut lmax = [length / lmin as f64, p.lmin(), p.lopt().min(length), length.sqrt()]
        .into_iter()
        .fold(0.0f64, f64::max)
        .ceil() as u64;
    if lmin == lmax && (lmax as f64) < length {
        lmax += 1;
    }
    if (lmax as f64) < length && !is_prime(lmax) {
        // a prime upper bound guarantees lcm(l, lmax) >= L for every l >= lmin
        lmax = next_prime(lmax, 1);
    }

    let mut greedy = 1;
    let mut lcm = lmin as u128;
    let mut candidate = lmin + 1;
    while (lcm as f64) < length {
        let next = lcm_pair(lcm, candidate as u128);
        if next > lcm {
            greedy += 1;
            lcm = next;
        }
        candidate += 1;
    }
    let kk = greedy.min(k);

    let n = lmax - lmin + 1;
    if multisets(n, kk) > SEARCH_LIMIT {
        return Err(format!("too many candidate combinations for K = {kk}"));
    }

    let kroot = length.powf(1.0 / kk as f64);
    let need_long = p.lmin() <= kroot;
    let shifts = p.n().iter().sum::<usize>() as f64 / p.n().len().max(1) as f64;
    let m = p.m();
    let score = |c: &[u64]| -> f64 {
        c.iter()
            .map(|&l| {
                let l = l as f64;
                match p.criterion() {
                    Criterion::InverseVariance => {
                        let b = p.mtf(length / l);
                        m * shifts * b * b / (l * l)
                    }
                    Criterion::InverseSquares => 1.0 / (l * l),
                }
            })
            .sum()
    };

    let mut best: Option<(f64, Vec<u64>)> = None;
    for_each_multiset(lmin, lmax, kk, |c| {
        if need_long && !c.iter().any(|&l| l as f64 > kroot) {
            return;
        }
        if (lcm_all(c) as f64) < length {
            return;
        }
        let s = score(c);
        if best.as_ref().map_or(true, |(b, _)| s > *b) {
            best = Some((s, c.to_vec()));
        }
    });

    let (_, combo) = best.ok_or_else(|| "no combination covers the coding length".to_string())?;
    let mut l = vec![lmin as f64; k - kk];
    l.extend(combo.into_iter().map(|x| x as f64));
    Ok(l)
}

fn close(lmin: f64, length: f64, k: usize) -> Vec<f64> {
    let start = (lmin.ceil()).max((length.powf(1.0 / k as f64) - k as f64).trunc()) as u64;
    let mut l: Vec<u64> = (0..k as u64).map(|i| start + i).collect();
    while (lcm_all(&l) as f64) < length {
        for x in l.iter_mut() {
            *x += 1;
        }
    }
    l.into_iter().map(|x| x as f64).collect()
}

fn small(lmin: f64, length: f64, k: usize) -> Result<Vec<f64>, String> {
    let lmin = lmin.ceil() as u64;
    let kroot = length.powf(1.0 / k as f64);
    let mut lmax = kroot.ceil() as u64;
    if k >= 2 {
        lmax += 1;
        if k >= 3 {
            lmax += 1;
            if lmax % 2 == 0 {
                lmax += 1;
            }
            if k > 3 {
                lmax = next_prime(lmax, k - 3);
            }
        }
    }

    if lmin > lmax || lmax - lmin + 1 <= k as u64 {
        return Ok((0..k as u64).map(|i| (lmin + i) as f64).collect());
    }

    lmax = lmax.min(length.ceil() as u64).max(lmin);
    if lmin == lmax && (lmax as f64) < length {
        lmax += 1;
    }
    let n = lmax - lmin + 1;
    let kk = k.min(n as usize);

    let mut best: Option<(f64, Vec<u64>)> = None;
    for_each_combination(lmin, lmax, kk, |c| {
        if !c.iter().any(|&l| l as f64 > kroot) || (lcm_all(c) as f64) < length {
            return;
        }
        let s: f64 = c.iter().map(|&l| 1.0 / (l * l) as f64).sum();
        if best.as_ref().map_or(true, |(b, _)| s > *b) {
            best = Some((s, c.to_vec()));
        }
    });

    let (_, mut combo) = best.ok_or_else(|| "no combination covers the coding length".to_string())?;
    let top = combo.iter().copied().max().unwrap_or(lmin);
    combo.extend((1..=(k - kk) as u64).map(|i| top + i));
    Ok(combo.into_iter().map(|x| x as f64).collect())
}

/// Distinct primes starting at `lower`, interleaved small/large and sorted per direction.
pub fn coprime_frequencies(lower: u64, count: usize) -> Vec<f64> {
    let mut primes = Vec::with_capacity(count);
    let mut p = lower.max(2);
    while primes.len() < count {
        if is_prime(p) {
            primes.push(p);
        }
        p += 1;
    }
    (0..primes.len())
        .map(|i| {
            let j = if i % 2 == 1 { primes.len() - (i + 1) / 2 } else { i / 2 };
            primes[j] as f64
        })
        .collect()
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut i = 3;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// The `ith` prime greater than `n`.
pub fn next_prime(n: u64, ith: usize) -> u64 {
    let mut p = n;
    for _ in 0..ith.max(1) {
        p += 1;
        while !is_prime(p) {
            p += 1;
        }
    }
    p
}

fn lcm_pair(a: u128, b: u128) -> u128 {
    (a / a.gcd(&b)).saturating_mul(b)
}

fn lcm_all(values: &[u64]) -> u128 {
    values.iter().fold(1u128, |acc, &x| lcm_pair(acc, x.max(1) as u128))
}

fn multisets(n: u64, k: usize) -> f64 {
    // C(n + k - 1, k)
    (0..k).fold(1.0, |acc, i| acc * (n + i as u64) as f64 / (i + 1) as f64)
}

fn for_each_multiset(lo: u64, hi: u64, k: usize, mut f: impl FnMut(&[u64])) {
    if k == 0 || hi < lo {
        return;
    }
    let mut c = vec![lo; k];
    loop {
        f(&c);
        let mut i = k;
        while i > 0 && c[i - 1] == hi {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        c[i - 1] += 1;
        let v = c[i - 1];
        for x in c.iter_mut().skip(i) {
            *x = v;
        }
    }
}

fn for_each_combination(lo: u64, hi: u64, k: usize, mut f: impl FnMut(&[u64])) {
    if k == 0 || hi < lo || hi - lo + 1 < k as u64 {
        return;
    }
    let mut c: Vec<u64> = (0..k as u64).map(|j| lo + j).collect();
    loop {
        f(&c);
        let mut i = k;
        while i > 0 && c[i - 1] == hi - (k - i) as u64 {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        c[i - 1] += 1;
        for j in i..k {
            c[j] = c[j - 1] + 1;
        }
    }
}

pub fn geomspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => (0..n)
            .map(|i| start * (stop / start).powf(i as f64 / (n - 1) as f64))
            .collect(),
    }
}

pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (stop - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primes() {
        assert!(is_prime(2));
        assert!(is_prime(241));
        assert!(!is_prime(240));
        assert_eq!(next_prime(240, 1), 241);
        assert_eq!(next_prime(10, 3), 17);
    }

    #[test]
    fn test_coprime_interleaving() {
        // primes from 10: 11 13 17 19 23 29
        let p = coprime_frequencies(10, 6);
        assert_eq!(p, vec![11.0, 29.0, 13.0, 23.0, 17.0, 19.0]);
    }

    #[test]
    fn test_combinations() {
        let mut count = 0;
        for_each_multiset(1, 4, 2, |_| count += 1);
        assert_eq!(count, 10);
        let mut seen = Vec::new();
        for_each_combination(1, 4, 2, |c| seen.push(c.to_vec()));
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], vec![1, 2]);
        assert_eq!(seen[5], vec![3, 4]);
    }

    #[test]
    fn test_close_covers_length() {
        let l = close(8.0, 1920.0, 3);
        let ints: Vec<u64> = l.iter().map(|&x| x as u64).collect();
        assert!(lcm_all(&ints) as f64 >= 1920.0);
        assert!(l.iter().all(|&x| x >= 8.0));
    }
}
