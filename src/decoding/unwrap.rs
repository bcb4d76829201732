//! Spatial phase unwrapping.

use ndarray::{Array2, ArrayView2};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::PI;

/// Removes the 2π jumps of a wrapped phase map in place.
///
/// `quality` has the shape of `phase`; higher is more reliable. NaN phases
/// are left untouched and never used as a reference.
pub trait SpatialUnwrapper: Send + Sync {
    fn unwrap(&self, phase: &mut Array2<f64>, quality: ArrayView2<f64>);
}

/// Flood fill from the most reliable pixel, always growing into the most
/// reliable neighbour next.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityGuided;

#[derive(Debug, Clone, Copy)]
struct Entry {
    quality: f64,
    at: (usize, usize),
    from: (usize, usize),
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // ties go to the earlier pixel so the fill order is deterministic
        self.quality.total_cmp(&other.quality).then_with(|| other.at.cmp(&self.at))
    }
}

fn score(q: f64) -> f64 {
    if q.is_nan() {
        f64::NEG_INFINITY
    } else {
        q
    }
}

fn neighbours((i, j): (usize, usize), (rows, cols): (usize, usize)) -> impl Iterator<Item = (usize, usize)> {
    let up = i.checked_sub(1).map(|i| (i, j));
    let down = (i + 1 < rows).then_some((i + 1, j));
    let left = j.checked_sub(1).map(|j| (i, j));
    let right = (j + 1 < cols).then_some((i, j + 1));
    [up, down, left, right].into_iter().flatten()
}

impl SpatialUnwrapper for QualityGuided {
    fn unwrap(&self, phase: &mut Array2<f64>, quality: ArrayView2<f64>) {
        let dim = phase.dim();
        let mut done = Array2::from_elem(dim, false);
        let mut seeds: Vec<(usize, usize)> = phase
            .indexed_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(at, _)| at)
            .collect();
        seeds.sort_by(|a, b| score(quality[*b]).total_cmp(&score(quality[*a])).then_with(|| a.cmp(b)));

        let mut heap = BinaryHeap::new();
        for seed in seeds {
            if done[seed] {
                continue;
            }
            done[seed] = true;
            push_neighbours(seed, phase, quality, &done, &mut heap);
            while let Some(Entry { at, from, .. }) = heap.pop() {
                if done[at] {
                    continue;
                }
                let jump = ((phase[from] - phase[at]) / (2.0 * PI)).round();
                phase[at] += 2.0 * PI * jump;
                done[at] = true;
                push_neighbours(at, phase, quality, &done, &mut heap);
            }
        }
    }
}

fn push_neighbours(
    at: (usize, usize),
    phase: &Array2<f64>,
    quality: ArrayView2<f64>,
    done: &Array2<bool>,
    heap: &mut BinaryHeap<Entry>,
) {
    for next in neighbours(at, phase.dim()) {
        if !done[next] && phase[next].is_finite() {
            heap.push(Entry { quality: score(quality[next]), at: next, from: at });
        }
    }
}
