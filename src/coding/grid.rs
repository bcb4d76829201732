//! Coordinate grids and their inverse.
//!
//! Every grid maps the pixel `(x, y)` to a pair of base coordinates; the coded
//! directions pick from that pair according to `indexing` and `axis`.

use crate::error::{FringesError, Result};
use crate::params::{Grid, Indexing, Params};
use ndarray::{Array3, Array4, Axis};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Base coordinate index used by each coded direction.
pub fn axes(p: &Params) -> Vec<usize> {
    let order = match p.indexing() {
        Indexing::Xy => [0, 1],
        Indexing::Ij => [1, 0],
    };
    if p.d() == 1 {
        vec![order[p.axis().min(1)]]
    } else {
        order.to_vec()
    }
}

fn rotation(angle: f64) -> (f64, f64) {
    let t = angle.to_radians();
    (t.cos(), t.sin())
}

struct Frame {
    grid: Grid,
    cx: f64,
    cy: f64,
    rmax: f64,
    length: f64,
    angle: f64,
    cos: f64,
    sin: f64,
}

impl Frame {
    fn new(p: &Params) -> Self {
        let (cos, sin) = rotation(p.angle());
        Self {
            grid: p.grid(),
            cx: (p.x() as f64 - 1.0) / 2.0,
            cy: (p.y() as f64 - 1.0) / 2.0,
            rmax: p.x().min(p.y()) as f64 / 2.0,
            length: p.length(),
            angle: p.angle(),
            cos,
            sin,
        }
    }

    fn base(&self, x: f64, y: f64) -> [f64; 2] {
        let (c, s) = (self.cos, self.sin);
        match self.grid {
            Grid::Image if self.angle == 0.0 => [x, y],
            Grid::Image => {
                let (dx, dy) = (x - self.cx, y - self.cy);
                [self.cx + c * dx + s * dy, self.cy - s * dx + c * dy]
            }
            Grid::Cartesian => {
                let (u, v) = (x - self.cx, self.cy - y);
                if self.angle == 0.0 {
                    [u, v]
                } else {
                    [c * u + s * v, -s * u + c * v]
                }
            }
            Grid::Polar | Grid::LogPolar => {
                let (u, v) = (x - self.cx, self.cy - y);
                let r = u.hypot(v);
                if r > self.rmax {
                    return [f64::NAN, f64::NAN];
                }
                let phi = (v.atan2(u) + self.angle.to_radians()).rem_euclid(2.0 * PI) / (2.0 * PI);
                let radius = if self.grid == Grid::Polar {
                    r / self.rmax
                } else {
                    r.ln_1p() / self.rmax.ln_1p()
                };
                [phi * self.length, radius * self.length]
            }
        }
    }

    /// Inverse of [`Frame::base`] for rectilinear grids.
    fn pixel(&self, b: [f64; 2], rotated: bool) -> [f64; 2] {
        let (c, s) = (self.cos, self.sin);
        match self.grid {
            Grid::Image if rotated => {
                let (du, dv) = (b[0] - self.cx, b[1] - self.cy);
                [self.cx + c * du - s * dv, self.cy + s * du + c * dv]
            }
            Grid::Cartesian => {
                let (u, v) = if rotated { (c * b[0] - s * b[1], s * b[0] + c * b[1]) } else { (b[0], b[1]) };
                [u + self.cx, self.cy - v]
            }
            _ => b,
        }
    }
}

/// Coordinates `(D, Y, X)` of the configured grid, without the `x0` offset.
///
/// Pixels outside the inscribed circle of polar grids are NaN.
pub fn coordinates(p: &Params) -> Array3<f64> {
    let axes = axes(p);
    let frame = Frame::new(p);
    let mut xi = Array3::zeros((axes.len(), p.y(), p.x()));
    xi.axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut plane)| {
            for x in 0..plane.ncols() {
                let b = frame.base(x as f64, y as f64);
                for (d, &a) in axes.iter().enumerate() {
                    plane[[d, x]] = b[a];
                }
            }
        });
    xi
}

/// Maps registered coordinates `(D, Y, X, C)` back to pixel coordinates.
///
/// Unrotated image grids are left untouched. Rotations can only be undone
/// with both directions present; polar grids keep their coordinates.
pub fn to_pixels(p: &Params, reg: &mut Array4<f64>) {
    if !p.grid().is_rectilinear() {
        return;
    }
    let axes = axes(p);
    let rotated = p.angle() != 0.0 && axes.len() == 2;
    if p.grid() == Grid::Image && !rotated {
        return;
    }
    let frame = Frame::new(p);
    let (_, y, x, c) = reg.dim();
    for i in 0..y {
        for j in 0..x {
            for k in 0..c {
                let mut b = [0.0; 2];
                for (d, &a) in axes.iter().enumerate() {
                    b[a] = reg[[d, i, j, k]];
                }
                let px = frame.pixel(b, rotated);
                for (d, &a) in axes.iter().enumerate() {
                    reg[[d, i, j, k]] = px[a];
                }
            }
        }
    }
}

/// Smallest and largest finite coordinate per direction.
pub fn ranges(xi: &Array3<f64>) -> Vec<(f64, f64)> {
    xi.outer_iter()
        .map(|plane| {
            plane
                .iter()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        })
        .map(|(lo, hi)| if lo <= hi { (lo, hi) } else { (0.0, 0.0) })
        .collect()
}

/// User coordinates must provide every direction and stay inside the coded range.
pub fn check(p: &Params, xi: &Array3<f64>) -> Result<()> {
    let d = xi.dim().0;
    if d != p.d() {
        return Err(FringesError::Coordinates(format!("got {d} directions, expected {}", p.d())));
    }
    let x0 = p.x0();
    for ((lo, hi), r) in ranges(xi).into_iter().zip(p.r()) {
        if lo < -x0 || hi >= r as f64 + x0 {
            return Err(FringesError::Coordinates(format!(
                "range [{lo}, {hi}] exceeds the coded range [{}, {})",
                -x0,
                r as f64 + x0
            )));
        }
    }
    Ok(())
}
