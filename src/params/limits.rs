// src/params/limits.rs
// Hard bounds of the parameter space.

pub const H_MAX: usize = 101;
pub const D_MAX: usize = 2;
pub const K_MAX: usize = 101;
pub const N_MAX: usize = 1001;
pub const M_MAX: usize = 101;
pub const X_MAX: usize = 1 << 20;
pub const Y_MAX: usize = 1 << 20;
pub const P_MAX: usize = 1 << 30;
pub const ALPHA_MAX: f64 = 2.0;
pub const GAMMA_MAX: f64 = 3.0;
pub const L_MIN_MIN: f64 = 3.0;

/// Minimum number of shifts needed to fit bias, amplitude and phase.
pub const N_MIN: usize = 3;

/// Largest frame count any configuration can realize.
pub const T_MAX: usize = H_MAX * D_MAX * K_MAX * N_MAX;

/// Values closer than this to an integer are treated as integers.
pub const INT_TOL: f64 = 1e-13;

/// Decimal digits up to which wavelengths are treated as exact rationals.
pub const DECIMAL_PRECISION: usize = 13;
