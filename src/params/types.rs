use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Element type of encoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    #[default]
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
    Bool,
}

impl Dtype {
    /// Largest representable intensity.
    pub fn imax(self) -> f64 {
        match self {
            Dtype::U8 => u8::MAX as f64,
            Dtype::U16 => u16::MAX as f64,
            Dtype::F32 | Dtype::F64 | Dtype::Bool => 1.0,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Dtype::U8 | Dtype::U16)
    }

    /// Quantization step size.
    pub fn step(self) -> f64 {
        match self {
            Dtype::U8 | Dtype::U16 | Dtype::Bool => 1.0,
            Dtype::F32 => 1e-6,
            Dtype::F64 => 1e-15,
        }
    }

    pub fn nbytes(self) -> usize {
        match self {
            Dtype::U8 | Dtype::Bool => 1,
            Dtype::U16 => 2,
            Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }
}

/// Coordinate system the fringes are coded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grid {
    #[default]
    Image,
    Cartesian,
    Polar,
    #[serde(rename = "logpolar")]
    LogPolar,
}

impl Grid {
    /// Grids whose coordinates are straight lines, required for spatial multiplexing.
    pub fn is_rectilinear(self) -> bool {
        matches!(self, Grid::Image | Grid::Cartesian)
    }
}

/// Order of the coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indexing {
    #[default]
    Xy,
    Ij,
}

/// Automatic choice of spatial frequencies or wavelengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Optimal,
    Close,
    Small,
    Linear,
    Exponential,
}

/// Score used by the combinatorial wavelength searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Maximize the summed inverse variance `M·N·MTF²/l²` of the fused coordinate.
    #[default]
    InverseVariance,
    /// Maximize `Σ 1/l²`, ignoring shifts and modulation transfer.
    InverseSquares,
}

/// Scalar, row or matrix as accepted by the array valued parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values<T> {
    Scalar(T),
    Row(Vec<T>),
    Matrix(Vec<Vec<T>>),
}

impl<T: Copy> Values<T> {
    /// Brings the value into shape `(D, K)`.
    ///
    /// A scalar fills `(d, k)`, a row is repeated for every direction and a
    /// matrix is cut to the maximal shape. Empty or ragged input yields `None`.
    pub fn to_matrix(&self, d: usize, k: usize, d_max: usize, k_max: usize) -> Option<Array2<T>> {
        match self {
            Values::Scalar(s) => Some(Array2::from_elem((d.max(1), k.max(1)), *s)),
            Values::Row(row) => {
                if row.is_empty() {
                    return None;
                }
                let k = row.len().min(k_max);
                Some(Array2::from_shape_fn((d.max(1), k), |(_, j)| row[j]))
            }
            Values::Matrix(rows) => {
                let first = rows.first()?;
                if first.is_empty() || rows.iter().any(|r| r.len() != first.len()) {
                    return None;
                }
                let d = rows.len().min(d_max);
                let k = first.len().min(k_max);
                Some(Array2::from_shape_fn((d, k), |(i, j)| rows[i][j]))
            }
        }
    }

    pub fn from_matrix(a: &Array2<T>) -> Self {
        Values::Matrix(a.outer_iter().map(|r| r.to_vec()).collect())
    }
}

/// Input for `v` and `l`: explicit values or a selection strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeriodsInput {
    Strategy(Strategy),
    Values(Values<f64>),
}

impl From<Strategy> for PeriodsInput {
    fn from(s: Strategy) -> Self {
        PeriodsInput::Strategy(s)
    }
}

impl From<f64> for PeriodsInput {
    fn from(v: f64) -> Self {
        PeriodsInput::Values(Values::Scalar(v))
    }
}

impl From<Vec<f64>> for PeriodsInput {
    fn from(v: Vec<f64>) -> Self {
        PeriodsInput::Values(Values::Row(v))
    }
}

impl From<Vec<Vec<f64>>> for PeriodsInput {
    fn from(v: Vec<Vec<f64>>) -> Self {
        PeriodsInput::Values(Values::Matrix(v))
    }
}

/// Input for the hues: a color string like `"rggb"` or RGB triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HueInput {
    Named(String),
    Rgb(Values<i64>),
}

impl From<&str> for HueInput {
    fn from(s: &str) -> Self {
        HueInput::Named(s.to_string())
    }
}

/// The field defining the spatial periods; the other one is derived via `l = L / v`.
#[derive(Debug, Clone, PartialEq)]
pub enum Periods {
    Frequencies(Array2<f64>),
    Wavelengths(Array2<f64>),
}

impl Periods {
    pub fn frequencies(&self, length: f64) -> Array2<f64> {
        match self {
            Periods::Frequencies(v) => v.clone(),
            Periods::Wavelengths(l) => l.mapv(|l| length / l),
        }
    }

    pub fn wavelengths(&self, length: f64) -> Array2<f64> {
        match self {
            Periods::Frequencies(v) => v.mapv(|v| length / v),
            Periods::Wavelengths(l) => l.clone(),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        match self {
            Periods::Frequencies(a) | Periods::Wavelengths(a) => a.dim(),
        }
    }
}
