use crate::error::{FringesError, Result};
use crate::params::Dtype;
use ndarray::{Array3, Array4, Axis};
use num_traits::{NumCast, ToPrimitive, Zero};

/// Frame sequence shaped `(T, Y, X, C)`, stored in its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePattern {
    U8(Array4<u8>),
    U16(Array4<u16>),
    F32(Array4<f32>),
    F64(Array4<f64>),
    Bool(Array4<bool>),
}

macro_rules! impl_from_array {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<Array4<$t>> for FramePattern {
                fn from(a: Array4<$t>) -> Self {
                    FramePattern::$variant(a)
                }
            }
        )*
    };
}

impl_from_array!(u8 => U8, u16 => U16, f32 => F32, f64 => F64, bool => Bool);

fn widen<T: ToPrimitive + Copy>(a: &Array4<T>) -> Array4<f64> {
    a.mapv(|x| x.to_f64().unwrap_or(0.0))
}

fn narrow<T: NumCast + Zero>(a: &Array4<f64>) -> Array4<T> {
    a.mapv(|x| T::from(x).unwrap_or_else(T::zero))
}

impl FramePattern {
    /// Converts intensities in `[0, Imax]` to `dtype`.
    ///
    /// Integer types are rounded to nearest if `rint`, truncated otherwise, and
    /// clamped to their range. Booleans threshold at 0.5, NaN maps to zero.
    pub fn from_f64(data: Array4<f64>, dtype: Dtype, rint: bool) -> Self {
        let imax = dtype.imax();
        let data = data.mapv(|x| {
            let x = if x.is_nan() { 0.0 } else { x };
            if dtype.is_integer() {
                let x = if rint { x.round() } else { x.trunc() };
                x.clamp(0.0, imax)
            } else {
                x
            }
        });
        match dtype {
            Dtype::U8 => FramePattern::U8(narrow(&data)),
            Dtype::U16 => FramePattern::U16(narrow(&data)),
            Dtype::F32 => FramePattern::F32(narrow(&data)),
            Dtype::F64 => FramePattern::F64(data),
            Dtype::Bool => FramePattern::Bool(data.mapv(|x| x >= 0.5)),
        }
    }

    pub fn to_f64(&self) -> Array4<f64> {
        match self {
            FramePattern::U8(a) => widen(a),
            FramePattern::U16(a) => widen(a),
            FramePattern::F32(a) => widen(a),
            FramePattern::F64(a) => a.clone(),
            FramePattern::Bool(a) => a.mapv(|x| if x { 1.0 } else { 0.0 }),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            FramePattern::U8(_) => Dtype::U8,
            FramePattern::U16(_) => Dtype::U16,
            FramePattern::F32(_) => Dtype::F32,
            FramePattern::F64(_) => Dtype::F64,
            FramePattern::Bool(_) => Dtype::Bool,
        }
    }

    pub fn dim(&self) -> (usize, usize, usize, usize) {
        match self {
            FramePattern::U8(a) => a.dim(),
            FramePattern::U16(a) => a.dim(),
            FramePattern::F32(a) => a.dim(),
            FramePattern::F64(a) => a.dim(),
            FramePattern::Bool(a) => a.dim(),
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reorders a line scan acquisition into frames.
    ///
    /// The rows of all input frames are concatenated; consecutive rows belong
    /// to consecutive frames of a sequence of `t` frames.
    pub fn deinterlace(&self, t: usize) -> Result<Self> {
        let (frames, y, x, c) = self.dim();
        let rows = frames * y;
        if t == 0 || rows % t != 0 {
            return Err(FringesError::FrameCount { frames: rows, expected: t });
        }
        let lines = rows / t;
        let data = self.to_f64();
        let flat = data
            .into_shape((rows, x, c))
            .map_err(|e| FringesError::Shape(e.to_string()))?;
        let mut out = Array4::zeros((t, lines, x, c));
        for (r, row) in flat.axis_iter(Axis(0)).enumerate() {
            out.index_axis_mut(Axis(0), r % t).index_axis_mut(Axis(0), r / t).assign(&row);
        }
        Ok(Self::from_f64(out, self.dtype(), true))
    }
}

/// Options of a single encode call.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Coordinates `(D, Y, X)` to encode instead of the configured grid.
    pub coordinates: Option<Array3<f64>>,
    /// Frame indices, taken modulo `T`; all frames if `None`.
    pub frames: Option<Vec<i64>>,
    /// Round to nearest for integer types, truncate otherwise.
    pub rint: bool,
    /// Adds camera noise with this seed.
    pub simulate: Option<u64>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { coordinates: None, frames: None, rint: true, simulate: None }
    }
}
