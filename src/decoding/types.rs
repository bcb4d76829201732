use ndarray::Array4;

/// Switches of a single decode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Also return residuals, phase, orders, uncertainty, visibility and exposure.
    pub verbose: bool,
    /// Replace outliers of the registration by their 3×3 median.
    pub despike: bool,
    /// Smooth the registration with an edge preserving bilateral filter.
    pub denoise: bool,
}

/// Result of decoding, every field shaped `(·, Y, X, C)`.
///
/// The leading axis has one entry per direction, or one per set (`D·K`) for
/// the per-set quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// Bias per direction.
    pub brightness: Array4<f64>,
    /// Amplitude per set.
    pub modulation: Array4<f64>,
    /// Decoded coordinate per direction; NaN where undecodable.
    pub registration: Array4<f64>,
    /// RMS fit residual per direction.
    pub residuals: Option<Array4<f64>>,
    /// Wrapped phase per set in `[0, 2π)`.
    pub phase: Option<Array4<f64>>,
    /// Fringe order per set.
    pub orders: Option<Array4<f64>>,
    /// Positional standard deviation per direction.
    pub uncertainty: Option<Array4<f64>>,
    /// Modulation over brightness per set.
    pub visibility: Option<Array4<f64>>,
    /// Brightness relative to the largest gray value per direction.
    pub exposure: Option<Array4<f64>>,
}
