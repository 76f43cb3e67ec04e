/// A spectral peak picked from one analysis hop.
#[derive(Debug, Copy, Clone, Default)]
pub struct Peak {
    /// Peak frequency in bins of the doubled analysis window, refined by
    /// parabolic interpolation. Never below 4.
    pub frequency: f64,
    /// Standard deviation of the three interpolated frequency estimates,
    /// a measure of how well-defined the peak is.
    pub width: f64,
    /// Power of the peak bin.
    pub power: f64,
    /// Fourth root of the peak power.
    pub loudness: f64,
}
