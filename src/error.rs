use thiserror::Error;

/// Errors reported when constructing a [`PitchTracker`](crate::ptrack::PitchTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The analysis window (twice the hop size) must be a power of two
    /// between 128 and 8192 samples.
    #[error("invalid analysis window size {0}: must be a power of two in [128, 8192]")]
    InvalidWindowSize(usize),
}
