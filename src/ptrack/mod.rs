//! A rust implementation of the ptrack spectral pitch detection algorithm,
//! originally devised by Miller Puckette and known from the Csound `ptrack`
//! opcode by Victor Lazzarini. The algorithm estimates the fundamental
//! frequency of monophonic, primarily musical, sounds.
//!
//! Unlike time domain methods, ptrack works on the spectrum of each analysis
//! hop. Spectral peaks vote for candidate fundamentals in a log frequency
//! histogram, so the estimate stays locked to the fundamental even when the
//! fundamental partial itself is weak or missing from the signal.
//!
//! See [`PitchTracker`] for usage.

mod peak;
mod tracker;

pub use peak::Peak;
pub use tracker::{PitchEstimate, PitchTracker};
