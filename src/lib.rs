//! A rust implementation of the ptrack spectral [pitch](https://en.wikipedia.org/wiki/Pitch_%28music%29)
//! detection algorithm, originally devised by Miller Puckette and known from the
//! Csound `ptrack` opcode. The algorithm estimates the fundamental frequency of
//! monophonic, primarily musical, sounds. It cannot be used to detect multiple
//! pitches at once, like in a musical chord.
//!
//! Each analysis hop runs a windowed FFT, refines bin frequencies with a
//! phase-vocoder style correction against the previous hop's spectrum, picks
//! spectral peaks, and lets harmonically related peaks vote for a common
//! fundamental in a log-frequency histogram. This keeps the estimate stable
//! even when the fundamental itself is weak or missing.
//!
//! Features
//! * Streaming API fed one sample (or one buffer) at a time, with a fixed,
//!   bounded amount of arithmetic per hop.
//! * No memory is allocated apart from a modest amount on initialization,
//!   suitable for real time audio use.
//! * Self-contained split-radix FFT, no platform FFT dependency.
//!
//! # Examples
//!
//! ```
//! use micro_ptrack::ptrack::PitchTracker;
//!
//! // Create an input buffer containing a pure tone at 440 Hz.
//! let sample_rate = 44100.0;
//! let sine_frequency = 440.0f32;
//! let mut chunk: Vec<f32> = vec![0.0; 16384];
//! for (i, sample) in chunk.iter_mut().enumerate() {
//!     *sample =
//!         0.6 * (2.0 * core::f32::consts::PI * sine_frequency * (i as f32) / 44100.0).sin();
//! }
//!
//! // Create a pitch tracker instance. The analysis window covers two hops
//! // and must be a power of two.
//! let hop_size = 2048;
//! let mut tracker = PitchTracker::new(sample_rate, hop_size).unwrap();
//!
//! // Feed the chunk to the tracker. The handler is invoked once per
//! // completed hop with the freshest estimate.
//! tracker.process(&chunk[..], |estimate| {
//!     if let Some(frequency) = estimate.confident_frequency(0.05) {
//!         println!("pitch {} Hz, amplitude {}", frequency, estimate.amplitude);
//!     }
//! });
//! ```

#![no_std]

extern crate alloc;

mod error;

pub mod common;
pub mod ptrack;

pub use error::Error;
