//! Common algorithms and utilities.

mod fft;

pub use fft::Fft;
