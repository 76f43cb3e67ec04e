use alloc::boxed::Box;
use alloc::vec;

use crate::common::Fft;
use crate::error::Error;
use crate::ptrack::Peak;

const MIN_WINDOW_SIZE: usize = 128;
const MAX_WINDOW_SIZE: usize = 8192;
const DEFAULT_PEAK_COUNT: usize = 20;
const DEFAULT_AMPLITUDE_FLOOR_DB: f64 = 40.0;

const DB_HISTORY_LENGTH: usize = 20;
const MIN_FREQ_IN_BINS: f64 = 5.0;
const MIN_BANDWIDTH: f64 = 0.03;
const BINS_PER_OCTAVE: usize = 48;
const BINS_PER_OCTAVE_OVER_LOG2: f64 = 69.24936196;
const FACTOR_TO_BINS: f64 = 4.0 / 0.0145453;
const BIN_GUARD: usize = 10;
const PARTIAL_DEVIANCE: f64 = 0.023;
const DB_SCALE: f64 = 3.333;
const DB_OFFSET: f64 = -92.3;
const MIN_BIN: usize = 3;
const VARIANCE_THRESHOLD: f32 = 10.0;

const COEF1: f32 = 0.5 * 1.227054;
const COEF2: f32 = 0.5 * -0.302385;
const COEF3: f32 = 0.5 * 0.095326;
const COEF4: f32 = 0.5 * -0.022748;
const COEF5: f32 = 0.5 * 0.002533;
const FILTER_LEN: usize = 5;
const HALF_SQRT_TWO: f32 = core::f32::consts::SQRT_2 / 2.0;

/// Log frequency histogram bin offsets of the first 16 harmonics of a
/// fundamental, i.e. `BINS_PER_OCTAVE * log2(n)` for `n` in `1..=16`.
const PARTIAL_ONSETS: [f64; 16] = [
    0.0,
    48.0,
    76.0782000346154967102,
    96.0,
    111.45254855459339269887,
    124.07820003461549671089,
    134.75303625876499715823,
    144.0,
    152.15640006923099342109,
    159.45254855459339269887,
    166.05271769459026829915,
    172.07820003461549671088,
    177.62110647077242370064,
    182.75303625876499715892,
    187.53074858920888940907,
    192.0,
];

/// The pitch and amplitude reported for one input sample.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PitchEstimate {
    /// The estimated fundamental frequency in Hz. Zero until the first
    /// analysis pass has committed a pitch; after that, the most recently
    /// committed value.
    pub frequency: f64,
    /// Linear amplitude of the most recent analysis hop, derived from its
    /// dB level.
    pub amplitude: f64,
}

impl PitchEstimate {
    /// Returns true if a pitch has been detected and the signal is loud
    /// enough for the estimate to be trusted.
    pub fn is_confident(&self, amplitude_threshold: f64) -> bool {
        self.frequency > 0.0 && self.amplitude > amplitude_threshold
    }

    /// Returns the estimated frequency in Hz, or `None` if the estimate
    /// should not be trusted. See [`is_confident`](PitchEstimate::is_confident).
    pub fn confident_frequency(&self, amplitude_threshold: f64) -> Option<f64> {
        if self.is_confident(amplitude_threshold) {
            Some(self.frequency)
        } else {
            None
        }
    }
}

struct PowerTotals {
    power: f64,
    loudness: f64,
    db: f64,
}

struct PartialMatch {
    partial_count: usize,
    count_below_8: usize,
    power: f64,
    freq_num: f64,
    freq_den: f64,
}

/// A streaming pitch tracker. Input samples are accumulated into hops of
/// `hop_size` samples and a spectral analysis pass runs once per hop; in
/// between, [`compute`](PitchTracker::compute) keeps reporting the most
/// recent result.
pub struct PitchTracker {
    sample_rate: f64,
    hop_size: usize,
    window_size: usize,
    max_peak_count: usize,
    amplitude_floor_db: f64,
    fft: Fft,
    /// Interleaved cos/-sin quarter period, applied as a complex window.
    sin_table: Box<[f32]>,
    /// Incoming samples for the current hop, scaled to 16 bit full scale.
    signal: Box<[f32]>,
    /// Analysis scratch: holds the windowed input, then the transformed
    /// spectrum, then the phase corrected spectrum with per-bin powers.
    spec1: Box<[f32]>,
    /// Analysis scratch: the conjugate mirrored spectrum with guard bands,
    /// later reused as histogram storage.
    spec2: Box<[f32]>,
    /// The mirrored spectrum of the previous hop.
    prev: Box<[f32]>,
    peaks: Box<[Peak]>,
    write_index: usize,
    history_index: usize,
    pitch_hz: f64,
    db_history: [f64; DB_HISTORY_LENGTH],
}

impl PitchTracker {
    /// Creates a pitch tracker analyzing windows of `2 * hop_size` samples
    /// with the default peak count.
    ///
    /// Returns [`Error::InvalidWindowSize`] if `2 * hop_size` is not a power
    /// of two in `[128, 8192]`.
    pub fn new(sample_rate: f64, hop_size: usize) -> Result<Self, Error> {
        PitchTracker::from_options(sample_rate, hop_size, DEFAULT_PEAK_COUNT)
    }

    /// Creates a pitch tracker retaining at most `peak_count` spectral peaks
    /// per analysis hop. Panics if `peak_count` is zero.
    pub fn from_options(
        sample_rate: f64,
        hop_size: usize,
        peak_count: usize,
    ) -> Result<Self, Error> {
        let window_size = hop_size.saturating_mul(2);
        if !window_size.is_power_of_two()
            || window_size < MIN_WINDOW_SIZE
            || window_size > MAX_WINDOW_SIZE
        {
            return Err(Error::InvalidWindowSize(window_size));
        }
        if peak_count == 0 {
            panic!("Peak count must be greater than zero");
        }

        let mut sin_table = vec![0.0f32; 2 * hop_size].into_boxed_slice();
        for i in 0..hop_size {
            let phase = core::f32::consts::PI * i as f32 / window_size as f32;
            sin_table[2 * i] = libm::cosf(phase);
            sin_table[2 * i + 1] = -libm::sinf(phase);
        }

        let order = window_size.trailing_zeros() as usize - 1;
        Ok(PitchTracker {
            sample_rate,
            hop_size,
            window_size,
            max_peak_count: peak_count,
            amplitude_floor_db: DEFAULT_AMPLITUDE_FLOOR_DB,
            fft: Fft::new(order),
            sin_table,
            signal: vec![0.0; hop_size].into_boxed_slice(),
            spec1: vec![0.0; window_size * 4 + 4 * FILTER_LEN].into_boxed_slice(),
            spec2: vec![0.0; window_size * 4 + 4 * FILTER_LEN].into_boxed_slice(),
            prev: vec![0.0; window_size + 4 * FILTER_LEN].into_boxed_slice(),
            peaks: vec![Peak::default(); peak_count + 1].into_boxed_slice(),
            write_index: 0,
            history_index: 0,
            pitch_hz: 0.0,
            db_history: [-144.0; DB_HISTORY_LENGTH],
        })
    }

    /// Accumulates one input sample and returns the current estimate.
    ///
    /// The analysis pass runs when a full hop of samples has been gathered,
    /// so the returned frequency only changes once per `hop_size` calls.
    pub fn compute(&mut self, sample: f32) -> PitchEstimate {
        if self.write_index == self.hop_size {
            self.run_analysis();
            self.write_index = 0;
        }

        self.signal[self.write_index] = sample * 32768.0;
        self.write_index += 1;

        PitchEstimate {
            frequency: self.pitch_hz,
            amplitude: libm::exp(
                self.db_history[self.history_index] / 20.0 * core::f64::consts::LN_10,
            ),
        }
    }

    /// Feeds a buffer of samples to the tracker, invoking the handler once
    /// per completed analysis hop with the freshest estimate.
    pub fn process<F>(&mut self, buffer: &[f32], mut handler: F)
    where
        F: FnMut(PitchEstimate),
    {
        for sample in buffer {
            let ran_analysis = self.write_index == self.hop_size;
            let estimate = self.compute(*sample);
            if ran_analysis {
                handler(estimate);
            }
        }
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Returns the hop size in samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Returns the analysis window size in samples, twice the hop size.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Returns the maximum number of spectral peaks retained per hop.
    pub fn peak_count(&self) -> usize {
        self.max_peak_count
    }

    /// Returns the signal level in dB below which no pitch is tracked.
    pub fn amplitude_floor_db(&self) -> f64 {
        self.amplitude_floor_db
    }

    /// Sets the signal level in dB below which no pitch is tracked. Hops
    /// quieter than this keep the previous pitch estimate.
    pub fn set_amplitude_floor_db(&mut self, amplitude_floor_db: f64) {
        self.amplitude_floor_db = amplitude_floor_db;
    }

    fn run_analysis(&mut self) {
        self.history_index += 1;
        if self.history_index == DB_HISTORY_LENGTH {
            self.history_index = 0;
        }

        self.compute_spectrum();
        let totals = self.measure_power();
        if totals.db >= self.amplitude_floor_db {
            self.track_pitch(&totals);
        }
    }

    fn compute_spectrum(&mut self) {
        self.apply_window_and_transform();
        self.mirror_spectrum();
        self.phase_correct();
        self.save_spectrum();
    }

    /// Multiplies the hop by the complex half period window and transforms
    /// it in place.
    fn apply_window_and_transform(&mut self) {
        for i in 0..self.hop_size {
            let k = 2 * i;
            self.spec1[k] = self.signal[i] * self.sin_table[k];
            self.spec1[k + 1] = self.signal[i] * self.sin_table[k + 1];
        }
        self.fft.compute(&mut self.spec1);
    }

    /// Interleaves the spectrum with its conjugate mirror image and extends
    /// both ends with conjugate guard bands for the phase correction filter.
    fn mirror_spectrum(&mut self) {
        let window_size = self.window_size;

        let mut k = 2 * FILTER_LEN;
        for i in (0..self.hop_size).step_by(2) {
            self.spec2[k] = self.spec1[i];
            self.spec2[k + 1] = self.spec1[i + 1];
            k += 4;
        }

        let mut k = 2 * FILTER_LEN + 2;
        for i in (0..window_size).step_by(2).rev() {
            self.spec2[k] = self.spec1[i];
            self.spec2[k + 1] = -self.spec1[i + 1];
            k += 4;
        }

        for i in (2 * FILTER_LEN..4 * FILTER_LEN).step_by(2) {
            let k = 4 * FILTER_LEN - 2 - i;
            self.spec2[k] = self.spec2[i];
            self.spec2[k + 1] = -self.spec2[i + 1];
        }

        for i in (0..window_size).step_by(2).rev() {
            let k = 2 * FILTER_LEN + 2 * window_size - 2 - i;
            self.spec2[k] = self.spec2[i];
            self.spec2[k + 1] = -self.spec2[k + 1];
        }
    }

    /// Refines the spectrum with a five tap filter against the previous
    /// hop's spectrum, interpolating half bins and correcting phases. Writes
    /// interleaved (re, im, _, _, re2, im2, _, _) groups, leaving two slots
    /// per bin for the power measurements.
    fn phase_correct(&mut self) {
        let prev = &self.prev;
        let spec2 = &self.spec2;
        let spec1 = &mut self.spec1;
        let half_hop = self.hop_size >> 1;

        let mut j = 0;
        let mut k = 2 * FILTER_LEN;
        for _ in 0..half_hop {
            let re = COEF1 * (prev[k - 2] - prev[k + 1] + spec2[k - 2] - prev[k + 1])
                + COEF2 * (prev[k - 3] - prev[k + 2] + spec2[k - 3] - spec2[2])
                + COEF3 * (-prev[k - 6] + prev[k + 5] - spec2[k - 6] + spec2[k + 5])
                + COEF4 * (-prev[k - 7] + prev[k + 6] - spec2[k - 7] + spec2[k + 6])
                + COEF5 * (prev[k - 10] - prev[k + 9] + spec2[k - 10] - spec2[k + 9]);

            let im = COEF1 * (prev[k - 1] + prev[k] + spec2[k - 1] + spec2[k])
                + COEF2 * (-prev[k - 4] - prev[k + 3] - spec2[k - 4] - spec2[k + 3])
                + COEF3 * (-prev[k - 5] - prev[k + 4] - spec2[k - 5] - spec2[k + 4])
                + COEF4 * (prev[k - 8] + prev[k + 7] + spec2[k - 8] + spec2[k + 7])
                + COEF5 * (prev[k - 9] + prev[k + 8] + spec2[k - 9] + spec2[k + 8]);

            spec1[j] = HALF_SQRT_TWO * (re + im);
            spec1[j + 1] = HALF_SQRT_TWO * (im - re);
            spec1[j + 4] = prev[k] + spec2[k + 1];
            spec1[j + 5] = prev[k + 1] - spec2[k];

            j += 8;
            k += 2;

            let re = COEF1 * (prev[k - 2] - prev[k + 1] - spec2[k - 2] + spec2[k + 1])
                + COEF2 * (prev[k - 3] - prev[k + 2] - spec2[k - 3] + spec2[k + 2])
                + COEF3 * (-prev[k - 6] + prev[k + 5] + spec2[k - 6] - spec2[k + 5])
                + COEF4 * (-prev[k - 7] + prev[k + 6] + spec2[k - 7] - spec2[k + 6])
                + COEF5 * (prev[k - 10] - prev[k + 9] - spec2[k - 10] + spec2[k + 9]);

            let im = COEF1 * (prev[k - 1] + prev[k] - spec2[k - 1] - spec2[k])
                + COEF2 * (-prev[k - 4] - prev[k + 3] + spec2[k - 4] + spec2[k + 3])
                + COEF3 * (-prev[k - 5] - prev[k + 4] + spec2[k - 5] + spec2[k + 4])
                + COEF4 * (prev[k - 8] + prev[k + 7] - spec2[k - 8] - spec2[k + 7])
                + COEF5 * (prev[k - 9] + prev[k + 8] - spec2[k - 9] - spec2[k + 8]);

            spec1[j] = HALF_SQRT_TWO * (re + im);
            spec1[j + 1] = HALF_SQRT_TWO * (im - re);
            spec1[j + 4] = prev[k] - spec2[k + 1];
            spec1[j + 5] = prev[k + 1] + spec2[k];

            j += 8;
            k += 2;
        }
    }

    /// Saves the mirrored spectrum for the next hop and clears the powers of
    /// the lowest bins, which never hold valid peaks.
    fn save_spectrum(&mut self) {
        let len = self.prev.len();
        self.prev.copy_from_slice(&self.spec2[..len]);

        for i in 0..MIN_BIN {
            self.spec1[4 * i + 2] = 0.0;
            self.spec1[4 * i + 3] = 0.0;
        }
    }

    /// Computes per-bin powers with the average of the two neighboring bins
    /// subtracted, plus the running power total, and derives the hop's dB
    /// level and loudness.
    fn measure_power(&mut self) -> PowerTotals {
        let mut totals = PowerTotals {
            power: 0.0,
            loudness: 0.0,
            db: 0.0,
        };

        for i in (4 * MIN_BIN..(self.window_size - 2) * 4).step_by(4) {
            let re = self.spec1[i] - 0.5 * (self.spec1[i - 8] + self.spec1[i + 8]);
            let im = self.spec1[i + 1] - 0.5 * (self.spec1[i - 7] + self.spec1[i + 9]);
            let power = re * re + im * im;
            self.spec1[i + 2] = power;
            totals.power += power as f64;
            self.spec1[i + 3] = totals.power as f32;
        }

        if totals.power > 1.0e-9 {
            totals.db = DB_SCALE * libm::log(totals.power / self.window_size as f64);
            totals.loudness = libm::sqrt(libm::sqrt(totals.power));
            if totals.db < 0.0 {
                totals.db = 0.0;
            }
        }

        self.db_history[self.history_index] = totals.db + DB_OFFSET;
        totals
    }

    fn track_pitch(&mut self, totals: &PowerTotals) {
        let peak_count = self.detect_peaks(totals.power);
        let max_bin = self.build_histogram(peak_count, totals.loudness);
        let histogram_bin = self.histogram_peak(max_bin);
        let matched = self.match_partials(peak_count, histogram_bin);
        self.commit_pitch(&matched, totals.power);
    }

    /// Picks local maxima of the power spectrum, rejecting peaks close to
    /// the noise floor and peaks whose three parabolic frequency estimates
    /// disagree too much. Returns the number of peaks found.
    fn detect_peaks(&mut self, total_power: f64) -> usize {
        let spec = &self.spec1;
        let noise_floor = 0.00001 * total_power as f32;
        let mut peak_count = 0;

        for i in (4 * MIN_BIN..4 * (self.window_size - 2)).step_by(4) {
            if peak_count >= self.max_peak_count {
                break;
            }
            let height = spec[i + 2];
            let h1 = spec[i - 2];
            let h2 = spec[i + 6];
            if height < h1 || height < h2 || h1 < noise_floor || h2 < noise_floor {
                continue;
            }

            let peak_fr = ((spec[i - 8] - spec[i + 8])
                * (2.0 * spec[i] - spec[i + 8] - spec[i - 8])
                + (spec[i - 7] - spec[i + 9]) * (2.0 * spec[i + 1] - spec[i + 9] - spec[i - 7]))
                / (height + height);
            let tmp_fr1 = ((spec[i - 12] - spec[i + 4])
                * (2.0 * spec[i - 4] - spec[i + 4] - spec[i - 12])
                + (spec[i - 11] - spec[i + 5]) * (2.0 * spec[i - 3] - spec[i + 5] - spec[i - 11]))
                / (2.0 * h1)
                - 1.0;
            let tmp_fr2 = ((spec[i - 4] - spec[i + 12])
                * (2.0 * spec[i + 4] - spec[i + 12] - spec[i - 4])
                + (spec[i - 3] - spec[i + 13]) * (2.0 * spec[i + 5] - spec[i + 13] - spec[i - 3]))
                / (2.0 * h2)
                + 1.0;

            let mean = (peak_fr + tmp_fr1 + tmp_fr2) / 3.0;
            let variance = ((peak_fr - mean) * (peak_fr - mean)
                + (tmp_fr1 - mean) * (tmp_fr1 - mean)
                + (tmp_fr2 - mean) * (tmp_fr2 - mean))
                / 2.0;

            if variance * total_power as f32 > VARIANCE_THRESHOLD * height || variance < 1.0e-30 {
                continue;
            }

            let mut frequency = (i >> 2) as f32 + mean;
            if frequency < 4.0 {
                frequency = 4.0;
            }

            self.peaks[peak_count] = Peak {
                frequency: frequency as f64,
                width: libm::sqrtf(variance) as f64,
                power: height as f64,
                loudness: libm::sqrt(libm::sqrt(height as f64)),
            };
            peak_count += 1;
        }

        peak_count
    }

    /// Lets each peak vote for the fundamentals it could be a harmonic of.
    /// Votes are parabolic bumps in a log frequency histogram, weighted by
    /// loudness and spread by peak width. Returns the histogram bin count.
    fn build_histogram(&mut self, peak_count: usize, total_loudness: f64) -> usize {
        let max_bin =
            BINS_PER_OCTAVE * (self.window_size.trailing_zeros() as usize - 2);

        for value in self.spec2[BIN_GUARD..BIN_GUARD + max_bin].iter_mut() {
            *value = 0.0;
        }

        for peak in self.peaks[..peak_count].iter() {
            let pit = BINS_PER_OCTAVE_OVER_LOG2 * libm::log(peak.frequency) - 96.0;
            let bin_bandwidth = FACTOR_TO_BINS * peak.width / peak.frequency;
            let put_bandwidth = if bin_bandwidth < 2.0 { 2.0 } else { bin_bandwidth };
            let weight_bandwidth = if bin_bandwidth < 1.0 { 1.0 } else { bin_bandwidth };
            let weight_amp = 4.0 * peak.loudness / total_loudness;

            for (index, onset) in PARTIAL_ONSETS.iter().enumerate() {
                let bin = pit - onset;
                if bin >= max_bin as f64 {
                    continue;
                }
                let first_bin = (bin + 0.5 - 0.5 * put_bandwidth) as i64;
                if first_bin < -(BIN_GUARD as i64) {
                    continue;
                }

                let score =
                    (30.0 * weight_amp / ((index as f64 + 7.0) * weight_bandwidth)) as f32;
                let last_bin = (bin + 0.5 + 0.5 * put_bandwidth) as i64;
                let parabola = (1.0 / (put_bandwidth * put_bandwidth)) as f32;
                let mut phase = first_bin as f32 - bin as f32;
                for k in 0..=(last_bin - first_bin) {
                    let slot = (BIN_GUARD as i64 + first_bin + k) as usize;
                    if let Some(value) = self.spec2.get_mut(slot) {
                        *value += score * (1.0 - parabola * phase * phase);
                    }
                    phase += 1.0;
                }
            }
        }

        max_bin
    }

    /// Returns the index of the largest histogram value, the lowest such
    /// index in case of a tie.
    fn histogram_peak(&self, max_bin: usize) -> usize {
        let histogram = &self.spec2[BIN_GUARD..BIN_GUARD + max_bin];
        let mut peak_index = 0;
        for (i, value) in histogram.iter().enumerate() {
            if *value > histogram[peak_index] {
                peak_index = i;
            }
        }
        peak_index
    }

    /// Matches the detected peaks against the first 16 harmonics of the
    /// winning fundamental candidate, accumulating an inverse variance
    /// weighted frequency estimate from the peaks that fit.
    fn match_partials(&self, peak_count: usize, histogram_bin: usize) -> PartialMatch {
        let fundamental =
            libm::exp((1.0 / BINS_PER_OCTAVE_OVER_LOG2) * (histogram_bin as f64 + 96.0));
        let mut matched = PartialMatch {
            partial_count: 0,
            count_below_8: 0,
            power: 0.0,
            freq_num: 0.0,
            freq_den: 0.0,
        };

        for peak in self.peaks[..peak_count].iter() {
            let harmonic_ratio = peak.frequency / fundamental;
            let harmonic = (harmonic_ratio + 0.5) as i64;
            if harmonic > 16 || harmonic < 1 {
                continue;
            }

            let harmonic_f = harmonic as f64;
            let deviation = 1.0 - harmonic_ratio / harmonic_f;
            if libm::fabs(deviation) >= PARTIAL_DEVIANCE {
                continue;
            }

            matched.partial_count += 1;
            if harmonic < 8 {
                matched.count_below_8 += 1;
            }
            matched.power += peak.power;

            let width = if peak.width > MIN_BANDWIDTH {
                peak.width
            } else {
                MIN_BANDWIDTH
            };
            let weight = 1.0 / ((width * harmonic_f) * (width * harmonic_f));
            matched.freq_den += weight;
            matched.freq_num += weight * peak.frequency / harmonic_f;
        }

        matched
    }

    /// Commits a new pitch if enough harmonics matched or the matched
    /// partials carry enough of the hop's power; otherwise the previous
    /// pitch is held.
    fn commit_pitch(&mut self, matched: &PartialMatch, total_power: f64) {
        if (matched.count_below_8 < 4 || matched.partial_count < 7)
            && matched.power < 0.01 * total_power
        {
            return;
        }

        let freq_in_bins = matched.freq_num / matched.freq_den;
        if freq_in_bins < MIN_FREQ_IN_BINS {
            return;
        }

        let hz_per_bin = self.sample_rate / (self.window_size + self.window_size) as f64;
        self.pitch_hz = hz_per_bin * matched.freq_num / matched.freq_den;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    fn generate_sine(sample_rate: f64, frequency: f64, sample_count: usize) -> Vec<f32> {
        let mut buffer: Vec<f32> = vec![0.0; sample_count];
        for (i, sample) in buffer.iter_mut().enumerate() {
            let phase = 2.0 * core::f64::consts::PI * frequency * (i as f64) / sample_rate;
            *sample = 0.6 * libm::sin(phase) as f32;
        }
        buffer
    }

    #[test]
    fn test_window_size_validation() {
        assert!(PitchTracker::new(44100.0, 2048).is_ok());
        // 200 is not a power of two.
        assert!(matches!(
            PitchTracker::new(44100.0, 100),
            Err(Error::InvalidWindowSize(200))
        ));
        // Window of 64 samples is too short.
        assert!(matches!(
            PitchTracker::new(44100.0, 32),
            Err(Error::InvalidWindowSize(64))
        ));
        // Window of 16384 samples is too long.
        assert!(matches!(
            PitchTracker::new(44100.0, 8192),
            Err(Error::InvalidWindowSize(16384))
        ));
        assert!(PitchTracker::new(44100.0, 0).is_err());
    }

    #[test]
    fn test_accessors() {
        let tracker = PitchTracker::from_options(48000.0, 1024, 12).unwrap();
        assert_eq!(tracker.sample_rate(), 48000.0);
        assert_eq!(tracker.hop_size(), 1024);
        assert_eq!(tracker.window_size(), 2048);
        assert_eq!(tracker.peak_count(), 12);
        assert_eq!(tracker.amplitude_floor_db(), 40.0);
    }

    #[test]
    fn test_silence() {
        let hop_size = 1024;
        let mut tracker = PitchTracker::new(44100.0, hop_size).unwrap();
        let mut estimate = None;
        for _ in 0..=4 * hop_size {
            estimate = Some(tracker.compute(0.0));
        }
        let estimate = estimate.unwrap();
        assert_eq!(estimate.frequency, 0.0);
        assert!(estimate.amplitude < 1e-3);
        assert!(!estimate.is_confident(0.05));
        assert!(estimate.confident_frequency(0.05).is_none());
    }

    #[test]
    fn test_sine_detection() {
        let sample_rate = 44100.0;
        let frequency = 440.0;
        let hop_size = 2048;
        let buffer = generate_sine(sample_rate, frequency, 8 * hop_size);

        let mut tracker = PitchTracker::new(sample_rate, hop_size).unwrap();
        let mut last_estimate = None;
        tracker.process(&buffer[..], |estimate| {
            last_estimate = Some(estimate);
        });

        let estimate = last_estimate.unwrap();
        assert!((estimate.frequency - frequency).abs() <= 2.0);
        assert!(estimate.amplitude > 0.05);
        assert_eq!(estimate.confident_frequency(0.05), Some(estimate.frequency));
    }

    #[test]
    fn test_missing_fundamental_bias() {
        // A tone with strong harmonics should be tracked at its fundamental,
        // not at the loudest partial.
        let sample_rate = 44100.0;
        let fundamental = 220.0;
        let hop_size = 2048;
        let sample_count = 8 * hop_size;

        let mut buffer: Vec<f32> = vec![0.0; sample_count];
        for (i, sample) in buffer.iter_mut().enumerate() {
            let t = i as f64 / sample_rate;
            let w = 2.0 * core::f64::consts::PI * fundamental * t;
            *sample = (0.5 * libm::sin(w)
                + 0.3 * libm::sin(2.0 * w)
                + 0.2 * libm::sin(3.0 * w)) as f32;
        }

        let mut tracker = PitchTracker::new(sample_rate, hop_size).unwrap();
        let mut last_estimate = None;
        tracker.process(&buffer[..], |estimate| {
            last_estimate = Some(estimate);
        });

        let estimate = last_estimate.unwrap();
        assert!((estimate.frequency - fundamental).abs() <= 2.0);
    }

    #[test]
    fn test_deterministic_output() {
        let sample_rate = 44100.0;
        let buffer = generate_sine(sample_rate, 330.0, 4096);

        let mut first = PitchTracker::new(sample_rate, 512).unwrap();
        let mut second = PitchTracker::new(sample_rate, 512).unwrap();
        for sample in buffer.iter() {
            let a = first.compute(*sample);
            let b = second.compute(*sample);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_estimate_changes_only_at_hop_boundaries() {
        let sample_rate = 44100.0;
        let hop_size = 512;
        let buffer = generate_sine(sample_rate, 392.0, 8 * hop_size);

        let mut tracker = PitchTracker::new(sample_rate, hop_size).unwrap();
        let mut previous: Option<PitchEstimate> = None;
        for (i, sample) in buffer.iter().enumerate() {
            let estimate = tracker.compute(*sample);
            if let Some(previous) = previous {
                if previous != estimate {
                    assert_eq!(i % hop_size, 0);
                }
            }
            previous = Some(estimate);
        }
    }

    #[test]
    fn test_amplitude_floor_gates_tracking() {
        let sample_rate = 44100.0;
        let buffer = generate_sine(sample_rate, 440.0, 8 * 2048);

        let mut tracker = PitchTracker::new(sample_rate, 2048).unwrap();
        tracker.set_amplitude_floor_db(400.0);
        assert_eq!(tracker.amplitude_floor_db(), 400.0);
        let mut last_estimate = None;
        tracker.process(&buffer[..], |estimate| {
            last_estimate = Some(estimate);
        });

        // No hop can clear a 400 dB floor, so no pitch is ever committed.
        assert_eq!(last_estimate.unwrap().frequency, 0.0);
    }

    #[test]
    #[should_panic]
    fn test_zero_peak_count_panics() {
        let _ = PitchTracker::from_options(44100.0, 1024, 0);
    }
}
