use micro_ptrack::ptrack::PitchTracker;

// Feeds the tracker a sine sweep from 110 Hz to 880 Hz and prints the
// estimate reported after each analysis hop.
fn main() {
    let sample_rate = 44100.0;
    let hop_size = 1024;
    let duration_s = 4.0;
    let start_frequency: f64 = 110.0;
    let end_frequency: f64 = 880.0;

    let sample_count = (duration_s * sample_rate) as usize;
    let mut buffer: Vec<f32> = vec![0.0; sample_count];
    let mut phase: f64 = 0.0;
    for (i, sample) in buffer.iter_mut().enumerate() {
        // Exponential sweep, constant rate in octaves per second.
        let t = i as f64 / sample_rate;
        let frequency =
            start_frequency * (end_frequency / start_frequency).powf(t / duration_s);
        phase += 2.0 * std::f64::consts::PI * frequency / sample_rate;
        *sample = 0.6 * phase.sin() as f32;
    }

    let mut tracker = PitchTracker::new(sample_rate, hop_size).unwrap();
    let mut hop_index = 0;
    tracker.process(&buffer[..], |estimate| {
        let time_s = (hop_index * hop_size) as f64 / sample_rate;
        match estimate.confident_frequency(0.01) {
            Some(frequency) => {
                println!("t = {:.2} s: {:.1} Hz (amplitude {:.3})", time_s, frequency, estimate.amplitude)
            }
            None => println!("t = {:.2} s: no confident pitch", time_s),
        }
        hop_index += 1;
    });
}
