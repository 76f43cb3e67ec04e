use criterion::{black_box, criterion_group, criterion_main, Criterion};
use micro_ptrack::common::Fft;
use micro_ptrack::ptrack::PitchTracker;

fn run_fft_benchmark(id: &str, c: &mut Criterion, order: usize) {
    let fft = Fft::new(order);
    let mut buffer = vec![0.0f32; 1 << (order + 1)];
    for (i, value) in buffer.iter_mut().enumerate() {
        *value = (i as f32 * 0.3).sin();
    }

    c.bench_function(id, |b| {
        b.iter(|| {
            fft.compute(black_box(&mut buffer[..]));
        })
    });
}
fn fft_benchmarks(c: &mut Criterion) {
    run_fft_benchmark("FFT order 6", c, 6);
    run_fft_benchmark("FFT order 8", c, 8);
    run_fft_benchmark("FFT order 10", c, 10);
    run_fft_benchmark("FFT order 11", c, 11);
    run_fft_benchmark("FFT order 12", c, 12);
}

fn run_tracker_benchmark(id: &str, c: &mut Criterion, hop_size: usize) {
    let mut tracker = PitchTracker::new(44100.0, hop_size).unwrap();
    let mut input_buffer = vec![0.0f32; hop_size];
    for (i, sample) in input_buffer.iter_mut().enumerate() {
        *sample = 0.6 * (2.0 * std::f32::consts::PI * 440.0 * (i as f32) / 44100.0).sin();
    }

    c.bench_function(id, |b| {
        b.iter(|| {
            tracker.process(black_box(&input_buffer[..]), |_| {});
        })
    });
}
fn tracker_benchmarks(c: &mut Criterion) {
    run_tracker_benchmark("Hop 256", c, 256);
    run_tracker_benchmark("Hop 512", c, 512);
    run_tracker_benchmark("Hop 1024", c, 1024);
    run_tracker_benchmark("Hop 2048", c, 2048);
    run_tracker_benchmark("Hop 4096", c, 4096);
}

criterion_group!(benches, tracker_benchmarks, fft_benchmarks);
criterion_main!(benches);
