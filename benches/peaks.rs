use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use xrag::{analyze_spectrum, detect_peaks, PeakConfig, SyntheticSpectrum};

fn noisy_intensity(n: usize) -> (Vec<f64>, Vec<f64>) {
    let spectrum = SyntheticSpectrum {
        points: n,
        noise: 0.2,
        ..SyntheticSpectrum::default()
    }
    .generate()
    .expect("valid synthetic spectrum");
    (spectrum.energy().to_vec(), spectrum.intensity().to_vec())
}

fn peak_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_peaks");
    for n in [100usize, 10_000, 100_000] {
        let (energy, intensity) = noisy_intensity(n);
        for window in [5usize, 50] {
            let cfg = PeakConfig::default().with_window(window);
            let id = format!("n={n}/w={window}");
            group.bench_with_input(BenchmarkId::new("deque", &id), &cfg, |b, cfg| {
                b.iter(|| black_box(detect_peaks(&energy, &intensity, cfg).unwrap()));
            });
            group.bench_with_input(BenchmarkId::new("naive", &id), &cfg, |b, cfg| {
                b.iter(|| black_box(spectrum::detect_peaks_naive(&energy, &intensity, cfg).unwrap()));
            });
        }
    }
    group.finish();
}

fn full_analysis(c: &mut Criterion) {
    let spectrum = SyntheticSpectrum::default()
        .generate()
        .expect("valid synthetic spectrum");
    let cfg = PeakConfig::default();
    c.bench_function("analyze_spectrum_100", |b| {
        b.iter(|| black_box(analyze_spectrum(black_box(&spectrum), &cfg).unwrap()));
    });
}

criterion_group!(peak_benches, peak_detection, full_analysis);
criterion_main!(peak_benches);
