//! Benchmarks for globe fitting and calibration solving

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gaze_estimation::{
    calibration::CalibrationModel, globe_fitting::GlobeFitter, observation::PupilObservation,
    utils::stats::mad_filter,
};

/// Noisy pupil ellipses around a globe center at (320, 240)
fn generate_rays(count: u32) -> Vec<PupilObservation> {
    (0..count)
        .map(|i| {
            let phi = f64::from(i) * 360.0 / f64::from(count);
            let (sin, cos) = phi.to_radians().sin_cos();
            let radius = 90.0 + 5.0 * (rand::random::<f64>() - 0.5);
            let center = (320.0 + radius * cos, 240.0 + radius * sin);
            let angle = (phi - 90.0 + 2.0 * (rand::random::<f64>() - 0.5)).rem_euclid(180.0);
            PupilObservation::new(center, (12.0, 20.0), angle, 0.9)
        })
        .collect()
}

fn benchmark_globe_fitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("globe_fitting");

    for count in [10u32, 50, 150, 300] {
        let rays = generate_rays(count);

        group.bench_with_input(BenchmarkId::new("average_intersection", count), &rays, |b, rays| {
            b.iter(|| {
                let mut fitter = GlobeFitter::new();
                for obs in rays {
                    fitter.add_observation(*obs);
                }
                black_box(fitter.average_intersection(640.0, 480.0))
            });
        });
    }

    let a = PupilObservation::new((100.0, 100.0), (12.0, 20.0), 20.0, 0.9);
    let b_obs = PupilObservation::new((200.0, 150.0), (12.0, 20.0), 110.0, 0.9);
    group.bench_function("line_intersection", |b| {
        b.iter(|| black_box(GlobeFitter::line_intersection(black_box(&a), black_box(&b_obs))));
    });

    let points: Vec<(f64, f64)> = (0..3000)
        .map(|_| (320.0 + rand::random::<f64>() * 10.0, 240.0 + rand::random::<f64>() * 10.0))
        .collect();
    group.bench_function("mad_filter_3000", |b| {
        b.iter(|| black_box(mad_filter(black_box(&points), 2.0)));
    });

    group.finish();
}

fn benchmark_calibration(c: &mut Criterion) {
    let mut model = CalibrationModel::new();
    for &x in &[0.1, 0.5, 0.9] {
        for &y in &[0.1, 0.5, 0.9] {
            model.add_point((280.0 + 80.0 * x, 200.0 + 60.0 * y), (640.0 * x, 480.0 * y));
        }
    }

    c.bench_function("calibration_compute_model", |b| {
        b.iter(|| black_box(model.compute_model()));
    });

    model.compute_model().ok();
    c.bench_function("calibration_map_point", |b| {
        b.iter(|| black_box(model.map_point(black_box((320.0, 230.0)))));
    });
}

criterion_group!(benches, benchmark_globe_fitting, benchmark_calibration);
criterion_main!(benches);
