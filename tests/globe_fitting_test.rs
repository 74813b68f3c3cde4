//! Tests for eye globe auto-fitting


use gaze_estimation::{
    config::GlobeConfig,
    globe_fitting::GlobeFitter,
    observation::PupilObservation,
    session::{FitProgress, GlobeFitSession},
    utils::stats::{mad_filter, median_point},
};
use test_helpers::{assert_point_near, synthetic_rays};

const CENTER: (f64, f64) = (300.0, 220.0);

/// Rays whose minor axes all pass through one point recover that point
#[test]
fn test_exact_center_recovery() {
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(CENTER, 90.0, 40, 9.0) {
        assert!(fitter.add_observation(obs));
    }

    let center = fitter.average_intersection(640.0, 480.0).unwrap();
    assert_point_near(center, CENTER, 1e-6);
}

#[test]
fn test_five_rays_is_enough() {
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(CENTER, 90.0, 5, 36.0) {
        fitter.add_observation(obs);
    }

    let center = fitter.average_intersection(640.0, 480.0).unwrap();
    assert_point_near(center, CENTER, 1e-6);
    assert_eq!(fitter.quality_metrics().intersection_count, 10);
}

#[test]
fn test_outlier_rays_rejected() {
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(CENTER, 90.0, 40, 9.0) {
        fitter.add_observation(obs);
    }
    // Rays through a point that is not the globe center
    for angle in [10.0, 100.0, 160.0] {
        fitter.add_observation(PupilObservation::new((340.0, 280.0), (12.0, 20.0), angle, 0.9));
    }

    let center = fitter.average_intersection(640.0, 480.0).unwrap();
    assert_point_near(center, CENTER, 1e-6);
}

#[test]
fn test_intersections_persist_across_calls() {
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(CENTER, 90.0, 5, 36.0) {
        fitter.add_observation(obs);
    }

    fitter.average_intersection(640.0, 480.0);
    fitter.average_intersection(640.0, 480.0);
    assert_eq!(fitter.quality_metrics().intersection_count, 20);
}

#[test]
fn test_intersection_ring_capacity() {
    let config = GlobeConfig {
        max_intersections: 50,
        ..GlobeConfig::default()
    };
    let mut fitter = GlobeFitter::with_config(config);
    for obs in synthetic_rays(CENTER, 90.0, 20, 9.0) {
        fitter.add_observation(obs);
    }

    assert!(fitter.average_intersection(640.0, 480.0).is_some());
    assert_eq!(fitter.quality_metrics().intersection_count, 50);
}

#[test]
fn test_intersections_outside_frame_margin_dropped() {
    // Center far outside a small frame plus margin
    let far = (2000.0, 2000.0);
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(far, 90.0, 10, 18.0) {
        fitter.add_observation(obs);
    }

    assert_eq!(fitter.average_intersection(640.0, 480.0), None);
    assert_eq!(fitter.quality_metrics().intersection_count, 0);
}

#[test]
fn test_close_angles_not_paired() {
    let mut fitter = GlobeFitter::new();
    // Five rays within 8° of each other
    for obs in synthetic_rays(CENTER, 90.0, 5, 2.0) {
        fitter.add_observation(obs);
    }
    assert_eq!(fitter.average_intersection(640.0, 480.0), None);
    assert_eq!(fitter.quality_metrics().intersection_count, 0);
}

/// Low-confidence observations never enter the ray buffer
#[test]
fn test_low_confidence_rejected() {
    let mut fitter = GlobeFitter::new();
    let obs = PupilObservation::new((320.0, 240.0), (12.0, 20.0), 45.0, 0.5);
    assert!(!fitter.add_observation(obs));
    assert_eq!(fitter.quality_metrics().ray_count, 0);
}

#[test]
fn test_coverage_limited_to_half_orientation_range() {
    // Major-axis angles in [0, 180) only reach four of the eight sectors
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(CENTER, 90.0, 120, 3.0) {
        fitter.add_observation(obs);
    }

    let metrics = fitter.quality_metrics();
    assert_eq!(metrics.ray_count, 120);
    assert_eq!(metrics.angular_coverage, 50.0);
    assert_eq!(&metrics.sectors[..2], &[0, 0]);
    assert_eq!(&metrics.sectors[6..], &[0, 0]);
    assert!(!metrics.is_ready);
}

#[test]
fn test_ready_with_relaxed_coverage() {
    let config = GlobeConfig {
        ready_min_coverage: 50.0,
        ..GlobeConfig::default()
    };
    let mut fitter = GlobeFitter::with_config(config);
    let rays = synthetic_rays(CENTER, 90.0, 60, 3.0);

    for obs in &rays[..49] {
        fitter.add_observation(*obs);
    }
    assert!(!fitter.quality_metrics().is_ready);

    for obs in &rays[49..] {
        fitter.add_observation(*obs);
    }
    assert!(fitter.quality_metrics().is_ready);
}

#[test]
fn test_fit_globe_radius() {
    let mut fitter = GlobeFitter::new();
    for obs in synthetic_rays(CENTER, 90.0, 40, 9.0) {
        fitter.add_observation(obs);
    }

    let globe = fitter.fit_globe(640.0, 480.0).unwrap();
    assert_point_near(globe.center, CENTER, 1e-6);
    assert!((globe.radius - 90.0).abs() < 1e-6);
    assert!(globe.is_plausible());
    assert!(!globe.is_oversized());
}

#[test]
fn test_session_finishes_when_ready() {
    let config = GlobeConfig {
        ready_min_coverage: 50.0,
        ..GlobeConfig::default()
    };
    let mut session = GlobeFitSession::new(config);

    let mut finished = None;
    for (i, obs) in synthetic_rays(CENTER, 90.0, 60, 3.0).into_iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64 / 30.0;
        if let FitProgress::Finished { metrics, timed_out } = session.add_observation(obs, t) {
            finished = Some((metrics.ray_count, timed_out));
            break;
        }
    }

    assert_eq!(finished, Some((50, false)));
    let globe = session.finish().unwrap();
    assert_point_near(globe.center, CENTER, 1e-6);
}

#[test]
fn test_session_keeps_center_for_implausible_radius() {
    let mut session = GlobeFitSession::new(GlobeConfig::default());
    for (i, obs) in synthetic_rays(CENTER, 20.0, 40, 9.0).into_iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64 / 30.0;
        session.add_observation(obs, t);
    }

    let globe = session.finish().unwrap();
    assert_point_near(globe.center, CENTER, 1e-6);
    assert!((globe.radius - 20.0).abs() < 1e-6);
    assert!(!globe.is_plausible());
}

/// 20 points near the origin plus three far outliers
#[test]
fn test_mad_filter_excludes_outliers() {
    let cluster: Vec<(f64, f64)> = [-0.15, -0.1, 0.0, 0.1, 0.15]
        .iter()
        .flat_map(|&x| [-0.1, -0.05, 0.05, 0.1].into_iter().map(move |y| (x, y)))
        .collect();
    assert_eq!(cluster.len(), 20);

    let mut points = cluster.clone();
    points.extend([(1000.0, 1000.0); 3]);

    let filtered = mad_filter(&points, 2.0);
    assert_eq!(filtered.len(), 20);
    assert!(!filtered.contains(&(1000.0, 1000.0)));
    assert_eq!(median_point(&filtered), median_point(&cluster));
}
