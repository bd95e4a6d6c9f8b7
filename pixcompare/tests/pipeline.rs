//! End-to-end tests of the comparison pipeline: load, reconcile, measure,
//! render, cache and debounce.

mod common;

use std::borrow::Cow;
use std::time::{Duration, Instant};

use common::generators::{
    distort_brightness, gen_checkerboard, gen_gradient_h, gen_noise, gen_uniform,
};
use common::{encode_png, raster};
use pixcompare::{
    compare_images, difference_image, reconcile, CompareError, CompareParams, ComparisonSession,
    Debouncer, RasterImage, ScaledImageCache, SourceId, RGBA8,
};

#[test]
fn test_identical_images() {
    let img = raster(1, gen_noise(37, 29, 7), 37, 29);
    let m = compare_images(&img, &img, &CompareParams::default()).unwrap();

    assert_eq!(m.mse, 0.0);
    assert_eq!(m.psnr, f64::INFINITY);
    assert_eq!(m.pixel_differences, 0);
    assert_eq!(m.max_difference, 0);
    assert!((m.ssim - 1.0).abs() < 1e-9, "ssim {}", m.ssim);
}

#[test]
fn test_aspect_mismatch_is_fatal() {
    let a = raster(1, gen_uniform(100, 100, 0, 0, 0), 100, 100);
    let b = raster(2, gen_uniform(100, 50, 0, 0, 0), 100, 50);
    let params = CompareParams::default();

    assert!(matches!(
        reconcile(&a, &b, &params),
        Err(CompareError::AspectMismatch { .. })
    ));
    assert!(matches!(
        compare_images(&a, &b, &params),
        Err(CompareError::AspectMismatch { .. })
    ));
    assert!(matches!(
        difference_image(&a, &b, &params),
        Err(CompareError::AspectMismatch { .. })
    ));

    let mut session = ComparisonSession::default();
    assert!(session.compare(&a, &b).is_err());
    assert_eq!(session.cache_len(), 0);
}

#[test]
fn test_reconcile_never_upscales() {
    let a = raster(1, gen_gradient_h(200, 100), 200, 100);
    let b = raster(2, gen_gradient_h(100, 50), 100, 50);

    let (a2, b2) = reconcile(&a, &b, &CompareParams::default()).unwrap();
    assert_eq!(a2.dimensions(), (100, 50));
    assert_eq!(b2.dimensions(), (100, 50));

    // A downsampled gradient stays close to the native one.
    let m = compare_images(&a, &b, &CompareParams::default()).unwrap();
    assert!(m.psnr > 30.0, "psnr {}", m.psnr);
    assert!(m.ssim > 0.99, "ssim {}", m.ssim);
}

#[test]
fn test_reconcile_is_idempotent_on_matching_sizes() {
    let a = raster(1, gen_noise(64, 48, 1), 64, 48);
    let b = raster(2, gen_noise(64, 48, 2), 64, 48);
    let params = CompareParams::default();

    for _ in 0..2 {
        let (a2, b2) = reconcile(&a, &b, &params).unwrap();
        assert!(matches!(a2, Cow::Borrowed(x) if std::ptr::eq(x, &a)));
        assert!(matches!(b2, Cow::Borrowed(x) if std::ptr::eq(x, &b)));
    }
}

#[test]
fn test_black_vs_white() {
    let black = raster(1, gen_uniform(30, 20, 0, 0, 0), 30, 20);
    let white = raster(2, gen_uniform(30, 20, 255, 255, 255), 30, 20);
    let m = compare_images(&black, &white, &CompareParams::default()).unwrap();

    assert_eq!(m.max_difference, 765);
    assert_eq!(m.pixel_differences, 600);
    assert!((m.mse - 255.0 * 255.0).abs() < 1e-9);
    assert!(m.psnr.is_finite() && m.psnr.abs() < 1e-9);

    let diff = difference_image(&black, &white, &CompareParams::default()).unwrap();
    assert!(diff
        .pixels()
        .iter()
        .all(|p| *p == RGBA8::new(255, 0, 0, 255)));
}

#[test]
fn test_brightness_shift() {
    let base = gen_checkerboard(32, 32, 4);
    let a = raster(1, base.clone(), 32, 32);
    let b = raster(2, distort_brightness(&base, 10), 32, 32);
    let m = compare_images(&a, &b, &CompareParams::default()).unwrap();

    // Only the black squares change: +10 on each channel.
    assert_eq!(m.pixel_differences, 512);
    assert_eq!(m.max_difference, 30);
    assert!((m.mse - 50.0).abs() < 1e-9);
    assert!(m.ssim < 1.0 && m.ssim > 0.9, "ssim {}", m.ssim);

    let diff = difference_image(&a, &b, &CompareParams::default()).unwrap();
    assert_eq!(diff.intensity(0, 0), 90);
    assert_eq!(diff.intensity(4, 0), 0);
}

#[test]
fn test_cache_bound() {
    let mut cache = ScaledImageCache::default();
    for i in 0..25u64 {
        let source = SourceId::file(format!("img{i}.png"), 1000 + i);
        cache.get_or_create(&source, 10, 10, || {
            RasterImage::filled(source.clone(), 10, 10, RGBA8::default()).unwrap()
        });
    }

    assert_eq!(cache.len(), 20);
    for i in 0..5u64 {
        let source = SourceId::file(format!("img{i}.png"), 1000 + i);
        assert!(!cache.contains(&source, 10, 10), "img{i} should be evicted");
    }
    let remaining: Vec<_> = cache.keys().map(|k| k.source.clone()).collect();
    let expected: Vec<_> = (5..25u64)
        .map(|i| SourceId::file(format!("img{i}.png"), 1000 + i))
        .collect();
    assert_eq!(remaining, expected);
}

#[test]
fn test_debounce_three_requests_one_run() {
    let start = Instant::now();
    let mut runs = Vec::new();
    let mut debouncer = Debouncer::new();

    for (n, offset) in [(1, 0u64), (2, 20), (3, 40)] {
        debouncer.schedule_at(n, Duration::from_millis(300), start + Duration::from_millis(offset));
    }
    for tick in (0..=1000).step_by(10) {
        if let Some(n) = debouncer.poll_at(start + Duration::from_millis(tick)) {
            runs.push((n, tick));
        }
    }

    assert_eq!(runs, vec![(3, 340)]);
}

#[test]
fn test_session_load_and_compare() {
    let reference = raster(1, gen_gradient_h(80, 40), 80, 40);
    let smaller = raster(2, gen_gradient_h(40, 20), 40, 20);
    let ref_png = encode_png(&reference);
    let small_png = encode_png(&smaller);

    let mut session = ComparisonSession::default();
    let a = session
        .load(SourceId::file("reference.png", ref_png.len() as u64), &ref_png)
        .unwrap();
    let b = session
        .load(SourceId::file("smaller.png", small_png.len() as u64), &small_png)
        .unwrap();
    assert_eq!(a.pixels(), reference.pixels());

    let start = Instant::now();
    session.request_compare_at(&a, &b, start);
    session.request_compare_at(&a, &b, start + Duration::from_millis(100));
    assert!(session.poll_compare_at(start + Duration::from_millis(300)).is_none());
    let metrics = session
        .poll_compare_at(start + Duration::from_millis(400))
        .unwrap()
        .unwrap();
    assert!(metrics.psnr > 30.0);

    // The reduced reference is cached and reused by the unthrottled diff.
    assert_eq!(session.cache_len(), 1);
    let diff = session.difference(&a, &b).unwrap();
    assert_eq!((diff.width(), diff.height()), (40, 20));
    assert_eq!(session.cache_len(), 1);
}

#[test]
fn test_loader_caps_large_input() {
    let wide = raster(1, gen_uniform(300, 100, 10, 20, 30), 300, 100);
    let png = encode_png(&wide);
    let params = CompareParams::default().with_max_dimension(150);
    let loaded = pixcompare::load_image(SourceId::opaque(1), &png, &params).unwrap();
    assert_eq!(loaded.dimensions(), (150, 50));
}

#[test]
fn test_metrics_on_worker_thread() {
    let a = raster(1, gen_noise(50, 50, 3), 50, 50);
    let b = raster(2, gen_noise(50, 50, 4), 50, 50);
    let expected = compare_images(&a, &b, &CompareParams::default()).unwrap();

    let handle = std::thread::spawn(move || {
        compare_images(&a, &b, &CompareParams::default()).unwrap()
    });
    assert_eq!(handle.join().unwrap(), expected);
}
