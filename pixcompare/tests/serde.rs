#![cfg(feature = "serde")]
//! Serialization of comparison metrics for the presentation layer.

use pixcompare::{compute_metrics, ComparisonMetrics, Img, RGBA8};

#[test]
fn test_infinite_psnr_round_trips_as_null() {
    let img = Img::new(vec![RGBA8::new(1, 2, 3, 255); 4], 2, 2);
    let metrics = compute_metrics(img.as_ref(), img.as_ref()).unwrap();

    let json = serde_json::to_value(metrics).unwrap();
    assert!(json["psnr"].is_null());
    assert_eq!(json["pixel_differences"], 0);

    let back: ComparisonMetrics = serde_json::from_value(json).unwrap();
    assert_eq!(back, metrics);
}

#[test]
fn test_finite_metrics_serialize() {
    let a = Img::new(vec![RGBA8::new(0, 0, 0, 255); 4], 2, 2);
    let b = Img::new(vec![RGBA8::new(255, 255, 255, 255); 4], 2, 2);
    let metrics = compute_metrics(a.as_ref(), b.as_ref()).unwrap();

    let json = serde_json::to_string(&metrics).unwrap();
    let back: ComparisonMetrics = serde_json::from_str(&json).unwrap();
    assert_eq!(back.max_difference, 765);
    assert_eq!(back.pixel_differences, 4);
    assert!((back.psnr - metrics.psnr).abs() < 1e-12);
}
