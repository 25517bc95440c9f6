use super::*;
use image::Luma;

fn one_hot_2x2() -> GrayImage {
    let mut g = GrayImage::new(2, 2);
    g.put_pixel(1, 0, Luma([255]));
    g
}

#[test]
fn inclusion_high_keeps_only_white() {
    let m = WeightMatrix::from_grey(
        &one_hot_2x2(),
        MaskPolarity::InclusionHigh,
        MaskValuePolicy::Threshold,
    )
    .unwrap();
    assert_eq!(m.dimensions(), (2, 2));
    assert_eq!(m.included_count(), 1);
    assert_eq!(m.get(1, 0), 1.0);
    assert!(m.get(0, 0).is_nan());
    assert!(m.get(0, 1).is_nan());
    assert!(m.get(1, 1).is_nan());
}

#[test]
fn inclusion_low_inverts_polarity() {
    let m = WeightMatrix::from_grey(
        &one_hot_2x2(),
        MaskPolarity::InclusionLow,
        MaskValuePolicy::Threshold,
    )
    .unwrap();
    assert_eq!(m.included_count(), 3);
    assert!(m.get(1, 0).is_nan());
    assert_eq!(m.get(0, 0), 1.0);
    assert_eq!(m.get(1, 1), 1.0);
}

#[test]
fn threshold_snaps_intermediate_values() {
    let mut g = GrayImage::new(3, 1);
    g.put_pixel(0, 0, Luma([127]));
    g.put_pixel(1, 0, Luma([128]));
    g.put_pixel(2, 0, Luma([200]));
    let m = WeightMatrix::from_grey(&g, MaskPolarity::InclusionHigh, MaskValuePolicy::Threshold)
        .unwrap();
    assert!(m.get(0, 0).is_nan());
    assert_eq!(m.get(1, 0), 1.0);
    assert_eq!(m.get(2, 0), 1.0);
}

#[test]
fn reject_policy_names_the_pixel() {
    let mut g = GrayImage::new(2, 2);
    g.put_pixel(1, 1, Luma([7]));
    let err = WeightMatrix::from_grey(&g, MaskPolarity::InclusionLow, MaskValuePolicy::Reject)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("mask value 7"));
    assert!(msg.contains("(1, 1)"));
}

#[test]
fn from_weights_checks_length() {
    assert!(WeightMatrix::from_weights(2, 2, vec![1.0; 3]).is_err());
    let m = WeightMatrix::from_weights(2, 1, vec![1.0, f64::NAN]).unwrap();
    assert_eq!(m.rows().count(), 1);
    assert_eq!(m.included_count(), 1);
}
