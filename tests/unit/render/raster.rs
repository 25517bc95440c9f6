use super::*;

fn line(color: StrokeColor, nib: f64, canvas: f64, points: &[(f64, f64)]) -> Stroke {
    Stroke {
        color,
        nib_width: nib,
        width: Some(canvas),
        height: Some(canvas),
        points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
    }
}

fn px(img: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
    img.get_pixel(x, y).0
}

const RED: StrokeColor = StrokeColor::rgb(255, 0, 0);
const BLUE: StrokeColor = StrokeColor::rgb(0, 0, 255);

#[test]
fn flip_y_maps_points_to_height_minus_y() {
    let s = line(RED, 1.0, 20.0, &[(0.0, 0.0), (10.0, 10.0)]);
    let flipped = stroke_path(&s, 20.0, true);
    let pts: Vec<_> = flipped
        .elements()
        .iter()
        .filter_map(|el| el.end_point())
        .collect();
    assert_eq!(pts, vec![Point::new(0.0, 20.0), Point::new(10.0, 10.0)]);

    let straight = stroke_path(&s, 20.0, false);
    assert_eq!(straight.elements()[0], kurbo::PathEl::MoveTo(Point::new(0.0, 0.0)));
}

#[test]
fn background_is_opaque_grey() {
    let canvas = CanvasSize::new(16.0, 16.0).unwrap();
    let out = OutputSize::new(16, 16).unwrap();
    let img = rasterize_strokes(&[], canvas, out, false).unwrap();
    assert_eq!(img.dimensions(), (16, 16));
    assert!(img.pixels().all(|p| p.0 == [128, 128, 128, 255]));
}

#[test]
fn single_point_stroke_draws_nothing() {
    let canvas = CanvasSize::new(16.0, 16.0).unwrap();
    let out = OutputSize::new(16, 16).unwrap();
    let s = line(RED, 6.0, 16.0, &[(8.0, 8.0)]);
    let img = rasterize_strokes(&[s], canvas, out, false).unwrap();
    assert_eq!(px(&img, 8, 8), [128, 128, 128, 255]);
}

#[test]
fn horizontal_stroke_covers_its_row_only() {
    let canvas = CanvasSize::new(100.0, 100.0).unwrap();
    let out = OutputSize::new(100, 100).unwrap();
    let s = line(RED, 5.0, 100.0, &[(10.0, 50.0), (90.0, 50.0)]);
    let img = rasterize_strokes(&[s], canvas, out, false).unwrap();
    assert_eq!(px(&img, 50, 50), [255, 0, 0, 255]);
    assert_eq!(px(&img, 50, 10), [128, 128, 128, 255]);
    assert_eq!(px(&img, 50, 90), [128, 128, 128, 255]);
}

#[test]
fn flip_moves_stroke_to_mirrored_row() {
    let canvas = CanvasSize::new(100.0, 100.0).unwrap();
    let out = OutputSize::new(100, 100).unwrap();
    let s = line(RED, 5.0, 100.0, &[(10.0, 20.0), (90.0, 20.0)]);
    let img = rasterize_strokes(&[s], canvas, out, true).unwrap();
    assert_eq!(px(&img, 50, 80), [255, 0, 0, 255]);
    assert_eq!(px(&img, 50, 20), [128, 128, 128, 255]);
}

#[test]
fn later_strokes_paint_over_earlier_ones() {
    let canvas = CanvasSize::new(40.0, 40.0).unwrap();
    let out = OutputSize::new(40, 40).unwrap();
    let a = line(RED, 8.0, 40.0, &[(0.0, 20.0), (40.0, 20.0)]);
    let b = line(BLUE, 8.0, 40.0, &[(20.0, 0.0), (20.0, 40.0)]);
    let img = rasterize_strokes(&[a, b], canvas, out, false).unwrap();
    assert_eq!(px(&img, 20, 20), [0, 0, 255, 255]);
    assert_eq!(px(&img, 5, 20), [255, 0, 0, 255]);
}

#[test]
fn logical_canvas_is_scaled_to_output() {
    let canvas = CanvasSize::new(50.0, 50.0).unwrap();
    let out = OutputSize::new(100, 100).unwrap();
    let s = line(RED, 4.0, 50.0, &[(0.0, 25.0), (50.0, 25.0)]);
    let img = rasterize_strokes(&[s], canvas, out, false).unwrap();
    assert_eq!(img.dimensions(), (100, 100));
    assert_eq!(px(&img, 50, 50), [255, 0, 0, 255]);
    assert_eq!(px(&img, 50, 40), [128, 128, 128, 255]);
}

#[test]
fn aspect_mismatch_leaves_transparent_letterbox() {
    let canvas = CanvasSize::new(100.0, 50.0).unwrap();
    let out = OutputSize::new(100, 100).unwrap();
    let img = rasterize_strokes(&[], canvas, out, false).unwrap();
    assert_eq!(px(&img, 50, 5)[3], 0);
    assert_eq!(px(&img, 50, 50), [128, 128, 128, 255]);
    assert_eq!(px(&img, 50, 95)[3], 0);
}
