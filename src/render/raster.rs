use image::RgbaImage;

use crate::{
    foundation::core::{Affine, BezPath, CanvasSize, OutputSize, Point},
    foundation::error::{StrokemapError, StrokemapResult},
    strokes::{color::StrokeColor, model::Stroke},
};

/// Opaque fill painted over the logical canvas before any stroke.
pub const BACKGROUND_GREY: StrokeColor = StrokeColor::rgb(0x80, 0x80, 0x80);

/// Build the poly-line for one stroke in logical canvas coordinates.
///
/// With `flip_y` every point becomes `(x, canvas_height - y)`; one upstream data source records
/// the vertical axis inverted.
pub fn stroke_path(stroke: &Stroke, canvas_height: f64, flip_y: bool) -> BezPath {
    let mut path = BezPath::new();
    for (i, &p) in stroke.points.iter().enumerate() {
        let p = if flip_y {
            Point::new(p.x, canvas_height - p.y)
        } else {
            p
        };
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path
}

/// Render a trial's strokes onto a grey canvas at the output resolution.
///
/// Strokes are drawn in input order with round joins and caps. The logical canvas is fitted
/// into `output` with uniform scale and centering; anything outside it stays transparent.
/// Returns straight (non-premultiplied) RGBA8.
#[tracing::instrument(skip(strokes), fields(strokes = strokes.len()))]
pub fn rasterize_strokes(
    strokes: &[Stroke],
    canvas: CanvasSize,
    output: OutputSize,
    flip_y: bool,
) -> StrokemapResult<RgbaImage> {
    let width: u16 = output
        .width
        .try_into()
        .map_err(|_| StrokemapError::render("raster width exceeds u16"))?;
    let height: u16 = output
        .height
        .try_into()
        .map_err(|_| StrokemapError::render("raster height exceeds u16"))?;

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(canvas.fit_affine(output)));

    ctx.set_paint(color_to_cpu(BACKGROUND_GREY));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        canvas.width,
        canvas.height,
    ));

    let mut drawn = 0usize;
    for stroke in strokes {
        // A lone move-to has no extent; SVG renders nothing for it either.
        if stroke.points.len() < 2 {
            continue;
        }
        let path = bezpath_to_cpu(&stroke_path(stroke, canvas.height, flip_y));
        ctx.set_stroke(
            vello_cpu::kurbo::Stroke::new(stroke.nib_width)
                .with_join(vello_cpu::kurbo::Join::Round)
                .with_caps(vello_cpu::kurbo::Cap::Round),
        );
        ctx.set_paint(color_to_cpu(stroke.color));
        ctx.stroke_path(&path);
        drawn += 1;
    }
    tracing::debug!(drawn, skipped = strokes.len() - drawn, "strokes rasterized");

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);

    premul_to_straight_image(pixmap.data_as_u8_slice(), output)
}

fn color_to_cpu(c: StrokeColor) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn premul_to_straight_image(rgba8_premul: &[u8], output: OutputSize) -> StrokemapResult<RgbaImage> {
    let mut straight = rgba8_premul.to_vec();
    for px in straight.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    RgbaImage::from_raw(output.width, output.height, straight)
        .ok_or_else(|| StrokemapError::render("raster byte length mismatch"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
