use image::{DynamicImage, Rgba, RgbImage, RgbaImage};

/// Silhouette image pasted over each drawing to cut it to the body outline.
///
/// Only its alpha matters for where it lands; its colour is what remains visible outside the
/// outline.
#[derive(Clone, Debug)]
pub struct StencilMask {
    image: RgbaImage,
}

impl StencilMask {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Images without an alpha channel act as their own paste mask: luma becomes alpha.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        if img.color().has_alpha() {
            return Self::from_rgba(img.to_rgba8());
        }
        let luma = img.to_luma8();
        let (w, h) = luma.dimensions();
        let image = RgbaImage::from_fn(w, h, |x, y| {
            let l = luma.get_pixel(x, y).0[0];
            Rgba([l, l, l, l])
        });
        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }
}

/// Paste `src` onto `dst` at `(x, y)` using `src`'s own alpha as the blend mask.
///
/// Every channel, alpha included, becomes `src * a + dst * (1 - a)`. Parts of `src` falling
/// outside `dst` are clipped.
pub fn paste_with_alpha(dst: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    let (dw, dh) = dst.dimensions();
    let (sw, sh) = src.dimensions();
    let w = sw.min(dw.saturating_sub(x));
    let h = sh.min(dh.saturating_sub(y));

    for sy in 0..h {
        for sx in 0..w {
            let s = src.get_pixel(sx, sy).0;
            let a = u32::from(s[3]);
            if a == 0 {
                continue;
            }
            let d = dst.get_pixel_mut(x + sx, y + sy);
            if a == 255 {
                d.0 = s;
                continue;
            }
            for (dc, &sc) in d.0.iter_mut().zip(s.iter()) {
                *dc = blend_u8(sc, *dc, a);
            }
        }
    }
}

/// Paste the stencil over the raster (twice when the canvas holds front and back side by side)
/// and flatten to RGB.
#[tracing::instrument(skip(raster, stencil))]
pub fn composite_stencil(raster: &RgbaImage, stencil: &StencilMask, apply_twice: bool) -> RgbImage {
    let mut out = raster.clone();
    paste_with_alpha(&mut out, stencil.as_rgba(), 0, 0);
    if apply_twice {
        let half_width = out.width() / 2;
        paste_with_alpha(&mut out, stencil.as_rgba(), half_width, 0);
    }
    DynamicImage::ImageRgba8(out).to_rgb8()
}

fn blend_u8(src: u8, dst: u8, a: u32) -> u8 {
    ((u32::from(src) * a + u32::from(dst) * (255 - a) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
