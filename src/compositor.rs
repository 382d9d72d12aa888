//! Overlay compositing: fit a logo into a bounded box, centre it, and blend it
//! over a QR raster.
//!
//! All entry points allocate a fresh output raster; neither `base` nor
//! `overlay` is modified.

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

/// Fraction of the QR edge used for fixed branding logos.
pub const DEFAULT_LOGO_FRACTION: f64 = 0.25;

/// Composite `overlay` centred on `base`, bounded by `max_fraction` of its size.
pub fn composite(base: &RgbaImage, overlay: &RgbaImage, max_fraction: f64) -> RgbaImage {
    match thumbnail(base, overlay, max_fraction) {
        Some(resized) => place_centered(base, &resized),
        None => base.clone(),
    }
}

/// Like [`composite`], with the overlay's alpha scaled by `opacity` after resizing.
///
/// `opacity` is clamped to `[0, 1]`; a non-finite value counts as fully opaque.
pub fn composite_with_opacity(
    base: &RgbaImage,
    overlay: &RgbaImage,
    max_fraction: f64,
    opacity: f64,
) -> RgbaImage {
    match thumbnail(base, overlay, max_fraction) {
        Some(resized) => place_centered(base, &apply_opacity(&resized, opacity)),
        None => base.clone(),
    }
}

/// Largest size not exceeding `box_w × box_h` that keeps the `w × h` aspect ratio.
///
/// Images that already fit are returned unchanged; nothing is ever upscaled.
/// Integer arithmetic throughout, each side at least 1.
pub fn fit_within(w: u32, h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    if box_w >= w && box_h >= h {
        return (w, h);
    }

    let (mut new_w, mut new_h) = (w, h);
    if w > box_w {
        new_h = ((u64::from(h) * u64::from(box_w)) / u64::from(w)).max(1) as u32;
        new_w = box_w;
    }
    if new_h > box_h {
        new_w = ((u64::from(new_w) * u64::from(box_h)) / u64::from(new_h)).max(1) as u32;
        new_h = box_h;
    }
    (new_w, new_h)
}

/// Offset that centres a `w × h` rectangle inside the base, floor-divided.
pub fn center_offset(base: &RgbaImage, w: u32, h: u32) -> (u32, u32) {
    (
        base.width().saturating_sub(w) / 2,
        base.height().saturating_sub(h) / 2,
    )
}

/// Copy of `img` with each alpha value multiplied by `opacity`.
pub fn apply_opacity(img: &RgbaImage, opacity: f64) -> RgbaImage {
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        1.0
    };

    let mut out = img.clone();
    if opacity < 1.0 {
        for pixel in out.pixels_mut() {
            pixel[3] = (f64::from(pixel[3]) * opacity).round() as u8;
        }
    }
    out
}

fn thumbnail(base: &RgbaImage, overlay: &RgbaImage, max_fraction: f64) -> Option<RgbaImage> {
    if !max_fraction.is_finite() || max_fraction <= 0.0 {
        log::warn!("Overlay fraction {} is not positive, skipping overlay", max_fraction);
        return None;
    }

    let box_w = (f64::from(base.width()) * max_fraction).floor() as u32;
    let box_h = (f64::from(base.height()) * max_fraction).floor() as u32;
    if box_w == 0 || box_h == 0 || overlay.width() == 0 || overlay.height() == 0 {
        log::warn!(
            "Overlay box {}x{} for {}x{} overlay is empty, skipping overlay",
            box_w,
            box_h,
            overlay.width(),
            overlay.height()
        );
        return None;
    }

    let (new_w, new_h) = fit_within(overlay.width(), overlay.height(), box_w, box_h);
    log::debug!(
        "Fitting overlay {}x{} into {}x{} -> {}x{}",
        overlay.width(),
        overlay.height(),
        box_w,
        box_h,
        new_w,
        new_h
    );

    if (new_w, new_h) == overlay.dimensions() {
        return Some(overlay.clone());
    }
    Some(resize_premultiplied(overlay, new_w, new_h))
}

/// Lanczos3 resize on premultiplied colour, so fully transparent pixels do not
/// bleed their RGB into the overlay's soft edges.
fn resize_premultiplied(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let premultiplied = Rgba32FImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let a = f32::from(p[3]) / 255.0;
        Rgba([
            f32::from(p[0]) / 255.0 * a,
            f32::from(p[1]) / 255.0 * a,
            f32::from(p[2]) / 255.0 * a,
            a,
        ])
    });

    let resized = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);

    RgbaImage::from_fn(width, height, |x, y| {
        let p = resized.get_pixel(x, y);
        let a = p[3].clamp(0.0, 1.0);
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |v: f32| ((v / a).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(p[0]), channel(p[1]), channel(p[2]), (a * 255.0).round() as u8])
    })
}

fn place_centered(base: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let (x, y) = center_offset(base, overlay.width(), overlay.height());
    let mut out = base.clone();
    blend_onto(&mut out, overlay, x, y);
    out
}

/// Alpha-composite `top` onto `canvas` at `(x, y)` using the "over" operator.
fn blend_onto(canvas: &mut RgbaImage, top: &RgbaImage, x: u32, y: u32) {
    for (dx, dy, src) in top.enumerate_pixels() {
        let (tx, ty) = (x + dx, y + dy);
        if tx >= canvas.width() || ty >= canvas.height() {
            continue;
        }
        match src[3] {
            0 => {}
            255 => canvas.put_pixel(tx, ty, *src),
            _ => {
                let dst = canvas.get_pixel(tx, ty);
                let blended = blend_over(dst, src);
                canvas.put_pixel(tx, ty, blended);
            }
        }
    }
}

fn blend_over(dst: &Rgba<u8>, src: &Rgba<u8>) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| -> u8 {
        let c = (f32::from(src[i]) * sa + f32::from(dst[i]) * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
