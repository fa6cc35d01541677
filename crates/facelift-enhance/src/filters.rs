//! Whole-image filter stages.
//!
//! Each stage takes an RGB buffer and returns a new one. Stages with a zero
//! strength return the input unchanged.

use facelift_core::EnhanceMode;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// Blur radius of the unsharp mask.
const UNSHARP_SIGMA: f32 = 2.0;

/// Share of the equalized luma mixed back into the image.
const EQUALIZE_BLEND: f32 = 0.35;

const SATURATION_GAIN: f32 = 1.15;
const VALUE_GAIN: f32 = 1.05;

/// Upscale by `scale`. Factors at or below `1.0` leave the image as is.
#[must_use]
pub fn upscale(image: &RgbImage, scale: f64, mode: EnhanceMode) -> RgbImage {
    if scale <= 1.0 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    let nw = ((f64::from(w) * scale) as u32).max(1);
    let nh = ((f64::from(h) * scale) as u32).max(1);
    let filter = match mode {
        EnhanceMode::Gfpgan => FilterType::Lanczos3,
        EnhanceMode::Hybrid | EnhanceMode::Traditional => FilterType::CatmullRom,
    };
    imageops::resize(image, nw, nh, filter)
}

/// Edge-preserving noise reduction. The median window grows with `strength`.
#[must_use]
pub fn denoise(image: &RgbImage, strength: f64) -> RgbImage {
    if strength <= 0.0 {
        return image.clone();
    }
    let radius = (strength / 6.0).ceil().clamp(1.0, 3.0) as u32;
    median_filter(image, radius, radius)
}

/// Unsharp mask: `src * (1 + s) - blur(src) * s`.
#[must_use]
pub fn sharpen(image: &RgbImage, strength: f64) -> RgbImage {
    if strength <= 0.0 {
        return image.clone();
    }
    let s = strength as f32;
    let blurred = gaussian_blur_f32(image, UNSHARP_SIGMA);
    zip_pixels(image, &blurred, |src, blur| src * (1.0 + s) - blur * s)
}

/// Linear gain and offset: `v * alpha + beta`, saturated to `0..=255`.
#[must_use]
pub fn adjust_contrast(image: &RgbImage, alpha: f64, beta: i32) -> RgbImage {
    let alpha = alpha as f32;
    let beta = beta as f32;
    map_channels(image, |v| v * alpha + beta)
}

/// Histogram equalization of the luma channel, partially blended in so that
/// chroma and the overall tone survive.
#[must_use]
pub fn equalize_luma(image: &RgbImage) -> RgbImage {
    let luma = imageops::grayscale(image);
    let equalized = equalize_histogram(&luma);

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let before = f32::from(luma.get_pixel(x, y)[0]);
        let after = f32::from(equalized.get_pixel(x, y)[0]);
        let shift = (after - before) * EQUALIZE_BLEND;
        for channel in &mut pixel.0 {
            *channel = saturate(f32::from(*channel) + shift);
        }
    }
    out
}

/// Saturation and brightness boost in HSV space.
#[must_use]
pub fn boost_color(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let (h, s, v) = rgb_to_hsv(*pixel);
        *pixel = hsv_to_rgb(
            h,
            (s * SATURATION_GAIN).min(1.0),
            (v * VALUE_GAIN).min(1.0),
        );
    }
    out
}

/// A very light smoothing pass: 95% original, 5% blurred.
#[must_use]
pub fn polish(image: &RgbImage) -> RgbImage {
    let blurred = gaussian_blur_f32(image, 0.5);
    zip_pixels(image, &blurred, |src, blur| src * 0.95 + blur * 0.05)
}

pub(crate) fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_channels(image: &RgbImage, f: impl Fn(f32) -> f32) -> RgbImage {
    let mut out = image.clone();
    for channel in out.iter_mut() {
        *channel = saturate(f(f32::from(*channel)));
    }
    out
}

fn zip_pixels(a: &RgbImage, b: &RgbImage, f: impl Fn(f32, f32) -> f32) -> RgbImage {
    let mut out = a.clone();
    for (dst, &other) in out.iter_mut().zip(b.iter()) {
        *dst = saturate(f(f32::from(*dst), f32::from(other)));
    }
    out
}

fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if (max - r).abs() <= f32::EPSILON {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() <= f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (hue, saturation, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb([
        saturate((r + m) * 255.0),
        saturate((g + m) * 255.0),
        saturate((b + m) * 255.0),
    ])
}
