//! Face-region detection and enhancement.
//!
//! Detection is behind the [`FaceDetector`] trait. The default
//! [`SkinToneDetector`] needs no trained model: it thresholds skin chroma in
//! YCbCr, labels connected regions, and keeps those with a plausible face
//! shape. Enhancement smooths each region and blends it back through a
//! feathered elliptical mask.

use image::imageops;
use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::filters::saturate;

/// Pixels added around each detected face before enhancing it.
pub const FACE_PADDING: u32 = 10;

/// An axis-aligned face bounding box, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl FaceRegion {
    /// Grow the box by `padding` on every side, clamped to `bounds`.
    #[must_use]
    pub fn padded(&self, padding: u32, (max_w, max_h): (u32, u32)) -> Self {
        let x = self.x.saturating_sub(padding);
        let y = self.y.saturating_sub(padding);
        let right = (self.x + self.width + padding).min(max_w);
        let bottom = (self.y + self.height + padding).min(max_h);
        Self {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }
}

/// Locates faces in an image.
pub trait FaceDetector: Send + Sync {
    /// Return the detected face boxes.
    fn detect(&self, image: &RgbImage) -> Vec<FaceRegion>;
}

/// Skin-chroma face detector.
#[derive(Debug, Clone)]
pub struct SkinToneDetector {
    /// Smallest accepted side length.
    pub min_size: u32,
    /// Accepted `width / height` range.
    pub aspect_range: (f32, f32),
    /// Minimum share of the box covered by skin pixels.
    pub min_fill: f32,
}

impl Default for SkinToneDetector {
    fn default() -> Self {
        Self {
            min_size: 50,
            aspect_range: (0.5, 2.0),
            min_fill: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

impl SkinToneDetector {
    fn skin_mask(image: &RgbImage) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0.map(f32::from);
            let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
            let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
            let skin = (77.0..=127.0).contains(&cb) && (133.0..=173.0).contains(&cr);
            Luma([if skin { 255 } else { 0 }])
        })
    }

    fn accepts(&self, bounds: &Bounds) -> bool {
        let width = bounds.max_x - bounds.min_x + 1;
        let height = bounds.max_y - bounds.min_y + 1;
        if width < self.min_size || height < self.min_size {
            return false;
        }
        let aspect = width as f32 / height as f32;
        let fill = bounds.area as f32 / (width * height) as f32;
        (self.aspect_range.0..=self.aspect_range.1).contains(&aspect) && fill >= self.min_fill
    }
}

impl FaceDetector for SkinToneDetector {
    fn detect(&self, image: &RgbImage) -> Vec<FaceRegion> {
        let mask = Self::skin_mask(image);
        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        let mut regions: Vec<Option<Bounds>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if regions.len() <= label {
                regions.resize(label + 1, None);
            }
            let bounds = regions[label].get_or_insert(Bounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                area: 0,
            });
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
            bounds.area += 1;
        }

        regions
            .into_iter()
            .flatten()
            .filter(|bounds| self.accepts(bounds))
            .map(|b| FaceRegion {
                x: b.min_x,
                y: b.min_y,
                width: b.max_x - b.min_x + 1,
                height: b.max_y - b.min_y + 1,
            })
            .collect()
    }
}

/// Smooth each face region and blend it back, weighted by `blend_weight`.
///
/// The blend mask is an ellipse covering the central part of the padded
/// region, feathered so no seam shows at its edge.
#[must_use]
pub fn enhance_faces(image: &RgbImage, faces: &[FaceRegion], blend_weight: f64) -> RgbImage {
    let mut out = image.clone();
    let weight = blend_weight.clamp(0.0, 1.0) as f32;
    if weight <= 0.0 {
        return out;
    }

    for face in faces {
        let region = face.padded(FACE_PADDING, image.dimensions());
        if region.width < 3 || region.height < 3 {
            continue;
        }

        let original =
            imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
        let smoothed = median_filter(&original, 2, 2);
        let mask = feathered_ellipse(region.width, region.height);

        for (x, y, pixel) in original.enumerate_pixels() {
            let alpha = f32::from(mask.get_pixel(x, y)[0]) / 255.0 * weight;
            let soft = smoothed.get_pixel(x, y);
            let mut blended = *pixel;
            for (c, channel) in blended.0.iter_mut().enumerate() {
                *channel = saturate(
                    f32::from(soft[c]) * alpha + f32::from(pixel[c]) * (1.0 - alpha),
                );
            }
            out.put_pixel(region.x + x, region.y + y, blended);
        }
    }
    out
}

fn feathered_ellipse(width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius_x = ((width / 3) as i32).max(1);
    let radius_y = ((height as f32 / 2.5) as i32).max(1);
    draw_filled_ellipse_mut(&mut mask, center, radius_x, radius_y, Luma([255u8]));
    gaussian_blur_f32(&mask, 2.0)
}
