//! The staged enhancement pipeline.

use std::time::Instant;

use facelift_core::{EnhanceParams, EnhancedImage, EnhancementGateway, GatewayError, StageTiming};
use tracing::{debug, info, warn};

use crate::codec;
use crate::face::{FaceDetector, SkinToneDetector, enhance_faces};
use crate::filters;

/// Largest accepted upscaling factor.
pub const MAX_SCALE: f64 = 4.0;

/// Largest working image, in pixels, after upscaling (4096 x 4096).
pub const MAX_OUTPUT_PIXELS: u64 = 4096 * 4096;

/// Runs decode, eight enhancement stages, and JPEG encoding.
///
/// Stage order: `upscaling`, `noise_reduction`, `sharpening`, `contrast`,
/// `histogram`, `face_enhancement`, `color_enhancement`, `final_polish`.
/// Each stage is timed and reported, along with a `total`.
pub struct ImageEnhancer {
    detector: Box<dyn FaceDetector>,
}

impl std::fmt::Debug for ImageEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageEnhancer").finish_non_exhaustive()
    }
}

impl Default for ImageEnhancer {
    fn default() -> Self {
        Self::new(SkinToneDetector::default())
    }
}

impl ImageEnhancer {
    /// Create an enhancer that finds faces with `detector`.
    #[must_use]
    pub fn new(detector: impl FaceDetector + 'static) -> Self {
        Self {
            detector: Box::new(detector),
        }
    }
}

impl EnhancementGateway for ImageEnhancer {
    fn enhance(&self, image: &[u8], params: &EnhanceParams) -> Result<EnhancedImage, GatewayError> {
        let input = codec::decode(image)?;
        let original_size = input.dimensions();
        let scale = params.scale_factor.clamp(1.0, MAX_SCALE);
        check_budget(original_size, scale)?;

        let started = Instant::now();
        let mut timings = Vec::with_capacity(9);

        let out = timed(&mut timings, "upscaling", || {
            filters::upscale(&input, scale, params.mode)
        });
        drop(input);
        let out = timed(&mut timings, "noise_reduction", || {
            filters::denoise(&out, params.noise_reduction)
        });
        let out = timed(&mut timings, "sharpening", || {
            filters::sharpen(&out, params.sharpen_strength)
        });
        let out = timed(&mut timings, "contrast", || {
            filters::adjust_contrast(&out, params.contrast, params.brightness)
        });
        let out = timed(&mut timings, "histogram", || filters::equalize_luma(&out));

        let mut faces_detected = 0;
        let out = timed(&mut timings, "face_enhancement", || {
            if !(params.face_enhancement && params.mode.enhances_faces()) {
                return out;
            }
            let faces = self.detector.detect(&out);
            faces_detected = faces.len();
            enhance_faces(&out, &faces, params.blend_weight)
        });

        let out = timed(&mut timings, "color_enhancement", || filters::boost_color(&out));
        let out = timed(&mut timings, "final_polish", || filters::polish(&out));
        timings.push(StageTiming::new("total", started.elapsed().as_secs_f64()));

        let enhanced_size = out.dimensions();
        let data = codec::encode_jpeg(&out)?;

        info!(
            original = ?original_size,
            enhanced = ?enhanced_size,
            faces = faces_detected,
            mode = %params.mode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image enhanced"
        );

        Ok(EnhancedImage {
            data,
            mime_type: codec::OUTPUT_MIME.to_owned(),
            faces_detected,
            timings,
            original_size,
            enhanced_size,
        })
    }
}

/// Refuse inputs whose upscaled size would exceed [`MAX_OUTPUT_PIXELS`].
fn check_budget((width, height): (u32, u32), scale: f64) -> Result<(), GatewayError> {
    let output_pixels = (f64::from(width) * scale) as u64 * (f64::from(height) * scale) as u64;
    if output_pixels > MAX_OUTPUT_PIXELS {
        warn!(width, height, scale, output_pixels, "image exceeds pixel budget");
        return Err(GatewayError::ImageTooLarge {
            width,
            height,
            scale,
            max_pixels: MAX_OUTPUT_PIXELS,
        });
    }
    Ok(())
}

fn timed<T>(timings: &mut Vec<StageTiming>, stage: &str, run: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = run();
    let seconds = started.elapsed().as_secs_f64();
    debug!(stage, seconds, "stage complete");
    timings.push(StageTiming::new(stage, seconds));
    value
}
