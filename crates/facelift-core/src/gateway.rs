//! The enhancement gateway boundary.
//!
//! The HTTP layer never touches pixels. It hands raw image bytes and an
//! [`EnhanceParams`] set to an [`EnhancementGateway`] and gets back encoded
//! output bytes, a face count, and per-stage timings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Enhancement flavour.
///
/// Face-region enhancement only runs in [`EnhanceMode::Gfpgan`] and
/// [`EnhanceMode::Hybrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhanceMode {
    /// Highest quality upscaling plus face enhancement.
    #[default]
    Gfpgan,
    /// Traditional upscaling plus face enhancement.
    Hybrid,
    /// Traditional upscaling, no face enhancement.
    Traditional,
}

impl EnhanceMode {
    /// The wire name of this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gfpgan => "gfpgan",
            Self::Hybrid => "hybrid",
            Self::Traditional => "traditional",
        }
    }

    /// Whether this mode runs the face-region stage.
    #[must_use]
    pub fn enhances_faces(self) -> bool {
        matches!(self, Self::Gfpgan | Self::Hybrid)
    }
}

impl fmt::Display for EnhanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhanceMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gfpgan" => Ok(Self::Gfpgan),
            "hybrid" => Ok(Self::Hybrid),
            "traditional" => Ok(Self::Traditional),
            _ => Err(()),
        }
    }
}

/// Tunable parameters of one enhancement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceParams {
    /// Upscaling factor, `1.0..=4.0`.
    pub scale_factor: f64,
    /// Unsharp-mask strength, `0.0..=5.0`.
    pub sharpen_strength: f64,
    /// Noise reduction strength, `0.0..=20.0`. `0` disables the stage.
    pub noise_reduction: f64,
    /// Linear contrast gain, `0.5..=3.0`.
    pub contrast: f64,
    /// Brightness offset added after the contrast gain, `-100..=100`.
    pub brightness: i32,
    /// Weight of the enhanced face region when blended back, `0.0..=1.0`.
    pub blend_weight: f64,
    /// Whether the face-region stage is enabled at all.
    pub face_enhancement: bool,
    /// Enhancement flavour.
    pub mode: EnhanceMode,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            scale_factor: 2.0,
            sharpen_strength: 1.2,
            noise_reduction: 6.0,
            contrast: 1.15,
            brightness: 15,
            blend_weight: 0.8,
            face_enhancement: true,
            mode: EnhanceMode::Gfpgan,
        }
    }
}

impl EnhanceParams {
    /// Field names accepted by [`EnhanceParams::set`].
    pub const FIELDS: [&'static str; 8] = [
        "scale",
        "sharpen",
        "denoise",
        "contrast",
        "brightness",
        "blend",
        "face_enhancement",
        "mode",
    ];

    /// Override one parameter from its textual form.
    ///
    /// Unknown names are ignored. Values that do not parse or fall outside the
    /// accepted range are rejected with [`GatewayError::InvalidParameter`].
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), GatewayError> {
        let value = value.trim();
        let invalid = || GatewayError::InvalidParameter {
            name: name.to_owned(),
            value: value.to_owned(),
        };

        match name {
            "scale" => self.scale_factor = parse_ranged(value, 1.0, 4.0).ok_or_else(invalid)?,
            "sharpen" => {
                self.sharpen_strength = parse_ranged(value, 0.0, 5.0).ok_or_else(invalid)?;
            }
            "denoise" => {
                self.noise_reduction = parse_ranged(value, 0.0, 20.0).ok_or_else(invalid)?;
            }
            "contrast" => self.contrast = parse_ranged(value, 0.5, 3.0).ok_or_else(invalid)?,
            "brightness" => {
                self.brightness = value
                    .parse::<i32>()
                    .ok()
                    .filter(|v| (-100..=100).contains(v))
                    .ok_or_else(invalid)?;
            }
            "blend" => self.blend_weight = parse_ranged(value, 0.0, 1.0).ok_or_else(invalid)?,
            "face_enhancement" => {
                self.face_enhancement = match value.to_ascii_lowercase().as_str() {
                    "1" | "true" | "on" | "yes" => true,
                    "0" | "false" | "off" | "no" => false,
                    _ => return Err(invalid()),
                };
            }
            "mode" => self.mode = value.parse().map_err(|()| invalid())?,
            _ => {}
        }
        Ok(())
    }
}

fn parse_ranged(value: &str, min: f64, max: f64) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (min..=max).contains(v))
}

/// Wall-clock duration of one named pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Stage name, e.g. `"sharpening"`.
    pub stage: String,
    /// Duration in seconds.
    pub seconds: f64,
}

impl StageTiming {
    /// Create a timing entry.
    #[must_use]
    pub fn new(stage: impl Into<String>, seconds: f64) -> Self {
        Self {
            stage: stage.into(),
            seconds,
        }
    }
}

/// Successful gateway output.
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    /// Encoded output image.
    pub data: Vec<u8>,
    /// MIME type of [`EnhancedImage::data`].
    pub mime_type: String,
    /// Number of face regions found.
    pub faces_detected: usize,
    /// Per-stage timings, in pipeline order.
    pub timings: Vec<StageTiming>,
    /// Input dimensions `(width, height)`.
    pub original_size: (u32, u32),
    /// Output dimensions `(width, height)`.
    pub enhanced_size: (u32, u32),
}

/// Errors crossing the gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The payload is not a decodable image. The detail is for logs only.
    #[error("Failed to decode image")]
    InvalidImage(String),

    /// The image, once upscaled, would exceed the pipeline's pixel budget.
    #[error("Image too large: {width}x{height} at scale {scale} exceeds {max_pixels} output pixels")]
    ImageTooLarge {
        /// Input width.
        width: u32,
        /// Input height.
        height: u32,
        /// Requested scale factor.
        scale: f64,
        /// Largest accepted output size, in pixels.
        max_pixels: u64,
    },

    /// A parameter value could not be parsed or is out of range.
    #[error("invalid value for parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Rejected value.
        value: String,
    },

    /// The pipeline failed after the input was accepted.
    #[error("enhancement failed: {0}")]
    Processing(String),
}

impl GatewayError {
    /// Whether the caller, rather than the pipeline, is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidImage(_) | Self::ImageTooLarge { .. } | Self::InvalidParameter { .. }
        )
    }
}

/// Synchronous entry point into the image pipeline.
///
/// Implementations are CPU-bound; async callers should run them on a blocking
/// thread.
pub trait EnhancementGateway: Send + Sync + 'static {
    /// Enhance an encoded image.
    fn enhance(&self, image: &[u8], params: &EnhanceParams) -> Result<EnhancedImage, GatewayError>;
}
