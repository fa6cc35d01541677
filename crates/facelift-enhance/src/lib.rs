//! Classical image enhancement for Facelift.
//!
//! [`ImageEnhancer`] implements
//! [`EnhancementGateway`](facelift_core::EnhancementGateway): it decodes the
//! upload, runs the filter stages in [`filters`] and the face stage in
//! [`face`], and encodes the result as JPEG ([`codec`]).
//!
//! ```text
//! decode -> upscale -> denoise -> sharpen -> contrast -> equalize
//!        -> faces (gfpgan / hybrid only) -> color -> polish -> JPEG
//! ```

pub mod codec;
pub mod face;
pub mod filters;
pub mod pipeline;

pub use face::{FaceDetector, FaceRegion, SkinToneDetector};
pub use pipeline::ImageEnhancer;
