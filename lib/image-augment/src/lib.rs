//! Randomized image augmentation.
//!
//! Every transform takes one source image, a variant count and a caller-owned
//! random generator, and produces that many independently drawn variants.

pub mod batch;
pub mod gray_enhance;
pub mod mosaic;
pub mod noise;
pub mod picture_in_picture;
pub mod resize_flip;
pub mod transform;
pub mod watermark;

pub use batch::{BatchConfig, BatchFailure, BatchReport, output_file_name, run_batch};
pub use gray_enhance::GrayEnhanceConfig;
pub use mosaic::{
    MosaicAbort, MosaicConfig, MosaicDraw, MosaicOutcome, MosaicRegion, OutOfBoundsPolicy,
};
pub use noise::NoiseConfig;
pub use picture_in_picture::{BackgroundPool, PictureInPictureConfig};
pub use resize_flip::ResizeFlipConfig;
pub use transform::TransformKind;
pub use watermark::{WatermarkConfig, WatermarkFont};

use image::DynamicImage;
use rand::Rng;

pub type AugmentResult<T> = Result<T, AugmentError>;

#[derive(thiserror::Error, Debug)]
pub enum AugmentError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Mosaic lookup out of bounds: {0}")]
    OutOfBounds(MosaicAbort),
    #[error("Invalid font: {0}")]
    InvalidFont(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Walk dir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

pub trait Augment {
    type Output;

    /// Token used in output file names.
    fn name(&self) -> &'static str;

    /// Produce `count` variants of `image`, drawing every parameter from `rng`.
    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<Self::Output>>;
}

/// Validate a caller supplied variant count.
pub fn variant_count(count: i64) -> AugmentResult<usize> {
    if count < 0 {
        return Err(AugmentError::InvalidParameter(format!(
            "variant count must be non-negative, got {count}"
        )));
    }

    usize::try_from(count)
        .map_err(|_| AugmentError::InvalidParameter(format!("variant count too large: {count}")))
}

pub(crate) fn check_range(name: &str, low: f32, high: f32) -> AugmentResult<()> {
    if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
        return Err(AugmentError::InvalidParameter(format!(
            "{name} range [{low}, {high}] is invalid"
        )));
    }

    Ok(())
}
