//! Random down-scaling followed by random mirroring.

use crate::{Augment, AugmentError, AugmentResult, check_range};
use derivative::Derivative;
use derive_setters::Setters;
use image::{DynamicImage, imageops::FilterType};
use rand::Rng;

/// Axis a variant is mirrored across. Each is decided by its own coin flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    LeftToRight,
    TopToBottom,
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ResizeFlipConfig {
    /// Scale factor range, drawn independently for width and height.
    #[derivative(Default(value = "(0.5, 0.9)"))]
    scale_range: (f32, f32),

    /// Probability of each flip.
    #[derivative(Default(value = "0.5"))]
    flip_probability: f64,

    #[derivative(Default(value = "FilterType::Lanczos3"))]
    filter: FilterType,
}

impl ResizeFlipConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Augment for ResizeFlipConfig {
    type Output = DynamicImage;

    fn name(&self) -> &'static str {
        "resizeflip"
    }

    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<DynamicImage>> {
        check_range("scale", self.scale_range.0, self.scale_range.1)?;
        if !(0.0..=1.0).contains(&self.flip_probability) {
            return Err(AugmentError::InvalidParameter(format!(
                "flip probability {} is outside [0, 1]",
                self.flip_probability
            )));
        }

        let (width, height) = (image.width(), image.height());
        let mut variants = Vec::with_capacity(count);

        for index in 0..count {
            let scale_width = rng.random_range(self.scale_range.0..=self.scale_range.1);
            let scale_height = rng.random_range(self.scale_range.0..=self.scale_range.1);
            let target = (
                scaled_dimension(width, scale_width),
                scaled_dimension(height, scale_height),
            );

            let mirrors = [Mirror::LeftToRight, Mirror::TopToBottom]
                .map(|axis| (axis, rng.random_bool(self.flip_probability)));

            log::debug!(
                "resizeflip #{index}: {}x{} -> {}x{} fliph={} flipv={}",
                width,
                height,
                target.0,
                target.1,
                mirrors[0].1,
                mirrors[1].1
            );

            let mut variant = image.resize_exact(target.0, target.1, self.filter);
            for (axis, chosen) in mirrors {
                if chosen {
                    variant = mirror(&variant, axis);
                }
            }

            variants.push(variant);
        }

        Ok(variants)
    }
}

pub fn mirror(image: &DynamicImage, axis: Mirror) -> DynamicImage {
    match axis {
        Mirror::LeftToRight => image.fliph(),
        Mirror::TopToBottom => image.flipv(),
    }
}

/// `round(dimension * factor)`, never below one pixel.
pub fn scaled_dimension(dimension: u32, factor: f32) -> u32 {
    ((dimension as f64 * factor as f64).round() as u32).max(1)
}
