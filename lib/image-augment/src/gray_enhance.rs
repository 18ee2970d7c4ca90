use crate::{Augment, AugmentResult, check_range};
use derivative::Derivative;
use derive_setters::Setters;
use image::{DynamicImage, GrayImage, Luma};
use rand::Rng;

/// Grayscale conversion followed by random brightness and contrast jitter.
///
/// Output is always single channel regardless of the source mode.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct GrayEnhanceConfig {
    #[derivative(Default(value = "(0.5, 1.5)"))]
    brightness_range: (f32, f32),

    #[derivative(Default(value = "(0.5, 1.5)"))]
    contrast_range: (f32, f32),
}

impl GrayEnhanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw_brightness<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.random_range(self.brightness_range.0..=self.brightness_range.1)
    }

    fn draw_contrast<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.random_range(self.contrast_range.0..=self.contrast_range.1)
    }
}

impl Augment for GrayEnhanceConfig {
    type Output = GrayImage;

    fn name(&self) -> &'static str {
        "grayenhance"
    }

    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<GrayImage>> {
        check_range("brightness", self.brightness_range.0, self.brightness_range.1)?;
        check_range("contrast", self.contrast_range.0, self.contrast_range.1)?;

        let gray = luminance(image);
        let mut variants = Vec::with_capacity(count);

        for index in 0..count {
            let brightness = self.draw_brightness(rng);
            let mut variant = gray.clone();
            adjust_brightness(&mut variant, brightness);

            let contrast = self.draw_contrast(rng);
            adjust_contrast(&mut variant, contrast);

            log::debug!("grayenhance #{index}: brightness={brightness:.3} contrast={contrast:.3}");
            variants.push(variant);
        }

        Ok(variants)
    }
}

/// Luminance of every pixel: 0.299*R + 0.587*G + 0.114*B. Alpha is dropped.
pub fn luminance(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }

    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let pixel = rgb.get_pixel(x, y);
        let gray = 0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
        Luma([gray.round().clamp(0.0, 255.0) as u8])
    })
}

/// Scale every value by `factor`. A factor of 0 yields black, 1 leaves it unchanged.
pub fn adjust_brightness(image: &mut GrayImage, factor: f32) {
    for pixel in image.pixels_mut() {
        pixel[0] = (pixel[0] as f32 * factor).round().clamp(0.0, 255.0) as u8;
    }
}

/// Stretch values around the mean luminance. A factor of 0 yields a flat image.
pub fn adjust_contrast(image: &mut GrayImage, factor: f32) {
    let mean = mean_luminance(image);

    for pixel in image.pixels_mut() {
        let val = pixel[0] as f32;
        pixel[0] = (mean + (val - mean) * factor).round().clamp(0.0, 255.0) as u8;
    }
}

fn mean_luminance(image: &GrayImage) -> f32 {
    let count = image.as_raw().len();
    if count == 0 {
        return 0.0;
    }

    let sum: u64 = image.as_raw().iter().map(|&v| v as u64).sum();
    (sum as f64 / count as f64).round() as f32
}
