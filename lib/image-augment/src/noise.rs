use crate::{Augment, AugmentError, AugmentResult};
use derivative::Derivative;
use derive_setters::Setters;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

/// Additive gaussian noise followed by salt-and-pepper corruption.
///
/// Each stage runs on its own generator, seeded from the caller's generator.
/// Alpha samples are never touched.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct NoiseConfig {
    /// Variance of the gaussian noise on the normalized [0, 1] scale.
    #[derivative(Default(value = "0.01"))]
    gaussian_variance: f32,

    /// Fraction of samples replaced by salt or pepper.
    #[derivative(Default(value = "0.05"))]
    salt_pepper_amount: f64,

    /// Share of salt among the replaced samples.
    #[derivative(Default(value = "0.5"))]
    salt_ratio: f64,

    /// Stage seeds are drawn from `0..=max_seed`.
    #[derivative(Default(value = "8888"))]
    max_seed: u64,
}

impl NoiseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(&self) -> AugmentResult<Normal<f32>> {
        for (name, value) in [
            ("salt and pepper amount", self.salt_pepper_amount),
            ("salt ratio", self.salt_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AugmentError::InvalidParameter(format!(
                    "{name} {value} is outside [0, 1]"
                )));
            }
        }

        if !(self.gaussian_variance >= 0.0) {
            return Err(AugmentError::InvalidParameter(format!(
                "gaussian variance {} is negative",
                self.gaussian_variance
            )));
        }

        Normal::new(0.0, self.gaussian_variance.sqrt())
            .map_err(|e| AugmentError::InvalidParameter(format!("gaussian noise: {e}")))
    }

    fn corrupt(
        &self,
        normal: &Normal<f32>,
        buffer: &mut NoiseBuffer,
        gaussian_seed: u64,
        salt_pepper_seed: u64,
    ) {
        let mut samples: Vec<f32> = buffer.data.iter().map(|&v| v as f32 / 255.0).collect();
        let channels = buffer.layout.channels();
        let has_alpha = buffer.layout.has_alpha();
        let is_color = |i: usize| !(has_alpha && i % channels == channels - 1);

        let mut rng = StdRng::seed_from_u64(gaussian_seed);
        for (i, sample) in samples.iter_mut().enumerate() {
            if is_color(i) {
                *sample = (*sample + normal.sample(&mut rng)).clamp(0.0, 1.0);
            }
        }

        let mut rng = StdRng::seed_from_u64(salt_pepper_seed);
        for (i, sample) in samples.iter_mut().enumerate() {
            if is_color(i) && rng.random_bool(self.salt_pepper_amount) {
                *sample = if rng.random_bool(self.salt_ratio) { 1.0 } else { 0.0 };
            }
        }

        for (i, (out, sample)) in buffer.data.iter_mut().zip(samples).enumerate() {
            if is_color(i) {
                *out = quantize(sample);
            }
        }
    }
}

// Back to 8 bits, dropping the fractional part.
fn quantize(sample: f32) -> u8 {
    (sample * 255.0).clamp(0.0, 255.0) as u8
}

impl Augment for NoiseConfig {
    type Output = DynamicImage;

    fn name(&self) -> &'static str {
        "noise"
    }

    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<DynamicImage>> {
        let normal = self.validate()?;
        let source = NoiseBuffer::from_image(image);
        let mut variants = Vec::with_capacity(count);

        for index in 0..count {
            let gaussian_seed = rng.random_range(0..=self.max_seed);
            let salt_pepper_seed = rng.random_range(0..=self.max_seed);
            log::debug!("noise #{index}: gaussian_seed={gaussian_seed} salt_pepper_seed={salt_pepper_seed}");

            let mut buffer = source.clone();
            self.corrupt(&normal, &mut buffer, gaussian_seed, salt_pepper_seed);
            variants.push(buffer.into_image()?);
        }

        Ok(variants)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Luma,
    LumaAlpha,
    Rgb,
    Rgba,
}

impl Layout {
    fn channels(self) -> usize {
        match self {
            Layout::Luma => 1,
            Layout::LumaAlpha => 2,
            Layout::Rgb => 3,
            Layout::Rgba => 4,
        }
    }

    fn has_alpha(self) -> bool {
        matches!(self, Layout::LumaAlpha | Layout::Rgba)
    }
}

// 8-bit interleaved samples; deeper inputs are narrowed to RGB or RGBA.
#[derive(Debug, Clone)]
struct NoiseBuffer {
    layout: Layout,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl NoiseBuffer {
    fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (layout, data) = match image {
            DynamicImage::ImageLuma8(buffer) => (Layout::Luma, buffer.as_raw().clone()),
            DynamicImage::ImageLumaA8(buffer) => (Layout::LumaAlpha, buffer.as_raw().clone()),
            DynamicImage::ImageRgb8(buffer) => (Layout::Rgb, buffer.as_raw().clone()),
            DynamicImage::ImageRgba8(buffer) => (Layout::Rgba, buffer.as_raw().clone()),
            other if other.color().has_alpha() => (Layout::Rgba, other.to_rgba8().into_raw()),
            other => (Layout::Rgb, other.to_rgb8().into_raw()),
        };

        Self {
            layout,
            width,
            height,
            data,
        }
    }

    fn into_image(self) -> AugmentResult<DynamicImage> {
        let Self {
            layout,
            width,
            height,
            data,
        } = self;

        let image = match layout {
            Layout::Luma => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
            Layout::LumaAlpha => {
                GrayAlphaImage::from_raw(width, height, data).map(DynamicImage::ImageLumaA8)
            }
            Layout::Rgb => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
            Layout::Rgba => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        };

        image.ok_or_else(|| {
            AugmentError::InvalidParameter(format!("noise buffer does not match {width}x{height}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, Rgba};

    fn rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, 100])
        }))
    }

    #[test]
    fn test_keeps_dimensions_and_mode() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = NoiseConfig::new();

        let variants = config.augment(&rgb(64, 48), 3, &mut rng).unwrap();
        assert_eq!(variants.len(), 3);
        for variant in &variants {
            assert_eq!((variant.width(), variant.height()), (64, 48));
            assert!(matches!(variant, DynamicImage::ImageRgb8(_)));
        }

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([128])));
        let variants = config.augment(&gray, 1, &mut rng).unwrap();
        assert!(matches!(variants[0], DynamicImage::ImageLuma8(_)));

        let deep = DynamicImage::ImageRgb16(rgb(8, 8).to_rgb16());
        let variants = config.augment(&deep, 1, &mut rng).unwrap();
        assert!(matches!(variants[0], DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_changes_pixels() {
        let image = rgb(64, 64);
        let mut rng = StdRng::seed_from_u64(2);
        let variants = NoiseConfig::new().augment(&image, 2, &mut rng).unwrap();

        assert_ne!(variants[0], image);
        assert_ne!(variants[0], variants[1]);
    }

    #[test]
    fn test_alpha_untouched() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(32, 32, |x, y| {
            Rgba([100, 150, 200, (x * 7 + y) as u8])
        }));
        let mut rng = StdRng::seed_from_u64(3);
        let variants = NoiseConfig::new().augment(&image, 2, &mut rng).unwrap();

        for variant in &variants {
            let variant = variant.as_rgba8().unwrap();
            for (x, y, pixel) in variant.enumerate_pixels() {
                assert_eq!(pixel[3], (x * 7 + y) as u8);
            }
        }
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let image = rgb(32, 32);
        let config = NoiseConfig::new();

        let a = config.augment(&image, 2, &mut StdRng::seed_from_u64(77)).unwrap();
        let b = config.augment(&image, 2, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_free_is_identity() {
        let image = rgb(16, 16);
        let mut rng = StdRng::seed_from_u64(4);
        let variants = NoiseConfig::new()
            .with_gaussian_variance(0.0)
            .with_salt_pepper_amount(0.0)
            .augment(&image, 1, &mut rng)
            .unwrap();

        assert_eq!(variants[0], image);
    }

    #[test]
    fn test_quantize_truncates() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.5), 127);
        assert_eq!(quantize(0.999), 254);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(1.5), 255);
        assert_eq!(quantize(-0.1), 0);
        assert!((0..=255u8).all(|v| quantize(v as f32 / 255.0) == v));
    }

    #[test]
    fn test_full_salt_saturates() {
        let image = rgb(16, 16);
        let mut rng = StdRng::seed_from_u64(5);
        let variants = NoiseConfig::new()
            .with_salt_pepper_amount(1.0)
            .with_salt_ratio(1.0)
            .augment(&image, 1, &mut rng)
            .unwrap();

        assert!(variants[0].as_rgb8().unwrap().as_raw().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_invalid_parameters() {
        let image = rgb(4, 4);
        let mut rng = StdRng::seed_from_u64(6);

        assert!(
            NoiseConfig::new()
                .with_gaussian_variance(-1.0)
                .augment(&image, 1, &mut rng)
                .is_err()
        );
        assert!(
            NoiseConfig::new()
                .with_salt_ratio(2.0)
                .augment(&image, 1, &mut rng)
                .is_err()
        );
    }
}
