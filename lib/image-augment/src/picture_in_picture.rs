use crate::{Augment, AugmentError, AugmentResult, batch::list_image_files, check_range};
use derivative::Derivative;
use derive_setters::Setters;
use image::{ColorType, DynamicImage, imageops, imageops::FilterType};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Candidate backgrounds for picture-in-picture compositing.
#[derive(Debug, Clone)]
pub enum BackgroundPool {
    /// Decoded lazily, once per draw.
    Paths(Vec<PathBuf>),
    Images(Vec<DynamicImage>),
}

impl Default for BackgroundPool {
    fn default() -> Self {
        BackgroundPool::Images(Vec::new())
    }
}

impl BackgroundPool {
    /// Every image file directly inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> AugmentResult<Self> {
        Ok(BackgroundPool::Paths(list_image_files(dir.as_ref())?))
    }

    pub fn len(&self) -> usize {
        match self {
            BackgroundPool::Paths(paths) => paths.len(),
            BackgroundPool::Images(images) => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> AugmentResult<DynamicImage> {
        if self.is_empty() {
            return Err(AugmentError::ResourceNotFound(
                "background pool is empty".to_string(),
            ));
        }

        let index = rng.random_range(0..self.len());
        match self {
            BackgroundPool::Paths(paths) => {
                log::debug!("background: {}", paths[index].display());
                Ok(image::open(&paths[index])?)
            }
            BackgroundPool::Images(images) => Ok(images[index].clone()),
        }
    }
}

/// Paste a shrunken copy of the image onto a random background.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct PictureInPictureConfig {
    pool: BackgroundPool,

    /// Foreground size as a fraction of the background, per axis.
    #[derivative(Default(value = "(0.25, 0.5)"))]
    size_range: (f32, f32),

    /// Paste origin as a fraction of the background, per axis.
    #[derivative(Default(value = "(0.25, 0.5)"))]
    origin_range: (f32, f32),

    #[derivative(Default(value = "FilterType::Lanczos3"))]
    filter: FilterType,
}

impl PictureInPictureConfig {
    pub fn new(pool: BackgroundPool) -> Self {
        Self::default().with_pool(pool)
    }
}

impl Augment for PictureInPictureConfig {
    type Output = DynamicImage;

    fn name(&self) -> &'static str {
        "pictureinpicture"
    }

    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<DynamicImage>> {
        check_range("size", self.size_range.0, self.size_range.1)?;
        check_range("origin", self.origin_range.0, self.origin_range.1)?;
        if self.pool.is_empty() {
            return Err(AugmentError::ResourceNotFound(
                "background pool is empty".to_string(),
            ));
        }

        let mut variants = Vec::with_capacity(count);

        for index in 0..count {
            let background = self.pool.pick(rng)?;
            let (bw, bh) = (background.width(), background.height());

            let width = scaled_between(bw, self.size_range, rng);
            let height = scaled_between(bh, self.size_range, rng);
            // No rotation: rotated corners leave unfilled borders on the background.
            let foreground = image.resize_exact(width, height, self.filter);

            let row = origin_between(bh, self.origin_range, rng);
            let col = origin_between(bw, self.origin_range, rng);

            log::debug!(
                "pictureinpicture #{index}: {bw}x{bh} background, {width}x{height} at row={row} col={col}"
            );

            variants.push(composite(&background, &foreground, row, col));
        }

        Ok(variants)
    }
}

/// Paste `foreground` onto a copy of `background` with its top-left corner at
/// (`row`, `col`). Parts falling outside the background are clipped.
///
/// Opaque foregrounds overwrite; foregrounds with alpha are blended. The
/// result keeps the background's 8-bit color mode; deeper backgrounds come
/// back as RGBA.
pub fn composite(
    background: &DynamicImage,
    foreground: &DynamicImage,
    row: u32,
    col: u32,
) -> DynamicImage {
    let mut canvas = background.to_rgba8();
    let top = foreground.to_rgba8();

    if foreground.color().has_alpha() {
        imageops::overlay(&mut canvas, &top, col as i64, row as i64);
    } else {
        imageops::replace(&mut canvas, &top, col as i64, row as i64);
    }

    let canvas = DynamicImage::ImageRgba8(canvas);
    match background.color() {
        ColorType::L8 => DynamicImage::ImageLuma8(canvas.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(canvas.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(canvas.to_rgb8()),
        _ => canvas,
    }
}

// Uniform size in [dim * low, dim * high], truncated, at least one pixel.
fn scaled_between<R: Rng + ?Sized>(dimension: u32, range: (f32, f32), rng: &mut R) -> u32 {
    let low = dimension as f64 * range.0 as f64;
    let high = dimension as f64 * range.1 as f64;
    (rng.random_range(low..=high) as u32).max(1)
}

fn origin_between<R: Rng + ?Sized>(dimension: u32, range: (f32, f32), rng: &mut R) -> u32 {
    let low = (dimension as f64 * range.0 as f64) as u32;
    let high = (dimension as f64 * range.1 as f64) as u32;
    rng.random_range(low..=high)
}
