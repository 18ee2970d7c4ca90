//! Directory driver: augments every image of an input directory and writes
//! each variant as `{base_id}_{transform}_{index}.{ext}`.

use crate::{
    Augment, AugmentError, AugmentResult, BackgroundPool, GrayEnhanceConfig, MosaicConfig,
    NoiseConfig, PictureInPictureConfig, ResizeFlipConfig, TransformKind, WatermarkConfig,
    WatermarkFont,
};
use derivative::Derivative;
use derive_setters::Setters;
use image::{ColorType, DynamicImage, ImageFormat};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct BatchConfig {
    #[derivative(Default(value = "PathBuf::from(\"src\")"))]
    pub input_dir: PathBuf,

    #[derivative(Default(value = "PathBuf::from(\"out\")"))]
    pub output_dir: PathBuf,

    /// Variants per transform per image.
    #[derivative(Default(value = "10"))]
    pub count: usize,

    #[derivative(Default(value = "TransformKind::all().to_vec()"))]
    pub transforms: Vec<TransformKind>,

    /// Picture-in-picture backgrounds. Falls back to `input_dir`.
    pub background_dir: Option<PathBuf>,

    #[derivative(Default(value = "PathBuf::from(DEFAULT_FONT_PATH)"))]
    pub font_path: PathBuf,

    /// Fixed seed for reproducible runs; OS entropy otherwise.
    pub seed: Option<u64>,
}

impl BatchConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self::default()
            .with_input_dir(input_dir.into())
            .with_output_dir(output_dir.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Images for which every selected transform succeeded.
    pub processed: usize,
    /// Variant files written, including those of partially failed images.
    pub written: usize,
    /// Images whose mosaic run stopped early.
    pub mosaic_truncated: usize,
    pub failures: Vec<BatchFailure>,
}

/// A failed image, or a single failed transform on an image.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub path: PathBuf,
    /// `None` when the image itself could not be read.
    pub transform: Option<TransformKind>,
    pub reason: String,
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.transform {
            Some(kind) => write!(f, "{} [{kind}]: {}", self.path.display(), self.reason),
            None => write!(f, "{}: {}", self.path.display(), self.reason),
        }
    }
}

/// Augment every image in `config.input_dir`.
///
/// Configuration problems (missing input directory, missing font, empty
/// background pool) fail before any image is touched. A failure on a single
/// image is logged and recorded in the report.
pub fn run_batch(config: &BatchConfig) -> AugmentResult<BatchReport> {
    let inputs = list_image_files(&config.input_dir)?;
    let engine = Engine::new(config)?;

    fs::create_dir_all(&config.output_dir)?;
    log::info!(
        "Augmenting {} images from {} into {}",
        inputs.len(),
        config.input_dir.display(),
        config.output_dir.display()
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut report = BatchReport::default();
    for path in &inputs {
        let stats = engine.process(path, &config.output_dir, config.count, &mut rng);

        report.written += stats.written;
        if stats.mosaic_truncated {
            report.mosaic_truncated += 1;
        }
        if stats.failures.is_empty() {
            report.processed += 1;
        }
        for failure in stats.failures {
            log::warn!("Failed to augment {failure}");
            report.failures.push(failure);
        }
    }

    log::info!(
        "Done: {} processed, {} written, {} failed",
        report.processed,
        report.written,
        report.failures.len()
    );

    Ok(report)
}

/// Image files directly inside `dir`, sorted by name.
pub fn list_image_files(dir: &Path) -> AugmentResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AugmentError::ResourceNotFound(format!(
            "directory {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && ImageFormat::from_path(entry.path()).is_ok() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// File stem up to the first underscore.
pub fn base_id(path: &Path) -> Option<&str> {
    path.file_stem()?.to_str()?.split('_').next()
}

pub fn output_file_name(base_id: &str, transform: &str, index: usize, ext: &str) -> String {
    format!("{base_id}_{transform}_{index}.{ext}")
}

#[derive(Debug, Default)]
struct ImageStats {
    written: usize,
    mosaic_truncated: bool,
    failures: Vec<BatchFailure>,
}

// Transform configs resolved once per batch.
struct Engine {
    transforms: Vec<TransformKind>,
    gray_enhance: GrayEnhanceConfig,
    mosaic: MosaicConfig,
    resize_flip: ResizeFlipConfig,
    noise: NoiseConfig,
    picture_in_picture: Option<PictureInPictureConfig>,
    watermark: Option<WatermarkConfig>,
}

impl Engine {
    fn new(config: &BatchConfig) -> AugmentResult<Self> {
        let picture_in_picture = if config.transforms.contains(&TransformKind::PictureInPicture) {
            let dir = config.background_dir.as_ref().unwrap_or(&config.input_dir);
            let pool = BackgroundPool::from_dir(dir)?;
            if pool.is_empty() {
                return Err(AugmentError::ResourceNotFound(format!(
                    "no background images in {}",
                    dir.display()
                )));
            }
            Some(PictureInPictureConfig::new(pool))
        } else {
            None
        };

        let watermark = if config.transforms.contains(&TransformKind::Watermark) {
            Some(WatermarkConfig::new(WatermarkFont::from_path(&config.font_path)?))
        } else {
            None
        };

        Ok(Self {
            transforms: config.transforms.clone(),
            gray_enhance: GrayEnhanceConfig::new(),
            mosaic: MosaicConfig::new(),
            resize_flip: ResizeFlipConfig::new(),
            noise: NoiseConfig::new(),
            picture_in_picture,
            watermark,
        })
    }

    // Every selected transform runs even when an earlier one failed.
    fn process<R: Rng + ?Sized>(
        &self,
        path: &Path,
        output_dir: &Path,
        count: usize,
        rng: &mut R,
    ) -> ImageStats {
        let mut stats = ImageStats::default();
        let fail = |transform: Option<TransformKind>, e: AugmentError| BatchFailure {
            path: path.to_path_buf(),
            transform,
            reason: e.to_string(),
        };

        let Some(base) = base_id(path) else {
            let e = AugmentError::InvalidParameter(format!("unusable file name {}", path.display()));
            stats.failures.push(fail(None, e));
            return stats;
        };
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("png");

        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                stats.failures.push(fail(None, e.into()));
                return stats;
            }
        };
        log::debug!("{}: {}x{} {:?}", path.display(), image.width(), image.height(), image.color());

        for &kind in &self.transforms {
            let variants = match self.variants(kind, &image, count, rng, &mut stats) {
                Ok(variants) => variants,
                Err(e) => {
                    stats.failures.push(fail(Some(kind), e));
                    continue;
                }
            };

            for (index, variant) in variants.iter().enumerate() {
                let target = output_dir.join(output_file_name(base, kind.name(), index, ext));
                if let Err(e) = save_variant(variant, &target) {
                    stats.failures.push(fail(Some(kind), e));
                    break;
                }
                stats.written += 1;
            }
        }

        stats
    }

    fn variants<R: Rng + ?Sized>(
        &self,
        kind: TransformKind,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
        stats: &mut ImageStats,
    ) -> AugmentResult<Vec<DynamicImage>> {
        let variants = match kind {
            TransformKind::GrayEnhance => self
                .gray_enhance
                .augment(image, count, rng)?
                .into_iter()
                .map(DynamicImage::ImageLuma8)
                .collect(),
            TransformKind::Mosaic => {
                let outcome = self.mosaic.run(image, count, rng)?;
                stats.mosaic_truncated = outcome.is_truncated();
                outcome.images
            }
            TransformKind::ResizeFlip => self.resize_flip.augment(image, count, rng)?,
            TransformKind::Noise => self.noise.augment(image, count, rng)?,
            TransformKind::PictureInPicture => match &self.picture_in_picture {
                Some(config) => config.augment(image, count, rng)?,
                None => Vec::new(),
            },
            TransformKind::Watermark => match &self.watermark {
                Some(config) => config
                    .augment(image, count, rng)?
                    .into_iter()
                    .map(DynamicImage::ImageRgba8)
                    .collect(),
                None => Vec::new(),
            },
        };

        Ok(variants)
    }
}

fn save_variant(image: &DynamicImage, path: &Path) -> AugmentResult<()> {
    let format = ImageFormat::from_path(path)?;
    encodable_for(format, image).save_with_format(path, format)?;
    Ok(())
}

// JPEG holds neither alpha nor deep samples.
fn encodable_for(format: ImageFormat, image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match (format, image.color()) {
        (ImageFormat::Jpeg, ColorType::L8 | ColorType::Rgb8) => Cow::Borrowed(image),
        (ImageFormat::Jpeg, ColorType::La8 | ColorType::L16) => {
            Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
        }
        (ImageFormat::Jpeg, _) => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        _ => Cow::Borrowed(image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_base_id() {
        assert_eq!(base_id(Path::new("src/1234_front.jpg")), Some("1234"));
        assert_eq!(base_id(Path::new("cat.png")), Some("cat"));
        assert_eq!(base_id(Path::new("a_b_c.png")), Some("a"));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("1234", "grayenhance", 3, "jpg"),
            "1234_grayenhance_3.jpg"
        );
        assert_eq!(
            output_file_name("cat", TransformKind::PictureInPicture.name(), 0, "png"),
            "cat_pictureinpicture_0.png"
        );
    }

    #[test]
    fn test_encodable_for_jpeg() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));

        assert!(matches!(
            encodable_for(ImageFormat::Jpeg, &rgba).as_ref(),
            DynamicImage::ImageRgb8(_)
        ));
        assert!(matches!(
            encodable_for(ImageFormat::Png, &rgba),
            Cow::Borrowed(DynamicImage::ImageRgba8(_))
        ));

        let gray_alpha = DynamicImage::ImageLumaA8(rgba.to_luma_alpha8());
        assert!(matches!(
            encodable_for(ImageFormat::Jpeg, &gray_alpha).as_ref(),
            DynamicImage::ImageLuma8(_)
        ));
    }

    #[test]
    fn test_failure_display() {
        let failure = BatchFailure {
            path: PathBuf::from("in/tiny.png"),
            transform: Some(TransformKind::Mosaic),
            reason: "too small".to_string(),
        };
        assert_eq!(failure.to_string(), "in/tiny.png [mosaic]: too small");

        let failure = BatchFailure { transform: None, ..failure };
        assert_eq!(failure.to_string(), "in/tiny.png: too small");
    }

    #[test]
    fn test_default_config() {
        let config = BatchConfig::new("in", "out");
        assert_eq!(config.count, 10);
        assert_eq!(config.transforms.len(), 6);
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert!(config.seed.is_none());
    }
}
