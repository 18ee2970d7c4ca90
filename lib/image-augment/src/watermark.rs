//! Random text watermark stamped near the bottom-right corner.

use crate::{Augment, AugmentError, AugmentResult};
use ab_glyph::FontVec;
use derivative::Derivative;
use derive_setters::Setters;
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_text_mut;
use rand::{Rng, seq::IndexedRandom};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

/// A TrueType/OpenType font loaded once and shared by every variant.
#[derive(Clone)]
pub struct WatermarkFont {
    font: Arc<FontVec>,
    source: PathBuf,
}

impl WatermarkFont {
    pub fn from_path(path: impl AsRef<Path>) -> AugmentResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AugmentError::ResourceNotFound(format!(
                "font file {}",
                path.display()
            )));
        }

        log::info!("Loading watermark font from: {}", path.display());
        let mut font = Self::from_bytes(std::fs::read(path)?)?;
        font.source = path.to_path_buf();
        Ok(font)
    }

    pub fn from_bytes(data: Vec<u8>) -> AugmentResult<Self> {
        let font = FontVec::try_from_vec(data).map_err(|e| AugmentError::InvalidFont(e.to_string()))?;

        Ok(Self {
            font: Arc::new(font),
            source: PathBuf::new(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkFont")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct WatermarkConfig {
    #[setters(skip)]
    font: Option<WatermarkFont>,

    /// Glyph height in pixels.
    #[derivative(Default(value = "40.0"))]
    font_scale: f32,

    /// Text origin measured back from the bottom-right corner. It does not
    /// scale with the image, so small images get the text partly off-canvas.
    #[derivative(Default(value = "(115, 80)"))]
    anchor_offset: (i32, i32),

    #[derivative(Default(value = "Rgba([255, 255, 255, 255])"))]
    color: Rgba<u8>,

    #[derivative(Default(value = "(1, 10)"))]
    text_length_range: (usize, usize),

    /// Letters are sampled without replacement.
    #[derivative(Default(value = "String::from(\"zyxwvutsrqponmlkjihgfedcba\")"))]
    alphabet: String,
}

impl WatermarkConfig {
    pub fn new(font: WatermarkFont) -> Self {
        Self::default().with_font(font)
    }

    pub fn with_font(mut self, font: WatermarkFont) -> Self {
        self.font = Some(font);
        self
    }

    fn check_text_length(&self) -> AugmentResult<()> {
        let (low, high) = self.text_length_range;
        let letters = self.alphabet.chars().count();

        if low == 0 || low > high || high > letters {
            return Err(AugmentError::InvalidParameter(format!(
                "watermark length range [{low}, {high}] does not fit an alphabet of {letters}"
            )));
        }

        Ok(())
    }

    fn draw_text<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let letters: Vec<char> = self.alphabet.chars().collect();
        let length = rng.random_range(self.text_length_range.0..=self.text_length_range.1);
        letters.choose_multiple(rng, length).collect()
    }

    fn stamp(&self, font: &WatermarkFont, image: &DynamicImage, text: &str) -> RgbaImage {
        let mut canvas = image.to_rgba8();
        let (width, height) = canvas.dimensions();

        let mut overlay = RgbaImage::new(width, height);
        let x = width as i32 - self.anchor_offset.0;
        let y = height as i32 - self.anchor_offset.1;
        draw_text_mut(&mut overlay, self.color, x, y, self.font_scale, &*font.font, text);

        imageops::overlay(&mut canvas, &overlay, 0, 0);
        canvas
    }
}

impl Augment for WatermarkConfig {
    type Output = RgbaImage;

    fn name(&self) -> &'static str {
        "watermark"
    }

    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<RgbaImage>> {
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| AugmentError::ResourceNotFound("watermark font".to_string()))?;
        self.check_text_length()?;

        let mut variants = Vec::with_capacity(count);
        for index in 0..count {
            let text = self.draw_text(rng);
            log::debug!("watermark #{index}: \"{text}\"");
            variants.push(self.stamp(font, image, &text));
        }

        Ok(variants)
    }
}
