use crate::{Augment, AugmentError, AugmentResult};
use derivative::Derivative;
use derive_setters::Setters;
use image::{DynamicImage, ImageBuffer, Pixel};
use rand::Rng;
use std::fmt;

/// What to do when a block's center lookup falls outside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBoundsPolicy {
    /// Stop producing variants for this image and report what was produced.
    Truncate,
    /// Raise `AugmentError::OutOfBounds`.
    Fail,
}

/// Rectangle covered by the mosaic.
///
/// `x` runs along rows (image height) and `y` along columns (image width).
/// Both ends are exclusive upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicRegion {
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

/// Parameters drawn for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicDraw {
    pub region: MosaicRegion,
    pub block_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicAbort {
    pub width: u32,
    pub height: u32,
    pub region: MosaicRegion,
    pub block_size: u32,
    pub center_row: u32,
    pub center_col: u32,
}

impl fmt::Display for MosaicAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width: {} height: {} x: {}-{} y: {}-{} block_size: {} center: ({}, {})",
            self.width,
            self.height,
            self.region.x0,
            self.region.x1,
            self.region.y0,
            self.region.y1,
            self.block_size,
            self.center_row,
            self.center_col
        )
    }
}

/// Variants produced for one image, plus the diagnostic when the run stopped early.
#[derive(Debug, Clone, Default)]
pub struct MosaicOutcome {
    pub images: Vec<DynamicImage>,
    pub draws: Vec<MosaicDraw>,
    pub abort: Option<MosaicAbort>,
}

impl MosaicOutcome {
    pub fn is_truncated(&self) -> bool {
        self.abort.is_some()
    }
}

/// Random block redaction over a random region.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct MosaicConfig {
    #[derivative(Default(value = "(5, 20)"))]
    block_size_range: (u32, u32),

    // Minimum region extent, in blocks, along each axis.
    #[derivative(Default(value = "5"))]
    min_region_blocks: u32,

    #[derivative(Default(value = "OutOfBoundsPolicy::Truncate"))]
    on_out_of_bounds: OutOfBoundsPolicy,
}

impl MosaicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce up to `count` variants. See [`OutOfBoundsPolicy`] for the early stop.
    pub fn run<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<MosaicOutcome> {
        let block_range = self.block_range_for(image.width(), image.height())?;
        let mut outcome = MosaicOutcome::default();

        for index in 0..count {
            let draw = self.draw(image.width(), image.height(), block_range, rng);
            log::debug!(
                "mosaic #{index}: block={} x={}..{} y={}..{}",
                draw.block_size,
                draw.region.x0,
                draw.region.x1,
                draw.region.y0,
                draw.region.y1
            );

            match redact(image, draw.region, draw.block_size) {
                Ok(redacted) => {
                    outcome.images.push(redacted);
                    outcome.draws.push(draw);
                }
                Err(abort) => match self.on_out_of_bounds {
                    OutOfBoundsPolicy::Fail => return Err(AugmentError::OutOfBounds(abort)),
                    OutOfBoundsPolicy::Truncate => {
                        log::warn!("mosaic stopped after {} variants: {abort}", outcome.images.len());
                        outcome.abort = Some(abort);
                        break;
                    }
                },
            }
        }

        Ok(outcome)
    }

    // Largest block range whose minimum region still fits inside the image.
    fn block_range_for(&self, width: u32, height: u32) -> AugmentResult<(u32, u32)> {
        let (low, high) = self.block_size_range;
        if low == 0 || low > high || self.min_region_blocks == 0 {
            return Err(AugmentError::InvalidParameter(format!(
                "mosaic block range [{low}, {high}] with {} blocks per region is invalid",
                self.min_region_blocks
            )));
        }

        let fit = width.min(height) / self.min_region_blocks;
        if fit < low {
            return Err(AugmentError::InvalidParameter(format!(
                "image {width}x{height} is too small for a mosaic block of {low}"
            )));
        }

        Ok((low, high.min(fit)))
    }

    fn draw<R: Rng + ?Sized>(
        &self,
        width: u32,
        height: u32,
        block_range: (u32, u32),
        rng: &mut R,
    ) -> MosaicDraw {
        let block_size = rng.random_range(block_range.0..=block_range.1);
        let span = self.min_region_blocks * block_size;

        let x0 = rng.random_range(0..=height - span);
        let x1 = rng.random_range(x0 + span..=height);
        let y0 = rng.random_range(0..=width - span);
        let y1 = rng.random_range(y0 + span..=width);

        MosaicDraw {
            region: MosaicRegion { x0, x1, y0, y1 },
            block_size,
        }
    }
}

impl Augment for MosaicConfig {
    type Output = DynamicImage;

    fn name(&self) -> &'static str {
        "mosaic"
    }

    fn augment<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        count: usize,
        rng: &mut R,
    ) -> AugmentResult<Vec<DynamicImage>> {
        Ok(self.run(image, count, rng)?.images)
    }
}

/// Tile `region` with `block_size` patches, each filled with the pixel at its center.
///
/// Patches are clipped to the region; the center is looked up relative to the
/// patch origin, so a short trailing patch on the image edge can point past
/// the buffer.
pub fn redact(
    image: &DynamicImage,
    region: MosaicRegion,
    block_size: u32,
) -> Result<DynamicImage, MosaicAbort> {
    let mut output = image.clone();

    match &mut output {
        DynamicImage::ImageLuma8(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageLumaA8(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageRgb8(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageRgba8(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageLuma16(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageLumaA16(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageRgb16(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageRgba16(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageRgb32F(buffer) => redact_buffer(buffer, region, block_size)?,
        DynamicImage::ImageRgba32F(buffer) => redact_buffer(buffer, region, block_size)?,
        other => {
            let mut buffer = other.to_rgba8();
            redact_buffer(&mut buffer, region, block_size)?;
            *other = DynamicImage::ImageRgba8(buffer);
        }
    }

    Ok(output)
}

fn redact_buffer<P: Pixel>(
    buffer: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    region: MosaicRegion,
    block_size: u32,
) -> Result<(), MosaicAbort> {
    let (width, height) = buffer.dimensions();
    let block_size = block_size.max(1);
    let half = block_size / 2;

    for row in (region.x0..region.x1).step_by(block_size as usize) {
        for col in (region.y0..region.y1).step_by(block_size as usize) {
            let (center_row, center_col) = (row + half, col + half);
            if center_row >= height || center_col >= width {
                return Err(MosaicAbort {
                    width,
                    height,
                    region,
                    block_size,
                    center_row,
                    center_col,
                });
            }

            let center = *buffer.get_pixel(center_col, center_row);
            for y in row..(row + block_size).min(region.x1) {
                for x in col..(col + block_size).min(region.y1) {
                    buffer.put_pixel(x, y, center);
                }
            }
        }
    }

    Ok(())
}
