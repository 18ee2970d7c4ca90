/// Augmentation example
/// Runs every transform on a generated gradient and saves the variants to tmp/
use image::{DynamicImage, Rgb, RgbImage};
use image_augment::{
    Augment, BackgroundPool, GrayEnhanceConfig, MosaicConfig, NoiseConfig, PictureInPictureConfig,
    ResizeFlipConfig, WatermarkConfig, WatermarkFont,
};
use rand::{SeedableRng, rngs::StdRng};
use std::path::Path;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) * 255 / (width + height)) as u8,
        ])
    }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    let img = gradient(400, 300);
    let mut rng = StdRng::seed_from_u64(2024);
    let count = 3;

    for (i, variant) in GrayEnhanceConfig::new().augment(&img, count, &mut rng)?.iter().enumerate() {
        variant.save(output_dir.join(format!("demo_grayenhance_{i}.png")))?;
    }

    let outcome = MosaicConfig::new().run(&img, count, &mut rng)?;
    if let Some(abort) = &outcome.abort {
        println!("mosaic stopped early: {abort}");
    }
    for (i, variant) in outcome.images.iter().enumerate() {
        variant.save(output_dir.join(format!("demo_mosaic_{i}.png")))?;
    }

    for (i, variant) in ResizeFlipConfig::new().augment(&img, count, &mut rng)?.iter().enumerate() {
        variant.save(output_dir.join(format!("demo_resizeflip_{i}.png")))?;
    }

    for (i, variant) in NoiseConfig::new().augment(&img, count, &mut rng)?.iter().enumerate() {
        variant.save(output_dir.join(format!("demo_noise_{i}.png")))?;
    }

    let pool = BackgroundPool::Images(vec![gradient(640, 480).fliph(), gradient(320, 320).flipv()]);
    let pip = PictureInPictureConfig::new(pool);
    for (i, variant) in pip.augment(&img, count, &mut rng)?.iter().enumerate() {
        variant.save(output_dir.join(format!("demo_pictureinpicture_{i}.png")))?;
    }

    match WatermarkFont::from_path(image_augment::batch::DEFAULT_FONT_PATH) {
        Ok(font) => {
            let watermark = WatermarkConfig::new(font);
            for (i, variant) in watermark.augment(&img, count, &mut rng)?.iter().enumerate() {
                variant.save(output_dir.join(format!("demo_watermark_{i}.png")))?;
            }
        }
        Err(e) => println!("skipping watermark: {e}"),
    }

    println!("✓ Augmented variants saved to: tmp/");

    Ok(())
}
