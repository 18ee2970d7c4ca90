use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use image_augment::{AugmentError, BatchConfig, TransformKind, run_batch};
use std::{fs, path::Path};

fn write_gradient(path: &Path, width: u32, height: u32) -> Result<()> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 90])
    });
    DynamicImage::ImageRgb8(image).save(path)?;
    Ok(())
}

fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[test]
fn test_batch_writes_named_variants() -> Result<()> {
    let input = tempfile::tempdir()?;
    let backgrounds = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;

    write_gradient(&input.path().join("cat_01.png"), 64, 64)?;
    write_gradient(&input.path().join("dog.png"), 80, 60)?;
    fs::write(input.path().join("broken.png"), b"not a png")?;
    fs::write(input.path().join("readme.txt"), b"ignored")?;
    write_gradient(&backgrounds.path().join("bg.png"), 120, 90)?;

    let config = BatchConfig::new(input.path(), output.path().join("out"))
        .with_count(2)
        .with_transforms(vec![
            TransformKind::GrayEnhance,
            TransformKind::Mosaic,
            TransformKind::ResizeFlip,
            TransformKind::Noise,
            TransformKind::PictureInPicture,
        ])
        .with_background_dir(Some(backgrounds.path().to_path_buf()))
        .with_seed(Some(7));

    let report = run_batch(&config)?;

    assert_eq!(report.processed, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("broken.png"));
    assert!(report.failures[0].transform.is_none());

    let names = file_names(&output.path().join("out"))?;
    assert_eq!(names.len(), report.written);

    for base in ["cat", "dog"] {
        for transform in ["grayenhance", "resizeflip", "noise", "pictureinpicture"] {
            for index in 0..2 {
                let name = format!("{base}_{transform}_{index}.png");
                assert!(names.contains(&name), "missing {name}");
            }
        }
    }

    let gray = image::open(output.path().join("out/cat_grayenhance_0.png"))?;
    assert!(matches!(gray, DynamicImage::ImageLuma8(_)));
    assert_eq!((gray.width(), gray.height()), (64, 64));

    let pip = image::open(output.path().join("out/dog_pictureinpicture_1.png"))?;
    assert_eq!((pip.width(), pip.height()), (120, 90));

    Ok(())
}

#[test]
fn test_batch_is_reproducible_with_seed() -> Result<()> {
    let input = tempfile::tempdir()?;
    write_gradient(&input.path().join("img.png"), 50, 50)?;

    let run = |dir: &Path| -> Result<Vec<u8>> {
        let config = BatchConfig::new(input.path(), dir)
            .with_count(1)
            .with_transforms(vec![TransformKind::Noise])
            .with_seed(Some(99));
        run_batch(&config)?;
        Ok(fs::read(dir.join("img_noise_0.png"))?)
    };

    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;
    assert_eq!(run(first.path())?, run(second.path())?);

    Ok(())
}

#[test]
fn test_zero_count_writes_nothing() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_gradient(&input.path().join("img.png"), 50, 50)?;

    let config = BatchConfig::new(input.path(), output.path())
        .with_count(0)
        .with_transforms(vec![TransformKind::GrayEnhance, TransformKind::Mosaic]);
    let report = run_batch(&config)?;

    assert_eq!(report.processed, 1);
    assert_eq!(report.written, 0);
    assert!(file_names(output.path())?.is_empty());

    Ok(())
}

#[test]
fn test_failed_transform_does_not_skip_the_rest() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_gradient(&input.path().join("tiny.png"), 20, 20)?;

    let config = BatchConfig::new(input.path(), output.path())
        .with_count(2)
        .with_transforms(vec![
            TransformKind::GrayEnhance,
            TransformKind::Mosaic,
            TransformKind::Noise,
        ])
        .with_seed(Some(1));
    let report = run_batch(&config)?;

    assert_eq!(report.processed, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("tiny.png"));
    assert_eq!(report.failures[0].transform, Some(TransformKind::Mosaic));

    let names = file_names(output.path())?;
    assert_eq!(
        names,
        [
            "tiny_grayenhance_0.png",
            "tiny_grayenhance_1.png",
            "tiny_noise_0.png",
            "tiny_noise_1.png",
        ]
    );
    assert_eq!(report.written, names.len());

    Ok(())
}

#[test]
fn test_missing_font_fails_before_processing() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_gradient(&input.path().join("img.png"), 50, 50)?;

    let target = output.path().join("out");
    let config = BatchConfig::new(input.path(), &target)
        .with_transforms(vec![TransformKind::Watermark])
        .with_font_path("/nonexistent/font.ttf".into());

    assert!(matches!(
        run_batch(&config),
        Err(AugmentError::ResourceNotFound(_))
    ));
    assert!(!target.exists());

    Ok(())
}

#[test]
fn test_missing_input_dir() {
    let config = BatchConfig::new("/nonexistent/input", "/nonexistent/output");
    assert!(matches!(
        run_batch(&config),
        Err(AugmentError::ResourceNotFound(_))
    ));
}
