//! Command line driver for the image augmentation engine.
//!
//! Usage:
//!   image-augment src out -n 10 --transform mosaic --transform noise --seed 42

use anyhow::{Context, Result};
use clap::Parser;
use image_augment::{BatchConfig, TransformKind, batch::DEFAULT_FONT_PATH, run_batch, variant_count};
use std::path::PathBuf;

/// Write randomized variants of every image in a directory
#[derive(Parser, Debug)]
#[command(name = "image-augment", version)]
#[command(about = "Generate randomized augmentations for a directory of images")]
struct Args {
    /// Directory containing the source images
    input_dir: PathBuf,

    /// Directory receiving `{id}_{transform}_{index}.{ext}` files
    output_dir: PathBuf,

    /// Variants per transform per image
    #[arg(short = 'n', long, default_value = "10", allow_negative_numbers = true)]
    count: i64,

    /// Transform to apply, repeatable; all of them when omitted
    #[arg(short, long = "transform", value_parser = parse_transform)]
    transforms: Vec<TransformKind>,

    /// Picture-in-picture backgrounds, defaults to the input directory
    #[arg(long)]
    background_dir: Option<PathBuf>,

    /// TrueType/OpenType font used by the watermark transform
    #[arg(long, default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_transform(value: &str) -> Result<TransformKind, String> {
    value.parse().map_err(|e: image_augment::AugmentError| {
        let names: Vec<&str> = TransformKind::all().iter().map(|k| k.name()).collect();
        format!("{e} (expected one of: {})", names.join(", "))
    })
}

fn init_logger() {
    use std::io::Write;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let transforms = if args.transforms.is_empty() {
        TransformKind::all().to_vec()
    } else {
        args.transforms
    };

    let config = BatchConfig::new(args.input_dir, args.output_dir)
        .with_count(variant_count(args.count)?)
        .with_transforms(transforms)
        .with_background_dir(args.background_dir)
        .with_font_path(args.font)
        .with_seed(args.seed);

    let report = run_batch(&config).context("augmentation failed")?;

    println!(
        "processed {} images, wrote {} files, {} failed, {} mosaic runs truncated",
        report.processed,
        report.written,
        report.failures.len(),
        report.mosaic_truncated
    );
    for failure in &report.failures {
        log::warn!("{failure}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "image-augment",
            "in",
            "out",
            "-n",
            "3",
            "-t",
            "mosaic",
            "--transform",
            "noise",
            "--seed",
            "5",
        ])
        .unwrap();

        assert_eq!(args.count, 3);
        assert_eq!(args.transforms, vec![TransformKind::Mosaic, TransformKind::Noise]);
        assert_eq!(args.seed, Some(5));
        assert_eq!(args.font, PathBuf::from(DEFAULT_FONT_PATH));
    }

    #[test]
    fn test_negative_count_parses_then_fails_validation() {
        let args = Args::try_parse_from(["image-augment", "in", "out", "-n", "-1"]).unwrap();
        assert!(variant_count(args.count).is_err());
    }

    #[test]
    fn test_unknown_transform() {
        assert!(Args::try_parse_from(["image-augment", "in", "out", "-t", "blur"]).is_err());
    }
}
