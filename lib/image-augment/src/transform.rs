use crate::AugmentError;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    GrayEnhance,
    Mosaic,
    ResizeFlip,
    Noise,
    PictureInPicture,
    Watermark,
}

impl TransformKind {
    /// Token used in output file names and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::GrayEnhance => "grayenhance",
            TransformKind::Mosaic => "mosaic",
            TransformKind::ResizeFlip => "resizeflip",
            TransformKind::Noise => "noise",
            TransformKind::PictureInPicture => "pictureinpicture",
            TransformKind::Watermark => "watermark",
        }
    }

    pub fn all() -> &'static [TransformKind] {
        &[
            TransformKind::GrayEnhance,
            TransformKind::Mosaic,
            TransformKind::ResizeFlip,
            TransformKind::Noise,
            TransformKind::PictureInPicture,
            TransformKind::Watermark,
        ]
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = AugmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        TransformKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == token)
            .ok_or_else(|| AugmentError::InvalidParameter(format!("unknown transform: {s}")))
    }
}
