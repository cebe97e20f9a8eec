//! Rendered diff artifacts.

use crate::error::Result;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder as _, RgbImage};
use serde::Serialize;

/// Layout of a rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    /// Same-size map with differing pixels highlighted.
    Overlay,
    /// Expected, actual, diff and statistics panels side by side.
    Composite,
    /// Placeholder for pairs whose dimensions differ.
    SideBySide,
}

/// An in-memory visual explanation of the differences in one pair.
///
/// Persistence is left to the caller; [`DiffArtifact::encode_png`] produces
/// bytes ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffArtifact {
    kind: ArtifactKind,
    image: RgbImage,
}

impl DiffArtifact {
    #[must_use]
    pub const fn new(kind: ArtifactKind, image: RgbImage) -> Self {
        Self { kind, image }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Takes ownership of the underlying RGB buffer.
    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Encodes the artifact as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if PNG encoding fails.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = PngEncoder::new(&mut buf);
        encoder.write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_png_writes_signature() -> anyhow::Result<()> {
        let artifact = DiffArtifact::new(
            ArtifactKind::Overlay,
            RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])),
        );
        let bytes = artifact.encode_png()?;
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        Ok(())
    }
}
