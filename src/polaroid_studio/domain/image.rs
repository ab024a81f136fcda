use image::RgbaImage;

use crate::domain::geometry::FrameGeometry;
use crate::domain::text_fit::TextLayout;

/// The user's photo. Never mutated after loading.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    mime_type: String,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage, mime_type: impl Into<String>) -> Self {
        Self {
            pixels,
            mime_type: mime_type.into(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Source resized to the photo slot of `geometry` with filter and grain applied.
#[derive(Debug, Clone)]
pub struct FilteredBitmap {
    pub pixels: RgbaImage,
    pub geometry: FrameGeometry,
}

#[derive(Debug, Clone)]
pub struct CompositeFrame {
    pub pixels: RgbaImage,
    pub caption: Option<TextLayout>,
}
