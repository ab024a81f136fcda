use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rusttype::{point, Font, Scale};
use tracing::{debug, info};

use super::error::InfrastructureError;
use crate::domain::caption_painter_trait::CaptionPainter;
use crate::domain::text_fit::{PlacedLine, TextMeasure};

// 手書き風フォント (Caveat など) は --font で指定する。無ければシステムフォントを探す
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct RustTypePainter {
    font: Font<'static>,
}

impl RustTypePainter {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, InfrastructureError> {
        let font = Font::try_from_vec(bytes).ok_or_else(|| {
            InfrastructureError::FontUnavailable("font data could not be parsed".to_string())
        })?;
        Ok(Self { font })
    }

    pub fn from_path(path: &Path) -> Result<Self, InfrastructureError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// Loads `preferred` if given, otherwise the first readable system font.
    pub fn load(preferred: Option<&Path>) -> Result<Self, InfrastructureError> {
        if let Some(path) = preferred {
            info!("Loading caption font from {}", path.display());
            return Self::from_path(path);
        }
        for candidate in FALLBACK_FONTS.iter().map(PathBuf::from) {
            if !candidate.is_file() {
                continue;
            }
            match Self::from_path(&candidate) {
                Ok(painter) => {
                    info!("Using system font {}", candidate.display());
                    return Ok(painter);
                }
                Err(err) => debug!("Skipping font {}: {}", candidate.display(), err),
            }
        }
        Err(InfrastructureError::FontUnavailable(
            "no --font given and no system font found".to_string(),
        ))
    }
}

impl TextMeasure for RustTypePainter {
    fn line_width(&self, text: &str, font_size: f32) -> f32 {
        let scale = Scale::uniform(font_size);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

impl CaptionPainter for RustTypePainter {
    fn paint_line(&self, canvas: &mut RgbaImage, line: &PlacedLine, font_size: f32, color: Rgba<u8>) {
        draw_text_mut(
            canvas,
            color,
            line.x.round() as i32,
            line.y.round() as i32,
            Scale::uniform(font_size),
            &self.font,
            &line.text,
        );
    }
}
