use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};
use tracing::{debug, info};

use super::error::ApplicationError;
use crate::domain::caption_painter_trait::CaptionPainter;
use crate::domain::caption_request::CaptionRequest;
use crate::domain::filter::{apply_style, NoiseSource, RandomNoise, StyleParameters};
use crate::domain::geometry::FrameGeometry;
use crate::domain::image::{CompositeFrame, FilteredBitmap, SourceImage};
use crate::domain::text_fit::fit_text;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::image_processor::{encode_png, encode_upload_jpeg, resize, UPLOAD_MIME_TYPE};

pub const EXPORT_FILE_NAME: &str = "polaroid.png";

const FRAME_COLOR: Rgba<u8> = Rgba([0xfe, 0xfe, 0xfe, 0xff]);
const CAPTION_COLOR: Rgba<u8> = Rgba([0x33, 0x33, 0x33, 0xff]);

/// Composites border, filtered photo and caption. Depends on nothing but its arguments.
pub fn render_composite(
    filtered: &FilteredBitmap,
    caption: &str,
    painter: &dyn CaptionPainter,
) -> CompositeFrame {
    let geometry = filtered.geometry;
    let layout = geometry.layout(filtered.pixels.width(), filtered.pixels.height());

    let mut canvas = RgbaImage::from_pixel(layout.frame_width, layout.frame_height, FRAME_COLOR);
    imageops::overlay(&mut canvas, &filtered.pixels, layout.photo.x as i64, layout.photo.y as i64);

    let text_layout = fit_text(
        painter,
        caption,
        layout.caption_box,
        geometry.max_font_size(),
        geometry.min_font_size(),
    );
    if let Some(text) = &text_layout {
        for line in &text.lines {
            painter.paint_line(&mut canvas, line, text.font_size as f32, CAPTION_COLOR);
        }
    }

    CompositeFrame {
        pixels: canvas,
        caption: text_layout,
    }
}

/// Compositor state for one user: the current photo, style and caption.
///
/// The preview bitmap is cached. Only a new image, a new style or an explicit
/// [`PolaroidSession::invalidate`] recomputes it; caption edits reuse it.
pub struct PolaroidSession {
    painter: Arc<dyn CaptionPainter + Send + Sync>,
    noise: Box<dyn NoiseSource + Send>,
    source: Option<SourceImage>,
    style: StyleParameters,
    caption: String,
    preview: Option<FilteredBitmap>,
    filter_passes: u64,
}

impl PolaroidSession {
    pub fn new(painter: Arc<dyn CaptionPainter + Send + Sync>) -> Self {
        Self::with_noise(painter, Box::new(RandomNoise::new()))
    }

    pub fn with_noise(painter: Arc<dyn CaptionPainter + Send + Sync>, noise: Box<dyn NoiseSource + Send>) -> Self {
        Self {
            painter,
            noise,
            source: None,
            style: StyleParameters::default(),
            caption: String::new(),
            preview: None,
            filter_passes: 0,
        }
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Number of filter+noise passes run so far (preview and export).
    pub fn filter_passes(&self) -> u64 {
        self.filter_passes
    }

    pub fn image_loaded(&mut self, source: SourceImage) -> Option<CompositeFrame> {
        info!(
            width = source.width(),
            height = source.height(),
            mime = source.mime_type(),
            "Image loaded"
        );
        self.source = Some(source);
        self.invalidate();
        self.render_preview()
    }

    pub fn style_changed(&mut self, style: StyleParameters) -> Option<CompositeFrame> {
        self.style = style;
        self.invalidate();
        self.render_preview()
    }

    pub fn caption_changed(&mut self, caption: impl Into<String>) -> Option<CompositeFrame> {
        self.caption = caption.into();
        self.render_preview()
    }

    pub fn append_caption(&mut self, fragment: &str) -> Option<CompositeFrame> {
        self.caption.push_str(fragment);
        self.render_preview()
    }

    /// Drops the cached preview bitmap and recomputes it from the current image and style.
    pub fn invalidate(&mut self) {
        self.preview = None;
        self.preview = self.filter(FrameGeometry::PREVIEW);
    }

    pub fn render_preview(&self) -> Option<CompositeFrame> {
        let filtered = self.preview.as_ref()?;
        Some(render_composite(filtered, &self.caption, self.painter.as_ref()))
    }

    /// Full pipeline at export resolution, starting again from the source image.
    pub fn export_frame(&mut self) -> Result<CompositeFrame, ApplicationError> {
        let filtered = self
            .filter(FrameGeometry::EXPORT)
            .ok_or(ApplicationError::NoImageLoaded)?;
        Ok(render_composite(&filtered, &self.caption, self.painter.as_ref()))
    }

    pub fn export_png(&mut self) -> Result<Vec<u8>, ApplicationError> {
        let frame = self.export_frame()?;
        Ok(encode_png(&frame.pixels)?)
    }

    /// Writes `polaroid.png` into `directory` and returns its path.
    pub fn export_to(&mut self, directory: &Path) -> Result<PathBuf, ApplicationError> {
        let bytes = self.export_png()?;
        let path = directory.join(EXPORT_FILE_NAME);
        std::fs::write(&path, bytes).map_err(InfrastructureError::IoError)?;
        info!("Exported {}", path.display());
        Ok(path)
    }

    /// Request body for the caption proxy, built from a downsized JPEG copy.
    pub fn caption_upload(&self, language: &str) -> Result<CaptionRequest, ApplicationError> {
        let source = self.source.as_ref().ok_or(ApplicationError::NoImageLoaded)?;
        Ok(CaptionRequest {
            image_data: Some(encode_upload_jpeg(source)?),
            mime_type: Some(UPLOAD_MIME_TYPE.to_string()),
            language: Some(language.to_string()),
        })
    }

    fn filter(&mut self, geometry: FrameGeometry) -> Option<FilteredBitmap> {
        let source = self.source.as_ref()?;
        let (width, height) = geometry.photo_size(source.width(), source.height());
        let resized = resize(source.pixels(), width, height);
        let pixels = apply_style(&resized, &self.style, self.noise.as_mut());
        self.filter_passes += 1;
        debug!(width, height, filter = %self.style.filter, "Filter pass");
        Some(FilteredBitmap { pixels, geometry })
    }
}
