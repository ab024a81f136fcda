use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use super::error::InfrastructureError;
use crate::domain::image::SourceImage;

pub const UPLOAD_MAX_WIDTH: u32 = 512;
pub const UPLOAD_JPEG_QUALITY: u8 = 70;
pub const UPLOAD_MIME_TYPE: &str = "image/jpeg";

fn mime_for_format(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::Jpeg) => "image/jpeg",
        Some(ImageFormat::Gif) => "image/gif",
        Some(ImageFormat::WebP) => "image/webp",
        Some(ImageFormat::Bmp) => "image/bmp",
        Some(ImageFormat::Tiff) => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Decodes an uploaded photo, guessing the format from its bytes.
pub fn decode_source(image_bytes: Vec<u8>) -> Result<SourceImage, InfrastructureError> {
    let reader = image::io::Reader::new(Cursor::new(image_bytes))
        .with_guessed_format()
        .map_err(InfrastructureError::IoError)?;
    let mime_type = mime_for_format(reader.format());
    let pixels = reader.decode().map_err(InfrastructureError::ImageLibError)?.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(InfrastructureError::ImageProcessingError("image has no pixels".to_string()));
    }
    Ok(SourceImage::new(pixels, mime_type))
}

pub fn resize(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width.max(1), height.max(1), FilterType::Triangle)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, InfrastructureError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(InfrastructureError::ImageLibError)?;
    Ok(buffer.into_inner())
}

/// Downsized JPEG copy of the source for the caption request, base64 encoded.
pub fn encode_upload_jpeg(source: &SourceImage) -> Result<String, InfrastructureError> {
    let width = UPLOAD_MAX_WIDTH.min(source.width());
    let height = ((width as f32 * source.height() as f32) / source.width() as f32)
        .round()
        .max(1.0) as u32;
    let resized = resize(source.pixels(), width, height);
    // JPEG にアルファは無いので RGB に落とす
    let rgb = DynamicImage::ImageRgba8(resized).to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, UPLOAD_JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(InfrastructureError::ImageLibError)?;
    Ok(base64::encode(bytes))
}
