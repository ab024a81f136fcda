use image::{Rgba, RgbaImage};

use crate::domain::text_fit::{PlacedLine, TextMeasure};

// ドメイン層のトレイト。実装 (rusttype) はインフラ層にある
pub trait CaptionPainter: TextMeasure {
    fn paint_line(&self, canvas: &mut RgbaImage, line: &PlacedLine, font_size: f32, color: Rgba<u8>);
}
