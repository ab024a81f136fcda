// プレビュー基準の定数。エクスポート時は scale 倍する
const PHOTO_MAX_WIDTH: u32 = 350;
const BORDER_TOP: u32 = 20;
const BORDER_SIDE: u32 = 20;
const BORDER_BOTTOM: u32 = 90;
const CAPTION_GAP: u32 = 15;
const CAPTION_MARGIN: u32 = 40;
const CAPTION_BOX_INSET: u32 = 25;

const PREVIEW_MAX_FONT_SIZE: u32 = 40;
const FONT_SIZE_CEILING: u32 = 160;
pub const MIN_FONT_SIZE: u32 = 10;

pub const EXPORT_SCALE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub scale: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame_width: u32,
    pub frame_height: u32,
    pub photo: Rect,
    pub caption_box: Rect,
}

impl FrameGeometry {
    pub const PREVIEW: FrameGeometry = FrameGeometry { scale: 1 };
    pub const EXPORT: FrameGeometry = FrameGeometry {
        scale: EXPORT_SCALE,
    };

    pub fn max_font_size(&self) -> u32 {
        (PREVIEW_MAX_FONT_SIZE * self.scale).min(FONT_SIZE_CEILING)
    }

    pub fn min_font_size(&self) -> u32 {
        MIN_FONT_SIZE
    }

    /// Photo size for a source image: width capped at 350 (preview units), aspect kept.
    pub fn photo_size(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let base_width = PHOTO_MAX_WIDTH.min(source_width.max(1));
        let aspect = source_width.max(1) as f32 / source_height.max(1) as f32;
        let width = base_width * self.scale;
        let height = ((base_width as f32 / aspect) * self.scale as f32).round().max(1.0) as u32;
        (width, height)
    }

    pub fn layout(&self, photo_width: u32, photo_height: u32) -> FrameLayout {
        let s = self.scale;
        let frame_width = photo_width + BORDER_SIDE * s * 2;
        let frame_height = photo_height + (BORDER_TOP + BORDER_BOTTOM) * s;
        let photo = Rect {
            x: BORDER_SIDE * s,
            y: BORDER_TOP * s,
            width: photo_width,
            height: photo_height,
        };
        let caption_box = Rect {
            x: CAPTION_MARGIN * s / 2,
            y: photo.y + photo_height + CAPTION_GAP * s,
            width: frame_width.saturating_sub(CAPTION_MARGIN * s),
            height: (BORDER_BOTTOM - CAPTION_BOX_INSET) * s,
        };
        FrameLayout {
            frame_width,
            frame_height,
            photo,
            caption_box,
        }
    }
}
