use crate::domain::geometry::Rect;

const LINE_HEIGHT_RATIO: f32 = 0.95;

/// Measures the rendered width of a single line of text.
pub trait TextMeasure {
    fn line_width(&self, text: &str, font_size: f32) -> f32;
}

/// A positioned caption line, coordinates relative to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: u32,
    pub line_height: f32,
    pub lines: Vec<PlacedLine>,
    /// True when the text did not fit at the floor size and lines were dropped.
    pub truncated: bool,
}

pub fn line_height(font_size: u32) -> f32 {
    font_size as f32 * LINE_HEIGHT_RATIO
}

/// Greedy word wrap. A word that alone exceeds `max_width` gets its own line.
pub fn wrap_words<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure.line_width(&candidate, font_size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Shrinks the font from `max_size` down to `min_size` until the wrapped text
/// fits `bounds`, then centres the block. Returns `None` for blank text.
pub fn fit_text<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    bounds: Rect,
    max_size: u32,
    min_size: u32,
) -> Option<TextLayout> {
    if text.trim().is_empty() {
        return None;
    }
    let min_size = min_size.max(1);
    let box_width = bounds.width as f32;
    let box_height = bounds.height as f32;

    let mut size = max_size.max(min_size);
    while size > min_size {
        let lines = wrap_words(measure, text, size as f32, box_width);
        let line_h = line_height(size);
        let total = lines.len() as f32 * line_h;
        if total <= box_height {
            let top = bounds.y as f32 + (box_height - total) / 2.0;
            return Some(place(measure, lines, bounds, size, top, false));
        }
        size -= 1;
    }

    // Floor size: top-aligned, lines whose midline leaves the box are dropped.
    let lines = wrap_words(measure, text, min_size as f32, box_width);
    let line_h = line_height(min_size);
    let total_lines = lines.len();
    let visible: Vec<String> = lines
        .into_iter()
        .enumerate()
        .take_while(|(i, _)| *i as f32 * line_h + min_size as f32 / 2.0 < box_height)
        .map(|(_, line)| line)
        .collect();
    let truncated = visible.len() < total_lines;
    Some(place(measure, visible, bounds, min_size, bounds.y as f32, truncated))
}

fn place<M: TextMeasure + ?Sized>(
    measure: &M,
    lines: Vec<String>,
    bounds: Rect,
    font_size: u32,
    top: f32,
    truncated: bool,
) -> TextLayout {
    let line_h = line_height(font_size);
    let centre_x = bounds.x as f32 + bounds.width as f32 / 2.0;
    let lines = lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let width = measure.line_width(&text, font_size as f32);
            PlacedLine {
                x: centre_x - width / 2.0,
                y: top + i as f32 * line_h,
                width,
                text,
            }
        })
        .collect();
    TextLayout {
        font_size,
        line_height: line_h,
        lines,
        truncated,
    }
}
