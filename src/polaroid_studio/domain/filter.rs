use std::fmt;
use std::str::FromStr;

use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::DomainError;

const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    None,
    Classic,
    Vintage,
    Bw,
    Vibrant,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Classic => "classic",
            FilterKind::Vintage => "vintage",
            FilterKind::Bw => "bw",
            FilterKind::Vibrant => "vibrant",
        }
    }

    /// Fixed linear colour transform of one pixel, before noise and clamping.
    pub fn transform(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        match self {
            FilterKind::None => [r, g, b],
            FilterKind::Classic => {
                let (r, g, b) = (r * 1.1, g * 1.1, b * 1.05);
                let luma = r * SEPIA_MATRIX[0][0] + g * SEPIA_MATRIX[0][1] + b * SEPIA_MATRIX[0][2];
                [
                    r * 0.9 + luma * 0.1,
                    g * 0.9 + luma * 0.1,
                    b * 0.9 + luma * 0.1,
                ]
            }
            FilterKind::Vintage => {
                let sepia = SEPIA_MATRIX.map(|row| r * row[0] + g * row[1] + b * row[2]);
                [
                    r * 0.6 + sepia[0] * 0.4,
                    (g * 0.6 + sepia[1] * 0.4) * 1.1,
                    b * 0.6 + sepia[2] * 0.4,
                ]
            }
            FilterKind::Bw => {
                let luma = (r * 0.299 + g * 0.587 + b * 0.114) * 1.1;
                [luma, luma, luma]
            }
            FilterKind::Vibrant => [r * 1.4, g * 1.4, b * 1.2],
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(FilterKind::None),
            "classic" => Ok(FilterKind::Classic),
            "vintage" => Ok(FilterKind::Vintage),
            "bw" => Ok(FilterKind::Bw),
            "vibrant" => Ok(FilterKind::Vibrant),
            other => Err(DomainError::UnknownFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleParameters {
    pub filter: FilterKind,
    pub noise_intensity: u32,
}

impl StyleParameters {
    pub fn new(filter: FilterKind, noise_intensity: u32) -> Self {
        Self {
            filter,
            noise_intensity,
        }
    }
}

/// Film grain source: one offset per pixel, shared by the three channels.
#[cfg_attr(test, mockall::automock)]
pub trait NoiseSource {
    /// Returns an offset in `[-intensity / 2, intensity / 2]`.
    fn offset(&mut self, intensity: u32) -> f32;
}

pub struct RandomNoise {
    rng: StdRng,
}

impl RandomNoise {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for RandomNoise {
    fn offset(&mut self, intensity: u32) -> f32 {
        if intensity == 0 {
            return 0.0;
        }
        let half = intensity as f32 / 2.0;
        self.rng.gen_range(-half..=half)
    }
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

pub fn apply_pixel(filter: FilterKind, rgb: [u8; 3], offset: f32) -> [u8; 3] {
    let transformed = filter.transform(rgb.map(f32::from));
    transformed.map(|channel| clamp_channel(channel + offset))
}

/// Applies the style's filter and grain to every pixel. Alpha is kept as is.
pub fn apply_style(
    image: &RgbaImage,
    style: &StyleParameters,
    noise: &mut dyn NoiseSource,
) -> RgbaImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let offset = if style.noise_intensity > 0 {
            noise.offset(style.noise_intensity)
        } else {
            0.0
        };
        let [r, g, b] = apply_pixel(style.filter, [r, g, b], offset);
        *pixel = Rgba([r, g, b, a]);
    }
    output
}
