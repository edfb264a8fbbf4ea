//! Transform request parsing
//!
//! Query parameters are parsed leniently: a value that cannot be understood
//! falls back to its default instead of failing the request. The only hard
//! input errors (missing or invalid `url`) are the authorizer's business.
//!
//! ```text
//! /transform?url=https://example.com/cat.jpg&w=400&h=300&fit=attention&f=webp&q=75
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::constants::DEFAULT_QUALITY;

/// How a resize with both dimensions fills the target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Fit inside the box, no cropping
    None,
    /// Scale to cover the box, then crop the centre
    #[default]
    Cover,
    /// Scale to cover the box, then crop the most salient window
    Attention,
}

impl FitMode {
    /// Empty means cover; anything unrecognised means none
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "cover" => FitMode::Cover,
            "attention" => FitMode::Attention,
            _ => FitMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::None => "none",
            FitMode::Cover => "cover",
            FitMode::Attention => "attention",
        }
    }
}

/// Requested output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Webp,
    Avif,
    Png,
    /// Only meaningful for vector sources, which are passed through untouched
    Svg,
}

impl OutputFormat {
    /// `jpg` is an alias for jpeg; unknown values fall back to jpeg
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "webp" => OutputFormat::Webp,
            "avif" => OutputFormat::Avif,
            "png" => OutputFormat::Png,
            "svg" => OutputFormat::Svg,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Png => "image/png",
            OutputFormat::Svg => "image/svg+xml",
        }
    }

    /// Format actually produced for a raster source
    ///
    /// A raster image cannot be encoded as SVG, so it becomes JPEG.
    pub fn for_raster(self) -> Self {
        match self {
            OutputFormat::Svg => OutputFormat::Jpeg,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipMode {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl FlipMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "h" => FlipMode::Horizontal,
            "v" => FlipMode::Vertical,
            "both" => FlipMode::Both,
            _ => FlipMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlipMode::None => "none",
            FlipMode::Horizontal => "horizontal",
            FlipMode::Vertical => "vertical",
            FlipMode::Both => "both",
        }
    }
}

/// Clockwise rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<i64>() {
            Ok(90) => Rotation::Deg90,
            Ok(180) => Rotation::Deg180,
            Ok(270) => Rotation::Deg270,
            _ => Rotation::None,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Manual crop area `x,y,w,h` in pixels of the resized image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRect {
    /// Parse `x,y,w,h`; anything else is not a crop
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(',').map(|p| p.trim().parse::<i32>());
        let rect = CropRect {
            x: parts.next()?.ok()?,
            y: parts.next()?.ok()?,
            width: parts.next()?.ok()?,
            height: parts.next()?.ok()?,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(rect)
    }

    /// Whether the rectangle is non-empty and lies within `width x height`
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && (self.x as i64 + self.width as i64) <= width as i64
            && (self.y as i64 + self.height as i64) <= height as i64
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// A fully parsed transform request
///
/// Every field here can change the output bytes, so every field is part of
/// the cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    /// Source URL exactly as received
    pub url: String,
    /// Target width, 0 = unconstrained
    pub width: u32,
    /// Target height, 0 = unconstrained
    pub height: u32,
    pub fit: FitMode,
    pub format: OutputFormat,
    /// 1-100
    pub quality: u8,
    pub crop: Option<CropRect>,
    /// Gaussian sigma, 0 = off
    pub blur: u32,
    /// Unsharp amount, 0 = off
    pub sharpen: f64,
    /// Percent change, -100..100
    pub brightness: f64,
    /// Multiplier, 1.0 = unchanged
    pub contrast: f64,
    /// Chroma multiplier, 1.0 = unchanged
    pub saturation: f64,
    pub auto: bool,
    pub grayscale: bool,
    pub flip: FlipMode,
    pub rotate: Rotation,
    /// Lowercase hex without `#`, 3 or 6 digits
    pub background: Option<String>,
    pub strip: bool,
}

impl TransformRequest {
    /// A request with every parameter at its default
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: 0,
            height: 0,
            fit: FitMode::Cover,
            format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
            crop: None,
            blur: 0,
            sharpen: 0.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            auto: false,
            grayscale: false,
            flip: FlipMode::None,
            rotate: Rotation::None,
            background: None,
            strip: true,
        }
    }

    /// Parse the query string parameters of a `/transform` request
    pub fn from_query(url: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let get = |name: &str| params.get(name).map(String::as_str).unwrap_or("");

        Self {
            url: url.into(),
            width: parse_dimension(get("w")),
            height: parse_dimension(get("h")),
            fit: FitMode::parse(get("fit")),
            format: OutputFormat::parse(get("f")),
            quality: parse_quality(get("q")),
            crop: CropRect::parse(get("crop")),
            blur: parse_dimension(get("blur")),
            sharpen: parse_float(get("sharpen")).max(0.0),
            brightness: parse_float(get("brightness")),
            contrast: parse_factor(get("contrast")),
            saturation: parse_factor(get("saturation")),
            auto: matches!(get("auto"), "true" | "1"),
            grayscale: get("grayscale") == "true" || get("bw") == "true",
            flip: FlipMode::parse(get("flip")),
            rotate: Rotation::parse(get("rotate")),
            background: parse_hex_color(get("bg")),
            strip: get("strip") != "false",
        }
    }

    /// Background colour as RGB, if one was given
    pub fn background_rgb(&self) -> Option<[u8; 3]> {
        self.background.as_deref().and_then(hex_to_rgb)
    }

    pub fn needs_resize(&self) -> bool {
        self.width > 0 || self.height > 0
    }
}

/// Non-negative integer; negative or unparsable is 0
fn parse_dimension(value: &str) -> u32 {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .map(|v| v.min(u32::MAX as i64) as u32)
        .unwrap_or(0)
}

/// 1-100, anything else is the default
fn parse_quality(value: &str) -> u8 {
    match value.trim().parse::<i64>() {
        Ok(q) if (1..=100).contains(&q) => q as u8,
        _ => DEFAULT_QUALITY,
    }
}

/// Finite float, anything else is 0
fn parse_float(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Multiplier where 0 (or unparsable) means "unchanged"
fn parse_factor(value: &str) -> f64 {
    let parsed = parse_float(value);
    if parsed == 0.0 {
        1.0
    } else {
        parsed
    }
}

/// `#abc`, `abc`, `#aabbcc` or `aabbcc`, normalised to lowercase without `#`
fn parse_hex_color(value: &str) -> Option<String> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_ascii_lowercase())
    } else {
        None
    }
}

fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
    match hex.len() {
        3 => Some([digit(0)? * 17, digit(1)? * 17, digit(2)? * 17]),
        6 => Some([
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ]),
        _ => None,
    }
}
