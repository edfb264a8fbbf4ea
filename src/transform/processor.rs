//! Image processing implementation
//!
//! Runs one transform request over a source buffer, in a fixed order:
//! EXIF orientation, rotate, flip, resize, crop, auto sharpen, sharpen,
//! blur, grayscale, brightness, contrast, saturation, encode.

use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;

use super::adjust;
use super::encoder::{EncodeOptions, EncoderFactory};
use super::error::ImageError;
use super::orientation::{apply_orientation, orientation_of, read_exif, Orientation};
use super::params::{FlipMode, OutputFormat, Rotation, TransformRequest};
use super::resize;

/// Mild unsharp mask applied by `auto=true`: sigma, flat threshold, amount
const AUTO_SHARPEN: (f32, f32, f32) = (1.0, 1.0, 1.2);
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_FLAT: f32 = 1.0;

/// Result of processing
#[derive(Debug)]
pub struct TransformedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    /// Source dimensions after EXIF orientation
    pub original_size: (u32, u32),
    pub output_size: (u32, u32),
}

impl TransformedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Decode, transform and encode `data` as described by `request`
pub fn process(
    data: &[u8],
    request: &TransformRequest,
    max_source_pixels: u64,
) -> Result<TransformedImage, ImageError> {
    let decoded = decode_image(data, max_source_pixels)?;

    let exif = read_exif(data);
    let orientation = exif
        .as_ref()
        .and_then(orientation_of)
        .unwrap_or(Orientation::Normal);
    let reoriented = orientation != Orientation::Normal;

    let img = apply_orientation(decoded, orientation);
    let original_size = (img.width(), img.height());

    let img = rotate(img, request.rotate);
    let img = flip(img, request.flip);

    let mut img: RgbaImage = img.to_rgba8();

    if request.needs_resize() {
        img = resize::resize(
            &img,
            request.width,
            request.height,
            request.fit,
            max_source_pixels,
        )?;
    }

    if let Some(rect) = request.crop {
        if !rect.fits_within(img.width(), img.height()) {
            return Err(ImageError::crop_out_of_bounds(
                rect.to_string(),
                img.width(),
                img.height(),
            ));
        }
        img = image::imageops::crop_imm(
            &img,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        )
        .to_image();
    }

    if request.auto {
        let (sigma, flat, amount) = AUTO_SHARPEN;
        img = adjust::sharpen(&img, sigma, flat, amount);
    }
    if request.sharpen > 0.0 {
        img = adjust::sharpen(&img, SHARPEN_SIGMA, SHARPEN_FLAT, request.sharpen as f32);
    }
    if request.blur > 0 {
        img = adjust::gaussian_blur(&img, request.blur as f32);
    }
    if request.grayscale {
        adjust::grayscale(&mut img);
    }
    if request.brightness != 0.0 {
        adjust::brightness(&mut img, request.brightness);
    }
    if request.contrast != 1.0 {
        adjust::contrast(&mut img, request.contrast);
    }
    if request.saturation != 1.0 {
        adjust::saturation(&mut img, request.saturation);
    }

    let format = request.format.for_raster();
    let options = EncodeOptions {
        quality: request.quality.clamp(1, 100),
        strip: request.strip,
        background: request.background_rgb(),
        // A reoriented image would be turned again by viewers honouring the tag
        exif: match (&exif, reoriented) {
            (Some(exif), false) => Some(exif.buf().to_vec()),
            _ => None,
        },
    };

    let output_size = img.dimensions();
    let encoded = EncoderFactory::create(format).encode(&img, &options)?;

    Ok(TransformedImage {
        data: encoded.data,
        format: encoded.format,
        original_size,
        output_size,
    })
}

/// Decode image data, refusing sources above `max_pixels`
pub fn decode_image(data: &[u8], max_pixels: u64) -> Result<DynamicImage, ImageError> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;

    if width as u64 * height as u64 > max_pixels {
        return Err(ImageError::too_many_pixels(width, height, max_pixels));
    }

    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

fn rotate(img: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => img,
        Rotation::Deg90 => img.rotate90(),
        Rotation::Deg180 => img.rotate180(),
        Rotation::Deg270 => img.rotate270(),
    }
}

fn flip(img: DynamicImage, mode: FlipMode) -> DynamicImage {
    match mode {
        FlipMode::None => img,
        FlipMode::Horizontal => img.fliph(),
        FlipMode::Vertical => img.flipv(),
        FlipMode::Both => img.fliph().flipv(),
    }
}
