//! Image encoder abstraction
//!
//! One encoder per raster output format, all fed with an RGBA buffer:
//! - JPEG through mozjpeg (progressive, optimized Huffman tables)
//! - WebP through libwebp, lossless at quality 100
//! - AVIF through ravif at speed 6
//! - PNG through the image crate, then oxipng

use image::RgbaImage;

use super::error::ImageError;
use super::params::OutputFormat;

/// Settings shared by all encoders
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// 1-100
    pub quality: u8,
    /// Drop metadata from the output
    pub strip: bool,
    /// Colour used when alpha has to be flattened
    pub background: Option<[u8; 3]>,
    /// Raw TIFF-structured EXIF payload to carry over, if any
    pub exif: Option<Vec<u8>>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            strip: true,
            background: None,
            exif: None,
        }
    }
}

impl EncodeOptions {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Self::default()
        }
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

pub trait ImageEncoder: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn encode(&self, img: &RgbaImage, options: &EncodeOptions) -> Result<EncodedImage, ImageError>;

    fn supports_transparency(&self) -> bool;
}

pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, img: &RgbaImage, options: &EncodeOptions) -> Result<EncodedImage, ImageError> {
        let (width, height) = img.dimensions();
        let rgb = flatten(img, options.background.unwrap_or([255, 255, 255]));
        let quality = options.quality.clamp(1, 100) as f32;
        let exif = if options.strip {
            None
        } else {
            options.exif.as_deref()
        };

        // mozjpeg reports libjpeg errors by unwinding
        let result = std::panic::catch_unwind(|| -> std::io::Result<Vec<u8>> {
            let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
            comp.set_size(width as usize, height as usize);
            comp.set_quality(quality);
            comp.set_progressive_mode();
            comp.set_optimize_coding(true);

            let mut comp = comp.start_compress(Vec::new())?;
            if let Some(tiff) = exif {
                let mut app1 = Vec::with_capacity(tiff.len() + 6);
                app1.extend_from_slice(b"Exif\0\0");
                app1.extend_from_slice(tiff);
                comp.write_marker(mozjpeg::Marker::APP(1), &app1);
            }
            comp.write_scanlines(&rgb)?;
            comp.finish()
        });

        match result {
            Ok(Ok(data)) => Ok(EncodedImage {
                data,
                format: OutputFormat::Jpeg,
            }),
            Ok(Err(e)) => Err(ImageError::encode_failed("jpeg", e.to_string())),
            Err(_) => Err(ImageError::encode_failed("jpeg", "libjpeg aborted")),
        }
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// libwebp rejects wider or taller canvases
pub const WEBP_MAX_DIMENSION: u32 = 16383;

pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Webp
    }

    fn encode(&self, img: &RgbaImage, options: &EncodeOptions) -> Result<EncodedImage, ImageError> {
        let (width, height) = img.dimensions();
        if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(ImageError::encode_failed(
                "webp",
                format!(
                    "{}x{} exceeds the {}px WebP limit",
                    width, height, WEBP_MAX_DIMENSION
                ),
            ));
        }
        let encoder = webp::Encoder::from_rgba(img.as_raw(), width, height);

        let memory = if options.quality >= 100 {
            encoder.encode_lossless()
        } else {
            encoder.encode(options.quality as f32)
        };

        if memory.is_empty() {
            return Err(ImageError::encode_failed("webp", "encoder produced no data"));
        }

        Ok(EncodedImage {
            data: memory.to_vec(),
            format: OutputFormat::Webp,
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

pub struct AvifEncoder {
    speed: u8,
}

impl Default for AvifEncoder {
    fn default() -> Self {
        Self { speed: 6 }
    }
}

impl ImageEncoder for AvifEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Avif
    }

    fn encode(&self, img: &RgbaImage, options: &EncodeOptions) -> Result<EncodedImage, ImageError> {
        let (width, height) = img.dimensions();
        let pixels: Vec<rgb::RGBA8> = img
            .as_raw()
            .chunks_exact(4)
            .map(|c| rgb::RGBA8::new(c[0], c[1], c[2], c[3]))
            .collect();

        let buffer = imgref::Img::new(pixels.as_slice(), width as usize, height as usize);
        let encoded = ravif::Encoder::new()
            .with_quality(options.quality as f32)
            .with_speed(self.speed)
            .encode_rgba(buffer)
            .map_err(|e| ImageError::encode_failed("avif", e.to_string()))?;

        Ok(EncodedImage {
            data: encoded.avif_file,
            format: OutputFormat::Avif,
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

pub struct PngEncoder {
    preset: u8,
}

impl Default for PngEncoder {
    fn default() -> Self {
        Self { preset: 2 }
    }
}

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, img: &RgbaImage, options: &EncodeOptions) -> Result<EncodedImage, ImageError> {
        use image::codecs::png::{CompressionType, FilterType, PngEncoder as ImagePngEncoder};
        use image::ImageEncoder as _;

        let (width, height) = img.dimensions();
        let mut raw = Vec::new();
        ImagePngEncoder::new_with_quality(&mut raw, CompressionType::Default, FilterType::Adaptive)
            .write_image(img.as_raw(), width, height, image::ColorType::Rgba8)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        let mut opts = oxipng::Options::from_preset(self.preset);
        opts.strip = if options.strip {
            oxipng::StripChunks::Safe
        } else {
            oxipng::StripChunks::None
        };

        let data = oxipng::optimize_from_memory(&raw, &opts)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage {
            data,
            format: OutputFormat::Png,
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

pub struct EncoderFactory;

impl EncoderFactory {
    /// Encoder for `format`; SVG is not a raster target and maps to JPEG
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format.for_raster() {
            OutputFormat::Webp => Box::new(WebPEncoder),
            OutputFormat::Avif => Box::<AvifEncoder>::default(),
            OutputFormat::Png => Box::<PngEncoder>::default(),
            _ => Box::new(JpegEncoder),
        }
    }
}

/// Composite RGBA over `bg`, producing packed RGB
fn flatten(img: &RgbaImage, bg: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(img.as_raw().len() / 4 * 3);
    for px in img.pixels() {
        let alpha = px[3] as u32;
        for c in 0..3 {
            let v = (px[c] as u32 * alpha + bg[c] as u32 * (255 - alpha) + 127) / 255;
            rgb.push(v as u8);
        }
    }
    rgb
}
