//! Image transform error types
//!
//! Every variant aborts the transform; no partial output is ever returned.
//! At the HTTP boundary all of them become a 500 through
//! `GatewayError::Transform`.

use std::fmt;

/// Errors that can occur while decoding, transforming or encoding an image
#[derive(Debug, Clone)]
pub enum ImageError {
    // === Decoding Errors ===
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Decoded image exceeds the engine's pixel budget
    TooManyPixels {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    // === Processing Errors ===
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Crop rectangle falls outside the image
    CropOutOfBounds {
        rect: String,
        width: u32,
        height: u32,
    },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },

    // === Engine Errors ===
    /// Engine has been shut down
    EngineShutdown,
    /// Worker dropped the job without answering
    EngineFailure { message: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::DecodeFailed { message } => {
                write!(f, "failed to load image: {}", message)
            }
            ImageError::TooManyPixels {
                width,
                height,
                pixels,
                max_pixels,
            } => {
                write!(
                    f,
                    "image dimensions {}x{} ({} pixels) exceed limit of {} pixels",
                    width, height, pixels, max_pixels
                )
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "failed to resize: {}", message)
            }
            ImageError::CropOutOfBounds {
                rect,
                width,
                height,
            } => {
                write!(
                    f,
                    "failed to crop: area {} is outside {}x{} image",
                    rect, width, height
                )
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "failed to export {}: {}", format, message)
            }
            ImageError::EngineShutdown => {
                write!(f, "image engine is shut down")
            }
            ImageError::EngineFailure { message } => {
                write!(f, "image engine failure: {}", message)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// HTTP status for this error
    ///
    /// Always 500: from the client's point of view any stage failure is a
    /// failed transform.
    pub fn to_http_status(&self) -> u16 {
        500
    }

    /// Helper constructors for common error patterns
    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn crop_out_of_bounds(rect: impl Into<String>, width: u32, height: u32) -> Self {
        ImageError::CropOutOfBounds {
            rect: rect.into(),
            width,
            height,
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn engine_failure(message: impl Into<String>) -> Self {
        ImageError::EngineFailure {
            message: message.into(),
        }
    }

    pub fn too_many_pixels(width: u32, height: u32, max_pixels: u64) -> Self {
        ImageError::TooManyPixels {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failed_display() {
        let err = ImageError::decode_failed("invalid header");
        assert_eq!(err.to_string(), "failed to load image: invalid header");
        assert_eq!(err.to_http_status(), 500);
    }

    #[test]
    fn test_crop_out_of_bounds_display() {
        let err = ImageError::crop_out_of_bounds("90,90,20,20", 100, 100);
        assert_eq!(
            err.to_string(),
            "failed to crop: area 90,90,20,20 is outside 100x100 image"
        );
    }

    #[test]
    fn test_encode_failed_display() {
        let err = ImageError::encode_failed("webp", "encoder error");
        assert_eq!(err.to_string(), "failed to export webp: encoder error");
    }

    #[test]
    fn test_too_many_pixels_display() {
        let err = ImageError::too_many_pixels(20_000, 20_000, 100_000_000);
        assert!(err.to_string().contains("400000000 pixels"));
    }

    #[test]
    fn test_engine_shutdown_display() {
        assert_eq!(
            ImageError::EngineShutdown.to_string(),
            "image engine is shut down"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ImageError>();
    }
}
