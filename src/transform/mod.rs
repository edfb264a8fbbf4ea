//! Image transformation
//!
//! Parses transform parameters from the query string and turns a source
//! image into the requested rendition on a bounded worker pool.
//!
//! # Example
//!
//! ```ignore
//! use kagami::transform::{EngineConfig, ImageEngine, TransformRequest};
//!
//! let engine = ImageEngine::new(EngineConfig::default())?;
//! let request = TransformRequest::from_query(url, &query);
//! let output = engine.transform(bytes, request).await?;
//! ```

pub mod adjust;
pub mod config;
pub mod detect;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod orientation;
pub mod params;
pub mod processor;
pub mod resize;

pub use config::EngineConfig;
pub use detect::is_svg;
pub use engine::ImageEngine;
pub use error::ImageError;
pub use params::{CropRect, FitMode, FlipMode, OutputFormat, Rotation, TransformRequest};
pub use processor::TransformedImage;
