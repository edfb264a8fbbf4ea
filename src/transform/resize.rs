//! Resizing with Lanczos3 and fit handling
//!
//! - a single dimension scales proportionally
//! - both dimensions with `none` fit inside the box
//! - `cover` and `attention` scale to cover the box, then crop it out of
//!   the centre or out of the window with the most detail
//!
//! Upscaling is allowed; the target pixel count is still bounded by the
//! engine's `max_source_pixels`.

use std::num::NonZeroU32;

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{imageops, RgbaImage};

use super::error::ImageError;
use super::params::FitMode;

/// Plan for one resize: scale to `scaled`, then cut `crop` out of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub scaled: (u32, u32),
    pub crop: Option<(u32, u32)>,
}

/// Work out scaled and final dimensions for a source of `src_w x src_h`
///
/// `width`/`height` of 0 mean "unspecified". Both 0 yields the source size.
pub fn plan(src_w: u32, src_h: u32, width: u32, height: u32, fit: FitMode) -> ResizePlan {
    let sw = src_w as f64;
    let sh = src_h as f64;

    let scale_to = |factor: f64| -> (u32, u32) {
        (
            ((sw * factor).round() as u32).max(1),
            ((sh * factor).round() as u32).max(1),
        )
    };

    match (width, height) {
        (0, 0) => ResizePlan {
            scaled: (src_w, src_h),
            crop: None,
        },
        (w, 0) => ResizePlan {
            scaled: (w, ((sh * w as f64 / sw).round() as u32).max(1)),
            crop: None,
        },
        (0, h) => ResizePlan {
            scaled: (((sw * h as f64 / sh).round() as u32).max(1), h),
            crop: None,
        },
        (w, h) => {
            let fx = w as f64 / sw;
            let fy = h as f64 / sh;
            match fit {
                FitMode::None => ResizePlan {
                    scaled: scale_to(fx.min(fy)),
                    crop: None,
                },
                FitMode::Cover | FitMode::Attention => {
                    let (scaled_w, scaled_h) = scale_to(fx.max(fy));
                    ResizePlan {
                        // Rounding may leave the covering side one pixel short
                        scaled: (scaled_w.max(w), scaled_h.max(h)),
                        crop: Some((w, h)),
                    }
                }
            }
        }
    }
}

/// Resize `img` to the requested box
pub fn resize(
    img: &RgbaImage,
    width: u32,
    height: u32,
    fit: FitMode,
    max_pixels: u64,
) -> Result<RgbaImage, ImageError> {
    let plan = plan(img.width(), img.height(), width, height, fit);
    let (scaled_w, scaled_h) = plan.scaled;

    let pixels = scaled_w as u64 * scaled_h as u64;
    if pixels > max_pixels {
        return Err(ImageError::too_many_pixels(scaled_w, scaled_h, max_pixels));
    }

    let scaled = scale(img, scaled_w, scaled_h)?;

    let Some((crop_w, crop_h)) = plan.crop else {
        return Ok(scaled);
    };
    if (crop_w, crop_h) == (scaled_w, scaled_h) {
        return Ok(scaled);
    }

    let (x, y) = match fit {
        FitMode::Attention => salient_offset(&scaled, crop_w, crop_h),
        _ => ((scaled_w - crop_w) / 2, (scaled_h - crop_h) / 2),
    };

    Ok(imageops::crop_imm(&scaled, x, y, crop_w, crop_h).to_image())
}

/// Lanczos3 scaling through fast_image_resize
pub fn scale(img: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage, ImageError> {
    if img.dimensions() == (target_w, target_h) {
        return Ok(img.clone());
    }

    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| ImageError::resize_failed("source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("failed to create output image buffer"))
}

/// Top-left corner of the `crop_w x crop_h` window with the most energy
///
/// Energy is local luma gradient plus colour saturation. After a cover
/// scale only one axis has slack, so the search is one-dimensional over
/// row or column sums. Ties go to the window closest to the centre.
pub fn salient_offset(img: &RgbaImage, crop_w: u32, crop_h: u32) -> (u32, u32) {
    let (w, h) = img.dimensions();
    let slack_x = w.saturating_sub(crop_w);
    let slack_y = h.saturating_sub(crop_h);
    if slack_x == 0 && slack_y == 0 {
        return (0, 0);
    }

    let energy = energy_map(img);
    let mut columns = vec![0f64; w as usize];
    let mut rows = vec![0f64; h as usize];
    for y in 0..h as usize {
        for x in 0..w as usize {
            let e = energy[y * w as usize + x];
            columns[x] += e;
            rows[y] += e;
        }
    }

    let x = if slack_x > 0 {
        best_window(&columns, crop_w as usize) as u32
    } else {
        0
    };
    let y = if slack_y > 0 {
        best_window(&rows, crop_h as usize) as u32
    } else {
        0
    };
    (x, y)
}

fn energy_map(img: &RgbaImage) -> Vec<f64> {
    let (w, h) = img.dimensions();
    let luma: Vec<f64> = img
        .pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .collect();

    let at = |x: u32, y: u32| luma[(y * w + x) as usize];

    img.enumerate_pixels()
        .map(|(x, y, p)| {
            let dx = if x + 1 < w { (at(x + 1, y) - at(x, y)).abs() } else { 0.0 };
            let dy = if y + 1 < h { (at(x, y + 1) - at(x, y)).abs() } else { 0.0 };
            let max = p[0].max(p[1]).max(p[2]) as f64;
            let min = p[0].min(p[1]).min(p[2]) as f64;
            let alpha = p[3] as f64 / 255.0;
            (dx + dy + (max - min)) * alpha
        })
        .collect()
}

/// Start index of the `len`-wide window with the largest sum
fn best_window(sums: &[f64], len: usize) -> usize {
    if len >= sums.len() {
        return 0;
    }

    let last = sums.len() - len;
    let centre = last as f64 / 2.0;

    let mut current: f64 = sums[..len].iter().sum();
    let mut best = (current, 0usize);

    for start in 1..=last {
        current += sums[start + len - 1] - sums[start - 1];
        let closer = (start as f64 - centre).abs() < (best.1 as f64 - centre).abs();
        if current > best.0 + 1e-9 || ((current - best.0).abs() <= 1e-9 && closer) {
            best = (current, start);
        }
    }

    best.1
}
