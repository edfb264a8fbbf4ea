//! Pixel-level adjustments on RGBA buffers
//!
//! All operations leave the alpha channel untouched and clamp colour
//! channels to 0-255.

use image::{imageops, RgbaImage};

/// Unsharp mask
///
/// `sigma` is the blur radius of the mask, differences at or below `flat`
/// are treated as flat areas and left alone, and `amount` scales the edge
/// boost.
pub fn sharpen(img: &RgbaImage, sigma: f32, flat: f32, amount: f32) -> RgbaImage {
    let blurred = imageops::blur(img, sigma);
    let mut out = img.clone();

    for (dst, mask) in out.pixels_mut().zip(blurred.pixels()) {
        for c in 0..3 {
            let value = dst[c] as f32;
            let diff = value - mask[c] as f32;
            if diff.abs() > flat {
                dst[c] = clamp_u8(value + amount * diff);
            }
        }
    }

    out
}

pub fn gaussian_blur(img: &RgbaImage, sigma: f32) -> RgbaImage {
    imageops::blur(img, sigma)
}

/// Rec. 709 luma, written back to all three colour channels
pub fn grayscale(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let luma = 0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32;
        let v = clamp_u8(luma);
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
}

/// Scale every colour channel by `1 + brightness / 100`
pub fn brightness(img: &mut RgbaImage, brightness: f64) {
    let factor = (1.0 + brightness / 100.0) as f32;
    linear(img, factor, 0.0);
}

/// `v * c + 128 * (1 - c)`: stretches or squeezes values around mid-grey
pub fn contrast(img: &mut RgbaImage, contrast: f64) {
    let c = contrast as f32;
    linear(img, c, 128.0 * (1.0 - c));
}

/// Scale chroma in CIE Lab, keeping lightness
pub fn saturation(img: &mut RgbaImage, saturation: f64) {
    let s = saturation as f32;
    for px in img.pixels_mut() {
        let [l, a, b] = srgb_to_lab([px[0], px[1], px[2]]);
        let [r, g, bl] = lab_to_srgb([l, a * s, b * s]);
        px[0] = r;
        px[1] = g;
        px[2] = bl;
    }
}

fn linear(img: &mut RgbaImage, scale: f32, offset: f32) {
    for px in img.pixels_mut() {
        for c in 0..3 {
            px[c] = clamp_u8(px[c] as f32 * scale + offset);
        }
    }
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// D65 reference white
const XN: f32 = 0.950_47;
const YN: f32 = 1.0;
const ZN: f32 = 1.088_83;

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    clamp_u8(v * 255.0)
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

pub fn srgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
    let z = 0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b;

    let fx = lab_f(x / XN);
    let fy = lab_f(y / YN);
    let fz = lab_f(z / ZN);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

pub fn lab_to_srgb(lab: [f32; 3]) -> [u8; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;

    let x = XN * lab_f_inv(fx);
    let y = YN * lab_f_inv(fy);
    let z = ZN * lab_f_inv(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266 * x + 1.876_010_8 * y + 0.041_556 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}
