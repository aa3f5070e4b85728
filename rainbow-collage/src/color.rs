//! Color reduction: collapse an image to its mean color and derive the HSV key
//! the sorter orders by.

use std::cmp::Ordering;

use image::{DynamicImage, GenericImageView, Rgb};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
}

/// Perceptual ordering key of one image.
///
/// `hue` is in degrees `[0, 360)`, `saturation` and `value` in `[0, 1]`.
/// Keys are never NaN and never negative zero, so bitwise-total comparison
/// agrees with exact float equality.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorKey {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

impl ColorKey {
    /// Reduce a decoded image to its key.
    pub fn from_image(img: &DynamicImage) -> Result<Self, ReduceError> {
        average_color(img).map(Self::from_rgb)
    }

    pub fn from_rgb(color: Rgb<u8>) -> Self {
        let (h, s, v) = rgb_to_hsv(color);
        ColorKey {
            hue: h * 360.0,
            saturation: s,
            value: v,
        }
    }

    /// Lexicographic ascending order on (hue, saturation, value).
    pub fn cmp_hsv(&self, other: &Self) -> Ordering {
        self.hue
            .total_cmp(&other.hue)
            .then_with(|| self.saturation.total_cmp(&other.saturation))
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

/// Mean color over every pixel of the image, alpha ignored.
///
/// Channels are averaged as stored (no gamma linearisation) and truncated.
pub fn average_color(img: &DynamicImage) -> Result<Rgb<u8>, ReduceError> {
    let (width, height) = img.dimensions();
    let count = u64::from(width) * u64::from(height);
    if count == 0 {
        return Err(ReduceError::ZeroArea { width, height });
    }
    let [r, g, b] = match img {
        DynamicImage::ImageRgb8(buf) => sum_channels(buf.pixels().map(|p| p.0)),
        DynamicImage::ImageRgba8(buf) => sum_channels(buf.pixels().map(|p| [p[0], p[1], p[2]])),
        other => sum_channels(other.pixels().map(|(_, _, p)| [p[0], p[1], p[2]])),
    };
    Ok(Rgb([
        (r / count) as u8,
        (g / count) as u8,
        (b / count) as u8,
    ]))
}

fn sum_channels(pixels: impl Iterator<Item = [u8; 3]>) -> [u64; 3] {
    pixels.fold([0u64; 3], |mut acc, px| {
        acc[0] += u64::from(px[0]);
        acc[1] += u64::from(px[1]);
        acc[2] += u64::from(px[2]);
        acc
    })
}

/// Widen to 16 bits and scale into `[0, 1)`.
#[inline(always)]
fn normalize(channel: u8) -> f64 {
    f64::from(u32::from(channel) * 0x101) / f64::from(0x1_0000u32)
}

/// Convert to HSV with every component in the unit interval (hue in `[0, 1)`).
pub fn rgb_to_hsv(color: Rgb<u8>) -> (f64, f64, f64) {
    let [r, g, b] = color.0.map(normalize);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;
    let s = if max > 0.0 { d / max } else { 0.0 };
    if d == 0.0 {
        // achromatic
        return (0.0, s, max);
    }
    let sector = if max == r {
        let h = (g - b) / d;
        if g < b { h + 6.0 } else { h }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (sector / 6.0, s, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, Rgba, RgbaImage};

    const EPS: f64 = 1e-4;

    fn solid(c: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 5, Rgb(c)))
    }

    fn assert_key(key: ColorKey, hue: f64, sat: f64, val: f64) {
        assert!((key.hue - hue).abs() < EPS, "hue {} != {}", key.hue, hue);
        assert!(
            (key.saturation - sat).abs() < EPS,
            "saturation {} != {}",
            key.saturation,
            sat
        );
        assert!((key.value - val).abs() < EPS, "value {} != {}", key.value, val);
    }

    #[test]
    fn uniform_image_averages_to_its_color() {
        for c in [[0, 0, 0], [255, 255, 255], [12, 200, 99], [255, 0, 128]] {
            assert_eq!(average_color(&solid(c)).unwrap(), Rgb(c));
        }
    }

    #[test]
    fn alpha_is_ignored() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([40, 80, 120, 0])));
        assert_eq!(average_color(&img).unwrap(), Rgb([40, 80, 120]));
    }

    #[test]
    fn non_rgb_layouts_use_generic_path() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, image::Luma([90])));
        assert_eq!(average_color(&img).unwrap(), Rgb([90, 90, 90]));
    }

    #[test]
    fn mean_truncates() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 10, 255]));
        img.put_pixel(1, 0, Rgb([255, 11, 0]));
        let avg = average_color(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(avg, Rgb([127, 10, 127]));
    }

    #[test]
    fn zero_area_is_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 4));
        assert_eq!(
            ColorKey::from_image(&img),
            Err(ReduceError::ZeroArea {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn primaries_land_in_their_sectors() {
        let full = 255.0 * 257.0 / 65536.0;
        assert_key(ColorKey::from_rgb(Rgb([255, 0, 0])), 0.0, 1.0, full);
        assert_key(ColorKey::from_rgb(Rgb([0, 255, 0])), 120.0, 1.0, full);
        assert_key(ColorKey::from_rgb(Rgb([0, 0, 255])), 240.0, 1.0, full);
        assert_key(ColorKey::from_rgb(Rgb([255, 255, 0])), 60.0, 1.0, full);
        assert_key(ColorKey::from_rgb(Rgb([255, 0, 255])), 300.0, 1.0, full);
    }

    #[test]
    fn achromatic_colors_have_zero_hue() {
        assert_key(ColorKey::from_rgb(Rgb([255, 255, 255])), 0.0, 0.0, 1.0);
        assert_key(ColorKey::from_rgb(Rgb([0, 0, 0])), 0.0, 0.0, 0.0);
        assert_key(
            ColorKey::from_rgb(Rgb([128, 128, 128])),
            0.0,
            0.0,
            128.0 * 257.0 / 65536.0,
        );
    }

    #[test]
    fn normalized_channels_stay_below_one() {
        let (_, _, v) = rgb_to_hsv(Rgb([255, 255, 255]));
        assert!(v < 1.0);
    }

    #[test]
    fn keys_order_by_hue_then_saturation_then_value() {
        let a = ColorKey {
            hue: 10.0,
            saturation: 0.9,
            value: 0.9,
        };
        let b = ColorKey {
            hue: 20.0,
            saturation: 0.1,
            value: 0.1,
        };
        let c = ColorKey {
            saturation: 0.5,
            ..b
        };
        let d = ColorKey { value: 0.6, ..c };
        assert_eq!(a.cmp_hsv(&b), Ordering::Less);
        assert_eq!(b.cmp_hsv(&c), Ordering::Less);
        assert_eq!(c.cmp_hsv(&d), Ordering::Less);
        assert_eq!(d.cmp_hsv(&d), Ordering::Equal);
    }
}
