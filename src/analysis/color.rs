//! Dominant-color tagging for buttons
//!
//! Every pixel is mapped to its nearest named palette color. A button whose
//! pixels are all near-gray is tagged `b&w`, a very busy one `rainbow`, and
//! anything else gets up to three palette names ordered by pixel count.

use image::RgbImage;

/// Named palette, in tie-breaking order
pub const PALETTE: &[(&str, [u8; 3])] = &[
    ("red", [255, 0, 0]),
    ("blue", [0, 0, 255]),
    ("green", [0, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("purple", [128, 0, 128]),
    ("orange", [255, 165, 0]),
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("gray", [128, 128, 128]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
];

pub const BLACK_AND_WHITE: &str = "b&w";
pub const RAINBOW: &str = "rainbow";

/// Channel spread under which a pixel counts as gray
const GRAY_TOLERANCE: i32 = 10;

/// Maximum number of palette tags reported
const MAX_TAGS: usize = 3;

/// Result of analyzing a button's pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorProfile {
    pub tags: Vec<String>,
    /// `#rrggbb` of the truncated per-channel means
    pub average_hex: String,
}

/// Analyzes a decoded image
pub fn analyze_image(image: &RgbImage) -> ColorProfile {
    let pixels: Vec<[u8; 3]> = image.pixels().map(|p| p.0).collect();
    analyze_pixels(&pixels)
}

/// Analyzes a flat list of RGB pixels
///
/// Empty input yields no tags and `#000000`.
pub fn analyze_pixels(pixels: &[[u8; 3]]) -> ColorProfile {
    ColorProfile {
        tags: color_tags(pixels),
        average_hex: average_hex(pixels),
    }
}

fn color_tags(pixels: &[[u8; 3]]) -> Vec<String> {
    if pixels.is_empty() {
        return Vec::new();
    }

    if pixels.iter().all(|p| is_grayish(*p)) {
        return vec![BLACK_AND_WHITE.to_string()];
    }

    let mut distinct: Vec<[u8; 3]> = pixels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() * 10 > pixels.len() {
        return vec![RAINBOW.to_string()];
    }

    let mut counts = [0usize; PALETTE.len()];
    for pixel in pixels {
        counts[nearest_palette_index(*pixel)] += 1;
    }

    // Stable sort keeps palette order for equal counts
    let mut ranked: Vec<(usize, usize)> = counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(idx, &count)| (idx, count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(MAX_TAGS)
        .map(|(idx, _)| PALETTE[idx].0.to_string())
        .collect()
}

fn is_grayish([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    (r - g).abs() <= GRAY_TOLERANCE && (r - b).abs() <= GRAY_TOLERANCE
}

/// Index of the closest palette entry; the earlier entry wins a tie
pub fn nearest_palette_index(pixel: [u8; 3]) -> usize {
    let mut best = 0;
    let mut best_distance = u32::MAX;
    for (idx, (_, color)) in PALETTE.iter().enumerate() {
        let distance = squared_distance(pixel, *color);
        if distance < best_distance {
            best = idx;
            best_distance = distance;
        }
    }
    best
}

fn squared_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u32
        })
        .sum()
}

fn average_hex(pixels: &[[u8; 3]]) -> String {
    if pixels.is_empty() {
        return "#000000".to_string();
    }

    let mut sums = [0u64; 3];
    for pixel in pixels {
        for (sum, channel) in sums.iter_mut().zip(pixel.iter()) {
            *sum += *channel as u64;
        }
    }

    let n = pixels.len() as u64;
    format!(
        "#{:02x}{:02x}{:02x}",
        sums[0] / n,
        sums[1] / n,
        sums[2] / n
    )
}
