//! Video snapshot downscaling.

use anyhow::Result;
use image::imageops::FilterType;

/// Downscale an image to at most `max_width` pixels wide (preserving aspect
/// ratio) and re-encode as JPEG at the given quality.
///
/// Images already narrower than `max_width` are re-encoded without scaling.
/// Keeping snapshots small bounds the per-frame payload on the live session.
pub fn downscale_jpeg(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;

    let img = if img.width() > max_width {
        let scale = max_width as f64 / img.width() as f64;
        let height = ((img.height() as f64 * scale).round() as u32).max(1);
        img.resize_exact(max_width, height, FilterType::Triangle)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode_image(&rgb)?;
    Ok(out)
}
