use std::fs;
use std::path::Path;

use image::codecs::{jpeg, png};
use image::{ImageEncoder, ImageFormat, RgbImage};

use crate::error::Result;

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut jpeg_data = Vec::new();
    let mut encoder = jpeg::JpegEncoder::new_with_quality(&mut jpeg_data, quality.clamp(1, 100));
    encoder.encode(
        frame,
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg_data)
}

pub fn encode_png(frame: &RgbImage) -> Result<Vec<u8>> {
    let mut png_data = Vec::new();
    png::PngEncoder::new(&mut png_data).write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(png_data)
}

/// Writes `frame` to `cover_path`, replacing any earlier capture. `.png`
/// paths get a PNG; everything else a JPEG at `quality`.
pub fn save_cover(frame: &RgbImage, cover_path: &Path, quality: u8) -> Result<()> {
    if let Some(parent) = cover_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let data = match ImageFormat::from_path(cover_path) {
        Ok(ImageFormat::Png) => encode_png(frame)?,
        _ => encode_jpeg(frame, quality)?,
    };
    fs::write(cover_path, data)?;
    Ok(())
}
