use crate::error::AppError;
use crate::models::image_types::ImageReference;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

const PREVIEW_SIZE: u32 = 1024;
const PREVIEW_QUALITY: u8 = 85;
const EXIF_HEADER_BYTES: u64 = 128 * 1024;

/// Decode the image behind a reference, upright according to its EXIF orientation.
pub fn decode_reference(reference: &ImageReference) -> Result<DynamicImage, AppError> {
    let path = reference.to_path()?;
    decode_oriented(&path)
}

pub fn decode_oriented(path: &Path) -> Result<DynamicImage, AppError> {
    let img = ImageReader::open(path)
        .map_err(|e| AppError::decode(format!("{}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| AppError::decode(format!("{}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| AppError::decode(format!("{}: {}", path.display(), e)))?;

    let orientation = read_orientation(path);
    if orientation != 1 {
        tracing::debug!(path = %path.display(), orientation, "applying EXIF orientation");
    }
    Ok(apply_orientation(img, orientation))
}

/// Render a reference as a base64 JPEG data URI for display.
pub fn preview_data_uri(reference: &ImageReference) -> Result<String, AppError> {
    let img = decode_reference(reference)?;
    let img = if img.width() > PREVIEW_SIZE || img.height() > PREVIEW_SIZE {
        img.resize(PREVIEW_SIZE, PREVIEW_SIZE, FilterType::Triangle)
    } else {
        img
    };
    let bytes = encode_jpeg(&img, PREVIEW_QUALITY)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:image/jpeg;base64,{}", b64))
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, AppError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| AppError::crop(format!("Failed to encode JPEG: {}", e)))?;
    Ok(buffer.into_inner())
}

/// EXIF orientation tag, 1 when absent or unreadable.
fn read_orientation(path: &Path) -> u32 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return 1,
    };

    let mut buf = Vec::with_capacity(EXIF_HEADER_BYTES as usize);
    if BufReader::new(file)
        .take(EXIF_HEADER_BYTES)
        .read_to_end(&mut buf)
        .is_err()
    {
        return 1;
    }

    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(&buf)) {
        Ok(e) => e,
        Err(_) => return 1,
    };

    match exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY) {
        Some(field) => match field.value {
            exif::Value::Short(ref v) => *v.first().unwrap_or(&1) as u32,
            exif::Value::Long(ref v) => *v.first().unwrap_or(&1),
            _ => 1,
        },
        None => 1,
    }
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.fliph().rotate90(),
        6 => img.rotate90(),
        7 => img.fliph().rotate270(),
        8 => img.rotate270(),
        _ => img,
    }
}
