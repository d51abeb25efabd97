use crate::error::AppError;
use crate::models::crop_types::{AspectRatio, CropRegion};
use crate::models::image_types::ImageReference;
use crate::services::crop_flow::CropFlow;
use crate::services::image_service;
use image::imageops::FilterType;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const CROP_QUALITY: u8 = 90;

/// Largest rectangle of `ratio` centred in a `width` x `height` image.
pub fn centered_region(width: u32, height: u32, ratio: AspectRatio) -> CropRegion {
    let (rx, ry) = ratio.ratio();
    let (w, h) = (width as u64, height as u64);
    let (crop_w, crop_h) = if w * ry as u64 >= h * rx as u64 {
        ((h * rx as u64 / ry as u64).max(1), h)
    } else {
        (w, (w * ry as u64 / rx as u64).max(1))
    };
    CropRegion {
        x: ((w - crop_w) / 2) as u32,
        y: ((h - crop_h) / 2) as u32,
        width: crop_w as u32,
        height: crop_h as u32,
    }
}

/// Clamp a user-drawn region to the image; an empty result is an error.
fn clamp_region(region: CropRegion, width: u32, height: u32) -> Result<CropRegion, AppError> {
    let x = region.x.min(width);
    let y = region.y.min(height);
    let w = region.width.min(width - x);
    let h = region.height.min(height - y);
    if w == 0 || h == 0 {
        return Err(AppError::crop(format!(
            "crop region {:?} is outside the {}x{} image",
            region, width, height
        )));
    }
    Ok(CropRegion {
        x,
        y,
        width: w,
        height: h,
    })
}

/// Crop `source`, scale it down to fit `max_size` x `max_size`, and write a
/// JPEG into `cache_dir`. Returns a reference to the new file.
pub fn crop_to_file(
    source: &ImageReference,
    ratio: AspectRatio,
    region: Option<CropRegion>,
    max_size: u32,
    cache_dir: &Path,
) -> Result<ImageReference, AppError> {
    let img = image_service::decode_reference(source)?;
    let (width, height) = (img.width(), img.height());

    let region = match region {
        Some(r) => clamp_region(r, width, height)?,
        None => centered_region(width, height, ratio),
    };

    let mut cropped = img.crop_imm(region.x, region.y, region.width, region.height);
    if cropped.width() > max_size || cropped.height() > max_size {
        cropped = cropped.resize(max_size, max_size, FilterType::Triangle);
    }

    std::fs::create_dir_all(cache_dir)?;
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let mut dest = cache_dir.join(format!("cropped_image_{}.jpg", millis));
    let mut n = 1;
    while dest.exists() {
        dest = cache_dir.join(format!("cropped_image_{}_{}.jpg", millis, n));
        n += 1;
    }

    let bytes = image_service::encode_jpeg(&cropped, CROP_QUALITY)?;
    std::fs::write(&dest, bytes)?;

    tracing::info!(
        source = %source,
        dest = %dest.display(),
        ratio = %ratio,
        width = cropped.width(),
        height = cropped.height(),
        "cropped image"
    );
    Ok(ImageReference::from_path(&dest))
}

/// Hand a finished crop to the flow. If the flow was cancelled meanwhile the
/// written file belongs to no one and is removed.
pub fn finish_crop(
    flow: &mut CropFlow,
    result: Result<ImageReference, AppError>,
) -> Result<ImageReference, AppError> {
    let produced = result.as_ref().ok().cloned();
    let finished = flow.crop_finished(result);
    if finished.is_err() {
        if let Some(orphan) = produced {
            discard(&orphan);
        }
    }
    finished
}

fn discard(reference: &ImageReference) {
    match reference.to_path().map(std::fs::remove_file) {
        Ok(Ok(())) => tracing::debug!(%reference, "removed abandoned crop"),
        Ok(Err(e)) => tracing::warn!(%reference, error = %e, "failed to remove abandoned crop"),
        Err(e) => tracing::warn!(%reference, error = %e, "abandoned crop has no local path"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn source(dir: &Path, w: u32, h: u32) -> ImageReference {
        let path = dir.join("src.png");
        RgbImage::from_pixel(w, h, Rgb([200, 100, 50]))
            .save(&path)
            .unwrap();
        ImageReference::from_path(&path)
    }

    fn dims(reference: &ImageReference) -> (u32, u32) {
        let img = image::open(reference.to_path().unwrap()).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn centered_region_matches_ratio() {
        assert_eq!(
            centered_region(1000, 500, AspectRatio::Square),
            CropRegion { x: 250, y: 0, width: 500, height: 500 }
        );
        assert_eq!(
            centered_region(900, 1200, AspectRatio::SixteenNine),
            CropRegion { x: 0, y: 347, width: 900, height: 506 }
        );
        assert_eq!(
            centered_region(400, 300, AspectRatio::FourThree),
            CropRegion { x: 0, y: 0, width: 400, height: 300 }
        );
    }

    #[test]
    fn output_is_capped_at_max_size() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 3000, 2000);
        let out = crop_to_file(&src, AspectRatio::ThreeTwo, None, 800, &dir.path().join("cache"))
            .unwrap();
        assert_eq!(dims(&out), (800, 533));
        let name = out.to_path().unwrap();
        let name = name.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("cropped_image_") && name.ends_with(".jpg"));
    }

    #[test]
    fn small_crop_is_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 300, 200);
        let region = CropRegion { x: 10, y: 10, width: 120, height: 120 };
        let out = crop_to_file(&src, AspectRatio::Square, Some(region), 800, dir.path()).unwrap();
        assert_eq!(dims(&out), (120, 120));
    }

    #[test]
    fn region_is_clamped_to_image() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 100, 100);
        let region = CropRegion { x: 50, y: 60, width: 500, height: 500 };
        let out = crop_to_file(&src, AspectRatio::Square, Some(region), 800, dir.path()).unwrap();
        assert_eq!(dims(&out), (50, 40));
    }

    #[test]
    fn region_outside_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 100, 100);
        let region = CropRegion { x: 100, y: 0, width: 10, height: 10 };
        let err = crop_to_file(&src, AspectRatio::Square, Some(region), 800, dir.path())
            .unwrap_err();
        assert!(matches!(err, AppError::Crop(_)));
    }

    #[test]
    fn repeated_crops_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 64, 64);
        let a = crop_to_file(&src, AspectRatio::Square, None, 800, dir.path()).unwrap();
        let b = crop_to_file(&src, AspectRatio::Square, None, 800, dir.path()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn crop_after_cancel_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 64, 64);
        let mut flow = CropFlow::new(None);
        flow.open_picker().unwrap();
        flow.picked(Some(src.clone())).unwrap();
        flow.choose_aspect(Some(AspectRatio::Square)).unwrap();

        let out = crop_to_file(&src, AspectRatio::Square, None, 800, dir.path()).unwrap();
        let out_path = out.to_path().unwrap();
        flow.cancel();

        let err = finish_crop(&mut flow, Ok(out)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert!(!out_path.exists());
        assert_eq!(flow.current_image(), None);
    }

    #[test]
    fn accepted_crop_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), 64, 64);
        let mut flow = CropFlow::new(None);
        flow.open_picker().unwrap();
        flow.picked(Some(src.clone())).unwrap();
        flow.choose_aspect(Some(AspectRatio::Square)).unwrap();

        let out = crop_to_file(&src, AspectRatio::Square, None, 800, dir.path()).unwrap();
        let image = finish_crop(&mut flow, Ok(out.clone())).unwrap();
        assert_eq!(image, out);
        assert!(out.to_path().unwrap().exists());
        assert_eq!(flow.current_image(), Some(&out));
    }
}
