//! Image loading, working-scale resize, and edge-map extraction.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageReader, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;

use crate::config::DetectorConfig;
use crate::error::{Error, Result};
use crate::models::WorkingImage;

/// Raster formats accepted by `load_image`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp", "gif", "webp"];

const SUPPORTED_EXTENSIONS_LIST: &str = "png, jpg, jpeg, tiff, bmp, gif, webp";

/// Load a photo from disk as RGB.
///
/// The path must name an existing file with a recognized raster extension;
/// anything else is rejected before decoding is attempted.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    if !path.is_file() {
        return Err(Error::InvalidImagePath(path.to_path_buf()));
    }
    let recognized = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()));
    if !recognized {
        return Err(Error::UnsupportedExtension(
            path.to_path_buf(),
            SUPPORTED_EXTENSIONS_LIST,
        ));
    }
    Ok(ImageReader::open(path)?.decode()?.to_rgb8())
}

/// Resize to the square working resolution, keeping the per-axis
/// coefficients that map working coordinates back onto the original.
///
/// The resize is non-uniform on purpose: contour geometry happens at a
/// fixed scale, and the coefficients undo the distortion at annotation
/// time.
pub fn resize_to_working(img: &RgbImage, working_size: u32) -> WorkingImage {
    let (orig_w, orig_h) = img.dimensions();
    let image = imageops::resize(img, working_size, working_size, FilterType::Triangle);
    WorkingImage {
        image,
        coef_x: orig_w as f32 / working_size as f32,
        coef_y: orig_h as f32 / working_size as f32,
    }
}

/// Grayscale, Gaussian blur, Canny, then a square dilation.
///
/// The dilation closes small gaps in card outlines so they trace as
/// closed contours instead of open edge fragments.
pub fn edge_map(img: &RgbImage, config: &DetectorConfig) -> GrayImage {
    let gray = imageops::grayscale(img);
    let blurred = gaussian_blur_f32(&gray, config.blur_sigma());
    let edges = canny(&blurred, config.canny_low, config.canny_high);
    dilate(&edges, Norm::LInf, config.dilate_radius)
}
