use std::path::{Path, PathBuf};
use std::fs;
use image::{GrayImage, ImageFormat, RgbImage};

use crate::errors::{DonutMaskError, Result};
use crate::image_utils::Raster;

/// Represents an input image with its metadata
pub struct InputImage {
    pub raster: Raster,
    pub path: PathBuf,
    pub filename: String,
}

/// True when the file extension is one of `extensions` (case-insensitive)
pub fn has_image_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Get all image files directly inside a directory, sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(DonutMaskError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(DonutMaskError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path, extensions) {
            image_files.push(path);
        }
    }
    image_files.sort();

    Ok(image_files)
}

/// Decode an image file into a raster
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    // Get filename without extension
    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DonutMaskError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let img = image::open(path)?;

    Ok(InputImage {
        raster: Raster::from(img),
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGB image as PNG
pub fn save_rgb_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a single-channel image as PNG
pub fn save_gray_image<P: AsRef<Path>>(image: &GrayImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_ignores_case() {
        let extensions = vec!["png".to_string(), "jpg".to_string()];
        assert!(has_image_extension(Path::new("a/b/donut.PNG"), &extensions));
        assert!(has_image_extension(Path::new("donut.jpg"), &extensions));
        assert!(!has_image_extension(Path::new("donut.jpeg"), &extensions));
        assert!(!has_image_extension(Path::new("README"), &extensions));
    }

    #[test]
    fn missing_directory_is_an_invalid_path() {
        let result = get_image_files_in_dir("/definitely/not/here", &["png".to_string()]);
        assert!(matches!(result, Err(DonutMaskError::InvalidPath(_))));
    }
}
