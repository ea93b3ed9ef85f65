//! Loading luminosity grids from disk and writing mask images.
//!
//! Supported inputs, chosen by file extension:
//! - `txt`, `csv`, `dat`: one row per line, values separated by whitespace or
//!   commas. Blank lines and lines starting with `#` are skipped.
//! - `json`: an array of row arrays.
//! - anything else: a raster image decoded by the `image` crate and
//!   converted to 16-bit grayscale.

use std::path::Path;

use image::{GrayImage, Luma};
use log::debug;
use ndarray::Array2;
use thiserror::Error;

use crate::image_proc::grid::{GridError, PixelGrid};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Line {line}: cannot parse '{token}' as a number")]
    Parse { line: usize, token: String },
    #[error("Invalid JSON grid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),
}

/// Load a grid from `path`, dispatching on its extension.
pub fn load_grid(path: &Path) -> Result<PixelGrid, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let grid = match extension.as_deref() {
        Some("txt") | Some("csv") | Some("dat") => parse_text_grid(&read_text(path)?)?,
        Some("json") => parse_json_grid(&read_text(path)?)?,
        _ => load_image_grid(path)?,
    };

    debug!(
        "Loaded {}x{} grid from {}",
        grid.n_cols(),
        grid.n_rows(),
        path.display()
    );
    Ok(grid)
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a whitespace- or comma-separated text matrix.
pub fn parse_text_grid(text: &str) -> Result<PixelGrid, LoadError> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|_| LoadError::Parse {
                    line: index + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }
    Ok(PixelGrid::from_rows(rows)?)
}

/// Parse a JSON array of row arrays.
pub fn parse_json_grid(text: &str) -> Result<PixelGrid, LoadError> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(text)?;
    Ok(PixelGrid::from_rows(rows)?)
}

/// Decode a raster image as 16-bit grayscale luminosity.
pub fn load_image_grid(path: &Path) -> Result<PixelGrid, LoadError> {
    let gray = image::open(path)?.into_luma16();
    let (width, height) = gray.dimensions();
    let values = Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32)[0] as f64
    });
    Ok(PixelGrid::new(values)?)
}

/// Converts a boolean mask to an 8-bit image, white where the mask is set.
///
/// Array indices `[row, col]` map to pixel coordinates `(col, row)`.
pub fn mask_to_gray_image(mask: &Array2<bool>) -> GrayImage {
    let (height, width) = mask.dim();
    let mut img = GrayImage::new(width as u32, height as u32);
    for ((row, col), &set) in mask.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([if set { 255 } else { 0 }]));
    }
    img
}

/// Write a boolean mask as an image; the format follows the extension.
pub fn save_mask_image(mask: &Array2<bool>, path: &Path) -> Result<(), LoadError> {
    mask_to_gray_image(mask).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;
    use ndarray::arr2;
    use tempfile::tempdir;

    #[test]
    fn test_parse_text_grid() {
        let text = "# header\n1 2 3\n\n4,5,6\n  7\t8  9 \n";
        let grid = parse_text_grid(text).unwrap();

        assert_eq!(grid.dim(), (3, 3));
        assert_eq!(grid.value(1, 2), 6.0);
        assert_eq!(grid.value(2, 0), 7.0);
    }

    #[test]
    fn test_parse_text_errors() {
        assert!(matches!(
            parse_text_grid("1 2\n3 x\n"),
            Err(LoadError::Parse { line: 2, ref token }) if token == "x"
        ));
        assert!(matches!(
            parse_text_grid("1 2\n3\n"),
            Err(LoadError::Grid(GridError::RaggedGrid { row: 1, .. }))
        ));
        assert!(matches!(
            parse_text_grid("# only a comment\n"),
            Err(LoadError::Grid(GridError::EmptyGrid))
        ));
    }

    #[test]
    fn test_parse_json_grid() {
        let grid = parse_json_grid("[[0, 1.5], [2, 3]]").unwrap();
        assert_eq!(grid.value(0, 1), 1.5);
        assert!(matches!(parse_json_grid("{}"), Err(LoadError::Json(_))));
    }

    #[test]
    fn test_load_grid_dispatch() {
        let dir = tempdir().unwrap();

        let text_path = dir.path().join("frame.TXT");
        std::fs::write(&text_path, "0 0\n0 9\n").unwrap();
        assert_eq!(load_grid(&text_path).unwrap().value(1, 1), 9.0);

        let json_path = dir.path().join("frame.json");
        std::fs::write(&json_path, "[[1, 2]]").unwrap();
        assert_eq!(load_grid(&json_path).unwrap().dim(), (1, 2));

        assert!(matches!(
            load_grid(&dir.path().join("missing.txt")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_load_image_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(4, 3, |x, y| Luma([(y * 100 + x) as u16]));
        img.save(&path).unwrap();

        let grid = load_grid(&path).unwrap();
        assert_eq!(grid.dim(), (3, 4));
        assert_eq!(grid.value(2, 3), 203.0);
    }

    #[test]
    fn test_mask_image() {
        let mask = arr2(&[[true, false, false], [false, false, true]]);
        let img = mask_to_gray_image(&mask);

        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(2, 1)[0], 255);
        assert_eq!(img.get_pixel(1, 0)[0], 0);

        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.png");
        save_mask_image(&mask, &path).unwrap();
        assert!(path.exists());
    }
}
