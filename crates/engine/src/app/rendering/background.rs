use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;

use crate::app::viewport::NaturalSize;

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("failed to open background image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode background image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("background image {path} has zero size")]
    Empty { path: PathBuf },
}

/// Decoded background in natural pixel space, tightly packed RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl BackgroundImage {
    /// Returns `None` if `rgba` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if width == 0 || height == 0 || rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn natural_size(&self) -> NaturalSize {
        NaturalSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel at natural coordinates, clamped to the image edge.
    pub fn sample(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let offset = (y * self.width as usize + x) * 4;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.rgba[offset..offset + 4]);
        pixel
    }
}

pub fn load_background(path: &Path) -> Result<BackgroundImage, BackgroundError> {
    let reader = ImageReader::open(path).map_err(|source| BackgroundError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| BackgroundError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = (image.width(), image.height());
    BackgroundImage::from_rgba(width, height, image.into_raw()).ok_or_else(|| {
        BackgroundError::Empty {
            path: path.to_path_buf(),
        }
    })
}
