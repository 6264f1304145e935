use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image file {path}: the keyword {key} must be present")]
    MissingKeyword { path: PathBuf, key: String },

    #[error("Invalid image file {path}: keyword {key} has invalid value {value:?}")]
    InvalidKeyword {
        path: PathBuf,
        key: String,
        value: String,
    },

    #[error("FITS I/O error: {0}")]
    Fits(#[from] fitsio::compat::errors::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Invalid cube file: {0}")]
    InvalidCube(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("{0} not in reference file")]
    NotFound(String),

    #[error("Dimension mismatch: expected {expected_w}x{expected_h}, got {w}x{h}")]
    DimensionMismatch {
        expected_w: usize,
        expected_h: usize,
        w: usize,
        h: usize,
    },

    #[error("Alignment failed: {0}")]
    Alignment(String),

    #[error("No reference baseline in {0}")]
    NoReference(PathBuf),

    #[error("Reference file error: {0}")]
    Store(#[from] serde_json::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Camera must be 0, 1 or 2 (got {0})")]
    InvalidCamera(u8),

    #[error("Remote protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, IrisError>;
