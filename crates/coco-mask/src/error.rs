use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read annotation file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse annotation file {path:?}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("annotation {ann_id} refers to image {image_id}, which is not listed in \"images\"")]
    UnknownImage { ann_id: u64, image_id: u64 },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("image file name {0:?} does not stay inside the output directory")]
    InvalidFileName(String),
    #[error("failed to create directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write mask {path:?}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
