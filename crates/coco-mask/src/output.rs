//! Mask file naming and encoding.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::GrayImage;

use crate::error::{Error, Result};

/// How masks are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG under the source image's own file name.
    Jpeg { quality: u8 },
    /// Lossless PNG; the source extension is replaced by `.png`.
    Png,
}

impl OutputFormat {
    /// Path of the mask for the image named `file_name`, inside `output_dir`.
    ///
    /// `file_name` may contain sub-directories, but must be relative and must
    /// not climb out with `..`.
    pub fn mask_path(&self, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
        let relative = Path::new(file_name);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.file_name().is_none() {
            return Err(Error::InvalidFileName(file_name.to_string()));
        }

        let path = output_dir.join(relative);
        Ok(match self {
            OutputFormat::Jpeg { .. } => path,
            OutputFormat::Png => path.with_extension("png"),
        })
    }

    /// Encode `mask` to `path`, creating parent directories as needed.
    pub fn write(&self, mask: &GrayImage, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let encode_err = |source| Error::Encode {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path)
            .map_err(image::ImageError::IoError)
            .map_err(encode_err)?;
        let mut writer = BufWriter::new(file);

        let encoded = match *self {
            OutputFormat::Jpeg { quality } => {
                mask.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
            }
            OutputFormat::Png => mask.write_with_encoder(PngEncoder::new(&mut writer)),
        };
        encoded.map_err(encode_err)?;
        writer
            .flush()
            .map_err(|e| encode_err(image::ImageError::IoError(e)))
    }
}
