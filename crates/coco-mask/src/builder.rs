//! Mask build pipeline: one mask image per annotated COCO image.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::coco::COCO;
use crate::config::{ImageFilter, MaskConfig};
use crate::error::{Error, Result};
use crate::raster::MaskCanvas;

/// What a build wrote and what it left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Mask files written, in image id order.
    pub written: Vec<PathBuf>,
    /// Images whose mask came out all zero.
    pub empty_images: Vec<u64>,
    pub skipped_polygons: usize,
    pub skipped_rles: usize,
    /// Annotations without a segmentation.
    pub skipped_annotations: usize,
}

impl BuildReport {
    pub fn log_summary(&self) {
        info!("=== Mask Summary ===");
        info!("Masks written: {}", self.written.len());
        info!("Empty masks skipped: {}", self.empty_images.len());
        let skipped = self.skipped_polygons + self.skipped_rles + self.skipped_annotations;
        if skipped > 0 {
            warn!(
                "Skipped segmentations: {} (polygons: {}, RLEs: {}, annotations without segmentation: {})",
                skipped, self.skipped_polygons, self.skipped_rles, self.skipped_annotations
            );
        }
    }
}

/// Load `annotation_file` and write masks into `output_dir`.
pub fn build_masks(
    annotation_file: &Path,
    output_dir: &Path,
    config: &MaskConfig,
    filter: &ImageFilter,
) -> Result<BuildReport> {
    config.validate()?;
    info!("Loading annotations from {:?}", annotation_file);
    let coco = COCO::new(annotation_file)?;
    build_masks_from(&coco, output_dir, config, filter)
}

/// Write masks for an already-loaded dataset.
pub fn build_masks_from(
    coco: &COCO,
    output_dir: &Path,
    config: &MaskConfig,
    filter: &ImageFilter,
) -> Result<BuildReport> {
    config.validate()?;
    fs::create_dir_all(output_dir).map_err(|source| Error::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut report = BuildReport::default();
    for img_id in coco.annotated_img_ids(filter) {
        let Some(image) = coco.get_img(img_id) else {
            let ann_id = coco.anns_for_img(img_id, filter).next().map_or(0, |ann| ann.id);
            return Err(Error::UnknownImage {
                ann_id,
                image_id: img_id,
            });
        };

        let mut canvas = MaskCanvas::new(config);
        for ann in coco.anns_for_img(img_id, filter) {
            let Some(segmentation) = &ann.segmentation else {
                debug!("Annotation {} of image {} has no segmentation", ann.id, img_id);
                report.skipped_annotations += 1;
                continue;
            };

            let outcome = canvas.paint(segmentation);
            for skip in &outcome.polygons_skipped {
                warn!(
                    "Skipping polygon of annotation {} in image {}: {:?}",
                    ann.id, img_id, skip
                );
            }
            for skip in &outcome.rles_skipped {
                warn!(
                    "Skipping RLE of annotation {} in image {}: {:?}",
                    ann.id, img_id, skip
                );
            }
            report.skipped_polygons += outcome.polygons_skipped.len();
            report.skipped_rles += outcome.rles_skipped.len();
        }

        if canvas.is_empty() {
            info!("Mask is empty for image {}. Skipping.", img_id);
            report.empty_images.push(img_id);
            continue;
        }

        let path = config.format.mask_path(output_dir, &image.file_name)?;
        debug!(
            "Image {}: {} foreground pixels",
            img_id,
            canvas.foreground_pixels()
        );
        config.format.write(canvas.as_image(), &path)?;
        info!("Mask saved: {}", path.display());
        report.written.push(path);
    }

    Ok(report)
}
