//! COCO annotation file loading and per-image grouping.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;

use crate::config::ImageFilter;
use crate::error::{Error, Result};
use crate::types::{Annotation, Dataset, Image};

/// A loaded COCO file with its annotations grouped by image.
pub struct COCO {
    pub dataset: Dataset,
    /// img_id -> index into dataset.images
    imgs: HashMap<u64, usize>,
    /// img_id -> indices into dataset.annotations, in file order
    img_to_anns: BTreeMap<u64, Vec<usize>>,
}

impl COCO {
    /// Load a COCO annotation JSON file and build indices.
    pub fn new(annotation_file: &Path) -> Result<Self> {
        let file = File::open(annotation_file).map_err(|source| Error::Io {
            path: annotation_file.to_path_buf(),
            source,
        })?;
        let dataset: Dataset =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Json {
                path: annotation_file.to_path_buf(),
                source,
            })?;
        debug!(
            "loaded {} images and {} annotations from {:?}",
            dataset.images.len(),
            dataset.annotations.len(),
            annotation_file
        );
        Self::from_dataset(dataset)
    }

    /// Index an already-loaded dataset.
    ///
    /// Fails if an annotation refers to an image id missing from `images`.
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        let imgs: HashMap<u64, usize> = dataset
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| (img.id, i))
            .collect();

        let mut img_to_anns: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (i, ann) in dataset.annotations.iter().enumerate() {
            if !imgs.contains_key(&ann.image_id) {
                return Err(Error::UnknownImage {
                    ann_id: ann.id,
                    image_id: ann.image_id,
                });
            }
            img_to_anns.entry(ann.image_id).or_default().push(i);
        }

        Ok(COCO {
            dataset,
            imgs,
            img_to_anns,
        })
    }

    pub fn get_img(&self, id: u64) -> Option<&Image> {
        self.imgs
            .get(&id)
            .and_then(|&i| self.dataset.images.get(i))
            .filter(|img| img.id == id)
    }

    /// Ids of images with at least one annotation passing `filter`,
    /// in ascending order.
    pub fn annotated_img_ids(&self, filter: &ImageFilter) -> Vec<u64> {
        self.img_to_anns
            .keys()
            .copied()
            .filter(|&id| filter.accepts_image(id))
            .filter(|&id| self.anns_for_img(id, filter).next().is_some())
            .collect()
    }

    /// Annotations of image `img_id` whose category passes `filter`, in file order.
    pub fn anns_for_img<'a>(
        &'a self,
        img_id: u64,
        filter: &'a ImageFilter,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.img_to_anns
            .get(&img_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(move |&i| self.dataset.annotations.get(i))
            .filter(move |ann| filter.accepts_category(ann.category_id))
    }
}
