//! Random sampling of training examples.

use crate::{
    blob::{BlobPreparer, PreparedBlobs},
    common::*,
    config::LayerConfig,
    imdb::ImageDatabase,
    index::{CategoryIndexSet, IndexEntry},
};

/// One sampled training example and its blobs.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Zero-based category label.
    pub category: usize,
    /// Image index within the database.
    pub image: usize,
    /// Sampled positions within the category index.
    pub positions: Vec<usize>,
    /// The index entries at the sampled positions.
    pub entries: Vec<IndexEntry>,
    /// Blobs keyed by slot name, in slot order.
    pub blobs: IndexMap<String, ArrayD<f32>>,
}

impl Batch {
    pub fn blob(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.blobs.get(name)
    }

    /// The number of mask targets in the batch.
    pub fn num_masks(&self) -> usize {
        self.blob("labels")
            .map(|labels| labels.shape()[0])
            .unwrap_or(0)
    }
}

/// Draws a category, an image and a set of proposals per call.
#[derive(Debug)]
pub struct Sampler {
    config: LayerConfig,
    imdb: Box<dyn ImageDatabase>,
    preparer: Box<dyn BlobPreparer>,
    index: CategoryIndexSet,
    blob_names: Vec<String>,
    rng: StdRng,
}

impl Sampler {
    /// Attach instance segmentation to the database and index it.
    pub fn new(
        config: LayerConfig,
        mut imdb: Box<dyn ImageDatabase>,
        preparer: Box<dyn BlobPreparer>,
        rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;
        info!("using config: {:?}", config);

        imdb.attach_instance_segmentation()
            .with_context(|| format!("failed to attach instance segmentation to '{}'", imdb.name()))?;
        let index = CategoryIndexSet::build(&*imdb, config.num_classes, config.ov_thresh)?;
        let blob_names = config.blob_names();

        Ok(Self {
            config,
            imdb,
            preparer,
            index,
            blob_names,
            rng,
        })
    }

    /// Create a sampler whose generator is seeded from `config.seed`.
    pub fn from_config(
        config: LayerConfig,
        imdb: Box<dyn ImageDatabase>,
        preparer: Box<dyn BlobPreparer>,
    ) -> Result<Self> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::new(config, imdb, preparer, rng)
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn index(&self) -> &CategoryIndexSet {
        &self.index
    }

    pub fn blob_names(&self) -> &[String] {
        &self.blob_names
    }

    /// Draw the next training example.
    pub fn sample_next(&mut self) -> Result<Batch> {
        let LayerConfig {
            num_classes,
            num_images,
            train_samples_per_img: num_samples,
            ov_thresh,
            ..
        } = self.config;

        // sample a category
        let category = self.rng.gen_range(0..num_classes);
        let category_index = self
            .index
            .category(category)
            .ok_or_else(|| format_err!("category {} is not indexed", category))?;
        ensure!(
            !category_index.is_empty(),
            "category {} has no proposal with overlap >= {} in '{}'",
            category,
            ov_thresh,
            self.imdb.name()
        );

        // sample an image, weighted by its number of proposals
        let image = category_index.entries()[self.rng.gen_range(0..category_index.len())].image;

        // sample proposals of the image with replacement
        let range = category_index.image_range(image);
        let positions: Vec<usize> = (0..num_samples)
            .map(|_| self.rng.gen_range(range.clone()))
            .collect();
        let entries: Vec<IndexEntry> = positions
            .iter()
            .map(|&position| category_index.entries()[position])
            .collect();
        debug!(
            "sampled category {} image {} positions {:?}",
            category, image, positions
        );

        // load pixels and annotations
        let images = self
            .imdb
            .load_images(image)
            .with_context(|| format!("failed to load images of image index {}", image))?;
        ensure!(
            images.len() == num_images,
            "expect {} images per example, but image index {} has {}",
            num_images,
            image,
            images.len()
        );

        let proposals = self.imdb.proposals(image)?;
        let boxes: Vec<TLBR<R64>> = entries
            .iter()
            .map(|entry| {
                proposals.get(entry.proposal).cloned().ok_or_else(|| {
                    format_err!(
                        "proposal {} is out of range in image index {}",
                        entry.proposal,
                        image
                    )
                })
            })
            .try_collect()?;

        // build one binary mask per sampled proposal
        let segmentation = self.imdb.instance_segmentation(image)?;
        let (height, width) = segmentation.map.dim();
        let mut masks = Array4::zeros((num_samples, 1, height, width));
        for (index, entry) in entries.iter().enumerate() {
            let mask = segmentation.mask_of(entry.instance)?;
            masks.slice_mut(s![index, 0, .., ..]).assign(&mask);
        }
        let categ_ids = Array1::from_elem(num_samples, category as f32);

        // prepare blobs per image; all images share the box and mask targets
        let prepared: Vec<PreparedBlobs> = images
            .iter()
            .map(|pixels| self.preparer.prepare(pixels, &boxes, &categ_ids, &masks))
            .try_collect()?;
        let mut prepared = prepared.into_iter();
        let PreparedBlobs {
            image: first_image,
            spp_boxes,
            normalized_boxes,
            categ_ids,
            labels,
            instance_wts,
        } = prepared
            .next()
            .ok_or_else(|| format_err!("no image is loaded for image index {}", image))?;

        let image_blobs = iter::once(first_image)
            .chain(prepared.map(|blobs| blobs.image))
            .map(|blob| blob.into_dyn());
        let target_blobs = [
            normalized_boxes.into_dyn(),
            spp_boxes.into_dyn(),
            categ_ids.into_dyn(),
            labels.into_dyn(),
            instance_wts.into_dyn(),
        ];
        let blobs: IndexMap<_, _> = self
            .blob_names
            .iter()
            .cloned()
            .zip(image_blobs.chain(target_blobs))
            .collect();
        debug_assert_eq!(blobs.len(), self.blob_names.len());

        Ok(Batch {
            category,
            image,
            positions,
            entries,
            blobs,
        })
    }
}
