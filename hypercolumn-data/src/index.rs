//! Per-category index of proposals overlapping ground truth instances.

use crate::{
    common::*,
    imdb::{GroundTruth, ImageDatabase},
};

/// A proposal that overlaps a ground truth instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    /// Proposal index within the image.
    pub proposal: usize,
    /// Image index within the database.
    pub image: usize,
    /// Ground truth index within the image.
    pub instance: usize,
}

/// The frozen index of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIndex {
    entries: Vec<IndexEntry>,
    im_end_index: Vec<isize>,
}

impl CategoryIndex {
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cumulative last entry position per image.
    ///
    /// It starts with the sentinel `-1` and has `num_images + 1` values.
    /// The entries of image `i` occupy positions
    /// `im_end_index[i] + 1 ..= im_end_index[i + 1]`.
    pub fn im_end_index(&self) -> &[isize] {
        &self.im_end_index
    }

    /// The range of entry positions belonging to an image.
    pub fn image_range(&self, image: usize) -> Range<usize> {
        let start = (self.im_end_index[image] + 1) as usize;
        let end = (self.im_end_index[image + 1] + 1) as usize;
        start..end
    }
}

/// The growable per-category lists used while scanning the database.
#[derive(Debug, Clone)]
pub struct CategoryIndexBuilder {
    entries: Vec<Vec<IndexEntry>>,
    im_end_index: Vec<Vec<isize>>,
}

impl CategoryIndexBuilder {
    pub fn new(num_classes: usize) -> Self {
        Self {
            entries: vec![vec![]; num_classes],
            im_end_index: vec![vec![-1]; num_classes],
        }
    }

    /// Append the qualifying proposals of the next image.
    ///
    /// Images must be pushed in index order starting from zero.
    pub fn push_image(
        &mut self,
        image: usize,
        proposals: &[TLBR<R64>],
        ground_truth: &[GroundTruth],
        ov_thresh: f64,
    ) -> Result<()> {
        let num_classes = self.entries.len();
        ensure!(num_classes > 0, "num_classes must be positive");
        let expect_image = self.im_end_index[0].len() - 1;
        ensure!(
            image == expect_image,
            "images must be indexed in order, expect image {} but get {}",
            expect_image,
            image
        );

        let gt_rects: Vec<_> = ground_truth.iter().map(|gt| gt.rect.clone()).collect();
        let overlaps = bbox::pixel_overlaps(proposals, &gt_rects);

        // carry over the end position of the previous image
        self.im_end_index.iter_mut().for_each(|ends| {
            let last = ends[ends.len() - 1];
            ends.push(last);
        });

        for (instance, gt) in ground_truth.iter().enumerate() {
            ensure!(
                (1..=num_classes).contains(&gt.class),
                "ground truth {} of image {} has class {}, which is out of range 1..={}",
                instance,
                image,
                gt.class,
                num_classes
            );
            let label = gt.class - 1;

            let column = overlaps.column(instance);
            let qualified: Vec<_> = column
                .iter()
                .enumerate()
                .filter(|(_, iou)| iou.raw() >= ov_thresh)
                .map(|(proposal, _)| IndexEntry {
                    proposal,
                    image,
                    instance,
                })
                .collect();

            if qualified.is_empty() {
                continue;
            }

            let ends = &mut self.im_end_index[label];
            let last = ends.len() - 1;
            ends[last] += qualified.len() as isize;
            self.entries[label].extend(qualified);
        }

        Ok(())
    }

    pub fn build(self) -> CategoryIndexSet {
        let Self {
            entries,
            im_end_index,
        } = self;
        let categories = izip!(entries, im_end_index)
            .map(|(entries, im_end_index)| CategoryIndex {
                entries,
                im_end_index,
            })
            .collect();
        CategoryIndexSet { categories }
    }
}

/// The immutable index over all categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIndexSet {
    categories: Vec<CategoryIndex>,
}

impl CategoryIndexSet {
    /// Scan the whole database and index every proposal whose IoU with a
    /// ground truth instance reaches `ov_thresh`.
    pub fn build<D>(imdb: &D, num_classes: usize, ov_thresh: f64) -> Result<Self>
    where
        D: ImageDatabase + ?Sized,
    {
        ensure!(num_classes > 0, "num_classes must be positive");
        let mut builder = CategoryIndexBuilder::new(num_classes);

        for image in 0..imdb.num_images() {
            let proposals = imdb.proposals(image)?;
            let ground_truth = imdb.ground_truth(image)?;
            builder
                .push_image(image, proposals, ground_truth, ov_thresh)
                .with_context(|| format!("failed to index image {} of '{}'", image, imdb.name()))?;
        }

        let index = builder.build();

        for (label, category) in index.categories.iter().enumerate() {
            if category.is_empty() {
                warn!(
                    "category {} has no proposal with overlap >= {}",
                    label, ov_thresh
                );
            } else {
                info!("category {} has {} training proposals", label, category.len());
            }
        }

        Ok(index)
    }

    pub fn num_classes(&self) -> usize {
        self.categories.len()
    }

    pub fn category(&self, label: usize) -> Option<&CategoryIndex> {
        self.categories.get(label)
    }

    pub fn categories(&self) -> &[CategoryIndex] {
        &self.categories
    }
}
