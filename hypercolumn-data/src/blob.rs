//! Conversion of sampled images, boxes and masks into network input blobs.

use crate::{common::*, config::LayerConfig};

/// The blobs produced for one image of a sampled example.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBlobs {
    /// `(1, 3, S, S)` mean subtracted BGR image.
    pub image: Array4<f32>,
    /// `(n, 5)` rows of `[batch_index, x1, y1, x2, y2]` in the rescaled frame.
    pub spp_boxes: Array2<f32>,
    /// `(n, 4)` rows of `[x1, y1, x2, y2]` in the rescaled frame divided by `S`.
    pub normalized_boxes: Array2<f32>,
    /// `(n,)` category ids.
    pub categ_ids: Array1<f32>,
    /// `(n, 1, M, M)` binary mask targets.
    pub labels: Array4<f32>,
    /// `(n,)` mask loss weights.
    pub instance_wts: Array1<f32>,
}

/// Turns raw inputs into blobs with the shapes expected by the network.
pub trait BlobPreparer
where
    Self: Debug + Send,
{
    /// Prepare the blobs of one image.
    ///
    /// `boxes` are in the pixel frame of `image` and `masks` has shape
    /// `(n, 1, height, width)`.
    fn prepare(
        &self,
        image: &RgbImage,
        boxes: &[TLBR<R64>],
        categ_ids: &Array1<f32>,
        masks: &Array4<f32>,
    ) -> Result<PreparedBlobs>;
}

/// Rescales the image so its longer side fits the square blob and crops
/// each mask to its box.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeBlobPreparer {
    target_size: usize,
    mask_size: usize,
    pixel_means: [f32; 3],
}

impl ResizeBlobPreparer {
    /// Per-channel means in BGR order.
    pub const PIXEL_MEANS: [f32; 3] = [102.9801, 115.9465, 122.7717];

    pub fn new(target_size: usize, mask_size: usize) -> Result<Self> {
        ensure!(target_size > 0, "target_size must be positive");
        ensure!(mask_size > 0, "mask_size must be positive");
        Ok(Self {
            target_size,
            mask_size,
            pixel_means: Self::PIXEL_MEANS,
        })
    }

    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        Self::new(config.max_size, config.mask_size)
    }

    fn image_blob(&self, image: &RgbImage, new_h: u32, new_w: u32) -> Array4<f32> {
        let size = self.target_size;
        let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
        let mut blob = Array4::zeros((1, 3, size, size));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            for (channel, value) in [b, g, r].into_iter().enumerate() {
                blob[[0, channel, y as usize, x as usize]] =
                    value as f32 - self.pixel_means[channel];
            }
        }

        blob
    }

    /// Crop `mask` to the pixels covered by `rect` and resample it to
    /// `mask_size x mask_size` with nearest neighbours.
    fn mask_target(&self, mask: ArrayView2<f32>, rect: &TLBR<R64>) -> Array2<f32> {
        let (height, width) = mask.dim();
        let clip = |value: R64, upper: usize| -> usize {
            value.raw().round().max(0.0).min((upper - 1) as f64) as usize
        };
        let [x1, y1, x2, y2] = rect.xyxy();
        let (x1, y1) = (clip(x1, width), clip(y1, height));
        let (x2, y2) = (clip(x2, width).max(x1), clip(y2, height).max(y1));
        let crop_h = y2 - y1 + 1;
        let crop_w = x2 - x1 + 1;
        let size = self.mask_size;

        Array2::from_shape_fn((size, size), |(row, col)| {
            let src_y = y1 + (row * crop_h + crop_h / 2) / size;
            let src_x = x1 + (col * crop_w + crop_w / 2) / size;
            let src_y = src_y.min(y2);
            let src_x = src_x.min(x2);
            if mask[(src_y, src_x)] > 0.5 {
                1.0
            } else {
                0.0
            }
        })
    }
}

impl BlobPreparer for ResizeBlobPreparer {
    fn prepare(
        &self,
        image: &RgbImage,
        boxes: &[TLBR<R64>],
        categ_ids: &Array1<f32>,
        masks: &Array4<f32>,
    ) -> Result<PreparedBlobs> {
        let (width, height) = image.dimensions();
        ensure!(
            width > 0 && height > 0,
            "image size must be positive, but get {}x{}",
            width,
            height
        );

        let num_boxes = boxes.len();
        ensure!(
            categ_ids.len() == num_boxes,
            "expect {} category ids, but get {}",
            num_boxes,
            categ_ids.len()
        );
        let (num_masks, mask_channels, mask_h, mask_w) = masks.dim();
        ensure!(
            num_masks == num_boxes && mask_channels == 1,
            "expect masks of shape ({}, 1, H, W), but get {:?}",
            num_boxes,
            masks.shape()
        );
        ensure!(
            mask_h == height as usize && mask_w == width as usize,
            "mask size {}x{} does not match image size {}x{}",
            mask_w,
            mask_h,
            width,
            height
        );

        // rescale the longer side to the target size
        let target = self.target_size as f64;
        let scale = target / width.max(height) as f64;
        let new_h = ((height as f64 * scale).round() as u32).clamp(1, self.target_size as u32);
        let new_w = ((width as f64 * scale).round() as u32).clamp(1, self.target_size as u32);
        let transform = {
            let src = HW::from_hw([r64(height as f64), r64(width as f64)]);
            Transform::from_sizes_exact(&src, &src.scale(r64(scale)))
        };

        let image_blob = self.image_blob(image, new_h, new_w);

        let scaled: Vec<[f32; 4]> = boxes
            .iter()
            .map(|rect| (&transform * rect).xyxy().map(|value| value.raw() as f32))
            .collect();
        let spp_boxes = Array2::from_shape_fn((num_boxes, 5), |(row, col)| match col {
            0 => 0.0,
            _ => scaled[row][col - 1],
        });
        let normalized_boxes = Array2::from_shape_fn((num_boxes, 4), |(row, col)| {
            scaled[row][col] / target as f32
        });

        let size = self.mask_size;
        let mut labels = Array4::zeros((num_boxes, 1, size, size));
        let mut instance_wts = Array1::zeros(num_boxes);

        for (index, rect) in boxes.iter().enumerate() {
            let label = self.mask_target(masks.slice(s![index, 0, .., ..]), rect);
            instance_wts[index] = if label.iter().any(|&value| value > 0.0) {
                1.0
            } else {
                0.0
            };
            labels.slice_mut(s![index, 0, .., ..]).assign(&label);
        }

        Ok(PreparedBlobs {
            image: image_blob,
            spp_boxes,
            normalized_boxes,
            categ_ids: categ_ids.clone(),
            labels,
            instance_wts,
        })
    }
}
