use crate::common::*;

/// An annotated object instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruth {
    /// Box in inclusive pixel coordinates.
    pub rect: TLBR<R64>,
    /// One-based class label.
    pub class: usize,
}

/// Per-pixel instance labels of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSegmentation {
    /// Instance id of every pixel in (height, width) layout.
    pub map: Array2<u32>,
    /// Instance id of each ground truth, in ground truth order.
    pub instance_ids: Vec<u32>,
}

impl InstanceSegmentation {
    /// The binary mask of the pixels labeled with the instance id of the
    /// `gt_index`th ground truth.
    pub fn mask_of(&self, gt_index: usize) -> Result<Array2<f32>> {
        let instance_id = *self.instance_ids.get(gt_index).ok_or_else(|| {
            format_err!(
                "ground truth index {} is out of range of {} instances",
                gt_index,
                self.instance_ids.len()
            )
        })?;
        Ok(self
            .map
            .mapv(|id| if id == instance_id { 1.0 } else { 0.0 }))
    }
}

/// The read-only view of an annotated image dataset with region proposals.
pub trait ImageDatabase
where
    Self: Debug + Send,
{
    /// The dataset name.
    fn name(&self) -> &str;

    /// The number of images.
    fn num_images(&self) -> usize;

    /// Paths to the co-registered image files of an example.
    fn image_paths_at(&self, index: usize) -> Result<&[PathBuf]>;

    /// Region proposals of an image.
    fn proposals(&self, index: usize) -> Result<&[TLBR<R64>]>;

    /// Ground truth instances of an image.
    fn ground_truth(&self, index: usize) -> Result<&[GroundTruth]>;

    /// Prepare instance segmentation access. It must be called once before
    /// [ImageDatabase::instance_segmentation].
    fn attach_instance_segmentation(&mut self) -> Result<()>;

    /// The instance segmentation of an image.
    fn instance_segmentation(&self, index: usize) -> Result<InstanceSegmentation>;

    /// Decode the co-registered images of an example.
    fn load_images(&self, index: usize) -> Result<Vec<RgbImage>> {
        self.image_paths_at(index)?
            .iter()
            .map(load_rgb_image)
            .try_collect()
    }
}

/// Decode an image file into 8-bit RGB.
pub fn load_rgb_image<P>(path: P) -> Result<RgbImage>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("failed to load image file '{}'", path.display()))?;
    Ok(image.to_rgb8())
}

/// Decode a single channel 8-bit or 16-bit instance label image.
pub fn load_instance_map<P>(path: P) -> Result<Array2<u32>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("failed to load instance map '{}'", path.display()))?;

    let map = match image {
        DynamicImage::ImageLuma8(buf) => {
            let (width, height) = buf.dimensions();
            Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                buf.get_pixel(x as u32, y as u32)[0] as u32
            })
        }
        DynamicImage::ImageLuma16(buf) => {
            let (width, height) = buf.dimensions();
            Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                buf.get_pixel(x as u32, y as u32)[0] as u32
            })
        }
        _ => bail!(
            "instance map '{}' must be a single channel 8-bit or 16-bit image",
            path.display()
        ),
    };

    Ok(map)
}
