use super::*;
use crate::common::*;

/// The image database described by a JSON5 manifest file.
#[derive(Debug, Clone)]
pub struct ManifestDataset {
    name: String,
    records: Vec<ManifestRecord>,
    segmentation_attached: bool,
}

#[derive(Debug, Clone)]
struct ManifestRecord {
    image_paths: Vec<PathBuf>,
    proposals: Vec<TLBR<R64>>,
    ground_truth: Vec<GroundTruth>,
    instance_ids: Vec<u32>,
    inst_segm: PathBuf,
}

/// The on-disk manifest format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub images: Vec<ManifestImage>,
}

/// A manifest entry. Boxes are `[x1, y1, x2, y2]` in inclusive pixel units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestImage {
    pub images: Vec<PathBuf>,
    pub proposals: Vec<[R64; 4]>,
    pub gt_boxes: Vec<[R64; 4]>,
    pub gt_classes: Vec<usize>,
    pub instance_ids: Vec<u32>,
    pub inst_segm: PathBuf,
}

impl ManifestDataset {
    /// Load a manifest file. Relative paths are resolved against the
    /// directory of the manifest.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest '{}'", path.display()))?;
        let manifest: Manifest = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text)
                .with_context(|| format!("failed to parse manifest '{}'", path.display()))?,
            _ => json5::from_str(&text)
                .with_context(|| format!("failed to parse manifest '{}'", path.display()))?,
        };
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        Self::from_manifest(manifest, base_dir)
            .with_context(|| format!("invalid manifest '{}'", path.display()))
    }

    pub fn from_manifest<P>(manifest: Manifest, base_dir: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let base_dir = base_dir.as_ref();
        let Manifest { name, images } = manifest;

        let records: Vec<_> = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| -> Result<_> {
                let ManifestImage {
                    images,
                    proposals,
                    gt_boxes,
                    gt_classes,
                    instance_ids,
                    inst_segm,
                } = image;

                ensure!(!images.is_empty(), "image {} has no image files", index);
                ensure!(
                    gt_boxes.len() == gt_classes.len() && gt_boxes.len() == instance_ids.len(),
                    "image {} has {} gt_boxes, {} gt_classes and {} instance_ids",
                    index,
                    gt_boxes.len(),
                    gt_classes.len(),
                    instance_ids.len()
                );

                let proposals: Vec<_> = proposals
                    .into_iter()
                    .map(TLBR::try_from_xyxy)
                    .try_collect()
                    .with_context(|| format!("invalid proposal box in image {}", index))?;
                let ground_truth: Vec<_> = izip!(gt_boxes, gt_classes)
                    .map(|(xyxy, class)| -> Result<_> {
                        Ok(GroundTruth {
                            rect: TLBR::try_from_xyxy(xyxy)?,
                            class,
                        })
                    })
                    .try_collect()
                    .with_context(|| format!("invalid gt box in image {}", index))?;

                Ok(ManifestRecord {
                    image_paths: images.iter().map(|path| base_dir.join(path)).collect(),
                    proposals,
                    ground_truth,
                    instance_ids,
                    inst_segm: base_dir.join(inst_segm),
                })
            })
            .try_collect()?;

        Ok(Self {
            name,
            records,
            segmentation_attached: false,
        })
    }

    fn record(&self, index: usize) -> Result<&ManifestRecord> {
        self.records.get(index).ok_or_else(|| {
            format_err!(
                "image index {} is out of range of {} images in '{}'",
                index,
                self.records.len(),
                self.name
            )
        })
    }
}

impl ImageDatabase for ManifestDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_images(&self) -> usize {
        self.records.len()
    }

    fn image_paths_at(&self, index: usize) -> Result<&[PathBuf]> {
        Ok(&self.record(index)?.image_paths)
    }

    fn proposals(&self, index: usize) -> Result<&[TLBR<R64>]> {
        Ok(&self.record(index)?.proposals)
    }

    fn ground_truth(&self, index: usize) -> Result<&[GroundTruth]> {
        Ok(&self.record(index)?.ground_truth)
    }

    fn attach_instance_segmentation(&mut self) -> Result<()> {
        let missing: Vec<_> = self
            .records
            .iter()
            .map(|record| &record.inst_segm)
            .filter(|path| !path.is_file())
            .collect();

        if let Some(first) = missing.first() {
            bail!(
                "{} instance segmentation files are missing in '{}', the first one is '{}'",
                missing.len(),
                self.name,
                first.display()
            );
        }

        self.segmentation_attached = true;
        Ok(())
    }

    fn instance_segmentation(&self, index: usize) -> Result<InstanceSegmentation> {
        ensure!(
            self.segmentation_attached,
            "instance segmentation is not attached to '{}'",
            self.name
        );
        let record = self.record(index)?;
        let map = load_instance_map(&record.inst_segm)?;

        Ok(InstanceSegmentation {
            map,
            instance_ids: record.instance_ids.clone(),
        })
    }
}

/// Open the image database with the given name under `data_dir`.
///
/// The manifest is looked up as `<data_dir>/<name>.json5` and then
/// `<data_dir>/<name>.json`.
pub fn open_imdb<P>(name: &str, data_dir: P) -> Result<ManifestDataset>
where
    P: AsRef<Path>,
{
    let data_dir = data_dir.as_ref();
    let candidates = [
        data_dir.join(format!("{}.json5", name)),
        data_dir.join(format!("{}.json", name)),
    ];

    let path = candidates
        .iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            format_err!(
                "unable to find image database '{}', tried '{}' and '{}'",
                name,
                candidates[0].display(),
                candidates[1].display()
            )
        })?;

    info!("loading image database '{}' from '{}'", name, path.display());
    let dataset = ManifestDataset::open(path)?;
    ensure!(
        dataset.name() == name,
        "manifest '{}' declares name '{}', expect '{}'",
        path.display(),
        dataset.name(),
        name
    );
    info!("image database '{}' has {} images", name, dataset.num_images());

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hypercolumn-data-{}-{}-{}",
            tag,
            std::process::id(),
            DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const MANIFEST: &str = r#"{
        name: "toy_train",
        images: [
            {
                images: ["rgb.png"],
                proposals: [[0, 0, 9, 9], [2, 2, 7, 7]],
                gt_boxes: [[0, 0, 9, 9]],
                gt_classes: [2],
                instance_ids: [5],
                inst_segm: "inst.png",
            },
        ],
    }"#;

    #[test]
    fn manifest_from_str() {
        let manifest: Manifest = json5::from_str(MANIFEST).unwrap();
        let dataset = ManifestDataset::from_manifest(manifest, "/data").unwrap();

        assert_eq!(dataset.name(), "toy_train");
        assert_eq!(dataset.num_images(), 1);
        assert_eq!(dataset.image_paths_at(0).unwrap(), &[PathBuf::from("/data/rgb.png")]);
        assert_eq!(dataset.proposals(0).unwrap().len(), 2);
        assert_eq!(
            dataset.proposals(0).unwrap()[1].xyxy(),
            [r64(2.0), r64(2.0), r64(7.0), r64(7.0)]
        );
        assert_eq!(dataset.ground_truth(0).unwrap()[0].class, 2);
        assert!(dataset.proposals(1).is_err());
        assert!(dataset.instance_segmentation(0).is_err());
    }

    #[test]
    fn manifest_length_mismatch() {
        let manifest = Manifest {
            name: "bad".into(),
            images: vec![ManifestImage {
                images: vec!["a.png".into()],
                proposals: vec![],
                gt_boxes: vec![[r64(0.0), r64(0.0), r64(1.0), r64(1.0)]],
                gt_classes: vec![],
                instance_ids: vec![1],
                inst_segm: "a_inst.png".into(),
            }],
        };
        assert!(ManifestDataset::from_manifest(manifest, "").is_err());
    }

    #[test]
    fn open_imdb_loads_files() {
        let dir = scratch_dir("open");
        std::fs::write(dir.join("toy_train.json5"), MANIFEST).unwrap();
        RgbImage::from_pixel(10, 8, image::Rgb([10, 20, 30]))
            .save(dir.join("rgb.png"))
            .unwrap();
        GrayImage::from_fn(10, 8, |x, _| Luma([if x < 5 { 5 } else { 0 }]))
            .save(dir.join("inst.png"))
            .unwrap();

        let mut dataset = open_imdb("toy_train", &dir).unwrap();
        dataset.attach_instance_segmentation().unwrap();

        let images = dataset.load_images(0).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dimensions(), (10, 8));
        assert_eq!(images[0].get_pixel(3, 3).0, [10, 20, 30]);

        let segm = dataset.instance_segmentation(0).unwrap();
        assert_eq!(segm.map.dim(), (8, 10));
        assert_eq!(segm.map[(0, 0)], 5);
        assert_eq!(segm.map[(0, 9)], 0);
        assert_eq!(segm.instance_ids, vec![5]);

        assert!(open_imdb("missing", &dir).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn open_imdb_falls_back_to_json() {
        let dir = scratch_dir("json");
        let manifest: Manifest = json5::from_str(MANIFEST).unwrap();
        std::fs::write(
            dir.join("toy_train.json"),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let dataset = open_imdb("toy_train", &dir).unwrap();
        assert_eq!(dataset.num_images(), 1);
        assert_eq!(dataset.image_paths_at(0).unwrap(), &[dir.join("rgb.png")]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn parse_error_names_manifest() {
        let dir = scratch_dir("malformed");
        std::fs::write(dir.join("broken.json5"), "{ name: \"broken\", images: [").unwrap();

        let err = open_imdb("broken", &dir).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json5"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn attach_fails_on_missing_files() {
        let dir = scratch_dir("missing");
        std::fs::write(dir.join("toy_train.json5"), MANIFEST).unwrap();

        let mut dataset = open_imdb("toy_train", &dir).unwrap();
        assert!(dataset.attach_instance_segmentation().is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
