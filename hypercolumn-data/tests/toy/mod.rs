//! An in-memory image database shared by the integration tests.

#![allow(dead_code)]

use anyhow::{ensure, format_err, Result};
use bbox::TLBR;
use hypercolumn_data::{GroundTruth, ImageDatabase, InstanceSegmentation, LayerConfig};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use noisy_float::prelude::*;
use std::path::PathBuf;

pub const WIDTH: usize = 20;
pub const HEIGHT: usize = 16;

#[derive(Debug, Clone)]
pub struct ToyRecord {
    pub paths: Vec<PathBuf>,
    pub proposals: Vec<TLBR<R64>>,
    pub ground_truth: Vec<GroundTruth>,
    pub segmentation: InstanceSegmentation,
}

#[derive(Debug, Clone)]
pub struct ToyDatabase {
    pub records: Vec<ToyRecord>,
    pub attached: bool,
}

pub fn rect(xyxy: [f64; 4]) -> TLBR<R64> {
    TLBR::try_from_xyxy(xyxy.map(r64)).unwrap()
}

/// Paint the instance ids of the ground truth boxes into a map.
fn paint(ground_truth: &[GroundTruth], instance_ids: &[u32]) -> Array2<u32> {
    use bbox::prelude::*;

    let mut map = Array2::zeros((HEIGHT, WIDTH));
    for (gt, &id) in ground_truth.iter().zip(instance_ids) {
        let [x1, y1, x2, y2] = gt.rect.xyxy();
        for y in (y1.raw() as usize)..=(y2.raw() as usize) {
            for x in (x1.raw() as usize)..=(x2.raw() as usize) {
                map[(y, x)] = id;
            }
        }
    }
    map
}

fn record(
    image: usize,
    num_images: usize,
    proposals: Vec<[f64; 4]>,
    ground_truth: Vec<([f64; 4], usize)>,
) -> ToyRecord {
    let ground_truth: Vec<_> = ground_truth
        .into_iter()
        .map(|(xyxy, class)| GroundTruth {
            rect: rect(xyxy),
            class,
        })
        .collect();
    let instance_ids: Vec<u32> = (1..=ground_truth.len() as u32).collect();
    let map = paint(&ground_truth, &instance_ids);

    ToyRecord {
        paths: (0..num_images)
            .map(|channel| PathBuf::from(format!("toy/{}/{}.png", channel, image)))
            .collect(),
        proposals: proposals.into_iter().map(rect).collect(),
        ground_truth,
        segmentation: InstanceSegmentation { map, instance_ids },
    }
}

impl ToyDatabase {
    /// Two images and three classes.
    ///
    /// Image 0 has one proposal at IoU 0.9 with its class 1 instance. Image 1
    /// holds the class 2 and 3 instances, and a class 1 instance whose only
    /// nearby proposal stays below IoU 0.7.
    pub fn new(num_images: usize) -> Self {
        let records = vec![
            record(
                0,
                num_images,
                vec![[2.0, 2.0, 11.0, 10.0], [15.0, 0.0, 19.0, 5.0]],
                vec![([2.0, 2.0, 11.0, 11.0], 1)],
            ),
            record(
                1,
                num_images,
                vec![
                    [0.0, 0.0, 9.0, 9.0],
                    [0.0, 0.0, 9.0, 8.0],
                    [10.0, 6.0, 19.0, 15.0],
                    [0.0, 10.0, 3.0, 15.0],
                ],
                vec![
                    ([0.0, 0.0, 9.0, 9.0], 2),
                    ([10.0, 6.0, 19.0, 15.0], 3),
                    ([0.0, 10.0, 5.0, 15.0], 1),
                ],
            ),
        ];

        Self {
            records,
            attached: false,
        }
    }

    fn record(&self, index: usize) -> Result<&ToyRecord> {
        self.records
            .get(index)
            .ok_or_else(|| format_err!("invalid index {}", index))
    }
}

impl ImageDatabase for ToyDatabase {
    fn name(&self) -> &str {
        "toy"
    }

    fn num_images(&self) -> usize {
        self.records.len()
    }

    fn image_paths_at(&self, index: usize) -> Result<&[PathBuf]> {
        Ok(&self.record(index)?.paths)
    }

    fn proposals(&self, index: usize) -> Result<&[TLBR<R64>]> {
        Ok(&self.record(index)?.proposals)
    }

    fn ground_truth(&self, index: usize) -> Result<&[GroundTruth]> {
        Ok(&self.record(index)?.ground_truth)
    }

    fn attach_instance_segmentation(&mut self) -> Result<()> {
        self.attached = true;
        Ok(())
    }

    fn instance_segmentation(&self, index: usize) -> Result<InstanceSegmentation> {
        ensure!(self.attached, "instance segmentation is not attached");
        Ok(self.record(index)?.segmentation.clone())
    }

    fn load_images(&self, index: usize) -> Result<Vec<RgbImage>> {
        let record = self.record(index)?;
        let images = (0..record.paths.len())
            .map(|channel| {
                RgbImage::from_fn(WIDTH as u32, HEIGHT as u32, |x, y| {
                    Rgb([(x * 10) as u8, (y * 10) as u8, (channel * 100) as u8])
                })
            })
            .collect();
        Ok(images)
    }
}

pub fn toy_config() -> LayerConfig {
    LayerConfig {
        imdb_name: "toy".into(),
        num_classes: 3,
        ov_thresh: 0.7,
        train_samples_per_img: 5,
        max_size: 32,
        mask_size: 8,
        ..LayerConfig::default()
    }
}
