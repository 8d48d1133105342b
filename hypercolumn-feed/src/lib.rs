//! Drives the hypercolumn data layer the way a training host would.

use anyhow::{ensure, format_err, Result};
use hypercolumn_data::{HypercolumnDataLayer, LayerConfig};
use itertools::Itertools as _;
use log::info;
use ndarray::{ArrayD, IxDyn};

/// Run `iterations` reshape and forward cycles and log every batch.
pub fn start(config: LayerConfig, iterations: usize) -> Result<()> {
    let mut layer = HypercolumnDataLayer::from_config(config)?;
    let mut tops: Vec<ArrayD<f32>> = (0..layer.num_tops())
        .map(|_| ArrayD::zeros(IxDyn(&[0])))
        .collect();

    info!("output slots: {}", layer.top_names().iter().join(", "));

    for step in 0..iterations {
        layer.reshape(&mut tops)?;
        layer.forward(&mut tops)?;

        let batch = layer
            .batch()
            .ok_or_else(|| format_err!("no batch is sampled at step {}", step))?;
        ensure!(
            batch.blobs.len() == tops.len(),
            "batch has {} blobs for {} buffers",
            batch.blobs.len(),
            tops.len()
        );

        let proposals = batch.entries.iter().map(|entry| entry.proposal).join(",");
        let shapes = describe_tops(layer.top_names(), &tops);
        info!(
            "step {}: category {} image {} proposals [{}] {}",
            step, batch.category, batch.image, proposals, shapes
        );
    }

    Ok(())
}

fn describe_tops(names: &[String], tops: &[ArrayD<f32>]) -> String {
    names
        .iter()
        .zip(tops)
        .map(|(name, top)| format!("{}{:?}", name, top.shape()))
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_tops_lists_names_and_shapes() {
        let names = vec!["image".to_string(), "categids".to_string()];
        let tops = vec![ArrayD::zeros(IxDyn(&[1, 3, 4, 4])), ArrayD::zeros(IxDyn(&[5]))];
        assert_eq!(describe_tops(&names, &tops), "image[1, 3, 4, 4] categids[5]");
    }

    #[test]
    fn start_runs_on_manifest_dataset() {
        let dir = std::env::temp_dir().join(format!("hypercolumn-feed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("toy.json5"),
            r#"{
                name: "toy",
                images: [{
                    images: ["rgb.png"],
                    proposals: [[0, 0, 9, 7], [1, 0, 9, 7]],
                    gt_boxes: [[0, 0, 9, 7]],
                    gt_classes: [1],
                    instance_ids: [1],
                    inst_segm: "inst.png",
                }],
            }"#,
        )
        .unwrap();
        image::RgbImage::from_pixel(10, 8, image::Rgb([50, 60, 70]))
            .save(dir.join("rgb.png"))
            .unwrap();
        image::GrayImage::from_fn(10, 8, |x, _| image::Luma([(x < 5) as u8]))
            .save(dir.join("inst.png"))
            .unwrap();

        let config = LayerConfig {
            imdb_name: "toy".into(),
            data_dir: dir.clone(),
            num_classes: 1,
            max_size: 16,
            mask_size: 4,
            ..LayerConfig::default()
        };
        start(config, 3).unwrap();

        let missing = LayerConfig {
            imdb_name: "missing".into(),
            data_dir: dir.clone(),
            ..LayerConfig::default()
        };
        assert!(start(missing, 1).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
