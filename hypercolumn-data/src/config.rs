//! Data layer configuration.

use crate::common::*;

/// Options of the hypercolumn data layer.
///
/// The options are either parsed from a whitespace separated parameter
/// string, e.g. `--imdb_name nyud2_images_2015_train --ov_thresh 0.5`, or
/// loaded from a JSON5 file where omitted fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
#[structopt(name = "hypercolumn-data", rename_all = "snake_case")]
#[serde(default)]
pub struct LayerConfig {
    /// The name of the image database.
    #[structopt(long, default_value = "nyud2_images_2015_train")]
    pub imdb_name: String,
    /// The directory where image database manifests are looked up.
    #[structopt(long, default_value = "data")]
    pub data_dir: PathBuf,
    /// Minimum IoU between a proposal and a ground truth box.
    #[structopt(long, default_value = "0.7")]
    pub ov_thresh: f64,
    /// Number of proposals drawn per sampled image.
    #[structopt(long, default_value = "5")]
    pub train_samples_per_img: usize,
    /// Number of object categories.
    #[structopt(long, default_value = "19")]
    pub num_classes: usize,
    /// Side length of the square image blob.
    #[structopt(long, default_value = "688")]
    pub max_size: usize,
    /// Number of co-registered images per example.
    #[structopt(long, default_value = "1")]
    pub num_images: usize,
    /// Side length of the square mask targets.
    #[structopt(long, default_value = "50")]
    pub mask_size: usize,
    /// Seed of the sampling random number generator.
    #[structopt(long, default_value = "3")]
    pub seed: u64,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            imdb_name: "nyud2_images_2015_train".into(),
            data_dir: PathBuf::from("data"),
            ov_thresh: 0.7,
            train_samples_per_img: 5,
            num_classes: 19,
            max_size: 688,
            num_images: 1,
            mask_size: 50,
            seed: 3,
        }
    }
}

impl LayerConfig {
    /// Parse a parameter string in `--key value` form.
    pub fn from_param_str(param_str: &str) -> Result<Self> {
        let args = iter::once("hypercolumn-data").chain(param_str.split_whitespace());
        let config = Self::from_iter_safe(args)
            .map_err(|err| format_err!("invalid layer parameters '{}': {}", param_str, err))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from a JSON5 file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.ov_thresh),
            "ov_thresh must be within [0, 1], but get {}",
            self.ov_thresh
        );
        ensure!(
            self.train_samples_per_img > 0,
            "train_samples_per_img must be positive"
        );
        ensure!(self.num_classes > 0, "num_classes must be positive");
        ensure!(self.max_size > 0, "max_size must be positive");
        ensure!(self.num_images > 0, "num_images must be positive");
        ensure!(self.mask_size > 0, "mask_size must be positive");
        Ok(())
    }

    /// The output slot names in host buffer order.
    pub fn blob_names(&self) -> Vec<String> {
        let images = iter::once("image".to_string())
            .chain((1..self.num_images).map(|index| format!("image_{}", index)));
        let targets = [
            "normalizedboxes",
            "sppboxes",
            "categids",
            "labels",
            "instance_wts",
        ]
        .into_iter()
        .map(String::from);
        images.chain(targets).collect()
    }
}
