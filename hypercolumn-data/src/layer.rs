//! The host-facing data layer.

use crate::{
    blob::{BlobPreparer, ResizeBlobPreparer},
    common::*,
    config::LayerConfig,
    imdb::{open_imdb, ImageDatabase},
    sampler::{Batch, Sampler},
};

/// Adapts [Sampler] to hosts that drive a data source with separate
/// reshape and forward calls on host-owned buffers.
///
/// The layer is a pure data source, so there is no backward call.
#[derive(Debug)]
pub struct HypercolumnDataLayer {
    sampler: Sampler,
    batch: Option<Batch>,
}

impl HypercolumnDataLayer {
    pub fn setup(
        config: LayerConfig,
        imdb: Box<dyn ImageDatabase>,
        preparer: Box<dyn BlobPreparer>,
    ) -> Result<Self> {
        let sampler = Sampler::from_config(config, imdb, preparer)?;
        Ok(Self {
            sampler,
            batch: None,
        })
    }

    /// Set up the layer from a parameter string, opening the named image
    /// database under the configured data directory.
    pub fn from_param_str(param_str: &str) -> Result<Self> {
        let config = LayerConfig::from_param_str(param_str)?;
        Self::from_config(config)
    }

    pub fn from_config(config: LayerConfig) -> Result<Self> {
        let imdb = open_imdb(&config.imdb_name, &config.data_dir)?;
        let preparer = ResizeBlobPreparer::from_config(&config)?;
        Self::setup(config, Box::new(imdb), Box::new(preparer))
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// The output slot names in host buffer order.
    pub fn top_names(&self) -> &[String] {
        self.sampler.blob_names()
    }

    pub fn num_tops(&self) -> usize {
        self.top_names().len()
    }

    /// The most recently sampled batch.
    pub fn batch(&self) -> Option<&Batch> {
        self.batch.as_ref()
    }

    /// Draw the next batch and reshape the host buffers to match it.
    pub fn reshape(&mut self, tops: &mut [ArrayD<f32>]) -> Result<()> {
        self.check_num_tops(tops)?;
        let batch = self.sampler.sample_next()?;

        for (top, blob) in tops.iter_mut().zip(batch.blobs.values()) {
            if top.shape() != blob.shape() {
                *top = ArrayD::zeros(IxDyn(blob.shape()));
            }
        }

        self.batch = Some(batch);
        Ok(())
    }

    /// Copy the current batch into the host buffers.
    pub fn forward(&self, tops: &mut [ArrayD<f32>]) -> Result<()> {
        self.check_num_tops(tops)?;
        let batch = self
            .batch
            .as_ref()
            .ok_or_else(|| format_err!("forward is called before reshape"))?;

        for (top, (name, blob)) in tops.iter_mut().zip(&batch.blobs) {
            ensure!(
                top.shape() == blob.shape(),
                "the buffer of '{}' has shape {:?}, but the blob has shape {:?}",
                name,
                top.shape(),
                blob.shape()
            );
            top.assign(blob);
        }

        Ok(())
    }

    fn check_num_tops(&self, tops: &[ArrayD<f32>]) -> Result<()> {
        ensure!(
            tops.len() == self.num_tops(),
            "expect {} output buffers, but get {}",
            self.num_tops(),
            tops.len()
        );
        Ok(())
    }
}
