//! Training data feeder for region-based instance segmentation.
//!
//! The crate samples one category, one image and a set of overlapping
//! region proposals per iteration, builds binary instance mask targets and
//! packs everything into fixed-order `f32` blobs for a host training loop.

mod common;
pub mod blob;
pub mod config;
pub mod imdb;
pub mod index;
pub mod layer;
pub mod sampler;

pub use blob::{BlobPreparer, PreparedBlobs, ResizeBlobPreparer};
pub use config::LayerConfig;
pub use imdb::{open_imdb, GroundTruth, ImageDatabase, InstanceSegmentation, ManifestDataset};
pub use index::{CategoryIndex, CategoryIndexBuilder, CategoryIndexSet, IndexEntry};
pub use layer::HypercolumnDataLayer;
pub use sampler::{Batch, Sampler};
