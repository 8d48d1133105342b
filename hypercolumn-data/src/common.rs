pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use bbox::{prelude::*, Transform, HW, TLBR};
pub use image::{imageops::FilterType, DynamicImage, RgbImage};
pub use indexmap::IndexMap;
pub use itertools::{izip, Itertools as _};
pub use log::{debug, info, warn};
pub use ndarray::{s, Array1, Array2, Array4, ArrayD, ArrayView2, IxDyn};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt::Debug,
    iter,
    ops::Range,
    path::{Path, PathBuf},
};
pub use structopt::StructOpt;
