pub use anyhow::{ensure, Result};
pub use ndarray::Array2;
pub use num_traits::{Float, Num, One, Zero};
pub use std::ops::Mul;
