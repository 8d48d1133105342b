use anyhow::{bail, Context, Result};
use hypercolumn_data::LayerConfig;
use std::{env, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Sample training batches from a hypercolumn data layer
struct Args {
    #[structopt(long)]
    /// JSON5 layer configuration file
    pub config_file: Option<PathBuf>,
    #[structopt(long)]
    /// layer parameter string, e.g. "--imdb_name foo --ov_thresh 0.5"
    pub param_str: Option<String>,
    #[structopt(long, default_value = "10")]
    /// number of reshape and forward cycles
    pub iterations: usize,
}

pub fn main() -> Result<()> {
    // setup logging
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    // parse arguments
    let Args {
        config_file,
        param_str,
        iterations,
    } = Args::from_args();

    let config = match (config_file, param_str) {
        (Some(_), Some(_)) => bail!("--config-file and --param-str cannot be used together"),
        (Some(config_file), None) => LayerConfig::open(&config_file).with_context(|| {
            format!("failed to load config file '{}'", config_file.display())
        })?,
        (None, Some(param_str)) => LayerConfig::from_param_str(&param_str)?,
        (None, None) => LayerConfig::default(),
    };

    hypercolumn_feed::start(config, iterations)?;

    Ok(())
}
