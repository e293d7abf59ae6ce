//! Pipelines -- the whole analysis driven by one TOML profile.
//!
//! The profile names the input data set, where to write the results, and the parameters of each step.
//! Tables omitted from the profile fall back to the defaults of the library.
use definitions::DataSet;
use essentiality::report::Extract;
use essentiality::{ExtractConfig, GumbelConfig, GumbelEssentiality, PosteriorConfig, SamplerConfig};
use log::*;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The configuration of the pipeline.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PipelineConfig {
    /// The path to the input JSON file.
    input_file: PathBuf,
    /// The path to the output directory.
    out_dir: PathBuf,
    prefix: String,
    #[serde(default)]
    verbose: usize,
    #[serde(default = "default_threads")]
    threads: usize,
    #[serde(default)]
    extract: ExtractConfig,
    #[serde(default)]
    sampler: SamplerConfig,
    #[serde(default)]
    posterior: PosteriorConfig,
}

fn default_threads() -> usize {
    1
}

impl PipelineConfig {
    pub fn from_toml(profile: &str) -> std::io::Result<Self> {
        toml::from_str(profile).map_err(|why| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, why.to_string())
        })
    }
    pub fn input_file(&self) -> &Path {
        &self.input_file
    }
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
    pub fn verbose(&self) -> usize {
        self.verbose
    }
    pub fn threads(&self) -> usize {
        self.threads
    }
    pub fn gumbel_config(&self) -> GumbelConfig {
        GumbelConfig::new(
            self.extract.clone(),
            self.sampler.clone(),
            self.posterior.clone(),
        )
    }
    /// `<out_dir>/<prefix>.<extension>`
    pub fn output(&self, extension: &str) -> PathBuf {
        self.out_dir.join(&self.prefix).with_extension(extension)
    }
}

pub fn run_pipeline(config: &PipelineConfig) -> std::io::Result<()> {
    crate::init_logger(config.verbose);
    crate::set_threads(config.threads);
    std::fs::create_dir_all(&config.out_dir)?;
    let mut ds = parse_json(&config.input_file)?;
    if ds.input_file.is_empty() {
        ds.input_file = config.input_file.to_string_lossy().to_string();
    }
    debug!("START\tGumbel\t{}", ds.input_file);
    ds.gumbel_essentiality_with(&config.gumbel_config(), crate::log_progress, None)?;
    log(&ds, &config.output("json"))?;
    let mut wtr = std::fs::File::create(config.output("tsv")).map(BufWriter::new)?;
    ds.extract(&mut wtr)?;
    wtr.flush()
}

fn parse_json(filename: &Path) -> std::io::Result<DataSet> {
    debug!("Opening {filename:?}");
    let reader = std::fs::File::open(filename).map(BufReader::new)?;
    serde_json::de::from_reader(reader).map_err(std::io::Error::from)
}

fn log(ds: &DataSet, path: &Path) -> std::io::Result<()> {
    let mut wtr = std::fs::File::create(path).map(BufWriter::new)?;
    serde_json::ser::to_writer(&mut wtr, ds)?;
    wtr.flush()
}
