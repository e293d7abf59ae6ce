//! Essentiality -- Bayesian calls of gene essentiality from transposon-insertion sequencing.
//!
//! The analysis consists of the following steps.
//! 1. [Extract](gene_stats) the number of sites and the longest run without insertion of each gene.
//! 2. Fit the [relationship](regression) between the longest runs and their nucleotide spans.
//! 3. [Sample](sampler) the essentiality labels, mixing a [Gumbel model](run_length) of the longest run of non-essential genes
//!    with a [sigmoid prior](weight) of essential domains.
//! 4. [Summarize](posterior) the chain into calls.
//!
//! [GumbelEssentiality] runs all of them on a [DataSet](definitions::DataSet).
pub mod error;
pub mod gene_stats;
pub mod misc;
pub mod posterior;
pub mod regression;
pub mod report;
pub mod run_length;
pub mod sampler;
pub mod weight;
#[macro_use]
extern crate log;

pub use error::{ErrorKind, GumbelError, Result};
pub use gene_stats::{ExtractConfig, ExtractGeneStats, ReplicateMode};
pub use posterior::PosteriorConfig;
pub use sampler::{ChainState, SamplerConfig};

use definitions::{Call, DataSet, RunSummary};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GumbelConfig {
    pub extract: ExtractConfig,
    pub sampler: SamplerConfig,
    pub posterior: PosteriorConfig,
}

impl GumbelConfig {
    pub fn new(extract: ExtractConfig, sampler: SamplerConfig, posterior: PosteriorConfig) -> Self {
        Self {
            extract,
            sampler,
            posterior,
        }
    }
    pub fn validate(&self) -> Result<()> {
        let (n_term, c_term) = (self.extract.n_terminus, self.extract.c_terminus);
        if !((0f64..=100f64).contains(&n_term) && (0f64..=100f64).contains(&c_term)) {
            let msg = format!("terminus trimming ({n_term}, {c_term}) should be in [0,100]");
            return Err(GumbelError::InvalidConfig(msg));
        }
        let min_read = self.extract.min_read;
        if !(min_read.is_finite() && 0f64 <= min_read) {
            let msg = format!("min_read({min_read}) should be a non-negative number");
            return Err(GumbelError::InvalidConfig(msg));
        }
        self.sampler.validate()?;
        self.posterior.validate()
    }
}

pub trait GumbelEssentiality {
    /// Fill the gene statistics, the calls, and the summary of the run.
    /// On failure, no calls are left in the data set.
    fn gumbel_essentiality(&mut self, config: &GumbelConfig) -> Result<()> {
        self.gumbel_essentiality_with(config, |_| {}, None)
    }
    /// Same as [gumbel_essentiality](GumbelEssentiality::gumbel_essentiality),
    /// calling `progress` after each iteration and stopping when `cancel` is set.
    fn gumbel_essentiality_with<F: FnMut(&ChainState)>(
        &mut self,
        config: &GumbelConfig,
        progress: F,
        cancel: Option<&AtomicBool>,
    ) -> Result<()>;
}

impl GumbelEssentiality for DataSet {
    fn gumbel_essentiality_with<F: FnMut(&ChainState)>(
        &mut self,
        config: &GumbelConfig,
        progress: F,
        cancel: Option<&AtomicBool>,
    ) -> Result<()> {
        let start = std::time::Instant::now();
        self.calls.clear();
        self.summary = None;
        config.validate()?;
        let genome = self.extract_gene_stats(&config.extract);
        debug!(
            "GUMBEL\tSaturation\t{:.4}\t{}\t{}",
            genome.saturation(),
            genome.sites,
            genome.max_run
        );
        let mut sampler = sampler::GumbelSampler::new(&self.gene_stats, &config.sampler)?;
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(config.sampler.seed);
        let (chain, state) = sampler.run_with(&mut rng, progress, cancel)?;
        let phi_final = chain.phi_final().unwrap_or(state.phi);
        let z_bar = chain.z_bar();
        let posterior =
            posterior::summarize(&self.gene_stats, &z_bar, phi_final, &config.posterior)?;
        let elapsed = start.elapsed().as_secs_f64();
        let summary = RunSummary {
            samples: chain.len(),
            burn_in: config.sampler.burn_in,
            trim: config.sampler.trim,
            seed: config.sampler.seed,
            n_terminus: config.extract.n_terminus,
            c_terminus: config.extract.c_terminus,
            replicates: format!("{:?}", config.extract.replicates),
            min_read: config.extract.min_read,
            iterations: state.iteration_count,
            accept_count: state.accept_count,
            acceptance_rate: state.acceptance_rate(),
            elapsed_secs: elapsed,
            phi_mean: chain.phi_mean(),
            phi_final,
            global_phi: genome.global_phi(),
            saturation: genome.saturation(),
            max_run: genome.max_run,
            essential_threshold: posterior.essential_threshold,
            uncertain_threshold: posterior.uncertain_threshold,
            significant_n: posterior.significant_n,
            essential: posterior.count(Call::E),
            essential_binomial: posterior.count(Call::EB),
            non_essential: posterior.count(Call::NE),
            uncertain: posterior.count(Call::U),
            too_short: posterior.count(Call::S),
        };
        debug!(
            "GUMBEL\tCalls\tE:{}\tEB:{}\tNE:{}\tU:{}\tS:{}\t{:.1}sec",
            summary.essential,
            summary.essential_binomial,
            summary.non_essential,
            summary.uncertain,
            summary.too_short,
            elapsed
        );
        self.calls = posterior.calls;
        self.summary = Some(summary);
        Ok(())
    }
}
