//! MCMC sampler of the essentiality labels.
//!
//! Each iteration updates, in this order,
//! 1. `phi`, the probability of a site to have no insertion, by a Metropolis step on the genes labeled non-essential,
//! 2. `z`, the labels of the genes, by a Gibbs step on the two-component mixture,
//! 3. `w1`, the mixing weight of the essential component, from its conjugate Beta posterior.
//!
//! The chain is strictly sequential. Inside an iteration, the per-gene densities are computed in parallel,
//! while the random draws are done in the order of the genes, so the result does not depend on the number of threads.
use crate::error::{GumbelError, Result};
use crate::misc::normal_pdf;
use crate::regression::ModelParameters;
use crate::run_length::{gumbel_log_pdf, gumbel_scale, RunLengthModel};
use crate::weight::EssentialWeightModel;
use definitions::GeneStat;
use rand::Rng;
use rand_distr::{Beta, Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

// Added to both class densities so that a gene incompatible with both classes gets p(z=1) of about 1/2.
const DENSITY_FLOOR: f64 = 1e-10;
// The labels at the start of the chain are determined by p-values under this phi.
const INITIAL_CLASSIFY_PHI: f64 = 0.5;

/// The structure to configure the parameters of the sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Number of retained samples.
    pub samples: usize,
    pub burn_in: usize,
    /// Keep every `trim`-th iteration after burn-in.
    pub trim: usize,
    /// Genes with fewer sites use the exact expected run length.
    pub exact: usize,
    /// Beta prior of phi.
    pub alpha: f64,
    pub beta: f64,
    /// Beta prior of the mixing weight.
    pub alpha_w: f64,
    pub beta_w: f64,
    pub phi_start: f64,
    pub w1_start: f64,
    /// Standard deviation of the random-walk proposal of phi.
    pub sigma_c: f64,
    pub seed: u64,
}

impl std::default::Default for SamplerConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            burn_in: 500,
            trim: 1,
            exact: crate::run_length::EXACT,
            alpha: 1f64,
            beta: 1f64,
            alpha_w: 600f64,
            beta_w: 3400f64,
            phi_start: 0.3,
            w1_start: 0.15,
            sigma_c: 0.01,
            seed: 24309,
        }
    }
}

impl SamplerConfig {
    pub fn new(samples: usize, burn_in: usize, trim: usize, seed: u64) -> Self {
        Self {
            samples,
            burn_in,
            trim,
            seed,
            ..Default::default()
        }
    }
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GumbelError::InvalidConfig(msg));
        if self.samples == 0 || self.burn_in == 0 || self.trim == 0 {
            let (s, b, t) = (self.samples, self.burn_in, self.trim);
            return invalid(format!("samples({s}), burn_in({b}), trim({t}) should be positive"));
        }
        if self.exact == 0 {
            return invalid("exact should be positive".to_string());
        }
        let hyper = [self.alpha, self.beta, self.alpha_w, self.beta_w, self.sigma_c];
        if hyper.iter().any(|&x| !(x.is_finite() && 0f64 < x)) {
            return invalid(format!("hyperparameters should be positive:{:?}", hyper));
        }
        if !(0f64 < self.phi_start && self.phi_start < 1f64) {
            return invalid(format!("phi_start({}) should be in (0,1)", self.phi_start));
        }
        if !(0f64..=1f64).contains(&self.w1_start) {
            return invalid(format!("w1_start({}) should be in [0,1]", self.w1_start));
        }
        Ok(())
    }
}

/// The state of the chain. It is modified once per iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    pub phi: f64,
    pub w1: f64,
    /// Label of each analyzable gene. 1 for essential.
    pub z: Vec<u8>,
    pub accept_count: usize,
    pub iteration_count: usize,
}

impl ChainState {
    pub fn essential_count(&self) -> usize {
        self.z.iter().filter(|&&z| z == 1).count()
    }
    pub fn acceptance_rate(&self) -> f64 {
        match self.iteration_count {
            0 => 0f64,
            iter => self.accept_count as f64 / iter as f64,
        }
    }
}

/// Retained samples. `z_samples[i][j]` is the label of the i-th analyzable gene in the j-th sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleChain {
    pub phi_samples: Vec<f64>,
    pub z_samples: Vec<Vec<u8>>,
}

impl SampleChain {
    fn with_capacity(genes: usize, samples: usize) -> Self {
        Self {
            phi_samples: Vec::with_capacity(samples),
            z_samples: vec![Vec::with_capacity(samples); genes],
        }
    }
    fn push(&mut self, phi: f64, z: &[u8]) {
        self.phi_samples.push(phi);
        for (samples, &z) in self.z_samples.iter_mut().zip(z.iter()) {
            samples.push(z);
        }
    }
    pub fn len(&self) -> usize {
        self.phi_samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.phi_samples.is_empty()
    }
    /// Posterior mean of the label of each analyzable gene.
    pub fn z_bar(&self) -> Vec<f64> {
        let len = self.len() as f64;
        self.z_samples
            .iter()
            .map(|zs| zs.iter().map(|&z| z as f64).sum::<f64>() / len)
            .collect()
    }
    pub fn phi_mean(&self) -> f64 {
        self.phi_samples.iter().sum::<f64>() / self.len() as f64
    }
    pub fn phi_final(&self) -> Option<f64> {
        self.phi_samples.last().copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct GeneData {
    n: usize,
    r: usize,
    s: f64,
    // Likelihood of the essential class, except the mixing weight.
    sig: f64,
}

#[derive(Debug, Clone)]
pub struct GumbelSampler {
    genes: Vec<GeneData>,
    params: ModelParameters,
    model: RunLengthModel,
    proposal: Normal<f64>,
    config: SamplerConfig,
}

impl std::fmt::Display for GumbelSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = &self.params;
        write!(
            f,
            "G:{}\tMuS:{:.3}\tSigmaS:{:.3}\tMuR:{:.4}\tSigmaR:{:.3}",
            self.genes.len(),
            p.mu_s(),
            p.sigma_s(),
            p.mu_r(),
            p.sigma_r()
        )
    }
}

impl GumbelSampler {
    /// Prepare a sampler on the analyzable genes in `stats`.
    pub fn new(stats: &[GeneStat], config: &SamplerConfig) -> Result<Self> {
        config.validate()?;
        let good: Vec<_> = stats.iter().filter(|g| g.is_analyzable).collect();
        if good.len() < 2 {
            let msg = format!("{} analyzable genes. At least 2 are needed.", good.len());
            return Err(GumbelError::InsufficientInput(msg));
        }
        let runs: Vec<_> = good.iter().map(|g| g.r as f64).collect();
        let spans: Vec<_> = good.iter().map(|g| g.s as f64).collect();
        let params = ModelParameters::fit(&runs, &spans)?;
        let mut weights = EssentialWeightModel::new();
        let genes: Vec<_> = good
            .iter()
            .map(|g| {
                let s = g.s as f64;
                let prior = weights.sigmoid_weight(g.s, g.t);
                let run_lk = normal_pdf(g.r as f64, params.mu_r() * s, params.sigma_r());
                let sig = prior * run_lk;
                GeneData { n: g.n, r: g.r, s, sig }
            })
            .collect();
        if let Some(g) = genes.iter().find(|g| !g.sig.is_finite()) {
            let msg = format!("non-finite essential likelihood (n={}, r={})", g.n, g.r);
            return Err(GumbelError::NumericInstability { iteration: 0, message: msg });
        }
        let model = RunLengthModel::new(config.exact, config.alpha, config.beta);
        let proposal = Normal::new(0f64, config.sigma_c)
            .map_err(|why| GumbelError::InvalidConfig(format!("{}", why)))?;
        Ok(Self {
            genes,
            params,
            model,
            proposal,
            config: config.clone(),
        })
    }
    /// Number of analyzable genes.
    pub fn gene_num(&self) -> usize {
        self.genes.len()
    }
    pub fn initial_state(&mut self) -> ChainState {
        let model = &mut self.model;
        let z: Vec<_> = self
            .genes
            .iter()
            .map(|g| model.classify(g.n, g.r, INITIAL_CLASSIFY_PHI))
            .collect();
        ChainState {
            phi: self.config.phi_start,
            w1: self.config.w1_start,
            z,
            accept_count: 0,
            iteration_count: 0,
        }
    }
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<(SampleChain, ChainState)> {
        self.run_with(rng, |_| {}, None)
    }
    /// Run the chain until `samples` samples are retained.
    /// `progress` is called once per iteration with the current state.
    /// `cancel` is checked once per iteration, before the iteration starts.
    pub fn run_with<R: Rng, F: FnMut(&ChainState)>(
        &mut self,
        rng: &mut R,
        mut progress: F,
        cancel: Option<&AtomicBool>,
    ) -> Result<(SampleChain, ChainState)> {
        let SamplerConfig {
            samples,
            burn_in,
            trim,
            ..
        } = self.config;
        let mut state = self.initial_state();
        let mut chain = SampleChain::with_capacity(self.genes.len(), samples);
        debug!("GUMBEL\tStart\t{}\tESS\t{}", self, state.essential_count());
        while chain.len() < samples {
            if cancel.map(|flag| flag.load(Ordering::Relaxed)).unwrap_or(false) {
                let iteration = state.iteration_count;
                debug!("GUMBEL\tCancelled\t{}", iteration);
                return Err(GumbelError::Cancelled { iteration });
            }
            self.update_phi(&mut state, rng)?;
            self.update_z(&mut state, rng)?;
            self.update_w1(&mut state, rng)?;
            state.iteration_count += 1;
            if burn_in < state.iteration_count && state.iteration_count % trim == 0 {
                chain.push(state.phi, &state.z);
            }
            trace!(
                "GUMBEL\tIter\t{}\t{:.4}\t{:.4}\t{}",
                state.iteration_count,
                state.phi,
                state.w1,
                state.essential_count()
            );
            progress(&state);
        }
        debug!(
            "GUMBEL\tEnd\t{}\t{}\t{:.3}",
            state.iteration_count,
            chain.len(),
            state.acceptance_rate()
        );
        Ok((chain, state))
    }
    /// Metropolis step. Returns true if the proposal is accepted.
    fn update_phi<R: Rng>(&mut self, state: &mut ChainState, rng: &mut R) -> Result<bool> {
        let proposal = state.phi + self.proposal.sample(rng);
        if proposal <= 0f64 || 1f64 <= proposal {
            return Ok(false);
        }
        let non_essentials: Vec<_> = self
            .genes
            .iter()
            .zip(state.z.iter())
            .filter(|&(_, &z)| z == 0)
            .map(|(g, _)| (g.n, g.r))
            .collect();
        let new_lk = self.model.log_likelihood_non_essential(proposal, &non_essentials);
        let old_lk = self.model.log_likelihood_non_essential(state.phi, &non_essentials);
        if !(new_lk.is_finite() && old_lk.is_finite()) {
            let message = format!(
                "log likelihood of phi is not finite: {}->{}, {}->{}. The data may be too sparse.",
                state.phi, old_lk, proposal, new_lk
            );
            let iteration = state.iteration_count;
            return Err(GumbelError::NumericInstability { iteration, message });
        }
        let accept = rng.gen::<f64>().ln() <= new_lk - old_lk;
        if accept {
            state.phi = proposal;
            state.accept_count += 1;
        }
        Ok(accept)
    }
    /// Unnormalized densities of the non-essential and the essential class, for each gene.
    pub fn class_densities(&mut self, phi: f64, w1: f64) -> Vec<(f64, f64)> {
        let model = &mut self.model;
        let locations: Vec<_> = self
            .genes
            .iter()
            .map(|g| model.gumbel_location(g.n, phi))
            .collect();
        let scale = gumbel_scale(phi);
        let (mu_s, sigma_s) = (self.params.mu_s(), self.params.sigma_s());
        self.genes
            .par_iter()
            .zip(locations.par_iter())
            .map(|(g, &loc)| {
                let r = g.r as f64;
                let run_lk = gumbel_log_pdf(r, loc, scale).exp();
                let span_lk = normal_pdf(g.s, mu_s * r, sigma_s);
                let h0 = run_lk * span_lk * (1f64 - w1) + DENSITY_FLOOR;
                let h1 = g.sig * w1 + DENSITY_FLOOR;
                (h0, h1)
            })
            .collect()
    }
    fn update_z<R: Rng>(&mut self, state: &mut ChainState, rng: &mut R) -> Result<()> {
        let densities = self.class_densities(state.phi, state.w1);
        for (z, (h0, h1)) in state.z.iter_mut().zip(densities) {
            let p_z1 = h1 / (h0 + h1);
            if !p_z1.is_finite() {
                let message = format!("p(z=1) is not finite: h0={}, h1={}", h0, h1);
                let iteration = state.iteration_count;
                return Err(GumbelError::NumericInstability { iteration, message });
            }
            *z = rng.gen_bool(p_z1.clamp(0f64, 1f64)) as u8;
        }
        Ok(())
    }
    fn update_w1<R: Rng>(&self, state: &mut ChainState, rng: &mut R) -> Result<()> {
        let n_ess = state.essential_count() as f64;
        let n_good = self.genes.len() as f64;
        let alpha = n_ess + self.config.alpha_w;
        let beta = n_good - n_ess + self.config.beta_w;
        let dist = Beta::new(alpha, beta).map_err(|why| {
            let message = format!("Beta({},{}) for w1: {}", alpha, beta, why);
            let iteration = state.iteration_count;
            GumbelError::NumericInstability { iteration, message }
        })?;
        state.w1 = dist.sample(rng);
        Ok(())
    }
}

#[cfg(test)]
mod sampler_test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gene_stats::longest_run;
    use definitions::{Gene, Strand};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    /// Simulate the statistics of `num` genes. A gene is essential with probability `ess_frac`,
    /// and then it has no insertion in a large part of it. Other sites are empty with probability `phi`.
    fn simulate_stats<R: Rng>(
        rng: &mut R,
        num: usize,
        phi: f64,
        ess_frac: f64,
    ) -> (Vec<GeneStat>, Vec<bool>) {
        (0..num)
            .map(|i| {
                let n = rng.gen_range(8..60);
                let is_essential = rng.gen_bool(ess_frac);
                let gaps: Vec<u64> = (0..n).map(|_| rng.gen_range(10..80)).collect();
                let positions: Vec<u64> = gaps
                    .iter()
                    .scan(0, |pos, gap| {
                        *pos += gap;
                        Some(*pos)
                    })
                    .collect();
                let (domain_start, domain_end) = match is_essential {
                    true => (n / 5, n),
                    false => (n, n),
                };
                let is_zero: Vec<_> = (0..n)
                    .map(|j| (domain_start..domain_end).contains(&j) || rng.gen_bool(phi))
                    .collect();
                let k = is_zero.iter().filter(|&&z| !z).count();
                let (r, start) = longest_run(&is_zero);
                let s = match r {
                    0 => 0,
                    _ => positions[start + r - 1] - positions[start] + 2,
                };
                let t = positions[n - 1] + 200;
                let name = format!("g{}", i);
                let gene = Gene::new(&name, &name, 1, t, Strand::Forward);
                (GeneStat::new(&gene, n, k, r, s, t), is_essential)
            })
            .unzip()
    }
    fn small_config(samples: usize, burn_in: usize, trim: usize, seed: u64) -> SamplerConfig {
        SamplerConfig::new(samples, burn_in, trim, seed)
    }
    #[test]
    fn config_validation() {
        assert!(SamplerConfig::default().validate().is_ok());
        for &(s, b, t) in [(0, 10, 1), (10, 0, 1), (10, 10, 0)].iter() {
            let err = small_config(s, b, t, 0).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
        let mut config = SamplerConfig::default();
        config.phi_start = 1f64;
        assert!(config.validate().is_err());
        let mut config = SamplerConfig::default();
        config.alpha_w = 0f64;
        assert!(config.validate().is_err());
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(4);
        let (stats, _) = simulate_stats(&mut rng, 30, 0.5, 0.2);
        let err = GumbelSampler::new(&stats, &small_config(0, 10, 1, 0)).unwrap_err();
        assert!(matches!(err, GumbelError::InvalidConfig(_)));
    }
    #[test]
    fn insufficient_genes() {
        let gene = Gene::new("g", "g", 1, 1000, Strand::Forward);
        let stats = vec![
            GeneStat::new(&gene, 10, 3, 4, 200, 1000),
            GeneStat::new(&gene, 1, 0, 1, 2, 1000),
        ];
        let err = GumbelSampler::new(&stats, &SamplerConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInsufficiency);
    }
    #[test]
    fn chain_length() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(3290);
        let (stats, _) = simulate_stats(&mut rng, 100, 0.5, 0.2);
        let config = small_config(100, 50, 1, 43);
        let mut sampler = GumbelSampler::new(&stats, &config).unwrap();
        let (chain, state) = sampler.run(&mut rng).unwrap();
        assert_eq!(chain.len(), 100);
        assert_eq!(chain.z_samples.len(), sampler.gene_num());
        assert!(chain.z_samples.iter().all(|zs| zs.len() == 100));
        assert_eq!(state.iteration_count, 150);
        assert!(state.accept_count <= state.iteration_count);
        // With thinning.
        let config = small_config(20, 10, 3, 43);
        let mut sampler = GumbelSampler::new(&stats, &config).unwrap();
        let (chain, state) = sampler.run(&mut rng).unwrap();
        assert_eq!(chain.len(), 20);
        assert_eq!(state.iteration_count, 69);
    }
    #[test]
    fn invariants_hold() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(9);
        let (stats, _) = simulate_stats(&mut rng, 80, 0.4, 0.2);
        let config = small_config(200, 20, 1, 1);
        let mut sampler = GumbelSampler::new(&stats, &config).unwrap();
        let mut observed = vec![];
        let result = sampler.run_with(&mut rng, |state| observed.push((state.phi, state.w1)), None);
        let (chain, state) = result.unwrap();
        assert_eq!(observed.len(), state.iteration_count);
        assert!(observed.iter().all(|&(phi, _)| 0f64 < phi && phi < 1f64));
        assert!(observed.iter().all(|&(_, w1)| (0f64..=1f64).contains(&w1)));
        assert!(chain.z_samples.iter().flatten().all(|&z| z <= 1));
        assert!(chain.phi_samples.iter().all(|&phi| 0f64 < phi && phi < 1f64));
    }
    #[test]
    fn densities_are_valid() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(42);
        let (stats, _) = simulate_stats(&mut rng, 60, 0.5, 0.3);
        let mut sampler = GumbelSampler::new(&stats, &SamplerConfig::default()).unwrap();
        for &phi in [0.01, 0.2, 0.5, 0.8, 0.99].iter() {
            for &w1 in [0f64, 0.15, 0.5, 1f64].iter() {
                for (h0, h1) in sampler.class_densities(phi, w1) {
                    assert!(0f64 <= h0 && 0f64 <= h1, "{}\t{}", h0, h1);
                    let p = h1 / (h0 + h1);
                    assert!((0f64..=1f64).contains(&p), "{}", p);
                }
            }
        }
    }
    #[test]
    fn deterministic() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(3);
        let (stats, _) = simulate_stats(&mut rng, 50, 0.5, 0.2);
        let config = small_config(100, 20, 2, 10);
        let run = |seed: u64| {
            let mut sampler = GumbelSampler::new(&stats, &config).unwrap();
            let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(seed);
            sampler.run(&mut rng).unwrap()
        };
        let (chain1, state1) = run(30);
        let (chain2, state2) = run(30);
        assert_eq!(chain1, chain2);
        assert_eq!(state1, state2);
    }
    #[test]
    fn independent_of_threads() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(11);
        let (stats, _) = simulate_stats(&mut rng, 120, 0.5, 0.2);
        let config = small_config(100, 20, 1, 10);
        let run = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            pool.install(|| {
                let mut sampler = GumbelSampler::new(&stats, &config).unwrap();
                let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(30);
                sampler.run(&mut rng).unwrap()
            })
        };
        let (chain1, state1) = run(1);
        let (chain4, state4) = run(4);
        assert_eq!(chain1, chain4);
        assert_eq!(state1, state4);
    }
    #[test]
    fn numeric_instability() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(6);
        let (stats, _) = simulate_stats(&mut rng, 50, 0.5, 0.2);
        let mut sampler = GumbelSampler::new(&stats, &small_config(100, 20, 1, 0)).unwrap();
        // The posterior of the mixing weight can not be formed.
        sampler.config.alpha_w = f64::NAN;
        let err = sampler.run(&mut rng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericInstability);
        match err {
            GumbelError::NumericInstability { iteration, .. } => assert_eq!(iteration, 0),
            _ => panic!("{:?}", err),
        }
    }
    #[test]
    fn cancellation() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(5);
        let (stats, _) = simulate_stats(&mut rng, 50, 0.5, 0.2);
        let mut sampler = GumbelSampler::new(&stats, &small_config(100, 20, 1, 0)).unwrap();
        let flag = AtomicBool::new(false);
        let result = sampler.run_with(
            &mut rng,
            |state| {
                if state.iteration_count == 10 {
                    flag.store(true, Ordering::Relaxed);
                }
            },
            Some(&flag),
        );
        match result {
            Err(GumbelError::Cancelled { iteration }) => assert_eq!(iteration, 10),
            _ => panic!("the chain should have been cancelled"),
        }
    }
    #[test]
    fn separates_essential_genes() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(482304);
        let (stats, answer) = simulate_stats(&mut rng, 300, 0.4, 0.15);
        let config = small_config(300, 100, 1, 7);
        let mut sampler = GumbelSampler::new(&stats, &config).unwrap();
        let (chain, _) = sampler.run(&mut rng).unwrap();
        let z_bar = chain.z_bar();
        let answer: Vec<_> = stats
            .iter()
            .zip(answer.iter())
            .filter_map(|(g, &is_ess)| g.is_analyzable.then_some(is_ess))
            .collect();
        assert_eq!(z_bar.len(), answer.len());
        let (mut ess, mut non): (Vec<f64>, Vec<f64>) = (vec![], vec![]);
        for (&z, &is_ess) in z_bar.iter().zip(answer.iter()) {
            match is_ess {
                true => ess.push(z),
                false => non.push(z),
            }
        }
        let ess_mean = ess.iter().sum::<f64>() / ess.len() as f64;
        let non_mean = non.iter().sum::<f64>() / non.len() as f64;
        assert!(non_mean < 0.2, "{}\t{}", ess_mean, non_mean);
        assert!(ess_mean > non_mean + 0.3, "{}\t{}", ess_mean, non_mean);
        let phi = chain.phi_mean();
        assert!(0.2 < phi && phi < 0.7, "{}", phi);
    }
}
