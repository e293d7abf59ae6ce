//! Reduce the sample chain into one call per gene.
use crate::error::{GumbelError, Result};
use definitions::{Call, GeneCall, GeneStat};
use serde::{Deserialize, Serialize};

/// `z_bar` of genes excluded from the inference.
pub const NOT_ANALYZED: f64 = -1f64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosteriorConfig {
    /// Expected fraction of false calls among the essential (and among the non-essential) calls.
    pub fdr: f64,
    /// Chance level under which a gene without any insertion is called essential by binomial.
    pub binomial_alpha: f64,
}

impl std::default::Default for PosteriorConfig {
    fn default() -> Self {
        Self {
            fdr: 0.05,
            binomial_alpha: 0.05,
        }
    }
}

impl PosteriorConfig {
    pub fn new(fdr: f64, binomial_alpha: f64) -> Self {
        Self {
            fdr,
            binomial_alpha,
        }
    }
    pub fn validate(&self) -> Result<()> {
        let is_prob = |x: f64| 0f64 < x && x < 1f64;
        if !is_prob(self.fdr) || !is_prob(self.binomial_alpha) {
            let (fdr, alpha) = (self.fdr, self.binomial_alpha);
            let msg = format!("fdr({fdr}) and binomial_alpha({alpha}) should be in (0,1)");
            return Err(GumbelError::InvalidConfig(msg));
        }
        Ok(())
    }
}

/// The calls, with the cut-offs used to make them.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// One call per gene, in the order of the input.
    pub calls: Vec<GeneCall>,
    pub essential_threshold: f64,
    pub uncertain_threshold: f64,
    pub significant_n: f64,
}

impl Posterior {
    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|c| c.call == call).count()
    }
}

/// Return (essential threshold, uncertain threshold).
/// Genes above the essential threshold are expected to contain at most `fdr` false positives,
/// and genes below the uncertain threshold at most `fdr` false negatives.
pub fn essentiality_thresholds(z_bar: &[f64], fdr: f64) -> (f64, f64) {
    let mut sorted = z_bar.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let essential = match first_exceeding(sorted.iter().map(|z| 1f64 - z), fdr) {
        Some(0) => 1f64,
        Some(i) => sorted[i],
        None => 0f64,
    };
    sorted.reverse();
    let uncertain = match first_exceeding(sorted.iter().copied(), fdr) {
        Some(0) => 0f64,
        Some(i) => sorted[i],
        None => 1f64,
    };
    (essential, uncertain)
}

// The first index at which the running mean of `errors` exceeds `fdr`.
fn first_exceeding<I: Iterator<Item = f64>>(errors: I, fdr: f64) -> Option<usize> {
    let mut sum = 0f64;
    for (i, error) in errors.enumerate() {
        sum += error;
        if fdr < sum / (i + 1) as f64 {
            return Some(i);
        }
    }
    None
}

/// The minimum number of sites such that no insertion at all is less likely than `alpha`
/// for a non-essential gene.
pub fn significant_n(phi: f64, alpha: f64) -> f64 {
    alpha.ln() / phi.ln()
}

/// `z_bar` has one value per analyzable gene, in the order of `stats`.
pub fn summarize(
    stats: &[GeneStat],
    z_bar: &[f64],
    phi_final: f64,
    config: &PosteriorConfig,
) -> Result<Posterior> {
    config.validate()?;
    if !(0f64 < phi_final && phi_final < 1f64) {
        let msg = format!("phi({}) is out of (0,1)", phi_final);
        return Err(GumbelError::NumericInstability { iteration: 0, message: msg });
    }
    let analyzable = stats.iter().filter(|g| g.is_analyzable).count();
    if analyzable != z_bar.len() {
        let msg = format!("{} analyzable genes but {} posterior means", analyzable, z_bar.len());
        return Err(GumbelError::InsufficientInput(msg));
    }
    let (essential_threshold, uncertain_threshold) = essentiality_thresholds(z_bar, config.fdr);
    let significant_n = significant_n(phi_final, config.binomial_alpha);
    debug!(
        "POSTERIOR\t{:.3}\t{:.3}\t{:.2}",
        essential_threshold, uncertain_threshold, significant_n
    );
    let mut z_bar = z_bar.iter();
    let calls = stats
        .iter()
        .map(|stat| {
            if !stat.is_analyzable {
                return Ok(GeneCall::new(stat, NOT_ANALYZED, Call::S));
            }
            let &z = z_bar.next().ok_or_else(|| {
                GumbelError::InsufficientInput(format!("no posterior mean for {}", stat.orf_id))
            })?;
            let call = if essential_threshold < z {
                Call::E
            } else if significant_n <= stat.n as f64 && stat.k == 0 {
                Call::EB
            } else if uncertain_threshold <= z {
                Call::U
            } else {
                Call::NE
            };
            Ok(GeneCall::new(stat, z, call))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Posterior {
        calls,
        essential_threshold,
        uncertain_threshold,
        significant_n,
    })
}
