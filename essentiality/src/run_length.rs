//! The longest run of non-insertions in a non-essential gene follows, approximately,
//! a Gumbel distribution with scale `1/ln(1/phi)`. For short genes, and for genes with
//! only a few expected insertions, the location is corrected by the exact expectation of the longest run.
use std::collections::HashMap;

pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
/// Genes with fewer sites than this use the exact expectation of the longest run.
pub const EXACT: usize = 20;
/// The asymptotic expectation is used only while `n(1-phi)`, the expected number of insertions, is at least this.
pub const MIN_EXPECTED_INSERTIONS: f64 = 5f64;
/// A gene whose longest run has a p-value below this is labeled essential at the start.
pub const CLASSIFY_P_VALUE: f64 = 0.05;
const CACHE_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct RunLengthModel {
    exact: usize,
    // Beta prior on phi.
    alpha: f64,
    beta: f64,
    ln_beta: f64,
    // (n, phi.to_bits()) -> exact expected longest run.
    cache: HashMap<(usize, u64), f64>,
}

impl std::default::Default for RunLengthModel {
    fn default() -> Self {
        Self::new(EXACT, 1f64, 1f64)
    }
}

impl RunLengthModel {
    pub fn new(exact: usize, alpha: f64, beta: f64) -> Self {
        Self {
            exact,
            alpha,
            beta,
            ln_beta: statrs::function::beta::ln_beta(alpha, beta),
            cache: HashMap::new(),
        }
    }
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
    /// Expected length of the longest run of non-insertions among `n` sites,
    /// each of which is empty with probability `phi`.
    /// It is non-decreasing both in `n` and in `phi`.
    pub fn expected_run_length(&mut self, n: usize, phi: f64) -> f64 {
        if n < self.exact {
            return self.exact_cached(n, phi);
        }
        let border = 1f64 - MIN_EXPECTED_INSERTIONS / n as f64;
        if phi <= border {
            asymptotic_mean(n, phi)
        } else if 0f64 < border {
            // Frozen at the border, and never below the exact value.
            asymptotic_mean(n, border).max(self.exact_cached(n, phi))
        } else {
            self.exact_cached(n, phi)
        }
    }
    fn exact_cached(&mut self, n: usize, phi: f64) -> f64 {
        if CACHE_CAPACITY <= self.cache.len() {
            self.cache.clear();
        }
        *self
            .cache
            .entry((n, phi.to_bits()))
            .or_insert_with(|| exact_expected_run(n, phi))
    }
    /// Location parameter of the Gumbel distribution of the longest run.
    pub fn gumbel_location(&mut self, n: usize, phi: f64) -> f64 {
        self.expected_run_length(n, phi) - EULER_GAMMA * gumbel_scale(phi)
    }
    /// Log density of `phi` under the Beta prior.
    pub fn log_prior(&self, phi: f64) -> f64 {
        (self.alpha - 1f64) * phi.ln() + (self.beta - 1f64) * (1f64 - phi).ln() - self.ln_beta
    }
    /// Log likelihood of the genes, given as (number of sites, longest run),
    /// assuming all of them are non-essential, plus the log prior of `phi`.
    pub fn log_likelihood_non_essential(&mut self, phi: f64, genes: &[(usize, usize)]) -> f64 {
        let scale = gumbel_scale(phi);
        let lk: f64 = genes
            .iter()
            .map(|&(n, r)| {
                let loc = self.gumbel_location(n, phi);
                gumbel_log_pdf(r as f64, loc, scale)
            })
            .sum();
        self.log_prior(phi) + lk
    }
    /// The probability to observe a longest run of length `r` or longer by chance.
    pub fn p_value_essential(&mut self, n: usize, r: usize, phi: f64) -> f64 {
        let loc = self.gumbel_location(n, phi);
        gumbel_sf(r as f64, loc, gumbel_scale(phi))
    }
    /// 1 if the longest run is significantly long, 0 otherwise.
    pub fn classify(&mut self, n: usize, r: usize, phi: f64) -> u8 {
        if n == 0 {
            return 0;
        }
        (self.p_value_essential(n, r, phi) < CLASSIFY_P_VALUE) as u8
    }
}

pub fn gumbel_scale(phi: f64) -> f64 {
    (1f64 / phi).ln().recip()
}

fn asymptotic_location(n: usize, phi: f64) -> f64 {
    (n as f64 * (1f64 - phi)).ln() / (1f64 / phi).ln()
}

fn asymptotic_mean(n: usize, phi: f64) -> f64 {
    asymptotic_location(n, phi) + EULER_GAMMA * gumbel_scale(phi)
}

pub fn gumbel_log_pdf(x: f64, loc: f64, scale: f64) -> f64 {
    let z = (x - loc) / scale;
    -scale.ln() - z - (-z).exp()
}

/// 1 - CDF, without cancellation in the upper tail.
pub fn gumbel_sf(x: f64, loc: f64, scale: f64) -> f64 {
    let z = (x - loc) / scale;
    -(-(-z).exp()).exp_m1()
}

/// E[R] = sum_{r=1}^{n} P(R >= r).
pub fn exact_expected_run(n: usize, phi: f64) -> f64 {
    let mut total = 0f64;
    for r in 1..=n {
        let tail = 1f64 - prob_no_run(n, r, phi);
        total += tail;
        if tail < 1e-15 {
            break;
        }
    }
    total
}

// The probability that `n` trials contain no run of length `r` or longer.
// With q = 1 - phi, a[m] = a[m-1] - q * phi^r * a[m-r-1], since a run of length
// exactly r can first complete at the m-th trial only after a non-run at m-r.
fn prob_no_run(n: usize, r: usize, phi: f64) -> f64 {
    if n < r {
        return 1f64;
    }
    let pr = phi.powi(r as i32);
    let step = (1f64 - phi) * pr;
    let mut a = vec![1f64; n + 1];
    a[r] = 1f64 - pr;
    for m in r + 1..=n {
        a[m] = a[m - 1] - step * a[m - r - 1];
    }
    a[n]
}
