//! Definitions -- A tiny interface for the transposon-insertion essentiality analysis.
//! Every stage of the analysis reads and writes one, possibly large, structure named [DataSet](DataSet),
//! encoded as a JSON object, so the stages can be chained through pipes or resumed from a file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DataSet {
    /// The file the data set was loaded from, if any. Only used for reporting.
    #[serde(default)]
    pub input_file: String,
    /// Length of the (circular) genome in nucleotides.
    pub genome_length: u64,
    /// Names of the replicates. `Site::counts` has one entry per replicate.
    #[serde(default)]
    pub replicates: Vec<String>,
    /// Candidate insertion sites (TA dinucleotides), sorted by position.
    pub sites: Vec<Site>,
    /// Gene annotation, in the order the calls should be reported.
    pub genes: Vec<Gene>,
    #[serde(default)]
    pub gene_stats: Vec<GeneStat>,
    #[serde(default)]
    pub calls: Vec<GeneCall>,
    #[serde(default)]
    pub summary: Option<RunSummary>,
}

impl DataSet {
    pub fn new(input_file: &str, genome_length: u64, sites: Vec<Site>, genes: Vec<Gene>) -> Self {
        let replicates = match sites.first() {
            Some(site) => (0..site.counts.len()).map(|i| format!("rep{}", i)).collect(),
            None => vec![],
        };
        Self {
            input_file: input_file.to_string(),
            genome_length,
            replicates,
            sites,
            genes,
            gene_stats: vec![],
            calls: vec![],
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Site {
    /// 1-based position of the site on the genome.
    pub position: u64,
    /// Normalized read count, one per replicate.
    pub counts: Vec<f64>,
}

impl Site {
    pub fn new(position: u64, counts: Vec<f64>) -> Self {
        Self { position, counts }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// An annotated gene. Coordinates are 1-based and inclusive.
/// If `start > end`, the gene spans the origin of the circular genome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gene {
    pub orf_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

impl Gene {
    pub fn new(orf_id: &str, name: &str, start: u64, end: u64, strand: Strand) -> Self {
        Self {
            orf_id: orf_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            start,
            end,
            strand,
        }
    }
    pub fn wraps_origin(&self) -> bool {
        self.end < self.start
    }
}

/// Summary of the insertions along a gene.
/// It is computed once and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneStat {
    pub orf_id: String,
    pub name: String,
    pub description: String,
    /// Number of sites in the gene (after trimming the termini).
    pub n: usize,
    /// Number of sites with at least one read.
    pub k: usize,
    /// Length of the longest run of sites without any read.
    pub r: usize,
    /// Nucleotide span of the longest run.
    pub s: u64,
    /// Nucleotide span of the gene.
    pub t: u64,
    pub is_analyzable: bool,
}

/// Minimum number of sites in an analyzable gene.
pub const MIN_SITES: usize = 3;
/// Minimum nucleotide span of an analyzable gene.
pub const MIN_SPAN: u64 = 150;

impl GeneStat {
    pub fn new(gene: &Gene, n: usize, k: usize, r: usize, s: u64, t: u64) -> Self {
        Self {
            orf_id: gene.orf_id.clone(),
            name: gene.name.clone(),
            description: gene.description.clone(),
            n,
            k,
            r,
            s,
            t,
            is_analyzable: MIN_SITES <= n && MIN_SPAN <= t,
        }
    }
    /// Observed insertion density. Zero if the gene has no site.
    pub fn theta(&self) -> f64 {
        match self.n {
            0 => 0f64,
            n => self.k as f64 / n as f64,
        }
    }
}

/// Essentiality call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Call {
    /// Essential, by the posterior of the mixture model.
    E,
    /// Essential by binomial; too long to be free of insertions by chance.
    EB,
    /// Non-essential.
    NE,
    /// Uncertain.
    U,
    /// Too short to be analyzed.
    S,
}

impl Call {
    pub const ALL: [Call; 5] = [Call::E, Call::EB, Call::NE, Call::U, Call::S];
    pub fn description(&self) -> &'static str {
        match self {
            Call::E => "essential based on Gumbel",
            Call::EB => "essential based on Binomial",
            Call::NE => "non-essential",
            Call::U => "uncertain",
            Call::S => "too-short",
        }
    }
}

impl std::fmt::Display for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let call = match self {
            Call::E => "E",
            Call::EB => "EB",
            Call::NE => "NE",
            Call::U => "U",
            Call::S => "S",
        };
        write!(f, "{}", call)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneCall {
    pub orf_id: String,
    pub name: String,
    pub description: String,
    pub k: usize,
    pub n: usize,
    pub r: usize,
    pub s: u64,
    /// Posterior mean of the essentiality label. -1 if the gene is not analyzable.
    pub z_bar: f64,
    pub call: Call,
}

impl GeneCall {
    pub fn new(stat: &GeneStat, z_bar: f64, call: Call) -> Self {
        Self {
            orf_id: stat.orf_id.clone(),
            name: stat.name.clone(),
            description: stat.description.clone(),
            k: stat.k,
            n: stat.n,
            r: stat.r,
            s: stat.s,
            z_bar,
            call,
        }
    }
}

impl std::fmt::Display for GeneCall {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.2}\t{}",
            self.orf_id,
            self.name,
            self.description,
            self.k,
            self.n,
            self.r,
            self.s,
            self.z_bar,
            self.call
        )
    }
}

/// Diagnostics of one run of the analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RunSummary {
    /// Number of retained samples.
    pub samples: usize,
    pub burn_in: usize,
    pub trim: usize,
    pub seed: u64,
    pub n_terminus: f64,
    pub c_terminus: f64,
    /// How the replicates were combined.
    pub replicates: String,
    /// Minimum combined count for a site to be an insertion.
    pub min_read: f64,
    /// Number of iterations, including burn-in and thinned ones.
    pub iterations: usize,
    pub accept_count: usize,
    pub acceptance_rate: f64,
    pub elapsed_secs: f64,
    pub phi_mean: f64,
    pub phi_final: f64,
    /// Fraction of sites without any insertion, over the whole genome.
    pub global_phi: f64,
    pub saturation: f64,
    /// Longest run of sites without any insertion on the whole (circular) genome.
    pub max_run: usize,
    pub essential_threshold: f64,
    pub uncertain_threshold: f64,
    pub significant_n: f64,
    pub essential: usize,
    pub essential_binomial: usize,
    pub non_essential: usize,
    pub uncertain: usize,
    pub too_short: usize,
}

impl RunSummary {
    pub fn count(&self, call: Call) -> usize {
        match call {
            Call::E => self.essential,
            Call::EB => self.essential_binomial,
            Call::NE => self.non_essential,
            Call::U => self.uncertain,
            Call::S => self.too_short,
        }
    }
}

#[cfg(test)]
mod definitions_test {
    use super::*;
    #[test]
    fn analyzable_test() {
        let gene = Gene::new("Rv0001", "dnaA", 1, 1524, Strand::Forward);
        let stat = GeneStat::new(&gene, 3, 1, 2, 40, 1524);
        assert!(stat.is_analyzable);
        let stat = GeneStat::new(&gene, 2, 1, 1, 2, 1524);
        assert!(!stat.is_analyzable);
        let stat = GeneStat::new(&gene, 10, 1, 1, 2, 149);
        assert!(!stat.is_analyzable);
        let stat = GeneStat::new(&gene, 0, 0, 0, 0, 1524);
        assert!(!stat.is_analyzable);
        assert_eq!(stat.theta(), 0f64);
    }
    #[test]
    fn serde_test() {
        let json = r#"{"genome_length":100,
            "sites":[{"position":10,"counts":[1.0,0.0]}],
            "genes":[{"orf_id":"g1","name":"a","start":90,"end":20,"strand":"-"}]}"#;
        let ds: DataSet = serde_json::from_str(json).unwrap();
        assert_eq!(ds.genes[0].strand, Strand::Reverse);
        assert!(ds.genes[0].wraps_origin());
        assert!(ds.calls.is_empty());
        assert!(ds.summary.is_none());
    }
}
