//! Per-gene summary of the insertions: number of sites, number of sites with reads,
//! and the longest run of sites without reads.
use definitions::{DataSet, Gene, GeneStat, Site, Strand};
use serde::{Deserialize, Serialize};

/// How the counts of the replicates are merged into one count per site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReplicateMode {
    Sum,
    Mean,
}

impl std::str::FromStr for ReplicateMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sum" | "sum" => Ok(ReplicateMode::Sum),
            "Mean" | "mean" => Ok(ReplicateMode::Mean),
            _ => Err(format!("{} is not a replicate mode (Sum or Mean)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Ignore sites within this percentage of the gene length from the N-terminus.
    pub n_terminus: f64,
    /// Ignore sites within this percentage of the gene length from the C-terminus.
    pub c_terminus: f64,
    pub replicates: ReplicateMode,
    /// A site is an insertion if its combined count is positive and at least this.
    pub min_read: f64,
}

impl ExtractConfig {
    pub fn new(n_terminus: f64, c_terminus: f64, replicates: ReplicateMode) -> Self {
        Self {
            n_terminus,
            c_terminus,
            replicates,
            min_read: 0f64,
        }
    }
    pub fn with_min_read(mut self, min_read: f64) -> Self {
        self.min_read = min_read;
        self
    }
    pub fn is_insertion(&self, site: &Site) -> bool {
        let count = combined_count(site, self.replicates);
        0f64 < count && self.min_read <= count
    }
}

impl std::default::Default for ExtractConfig {
    fn default() -> Self {
        Self::new(0f64, 0f64, ReplicateMode::Sum)
    }
}

/// Saturation of the whole genome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenomeSaturation {
    pub sites: usize,
    pub insertions: usize,
    /// Longest run of sites without reads, wrapping around the origin.
    pub max_run: usize,
}

impl GenomeSaturation {
    pub fn saturation(&self) -> f64 {
        match self.sites {
            0 => 0f64,
            n => self.insertions as f64 / n as f64,
        }
    }
    /// Fraction of the sites without any insertion.
    pub fn global_phi(&self) -> f64 {
        1f64 - self.saturation()
    }
}

pub trait ExtractGeneStats {
    fn extract_gene_stats(&mut self, config: &ExtractConfig) -> GenomeSaturation;
}

impl ExtractGeneStats for DataSet {
    fn extract_gene_stats(&mut self, config: &ExtractConfig) -> GenomeSaturation {
        if self.sites.windows(2).any(|w| w[1].position < w[0].position) {
            debug!("EXTRACT\tSorting sites");
            self.sites.sort_by_key(|s| s.position);
        }
        self.gene_stats = self
            .genes
            .iter()
            .map(|gene| gene_stat(gene, &self.sites, self.genome_length, config))
            .collect();
        let analyzable = self.gene_stats.iter().filter(|g| g.is_analyzable).count();
        debug!("EXTRACT\tGenes\t{}\t{}", self.gene_stats.len(), analyzable);
        genome_saturation(&self.sites, config)
    }
}

pub fn combined_count(site: &Site, mode: ReplicateMode) -> f64 {
    let sum: f64 = site.counts.iter().sum();
    match mode {
        ReplicateMode::Sum => sum,
        ReplicateMode::Mean if site.counts.is_empty() => 0f64,
        ReplicateMode::Mean => sum / site.counts.len() as f64,
    }
}

pub fn genome_saturation(sites: &[Site], config: &ExtractConfig) -> GenomeSaturation {
    let is_zero: Vec<_> = sites.iter().map(|s| !config.is_insertion(s)).collect();
    let insertions = is_zero.iter().filter(|&&z| !z).count();
    GenomeSaturation {
        sites: sites.len(),
        insertions,
        max_run: circular_longest_run(&is_zero),
    }
}

/// Nucleotide span of the gene.
pub fn gene_span(gene: &Gene, genome_length: u64) -> u64 {
    match gene.wraps_origin() {
        false => gene.end - gene.start + 1,
        true => (genome_length + 1).saturating_sub(gene.start) + gene.end,
    }
}

// Distance from `from` to `to` along the genome.
fn forward_distance(from: u64, to: u64, genome_length: u64) -> u64 {
    match from <= to {
        true => to - from,
        false => (to + genome_length).saturating_sub(from),
    }
}

/// Sites inside the gene after trimming the termini, in the order along the genome.
pub fn sites_in_gene<'a>(
    gene: &Gene,
    sites: &'a [Site],
    genome_length: u64,
    config: &ExtractConfig,
) -> Vec<&'a Site> {
    let start = sites.partition_point(|s| s.position < gene.start);
    let end = sites.partition_point(|s| s.position <= gene.end);
    let candidates: Vec<&Site> = match gene.wraps_origin() {
        false if start < end => sites[start..end].iter().collect(),
        false => vec![],
        true => sites[start..].iter().chain(sites[..end].iter()).collect(),
    };
    let len = gene_span(gene, genome_length);
    let n_trim = (len as f64 * config.n_terminus / 100f64).floor() as u64;
    let c_trim = (len as f64 * config.c_terminus / 100f64).floor() as u64;
    let (head_trim, tail_trim) = match gene.strand {
        Strand::Forward => (n_trim, c_trim),
        Strand::Reverse => (c_trim, n_trim),
    };
    if len <= head_trim + tail_trim {
        return vec![];
    }
    let (lower, upper) = (head_trim, len - 1 - tail_trim);
    candidates
        .into_iter()
        .filter(|site| {
            let offset = forward_distance(gene.start, site.position, genome_length);
            lower <= offset && offset <= upper
        })
        .collect()
}

pub fn gene_stat(
    gene: &Gene,
    sites: &[Site],
    genome_length: u64,
    config: &ExtractConfig,
) -> GeneStat {
    let sites = sites_in_gene(gene, sites, genome_length, config);
    let is_zero: Vec<_> = sites.iter().map(|s| !config.is_insertion(s)).collect();
    let n = sites.len();
    let k = is_zero.iter().filter(|&&z| !z).count();
    let (r, run_start) = longest_run(&is_zero);
    let s = match r {
        0 => 0,
        _ => {
            let first = sites[run_start].position;
            let last = sites[run_start + r - 1].position;
            forward_distance(first, last, genome_length) + 2
        }
    };
    let t = gene_span(gene, genome_length);
    GeneStat::new(gene, n, k, r, s, t)
}

/// Return the length and the starting index of the longest run of `true`.
/// If there are ties, the first one is returned.
pub fn longest_run(is_zero: &[bool]) -> (usize, usize) {
    let (mut max, mut max_start) = (0, 0);
    let (mut current, mut current_start) = (0, 0);
    for (idx, &zero) in is_zero.iter().enumerate() {
        if zero {
            if current == 0 {
                current_start = idx;
            }
            current += 1;
            if max < current {
                max = current;
                max_start = current_start;
            }
        } else {
            current = 0;
        }
    }
    (max, max_start)
}

/// Longest run of `true`, where the last and the first element are adjacent.
pub fn circular_longest_run(is_zero: &[bool]) -> usize {
    match is_zero.iter().position(|&z| !z) {
        None => is_zero.len(),
        Some(pivot) => {
            // Rotate so that the sequence starts just after a `false`.
            let rotated: Vec<_> = is_zero[pivot + 1..]
                .iter()
                .chain(is_zero[..=pivot].iter())
                .copied()
                .collect();
            longest_run(&rotated).0
        }
    }
}
