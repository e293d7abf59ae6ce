//! Prior plausibility that a region without insertion is an essential domain,
//! rather than a chance gap. It is a logistic function of the nucleotide span of the region,
//! normalized over every possible span inside the gene.
use std::collections::HashMap;

/// Steepness of the logistic function.
const STEEPNESS: f64 = 0.1;
/// Span (in nucleotides) at which the logistic function reaches 1/2.
const MEAN_DOMAIN_SPAN: f64 = 300f64;

#[derive(Debug, Clone, Default)]
pub struct EssentialWeightModel {
    // gene span -> normalization constant.
    normalizers: HashMap<u64, f64>,
}

fn logistic(span: f64) -> f64 {
    (1f64 + (STEEPNESS * (MEAN_DOMAIN_SPAN - span)).exp()).recip()
}

impl EssentialWeightModel {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cache_len(&self) -> usize {
        self.normalizers.len()
    }
    /// Sum of the logistic function over spans 1..=gene_span.
    pub fn normalizer(&mut self, gene_span: u64) -> f64 {
        *self
            .normalizers
            .entry(gene_span)
            .or_insert_with(|| (1..=gene_span).map(|i| logistic(i as f64)).sum())
    }
    /// Weight of a gap spanning `span` nucleotides in a gene spanning `gene_span` nucleotides.
    pub fn sigmoid_weight(&mut self, span: u64, gene_span: u64) -> f64 {
        if span == 0 || gene_span == 0 {
            return 0f64;
        }
        logistic(span as f64) / self.normalizer(gene_span)
    }
}
