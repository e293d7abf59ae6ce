//! Linear relationships between the longest run (in sites) and its span (in nucleotides).
//! The two directions are fitted separately, as they feed different likelihood terms.
use crate::error::{GumbelError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// `y ~ Normal(slope * x + intercept, sigma)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Standard deviation of the residuals.
    pub sigma: f64,
}

impl LinearFit {
    /// Ordinary least squares of `ys` on `xs`.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            let msg = format!("{} predictors against {} responses", xs.len(), ys.len());
            return Err(GumbelError::InsufficientInput(msg));
        }
        let len = xs.len();
        if len < 2 {
            let msg = format!("{} data points can not determine a line", len);
            return Err(GumbelError::InsufficientInput(msg));
        }
        let design = DMatrix::from_fn(len, 2, |i, j| match j {
            0 => xs[i],
            _ => 1f64,
        });
        let ys = DVector::from_column_slice(ys);
        let normal = design.transpose() * &design;
        let moment = design.transpose() * &ys;
        let coef = normal
            .lu()
            .solve(&moment)
            .ok_or_else(|| GumbelError::DegenerateRegression("singular design matrix".into()))?;
        let (slope, intercept) = (coef[0], coef[1]);
        let sq_err: f64 = (&design * &coef - &ys).iter().map(|e| e * e).sum();
        let sigma = match len {
            2 => 0f64,
            _ => (sq_err / (len - 2) as f64).sqrt(),
        };
        if !(slope.is_finite() && intercept.is_finite() && sigma.is_finite()) {
            let msg = format!("non-finite fit {}\t{}\t{}", slope, intercept, sigma);
            return Err(GumbelError::DegenerateRegression(msg));
        }
        if sigma <= 0f64 {
            let msg = "residuals vanish; every point lies on the fitted line".to_string();
            return Err(GumbelError::DegenerateRegression(msg));
        }
        Ok(Self {
            slope,
            intercept,
            sigma,
        })
    }
}

/// The regressions fitted on the analyzable genes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Span given run length.
    pub span_on_run: LinearFit,
    /// Run length given span.
    pub run_on_span: LinearFit,
}

impl ModelParameters {
    /// Fit from the `(r, s)` pairs of the analyzable genes.
    pub fn fit(runs: &[f64], spans: &[f64]) -> Result<Self> {
        let span_on_run = LinearFit::fit(runs, spans)?;
        let run_on_span = LinearFit::fit(spans, runs)?;
        debug!(
            "REGRESS\tS~R\t{:.4}\t{:.4}\t{:.4}",
            span_on_run.slope, span_on_run.intercept, span_on_run.sigma
        );
        debug!(
            "REGRESS\tR~S\t{:.4}\t{:.4}\t{:.4}",
            run_on_span.slope, run_on_span.intercept, run_on_span.sigma
        );
        Ok(Self {
            span_on_run,
            run_on_span,
        })
    }
    pub fn mu_s(&self) -> f64 {
        self.span_on_run.slope
    }
    pub fn sigma_s(&self) -> f64 {
        self.span_on_run.sigma
    }
    pub fn mu_r(&self) -> f64 {
        self.run_on_span.slope
    }
    pub fn sigma_r(&self) -> f64 {
        self.run_on_span.sigma
    }
}

#[cfg(test)]
mod regression_test {
    use super::*;
    use crate::error::ErrorKind;
    #[test]
    fn simple_fit() {
        let xs = [1f64, 2f64, 3f64, 4f64];
        let ys = [3.1, 4.9, 7.2, 8.8];
        let fit = LinearFit::fit(&xs, &ys).unwrap();
        assert!((fit.slope - 1.94).abs() < 1e-6, "{:?}", fit);
        assert!((fit.intercept - 1.15).abs() < 1e-6, "{:?}", fit);
        let sq: f64 = xs
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| (y - fit.slope * x - fit.intercept).powi(2))
            .sum();
        assert!((fit.sigma - (sq / 2f64).sqrt()).abs() < 1e-9);
    }
    #[test]
    fn too_few_points() {
        let err = LinearFit::fit(&[1f64], &[2f64]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInsufficiency);
        assert!(matches!(err, GumbelError::InsufficientInput(_)));
        let err = LinearFit::fit(&[1f64, 2f64, 3f64], &[2f64, 3f64]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInsufficiency);
        let err = ModelParameters::fit(&[1f64, 2f64, 3f64, 4f64], &[2f64, 3f64]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInsufficiency);
    }
    #[test]
    fn rank_deficient() {
        let err = LinearFit::fit(&[2f64, 2f64, 2f64], &[1f64, 5f64, 3f64]).unwrap_err();
        assert!(matches!(err, GumbelError::DegenerateRegression(_)), "{}", err);
        // Two points always lie on a line.
        let err = LinearFit::fit(&[1f64, 2f64], &[1f64, 5f64]).unwrap_err();
        assert!(matches!(err, GumbelError::DegenerateRegression(_)), "{}", err);
    }
    #[test]
    fn both_directions() {
        let runs = [1f64, 2f64, 3f64, 5f64, 8f64, 13f64];
        let spans = [40f64, 95f64, 120f64, 230f64, 310f64, 540f64];
        let params = ModelParameters::fit(&runs, &spans).unwrap();
        assert!(params.mu_s() > 30f64 && params.mu_s() < 50f64, "{:?}", params);
        assert!(params.mu_r() > 0.02 && params.mu_r() < 0.03, "{:?}", params);
        assert!(params.sigma_s() > 0f64 && params.sigma_r() > 0f64);
    }
}
