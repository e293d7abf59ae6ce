//! Useful functions.

pub fn normal_log_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    -0.5 * z * z - sd.ln() - 0.5 * (2f64 * std::f64::consts::PI).ln()
}

pub fn normal_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    normal_log_pdf(x, mean, sd).exp()
}

#[cfg(test)]
mod misc_test {
    use super::*;
    #[test]
    fn normal_test() {
        let p = normal_pdf(0f64, 0f64, 1f64);
        assert!((p - 0.398_942_280_4).abs() < 1e-9, "{}", p);
        let p = normal_pdf(3f64, 1f64, 2f64);
        assert!((p - 0.120_985_362_3).abs() < 1e-9, "{}", p);
    }
}
