//! Tab-separated report of the calls, preceded by a block of `#` lines describing the run.
use definitions::{Call, DataSet, RunSummary};

pub const HEADER: &str = "#Orf\tName\tDesc\tk\tn\tr\ts\tzbar\tCall";

pub trait Extract {
    fn extract<W: std::io::Write>(&self, file: &mut W) -> std::io::Result<()>;
}

impl Extract for DataSet {
    fn extract<W: std::io::Write>(&self, file: &mut W) -> std::io::Result<()> {
        writeln!(file, "#Gumbel")?;
        writeln!(file, "#Input: {}", self.input_file)?;
        writeln!(file, "#Genes: {}\tSites: {}", self.genes.len(), self.sites.len())?;
        match self.summary.as_ref() {
            Some(summary) => write_summary(summary, file)?,
            None => writeln!(file, "#No summary. The analysis has not been run.")?,
        }
        writeln!(file, "{HEADER}")?;
        for call in self.calls.iter() {
            writeln!(file, "{call}")?;
        }
        Ok(())
    }
}

fn write_summary<W: std::io::Write>(summary: &RunSummary, file: &mut W) -> std::io::Result<()> {
    let RunSummary {
        samples,
        burn_in,
        trim,
        seed,
        ..
    } = summary;
    writeln!(file, "#Samples: {samples}\tBurn-in: {burn_in}\tTrim: {trim}\tSeed: {seed}")?;
    let (n_term, c_term, reps) = (summary.n_terminus, summary.c_terminus, &summary.replicates);
    let min_read = summary.min_read;
    writeln!(
        file,
        "#N-terminus: {n_term}\tC-terminus: {c_term}\tReplicates: {reps}\tMin read: {min_read}"
    )?;
    writeln!(
        file,
        "#Iterations: {}\tAcceptance rate: {:.3}\tTime: {:.1} sec",
        summary.iterations, summary.acceptance_rate, summary.elapsed_secs
    )?;
    writeln!(
        file,
        "#Saturation: {:.4}\tGlobal phi: {:.4}\tMax run: {}",
        summary.saturation, summary.global_phi, summary.max_run
    )?;
    writeln!(
        file,
        "#Phi (mean): {:.4}\tPhi (final): {:.4}",
        summary.phi_mean, summary.phi_final
    )?;
    writeln!(
        file,
        "#Essential threshold: {:.4}\tUncertain threshold: {:.4}\tSignificant n: {:.2}",
        summary.essential_threshold, summary.uncertain_threshold, summary.significant_n
    )?;
    for call in Call::ALL {
        let count = summary.count(call);
        writeln!(file, "#{call} Genes: {count}\t({})", call.description())?;
    }
    Ok(())
}
