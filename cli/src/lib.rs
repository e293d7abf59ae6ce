pub mod gumbel_commands;
pub mod pipeline;
use essentiality::ChainState;
use log::*;

/// Report the chain every this many iterations.
const PROGRESS_INTERVAL: usize = 1000;

pub fn init_logger(verbose: usize) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    if let Err(why) = env_logger::Builder::from_env(env).try_init() {
        debug!("{:?} Logger is already set.", why);
    }
}

pub fn set_threads(threads: usize) {
    debug!("Set Threads\t{}", threads);
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        debug!("{:?} If you run `pipeline` module, this is Harmless.", why);
    }
}

pub fn log_progress(state: &ChainState) {
    if state.iteration_count % PROGRESS_INTERVAL == 0 {
        info!(
            "PROGRESS\t{}\t{:.4}\t{:.4}\t{:.3}",
            state.iteration_count,
            state.phi,
            state.w1,
            state.acceptance_rate()
        );
    }
}
