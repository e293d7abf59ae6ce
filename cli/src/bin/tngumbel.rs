use definitions::*;
use essentiality::{ExtractConfig, ReplicateMode};
use std::io::BufReader;
use std::io::Write;
#[macro_use]
extern crate log;

fn main() -> std::io::Result<()> {
    let matches = tngumbel_cli::gumbel_commands::gumbel_parser().get_matches();
    if let Some(("pipeline", sub_m)) = matches.subcommand() {
        let path: &String = sub_m.get_one("profile").unwrap();
        let profile = std::fs::read_to_string(path)?;
        let config = tngumbel_cli::pipeline::PipelineConfig::from_toml(&profile)?;
        return tngumbel_cli::pipeline::run_pipeline(&config);
    }
    if let Some((_, sub_m)) = matches.subcommand() {
        tngumbel_cli::init_logger(sub_m.get_count("verbose") as usize);
    }
    let mut ds = get_input_file()?;
    let ds = &mut ds;
    match matches.subcommand() {
        Some(("stats", sub_m)) => stats(sub_m, ds)?,
        Some(("gumbel", sub_m)) => gumbel(sub_m, ds)?,
        Some(("extract", sub_m)) => return extract(sub_m, ds),
        _ => unreachable!(),
    };
    flush_file(ds)
}

fn extract_config(matches: &clap::ArgMatches) -> ExtractConfig {
    let n_terminus: f64 = *matches.get_one("n_terminus").unwrap();
    let c_terminus: f64 = *matches.get_one("c_terminus").unwrap();
    let replicates: ReplicateMode = matches
        .get_one::<String>("replicates")
        .and_then(|mode| mode.parse().ok())
        .unwrap();
    let min_read: f64 = *matches.get_one("min_read").unwrap();
    ExtractConfig::new(n_terminus, c_terminus, replicates).with_min_read(min_read)
}

fn stats(matches: &clap::ArgMatches, dataset: &mut DataSet) -> std::io::Result<()> {
    use essentiality::ExtractGeneStats;
    debug!("START\tStats step");
    let config = essentiality::GumbelConfig {
        extract: extract_config(matches),
        ..Default::default()
    };
    config.validate()?;
    let genome = dataset.extract_gene_stats(&config.extract);
    info!(
        "STATS\tSites\t{}\tSaturation\t{:.4}\tMaxRun\t{}",
        genome.sites,
        genome.saturation(),
        genome.max_run
    );
    Ok(())
}

fn gumbel(matches: &clap::ArgMatches, dataset: &mut DataSet) -> std::io::Result<()> {
    use essentiality::{GumbelConfig, GumbelEssentiality, PosteriorConfig, SamplerConfig};
    debug!("START\tGumbel");
    set_threads(matches);
    let samples: usize = *matches.get_one("samples").unwrap();
    let burn_in: usize = *matches.get_one("burn_in").unwrap();
    let trim: usize = *matches.get_one("trim").unwrap();
    let seed: u64 = *matches.get_one("seed").unwrap();
    let fdr: f64 = *matches.get_one("fdr").unwrap();
    let sampler = SamplerConfig::new(samples, burn_in, trim, seed);
    let posterior = PosteriorConfig {
        fdr,
        ..Default::default()
    };
    let config = GumbelConfig::new(extract_config(matches), sampler, posterior);
    dataset.gumbel_essentiality_with(&config, tngumbel_cli::log_progress, None)?;
    Ok(())
}

fn extract(matches: &clap::ArgMatches, dataset: &DataSet) -> std::io::Result<()> {
    use essentiality::report::Extract;
    debug!("START\tExtract");
    let file = std::fs::File::create(matches.get_one::<String>("output").unwrap())?;
    let mut wtr = std::io::BufWriter::new(file);
    dataset.extract(&mut wtr)?;
    wtr.flush()
}

fn get_input_file() -> std::io::Result<DataSet> {
    let stdin = std::io::stdin();
    let reader = BufReader::new(stdin.lock());
    match serde_json::de::from_reader(reader) {
        Err(why) => {
            eprintln!("{:?}", why);
            eprintln!("Invalid Input from STDIN.");
            Err(std::io::Error::from(std::io::ErrorKind::InvalidData))
        }
        Ok(res) => Ok(res),
    }
}

fn flush_file(dataset: &DataSet) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut wtr = std::io::BufWriter::new(stdout.lock());
    match serde_json::ser::to_writer(&mut wtr, dataset) {
        Err(why) => {
            eprintln!("{:?}", why);
            eprintln!("Invalid output to the STDOUT.");
            std::process::exit(1);
        }
        _ => wtr.flush(),
    }
}

fn set_threads(matches: &clap::ArgMatches) {
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        tngumbel_cli::set_threads(threads);
    }
}
