use definitions::{Call, DataSet, Gene, Site, Strand};
use essentiality::ReplicateMode;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tngumbel_cli::pipeline::{run_pipeline, PipelineConfig};

fn dataset(seed: u64, num: usize) -> DataSet {
    let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(seed);
    let (mut sites, mut genes) = (vec![], vec![]);
    let mut end = 1;
    for i in 0..num {
        let start = end + 100;
        let len = rng.gen_range(500..2000);
        end = start + len - 1;
        let is_essential = i % 7 == 0;
        let mut position = start + 5;
        while position <= end {
            let count = match is_essential || rng.gen_bool(0.5) {
                true => 0f64,
                false => rng.gen_range(1..50) as f64,
            };
            sites.push(Site::new(position, vec![count]));
            position += rng.gen_range(15..50);
        }
        let id = format!("g{i}");
        genes.push(Gene::new(&id, &id, start, end, Strand::Forward));
    }
    DataSet::new("", end + 100, sites, genes)
}

#[test]
fn parse_profile() {
    let config = PipelineConfig::from_toml(include_str!("../../profile.toml")).unwrap();
    assert_eq!(config.prefix(), "sample");
    assert_eq!(config.threads(), 4);
    let gumbel = config.gumbel_config();
    assert_eq!(gumbel.sampler.samples, 10000);
    assert_eq!(gumbel.sampler.seed, 42);
    assert_eq!(gumbel.extract.replicates, ReplicateMode::Sum);
    assert_eq!(gumbel.extract.min_read, 1f64);
    assert!(gumbel.validate().is_ok());
    assert_eq!(config.output("tsv"), config.out_dir().join("sample.tsv"));
}

#[test]
fn partial_profile() {
    let profile = r#"
input_file = "input.json"
out_dir = "out"
prefix = "run"
[sampler]
samples = 50
"#;
    let config = PipelineConfig::from_toml(profile).unwrap();
    assert_eq!(config.verbose(), 0);
    assert_eq!(config.threads(), 1);
    let gumbel = config.gumbel_config();
    assert_eq!(gumbel.sampler.samples, 50);
    assert_eq!(gumbel.sampler.burn_in, 500);
    assert_eq!(gumbel.posterior.fdr, 0.05);
    assert_eq!(gumbel.extract.min_read, 0f64);
    assert!(PipelineConfig::from_toml("prefix = 3").is_err());
}

#[test]
fn pipeline_writes_results() {
    let dir = std::env::temp_dir().join(format!("tngumbel_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("input.json");
    let ds = dataset(3, 80);
    std::fs::write(&input, serde_json::to_string(&ds).unwrap()).unwrap();
    let profile = format!(
        "input_file = {:?}\nout_dir = {:?}\nprefix = \"run\"\n[sampler]\nsamples = 100\nburn_in = 50\nseed = 7\n",
        input.to_str().unwrap(),
        dir.join("out").to_str().unwrap(),
    );
    let config = PipelineConfig::from_toml(&profile).unwrap();
    run_pipeline(&config).unwrap();
    let json = std::fs::read_to_string(config.output("json")).unwrap();
    let result: DataSet = serde_json::from_str(&json).unwrap();
    assert_eq!(result.calls.len(), 80);
    assert_eq!(result.input_file, input.to_string_lossy());
    let summary = result.summary.as_ref().unwrap();
    assert_eq!(summary.samples, 100);
    assert!(result.calls.iter().step_by(7).all(|c| c.call != Call::NE));
    let tsv = std::fs::read_to_string(config.output("tsv")).unwrap();
    let body: Vec<_> = tsv.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(body.len(), 80);
    assert!(body.iter().all(|l| l.split('\t').count() == 9));
    assert!(tsv.starts_with("#Gumbel\n"));
    std::fs::remove_dir_all(&dir).unwrap();
}
