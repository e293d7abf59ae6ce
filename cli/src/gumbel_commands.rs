use clap::{value_parser, Arg, ArgAction, Command};

fn verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .help("Debug mode")
}

fn threads() -> Arg {
    Arg::new("threads")
        .short('t')
        .long("threads")
        .value_parser(value_parser!(usize))
        .default_value("1")
        .help("number of threads")
}

fn with_extract_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("n_terminus")
                .long("n_terminus")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .default_value("0")
                .help("Ignore sites within this percentage of the gene from the N-terminus."),
        )
        .arg(
            Arg::new("c_terminus")
                .long("c_terminus")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .default_value("0")
                .help("Ignore sites within this percentage of the gene from the C-terminus."),
        )
        .arg(
            Arg::new("replicates")
                .long("replicates")
                .value_parser(["Sum", "Mean"])
                .default_value("Sum")
                .help("How to combine the counts of the replicates."),
        )
        .arg(
            Arg::new("min_read")
                .long("min_read")
                .value_name("READS")
                .value_parser(value_parser!(f64))
                .default_value("0")
                .help("A site needs at least this many (combined) reads to be an insertion."),
        )
}

fn subcommand_stats() -> Command {
    let command = Command::new("stats")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Compute the number of sites and the longest run without insertion of each gene.")
        .arg(verbose());
    with_extract_args(command)
}

fn subcommand_gumbel() -> Command {
    let command = Command::new("gumbel")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Call essential genes by the Gumbel method.")
        .arg(verbose())
        .arg(threads())
        .arg(
            Arg::new("samples")
                .short('s')
                .long("samples")
                .value_parser(value_parser!(usize))
                .default_value("10000")
                .help("Number of samples to retain."),
        )
        .arg(
            Arg::new("burn_in")
                .short('b')
                .long("burn_in")
                .value_parser(value_parser!(usize))
                .default_value("500")
                .help("Number of iterations discarded at the beginning."),
        )
        .arg(
            Arg::new("trim")
                .long("trim")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("Retain every trim-th iteration."),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .default_value("42"),
        )
        .arg(
            Arg::new("fdr")
                .long("fdr")
                .value_parser(value_parser!(f64))
                .default_value("0.05")
                .help("False discovery rate to determine the thresholds of the calls."),
        );
    with_extract_args(command)
}

fn subcommand_extract() -> Command {
    Command::new("extract")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Extract the calls in the packed file into one tsv")
        .arg(verbose())
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .required(true),
        )
}

fn subcommand_pipeline() -> Command {
    Command::new("pipeline")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Run pipeline based on the given TOML file.")
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .required(true)
                .help("TOML configuration file. See profile.toml for an example."),
        )
}

pub fn gumbel_parser() -> Command {
    Command::new("tngumbel")
        .version("0.1")
        .author("Bansho Masutani <ban-m@g.ecc.u-tokyo.ac.jp>")
        .about("Gene essentiality from transposon insertion sequencing")
        .arg_required_else_help(true)
        .subcommand(subcommand_stats())
        .subcommand(subcommand_gumbel())
        .subcommand(subcommand_extract())
        .subcommand(subcommand_pipeline())
}
