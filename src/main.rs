use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use std::error::Error;
use vpc_topology::output::{print_summary, write_graph};
use vpc_topology::{generate, AwsCliProvider, GeneratorConfig, ProviderQuery, SnapshotProvider};

/// Generate VPC topologies as resource descriptors
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generator config JSON file
    #[arg(short, long, env = "VPC_TOPOLOGY_CONFIG")]
    config: String,

    /// Provider snapshot JSON file; live `aws` queries are used when absent
    #[arg(short, long, env = "VPC_TOPOLOGY_SNAPSHOT")]
    snapshot: Option<String>,

    /// Region passed to the `aws` command line
    #[arg(long)]
    region: Option<String>,

    /// Resource JSON output file, stdout when absent
    #[arg(short, long)]
    output: Option<String>,

    /// Print a colored summary of every topology
    #[arg(long)]
    summary: bool,
}

fn init_logging() {
    let err = match log4rs::init_file("log4rs.yml", Default::default()) {
        Ok(()) => return,
        Err(e) => e,
    };
    eprintln!("log4rs.yml not loaded ({err}), logging to stderr");
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Error initializing log4rs: {e}");
            }
        }
        Err(e) => eprintln!("Error building log4rs config: {e}"),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    init_logging();
    let args = Args::parse();
    log::info!("#Start main() config={}", args.config);

    let provider: Box<dyn ProviderQuery> = match &args.snapshot {
        Some(path) => Box::new(SnapshotProvider::from_file(path)?),
        None => Box::new(AwsCliProvider::new(args.region.clone())),
    };
    let config = GeneratorConfig::load(&args.config)?;
    let run = generate(&config, provider.as_ref())?;

    if args.summary {
        print_summary(&run);
    }
    write_graph(&run.graph, args.output.as_deref())?;

    Ok(())
}
