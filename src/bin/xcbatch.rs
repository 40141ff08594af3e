use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use xcbatch::{Batch, DataLoader, LoaderConfig, Result};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dataset statistics and the batch plan
    Stats(LoaderArgs),

    /// Materialize every batch once and report timing
    Sweep(LoaderArgs),
}

#[derive(Args)]
#[command(rename_all = "snake_case")]
struct LoaderArgs {
    /// Directory containing one subdirectory per dataset
    #[arg(required = true)]
    data_dir: PathBuf,

    /// Dataset name, e.g. EURLex-4K
    #[arg(required = true)]
    dataset: String,

    /// Feature file name inside the dataset directory
    #[arg(long, default_value = "trn_X_Xf.txt")]
    features: String,

    /// Label file name inside the dataset directory
    #[arg(long, default_value = "trn_X_Y.txt")]
    labels: String,

    /// Number of classifiers trained in parallel per batch
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Feature representation: sparse or dense
    #[arg(long, default_value = "sparse")]
    feature_type: String,

    /// train removes labels without positive instances, predict keeps them
    #[arg(long, default_value = "train")]
    mode: String,

    /// Batch over labels or instances
    #[arg(long, default_value = "labels")]
    batch_order: String,

    /// Feature normalization: none, l1, l2 or max
    #[arg(long, default_value = "l2")]
    norm: String,

    /// First label index to train on
    #[arg(long, default_value_t = 0)]
    start_index: usize,

    /// One past the last label index; omit to train to the end
    #[arg(long)]
    end_index: Option<usize>,
}

impl LoaderArgs {
    fn to_config(&self) -> Result<LoaderConfig> {
        Ok(LoaderConfig {
            data_dir: self.data_dir.clone(),
            dataset: self.dataset.clone(),
            feature_filename: self.features.clone(),
            label_filename: self.labels.clone(),
            batch_size: self.batch_size,
            feature_type: self.feature_type.parse()?,
            mode: self.mode.parse()?,
            batch_order: self.batch_order.parse()?,
            normalization: self.norm.parse()?,
            start_index: self.start_index,
            end_index: self.end_index,
        })
    }
}

fn stats(args: &LoaderArgs) -> Result<()> {
    let loader = DataLoader::new(&args.to_config()?)?;
    let (n_instances, n_features, n_labels) = loader.get_stats();
    println!("instances: {}", n_instances);
    println!("features:  {}", n_features);
    println!("labels:    {} (of {} original)", n_labels, loader.num_labels_original());
    if let Some(valid) = loader.valid_labels() {
        println!("valid:     {}", valid.len());
    }
    println!("batches:   {}", loader.num_batches());
    Ok(())
}

fn sweep(args: &LoaderArgs) -> Result<()> {
    let loader = DataLoader::new(&args.to_config()?)?;
    let start_t = time::precise_time_s();

    let mut n_items = 0usize;
    for batch in loader.iter() {
        n_items += match batch {
            Batch::Targets(items) => items.len(),
            Batch::Shortlist(items) => items.len(),
            Batch::Instances(batch) => batch.instances.len(),
        };
    }

    info!(
        "Materialized {} batches ({} items); it took {:.2}s",
        loader.num_batches(),
        n_items,
        time::precise_time_s() - start_t
    );
    Ok(())
}

fn main() {
    simple_logger::init().unwrap();
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Stats(args) => stats(args),
        Commands::Sweep(args) => sweep(args),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
