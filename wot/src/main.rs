mod common;
mod run_convert;
mod run_gene_set;
mod run_ot;
mod run_simulate;
mod run_trajectory;

use common::*;
use run_convert::*;
use run_gene_set::*;
use run_ot::*;
use run_simulate::*;
use run_trajectory::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Waddington optimal transport",
    long_about = "Waddington optimal transport for time-course single-cell data.\n\
		  Expression matrices in `.mtx` (10x layout), `.h5` (10x), `.loom`,\n\
		  or delimited text (`.txt`, `.tsv`, `.csv`), optionally gzipped.",
    term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Score cells by gene sets",
        long_about = "Score every cell against gene sets:\n\
		      (1) z-score each gene across cells (or keep raw values)\n\
		      (2) average over the genes of each set.\n\
		      Without `--gene-sets`, cell cycle and apoptosis sets are used.\n",
        visible_alias = "gene_set"
    )]
    GeneSet(GeneSetArgs),

    #[command(
        about = "Compute transport maps between consecutive days",
        long_about = "Compute one transport map per day pair in four steps:\n\
		      (1) Growth-rate prior from gene-set scores\n\
		      (2) Local PCA on the cells of the two days\n\
		      (3) Cost matrix of squared distances\n\
		      (4) Unbalanced entropic transport (stabilized Sinkhorn).\n"
    )]
    Ot(OtArgs),

    #[command(
        about = "Follow cell sets through transport maps",
        long_about = "Push cell sets backward (ancestors) and forward (descendants)\n\
		      through a directory of transport maps, summarizing genes\n\
		      and gene-set scores along the way.\n",
        visible_alias = "ancestors"
    )]
    Trajectory(TrajectoryArgs),

    #[command(
        about = "Convert expression matrices to loom or text",
        visible_alias = "convert_matrix"
    )]
    ConvertMatrix(ConvertArgs),

    /// Simulate a time course from evolving gaussian mixtures
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::GeneSet(args) => {
            run_gene_set(args)?;
        }
        Commands::Ot(args) => {
            run_ot(args)?;
        }
        Commands::Trajectory(args) => {
            run_trajectory(args)?;
        }
        Commands::ConvertMatrix(args) => {
            run_convert(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    info!("Done");
    Ok(())
}
