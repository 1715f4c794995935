use crate::common::*;
use wot_alg::gene_set_scores::*;
use wot_data::gene_sets::{read_set_filter, GeneSets};

#[derive(Args, Debug)]
pub struct GeneSetArgs {
    /// Expression matrix, cells x genes (`.mtx` files are genes x cells)
    #[arg(long, short, required = true)]
    matrix: Box<str>,

    /// Gene sets in `.gmt` or `.gmx` format. Built-in `Cell.cycle` and
    /// `Apoptosis` sets if not given.
    #[arg(long, short, alias = "gene_sets")]
    gene_sets: Option<Box<str>>,

    /// Only score these sets: comma-separated names, or a file with one
    /// name per line
    #[arg(long, alias = "gene_set_filter")]
    gene_set_filter: Option<Box<str>>,

    /// Scoring method
    #[arg(long, value_enum, default_value = "mean_z_score")]
    method: ScoreMethod,

    /// Clip z-scores to `[-max_z, max_z]`
    #[arg(long, default_value_t = 5.0, alias = "max_z")]
    max_z: f32,

    /// Output header; scores go to `{out}_gene_set_scores.txt`
    #[arg(long, short, default_value = "wot")]
    out: Box<str>,
}

pub fn run_gene_set(args: &GeneSetArgs) -> anyhow::Result<()> {
    // 1. expression
    let data = read_dataset(&args.matrix)?;
    data.validate_expression()?;

    // 2. gene sets
    let mut sets = match &args.gene_sets {
        Some(file) => GeneSets::from_file(file)?,
        None => {
            info!("Using built-in gene sets");
            GeneSets::builtin()
        }
    };
    if let Some(filter) = &args.gene_set_filter {
        let names = read_set_filter(filter)?;
        sets.retain_names(&names);
        if sets.is_empty() {
            anyhow::bail!("no gene set left after filtering");
        }
    }

    // 3. score and save
    let scores = score_gene_sets(&data, &sets, args.method, args.max_z)?;
    write_table(&scores, &args.out, "gene_set_scores.txt")?;
    Ok(())
}
